use anyhow::{bail, Context};
use clap::Parser;
use inquire::{error::InquireError, Password, PasswordDisplayMode, Text};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chatbox_lib::config::{
    AppConfig, PollerConfig, API_BASE, DEFAULT_HOST, DEFAULT_PORT, HTTP_TIMEOUT_SECS,
    MAX_BUFFERED, MIN_POLLING_INTERVAL_MILLIS, RETRY_DELAY_SECS,
};
use chatbox_lib::youtube::backoff::RetryPolicy;

/// 指数バックオフ時の待機時間の上限（秒）
const MAX_BACKOFF_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(author, version, about = "YouTube Live Chat for OBS", long_about = None)]
struct Args {
    /// YouTube Data API v3 key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// YouTube live stream URL to monitor
    #[arg(short, long)]
    url: Option<String>,

    /// Address to serve the overlay on
    #[arg(long, default_value = DEFAULT_HOST)]
    host: IpAddr,

    /// Port to serve the overlay on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of recent messages kept for the overlay
    #[arg(long, default_value_t = MAX_BUFFERED, value_parser = parse_buffer_size)]
    buffer_size: usize,

    /// Seconds to wait before retrying a failed poll
    #[arg(long, default_value_t = RETRY_DELAY_SECS)]
    retry_delay_secs: u64,

    /// Double the retry delay on consecutive failures (capped at 60s)
    #[arg(long)]
    exponential_backoff: bool,

    /// Lower bound for the server-advised polling interval, in milliseconds
    #[arg(long, default_value_t = MIN_POLLING_INTERVAL_MILLIS)]
    min_interval_ms: u64,

    /// Timeout for each YouTube API request, in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Drop messages whose id was already received
    #[arg(long)]
    dedup: bool,

    /// YouTube Data API base URL
    #[arg(long, default_value = API_BASE, hide = true)]
    api_base: String,

    /// Fail instead of prompting for a missing API key or URL
    #[arg(long)]
    no_prompt: bool,

    /// Display project information
    #[arg(long)]
    info: bool,
}

fn parse_buffer_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("buffer size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    fn app_config(&self) -> AppConfig {
        let retry = if self.exponential_backoff {
            RetryPolicy::Exponential {
                base: Duration::from_secs(self.retry_delay_secs),
                max: Duration::from_secs(MAX_BACKOFF_SECS),
                jitter: true,
            }
        } else {
            RetryPolicy::Fixed(Duration::from_secs(self.retry_delay_secs))
        };

        AppConfig {
            api_base: self.api_base.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            buffer_capacity: self.buffer_size,
            listen_addr: SocketAddr::new(self.host, self.port),
            poller: PollerConfig {
                retry,
                min_interval: Duration::from_millis(self.min_interval_ms),
                dedup: self.dedup,
            },
        }
    }
}

fn show_info() {
    println!(
        "
Project: ihts-chatbox
Description: YouTube Live Chat overlay for OBS Studio
Version: {}
",
        env!("CARGO_PKG_VERSION")
    );
}

/// 未指定の値をターミナルで入力させる
fn prompt_value(
    given: Option<String>,
    no_prompt: bool,
    label: &str,
    secret: bool,
) -> anyhow::Result<String> {
    if let Some(value) = given.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        return Ok(value);
    }
    if no_prompt {
        bail!("{} is required!", label);
    }

    let message = format!("Enter your {}:", label);
    let answer = if secret {
        Password::new(&message)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
    } else {
        Text::new(&message).prompt()
    };

    match answer {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Ok(_) => bail!("{} is required!", label),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            bail!("Operation cancelled.")
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", label)),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.info {
        show_info();
        return Ok(());
    }

    let config = args.app_config();

    println!("ihts-chatbox");
    println!("{}", "=".repeat(30));
    let api_key = prompt_value(
        args.api_key.clone(),
        args.no_prompt,
        "YouTube Data API v3 Key",
        true,
    )?;
    let stream_url = prompt_value(
        args.url.clone(),
        args.no_prompt,
        "YouTube Live Stream URL",
        false,
    )?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(chatbox_lib::run(config, api_key, &stream_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_config() {
        let args = Args::try_parse_from(["ihts-chatbox", "--api-key", "key"]).unwrap();
        let config = args.app_config();

        assert_eq!(config.listen_addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poller.retry, RetryPolicy::Fixed(Duration::from_secs(5)));
        assert_eq!(config.poller.min_interval, Duration::from_millis(1000));
        assert!(!config.poller.dedup);
    }

    #[test]
    fn test_custom_config() {
        let args = Args::try_parse_from([
            "ihts-chatbox",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--buffer-size",
            "100",
            "--retry-delay-secs",
            "2",
            "--exponential-backoff",
            "--dedup",
            "--api-base",
            "http://localhost:8081/youtube/v3",
        ])
        .unwrap();
        let config = args.app_config();

        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.buffer_capacity, 100);
        assert_eq!(config.api_base, "http://localhost:8081/youtube/v3");
        assert!(config.poller.dedup);
        assert_eq!(
            config.poller.retry,
            RetryPolicy::Exponential {
                base: Duration::from_secs(2),
                max: Duration::from_secs(60),
                jitter: true,
            }
        );
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        assert!(Args::try_parse_from(["ihts-chatbox", "--buffer-size", "0"]).is_err());
    }

    #[test]
    fn test_given_value_skips_prompt() {
        let value = prompt_value(Some("  https://youtu.be/abc ".to_string()), true, "URL", false)
            .unwrap();
        assert_eq!(value, "https://youtu.be/abc");
        assert!(prompt_value(None, true, "URL", false).is_err());
        assert!(prompt_value(Some("   ".to_string()), true, "URL", false).is_err());
    }
}
