pub mod backoff;
pub mod buffer;
pub mod client;
pub mod errors;
pub mod poller;
pub mod session;
pub mod state;
pub mod types;
pub mod video_id;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::MessageBuffer;
pub use client::{LiveChatApi, YouTubeClient};
pub use errors::{SessionError, YouTubeError};
pub use session::SessionController;
