mod http;

pub use http::{router, start_http_server, HttpState};
