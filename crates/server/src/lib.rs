//! HTTP server for the talkstream reply pipeline

pub mod http;
pub mod state;
pub mod stream;

pub use http::create_router;
pub use state::AppState;
