//! HTTP surface of the short-link service.
//!
//! Management endpoints live under `/v1/links`; `GET /{code}` redirects.

pub mod app;
pub mod client_ip;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;
pub mod sweeper;
pub mod telemetry;

pub use app::App;
pub use error::AppError;
pub use state::AppState;
