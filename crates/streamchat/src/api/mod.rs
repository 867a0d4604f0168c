//! HTTP API module.
//!
//! Serves the overlay widget, the viewer WebSocket and a small admin surface.

mod error;
mod handlers;
mod routes;
mod state;
mod ws;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::HealthResponse;
pub use routes::create_router;
pub use state::{AppState, ViewerSettings};
