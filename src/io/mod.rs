//! IO modules - external system interfaces
//!
//! - `postgrest` - REST client for the hosted subscriber table
//! - `http` - landing page HTTP server, session API and Prometheus endpoint
//! - `render` - server-side HTML for the landing page

pub mod http;
pub mod postgrest;
pub mod render;

// Re-export commonly used types
pub use http::{start_http_server, AppState};
pub use postgrest::PostgrestStore;
