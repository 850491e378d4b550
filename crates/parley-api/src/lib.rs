//! Parley API crate - axum HTTP server, sessions, route handlers.
//!
//! Provides registration and login against the credential store, bearer
//! token sessions, and the chat and history endpoints that drive the
//! two-stage pipeline in `parley-chat`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
