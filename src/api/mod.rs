//! HTTP interface for the matchmaking service

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, ApiServer, ApiServerConfig};
