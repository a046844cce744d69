//! HTTP gateway: document upload, question answering (plain and SSE) and health.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::GatewayServer;
