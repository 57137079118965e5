//! HTTP middleware

pub mod auth;
pub mod security;

pub use auth::auth_middleware;
pub use security::security_headers_middleware;
