//! # Auth Module
//!
//! HTTP surface of the identity core:
//! - Email/password sign-up and sign-in
//! - OAuth consent-URL and callback endpoints
//! - Email verification and password change
//! - CurrentSession extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::CurrentSession;
pub use routes::auth_routes;
