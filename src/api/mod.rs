//! Typed helpers over marketplace endpoints.

pub mod auth;

pub use auth::AuthApi;
