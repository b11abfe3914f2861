/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, refresh, OAuth callback, current user
/// - `users`: Account administration

pub mod auth;
pub mod health;
pub mod users;
