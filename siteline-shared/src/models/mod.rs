/// Data models for Siteline
///
/// # Models
///
/// - `user`: User identity records, roles, and the sanitized view returned to callers

pub mod user;
