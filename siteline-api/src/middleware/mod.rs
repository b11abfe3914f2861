/// Middleware modules for the API server
///
/// Authentication middleware lives in `siteline_shared::auth::middleware`.

pub mod security;
