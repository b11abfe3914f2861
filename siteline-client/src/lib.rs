//! # Siteline Client Library
//!
//! Typed HTTP client for the Siteline API.
//!
//! Tokens live in a [`Credentials`] value owned by the caller and passed to
//! each call; the client itself holds no session state. Any `401` response
//! clears the credentials, so callers can check
//! [`Credentials::is_authenticated`] to decide when to send the user back to
//! login.
//!
//! ## Example
//!
//! ```no_run
//! use siteline_client::{ApiClient, Credentials};
//!
//! # async fn example() -> Result<(), siteline_client::ClientError> {
//! let client = ApiClient::new("http://localhost:3001");
//! let mut credentials = Credentials::new();
//!
//! client.login(&mut credentials, "alice@x.com", "Passw0rd1").await?;
//! let me = client.me(&mut credentials).await?;
//! println!("Logged in as {}", me.email);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod credentials;
pub mod error;

pub use client::ApiClient;
pub use credentials::Credentials;
pub use error::{ClientError, ClientResult};
