//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for every credential the proxy
//! handles: the provider OAuth client secret and the bearer token it
//! exchanges for.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` and holds one is safe to pass to `tracing`. Reading the
//! value requires an explicit `expose_secret()` call.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ProviderCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = ProviderCredentials {
//!     client_id: "abc123".to_string(),
//!     client_secret: SecretString::from("shh"),
//! };
//!
//! // client_secret is redacted
//! println!("{:?}", creds);
//!
//! let secret: &str = creds.client_secret.expose_secret();
//! assert_eq!(secret, "shh");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
