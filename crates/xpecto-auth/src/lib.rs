//! Identity establishment and session credentials for Xpecto.
//!
//! - [`google`] verifies Google ID tokens and exchanges OAuth codes.
//! - [`resolver`] turns a verified assertion (or local credentials) into a
//!   stored [`Identity`](xpecto_core::identity::Identity), merging by email.
//! - [`session`] mints and checks the HS256 session token and describes the
//!   cookie that carries it.

pub mod error;
pub mod google;
pub mod password;
pub mod resolver;
pub mod session;

pub use error::{AuthError, SessionError};
pub use google::{GoogleConfig, GoogleVerifier, IdTokenClaims, IdTokenVerifier};
pub use resolver::IdentityResolver;
pub use session::{CookiePolicy, SameSite, SessionClaims, SessionIssuer};
