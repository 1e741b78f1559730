//! Backend access: REST calls, credentials, and their errors.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{AuthContext, AuthStore, StoredAuth};
pub use client::{ApiClient, LoadedPage, USER_AGENT};
pub use error::{ClientError, ClientErrorKind, ClientResult};
