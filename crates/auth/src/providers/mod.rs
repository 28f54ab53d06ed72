//! OIDC provider implementations.
//!
//! This module contains implementations of `OidcProviderClient` for:
//! - Any discovery-capable issuer (openidconnect)
//! - The Mock IdP (with `mock` feature)

#[cfg(feature = "mock")]
mod mock;
mod openid;

#[cfg(feature = "mock")]
pub use mock::{MockProvider, MockUser};
pub use openid::{new_pkce_pair, OpenIdProvider};
