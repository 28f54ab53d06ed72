//! oidcrp_client - command-line relying party for OpenID Connect providers.

pub mod cli;
pub mod error;
pub mod output;
pub mod session;

pub use error::{ClientError, Result};
