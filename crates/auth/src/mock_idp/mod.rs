//! Mock Identity Provider for testing.
//!
//! Provides a fake OpenID provider for local development and integration tests.

mod server;
mod templates;

pub use server::MockIdpServer;
