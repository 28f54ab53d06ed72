//! Functional core for the oidcrp relying-party client.
//!
//! Everything here is free of I/O: configuration model and validation, the
//! error taxonomy, the collaborator traits the orchestrator is composed from,
//! and pure helpers for callback URLs and token expiry.

pub mod auth;
pub mod config;
