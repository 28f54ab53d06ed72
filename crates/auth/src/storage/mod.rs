//! `AuthStorage` implementations.
//!
//! Only an in-memory store ships here; hosts with real persistence
//! (browser storage, keychains, files) implement the trait themselves.

mod inmemory;

pub use inmemory::InMemoryAuthStorage;
