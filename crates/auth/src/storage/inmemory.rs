//! In-memory auth storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use oidcrp_core::auth::{AuthFlowState, AuthStorage, Result, StoredTokens};

#[derive(Debug, Default)]
struct Inner {
    tokens: Option<StoredTokens>,
    user_data: Option<serde_json::Value>,
    session_state: Option<String>,
    auth_flows: HashMap<String, AuthFlowState>,
}

/// In-memory auth storage for headless hosts and testing.
///
/// Data is not persisted and will be lost when the last clone is dropped.
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryAuthStorage {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves plain data behind, so keep going.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AuthStorage for InMemoryAuthStorage {
    fn read_tokens(&self) -> Result<Option<StoredTokens>> {
        Ok(self.read().tokens.clone())
    }

    fn write_tokens(&self, tokens: &StoredTokens) -> Result<()> {
        self.write().tokens = Some(tokens.clone());
        Ok(())
    }

    fn read_user_data(&self) -> Result<Option<serde_json::Value>> {
        Ok(self.read().user_data.clone())
    }

    fn write_user_data(&self, data: &serde_json::Value) -> Result<()> {
        self.write().user_data = Some(data.clone());
        Ok(())
    }

    fn read_session_state(&self) -> Result<Option<String>> {
        Ok(self.read().session_state.clone())
    }

    fn write_session_state(&self, session_state: Option<&str>) -> Result<()> {
        self.write().session_state = session_state.map(String::from);
        Ok(())
    }

    fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        self.write()
            .auth_flows
            .insert(state.to_string(), flow.clone());
        Ok(())
    }

    fn peek_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        Ok(self.read().auth_flows.get(state).cloned())
    }

    fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        Ok(self.write().auth_flows.remove(state))
    }

    fn clear_auth_data(&self) -> Result<()> {
        let mut inner = self.write();
        inner.tokens = None;
        inner.user_data = None;
        inner.session_state = None;
        Ok(())
    }
}
