//! Request-scoped identity storage.
//!
//! Every inbound request gets its own [`IdentityContext`]. The host runs the
//! downstream call inside [`IdentityContext::scope`], which makes the context
//! reachable through [`IdentityContext::current`] for the lifetime of that
//! task and clears it when the call finishes, fails or is dropped.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use gatekeeper_core::{SecurityError, SecurityResult};

use crate::authority::AuthoritySet;
use crate::identity::Identity;

/// Context key holding the verified subject.
pub const KEY_SUBJECT: &str = "subject";
/// Claim / context key holding the numeric user id.
pub const KEY_USER_ID: &str = "userid";
/// Claim / context key holding the display name.
pub const KEY_USER_NAME: &str = "name";
/// Claim / context key holding the account name.
pub const KEY_ACCOUNT: &str = "account";

tokio::task_local! {
    static CURRENT: IdentityContext;
}

#[derive(Debug, Default)]
struct ContextState {
    values: BTreeMap<String, String>,
    identity: Option<Identity>,
}

/// String → string identity map bound to one request.
///
/// Cloning yields a handle to the same request's state.
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    state: Arc<RwLock<ContextState>>,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context of the request the calling task is serving, if any.
    pub fn current() -> Option<IdentityContext> {
        CURRENT.try_with(Clone::clone).ok()
    }

    /// Run `fut` with this context installed as the current one.
    ///
    /// The context is cleared once `fut` resolves, and also when the returned
    /// future is dropped before completion (aborted request).
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        let _guard = ClearOnDrop(self.clone());
        CURRENT.scope(self, fut).await
    }

    /// Install the authenticated identity. A context is populated at most once.
    pub fn populate(&self, identity: Identity) -> SecurityResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.identity.is_some() {
            return Err(SecurityError::internal(
                "identity context already populated for this request",
            ));
        }
        state
            .values
            .insert(KEY_SUBJECT.to_string(), identity.subject().to_string());
        for (key, value) in identity.claims() {
            state.values.entry(key.clone()).or_insert_with(|| value.clone());
        }
        state.identity = Some(identity);
        Ok(())
    }

    /// Merge raw values into the context.
    pub fn set<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in values {
            state.values.insert(key.into(), value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values
            .get(key)
            .cloned()
    }

    /// Parse the value under `key`, falling back to `default` when it is
    /// absent or does not parse.
    pub fn get_typed<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn subject(&self) -> Option<String> {
        self.get(KEY_SUBJECT)
    }

    /// Numeric user id, `0` when absent.
    pub fn user_id(&self) -> i64 {
        self.get_typed(KEY_USER_ID, 0)
    }

    pub fn user_name(&self) -> Option<String> {
        self.get(KEY_USER_NAME)
    }

    pub fn account(&self) -> Option<String> {
        self.get(KEY_ACCOUNT)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .identity
            .clone()
    }

    pub fn authorities(&self) -> AuthoritySet {
        self.identity()
            .map(|i| i.authorities().clone())
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .identity
            .is_some()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.values.is_empty() && state.identity.is_none()
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.values.clear();
        state.identity = None;
    }
}

struct ClearOnDrop(IdentityContext);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.clear();
    }
}
