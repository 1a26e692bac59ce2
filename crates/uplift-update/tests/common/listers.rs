//! In-memory ref listers

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uplift_update::{RefLister, RemoteRef, ResolveError};

/// Ref lister returning a fixed list
#[derive(Debug, Default)]
pub struct StaticRefLister {
    refs: Vec<RemoteRef>,
    fail: bool,
    calls: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
}

impl StaticRefLister {
    /// Lister with no refs
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag
    pub fn tag(mut self, name: &str, commit: &str) -> Self {
        self.refs.push(RemoteRef::tag(name, commit));
        self
    }

    /// Add a branch
    pub fn branch(mut self, name: &str, commit: &str) -> Self {
        self.refs.push(RemoteRef::branch(name, commit));
        self
    }

    /// Fail every listing
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of listings made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens passed to each listing
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    /// Wrap for the updater
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl RefLister for StaticRefLister {
    async fn list_refs(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<Vec<RemoteRef>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.map(str::to_string));

        if self.fail {
            return Err(ResolveError::transport(url, "connection refused"));
        }
        Ok(self.refs.clone())
    }
}
