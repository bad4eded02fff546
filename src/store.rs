// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared-secret persistence boundary.
//!
//! The server only needs a key-value lookup keyed by username; anything that
//! can answer [`SecretStore`] can back it.  Reads and upserts may run
//! concurrently; last write wins per key.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::server::StunError;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up the shared secret issued to `username`.
    async fn shared_secret(&self, username: &str) -> Result<Option<String>, StunError>;

    /// Persist (or replace) the shared secret for `username`.
    async fn set_shared_secret(&self, username: &str, secret: &str) -> Result<(), StunError>;
}

/// An in-process [`SecretStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn shared_secret(&self, username: &str) -> Result<Option<String>, StunError> {
        let secrets = self.secrets.lock().map_err(|_| StunError::ServerError)?;
        Ok(secrets.get(username).cloned())
    }

    async fn set_shared_secret(&self, username: &str, secret: &str) -> Result<(), StunError> {
        let mut secrets = self.secrets.lock().map_err(|_| StunError::ServerError)?;
        secrets.insert(username.to_owned(), secret.to_owned());
        Ok(())
    }
}
