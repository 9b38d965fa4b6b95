//! Pending remote signature requests
//!
//! Each request is keyed by the device asked, the address and signing path,
//! and the digest being signed. A second request for the same key joins the
//! pending one instead of dispatching again.

use crate::core::SigningPath;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{oneshot, Mutex};

/// Correlation key of a remote signature request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    pub device_address: String,
    pub address: String,
    pub signing_path: SigningPath,
    /// Base64 of the digest to sign
    pub digest: String,
}

impl SignatureKey {
    pub fn new(
        device_address: &str,
        address: &str,
        signing_path: &SigningPath,
        digest: &str,
    ) -> Self {
        Self {
            device_address: device_address.to_string(),
            address: address.to_string(),
            signing_path: signing_path.clone(),
            digest: digest.to_string(),
        }
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signature-{}-{}-{}-{}",
            self.device_address, self.address, self.signing_path, self.digest
        )
    }
}

#[derive(Debug)]
struct PendingSignature {
    requested_at: DateTime<Utc>,
    waiters: Vec<oneshot::Sender<String>>,
}

/// Table of outstanding remote signature requests
#[derive(Debug, Default)]
pub struct SignatureRequests {
    pending: Mutex<HashMap<SignatureKey, PendingSignature>>,
}

impl SignatureRequests {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Wait on `key`. The flag is true when this call created the request,
    /// meaning the caller must dispatch the sign offer.
    pub async fn register(&self, key: SignatureKey) -> (oneshot::Receiver<String>, bool) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        match pending.get_mut(&key) {
            Some(entry) => {
                log::debug!("Joining pending request {}", key);
                entry.waiters.push(tx);
                (rx, false)
            }
            None => {
                pending.insert(
                    key,
                    PendingSignature {
                        requested_at: Utc::now(),
                        waiters: vec![tx],
                    },
                );
                (rx, true)
            }
        }
    }

    /// Complete a request with a signature or the refusal sentinel.
    ///
    /// Returns the number of waiters notified; zero when nothing was pending
    /// for the key.
    pub async fn resolve(&self, key: &SignatureKey, signature: &str) -> usize {
        let entry = self.pending.lock().await.remove(key);
        let Some(entry) = entry else {
            log::debug!("No pending request for {}", key);
            return 0;
        };

        let waited = Utc::now() - entry.requested_at;
        log::debug!(
            "Resolved {} after {}ms",
            key,
            waited.num_milliseconds()
        );

        entry
            .waiters
            .into_iter()
            .filter_map(|tx| tx.send(signature.to_string()).ok())
            .count()
    }

    /// Forget waiters whose receivers are gone, dropping the request once
    /// nobody waits on it. Returns true when the request was dropped.
    pub async fn abandon(&self, key: &SignatureKey) -> bool {
        let mut pending = self.pending.lock().await;
        let Some(entry) = pending.get_mut(key) else {
            return false;
        };
        entry.waiters.retain(|tx| !tx.is_closed());
        if entry.waiters.is_empty() {
            pending.remove(key);
            return true;
        }
        log::debug!("{} still has {} waiters", key, entry.waiters.len());
        false
    }

    /// Drop a request; its waiters observe a closed channel
    pub async fn cancel(&self, key: &SignatureKey) -> bool {
        self.pending.lock().await.remove(key).is_some()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Keys of outstanding requests, oldest first
    pub async fn pending_keys(&self) -> Vec<SignatureKey> {
        let pending = self.pending.lock().await;
        let mut keys: Vec<(&SignatureKey, DateTime<Utc>)> = pending
            .iter()
            .map(|(key, entry)| (key, entry.requested_at))
            .collect();
        keys.sort_by_key(|(_, at)| *at);
        keys.into_iter().map(|(key, _)| key.clone()).collect()
    }
}
