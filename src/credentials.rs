//! Credential pool with round-robin selection and per-credential quota tracking.

use crate::config::CredentialConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// One provider account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Account identifier (the Scamalytics API user).
    pub id: String,
    /// API key.
    pub secret: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

// Keep the key out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl From<&CredentialConfig> for Credential {
    fn from(config: &CredentialConfig) -> Self {
        Credential::new(config.user.clone(), config.api_key.clone())
    }
}

/// Error building a pool.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("at least one credential must be configured")]
    Empty,
    #[error("duplicate credential identifier: {0}")]
    Duplicate(String),
}

#[derive(Debug)]
struct PoolState {
    next: usize,
    /// Remaining quota per credential, indexed like `credentials`. `None` = not yet observed.
    quota: Vec<Option<u64>>,
}

/// Thread-safe round-robin credential pool.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    index: HashMap<String, usize>,
    state: Mutex<PoolState>,
}

impl CredentialPool {
    /// Create a pool over `credentials`, preserving their order.
    pub fn new(credentials: Vec<Credential>) -> Result<Self, PoolError> {
        if credentials.is_empty() {
            return Err(PoolError::Empty);
        }

        let mut index = HashMap::with_capacity(credentials.len());
        for (i, credential) in credentials.iter().enumerate() {
            if index.insert(credential.id.clone(), i).is_some() {
                return Err(PoolError::Duplicate(credential.id.clone()));
            }
        }

        let quota = vec![None; credentials.len()];
        Ok(Self {
            credentials,
            index,
            state: Mutex::new(PoolState { next: 0, quota }),
        })
    }

    // Every update is a single store, so a poisoned state is still valid.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next credential in round-robin order.
    pub fn next(&self) -> Credential {
        let i = {
            let mut state = self.lock();
            let i = state.next;
            state.next = (i + 1) % self.credentials.len();
            i
        };
        let credential = self.credentials[i].clone();
        debug!(credential = %credential.id, "Selected credential");
        credential
    }

    /// Overwrite the remaining quota for `id`. Last write wins.
    pub fn record_quota(&self, id: &str, remaining: u64) {
        let Some(&i) = self.index.get(id) else {
            warn!(credential = %id, "Quota reported for unknown credential");
            return;
        };
        self.lock().quota[i] = Some(remaining);
        debug!(credential = %id, remaining, "Recorded quota");
    }

    /// Last observed quota for `id`, if any.
    pub fn remaining(&self, id: &str) -> Option<u64> {
        let i = *self.index.get(id)?;
        self.lock().quota[i]
    }

    /// Sum of all known quota values; unknown entries count as zero.
    pub fn total_remaining(&self) -> u64 {
        self.lock().quota.iter().flatten().sum()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false: `new` rejects an empty pool. Pairs with `len`.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pool(n: usize) -> CredentialPool {
        let credentials = (0..n)
            .map(|i| Credential::new(format!("user{}", i), format!("key{}", i)))
            .collect();
        CredentialPool::new(credentials).unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert_eq!(CredentialPool::new(vec![]).unwrap_err(), PoolError::Empty);
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = CredentialPool::new(vec![
            Credential::new("a", "1"),
            Credential::new("a", "2"),
        ]);
        assert_eq!(result.unwrap_err(), PoolError::Duplicate("a".to_string()));
    }

    #[test]
    fn test_round_robin_order_and_wrap() {
        for n in 1..=5 {
            let pool = pool(n);
            assert_eq!(pool.len(), n);
            assert!(!pool.is_empty());
            for i in 0..n {
                assert_eq!(pool.next().id, format!("user{}", i));
            }
            assert_eq!(pool.next().id, "user0");
        }
    }

    #[test]
    fn test_total_remaining_unknown_is_zero() {
        let pool = pool(3);
        assert_eq!(pool.total_remaining(), 0);
        assert_eq!(pool.remaining("user1"), None);

        pool.record_quota("user1", 900);
        assert_eq!(pool.remaining("user1"), Some(900));
        assert_eq!(pool.total_remaining(), 900);

        pool.record_quota("user2", 100);
        assert_eq!(pool.total_remaining(), 1000);
    }

    #[test]
    fn test_record_quota_last_write_wins() {
        let pool = pool(2);
        pool.record_quota("user0", 500);
        pool.record_quota("user0", 499);
        pool.record_quota("user0", 499);
        assert_eq!(pool.total_remaining(), 499);
    }

    #[test]
    fn test_record_quota_unknown_id_ignored() {
        let pool = pool(1);
        pool.record_quota("nobody", 10);
        assert_eq!(pool.total_remaining(), 0);
        assert_eq!(pool.remaining("nobody"), None);
    }

    #[test]
    fn test_credential_debug_redacts_secret() {
        let rendered = format!("{:?}", Credential::new("user", "s3cret"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_concurrent_next_is_fair() {
        let pool = Arc::new(pool(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || (0..100).map(|_| pool.next().id).collect::<Vec<_>>())
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                *counts.entry(id).or_default() += 1;
            }
        }

        // 800 selections over 4 credentials: each one exactly 200 times.
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 200));
    }
}
