/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */


use std::time::Duration;

use log::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{DistributedLockError, Result};
use crate::guard::LeaseGuard;
use crate::registry::{LeaseRecord, LeaseRegistry};
use crate::store::LeaseStore;

/// Named, expiring lock whose state lives entirely in a shared store.
///
/// The stored value of a lease key is the holder's expiry as a decimal string of
/// milliseconds since epoch. `DistributedLease` itself holds no per-caller state and
/// may be shared freely; ownership bookkeeping lives in a [`LeaseRegistry`] that
/// each caller keeps to itself, usually through a [`LeaseSession`].
#[derive(Debug)]
pub struct DistributedLease<S: LeaseStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    key_prefix: String,
}

impl<S: LeaseStore> DistributedLease<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: LeaseStore, C: Clock> DistributedLease<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            key_prefix: String::new(),
        }
    }

    /// Namespace every stored key with `prefix`. Registries keep the unprefixed key.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Start a new execution context with an empty registry.
    pub fn session(&self) -> LeaseSession<'_, S, C> {
        LeaseSession {
            lease: self,
            registry: LeaseRegistry::new(),
        }
    }

    /// Make one non-blocking attempt to take `key` for `lease_seconds`.
    ///
    /// On success the lease is recorded in `registry`. Losing to another holder is
    /// `Ok(false)`; only store failures on the correctness-bearing operations
    /// (set-if-absent, get, swap) come back as errors.
    pub fn try_acquire_in(&self, registry: &mut LeaseRegistry, key: &str, lease_seconds: u64) -> Result<bool> {
        let lease_millis = lease_millis(lease_seconds)?;
        let storage_key = self.storage_key(key);
        let now = self.clock.now_millis();
        let candidate = now
            .checked_add(lease_millis + 1)
            .ok_or_else(|| DistributedLockError::InvalidArgument(format!("lease of {} seconds overflows the clock", lease_seconds)))?
            .to_string();

        let acquired = if self.store.set_if_absent(&storage_key, &candidate)? {
            if let Err(e) = self.store.set_expiry_hint(&storage_key, lease_seconds) {
                warn!("Failed to set expiry hint on lease {}: {}", storage_key, e);
            }
            true
        } else {
            self.seize_if_expired(&storage_key, &candidate)?
        };

        if acquired {
            debug!("Acquired lease {} until {}", storage_key, candidate);
            registry.put(LeaseRecord::new(key, lease_millis, now));
        } else {
            debug!("Lease {} is held by another caller", storage_key);
        }
        Ok(acquired)
    }

    /// Give up `key` if `registry` says this caller still owns it.
    ///
    /// Nothing happens for keys the registry does not know, so calling this twice or
    /// after a failed acquire is harmless. When the declared duration has already run
    /// out the key is left alone, as it may belong to whoever seized it since.
    pub fn release_in(&self, registry: &mut LeaseRegistry, key: &str) {
        let Some(record) = registry.remove(key) else {
            return;
        };
        let storage_key = self.storage_key(key);
        if record.is_elapsed(self.clock.now_millis()) {
            debug!("Lease {} outlived its duration, leaving it to expire", storage_key);
            return;
        }
        match self.store.delete(&storage_key) {
            Ok(()) => debug!("Released lease {}", storage_key),
            Err(e) => warn!("Failed to delete lease {}, it will expire on its own: {}", storage_key, e),
        }
    }

    /// Expiry currently stored for `key`, whoever holds it.
    pub fn expiry_of(&self, key: &str) -> Result<Option<i64>> {
        let storage_key = self.storage_key(key);
        self.store
            .get(&storage_key)?
            .map(|value| parse_expiry(&storage_key, &value))
            .transpose()
    }

    fn seize_if_expired(&self, storage_key: &str, candidate: &str) -> Result<bool> {
        let Some(current) = self.store.get(storage_key)? else {
            // released between set-if-absent and get
            return Ok(false);
        };
        if !self.is_expired(parse_expiry(storage_key, &current)?) {
            return Ok(false);
        }

        if let Some(won) = self.store.compare_and_swap(storage_key, &current, candidate)? {
            if won {
                debug!("Seized expired lease {} by compare-and-swap", storage_key);
            }
            return Ok(won);
        }

        // Only the first swap among racing callers can still see an expired value.
        match self.store.swap(storage_key, candidate)? {
            Some(previous) => {
                // our candidate is already stored, so a bad previous value leaves the key blocked until it expires
                let previous_expiry = parse_expiry(storage_key, &previous).map_err(|e| {
                    warn!("Lease {} held an invalid value before the swap, it stays blocked until {}: {}", storage_key, candidate, e);
                    e
                })?;
                let won = self.is_expired(previous_expiry);
                if won {
                    debug!("Seized expired lease {} by swap", storage_key);
                }
                Ok(won)
            }
            None => Ok(false),
        }
    }

    fn is_expired(&self, expiry_millis: i64) -> bool {
        self.clock.now_millis() > expiry_millis
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn lease_millis(lease_seconds: u64) -> Result<i64> {
    if lease_seconds == 0 {
        return Err(DistributedLockError::InvalidArgument("lease duration must be at least one second".to_string()));
    }
    i64::try_from(lease_seconds)
        .ok()
        .and_then(|seconds| seconds.checked_mul(1000))
        .ok_or_else(|| DistributedLockError::InvalidArgument(format!("lease duration {} seconds is too large", lease_seconds)))
}

fn parse_expiry(storage_key: &str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| DistributedLockError::InvalidLeaseValue {
        key: storage_key.to_string(),
        value: value.to_string(),
    })
}

/// One execution context's view of a [`DistributedLease`].
///
/// The session owns its registry, so it can be moved to another thread or task but
/// never used from two at once.
#[derive(Debug)]
pub struct LeaseSession<'a, S: LeaseStore, C: Clock = SystemClock> {
    lease: &'a DistributedLease<S, C>,
    registry: LeaseRegistry,
}

impl<'a, S: LeaseStore, C: Clock> LeaseSession<'a, S, C> {
    pub fn try_acquire(&mut self, key: &str, lease_seconds: u64) -> Result<bool> {
        self.lease.try_acquire_in(&mut self.registry, key, lease_seconds)
    }

    pub fn release(&mut self, key: &str) {
        self.lease.release_in(&mut self.registry, key)
    }

    /// Keep trying for `key` up to `retry_times` attempts, sleeping `interval` in between.
    ///
    /// # Errors
    ///
    /// * `DistributedLockError::AcquireTimeout` - every attempt lost to another holder.
    /// * Store failures from any attempt are returned as is.
    pub fn acquire_with_retry(&mut self, key: &str, lease_seconds: u64, retry_times: u32, interval: Duration) -> Result<()> {
        let attempts = retry_times.max(1);
        for attempt in 1..=attempts {
            if self.try_acquire(key, lease_seconds)? {
                return Ok(());
            }
            debug!("Lease {} busy (attempt {}/{})", key, attempt, attempts);
            if attempt < attempts {
                std::thread::sleep(interval);
            }
        }
        Err(DistributedLockError::AcquireTimeout)
    }

    /// Single attempt that hands back a guard releasing `key` when dropped.
    pub fn guard(&mut self, key: &str, lease_seconds: u64) -> Result<Option<LeaseGuard<'_, 'a, S, C>>> {
        if self.try_acquire(key, lease_seconds)? {
            Ok(Some(LeaseGuard::new(self, key)))
        } else {
            Ok(None)
        }
    }

    /// Retrying counterpart of [`LeaseSession::guard`].
    pub fn guard_with_retry(&mut self, key: &str, lease_seconds: u64, retry_times: u32, interval: Duration) -> Result<LeaseGuard<'_, 'a, S, C>> {
        self.acquire_with_retry(key, lease_seconds, retry_times, interval)?;
        Ok(LeaseGuard::new(self, key))
    }

    pub fn holds(&self, key: &str) -> bool {
        self.registry.contains(key)
    }

    pub fn registry(&self) -> &LeaseRegistry {
        &self.registry
    }

    pub fn lease(&self) -> &'a DistributedLease<S, C> {
        self.lease
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MockLeaseStore;

    const START: i64 = 1_700_000_000_000;

    fn unavailable() -> DistributedLockError {
        DistributedLockError::CacheError(cache::RedisError::OperationError("connection refused".to_string()))
    }

    fn lease_with(store: MockLeaseStore) -> DistributedLease<MockLeaseStore, ManualClock> {
        DistributedLease::with_clock(store, ManualClock::new(START))
    }

    #[test]
    fn test_fresh_acquire_writes_expiry_and_hint() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent()
            .times(1)
            .returning(|key, value| {
                assert_eq!(key, "job:1");
                assert_eq!(value, (START + 5_001).to_string());
                Ok(true)
            });
        store.expect_set_expiry_hint()
            .times(1)
            .returning(|_, seconds| {
                assert_eq!(seconds, 5);
                Ok(())
            });
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(lease.try_acquire_in(&mut registry, "job:1", 5).unwrap());
        assert_eq!(registry.get("job:1"), Some(&LeaseRecord::new("job:1", 5_000, START)));
    }

    #[test]
    fn test_expiry_hint_failure_is_swallowed() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(true));
        store.expect_set_expiry_hint().returning(|_, _| Err(unavailable()));
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(lease.try_acquire_in(&mut registry, "k", 1).unwrap());
        assert!(registry.contains("k"));
    }

    #[test]
    fn test_set_if_absent_failure_propagates() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Err(unavailable()));
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        let result = lease.try_acquire_in(&mut registry, "k", 1);
        assert!(matches!(result, Err(DistributedLockError::CacheError(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_failure_propagates() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Err(unavailable()));
        let lease = lease_with(store);

        let result = lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 1);
        assert!(matches!(result, Err(DistributedLockError::CacheError(_))));
    }

    #[test]
    fn test_key_vanishing_before_get_loses_the_round() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(None));
        store.expect_swap().never();
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(!lease.try_acquire_in(&mut registry, "k", 1).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unexpired_holder_is_not_swapped() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START + 1).to_string())));
        store.expect_compare_and_swap().never();
        store.expect_swap().never();
        let lease = lease_with(store);

        assert!(!lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 1).unwrap());
    }

    #[test]
    fn test_expiry_equal_to_now_is_still_held() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some(START.to_string())));
        store.expect_swap().never();
        let lease = lease_with(store);

        assert!(!lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 1).unwrap());
    }

    #[test]
    fn test_swap_seizes_when_previous_value_still_expired() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(None));
        store.expect_swap()
            .times(1)
            .returning(|_, value| {
                assert_eq!(value, (START + 2_001).to_string());
                Ok(Some((START - 10).to_string()))
            });
        store.expect_set_expiry_hint().never();
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(lease.try_acquire_in(&mut registry, "k", 2).unwrap());
        assert!(registry.contains("k"));
    }

    #[test]
    fn test_swap_loses_when_another_caller_swapped_first() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(None));
        store.expect_swap().returning(|_, _| Ok(Some((START + 3_000).to_string())));
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(!lease.try_acquire_in(&mut registry, "k", 2).unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_swap_onto_missing_key_loses_the_round() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(None));
        store.expect_swap().returning(|_, _| Ok(None));
        let lease = lease_with(store);

        assert!(!lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 2).unwrap());
    }

    #[test]
    fn test_swap_failure_propagates() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(None));
        store.expect_swap().returning(|_, _| Err(unavailable()));
        let lease = lease_with(store);

        let result = lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 2);
        assert!(matches!(result, Err(DistributedLockError::CacheError(_))));
    }

    #[test]
    fn test_conditional_set_replaces_swap_when_supported() {
        let expired = (START - 10).to_string();
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        let current = expired.clone();
        store.expect_get().returning(move |_| Ok(Some(current.clone())));
        store.expect_compare_and_swap()
            .times(1)
            .returning(move |_, expected, value| {
                assert_eq!(expected, expired);
                assert_eq!(value, (START + 1_001).to_string());
                Ok(Some(true))
            });
        store.expect_swap().never();
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        assert!(lease.try_acquire_in(&mut registry, "k", 1).unwrap());
        assert!(registry.contains("k"));
    }

    #[test]
    fn test_conditional_set_lost_race() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(Some(false)));
        store.expect_swap().never();
        let lease = lease_with(store);

        assert!(!lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 1).unwrap());
    }

    #[test]
    fn test_garbage_lease_value_is_an_error() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some("locked".to_string())));
        let lease = lease_with(store);

        match lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 1) {
            Err(DistributedLockError::InvalidLeaseValue { key, value }) => {
                assert_eq!(key, "k");
                assert_eq!(value, "locked");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_value_returned_by_swap_is_an_error() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(false));
        store.expect_get().returning(|_| Ok(Some((START - 10).to_string())));
        store.expect_compare_and_swap().returning(|_, _, _| Ok(None));
        store.expect_swap().times(1).returning(|_, _| Ok(Some("garbage".to_string())));
        let lease = lease_with(store);
        let mut registry = LeaseRegistry::new();

        match lease.try_acquire_in(&mut registry, "k", 2) {
            Err(DistributedLockError::InvalidLeaseValue { key, value }) => {
                assert_eq!(key, "k");
                assert_eq!(value, "garbage");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_zero_duration_is_rejected_before_touching_the_store() {
        let store = MockLeaseStore::new();
        let lease = lease_with(store);

        let result = lease.try_acquire_in(&mut LeaseRegistry::new(), "k", 0);
        assert!(matches!(result, Err(DistributedLockError::InvalidArgument(_))));
    }

    #[test]
    fn test_oversized_duration_is_rejected() {
        let lease = lease_with(MockLeaseStore::new());
        let result = lease.try_acquire_in(&mut LeaseRegistry::new(), "k", u64::MAX);
        assert!(matches!(result, Err(DistributedLockError::InvalidArgument(_))));
    }

    #[test]
    fn test_delete_failure_on_release_is_swallowed() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(true));
        store.expect_set_expiry_hint().returning(|_, _| Ok(()));
        store.expect_delete().times(1).returning(|_| Err(unavailable()));
        let lease = lease_with(store);
        let mut session = lease.session();

        assert!(session.try_acquire("k", 1).unwrap());
        session.release("k");
        assert!(!session.holds("k"));
    }

    #[test]
    fn test_release_after_duration_does_not_delete() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().returning(|_, _| Ok(true));
        store.expect_set_expiry_hint().returning(|_, _| Ok(()));
        store.expect_delete().never();
        let lease = lease_with(store);
        let mut session = lease.session();

        assert!(session.try_acquire("k", 1).unwrap());
        lease.clock().advance(Duration::from_millis(1_000));
        session.release("k");
        assert!(!session.holds("k"));
    }

    #[test]
    fn test_release_of_unknown_key_touches_nothing() {
        let mut store = MockLeaseStore::new();
        store.expect_delete().never();
        let lease = lease_with(store);

        lease.session().release("never-acquired");
    }

    #[test]
    fn test_prefix_applies_to_store_but_not_registry() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent()
            .returning(|key, _| {
                assert_eq!(key, "lease:job");
                Ok(true)
            });
        store.expect_set_expiry_hint().returning(|_, _| Ok(()));
        store.expect_delete()
            .times(1)
            .returning(|key| {
                assert_eq!(key, "lease:job");
                Ok(())
            });
        let lease = lease_with(store).with_key_prefix("lease:");
        let mut session = lease.session();

        assert!(session.try_acquire("job", 3).unwrap());
        assert!(session.holds("job"));
        session.release("job");
    }

    #[test]
    fn test_retry_gives_up_with_timeout() {
        let mut store = MockLeaseStore::new();
        store.expect_set_if_absent().times(3).returning(|_, _| Ok(false));
        store.expect_get().times(3).returning(|_| Ok(Some((START + 60_000).to_string())));
        let lease = lease_with(store);
        let mut session = lease.session();

        let result = session.acquire_with_retry("k", 1, 3, Duration::from_millis(1));
        assert!(matches!(result, Err(DistributedLockError::AcquireTimeout)));
    }

    #[test]
    fn test_expiry_of_reads_stored_value() {
        let mut store = MockLeaseStore::new();
        store.expect_get()
            .returning(|key| Ok(if key == "held" { Some("1234".to_string()) } else { None }));
        let lease = lease_with(store);

        assert_eq!(lease.expiry_of("held").unwrap(), Some(1234));
        assert_eq!(lease.expiry_of("free").unwrap(), None);
    }
}
