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


use log::debug;

use crate::clock::Clock;
use crate::lease::LeaseSession;
use crate::store::LeaseStore;

/// Releases its lease when dropped, the way a `finally` block would.
pub struct LeaseGuard<'s, 'a, S: LeaseStore, C: Clock> {
    session: &'s mut LeaseSession<'a, S, C>,
    key: String,
}

impl<'s, 'a, S: LeaseStore, C: Clock> LeaseGuard<'s, 'a, S, C> {
    pub(crate) fn new(session: &'s mut LeaseSession<'a, S, C>, key: &str) -> Self {
        Self {
            session,
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Expiry this guard's lease was granted, as remembered by the session.
    pub fn expires_at_millis(&self) -> Option<i64> {
        self.session
            .registry()
            .get(&self.key)
            .map(|record| record.acquired_at_millis() + record.lease_duration_millis())
    }
}

impl<S: LeaseStore, C: Clock> Drop for LeaseGuard<'_, '_, S, C> {
    fn drop(&mut self) {
        debug!("Dropping guard for lease {}", self.key);
        self.session.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::clock::ManualClock;
    use crate::lease::DistributedLease;
    use crate::memory_store::MemoryLeaseStore;

    #[test]
    fn test_guard_releases_on_drop() {
        let lease = DistributedLease::with_clock(MemoryLeaseStore::new(), ManualClock::new(10_000));
        let mut session = lease.session();
        {
            let guard = session.guard("report", 5).unwrap().expect("lease should be free");
            assert_eq!(guard.key(), "report");
            assert_eq!(guard.expires_at_millis(), Some(15_000));
            assert!(lease.store().value_of("report").is_some());
        }
        assert!(lease.store().value_of("report").is_none());
        assert!(!session.holds("report"));
    }

    #[test]
    fn test_guard_is_none_while_another_session_holds() {
        let lease = DistributedLease::with_clock(MemoryLeaseStore::new(), ManualClock::new(10_000));
        let mut holder = lease.session();
        let mut other = lease.session();
        assert!(holder.try_acquire("report", 5).unwrap());

        assert!(other.guard("report", 5).unwrap().is_none());
        assert!(lease.store().value_of("report").is_some());
    }

    #[test]
    fn test_guard_with_retry_waits_out_a_crashed_holder() {
        let clock = ManualClock::new(10_000);
        let lease = DistributedLease::with_clock(MemoryLeaseStore::new(), clock.clone());
        let mut crashed = lease.session();
        assert!(crashed.try_acquire("report", 1).unwrap());
        clock.advance(Duration::from_millis(1_002));

        let mut session = lease.session();
        let guard = session
            .guard_with_retry("report", 1, 3, Duration::from_millis(1))
            .unwrap();
        assert_eq!(guard.expires_at_millis(), Some(12_002));
    }
}
