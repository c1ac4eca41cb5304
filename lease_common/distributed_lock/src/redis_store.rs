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

use cache::client::RedisClient;
use redis::Script;

use super::config::LockConfig;
use super::error::Result;
use super::scripts::COMPARE_AND_SWAP;
use super::store::LeaseStore;

/// Lease store backed by Redis `SETNX`, `EXPIRE`, `GET`, `GETSET` and `DEL`
#[derive(Debug, Clone)]
pub struct RedisLeaseStore {
    client: RedisClient,
    cas_script: Option<Script>,
}

impl RedisLeaseStore {
    /// Create a store on the shared RedisClient instance
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(RedisClient::get_instance()?))
    }

    pub fn with_client(client: RedisClient) -> Self {
        Self {
            client,
            cas_script: None,
        }
    }

    /// Build a store from `config`.
    ///
    /// An explicit `redis_url` always gets its own client; only without one is the
    /// shared `REDIS_URL` instance used.
    pub fn from_config(config: &LockConfig) -> Result<Self> {
        let client = match config.redis_url.as_deref() {
            Some(url) => RedisClient::open(url)?,
            None => RedisClient::get_instance()?,
        };
        Ok(Self::with_client(client).with_compare_and_swap(config.compare_and_swap))
    }

    /// Seize expired leases with a Lua conditional set instead of `GETSET`
    pub fn with_compare_and_swap(mut self, enabled: bool) -> Self {
        self.cas_script = enabled.then(|| Script::new(COMPARE_AND_SWAP));
        self
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

impl LeaseStore for RedisLeaseStore {
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        Ok(self.client.set_nx(key, value)?)
    }

    fn set_expiry_hint(&self, key: &str, seconds: u64) -> Result<()> {
        self.client.expire(key, Duration::from_secs(seconds))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.client.get(key)?)
    }

    fn swap(&self, key: &str, value: &str) -> Result<Option<String>> {
        Ok(self.client.get_set(key, value)?)
    }

    fn delete(&self, key: &str) -> Result<()> {
        Ok(self.client.del(key)?)
    }

    fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<Option<bool>> {
        let Some(script) = self.cas_script.as_ref() else {
            return Ok(None);
        };
        let mut conn = self.client.get_connection()?;
        let result: i32 = script.key(key).arg(expected).arg(value).invoke(&mut conn)?;
        Ok(Some(result == 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DistributedLockError;
    use crate::lease::DistributedLease;
    use redis::ConnectionAddr;
    use serial_test::serial;

    // Nothing listens on port 1, so every command fails to connect.
    fn unreachable_store() -> RedisLeaseStore {
        RedisLeaseStore::with_client(RedisClient::open("redis://127.0.0.1:1/").unwrap())
    }

    #[test]
    fn test_unreachable_store_surfaces_acquire_error() {
        let lease = DistributedLease::new(unreachable_store());
        let mut session = lease.session();

        let result = session.try_acquire("job:1", 5);
        assert!(matches!(result, Err(DistributedLockError::CacheError(_))));
        assert!(!session.holds("job:1"));
    }

    #[test]
    fn test_release_against_unreachable_store_is_quiet() {
        let lease = DistributedLease::new(unreachable_store());
        lease.session().release("job:1");
    }

    #[test]
    #[serial]
    fn test_configured_url_wins_over_shared_instance() {
        std::env::set_var("REDIS_URL", "redis://10.0.0.1:6379/");
        let shared = RedisClient::get_instance().unwrap();
        std::env::remove_var("REDIS_URL");

        let config = LockConfig {
            redis_url: Some("redis://10.0.0.2:6380/".to_string()),
            ..LockConfig::default()
        };
        let store = RedisLeaseStore::from_config(&config).unwrap();
        assert_eq!(
            store.client().get_connection_info().addr,
            ConnectionAddr::Tcp("10.0.0.2".to_string(), 6380)
        );
        assert_ne!(store.client().get_connection_info().addr, shared.get_connection_info().addr);
    }

    #[test]
    fn test_compare_and_swap_is_opt_in() {
        let store = unreachable_store();
        assert_eq!(store.compare_and_swap("k", "1", "2").unwrap(), None);

        let store = store.with_compare_and_swap(true);
        assert!(matches!(store.compare_and_swap("k", "1", "2"), Err(DistributedLockError::RedisError(_))));
    }
}
