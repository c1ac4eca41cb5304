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


use std::ops::{Deref, DerefMut};
use std::time::Duration;
use redis::Commands;
use crate::client::RedisClient;
use crate::error::RedisError;

impl RedisClient {
    /// Sets a key in Redis if it does not already exist (`SETNX`).
    ///
    /// # Arguments
    ///
    /// * `key` - The key to set.
    /// * `value` - The value to store.
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` when the key was created, `Ok(false)` when it was already present.
    ///
    /// # Errors
    ///
    /// * `RedisError::ConnectionError` - If there is an error talking to Redis.
    pub fn set_nx(&self, key: &str, value: &str) -> Result<bool, RedisError> {
        let mut conn = self.client.get_connection()
            .map_err(RedisError::ConnectionError)?;
        conn.set_nx(key, value)
            .map_err(RedisError::ConnectionError)
    }

    /// Sets the expiration time for a key in Redis (`EXPIRE`).
    ///
    /// # Arguments
    ///
    /// * `key` - The key to set the expiration for.
    /// * `ttl` - The expiration time, truncated to whole seconds.
    ///
    /// # Returns
    ///
    /// Returns `Ok(bool)` indicating whether the expiration was set.
    pub fn expire(&self, key: &str, ttl: Duration) -> Result<bool, RedisError> {
        let mut conn = self.client.get_connection()
            .map_err(RedisError::ConnectionError)?;
        conn.expire(key, ttl.as_secs() as usize)
            .map_err(RedisError::ConnectionError)
    }

    /// Gets the value for a given key from Redis.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key does not exist.
    pub fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut conn = self.client.get_connection()
            .map_err(RedisError::ConnectionError)?;
        conn.get(key)
            .map_err(RedisError::ConnectionError)
    }

    /// Atomically replaces the value of a key and returns the previous one (`GETSET`).
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key did not exist before the write.
    pub fn get_set(&self, key: &str, value: &str) -> Result<Option<String>, RedisError> {
        let mut conn = self.client.get_connection()
            .map_err(RedisError::ConnectionError)?;
        conn.getset(key, value)
            .map_err(RedisError::ConnectionError)
    }

    /// Deletes a key from Redis. Deleting a missing key is not an error.
    pub fn del(&self, key: &str) -> Result<(), RedisError> {
        let mut conn = self.client.get_connection()
            .map_err(RedisError::ConnectionError)?;
        conn.del(key)
            .map_err(RedisError::ConnectionError)
    }
}

impl Deref for RedisClient {
    type Target = redis::Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl DerefMut for RedisClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}
