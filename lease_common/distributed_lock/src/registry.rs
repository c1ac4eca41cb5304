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


use std::collections::HashMap;

/// What one caller remembers about a lease it acquired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    key: String,
    lease_duration_millis: i64,
    acquired_at_millis: i64,
}

impl LeaseRecord {
    pub fn new(key: impl Into<String>, lease_duration_millis: i64, acquired_at_millis: i64) -> Self {
        Self {
            key: key.into(),
            lease_duration_millis,
            acquired_at_millis,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lease_duration_millis(&self) -> i64 {
        self.lease_duration_millis
    }

    pub fn acquired_at_millis(&self) -> i64 {
        self.acquired_at_millis
    }

    /// Whether the declared duration has run out at `now_millis`.
    /// Past this point another caller may already have seized the lease.
    pub fn is_elapsed(&self, now_millis: i64) -> bool {
        now_millis - self.acquired_at_millis >= self.lease_duration_millis
    }
}

/// Leases held by a single execution context.
///
/// A registry belongs to exactly one logical caller and must not be shared:
/// `release` trusts it to tell whether this caller still owns a key.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    records: HashMap<String, LeaseRecord>,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record`, returning the record it replaced for the same key, if any.
    pub fn put(&mut self, record: LeaseRecord) -> Option<LeaseRecord> {
        self.records.insert(record.key.clone(), record)
    }

    pub fn remove(&mut self, key: &str) -> Option<LeaseRecord> {
        self.records.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&LeaseRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
