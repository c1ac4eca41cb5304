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

use parking_lot::Mutex;

use crate::error::Result;
use crate::store::LeaseStore;

#[derive(Debug, Default)]
struct Entries {
    values: HashMap<String, String>,
    expiry_hints: HashMap<String, u64>,
}

/// Process-local lease store. Every operation runs under one mutex, which makes
/// each of them atomic the same way a single-threaded key-value server would.
///
/// Expiry hints are remembered but never enforced.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    entries: Mutex<Entries>,
    compare_and_swap: bool,
}

impl MemoryLeaseStore {
    /// Store limited to set-if-absent, get, swap and delete.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that also offers a conditional set.
    pub fn with_compare_and_swap() -> Self {
        Self {
            compare_and_swap: true,
            ..Self::default()
        }
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        self.entries.lock().values.get(key).cloned()
    }

    pub fn expiry_hint_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().expiry_hints.get(key).copied()
    }

    /// Write `value` directly, as a foreign writer would.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries.lock().values.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        if entries.values.contains_key(key) {
            return Ok(false);
        }
        entries.values.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn set_expiry_hint(&self, key: &str, seconds: u64) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.values.contains_key(key) {
            entries.expiry_hints.insert(key.to_string(), seconds);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value_of(key))
    }

    fn swap(&self, key: &str, value: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        // a plain write drops any pending expiry, as GETSET does
        entries.expiry_hints.remove(key);
        Ok(entries.values.insert(key.to_string(), value.to_string()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.values.remove(key);
        entries.expiry_hints.remove(key);
        Ok(())
    }

    fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<Option<bool>> {
        if !self.compare_and_swap {
            return Ok(None);
        }
        let mut entries = self.entries.lock();
        if entries.values.get(key).map(String::as_str) != Some(expected) {
            return Ok(Some(false));
        }
        entries.values.insert(key.to_string(), value.to_string());
        entries.expiry_hints.remove(key);
        Ok(Some(true))
    }
}
