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


use std::sync::Arc;

use mockall::automock;

use crate::error::Result;

/// Atomic single-key operations a lease store has to provide.
///
/// Every method must be atomic on the store side. `set_expiry_hint` and `delete`
/// are hygiene only: the lease logic tolerates them failing.
#[automock]
pub trait LeaseStore {
    /// Set `key` to `value` only when the key is absent. Returns whether the write happened.
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    /// Ask the store to drop `key` after `seconds`.
    fn set_expiry_hint(&self, key: &str, seconds: u64) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value of `key` and return the value it replaced, as one operation.
    fn swap(&self, key: &str, value: &str) -> Result<Option<String>>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Replace the value of `key` only if it currently equals `expected`.
    ///
    /// `Ok(None)` means the store has no conditional set, and callers fall back to `swap`.
    fn compare_and_swap(&self, _key: &str, _expected: &str, _value: &str) -> Result<Option<bool>> {
        Ok(None)
    }
}

impl<T: LeaseStore + ?Sized> LeaseStore for Arc<T> {
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        (**self).set_if_absent(key, value)
    }

    fn set_expiry_hint(&self, key: &str, seconds: u64) -> Result<()> {
        (**self).set_expiry_hint(key, seconds)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn swap(&self, key: &str, value: &str) -> Result<Option<String>> {
        (**self).swap(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<Option<bool>> {
        (**self).compare_and_swap(key, expected, value)
    }
}
