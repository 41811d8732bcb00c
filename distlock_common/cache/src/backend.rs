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

use mockall::automock;

use crate::error::Result;

/// Single-key operations a lock protocol may rely on.
///
/// Every method is one round trip against the backend. The only atomicity a caller may
/// assume is the one stated per method; combining two calls is never atomic.
#[automock]
pub trait CacheBackend: Send + Sync {
    /// Sets `key = value` only if the key is absent, attaching `ttl` in the same atomic step.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the key was created, `Ok(false)` if it already existed.
    fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Sets `key = value` only if the key is absent. No expiry is attached.
    fn set_nx(&self, key: &str, value: &str) -> Result<bool>;

    /// Unconditional set, optionally with a TTL.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Reads the current value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Swap: sets `key = value` and returns the previous value in one atomic step.
    ///
    /// Any TTL on the key is discarded, as with Redis `GETSET`.
    fn get_set(&self, key: &str, value: &str) -> Result<Option<String>>;

    /// Deletes `key` only if its current value equals `expected`, as a single indivisible
    /// operation on the backend.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the key was deleted.
    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool>;

    /// Refreshes the TTL of `key` only if its current value equals `expected`, atomically.
    fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool>;

    /// Sets or refreshes the TTL of an existing key. Not atomic with any prior call.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the key does not exist.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Unconditionally deletes `key`, returning whether it existed.
    fn del(&self, key: &str) -> Result<bool>;
}
