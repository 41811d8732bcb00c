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

use redis::{Commands, Script};

use crate::backend::CacheBackend;
use crate::client::RedisClient;
use crate::error::{CacheError, Result};
use crate::scripts::{COMPARE_AND_DELETE, COMPARE_AND_EXPIRE};

// Redis rejects a zero PX/PEXPIRE, round sub-millisecond TTLs up instead.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

impl CacheBackend for RedisClient {
    /// Atomic `SET key value NX PX ttl`.
    ///
    /// # Errors
    /// * `CacheError::ConnectionError` - If there is an error talking to Redis.
    fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query(&mut conn)
            .map_err(CacheError::ConnectionError)?;
        Ok(reply.is_some())
    }

    fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        conn.set_nx(key, value).map_err(CacheError::ConnectionError)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        cmd.query(&mut conn).map_err(CacheError::ConnectionError)
    }

    /// Gets the value for a given key.
    ///
    /// # Errors
    /// * `CacheError::KeyNotFound` - If the key holds a non-string value.
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        conn.get(key).map_err(|e| match e.kind() {
            redis::ErrorKind::TypeError => CacheError::KeyNotFound,
            _ => CacheError::ConnectionError(e),
        })
    }

    fn get_set(&self, key: &str, value: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        conn.getset(key, value).map_err(CacheError::ConnectionError)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let result: i32 = Script::new(COMPARE_AND_DELETE)
            .key(key)
            .arg(expected)
            .invoke(&mut conn)?;
        Ok(result == 1)
    }

    fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection()?;
        let result: i32 = Script::new(COMPARE_AND_EXPIRE)
            .key(key)
            .arg(expected)
            .arg(ttl_millis(ttl))
            .invoke(&mut conn)?;
        Ok(result == 1)
    }

    /// Millisecond `PEXPIRE`, so sub-second leases are not truncated to zero.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection()?;
        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query(&mut conn)
            .map_err(CacheError::ConnectionError)
    }

    fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let removed: i64 = conn.del(key).map_err(CacheError::ConnectionError)?;
        Ok(removed > 0)
    }
}
