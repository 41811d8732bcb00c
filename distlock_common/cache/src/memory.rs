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
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::backend::CacheBackend;
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| now < deadline)
    }
}

/// In-process cache with Redis-like string semantics.
///
/// All operations run under one mutex, which gives the total per-key ordering the lock
/// protocols assume from a single Redis instance. Expired entries are dropped lazily on
/// access.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live, `None` if the key is absent or has no expiry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        live_entry(&mut entries, key, now)
            .and_then(|e| e.deadline)
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

impl CacheBackend for MemoryCache {
    fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if live_entry(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry { value: value.to_string(), deadline: Some(now + ttl) });
        Ok(true)
    }

    fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if live_entry(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry { value: value.to_string(), deadline: None });
        Ok(true)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.lock().insert(key.to_string(), Entry { value: value.to_string(), deadline });
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        Ok(live_entry(&mut entries, key, Instant::now()).map(|e| e.value.clone()))
    }

    fn get_set(&self, key: &str, value: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let previous = live_entry(&mut entries, key, now).map(|e| e.value.clone());
        entries.insert(key.to_string(), Entry { value: value.to_string(), deadline: None });
        Ok(previous)
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let owned = live_entry(&mut entries, key, Instant::now()).is_some_and(|e| e.value == expected);
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }

    fn compare_and_expire(&self, key: &str, expected: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match live_entry(&mut entries, key, now) {
            Some(entry) if entry.value == expected => {
                entry.deadline = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.deadline = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn del(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let existed = live_entry(&mut entries, key, Instant::now()).is_some();
        entries.remove(key);
        Ok(existed)
    }
}
