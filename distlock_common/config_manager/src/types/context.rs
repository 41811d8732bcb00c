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

use serde::Deserialize;

use crate::{ConfigSingleton, ValidatedConfig};

pub const DEFAULT_ROBUST_PREFIX: &str = "cache:lock:dist:";
pub const DEFAULT_BASIC_PREFIX: &str = "cache:lock:basic:";

/// Main configuration structure that matches the dist_lock.yaml file structure.
#[derive(Debug, Deserialize, Clone)]
pub struct DistLockConfig {
    /// Cache backend connection settings
    #[serde(default)]
    pub cache: CacheSettings,
    /// Lock backed by atomic SET NX PX and scripted release
    #[serde(default = "LockSettings::robust_defaults")]
    pub robust_lock: LockSettings,
    /// Lock built from SETNX, GETSET and a separate expire
    #[serde(default = "LockSettings::basic_defaults")]
    pub basic_lock: LockSettings,
}

/// Cache backend connection settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheSettings {
    /// Redis url; when absent the REDIS_URL environment variable is used
    pub redis_url: Option<String>,
}

/// Per-lock-variant settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LockSettings {
    /// Namespace prepended to every lock key
    pub key_prefix: String,
    /// How long a held lock lives before it may be reclaimed
    pub lease_millis: u64,
    /// Budget for one acquisition attempt
    pub timeout_millis: u64,
    /// First pause between retries, 0 polls without pausing
    #[serde(default = "default_backoff_initial_millis")]
    pub backoff_initial_millis: u64,
    /// Upper bound for the doubling pause between retries
    #[serde(default = "default_backoff_max_millis")]
    pub backoff_max_millis: u64,
}

fn default_backoff_initial_millis() -> u64 {
    1
}

fn default_backoff_max_millis() -> u64 {
    10
}

impl LockSettings {
    pub fn robust_defaults() -> Self {
        Self {
            key_prefix: DEFAULT_ROBUST_PREFIX.to_string(),
            lease_millis: 300,
            timeout_millis: 100,
            backoff_initial_millis: default_backoff_initial_millis(),
            backoff_max_millis: default_backoff_max_millis(),
        }
    }

    pub fn basic_defaults() -> Self {
        Self {
            key_prefix: DEFAULT_BASIC_PREFIX.to_string(),
            lease_millis: 300,
            timeout_millis: 200,
            backoff_initial_millis: default_backoff_initial_millis(),
            backoff_max_millis: default_backoff_max_millis(),
        }
    }

    fn validate(&self, section: &str) -> Result<(), String> {
        if self.key_prefix.is_empty() {
            return Err(format!("{}.key_prefix must not be empty", section));
        }
        if self.lease_millis == 0 {
            return Err(format!("{}.lease_millis must be greater than 0", section));
        }
        if self.timeout_millis == 0 {
            return Err(format!("{}.timeout_millis must be greater than 0", section));
        }
        if self.backoff_initial_millis > self.backoff_max_millis {
            return Err(format!(
                "{}.backoff_initial_millis ({}) exceeds backoff_max_millis ({})",
                section, self.backoff_initial_millis, self.backoff_max_millis
            ));
        }
        Ok(())
    }
}

impl Default for DistLockConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            robust_lock: LockSettings::robust_defaults(),
            basic_lock: LockSettings::basic_defaults(),
        }
    }
}

impl ValidatedConfig for DistLockConfig {
    fn validate(&self) -> Result<(), String> {
        self.robust_lock.validate("robust_lock")?;
        self.basic_lock.validate("basic_lock")?;
        // A prefix of the other prefix lets a caller key of one variant land on the other's key.
        let (robust, basic) = (&self.robust_lock.key_prefix, &self.basic_lock.key_prefix);
        if robust.starts_with(basic.as_str()) || basic.starts_with(robust.as_str()) {
            return Err(format!(
                "robust_lock and basic_lock key prefixes overlap: {:?} and {:?}",
                robust, basic
            ));
        }
        Ok(())
    }
}

/// Global configuration singleton instance
///
/// Call `CONFIG.initialize(path)` once at startup, then `CONFIG.get_instance()`.
pub static CONFIG: ConfigSingleton<DistLockConfig> = ConfigSingleton::new();
