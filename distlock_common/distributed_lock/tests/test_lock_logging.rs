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

use std::convert::Infallible;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use cache::{CacheBackend, MemoryCache};
use common_log::config::{LogConfig, LoggerConfig};
use distributed_lock::{LockConfig, RobustLock};

fn logger_config(target_prefix: &str, file: &str, level: &str) -> LoggerConfig {
    LoggerConfig {
        target_prefix: target_prefix.to_string(),
        log_directory: "logs".to_string(),
        log_file_name: file.to_string(),
        max_file_size: 1024 * 1024,
        max_zip_count: 2,
        level: level.to_string(),
    }
}

#[test]
fn test_lock_outcomes_logged_to_protocol_file() {
    let dir = tempfile::tempdir().unwrap();
    std::env::remove_var("LOG_OUTPUT_DIR");
    common_log::init_with_config(LogConfig {
        log_root: dir.path().display().to_string(),
        loggers: vec![
            logger_config("root", "root.log", "info"),
            logger_config("distributed_lock", "lock-protocol.log", "debug"),
        ],
    })
    .unwrap();

    let cache = Arc::new(MemoryCache::new());
    let config = LockConfig::robust().with_timeout(Duration::from_millis(20));
    let lock = RobustLock::with_config(cache.clone(), config);

    assert_eq!(lock.lock("seckill", || Ok::<_, Infallible>(true)), Ok(true));

    cache.set("cache:lock:dist:seckill", "someone-else", None).unwrap();
    assert_eq!(lock.lock("seckill", || Ok::<_, Infallible>(true)), Ok(false));
    log::logger().flush();

    let contents = fs::read_to_string(dir.path().join("logs").join("lock-protocol.log")).unwrap();
    assert!(contents.contains("Acquired lock cache:lock:dist:seckill"));
    assert!(contents.contains("Lock cache:lock:dist:seckill not acquired within"));
    // Lock internals stay out of the root file.
    let root = fs::read_to_string(dir.path().join("logs").join("root.log")).unwrap_or_default();
    assert!(!root.contains("cache:lock:dist:seckill"));
}
