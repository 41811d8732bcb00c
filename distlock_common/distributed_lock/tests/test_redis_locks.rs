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

// Only run against a live Redis when REDIS_URL is set.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cache::{CacheBackend, RedisClient};
use distributed_lock::{BasicLock, LockConfig, RobustLock};
use serial_test::serial;

fn redis_or_skip() -> Option<Arc<RedisClient>> {
    if std::env::var("REDIS_URL").is_err() {
        eprintln!("REDIS_URL not set, skipping redis lock test");
        return None;
    }
    Some(Arc::new(RedisClient::get_instance().expect("redis client")))
}

fn unique_key() -> String {
    format!("seckill-{}", uuid::Uuid::new_v4())
}

#[test]
#[serial]
fn test_robust_lock_excludes_threads() {
    let Some(client) = redis_or_skip() else { return };
    let key = Arc::new(unique_key());
    let config = LockConfig::robust()
        .with_lease(Duration::from_secs(2))
        .with_timeout(Duration::from_secs(3));
    let lock = Arc::new(RobustLock::with_config(client.clone(), config));
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (lock, key, inside, overlaps) = (lock.clone(), key.clone(), inside.clone(), overlaps.clone());
            thread::spawn(move || {
                for _ in 0..3 {
                    let acquired = lock
                        .lock(&key, || {
                            if inside.swap(true, Ordering::SeqCst) {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::sleep(Duration::from_millis(5));
                            inside.store(false, Ordering::SeqCst);
                            Ok::<_, Infallible>(true)
                        })
                        .unwrap();
                    assert!(acquired);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(client.get(&lock.config().key(&key)).unwrap(), None);
}

#[test]
#[serial]
fn test_robust_lease_expires_on_server() {
    let Some(client) = redis_or_skip() else { return };
    let key = unique_key();
    let config = LockConfig::robust().with_lease(Duration::from_millis(100));
    let lock = RobustLock::with_config(client, config);

    let crashed = lock.new_token();
    assert!(lock.try_acquire(&key, &crashed));
    assert!(!lock.try_acquire(&key, &lock.new_token()));

    thread::sleep(Duration::from_millis(200));
    let next = lock.new_token();
    assert!(lock.try_acquire(&key, &next));
    assert!(!lock.release(&key, &crashed));
    assert!(lock.release(&key, &next));
}

#[test]
#[serial]
fn test_basic_lock_takeover_on_server() {
    let Some(client) = redis_or_skip() else { return };
    let key = unique_key();
    let lock = BasicLock::new(client.clone());
    let full_key = lock.config().key(&key);

    client.set(&full_key, "1", Some(Duration::from_secs(5))).unwrap();
    let token = lock.new_token();
    assert!(lock.try_lock_once(&key, &token).unwrap());
    assert_eq!(client.get(&full_key).unwrap(), Some(token.clone()));
    assert!(lock.unlock(&key, &token).unwrap());
    assert_eq!(client.get(&full_key).unwrap(), None);
}
