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

// These tests need a running Redis and only execute when REDIS_URL is set.

use std::thread;
use std::time::Duration;

use cache::{CacheBackend, RedisClient};
use serial_test::serial;

fn redis_or_skip() -> Option<RedisClient> {
    if std::env::var("REDIS_URL").is_err() {
        eprintln!("REDIS_URL not set, skipping redis backend test");
        return None;
    }
    Some(RedisClient::get_instance().expect("redis client"))
}

fn unique_key(name: &str) -> String {
    format!("test:cache:{}:{}", name, uuid::Uuid::new_v4())
}

#[test]
#[serial]
fn test_set_nx_px_and_expiry() {
    let Some(client) = redis_or_skip() else { return };
    let key = unique_key("set_nx_px");

    assert!(client.set_nx_px(&key, "a", Duration::from_millis(200)).unwrap());
    assert!(!client.set_nx_px(&key, "b", Duration::from_millis(200)).unwrap());
    assert_eq!(client.get(&key).unwrap().as_deref(), Some("a"));

    thread::sleep(Duration::from_millis(300));
    assert_eq!(client.get(&key).unwrap(), None);
}

#[test]
#[serial]
fn test_compare_and_delete_script() {
    let Some(client) = redis_or_skip() else { return };
    let key = unique_key("cad");

    client.set(&key, "owner", Some(Duration::from_secs(5))).unwrap();
    assert!(!client.compare_and_delete(&key, "intruder").unwrap());
    assert!(client.compare_and_delete(&key, "owner").unwrap());
    assert!(!client.compare_and_delete(&key, "owner").unwrap());
}

#[test]
#[serial]
fn test_get_set_and_expire() {
    let Some(client) = redis_or_skip() else { return };
    let key = unique_key("getset");

    assert!(client.set_nx(&key, "1").unwrap());
    assert_eq!(client.get_set(&key, "2").unwrap().as_deref(), Some("1"));
    assert!(client.expire(&key, Duration::from_millis(150)).unwrap());
    assert!(client.compare_and_expire(&key, "2", Duration::from_millis(150)).unwrap());
    thread::sleep(Duration::from_millis(250));
    assert!(!client.del(&key).unwrap());
}
