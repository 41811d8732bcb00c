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

//! Cache backend used by the distributed locks.
//!
//! Only the handful of single-key atomic primitives the lock protocols need are exposed:
//! conditional set (with and without TTL), get, swap, scripted check-and-delete, delete
//! and expire. `RedisClient` talks to a real Redis server, `MemoryCache` keeps everything
//! in process and is what the lock tests run against.

pub mod backend;
pub mod client;
pub mod error;
pub mod memory;
pub mod operations;
pub mod scripts;

pub use backend::CacheBackend;
pub use backend::MockCacheBackend;
pub use client::RedisClient;
pub use error::{CacheError, Result};
pub use memory::MemoryCache;
