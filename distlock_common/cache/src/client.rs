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

use lazy_static::lazy_static;
use log::{error, info};
use parking_lot::Mutex;
use redis::{Client, Connection};

use crate::error::{CacheError, Result};

lazy_static! {
    static ref REDIS_CLIENT: Arc<Mutex<Option<RedisClient>>> = Arc::new(Mutex::new(None));
}

/// Redis backed cache client.
///
/// `redis::Client` only holds connection info, so cloning is cheap and clones can be shared
/// between threads. Each operation checks out its own connection.
#[derive(Clone, Debug)]
pub struct RedisClient {
    pub(crate) client: Client,
}

impl RedisClient {
    /// Creates a client for the given url, e.g. `redis://127.0.0.1:6379/0`.
    ///
    /// No connection is made until the first operation.
    pub fn open(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(CacheError::ConnectionError)?;
        Ok(Self { client })
    }

    ///Get the RedisClient instance and automatically initialize it if the instance does not exist
    ///
    ///This method reads the Redis connection address from environment variable REDIS_URL,
    ///loading a `.env` file first when one is present
    pub fn get_instance() -> Result<RedisClient> {
        Self::get_instance_or(None)
    }

    /// Same as [`get_instance`](Self::get_instance), falling back to `default_url` when
    /// REDIS_URL is not set. Has no effect once the instance exists.
    pub fn get_instance_or(default_url: Option<&str>) -> Result<RedisClient> {
        let mut global_client = REDIS_CLIENT.lock();

        if global_client.is_none() {
            if let Ok(path) = dotenv::dotenv() {
                info!("load .env file: {}", path.display());
            }
            let redis_url = match (std::env::var("REDIS_URL"), default_url) {
                (Ok(url), _) => url,
                (Err(_), Some(url)) => url.to_string(),
                (Err(_), None) => {
                    error!("REDIS_URL environment variable not set");
                    return Err(CacheError::OperationError("REDIS_URL environment variable not set".to_string()));
                }
            };
            *global_client = Some(RedisClient::open(&redis_url)?);
        }

        global_client
            .as_ref()
            .cloned()
            .ok_or_else(|| CacheError::OperationError("Redis client initialization failed".to_string()))
    }

    pub(crate) fn connection(&self) -> Result<Connection> {
        self.client.get_connection().map_err(CacheError::ConnectionError)
    }
}
