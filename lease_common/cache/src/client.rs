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
use redis::Client;
use std::sync::Mutex;
use crate::error::RedisError;

lazy_static! {
    static ref REDIS_CLIENT: Arc<Mutex<Option<RedisClient>>> = Arc::new(Mutex::new(None));
}

#[derive(Clone, Debug)]
pub struct RedisClient {
    pub(crate) client: Client,
}

impl RedisClient {
    /// Open a standalone client for the given Redis url, bypassing the process-wide instance.
    pub fn open(redis_url: &str) -> Result<RedisClient, RedisError> {
        let client = Client::open(redis_url).map_err(RedisError::ConnectionError)?;
        Ok(RedisClient { client })
    }

    ///Get the shared RedisClient instance, creating it on first use
    ///
    ///The connection address is read from the REDIS_URL environment variable
    ///the first time this is called; later calls hand back clones of the same client
    pub fn get_instance() -> Result<RedisClient, RedisError> {
        let mut global_client = REDIS_CLIENT.lock().map_err(|_|
            RedisError::OperationError("Failed to acquire client registry".to_string()))?;

        if global_client.is_none() {
            let redis_url = std::env::var("REDIS_URL")
                .map_err(|_| RedisError::OperationError("REDIS_URL environment variable not set".to_string()))?;
            *global_client = Some(RedisClient::open(&redis_url)?);
        }

        global_client
            .as_ref()
            .cloned()
            .ok_or_else(|| RedisError::OperationError("Redis client initialization failed".to_string()))
    }
}
