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


use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::error::{DistributedLockError, Result};

const DEFAULT_LEASE_SECONDS: u64 = 30;
const DEFAULT_RETRY_TIMES: u32 = 3;
const DEFAULT_RETRY_INTERVAL_MILLIS: u64 = 100;

/// Settings for leases and the store behind them.
///
/// Loaded from YAML:
///
/// ```yaml
/// redis_url: "redis://127.0.0.1:6379/"
/// key_prefix: "lease:"
/// lease_seconds: 30
/// retry_times: 3
/// retry_interval_millis: 100
/// compare_and_swap: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Falls back to the `REDIS_URL` environment variable when absent
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub lease_seconds: u64,
    pub retry_times: u32,
    pub retry_interval_millis: u64,
    pub compare_and_swap: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: String::new(),
            lease_seconds: DEFAULT_LEASE_SECONDS,
            retry_times: DEFAULT_RETRY_TIMES,
            retry_interval_millis: DEFAULT_RETRY_INTERVAL_MILLIS,
            compare_and_swap: true,
        }
    }
}

impl LockConfig {
    pub fn from_yaml(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path)
            .map_err(|e| DistributedLockError::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: LockConfig = serde_yaml::from_str(&config_str)
            .map_err(|e| DistributedLockError::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `REDIS_URL` and the `LEASE_*` variables, loading a `.env` file first if there is one
    pub fn from_env() -> Result<Self> {
        match dotenv::dotenv() {
            Ok(path) => info!("load .env file: {}", path.display()),
            Err(e) => debug!(".env not loaded: {}", e),
        }
        let defaults = LockConfig::default();
        let config = LockConfig {
            redis_url: env::var("REDIS_URL").ok(),
            key_prefix: env::var("LEASE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            lease_seconds: env_or("LEASE_SECONDS", defaults.lease_seconds)?,
            retry_times: env_or("LEASE_RETRY_TIMES", defaults.retry_times)?,
            retry_interval_millis: env_or("LEASE_RETRY_INTERVAL_MILLIS", defaults.retry_interval_millis)?,
            compare_and_swap: env_or("LEASE_COMPARE_AND_SWAP", defaults.compare_and_swap)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lease_seconds == 0 {
            return Err(DistributedLockError::ConfigError("lease_seconds must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_millis)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DistributedLockError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
