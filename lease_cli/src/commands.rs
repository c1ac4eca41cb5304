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

use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use distributed_lock::{Clock, DistributedLease, LeaseStore, LockConfig};
use log::info;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum LeaseCommands {
    /// Try once to take a lease and leave it to expire
    Acquire {
        /// Lease key
        #[arg(short, long)]
        key: String,

        /// Lease duration in seconds, defaults to the configured one
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Take a lease with retries, hold it while working, then release it
    Hold {
        /// Lease key
        #[arg(short, long)]
        key: String,

        /// Lease duration in seconds, defaults to the configured one
        #[arg(short, long)]
        seconds: Option<u64>,

        /// How long to hold the lease before releasing it
        #[arg(short, long, default_value_t = 1000)]
        work_millis: u64,
    },

    /// Show the expiry currently stored for a lease
    Inspect {
        /// Lease key
        #[arg(short, long)]
        key: String,
    },
}

pub fn execute<S: LeaseStore, C: Clock>(
    lease: &DistributedLease<S, C>,
    config: &LockConfig,
    command: &LeaseCommands,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        LeaseCommands::Acquire { key, seconds } => {
            let seconds = seconds.unwrap_or(config.lease_seconds);
            if lease.session().try_acquire(key, seconds)? {
                info!("Acquired {} for {}s", key, seconds);
                writeln!(out, "acquired")?;
            } else {
                writeln!(out, "busy")?;
            }
        }
        LeaseCommands::Hold { key, seconds, work_millis } => {
            let seconds = seconds.unwrap_or(config.lease_seconds);
            let mut session = lease.session();
            let guard = session.guard_with_retry(key, seconds, config.retry_times, config.retry_interval())?;
            writeln!(out, "acquired")?;
            std::thread::sleep(Duration::from_millis(*work_millis));
            drop(guard);
            writeln!(out, "released")?;
        }
        LeaseCommands::Inspect { key } => match lease.expiry_of(key)? {
            Some(expiry) => {
                let remaining = expiry - lease.clock().now_millis();
                if remaining > 0 {
                    writeln!(out, "held until {} ({} ms left)", expiry, remaining)?;
                } else {
                    writeln!(out, "expired at {} ({} ms ago)", expiry, -remaining)?;
                }
            }
            None => writeln!(out, "free")?,
        },
    }
    Ok(())
}
