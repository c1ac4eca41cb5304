//! Distributed lease lock on top of a shared key-value store.
//!
//! A lease is a key whose value is the absolute expiry time (milliseconds since
//! epoch) of the current holder. Acquisition only uses single-key atomic
//! operations, and expired leases can be seized without the previous holder's
//! cooperation. Each caller keeps its own [`LeaseRegistry`] so that a release
//! never deletes a lease that somebody else has seized in the meantime.

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod lease;
pub mod memory_store;
pub mod redis_store;
pub mod registry;
pub mod scripts;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LockConfig;
pub use error::{DistributedLockError, Result};
pub use guard::LeaseGuard;
pub use lease::{DistributedLease, LeaseSession};
pub use memory_store::MemoryLeaseStore;
pub use redis_store::RedisLeaseStore;
pub use registry::{LeaseRecord, LeaseRegistry};
pub use store::LeaseStore;
