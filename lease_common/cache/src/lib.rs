//! Thin synchronous Redis client shared by the lease crates

pub mod client;
pub mod error;
pub mod operations;

pub use client::RedisClient;
pub use error::RedisError;
