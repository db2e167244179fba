mod client;

pub use client::{RedisBus, RedisSubscription};
