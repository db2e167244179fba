#[cfg(feature = "postgres")]
pub mod builder;
pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

#[cfg(feature = "postgres")]
pub use builder::StoreBuilder;
pub use error::{PersistError, Result};
pub use models::{NewOrder, StatusUpdate, Telemetry};
pub use trait_client::{MessageBus, OrderStore, Subscription};

#[cfg(feature = "postgres")]
pub use dbs::postgres::PgOrderStore;
#[cfg(feature = "redis")]
pub use dbs::redis_bus::{RedisBus, RedisSubscription};
