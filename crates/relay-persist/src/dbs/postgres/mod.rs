mod client;
mod models;

pub use client::PgOrderStore;
pub use models::OrderRow;
