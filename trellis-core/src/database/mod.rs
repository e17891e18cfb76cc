//! Persistence: port traits and the PostgreSQL adapters behind them.

pub mod ports;
pub mod postgres;

pub use ports::{TaskStore, UserStore};
pub use postgres::{PostgresTaskStore, PostgresUserStore};
