//! Connection pooling (component E): a hand-rolled, mutex-guarded pool that
//! grows physical connections and widens a per-connection client cap along a
//! halving schedule, with a background reaper closing idle connections.

mod connection;
mod pool;
mod reaper;
mod schedule;
mod settings;

pub use connection::Connection;
pub use pool::{ConnectionPool, PoolConfig};
pub use schedule::CapacitySchedule;
pub use settings::{DatabaseSettings, DatabaseSettingsBuilder};
