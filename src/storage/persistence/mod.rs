//! Storage backend implementations.
//!
//! | Backend | Durability | Ids | `get_all` order |
//! |---------|------------|-----|-----------------|
//! | [`MapStore`] | process lifetime | counter from 0 | ascending |
//! | [`SqliteStore`] | file | `AUTOINCREMENT` | descending |
//! | [`PostgresStore`] | database | `BIGSERIAL` | descending |

mod memory;
mod postgresql;
mod sqlite;

pub use memory::MapStore;
pub use postgresql::PostgresStore;
pub use sqlite::SqliteStore;
