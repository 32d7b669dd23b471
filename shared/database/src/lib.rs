pub mod connection;
pub mod conversation;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;
pub mod schedule;
pub mod search;
pub mod stats;
pub mod store;

pub use connection::*;
pub use conversation::{ConversationKey, ConversationView};
pub use memory::MemoryStore;
pub use migrations::*;
pub use models::*;
pub use postgres::PgStore;
pub use stats::{BookingStats, Counterpart};
pub use store::*;
