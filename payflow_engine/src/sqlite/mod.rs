//! SQLite storage backend for the payment engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::{SqliteDatabase, DEFAULT_OUTBOX_DELAY_SECS};
