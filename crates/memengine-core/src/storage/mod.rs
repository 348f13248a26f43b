//! Storage module
//!
//! The SQL Gateway (C1) concern: a single `rusqlite::Connection` bound once
//! to positional rows, schema migrations, and the `Store` handle that every
//! other component borrows to run its statements. Per spec section 9's
//! design note, the SQL driver is bound once and parsed strictly rather than
//! defending against rows being either positional or named.

mod migrations;
mod store;

pub use migrations::{Migration, MIGRATIONS};
pub use store::Store;
