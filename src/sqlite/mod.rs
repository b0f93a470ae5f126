//! `SQLite` database backend.
//!
//! Enable the `sqlx_sqlite` feature to use [`SqliteClusterBindingRepository`].
//! Run [`migrations::run`] once at startup to create the tables.

mod binding;
pub mod migrations;

pub use binding::{SqliteClusterBindingRepository, SqliteTx};
