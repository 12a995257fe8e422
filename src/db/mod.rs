//! Database layer
//!
//! SQLite is the default store (single-file deployment); MySQL can be
//! selected in configuration. Repositories in [`repositories`] hide the
//! dialect differences from the services.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, Backend, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
