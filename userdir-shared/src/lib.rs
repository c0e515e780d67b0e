//! # userdir Shared Library
//!
//! This crate contains the types and infrastructure shared by the userdir
//! API server and the task worker.
//!
//! ## Module Organization
//!
//! - `db`: PostgreSQL pool and embedded migrations
//! - `models`: the `User` model and its SQL
//! - `store`: datastore adapter (`UserStore`) with Postgres and in-memory backends
//! - `redis`: Redis client wrapper
//! - `queue`: task queue channel (`TaskQueue`) with Redis and in-memory backends
//! - `tasks`: task names and typed argument lists shared by producer and consumer

pub mod db;
pub mod models;
pub mod queue;
pub mod redis;
pub mod store;
pub mod tasks;

/// Current version of the userdir shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
