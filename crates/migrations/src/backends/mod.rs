//! Database Backend Abstractions
//!
//! The executor traits every backend implements, plus the PostgreSQL (sqlx)
//! and in-memory implementations.

pub mod core;
pub mod memory;
pub mod postgres;

// Re-export core traits and types
pub use core::*;
pub use memory::{MemoryExecutor, MemoryTransaction};
pub use postgres::{PostgresExecutor, PostgresTransaction};
