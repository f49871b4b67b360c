//! # pgtable
//!
//! A fluent, per-table query builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Bound parameters only**: every value becomes a `$n` placeholder; identifiers are
//!   restricted to `[A-Za-z0-9_]+`
//! - **One session per table**: filters accumulate and are consumed by the next terminal
//!   call; select shaping persists until `reset()`
//! - **Safe updates**: UPDATE without a filter is refused before any SQL is sent
//! - **Pluggable execution**: anything implementing [`Executor`] can run statements;
//!   `tokio_postgres` and `deadpool_postgres` clients work out of the box
//! - **Statement logging**: compiled SQL is emitted as `tracing` events on `pgtable.sql`
//!
//! ## Example
//!
//! ```ignore
//! use pgtable::{record, table};
//!
//! let mut users = table(&client, "users")?;
//!
//! // SELECT
//! let active = users
//!     .where_("status", "active")
//!     .where_between("age", [18, 65])
//!     .latest()
//!     .take(10)
//!     .get()
//!     .await?;
//!
//! // INSERT ... RETURNING id
//! let id = users
//!     .insert_get_id(record! { "name" => "alice", "email" => "alice@example.com" })
//!     .await?;
//!
//! // UPDATE
//! users.where_("id", &id).update(record! { "status" => "inactive" }).await?;
//!
//! // DELETE
//! users.where_("id", &id).delete().await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ident;
mod logging;
pub mod operation;
pub mod qb;
pub mod row;
pub mod table;
pub mod value;

pub use client::Executor;
pub use config::DbConfig;
pub use error::{QbError, QbResult};
pub use ident::Ident;
pub use operation::Operation;
pub use qb::{BoundParam, Direction, Op, Statement};
pub use row::{IntoRows, Record};
pub use table::{Table, table};
pub use value::{ParamKind, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{Database, create_pool, create_pool_with_manager_config};
