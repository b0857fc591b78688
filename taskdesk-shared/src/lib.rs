//! # TaskDesk Shared Library
//!
//! Domain types, authentication primitives, storage and services used by the
//! TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: users, roles, tasks and statuses, with their SQL
//! - `auth`: password hashing, session tokens, caller identity, permissions
//! - `repository`: storage traits with PostgreSQL and in-memory backends
//! - `services`: task lifecycle, user administration, sign-in
//! - `db`: connection pool and migrations
//! - `error`: the domain error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
