//! # Convo Inspector Core
//!
//! Shared, I/O-free logic for Convo Inspector: data models, external
//! conversation identifier parsing, engagement resolution, mentor
//! response-time analytics, conversation search, and the store trait.
//!
//! This crate contains no tokio, sqlx, filesystem, or network code. All
//! functions operate on snapshots already fetched through
//! [`store::DashboardStore`].

pub mod external_id;
pub mod models;
pub mod resolver;
pub mod response_time;
pub mod roster;
pub mod search;
pub mod store;
