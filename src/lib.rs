//! # Convo Inspector
//!
//! A read-only dashboard for inspecting chat conversations between
//! mentors, students, and guardians.
//!
//! Conversations are searched by engagement or participant, annotated with
//! the engagement(s) they belong to, and drilled into for their roster,
//! ordered message history, and mentor response time. The analytic core
//! lives in the `convo-inspector-core` crate; this crate adds SQLite
//! storage, a CLI, and an HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  SQLite      │──▶│  DashboardStore  │──▶│  Resolver +      │
//! │  (sqlx)      │   │  (read-only)     │   │  Analyzer (core) │
//! └──────────────┘   └──────────────────┘   └────────┬─────────┘
//!                                                    │
//!                              ┌─────────────────────┤
//!                              ▼                     ▼
//!                         ┌──────────┐         ┌──────────┐
//!                         │   CLI    │         │   HTTP   │
//!                         │ (convo)  │         │  (axum)  │
//!                         └──────────┘         └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `DashboardStore` |
//! | [`import`] | JSON snapshot loader |
//! | [`conversations`] | Conversation search |
//! | [`inspect`] | Conversation detail and messages |
//! | [`stats`] | Row counts |
//! | [`server`] | Dashboard HTTP server |

pub mod config;
pub mod conversations;
pub mod db;
pub mod import;
pub mod inspect;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod stats;
