//! Golden-file test harness.
//!
//! A test declares a base name and an action. The harness derives the
//! setup, output and golden file locations, drives the action through a
//! fixed Init → Arrange → Act → Assert → Close lifecycle, and requires the
//! output to match the golden file byte for byte.
//!
//! Layers build on each other:
//!
//! - [`base::Tester`]: the action writes to the output file.
//! - [`db::DbTester`]: a fresh SQLite fixture store is seeded from
//!   `{base_name}.setup` and handed to the action.
//! - [`http::HttpTester`] and [`httpdb::HttpDbTester`]: the action is a request
//!   sent to an `axum::Router`; the response body becomes the output.
//!
//! ```no_run
//! use golden::{DbTester, run_or_panic};
//! use std::io::Write;
//!
//! let mut t = DbTester::new("rows", |store, out| {
//!     for line in store.query_text("SELECT n, s FROM test ORDER BY n")?.lines() {
//!         writeln!(out, "{line}")?;
//!     }
//!     Ok(())
//! });
//! run_or_panic(&mut t);
//! ```

pub mod base;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod httpdb;
pub mod lifecycle;
pub mod loader;
pub mod sql;
pub mod store;

pub use base::{OutputSink, Tester};
pub use compare::compare_out_to_golden;
pub use config::{ArtifactKind, TestConfig};
pub use db::{DbTester, from_setup_to_golden};
pub use error::{Error, Result};
pub use lifecycle::{
    Lifecycle, LifecycleState, Phase, Retarget, run, run_one_with, run_or_panic, run_test,
    run_test_with,
};
pub use sql::exec_multi;
pub use store::{FixtureStore, StoreConfig};

#[cfg(feature = "http")]
pub use http::HttpTester;
#[cfg(feature = "http")]
pub use httpdb::HttpDbTester;
