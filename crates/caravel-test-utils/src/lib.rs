//! Test fixtures for Caravel crates.
//!
//! Provides temp project trees, package archive builders, local store
//! seeding, and a wiremock-backed package feed.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod mock_feed;
mod packages;
mod temp_project;

pub use mock_feed::MockFeed;
pub use packages::{package_archive, seed_store_package};
pub use temp_project::TempSolution;
