//! Remote package feeds.
//!
//! A feed is an HTTP(S) base URL answering two requests:
//!
//! - `GET <feed>/<name>/index.json` → `{"versions": ["1.0", ...]}`
//! - `GET <feed>/<name>/<version>/<name>.<version>.zip` → archive bytes
//!
//! Responses are cached per `(feed URL, package identity)` for the life of
//! the client; `no_cache` bypasses lookups. Transient failures retry with
//! exponential backoff.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod cache;
mod client;
mod error;

pub use cache::{FeedCache, FeedCacheStats};
pub use client::{FeedClient, FeedConfig};
pub use error::{FeedError, Result};
