#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cache;
mod convert;
mod migrate;
pub mod statements;
mod stats;
mod storage;

pub use cache::{CacheStats, QueryCache};
pub use migrate::bootstrap;
pub use statements::{PointQuery, StatementCache, StatementStats};
pub use stats::StoreStats;
pub use storage::{PatternStore, cancellable};
