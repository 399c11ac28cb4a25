//! taskboard - deadline-aware to-do board
//!
//! Tasks live in four columns (short, medium, long, daily). Each task counts
//! down from 100% toward its deadline, daily tasks renew at local midnight,
//! and deleted tasks go to an archive until restored or cleared.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `model`: Tasks, columns and the persisted board snapshot
//! - `snapshot`: Loading, validating and migrating the stored board
//! - `store`: Task operations and the debounced write-back
//! - `progress`: Deadline progress and time-left formatting
//! - `reconcile`: Day rollover of daily and finished tasks
//! - `stats`: Completion statistics and day/year clocks
//! - `ticker`, `debounce`, `clock`: Timers and the injectable clock
//! - `storage`: Data directory layout and the key-value file store
//! - `lock`: File locking and atomic writes
//! - `ui`: The interactive terminal board

pub mod cli;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod lock;
pub mod model;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod store;
pub mod ticker;
pub mod ui;

pub use error::{Error, Result};
