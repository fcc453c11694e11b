//! # procgroup
//!
//! `procgroup` is a thin layer over a distributed-memory process group for numerical
//! applications. It answers three questions every parallel program asks at startup:
//!
//! 1. How many processes are there, and which one am I? ([`Topology::rank`], [`Topology::world_size`])
//! 2. How many distinct machines do they run on? ([`Topology::node_count`])
//! 3. Which slice of the work is mine? ([`partition()`], [`Topology::find_assignments`])
//!
//! When no messaging runtime is present the crate degrades to a single-process
//! world (rank 0 of 1) instead of failing, so the same program runs unchanged on a
//! laptop and under `mpiexec`.
//!
//! ## Modules
//!
//! - [`distributed`]: the [`Transport`](distributed::backend::Transport) seam and its backends.
//! - [`topology`]: process-group discovery and collective helpers.
//! - [`partition`]: contiguous, weight-balanced task assignment.
//!
//! ## Example
//!
//! ```rust
//! use procgroup::Topology;
//!
//! let topology = Topology::serial();
//! let tasks = vec!["a", "b", "c", "d"];
//! let assignment = topology.find_assignments(&tasks, None).unwrap();
//!
//! assert_eq!(assignment.bucket(topology.rank()), &["a", "b", "c", "d"]);
//! topology.report_from_rank_zero(["all tasks are local"]).unwrap();
//! ```

use thiserror::Error;

pub mod distributed;
pub mod partition;
pub mod topology;

pub use distributed::backend::{ProbeConfig, Transport, TransportProbe, probe, probe_with};
pub use partition::{Assignment, has_empty_bucket, partition};
pub use topology::{Topology, node_id};

/// Error type for process-group operations.
#[derive(Error, Debug)]
pub enum ParallelError {
    /// A caller supplied arguments that violate an operation's contract.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The messaging runtime is present but could not be brought up.
    #[error("Transport initialization failed: {0}")]
    TransportInit(String),
    /// A collective operation failed after initialization.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Writing a report failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParallelError>;
