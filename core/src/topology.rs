//! Process-group discovery.
//!
//! # What is a Topology?
//!
//! A parallel job is a set of processes (**ranks**) spread over one or more machines
//! (**nodes**). Before doing any work each rank needs to know:
//!
//! - **Rank**: its own zero-based id, `0..world_size`.
//! - **World size**: how many ranks exist.
//! - **Node count**: how many distinct hosts those ranks occupy. Several ranks may share a host.
//!
//! [`Topology`] discovers all three once, at startup, and then never changes. Build one per
//! process and pass it by reference to whatever needs collective behaviour.
//!
//! ## Example: Serial Fallback
//!
//! ```rust
//! use procgroup::{ProbeConfig, Topology, TransportProbe, probe_with};
//!
//! let probe = probe_with(&ProbeConfig { force_serial: true }).unwrap();
//! assert!(matches!(probe, TransportProbe::Unavailable));
//!
//! let topology = Topology::from_probe(probe).unwrap();
//! assert_eq!(topology.world_size(), 1);
//! assert_eq!(topology.rank(), 0);
//! assert!(!topology.is_distributed());
//! topology.barrier().unwrap(); // no-op
//! ```
//!
//! > [!TIP]
//! > **Counting nodes**
//! > Each rank hashes its host name into a [`node_id`] and the ids are all-gathered. Ranks
//! > that report the same id share a node. Ids are only compared within one run, so the hash
//! > does not need to be stable across builds or machines.

use crate::distributed::backend::{Transport, TransportProbe, probe};
use crate::partition::{Assignment, partition};
use crate::{ParallelError, Result};
use indexmap::IndexSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::io::Write;

/// Hashes a host name into a node identifier.
///
/// Equal names give equal ids within one run of one build.
pub fn node_id(host_name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    host_name.hash(&mut hasher);
    hasher.finish()
}

/// The shape of the process group, as seen from this process.
///
/// Immutable after construction. Two topologies compare equal when their world size,
/// rank and distributed flag match; the node count is informational and ignored.
pub struct Topology {
    rank: usize,
    world_size: usize,
    node_count: usize,
    node_index: usize,
    distributed: bool,
    transport: Option<Box<dyn Transport>>,
}

impl Topology {
    /// Probes for a runtime and builds the topology.
    ///
    /// This is a collective: when a runtime is present every rank must call it.
    ///
    /// # Errors
    ///
    /// Returns an error if a runtime is present but fails to initialize. A missing runtime
    /// yields the serial topology instead.
    pub fn new() -> Result<Self> {
        Self::from_probe(probe()?)
    }

    /// Builds the topology from the outcome of a [`probe`](crate::probe).
    pub fn from_probe(probe: TransportProbe) -> Result<Self> {
        match probe {
            TransportProbe::Available(transport) => Self::with_transport(transport),
            TransportProbe::Unavailable => {
                tracing::debug!("no messaging transport; running as a single process");
                Ok(Self::serial())
            }
        }
    }

    /// The single-process world: rank 0 of 1 on one node.
    pub fn serial() -> Self {
        Self {
            rank: 0,
            world_size: 1,
            node_count: 1,
            node_index: 0,
            distributed: false,
            transport: None,
        }
    }

    /// Discovers the topology through `transport`.
    ///
    /// Every rank hashes its host name and all-gathers the result; the number of distinct
    /// ids is the node count.
    ///
    /// # Errors
    ///
    /// Returns `ParallelError::TransportInit` if the transport reports an impossible shape,
    /// or any error raised by the host-name query or the all-gather.
    pub fn with_transport(transport: Box<dyn Transport>) -> Result<Self> {
        let world_size = transport.world_size();
        let rank = transport.rank();
        if world_size == 0 || rank >= world_size {
            return Err(ParallelError::TransportInit(format!(
                "rank {rank} is outside a world of size {world_size}"
            )));
        }

        let local_id = node_id(&transport.host_name()?);
        let gathered = transport.all_gather(local_id)?;
        if gathered.len() != world_size {
            return Err(ParallelError::Transport(format!(
                "all-gather returned {} node ids for {} ranks",
                gathered.len(),
                world_size
            )));
        }

        let nodes: IndexSet<u64> = gathered.into_iter().collect();
        let node_index = nodes.get_index_of(&local_id).ok_or_else(|| {
            ParallelError::Transport(format!("rank {rank} missing from gathered node ids"))
        })?;

        let topology = Self {
            rank,
            world_size,
            node_count: nodes.len(),
            node_index,
            distributed: world_size > 1,
            transport: Some(transport),
        };

        tracing::debug!(
            rank = topology.rank,
            world_size = topology.world_size,
            node_count = topology.node_count,
            "discovered process topology"
        );

        Ok(topology)
    }

    /// Returns the rank of this process.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the number of processes in the group.
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Returns the number of distinct hosts the group runs on.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Position of this process's host among the distinct hosts, numbered in the order
    /// they first appear by rank.
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    /// Returns `true` if more than one process is running.
    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// Returns `true` on the rank that reports for the group.
    pub fn is_rank_zero(&self) -> bool {
        self.rank == 0
    }

    /// Blocks until every rank has called `barrier`. No-op when not distributed.
    ///
    /// All ranks must call this the same number of times in the same order, or the group
    /// deadlocks.
    pub fn barrier(&self) -> Result<()> {
        match &self.transport {
            Some(transport) if self.distributed => transport.barrier(),
            _ => Ok(()),
        }
    }

    /// Prints each message on its own line to stdout, on rank zero only.
    pub fn report_from_rank_zero<I>(&self, messages: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        if !self.is_rank_zero() {
            return Ok(());
        }
        let stdout = std::io::stdout();
        self.report_from_rank_zero_to(&mut stdout.lock(), messages)
    }

    /// Writes each message on its own line to `out`, on rank zero only.
    pub fn report_from_rank_zero_to<W, I>(&self, out: &mut W, messages: I) -> Result<()>
    where
        W: Write,
        I: IntoIterator,
        I::Item: Display,
    {
        if self.is_rank_zero() {
            for message in messages {
                writeln!(out, "{message}")?;
            }
        }
        Ok(())
    }

    /// Partitions `tasks` across all ranks of this topology.
    ///
    /// Every rank computes the same assignment from the same inputs; rank `r` works on
    /// `assignment.bucket(r)`. Rank zero logs a warning when some ranks end up idle.
    ///
    /// # Errors
    ///
    /// See [`partition`].
    pub fn find_assignments<'a, T>(
        &self,
        tasks: &'a [T],
        weights: Option<&[f64]>,
    ) -> Result<Assignment<'a, T>> {
        let assignment = partition(tasks, weights, self.world_size)?;
        if self.is_rank_zero() && assignment.has_empty_bucket() {
            tracing::warn!(
                idle = assignment.empty_bucket_count(),
                workers = self.world_size,
                tasks = tasks.len(),
                "some workers have no tasks"
            );
        }
        Ok(assignment)
    }
}

impl PartialEq for Topology {
    fn eq(&self, other: &Self) -> bool {
        self.world_size == other.world_size
            && self.rank == other.rank
            && self.distributed == other.distributed
    }
}

impl Eq for Topology {}

impl std::fmt::Debug for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topology")
            .field("rank", &self.rank)
            .field("world_size", &self.world_size)
            .field("node_count", &self.node_count)
            .field("distributed", &self.distributed)
            .finish()
    }
}
