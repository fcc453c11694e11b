use super::backend::Transport;
use crate::{ParallelError, Result};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

/// Transport backed by an MPI runtime.
///
/// Owns the `Universe`, so MPI is finalized when the backend is dropped. Rank and size
/// are read once at initialization; the world communicator never changes shape.
pub struct MpiBackend {
    universe: Universe,
    rank: usize,
    world_size: usize,
}

impl MpiBackend {
    /// Initializes the MPI runtime and reads the shape of the world communicator.
    ///
    /// # Errors
    ///
    /// Returns `ParallelError::TransportInit` if MPI was already initialized in this
    /// process or reports a negative rank or size.
    pub fn initialize() -> Result<Self> {
        let universe = mpi::initialize().ok_or_else(|| {
            ParallelError::TransportInit("MPI is already initialized".to_string())
        })?;

        let world = universe.world();
        let rank = usize::try_from(world.rank()).map_err(|_| {
            ParallelError::TransportInit(format!("invalid MPI rank {}", world.rank()))
        })?;
        let world_size = usize::try_from(world.size()).map_err(|_| {
            ParallelError::TransportInit(format!("invalid MPI world size {}", world.size()))
        })?;

        tracing::debug!(rank, world_size, "MPI runtime initialized");

        Ok(Self {
            universe,
            rank,
            world_size,
        })
    }

    fn world(&self) -> SimpleCommunicator {
        self.universe.world()
    }
}

impl Transport for MpiBackend {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn host_name(&self) -> Result<String> {
        mpi::environment::processor_name()
            .map_err(|e| ParallelError::Transport(format!("unreadable processor name: {e}")))
    }

    fn all_gather(&self, value: u64) -> Result<Vec<u64>> {
        let mut gathered = vec![0u64; self.world_size];
        self.world().all_gather_into(&value, &mut gathered[..]);
        Ok(gathered)
    }

    fn barrier(&self) -> Result<()> {
        self.world().barrier();
        Ok(())
    }
}
