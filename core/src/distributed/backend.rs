use crate::Result;

/// Environment variable that forces the serial fallback even when a runtime is compiled in.
pub const SERIAL_ENV_VAR: &str = "PROCGROUP_SERIAL";

/// Abstraction for the messaging runtime underneath a process group.
///
/// This trait allows swapping between different implementations:
/// - **MPI**: A real multi-process job launched with `mpiexec`.
/// - **Local**: Ranks running as threads of one process, connected by channels.
///
/// `all_gather` and `barrier` are collectives: every rank must call them together.
pub trait Transport: Send {
    /// Returns the rank of the current process/thread.
    fn rank(&self) -> usize;

    /// Returns the total number of processes/threads.
    fn world_size(&self) -> usize;

    /// Returns the network name of the host this rank runs on.
    fn host_name(&self) -> Result<String>;

    /// Gathers one value from every rank.
    ///
    /// The result holds `world_size()` values ordered by rank and is identical on every rank.
    fn all_gather(&self, value: u64) -> Result<Vec<u64>>;

    /// Blocks until every rank in the group has called `barrier`.
    fn barrier(&self) -> Result<()>;
}

/// Outcome of looking for a messaging runtime at startup.
pub enum TransportProbe {
    /// A runtime is up and this is our handle to it.
    Available(Box<dyn Transport>),
    /// No runtime exists; the caller runs as a single-process world.
    Unavailable,
}

impl std::fmt::Debug for TransportProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(transport) => f
                .debug_struct("Available")
                .field("rank", &transport.rank())
                .field("world_size", &transport.world_size())
                .finish(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Settings consulted while probing for a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Skip the runtime entirely and report [`TransportProbe::Unavailable`].
    pub force_serial: bool,
}

impl ProbeConfig {
    /// Reads the configuration from the process environment.
    ///
    /// `PROCGROUP_SERIAL` set to `1`, `true` or `yes` (any case) forces serial mode.
    pub fn from_env() -> Self {
        let force_serial = std::env::var(SERIAL_ENV_VAR)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self { force_serial }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Probes for a runtime using [`ProbeConfig::from_env`].
pub fn probe() -> Result<TransportProbe> {
    probe_with(&ProbeConfig::from_env())
}

/// Probes for a runtime.
///
/// # Errors
///
/// Returns `ParallelError::TransportInit` if a runtime is compiled in but fails to start.
/// A missing runtime is not an error.
pub fn probe_with(config: &ProbeConfig) -> Result<TransportProbe> {
    if config.force_serial {
        tracing::debug!("serial mode forced by configuration");
        return Ok(TransportProbe::Unavailable);
    }
    probe_runtime()
}

#[cfg(feature = "mpi")]
fn probe_runtime() -> Result<TransportProbe> {
    let backend = super::mpi_backend::MpiBackend::initialize()?;
    Ok(TransportProbe::Available(Box::new(backend)))
}

#[cfg(not(feature = "mpi"))]
fn probe_runtime() -> Result<TransportProbe> {
    tracing::debug!("built without a messaging runtime");
    Ok(TransportProbe::Unavailable)
}
