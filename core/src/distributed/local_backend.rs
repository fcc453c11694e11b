use super::backend::Transport;
use crate::{ParallelError, Result};
use crossbeam::channel::{Receiver, Sender, unbounded};

/// An in-process transport where every rank is a thread.
///
/// Ranks are wired in a ring using `crossbeam` channels: each rank receives from
/// `rank - 1` and sends to `rank + 1`. Collectives are built from ring passes, the same
/// data movement a real runtime performs between hosts.
pub struct LocalBackend {
    rank: usize,
    world_size: usize,
    host_name: String,
    left_rx: Receiver<u64>, // Receive from rank - 1
    right_tx: Sender<u64>,  // Send to rank + 1
}

impl LocalBackend {
    /// Wires a single rank. Use [`LocalGroup`] to build a consistent ring.
    pub(crate) fn new(
        rank: usize,
        world_size: usize,
        host_name: impl Into<String>,
        left_rx: Receiver<u64>,
        right_tx: Sender<u64>,
    ) -> Self {
        Self {
            rank,
            world_size,
            host_name: host_name.into(),
            left_rx,
            right_tx,
        }
    }

    fn send_right(&self, value: u64) -> Result<()> {
        self.right_tx.send(value).map_err(|_| {
            ParallelError::Transport(format!("rank {}: right neighbour hung up", self.rank))
        })
    }

    fn recv_left(&self) -> Result<u64> {
        self.left_rx.recv().map_err(|_| {
            ParallelError::Transport(format!("rank {}: left neighbour hung up", self.rank))
        })
    }
}

impl Transport for LocalBackend {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn host_name(&self) -> Result<String> {
        Ok(self.host_name.clone())
    }

    fn all_gather(&self, value: u64) -> Result<Vec<u64>> {
        if self.rank >= self.world_size {
            return Err(ParallelError::InvalidArgument(format!(
                "rank {} is outside a ring of size {}",
                self.rank, self.world_size
            )));
        }

        let mut gathered = vec![0; self.world_size];
        gathered[self.rank] = value;

        // Each step forwards what arrived in the previous one, so after
        // world_size - 1 steps every value has visited every rank.
        let mut outgoing = value;
        for step in 0..self.world_size - 1 {
            self.send_right(outgoing)?;
            let incoming = self.recv_left()?;

            let origin = (self.rank + self.world_size - 1 - step) % self.world_size;
            gathered[origin] = incoming;
            outgoing = incoming;
        }

        Ok(gathered)
    }

    fn barrier(&self) -> Result<()> {
        // A ring all-gather cannot finish on any rank before all ranks have entered it.
        self.all_gather(0).map(|_| ())
    }
}

/// A set of [`LocalBackend`]s wired into one ring, one per rank.
///
/// # Example
///
/// ```rust
/// use procgroup::Topology;
/// use procgroup::distributed::local_backend::LocalGroup;
///
/// let group = LocalGroup::new(["node-a", "node-a", "node-b"]).unwrap();
/// let handles: Vec<_> = group
///     .into_iter()
///     .map(|backend| {
///         std::thread::spawn(move || Topology::with_transport(Box::new(backend)).unwrap())
///     })
///     .collect();
///
/// for handle in handles {
///     let topology = handle.join().unwrap();
///     assert_eq!(topology.world_size(), 3);
///     assert_eq!(topology.node_count(), 2);
/// }
/// ```
pub struct LocalGroup {
    backends: Vec<LocalBackend>,
}

impl LocalGroup {
    /// Creates a group with one rank per entry of `host_names`.
    ///
    /// Ranks are numbered in iteration order. Repeating a host name places several ranks
    /// on the same simulated node.
    ///
    /// # Errors
    ///
    /// Returns `ParallelError::InvalidArgument` if `host_names` is empty.
    pub fn new<I, S>(host_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host_names: Vec<String> = host_names.into_iter().map(Into::into).collect();
        let world_size = host_names.len();
        if world_size == 0 {
            return Err(ParallelError::InvalidArgument(
                "a process group needs at least one rank".to_string(),
            ));
        }

        // Channel i carries messages from rank i to rank i + 1.
        let (txs, mut rxs): (Vec<_>, Vec<_>) = (0..world_size).map(|_| unbounded()).unzip();
        rxs.rotate_right(1);

        let backends = host_names
            .into_iter()
            .zip(txs.into_iter().zip(rxs))
            .enumerate()
            .map(|(rank, (host_name, (right_tx, left_rx)))| {
                LocalBackend::new(rank, world_size, host_name, left_rx, right_tx)
            })
            .collect();

        Ok(Self { backends })
    }

    /// Creates a group of `world_size` ranks that all share one host.
    pub fn single_node(world_size: usize) -> Result<Self> {
        Self::new(std::iter::repeat_n("localhost", world_size))
    }

    /// Number of ranks in the group.
    pub fn world_size(&self) -> usize {
        self.backends.len()
    }

    /// Hands out the backends in rank order, ready to move into threads.
    pub fn into_backends(self) -> Vec<LocalBackend> {
        self.backends
    }
}

impl IntoIterator for LocalGroup {
    type Item = LocalBackend;
    type IntoIter = std::vec::IntoIter<LocalBackend>;

    fn into_iter(self) -> Self::IntoIter {
        self.backends.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_local_backend_properties() {
        let (tx, rx) = unbounded();
        let backend = LocalBackend::new(2, 4, "node-7", rx, tx);
        assert_eq!(backend.rank(), 2);
        assert_eq!(backend.world_size(), 4);
        assert_eq!(backend.host_name().unwrap(), "node-7");
    }

    #[test]
    fn test_misshaped_backend_rejects_collectives() {
        let (tx, rx) = unbounded();
        let backend = LocalBackend::new(3, 2, "h", rx, tx);
        assert!(matches!(
            backend.all_gather(1),
            Err(ParallelError::InvalidArgument(_))
        ));

        let (tx, rx) = unbounded();
        let empty = LocalBackend::new(0, 0, "h", rx, tx);
        assert!(matches!(empty.barrier(), Err(ParallelError::InvalidArgument(_))));
    }

    #[test]
    fn test_group_ranks_match_positions() {
        let backends = LocalGroup::new(["a", "b", "c"]).unwrap().into_backends();
        for (position, backend) in backends.iter().enumerate() {
            assert_eq!(backend.rank(), position);
            assert_eq!(backend.world_size(), 3);
        }
    }

    #[test]
    fn test_single_rank_all_gather_needs_no_peers() {
        let group = LocalGroup::single_node(1).unwrap();
        let backend = group.into_backends().pop().unwrap();
        assert_eq!(backend.all_gather(42).unwrap(), vec![42]);
        backend.barrier().unwrap();
    }

    #[test]
    fn test_empty_group_rejected() {
        let err = LocalGroup::new(Vec::<String>::new());
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));
    }

    #[test]
    fn test_ring_all_gather() {
        let group = LocalGroup::single_node(5).unwrap();
        assert_eq!(group.world_size(), 5);

        let handles: Vec<_> = group
            .into_iter()
            .map(|backend| {
                thread::spawn(move || {
                    // Rank r contributes 10 * (r + 1)
                    let value = 10 * (backend.rank() as u64 + 1);
                    backend.all_gather(value).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![10, 20, 30, 40, 50]);
        }
    }

    #[test]
    fn test_repeated_collectives_stay_in_step() {
        let group = LocalGroup::single_node(3).unwrap();

        let handles: Vec<_> = group
            .into_iter()
            .map(|backend| {
                thread::spawn(move || {
                    let mut rounds = Vec::new();
                    for round in 0..4u64 {
                        backend.barrier().unwrap();
                        let value = round * 100 + backend.rank() as u64;
                        rounds.push(backend.all_gather(value).unwrap());
                    }
                    rounds
                })
            })
            .collect();

        for handle in handles {
            let rounds = handle.join().unwrap();
            for (round, gathered) in rounds.iter().enumerate() {
                let base = round as u64 * 100;
                assert_eq!(gathered, &vec![base, base + 1, base + 2]);
            }
        }
    }

    #[test]
    fn test_disconnected_peer_is_a_transport_error() {
        let mut backends = LocalGroup::single_node(2).unwrap().into_backends();
        let survivor = backends.remove(0);
        drop(backends);

        let err = survivor.all_gather(1);
        assert!(matches!(err, Err(ParallelError::Transport(_))));
    }
}
