//! # Messaging Transports
//!
//! A process group is only as useful as the wires between its members. This module holds
//! the seam between the rest of the crate and whatever carries messages between ranks.
//!
//! ## 🧩 What a Transport Must Provide
//!
//! Topology discovery needs surprisingly little from the runtime:
//! *   **Shape**: the group size and the caller's rank.
//! *   **Identity**: the name of the host the caller runs on.
//! *   **All-Gather**: every rank contributes one value, every rank receives all of them in rank order.
//! *   **Barrier**: nobody leaves until everybody has arrived.
//!
//! ## 📦 Module Contents
//!
//! *   [`Transport`](backend::Transport): the interface, plus the [`probe`](backend::probe)
//!     that decides at startup whether a runtime exists at all.
//! *   [`LocalBackend`](local_backend::LocalBackend): ranks as threads in one process, wired in a
//!     ring of channels. Handy for tests and for simulating multi-node layouts.
//!     *   **MPI** (feature `mpi`): the real thing, launched with `mpiexec`.
//!
//! ## ⚠️ Collectives Block
//!
//! Every rank must call `all_gather` and `barrier` the same number of times, in the same
//! order. A rank that skips one leaves the others waiting forever; nothing here can detect it.

pub mod backend;
pub mod local_backend;
#[cfg(feature = "mpi")]
pub mod mpi_backend;
