//! Top module for monotone-increasing integer sequences.
//!
//! # Introduction
//!
//! *Monotone-increasing integer sequences* are a generalization of bit
//! vectors: the sequence $`x_0 < x_1 < \dots < x_{m-1}`$ is the set of
//! positions of set bits in a (conceptual) bit vector over the value domain.
//! Rank, select, predecessor, and successor are therefore asked about
//! *values*, not indexes.
//!
//! [`EliasFano`] stores such a sequence in compressed space while answering
//! those queries quickly, supports appending at the maximum, and can
//! rebalance its internal split point at any time.
pub mod elias_fano;

pub use elias_fano::EliasFano;
