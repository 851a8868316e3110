//! # Sucdyn: Appendable succinct data structures in Rust
//!
//! Sucdyn provides some succinct data structures whose distinguishing trait
//! is that they stay *queryable while still being built*: containers are
//! created empty, grown by appending at the end, optionally truncated or
//! rebalanced, and answer rank/select-style queries correctly on every
//! intermediate state.
//!
//! # Data structures
//!
//! The data structures are organized by module:
//!
//! - [`bit_vectors`]: Bit vectors, namely the plain updatable
//!   [`BitVector`](bit_vectors::BitVector) and the rank/select-indexed
//!   [`RankVector`](bit_vectors::RankVector) with a two-level block summary
//!   maintained under appends and truncation.
//! - [`int_vectors`]: Integer vectors with fixed-width packed layouts:
//!   [`CompactVector`](int_vectors::CompactVector) whose element width can
//!   be re-chosen in place, and the block-partitioned
//!   [`CompactBlockVector`](int_vectors::CompactBlockVector) for
//!   append-heavy workloads.
//! - [`mii_sequences`]: The appendable Elias-Fano monotone sequence
//!   [`EliasFano`](mii_sequences::EliasFano), composed from the two modules
//!   above, with value-domain rank/select/predecessor/successor and a
//!   rebalanceable split point.
//! - [`step_code`]: [`StepCode`](step_code::StepCode), a small-capacity
//!   container storing each integer at its own 4-bit-stepped width.
//!
//! The word-level and bit-region primitives the containers are built on are
//! exposed in [`broadword`] and [`bit_region`].
//!
//! # Conventions
//!
//! Throughout the crate, rank is *inclusive* (`rank1(p)` counts set bits at
//! positions `0..=p`, so `rank0(p) = p + 1 - rank1(p)`) and select is
//! 1-based (`select1(rank1(p)) == p` whenever bit `p` is set). Out-of-range
//! reads return [`None`]; fallible mutations return [`anyhow::Result`].
//! Element counts are bounded by `2^58 - 1` so that every bit-position
//! computation fits in 64 bits.
//!
//! # Limitations
//!
//! This library must be compiled on a 64-bit machine.
#![warn(missing_docs)]
#![cfg(target_pointer_width = "64")]

pub mod bit_region;
pub mod bit_vectors;
pub mod broadword;
pub mod int_vectors;
pub mod mii_sequences;
pub mod step_code;
pub mod utils;
