//! The prelude for integer vectors.
//!
//! The purpose of this module is to alleviate imports of many common traits for integer vectors.
//!
//! ```
//! # #![allow(unused_imports)]
//! use sucdyn::int_vectors::prelude::*;
//! ```
pub use crate::int_vectors::IntGetter;
