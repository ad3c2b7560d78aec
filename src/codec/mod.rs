//! Type-directed codecs.
//!
//! Each codec consumes a descriptor offset plus an opaque value address and
//! produces or consumes byte sequences; dispatch is one layer deep on the
//! descriptor discriminator, recursing through sub-type offsets.

pub mod data_stream;
pub mod json;
pub mod rlp;
pub mod ssz;
