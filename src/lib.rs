//! Runtime support library for a smart-contract intermediate representation.
//!
//! Compiled contracts run inside a 32-bit sandboxed bytecode target; this
//! crate is the reflective-typed value layer they call into at execution
//! time.  Four tightly coupled parts make up the core:
//!
//! 1. a flat, offset-addressed **descriptor table** encoding every IR type
//!    (see [`types`]);
//! 2. a **container set** with fixed arena layouts — byte vector, element
//!    vector, chaining hash table, byte stream;
//! 3. **type-directed codecs** walking descriptor offsets over opaque value
//!    addresses: the ULEB128 data-stream codec, the offset-framed SSZ
//!    codec, bit-exact Ethereum RLP, and schema-driven JSON;
//! 4. a **deterministic size-class allocator** plus the host-boundary
//!    helpers (abort/revert, nested calls, hashing, hex/base64).
//!
//! The production heap is raw 32-bit memory; here it is modelled as a
//! single arena owned by a [`Runtime`], with every pointer a `u32` handle
//! ([`Addr`]).  That keeps the schema-directed layout arithmetic identical
//! to the sandbox target on any host while staying memory-safe.
//!
//! Execution is single-threaded cooperative: one logical task owns the
//! whole runtime for an invocation, and there is no recoverable error
//! channel — every recognized error path aborts through the host.

pub mod chain;
pub mod codec;
pub mod context;
pub mod coverage;
pub mod crypto;
pub mod encoding;
pub mod hashtbl;
pub mod heap;
pub mod host;
pub mod math;
pub mod qvector;
pub mod runtime;
pub mod stream;
pub mod strings;
pub mod types;
pub mod vector;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the common entry points
// ─────────────────────────────────────────────────────────────────────────────

/// One invocation's runtime state: arena, descriptor table, host, counters.
pub use runtime::Runtime;
/// Schema recursion ceiling enforced by the codecs.
pub use runtime::MAX_RECURSION_DEPTH;

/// Arena address handle (`0` is null).
pub use heap::Addr;
/// The arena plus allocator state.
pub use heap::Heap;
/// Page granularity of the sandbox linear memory.
pub use heap::WASM_PAGE_SIZE;

/// `(file, line, col)` carried into anything that can abort.
pub use context::RuntimeContext;

/// The imported host primitives, as a trait.
pub use host::HostApi;
/// Recording host used by the test-suite.
pub use host::MockHost;

/// Type discriminators of the IR.
pub use types::IrType;
/// One descriptor record.
pub use types::RuntimeClass;
/// The immutable descriptor blob.
pub use types::TypeTable;
/// Builder producing descriptor blobs in the compiler's binary layout.
pub use types::TypeTableBuilder;
/// Pointer slot size on the sandbox target (4 bytes).
pub use types::ADDRESS_SIZE;

/// 256-bit integers and the division the target lacks natively.
pub use math::{div256_u256, div256_u256_rem, I256, U256};

/// Iteration cursors whose zero value means "start from the beginning".
pub use hashtbl::HashtblCursor;
pub use qvector::QVectorCursor;

/// Element-vector growth options.
pub use qvector::{
    QVECTOR_RESIZE_DOUBLE, QVECTOR_RESIZE_EXACT, QVECTOR_RESIZE_LINEAR, QVECTOR_THREADSAFE,
};

/// Decoded RLP node kind.
pub use codec::rlp::RlpValueType;

/// Raw textual codecs (also reachable through the `ir_builtin_*` wrappers).
pub use encoding::base64::{base64_decode, base64_encode, check_implementation};
pub use encoding::hex::{hex_decode, hex_encode};
