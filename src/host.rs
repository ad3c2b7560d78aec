//! The host boundary.
//!
//! Every primitive the sandbox imports from its embedder is collected behind
//! the [`HostApi`] trait: termination (`abort`/`revert`), logging, nested
//! contract calls, and the hash/signature primitives.  The runtime never
//! implements any of these itself — it marshals arena bytes in and out and
//! treats the host as opaque and synchronous.
//!
//! [`MockHost`] is the embedder used by the test-suite: it records prints,
//! events and reverts, answers nested calls from a scripted result, and turns
//! `abort` into a Rust panic carrying the formatted message so tests can
//! assert on it.

use std::any::Any;

/// Imported host primitives.  All byte parameters are raw payloads already
/// copied out of the arena.
pub trait HostApi {
    /// Downcast hook so embedders (and tests) can reach their concrete
    /// host through the trait object.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Terminates the invocation with a message.  Does not return.
    fn abort(&mut self, msg: &[u8]) -> !;

    /// Writes a line of bytes to the host log.
    fn println(&mut self, msg: &[u8]);

    /// Emits an event with indexed topics and a payload.
    fn log(&mut self, topics: &[Vec<u8>], desc: &[u8]);

    /// Reverts the invocation with an error code and message.
    fn revert(&mut self, error_code: i32, msg: &[u8]);

    /// Nested contract call.  Returns 0 on success.
    fn co_call(&mut self, contract: &[u8], method: &[u8], argpack: &[u8]) -> i32;

    /// Length of the result of the last nested call.
    fn get_call_result_length(&mut self) -> u32;

    /// Copies the result of the last nested call into `buf`.
    fn get_call_result(&mut self, buf: &mut [u8]);

    fn sha256(&mut self, msg: &[u8], out: &mut [u8; 32]);

    fn sm3(&mut self, msg: &[u8], out: &mut [u8; 32]);

    fn keccak256(&mut self, msg: &[u8], out: &mut [u8; 32]);

    /// Returns non-zero when the signature verifies.
    fn verify_mycrypto_signature(&mut self, pk: &[u8], sig: &[u8], digest: &[u8]) -> u32;

    /// Recovers an address from a secp256k1 signature.  Returns non-zero on
    /// success and fills `out`.
    fn eth_secp256k1_recovery(
        &mut self,
        hash: &[u8],
        v: &[u8; 32],
        r: &[u8; 32],
        s: &[u8; 32],
        out: &mut [u8; 32],
    ) -> u32;
}

/// Recorded event: `(topics, desc)`.
pub type MockEvent = (Vec<Vec<u8>>, Vec<u8>);

/// Host used by the test-suite.  `abort` panics with the message; everything
/// else records its inputs for later assertions.
#[derive(Default)]
pub struct MockHost {
    /// Lines written through `println`, in order.
    pub prints: Vec<Vec<u8>>,
    /// Events emitted through `log`, in order.
    pub events: Vec<MockEvent>,
    /// `(code, msg)` pairs passed to `revert`, in order.
    pub reverts: Vec<(i32, Vec<u8>)>,
    /// Nested calls observed: `(contract, method, argpack)`.
    pub co_calls: Vec<(Vec<u8>, Vec<u8>, Vec<u8>)>,
    /// Status the next `co_call` returns.
    pub co_call_status: i32,
    /// Result bytes the next `get_call_result` serves.
    pub call_result: Vec<u8>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostApi for MockHost {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn abort(&mut self, msg: &[u8]) -> ! {
        panic!("{}", String::from_utf8_lossy(msg));
    }

    fn println(&mut self, msg: &[u8]) {
        self.prints.push(msg.to_vec());
    }

    fn log(&mut self, topics: &[Vec<u8>], desc: &[u8]) {
        self.events.push((topics.to_vec(), desc.to_vec()));
    }

    fn revert(&mut self, error_code: i32, msg: &[u8]) {
        self.reverts.push((error_code, msg.to_vec()));
    }

    fn co_call(&mut self, contract: &[u8], method: &[u8], argpack: &[u8]) -> i32 {
        self.co_calls
            .push((contract.to_vec(), method.to_vec(), argpack.to_vec()));
        self.co_call_status
    }

    fn get_call_result_length(&mut self) -> u32 {
        self.call_result.len() as u32
    }

    fn get_call_result(&mut self, buf: &mut [u8]) {
        let n = buf.len().min(self.call_result.len());
        buf[..n].copy_from_slice(&self.call_result[..n]);
    }

    fn sha256(&mut self, _msg: &[u8], out: &mut [u8; 32]) {
        out.fill(0);
    }

    fn sm3(&mut self, _msg: &[u8], out: &mut [u8; 32]) {
        out.fill(0);
    }

    fn keccak256(&mut self, _msg: &[u8], out: &mut [u8; 32]) {
        out.fill(0);
    }

    fn verify_mycrypto_signature(&mut self, _pk: &[u8], _sig: &[u8], _digest: &[u8]) -> u32 {
        1
    }

    fn eth_secp256k1_recovery(
        &mut self,
        _hash: &[u8],
        _v: &[u8; 32],
        _r: &[u8; 32],
        _s: &[u8; 32],
        out: &mut [u8; 32],
    ) -> u32 {
        out.fill(0);
        1
    }
}
