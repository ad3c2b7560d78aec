//! Hash and signature wrappers over the host primitives.
//!
//! The host owns the actual algorithms; these wrappers allocate the 32-byte
//! result, marshal arena bytes across the boundary, and normalize signature
//! components (r/s left-padded to 32 bytes, v in the low byte of a 32-byte
//! buffer).

use crate::heap::Addr;
use crate::qvector::QVECTOR_RESIZE_DOUBLE;
use crate::runtime::Runtime;

const HASH_SIZE: u32 = 32;

impl Runtime {
    fn hash32(&mut self, msg: Addr, which: fn(&mut dyn crate::host::HostApi, &[u8], &mut [u8; 32])) -> Addr {
        let out = self.qvector(HASH_SIZE, 1, QVECTOR_RESIZE_DOUBLE);
        self.qvector_set_num(out, HASH_SIZE);
        let bytes = self.qvector_as_slice(msg).to_vec();
        let mut digest = [0u8; 32];
        which(self.host.as_mut(), &bytes, &mut digest);
        let data = self.qvector_data(out);
        self.heap.write(data, &digest);
        out
    }

    /// SHA-256 of a byte array; returns a fresh 32-byte array.
    pub fn ir_builtin_sha256(&mut self, msg: Addr) -> Addr {
        self.hash32(msg, |host, bytes, out| host.sha256(bytes, out))
    }

    /// SM3 of a byte array; returns a fresh 32-byte array.
    pub fn ir_builtin_sm3(&mut self, msg: Addr) -> Addr {
        self.hash32(msg, |host, bytes, out| host.sm3(bytes, out))
    }

    /// Keccak-256 of a byte array; returns a fresh 32-byte array.
    pub fn ir_builtin_keccak256(&mut self, msg: Addr) -> Addr {
        self.hash32(msg, |host, bytes, out| host.keccak256(bytes, out))
    }

    /// Signature check against a 32-byte digest; any other digest length
    /// aborts.
    pub fn ir_builtin_verify_mycrypto_signature(
        &mut self,
        pk: Addr,
        sign: Addr,
        digest: Addr,
    ) -> bool {
        if self.qvector_size(digest) != HASH_SIZE {
            self.abort_str("DigestLengthError: digest of the msg must be 32B");
        }
        let pk_bytes = self.qvector_as_slice(pk).to_vec();
        let sign_bytes = self.qvector_as_slice(sign).to_vec();
        let digest_bytes = self.qvector_as_slice(digest).to_vec();
        self.host
            .verify_mycrypto_signature(&pk_bytes, &sign_bytes, &digest_bytes)
            != 0
    }

    /// Recovers the signer address from a secp256k1 signature.  `r` and `s`
    /// are left-padded to 32 bytes; `v` lands in the low byte of a 32-byte
    /// buffer.  A zero host return aborts.
    pub fn ir_builtin_eth_secp256k1_recovery(
        &mut self,
        hash: Addr,
        v: u8,
        r: Addr,
        s: Addr,
    ) -> Addr {
        let out = self.qvector(32, 1, QVECTOR_RESIZE_DOUBLE);
        self.qvector_set_num(out, 32);

        let mut v_input = [0u8; 32];
        v_input[31] = v;

        let mut r32 = [0u8; 32];
        let r_bytes = self.qvector_as_slice(r).to_vec();
        let r_pad = 32 - r_bytes.len().min(32);
        r32[r_pad..].copy_from_slice(&r_bytes[..32 - r_pad]);

        let mut s32 = [0u8; 32];
        let s_bytes = self.qvector_as_slice(s).to_vec();
        let s_pad = 32 - s_bytes.len().min(32);
        s32[s_pad..].copy_from_slice(&s_bytes[..32 - s_pad]);

        let hash_bytes = self.qvector_as_slice(hash).to_vec();
        let mut recovered = [0u8; 32];
        let ok = self.host.eth_secp256k1_recovery(
            &hash_bytes,
            &v_input,
            &r32,
            &s32,
            &mut recovered,
        );
        if ok == 0 {
            self.abort_str("eth secp256k1 recovery error");
        }
        let data = self.qvector_data(out);
        self.heap.write(data, &recovered);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_vec(rt: &mut Runtime, data: &[u8]) -> Addr {
        let v = rt.qvector(data.len().max(1) as u32, 1, QVECTOR_RESIZE_DOUBLE);
        for b in data {
            rt.qvector_addlast(v, &[*b]);
        }
        v
    }

    #[test]
    fn hashes_return_32_bytes() {
        let mut rt = Runtime::with_mock_host();
        let msg = bytes_vec(&mut rt, b"payload");
        for out in [
            rt.ir_builtin_sha256(msg),
            rt.ir_builtin_sm3(msg),
            rt.ir_builtin_keccak256(msg),
        ] {
            assert_eq!(rt.qvector_size(out), 32);
        }
    }

    #[test]
    fn recovery_pads_and_succeeds() {
        let mut rt = Runtime::with_mock_host();
        let hash = bytes_vec(&mut rt, &[7u8; 32]);
        let r = bytes_vec(&mut rt, &[1, 2, 3]);
        let s = bytes_vec(&mut rt, &[4u8; 32]);
        let out = rt.ir_builtin_eth_secp256k1_recovery(hash, 27, r, s);
        assert_eq!(rt.qvector_size(out), 32);
    }

    #[test]
    #[should_panic(expected = "DigestLengthError: digest of the msg must be 32B")]
    fn short_digest_aborts() {
        let mut rt = Runtime::with_mock_host();
        let pk = bytes_vec(&mut rt, &[1; 33]);
        let sig = bytes_vec(&mut rt, &[2; 64]);
        let digest = bytes_vec(&mut rt, &[3; 16]);
        rt.ir_builtin_verify_mycrypto_signature(pk, sig, digest);
    }
}
