//! Chain-facing builtins: revert, nested calls, event emission, printing.
//!
//! These are the only paths on which a contract communicates failure to its
//! caller; everything else in the runtime aborts.  `builtin_co_call`
//! prepends the argpack version byte; `builtin_co_call_or_revert` turns a
//! failed nested call into a revert carrying the callee's own message.

use crate::context::RuntimeContext;
use crate::heap::Addr;
use crate::runtime::Runtime;

/// Revert code used by `builtin_abort`.
const ABORT_ERROR_CODE: i32 = 3002;

impl Runtime {
    /// Reverts with an error code and a data-stream-encoded message string.
    pub fn builtin_revert(&mut self, err_code: i32, msg_str: Addr) {
        let encoded = self.ir_builtin_data_stream_encode_str(msg_str);
        let bytes = self.qvector_as_slice(encoded).to_vec();
        self.host.revert(err_code, &bytes);
    }

    /// Abort surfaced as a revert with the fixed abort error code.
    pub fn builtin_abort(&mut self, msg: &[u8]) {
        self.host.revert(ABORT_ERROR_CODE, msg);
    }

    /// Nested contract call.  The argpack gains a leading version zero byte
    /// before crossing the host boundary.  Returns the host status (0 on
    /// success).
    pub fn builtin_co_call(&mut self, contract_name: Addr, method: Addr, encoded_params: Addr) -> i32 {
        let params = self.vector_as_slice(encoded_params);
        let mut with_version = Vec::with_capacity(params.len() + 1);
        with_version.push(0u8);
        with_version.extend_from_slice(params);
        let contract = self.vector_as_slice(contract_name).to_vec();
        let method_bytes = self.vector_as_slice(method).to_vec();
        self.host.co_call(&contract, &method_bytes, &with_version)
    }

    /// Nested call that propagates failure: on a non-zero status the callee
    /// result (or a default message) is reverted to our own caller.
    pub fn builtin_co_call_or_revert(&mut self, contract: &[u8], method: &[u8], argpack: &[u8]) {
        let err_code = self.host.co_call(contract, method, argpack);
        if err_code == 0 {
            return;
        }
        let error_len = self.host.get_call_result_length();
        if error_len > 0 {
            let mut err_msg = vec![0u8; error_len as usize];
            self.host.get_call_result(&mut err_msg);
            self.host.revert(err_code, &err_msg);
        } else {
            let default_err = b"co_call Reverted";
            let msg = self.vector_new(default_err.len() as u32, Some(default_err));
            self.builtin_revert(err_code, msg);
        }
    }

    /// Emits an event: `topics` is an element vector of byte-array
    /// addresses, `desc` the payload byte array.
    pub fn ir_builtin_call_log(&mut self, topics: Addr, desc: Addr) {
        let num = self.qvector_size(topics);
        let ctx = RuntimeContext::UNKNOWN;
        let mut topic_bytes = Vec::with_capacity(num as usize);
        for i in 0..num {
            let cell = self.qvector_getat(topics, i as i32, false, &ctx);
            let item = self.heap.load_u32(cell);
            topic_bytes.push(self.qvector_as_slice(item).to_vec());
        }
        let desc_bytes = self.qvector_as_slice(desc).to_vec();
        self.host.log(&topic_bytes, &desc_bytes);
    }

    /// Writes a byte vector to the host log.
    pub fn ir_builtin_print(&mut self, s: Addr) {
        let bytes = self.vector_as_slice(s).to_vec();
        self.host.println(&bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_carries_encoded_message() {
        let mut rt = Runtime::with_mock_host();
        let msg = rt.vector_new(2, Some(b"no"));
        rt.builtin_revert(7, msg);
        let host = rt.mock_host().unwrap();
        assert_eq!(host.reverts, vec![(7, b"\x02no".to_vec())]);
    }

    #[test]
    fn co_call_prepends_version_byte() {
        let mut rt = Runtime::with_mock_host();
        let contract = rt.vector_new(1, Some(b"c"));
        let method = rt.vector_new(1, Some(b"m"));
        let params = rt.vector_new(2, Some(b"xy"));
        let status = rt.builtin_co_call(contract, method, params);
        assert_eq!(status, 0);
        let host = rt.mock_host().unwrap();
        assert_eq!(host.co_calls[0].2, b"\x00xy");
    }

    #[test]
    fn failed_co_call_reverts_with_callee_message() {
        let mut rt = Runtime::with_mock_host();
        {
            let host = rt.mock_host_mut().unwrap();
            host.co_call_status = 5;
            host.call_result = b"callee failed".to_vec();
        }
        rt.builtin_co_call_or_revert(b"c", b"m", b"args");
        let host = rt.mock_host().unwrap();
        assert_eq!(host.reverts, vec![(5, b"callee failed".to_vec())]);
    }

    #[test]
    fn failed_co_call_without_result_uses_default() {
        let mut rt = Runtime::with_mock_host();
        rt.mock_host_mut().unwrap().co_call_status = 9;
        rt.builtin_co_call_or_revert(b"c", b"m", b"args");
        let host = rt.mock_host().unwrap();
        assert_eq!(host.reverts.len(), 1);
        assert_eq!(host.reverts[0].0, 9);
        assert_eq!(host.reverts[0].1, b"\x10co_call Reverted".to_vec());
    }

    #[test]
    fn call_log_marshals_topics() {
        let mut rt = Runtime::with_mock_host();
        let topic = rt.qvector(4, 1, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        for b in b"evt" {
            rt.qvector_addlast(topic, &[*b]);
        }
        let topics = rt.qvector(1, 4, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        rt.qvector_addlast(topics, &topic.to_le_bytes());
        let desc = rt.qvector(4, 1, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        rt.qvector_addlast(desc, &[1]);

        rt.ir_builtin_call_log(topics, desc);
        let host = rt.mock_host().unwrap();
        assert_eq!(host.events.len(), 1);
        assert_eq!(host.events[0].0, vec![b"evt".to_vec()]);
        assert_eq!(host.events[0].1, vec![1]);
    }
}
