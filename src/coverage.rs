//! Per-basic-block coverage counters and their event dump.
//!
//! One counter vector per runtime, indexed by basic-block id; entries are
//! 32-bit counts.  The dump serializes the sparse non-zero portion as a
//! small JSON document and emits it under the "MyCoverage" topic so
//! off-chain tooling can collect per-call coverage even though the linear
//! memory is discarded between calls.

use crate::context::RuntimeContext;
use crate::heap::Addr;
use crate::qvector::QVECTOR_RESIZE_DOUBLE;
use crate::runtime::Runtime;

const MYGCNA_VERSION: &str = "0.1.0";
const COVERAGE_EVENT: &[u8] = b"MyCoverage";

impl Runtime {
    fn singleton_counters(&mut self) -> Addr {
        if self.counters == 0 {
            // vector capacity can't be zero
            self.counters = self.qvector(1, 4, QVECTOR_RESIZE_DOUBLE);
        }
        self.counters
    }

    /// Bumps the counter for a basic block, growing the vector (capacity
    /// doubles, gap zero-filled) as needed.
    pub fn ir_builtin_add_coverage_counter(&mut self, bb_id: i32) {
        if bb_id < 0 {
            self.abort_str("invalid cov bb id(< 0)");
        }
        let bb_id = bb_id as u32;
        let ctx = RuntimeContext::UNKNOWN;
        let counters = self.singleton_counters();

        let max = self.qvector_max(counters);
        if bb_id >= max {
            let old_max = max;
            let newmax = if bb_id > 0 { bb_id * 2 } else { 1 };
            if !self.qvector_resize(counters, newmax) {
                self.abort_str("cov bb vector resize failed");
            }
            let data = self.qvector_data(counters);
            let grown = self.qvector_max(counters) - old_max;
            self.heap.fill(data + old_max * 4, 0, grown * 4);
        }
        if bb_id >= self.qvector_size(counters) {
            // keep get/set by index inside the populated range
            self.qvector_set_num(counters, bb_id + 1);
        }

        let slot = self.qvector_getat(counters, bb_id as i32, false, &ctx);
        let old_count = self.heap.load_u32(slot);
        let new_count = old_count + 1;
        self.qvector_setat(counters, bb_id as i32, &new_count.to_le_bytes(), &ctx);
    }

    /// The raw counter vector.
    pub fn ir_builtin_get_coverage_counters(&mut self) -> Addr {
        self.singleton_counters()
    }

    // Serializes `{"version":"0.1.0","counters":{"<bb>":<count>,…}}` with
    // only the non-zero entries.
    fn dump_counters_to_mygcna(&mut self, ctx: &RuntimeContext) -> Addr {
        let buf = self.qvector(1, 1, QVECTOR_RESIZE_DOUBLE);
        self.append_str(buf, "{\"version\":\"");
        self.append_str(buf, MYGCNA_VERSION);
        self.append_str(buf, "\",\"counters\":{");

        let counters = self.singleton_counters();
        self.host.println(b"mycoverage counters size");
        let size_str = self.i32_toa(self.qvector_size(counters) as i32, 10);
        self.host.println(size_str.as_bytes());

        let mut found_first_used_bb = false;
        for i in 0..self.qvector_size(counters) {
            let slot = self.qvector_getat(counters, i as i32, false, ctx);
            let count = self.heap.load_u32(slot);
            if count == 0 {
                continue;
            }
            if found_first_used_bb {
                self.append_str(buf, ",");
            }
            found_first_used_bb = true;
            self.append_str(buf, "\"");
            let bb_id_str = self.i32_toa(i as i32, 10);
            self.append_str(buf, &bb_id_str);
            self.append_str(buf, "\":");
            let count_str = self.i32_toa(count as i32, 10);
            self.append_str(buf, &count_str);
        }

        self.append_str(buf, "}}");
        self.host.println(b"mycoverage mygcna generated");
        buf
    }

    fn append_str(&mut self, buf: Addr, s: &str) {
        for b in s.as_bytes() {
            self.qvector_addlast(buf, &[*b]);
        }
    }

    /// Emits the coverage dump as a "MyCoverage" event.  Called on every
    /// exit from the contract call stack, since the linear memory (and the
    /// counters with it) is gone once the call returns.
    pub fn ir_builtin_call_coverage_log(&mut self, ctx: &RuntimeContext) {
        let event_name = self.vector_new(COVERAGE_EVENT.len() as u32, Some(COVERAGE_EVENT));
        let event_name_topic = self.ir_builtin_data_stream_encode_str(event_name);

        let topics = self.qvector(1, 4, QVECTOR_RESIZE_DOUBLE);
        self.qvector_addlast(topics, &event_name_topic.to_le_bytes());

        let desc_data = self.dump_counters_to_mygcna(ctx);
        let desc = self.ir_builtin_data_stream_encode_i8array(desc_data);
        self.ir_builtin_call_log(topics, desc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_grow_and_count() {
        let mut rt = Runtime::with_mock_host();
        rt.ir_builtin_add_coverage_counter(0);
        rt.ir_builtin_add_coverage_counter(0);
        rt.ir_builtin_add_coverage_counter(5);

        let counters = rt.ir_builtin_get_coverage_counters();
        assert_eq!(rt.qvector_size(counters), 6);
        let ctx = RuntimeContext::UNKNOWN;
        let c0 = rt.qvector_getat(counters, 0, false, &ctx);
        assert_eq!(rt.heap().load_u32(c0), 2);
        let c3 = rt.qvector_getat(counters, 3, false, &ctx);
        assert_eq!(rt.heap().load_u32(c3), 0);
        let c5 = rt.qvector_getat(counters, 5, false, &ctx);
        assert_eq!(rt.heap().load_u32(c5), 1);
    }

    #[test]
    #[should_panic(expected = "invalid cov bb id(< 0)")]
    fn negative_bb_id_aborts() {
        let mut rt = Runtime::with_mock_host();
        rt.ir_builtin_add_coverage_counter(-1);
    }

    #[test]
    fn coverage_log_emits_sparse_json() {
        let mut rt = Runtime::with_mock_host();
        rt.ir_builtin_add_coverage_counter(1);
        rt.ir_builtin_add_coverage_counter(1);
        rt.ir_builtin_add_coverage_counter(4);

        let ctx = RuntimeContext::UNKNOWN;
        rt.ir_builtin_call_coverage_log(&ctx);

        let host = rt.mock_host().unwrap();
        assert_eq!(host.events.len(), 1);
        let (topics, desc) = &host.events[0];
        assert_eq!(topics[0], b"\x0aMyCoverage".to_vec());
        // desc is uleb(count) then the JSON bytes
        let json = &desc[1..];
        assert_eq!(
            String::from_utf8_lossy(json),
            "{\"version\":\"0.1.0\",\"counters\":{\"1\":2,\"4\":1}}"
        );
    }
}
