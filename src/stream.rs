//! Byte stream with an explicit read cursor, used by the RLP codec.
//!
//! Arena layout: `{ read_offset, len, cap, data }`.  Writes append behind a
//! doubling buffer; reads are driven by the codec advancing `read_offset`
//! after it has parsed a length prefix.

use crate::heap::Addr;
use crate::runtime::Runtime;

/// Arena size of the stream header.
pub const BYTE_STREAM_SIZE: u32 = 16;

const OFF_READ: u32 = 0;
const OFF_LEN: u32 = 4;
const OFF_CAP: u32 = 8;
const OFF_DATA: u32 = 12;

impl Runtime {
    /// Fresh stream with a small initial buffer.
    pub fn new_byte_stream(&mut self) -> Addr {
        let s = self.malloc(BYTE_STREAM_SIZE);
        let data = self.malloc(8);
        self.heap.store_u32(s + OFF_READ, 0);
        self.heap.store_u32(s + OFF_LEN, 0);
        self.heap.store_u32(s + OFF_CAP, 8);
        self.heap.store_u32(s + OFF_DATA, data);
        s
    }

    /// Stream primed with the contents of a byte-element vector.  Only
    /// byte-sized elements are streamable.
    pub fn byte_stream_from_ir_bytes(&mut self, ir_bytes: Addr) -> Addr {
        let num = self.qvector_size(ir_bytes);
        if num < 1 {
            return self.new_byte_stream();
        }
        if self.qvector_objsize(ir_bytes) != 1 {
            self.abort_str("only can create byte stream from str or bytes");
        }
        let s = self.malloc(BYTE_STREAM_SIZE);
        let data = self.malloc(num);
        let src = self.qvector_data(ir_bytes);
        self.heap.copy(data, src, num);
        self.heap.store_u32(s + OFF_READ, 0);
        self.heap.store_u32(s + OFF_LEN, num);
        self.heap.store_u32(s + OFF_CAP, num);
        self.heap.store_u32(s + OFF_DATA, data);
        s
    }

    pub fn free_byte_stream(&mut self, s: Addr) {
        let data = self.heap.load_u32(s + OFF_DATA);
        self.mfree(data);
        self.mfree(s);
    }

    pub fn byte_stream_len(&self, s: Addr) -> u32 {
        self.heap.load_u32(s + OFF_LEN)
    }

    pub fn byte_stream_data(&self, s: Addr) -> Addr {
        self.heap.load_u32(s + OFF_DATA)
    }

    pub fn byte_stream_read_offset(&self, s: Addr) -> u32 {
        self.heap.load_u32(s + OFF_READ)
    }

    pub(crate) fn byte_stream_advance(&mut self, s: Addr, count: u32) {
        let read = self.heap.load_u32(s + OFF_READ);
        self.heap.store_u32(s + OFF_READ, read + count);
    }

    /// Host-side view of the written bytes.
    pub fn byte_stream_as_slice(&self, s: Addr) -> &[u8] {
        let len = self.byte_stream_len(s);
        if len == 0 {
            return &[];
        }
        self.heap.bytes(self.byte_stream_data(s), len)
    }

    fn byte_stream_grow(&mut self, s: Addr, min_cap: u32) {
        let cap = self.heap.load_u32(s + OFF_CAP);
        let new_cap = (cap * 2).max(min_cap).max(1);
        let buf = self.malloc(new_cap);
        let len = self.byte_stream_len(s);
        let old = self.byte_stream_data(s);
        if len > 0 {
            self.heap.copy(buf, old, len);
        }
        self.mfree(old);
        self.heap.store_u32(s + OFF_DATA, buf);
        self.heap.store_u32(s + OFF_CAP, new_cap);
    }

    pub fn byte_stream_write_byte(&mut self, s: Addr, value: u8) {
        let len = self.byte_stream_len(s);
        let cap = self.heap.load_u32(s + OFF_CAP);
        if len + 1 > cap {
            self.byte_stream_grow(s, len + 1);
        }
        let data = self.byte_stream_data(s);
        self.heap.store_u8(data + len, value);
        self.heap.store_u32(s + OFF_LEN, len + 1);
    }

    pub fn byte_stream_write_bytes(&mut self, s: Addr, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let add = bytes.len() as u32;
        let len = self.byte_stream_len(s);
        let cap = self.heap.load_u32(s + OFF_CAP);
        if len + add > cap {
            self.byte_stream_grow(s, len + add);
        }
        let data = self.byte_stream_data(s);
        self.heap.write(data + len, bytes);
        self.heap.store_u32(s + OFF_LEN, len + add);
    }

    /// Appends the written contents of another stream.
    pub fn byte_stream_write_stream(&mut self, s: Addr, other: Addr) {
        let bytes = self.byte_stream_as_slice(other).to_vec();
        self.byte_stream_write_bytes(s, &bytes);
    }

    /// Unread byte count.
    pub fn byte_stream_read_remaining_length(&self, s: Addr) -> u32 {
        let read = self.byte_stream_read_offset(s);
        let len = self.byte_stream_len(s);
        if read >= len {
            0
        } else {
            len - read
        }
    }

    /// Peeks `count` bytes starting `offset` past the read cursor without
    /// consuming them; the result is a fresh byte-element vector.  Aborts
    /// when the stream is too short (or `count` is zero).
    pub fn byte_stream_read_bytes_but_not_consume(
        &mut self,
        s: Addr,
        offset: u32,
        count: u32,
    ) -> Addr {
        let remaining = self.byte_stream_read_remaining_length(s);
        if remaining < offset + count || count == 0 {
            self.abort_str("stream not enough");
        }
        let result = self.qvector(count, 1, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        let src = self.byte_stream_data(s) + self.byte_stream_read_offset(s) + offset;
        let dst = self.qvector_data(result);
        self.heap.copy(dst, src, count);
        self.qvector_set_num(result, count);
        result
    }

    /// Copies the written bytes into a fresh byte-element vector.
    pub fn byte_stream_to_bytes(&mut self, s: Addr) -> Addr {
        let len = self.byte_stream_len(s);
        let result = self.qvector(len.max(1), 1, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        if len == 0 {
            return result;
        }
        let src = self.byte_stream_data(s);
        let dst = self.qvector_data(result);
        self.heap.copy(dst, src, len);
        self.qvector_set_num(result, len);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_collect() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.new_byte_stream();
        rt.byte_stream_write_byte(s, 0xab);
        rt.byte_stream_write_bytes(s, b"hello world bytes"); // forces growth
        assert_eq!(rt.byte_stream_len(s), 18);

        let bytes = rt.byte_stream_to_bytes(s);
        assert_eq!(rt.qvector_as_slice(bytes)[0], 0xab);
        assert_eq!(&rt.qvector_as_slice(bytes)[1..], b"hello world bytes");
    }

    #[test]
    fn peek_does_not_consume() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.new_byte_stream();
        rt.byte_stream_write_bytes(s, &[1, 2, 3, 4, 5]);
        let peeked = rt.byte_stream_read_bytes_but_not_consume(s, 1, 2);
        assert_eq!(rt.qvector_as_slice(peeked), &[2, 3]);
        assert_eq!(rt.byte_stream_read_offset(s), 0);
        assert_eq!(rt.byte_stream_read_remaining_length(s), 5);
    }

    #[test]
    #[should_panic(expected = "stream not enough")]
    fn short_peek_aborts() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.new_byte_stream();
        rt.byte_stream_write_bytes(s, &[1, 2]);
        rt.byte_stream_read_bytes_but_not_consume(s, 0, 3);
    }

    #[test]
    fn stream_from_ir_bytes() {
        let mut rt = Runtime::with_mock_host();
        let v = rt.qvector(4, 1, crate::qvector::QVECTOR_RESIZE_DOUBLE);
        for b in [9u8, 8, 7] {
            rt.qvector_addlast(v, &[b]);
        }
        let s = rt.byte_stream_from_ir_bytes(v);
        assert_eq!(rt.byte_stream_as_slice(s), &[9, 8, 7]);
    }
}
