//! Length-prefixed tagless codec: ULEB128 for all lengths, host (little)
//! endianness for primitives, no type tags.
//!
//! Wire shapes:
//! - primitive: raw little-endian byte image;
//! - byte vector: `uleb(len) ‖ bytes`;
//! - primitive array: `uleb(count) ‖ elements back-to-back`;
//! - string→T map: `uleb(count) ‖ (str(key) ‖ T(value))*`.
//!
//! Decoders bounds-check every read and abort on underflow; there is no
//! recoverable error channel.

use crate::context::RuntimeContext;
use crate::hashtbl::HashtblCursor;
use crate::heap::Addr;
use crate::math::{I256, U256};
use crate::qvector::{QVectorCursor, QVECTOR_RESIZE_DOUBLE};
use crate::runtime::Runtime;
use crate::types::IrType;

const DECODE_RANGE_ERROR: &str = "DataStreamDecodeError: decode offset out of range";

impl Runtime {
    /// Aborts when decode did not consume the whole stream.
    pub fn check_end_offset(&mut self, offset: i32, len: i32) {
        if len > offset {
            self.abort_str("DataStreamDecodeError: too long data stream");
        }
    }

    // ── ULEB128 ──────────────────────────────────────────────────────────

    /// Decodes a ULEB128 value at `offset`; returns `(value, byte_count)`.
    /// Running off the buffer aborts.  Garbage in the high four-order bits
    /// of a 5-byte encoding is tolerated.
    pub fn decode_uleb128(&mut self, buf: Addr, offset: i32, len: i32) -> (i32, i32) {
        let need = |rt: &mut Self, at: i32| -> i32 {
            if at >= len {
                rt.abort_str(DECODE_RANGE_ERROR);
            }
            rt.heap.load_u8(buf + at as u32) as i32
        };

        let mut result = need(self, offset);
        if result <= 0x7f {
            return (result, 1);
        }
        let mut cur = need(self, offset + 1);
        result = (result & 0x7f) | ((cur & 0x7f) << 7);
        if cur <= 0x7f {
            return (result, 2);
        }
        cur = need(self, offset + 2);
        result |= (cur & 0x7f) << 14;
        if cur <= 0x7f {
            return (result, 3);
        }
        cur = need(self, offset + 3);
        result |= (cur & 0x7f) << 21;
        if cur <= 0x7f {
            return (result, 4);
        }
        cur = need(self, offset + 4);
        result |= cur << 28;
        (result, 5)
    }

    /// Just the decoded value.
    pub fn decode_uleb128_value(&mut self, buf: Addr, offset: i32, len: i32) -> i32 {
        self.decode_uleb128(buf, offset, len).0
    }

    /// Encodes `value` at `offset`; returns the byte count written.
    pub fn encode_uleb128(&mut self, value: i32, buf: Addr, offset: u32) -> i32 {
        let mut value = value as u32;
        let mut p = offset;
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.heap.store_u8(buf + p, byte);
            p += 1;
            if value == 0 {
                break;
            }
        }
        (p - offset) as i32
    }

    /// Encoded length of `value` without writing it.
    pub fn uleb128_value_length(&self, value: u32) -> i32 {
        let mut value = value;
        let mut count = 0;
        loop {
            value >>= 7;
            count += 1;
            if value == 0 {
                break;
            }
        }
        count
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Primitives
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! ds_int {
    ($enc:ident, $dec:ident, $ty:ty, $size:expr) => {
        impl Runtime {
            pub fn $enc(&mut self, v: $ty, buf: Addr, offset: i32) -> i32 {
                self.heap.write(buf + offset as u32, &v.to_le_bytes());
                offset + $size
            }

            pub fn $dec(&mut self, buf: Addr, offset: i32, len: i32) -> ($ty, i32) {
                if offset + $size > len {
                    self.abort_str(DECODE_RANGE_ERROR);
                }
                let bytes = self.heap.bytes(buf + offset as u32, $size);
                let v = <$ty>::from_le_bytes(bytes.try_into().unwrap());
                (v, offset + $size)
            }
        }
    };
}

ds_int!(data_stream_encode_u8, data_stream_decode_u8, u8, 1);
ds_int!(data_stream_encode_u16, data_stream_decode_u16, u16, 2);
ds_int!(data_stream_encode_u32, data_stream_decode_u32, u32, 4);
ds_int!(data_stream_encode_u64, data_stream_decode_u64, u64, 8);
ds_int!(data_stream_encode_u128, data_stream_decode_u128, u128, 16);
ds_int!(data_stream_encode_u256, data_stream_decode_u256, U256, 32);
ds_int!(data_stream_encode_i8, data_stream_decode_i8, i8, 1);
ds_int!(data_stream_encode_i16, data_stream_decode_i16, i16, 2);
ds_int!(data_stream_encode_i32, data_stream_decode_i32, i32, 4);
ds_int!(data_stream_encode_i64, data_stream_decode_i64, i64, 8);
ds_int!(data_stream_encode_i128, data_stream_decode_i128, i128, 16);
ds_int!(data_stream_encode_i256, data_stream_decode_i256, I256, 32);

impl Runtime {
    pub fn data_stream_encode_bool(&mut self, v: bool, buf: Addr, offset: i32) -> i32 {
        self.data_stream_encode_u8(v as u8, buf, offset)
    }

    pub fn data_stream_decode_bool(&mut self, buf: Addr, offset: i32, len: i32) -> (u8, i32) {
        self.data_stream_decode_u8(buf, offset, len)
    }

    // ── Byte vectors (strings) ───────────────────────────────────────────

    /// `uleb(len) ‖ bytes`.
    pub fn data_stream_encode_vec(&mut self, v: Addr, buf: Addr, offset: i32) -> i32 {
        let n = self.vector_len(v) as i32;
        let n_offset = self.encode_uleb128(n, buf, offset as u32);
        let bytes = self.vector_as_slice(v).to_vec();
        self.heap.write(buf + (offset + n_offset) as u32, &bytes);
        offset + n_offset + n
    }

    /// Fills a pre-sized vector from `uleb(len) ‖ bytes`.
    pub fn data_stream_decode_vec(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
        let (n, n_offset) = self.decode_uleb128(buf, offset, len);
        self.vector_set_len(v, n as u32);
        if offset + n_offset + n > len {
            self.abort_str(DECODE_RANGE_ERROR);
        }
        let dst = self.vector_bytes(v);
        self.heap.copy(dst, buf + (offset + n_offset) as u32, n as u32);
        offset + n_offset + n
    }

    pub fn data_stream_encode_str(&mut self, v: Addr, buf: Addr, offset: i32) -> i32 {
        self.data_stream_encode_vec(v, buf, offset)
    }

    pub fn data_stream_decode_str(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
        self.data_stream_decode_vec(v, buf, offset, len)
    }

    // ── String arrays ────────────────────────────────────────────────────

    /// Array of string addresses: `uleb(count) ‖ str*`.
    pub fn data_stream_encode_strarray(
        &mut self,
        v: Addr,
        buf: Addr,
        offset: i32,
        ctx: &RuntimeContext,
    ) -> i32 {
        let n = self.qvector_size(v) as i32;
        let n_offset = self.encode_uleb128(n, buf, offset as u32);
        let mut elem_offset = offset + n_offset;
        for i in 0..n {
            let cell = self.qvector_getat(v, i, false, ctx);
            let elem = self.heap.load_u32(cell);
            elem_offset = self.data_stream_encode_str(elem, buf, elem_offset);
        }
        elem_offset
    }

    /// Decodes into an element vector of fresh string addresses.
    pub fn data_stream_decode_strarray(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
        let (n, n_offset) = self.decode_uleb128(buf, offset, len);
        self.qvector_clear(v);
        self.qvector_set_objsize(v, 4);
        let mut elem_offset = offset + n_offset;
        for _ in 0..n {
            let length = self.decode_uleb128_value(buf, elem_offset, len);
            let elem = self.vector_new(length as u32, None);
            elem_offset = self.data_stream_decode_str(elem, buf, elem_offset, len);
            self.qvector_addlast(v, &elem.to_le_bytes());
        }
        elem_offset
    }

    // ── String→string maps ───────────────────────────────────────────────

    pub fn data_stream_encode_strstrmap(&mut self, v: Addr, buf: Addr, offset: i32) -> i32 {
        let n = self.qhashtbl_size(v) as i32;
        let n_offset = self.encode_uleb128(n, buf, offset as u32);
        let mut elem_offset = offset + n_offset;
        let mut cursor = HashtblCursor::default();
        while self.qhashtbl_getnext(v, &mut cursor, true) {
            let key_addr = cursor.key as u32;
            let key_len = self.cstr_len(key_addr);
            let key = self.vector_new_from_arena(key_len, key_addr);
            elem_offset = self.data_stream_encode_str(key, buf, elem_offset);

            // Entry data is a slot holding the value string's address.
            let elem = self.heap.load_u32(cursor.data);
            elem_offset = self.data_stream_encode_str(elem, buf, elem_offset);
        }
        elem_offset
    }

    pub fn data_stream_decode_strstrmap(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
        let (n, n_offset) = self.decode_uleb128(buf, offset, len);
        let mut elem_offset = offset + n_offset;
        for _ in 0..n {
            let k_length = self.decode_uleb128_value(buf, elem_offset, len);
            let key = self.vector_new(k_length as u32, None);
            elem_offset = self.data_stream_decode_str(key, buf, elem_offset, len);

            let v_length = self.decode_uleb128_value(buf, elem_offset, len);
            let elem = self.vector_new(v_length as u32, None);
            elem_offset = self.data_stream_decode_str(elem, buf, elem_offset, len);

            let key_bytes = self.vector_bytes(key);
            self.qhashtbl_put_slice(v, key_bytes as i64, &elem.to_le_bytes());
        }
        elem_offset
    }

    // ── Sizing walks ─────────────────────────────────────────────────────

    /// Upper bound on the encoded size of a string→primitive map.
    pub fn calculate_str_int_map_data_stream_max_size(&mut self, tbl: Addr) -> u32 {
        let mut total = 5u32;
        let mut cursor = HashtblCursor::default();
        while self.qhashtbl_getnext(tbl, &mut cursor, false) {
            total += 5 + self.cstr_len(cursor.key as u32);
            total += cursor.size;
        }
        total
    }

    /// Upper bound on the encoded size of a string→string map.
    pub fn calculate_str_str_map_data_stream_max_size(&mut self, tbl: Addr) -> u32 {
        let mut total = 5u32;
        let mut cursor = HashtblCursor::default();
        while self.qhashtbl_getnext(tbl, &mut cursor, false) {
            total += 5 + self.cstr_len(cursor.key as u32);
            total += cursor.size;
            let elem = self.heap.load_u32(cursor.data);
            total += self.vector_len(elem);
        }
        total
    }

    /// Upper bound on the encoded size of a string array.
    pub fn calculate_str_arr_data_stream_max_size(&mut self, v: Addr) -> u32 {
        let mut total = 5u32;
        let mut cursor = QVectorCursor::default();
        while self.qvector_getnext(v, &mut cursor, false) {
            let elem = self.heap.load_u32(cursor.data);
            total += self.vector_len(elem) + 5;
        }
        total
    }

    /// Total key+value space a map occupies on the data-stream wire.
    pub fn qhashtbl_total_space(&mut self, tbl: Addr) -> u32 {
        let mut space = 0u32;
        let mut cursor = HashtblCursor::default();
        while self.qhashtbl_getnext(tbl, &mut cursor, true) {
            let str_n = if self.qhashtbl_key_is_int(tbl) {
                use IrType::*;
                match IrType::from_u32(self.qhashtbl_key_runtime_ty(tbl)) {
                    Some(U8) | Some(I8) => 1,
                    Some(U16) | Some(I16) => 2,
                    Some(U32) | Some(I32) => 4,
                    Some(U64) | Some(I64) => 8,
                    Some(U128) | Some(I128) => 16,
                    _ => self.abort_str("invalid map int key type"),
                }
            } else {
                self.cstr_len(cursor.key as u32)
            };
            space += self.uleb128_value_length(str_n) as u32;
            space += str_n;
            space += cursor.size;
        }
        space
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Primitive arrays and string→primitive maps
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! ds_int_array {
    ($enc:ident, $dec:ident, $encfn:ident, $decfn:ident, $ty:ty, $size:expr) => {
        impl Runtime {
            /// `uleb(count) ‖ elements back-to-back`.
            pub fn $enc(&mut self, v: Addr, buf: Addr, offset: i32, ctx: &RuntimeContext) -> i32 {
                let n = self.qvector_size(v) as i32;
                let n_offset = self.encode_uleb128(n, buf, offset as u32);
                let mut elem_offset = offset + n_offset;
                for i in 0..n {
                    let elem_addr = self.qvector_getat(v, i, false, ctx);
                    let bytes = self.heap.bytes(elem_addr, $size).to_vec();
                    let elem = <$ty>::from_le_bytes(bytes.as_slice().try_into().unwrap());
                    elem_offset = self.$encfn(elem, buf, elem_offset);
                }
                offset + n_offset + n * $size
            }

            /// Decodes into a cleared element vector.
            pub fn $dec(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
                let (n, n_offset) = self.decode_uleb128(buf, offset, len);
                self.qvector_clear(v);
                self.qvector_set_objsize(v, $size);
                let mut elem_offset = offset + n_offset;
                for _ in 0..n {
                    let (elem, next) = self.$decfn(buf, elem_offset, len);
                    elem_offset = next;
                    self.qvector_addlast(v, &elem.to_le_bytes());
                }
                offset + n_offset + n * $size
            }
        }
    };
}

macro_rules! ds_str_int_map {
    ($enc:ident, $dec:ident, $encfn:ident, $decfn:ident, $ty:ty, $size:expr) => {
        impl Runtime {
            /// `uleb(count) ‖ (str(key) ‖ value)*`.
            pub fn $enc(&mut self, v: Addr, buf: Addr, offset: i32) -> i32 {
                let n = self.qhashtbl_size(v) as i32;
                let n_offset = self.encode_uleb128(n, buf, offset as u32);
                let mut elem_offset = offset + n_offset;
                let mut cursor = HashtblCursor::default();
                while self.qhashtbl_getnext(v, &mut cursor, true) {
                    let key_addr = cursor.key as u32;
                    let key_len = self.cstr_len(key_addr);
                    let key = self.vector_new_from_arena(key_len, key_addr);
                    let bytes = self.heap.bytes(cursor.data, $size).to_vec();
                    let elem = <$ty>::from_le_bytes(bytes.as_slice().try_into().unwrap());
                    elem_offset = self.data_stream_encode_str(key, buf, elem_offset);
                    elem_offset = self.$encfn(elem, buf, elem_offset);
                }
                elem_offset
            }

            pub fn $dec(&mut self, v: Addr, buf: Addr, offset: i32, len: i32) -> i32 {
                let (n, n_offset) = self.decode_uleb128(buf, offset, len);
                let mut elem_offset = offset + n_offset;
                for _ in 0..n {
                    let buf_length = self.decode_uleb128_value(buf, elem_offset, len);
                    let key = self.vector_new(buf_length as u32, None);
                    elem_offset = self.data_stream_decode_str(key, buf, elem_offset, len);
                    let (elem, next) = self.$decfn(buf, elem_offset, len);
                    elem_offset = next;
                    let key_bytes = self.vector_bytes(key);
                    self.qhashtbl_put_slice(v, key_bytes as i64, &elem.to_le_bytes());
                }
                elem_offset
            }
        }
    };
}

ds_int_array!(data_stream_encode_u8array, data_stream_decode_u8array, data_stream_encode_u8, data_stream_decode_u8, u8, 1);
ds_int_array!(data_stream_encode_u16array, data_stream_decode_u16array, data_stream_encode_u16, data_stream_decode_u16, u16, 2);
ds_int_array!(data_stream_encode_u32array, data_stream_decode_u32array, data_stream_encode_u32, data_stream_decode_u32, u32, 4);
ds_int_array!(data_stream_encode_u64array, data_stream_decode_u64array, data_stream_encode_u64, data_stream_decode_u64, u64, 8);
ds_int_array!(data_stream_encode_u128array, data_stream_decode_u128array, data_stream_encode_u128, data_stream_decode_u128, u128, 16);
ds_int_array!(data_stream_encode_u256array, data_stream_decode_u256array, data_stream_encode_u256, data_stream_decode_u256, U256, 32);
ds_int_array!(data_stream_encode_i8array, data_stream_decode_i8array, data_stream_encode_i8, data_stream_decode_i8, i8, 1);
ds_int_array!(data_stream_encode_i16array, data_stream_decode_i16array, data_stream_encode_i16, data_stream_decode_i16, i16, 2);
ds_int_array!(data_stream_encode_i32array, data_stream_decode_i32array, data_stream_encode_i32, data_stream_decode_i32, i32, 4);
ds_int_array!(data_stream_encode_i64array, data_stream_decode_i64array, data_stream_encode_i64, data_stream_decode_i64, i64, 8);
ds_int_array!(data_stream_encode_i128array, data_stream_decode_i128array, data_stream_encode_i128, data_stream_decode_i128, i128, 16);
ds_int_array!(data_stream_encode_i256array, data_stream_decode_i256array, data_stream_encode_i256, data_stream_decode_i256, I256, 32);
ds_int_array!(data_stream_encode_boolarray, data_stream_decode_boolarray, data_stream_encode_u8, data_stream_decode_u8, u8, 1);

ds_str_int_map!(data_stream_encode_strboolmap, data_stream_decode_strboolmap, data_stream_encode_u8, data_stream_decode_u8, u8, 1);
ds_str_int_map!(data_stream_encode_stru8map, data_stream_decode_stru8map, data_stream_encode_u8, data_stream_decode_u8, u8, 1);
ds_str_int_map!(data_stream_encode_stru16map, data_stream_decode_stru16map, data_stream_encode_u16, data_stream_decode_u16, u16, 2);
ds_str_int_map!(data_stream_encode_stru32map, data_stream_decode_stru32map, data_stream_encode_u32, data_stream_decode_u32, u32, 4);
ds_str_int_map!(data_stream_encode_stru64map, data_stream_decode_stru64map, data_stream_encode_u64, data_stream_decode_u64, u64, 8);
ds_str_int_map!(data_stream_encode_stru128map, data_stream_decode_stru128map, data_stream_encode_u128, data_stream_decode_u128, u128, 16);
ds_str_int_map!(data_stream_encode_stru256map, data_stream_decode_stru256map, data_stream_encode_u256, data_stream_decode_u256, U256, 32);
ds_str_int_map!(data_stream_encode_stri8map, data_stream_decode_stri8map, data_stream_encode_i8, data_stream_decode_i8, i8, 1);
ds_str_int_map!(data_stream_encode_stri16map, data_stream_decode_stri16map, data_stream_encode_i16, data_stream_decode_i16, i16, 2);
ds_str_int_map!(data_stream_encode_stri32map, data_stream_decode_stri32map, data_stream_encode_i32, data_stream_decode_i32, i32, 4);
ds_str_int_map!(data_stream_encode_stri64map, data_stream_decode_stri64map, data_stream_encode_i64, data_stream_decode_i64, i64, 8);
ds_str_int_map!(data_stream_encode_stri128map, data_stream_decode_stri128map, data_stream_encode_i128, data_stream_decode_i128, i128, 16);
ds_str_int_map!(data_stream_encode_stri256map, data_stream_decode_stri256map, data_stream_encode_i256, data_stream_decode_i256, I256, 32);

// ─────────────────────────────────────────────────────────────────────────────
// Builtin entry points: encode into a fresh byte array
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! ds_builtin_encode {
    ($name:ident, $encfn:ident, $ty:ty, $size:expr) => {
        impl Runtime {
            pub fn $name(&mut self, value: $ty) -> Addr {
                let out = self.qvector($size, 1, QVECTOR_RESIZE_DOUBLE);
                let data = self.qvector_data(out);
                let n = self.$encfn(value, data, 0);
                self.qvector_set_num(out, n as u32);
                out
            }
        }
    };
}

ds_builtin_encode!(ir_builtin_data_stream_encode_bool, data_stream_encode_bool, bool, 1);
ds_builtin_encode!(ir_builtin_data_stream_encode_u8, data_stream_encode_u8, u8, 1);
ds_builtin_encode!(ir_builtin_data_stream_encode_u16, data_stream_encode_u16, u16, 2);
ds_builtin_encode!(ir_builtin_data_stream_encode_u32, data_stream_encode_u32, u32, 4);
ds_builtin_encode!(ir_builtin_data_stream_encode_u64, data_stream_encode_u64, u64, 8);
ds_builtin_encode!(ir_builtin_data_stream_encode_u128, data_stream_encode_u128, u128, 16);
ds_builtin_encode!(ir_builtin_data_stream_encode_u256, data_stream_encode_u256, U256, 32);
ds_builtin_encode!(ir_builtin_data_stream_encode_i8, data_stream_encode_i8, i8, 1);
ds_builtin_encode!(ir_builtin_data_stream_encode_i16, data_stream_encode_i16, i16, 2);
ds_builtin_encode!(ir_builtin_data_stream_encode_i32, data_stream_encode_i32, i32, 4);
ds_builtin_encode!(ir_builtin_data_stream_encode_i64, data_stream_encode_i64, i64, 8);
ds_builtin_encode!(ir_builtin_data_stream_encode_i128, data_stream_encode_i128, i128, 16);
ds_builtin_encode!(ir_builtin_data_stream_encode_i256, data_stream_encode_i256, I256, 32);

macro_rules! ds_builtin_encode_array {
    ($name:ident, $encfn:ident) => {
        impl Runtime {
            pub fn $name(&mut self, input: Addr) -> Addr {
                let cap = self.qvector_size(input) * self.qvector_objsize(input) + 5;
                let out = self.qvector(cap, 1, QVECTOR_RESIZE_DOUBLE);
                let data = self.qvector_data(out);
                let n = self.$encfn(input, data, 0, &RuntimeContext::UNKNOWN);
                self.qvector_set_num(out, n as u32);
                out
            }
        }
    };
}

ds_builtin_encode_array!(ir_builtin_data_stream_encode_boolarray, data_stream_encode_boolarray);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u8array, data_stream_encode_u8array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u16array, data_stream_encode_u16array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u32array, data_stream_encode_u32array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u64array, data_stream_encode_u64array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u128array, data_stream_encode_u128array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_u256array, data_stream_encode_u256array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i8array, data_stream_encode_i8array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i16array, data_stream_encode_i16array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i32array, data_stream_encode_i32array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i64array, data_stream_encode_i64array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i128array, data_stream_encode_i128array);
ds_builtin_encode_array!(ir_builtin_data_stream_encode_i256array, data_stream_encode_i256array);

macro_rules! ds_builtin_encode_map {
    ($name:ident, $encfn:ident) => {
        impl Runtime {
            pub fn $name(&mut self, input: Addr) -> Addr {
                let cap = self.calculate_str_int_map_data_stream_max_size(input);
                let out = self.qvector(cap, 1, QVECTOR_RESIZE_DOUBLE);
                let data = self.qvector_data(out);
                let n = self.$encfn(input, data, 0);
                self.qvector_set_num(out, n as u32);
                out
            }
        }
    };
}

ds_builtin_encode_map!(ir_builtin_data_stream_encode_strboolmap, data_stream_encode_strboolmap);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru8map, data_stream_encode_stru8map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru16map, data_stream_encode_stru16map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru32map, data_stream_encode_stru32map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru64map, data_stream_encode_stru64map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru128map, data_stream_encode_stru128map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stru256map, data_stream_encode_stru256map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri8map, data_stream_encode_stri8map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri16map, data_stream_encode_stri16map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri32map, data_stream_encode_stri32map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri64map, data_stream_encode_stri64map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri128map, data_stream_encode_stri128map);
ds_builtin_encode_map!(ir_builtin_data_stream_encode_stri256map, data_stream_encode_stri256map);

impl Runtime {
    pub fn ir_builtin_data_stream_encode_str(&mut self, input: Addr) -> Addr {
        let cap = 6 + self.vector_len(input);
        let out = self.qvector(cap, 1, QVECTOR_RESIZE_DOUBLE);
        let data = self.qvector_data(out);
        let n = self.data_stream_encode_str(input, data, 0);
        self.qvector_set_num(out, n as u32);
        out
    }

    pub fn ir_builtin_data_stream_encode_strarray(&mut self, input: Addr) -> Addr {
        let cap = self.calculate_str_arr_data_stream_max_size(input);
        let out = self.qvector(cap, 1, QVECTOR_RESIZE_DOUBLE);
        let data = self.qvector_data(out);
        let n = self.data_stream_encode_strarray(input, data, 0, &RuntimeContext::UNKNOWN);
        self.qvector_set_num(out, n as u32);
        out
    }

    pub fn ir_builtin_data_stream_encode_strstrmap(&mut self, input: Addr) -> Addr {
        let cap = self.calculate_str_str_map_data_stream_max_size(input);
        let out = self.qvector(cap, 1, QVECTOR_RESIZE_DOUBLE);
        let data = self.qvector_data(out);
        let n = self.data_stream_encode_strstrmap(input, data, 0);
        self.qvector_set_num(out, n as u32);
        out
    }
}
