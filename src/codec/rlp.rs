//! Recursive-length-prefix codec, bit-exact Ethereum RLP.
//!
//! Encoding rules:
//! - a single byte below 0x80 encodes itself;
//! - a byte string of length L < 56 is prefixed `0x80 + L`, longer strings
//!   `0xb7 + len(be(L)) ‖ be(L)`;
//! - a list payload of length L < 56 is prefixed `0xc0 + L`, longer lists
//!   `0xf7 + len(be(L)) ‖ be(L)`;
//! - integers are minimal big-endian byte strings, zero is empty.
//!
//! Schema-driven dispatch covers integers, bool, strings, structs (lists of
//! their fields) and arrays (byte strings for u8/i8 elements, lists
//! otherwise).  Assets and maps are unsupported on this wire.

use crate::heap::Addr;
use crate::math::U256;
use crate::qvector::QVECTOR_RESIZE_DOUBLE;
use crate::runtime::Runtime;
use crate::types::IrType;

/// Decoded node kind: a byte string or a list of nested items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlpValueType {
    Str,
    List,
}

// Minimal big-endian image of an integer; zero is the empty string.
fn be_minimal(le_bytes: &[u8]) -> Vec<u8> {
    let mut count = le_bytes.len();
    while count > 1 && le_bytes[count - 1] == 0 {
        count -= 1;
    }
    if count == 1 && le_bytes[0] == 0 {
        return Vec::new();
    }
    le_bytes[..count].iter().rev().copied().collect()
}

// Big-endian fold; overlong inputs wrap like the target's machine words.
fn fold_be_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |sum, b| sum.wrapping_mul(256).wrapping_add(*b as u64))
}

fn fold_be_u128(bytes: &[u8]) -> u128 {
    bytes
        .iter()
        .fold(0u128, |sum, b| sum.wrapping_mul(256).wrapping_add(*b as u128))
}

fn fold_be_u256(bytes: &[u8]) -> U256 {
    bytes.iter().fold(U256::ZERO, |sum, b| {
        sum.shl(8).wrapping_add(U256::from_u64(*b as u64))
    })
}

impl Runtime {
    // Big-endian integer emission used by the length prefix.
    fn rlp_encode_int(&mut self, stream: Addr, value: u64) -> u32 {
        if value == 0 {
            return 0;
        }
        let count = self.rlp_encode_int(stream, value / 256);
        self.byte_stream_write_byte(stream, (value % 256) as u8);
        count + 1
    }

    fn rlp_encode_length(&mut self, stream: Addr, len: u32, offset: u32) {
        if len < 56 {
            self.byte_stream_write_byte(stream, (len + offset) as u8);
            return;
        }
        // 256**8 is unrepresentable here; u32 lengths always fit.
        let len_bs = self.new_byte_stream();
        let count = self.rlp_encode_int(len_bs, len as u64);
        self.byte_stream_write_byte(stream, (count + offset + 55) as u8);
        self.byte_stream_write_stream(stream, len_bs);
        self.free_byte_stream(len_bs);
    }

    /// Encodes a byte vector as an RLP string.
    pub fn rlp_encode_str(&mut self, stream: Addr, value: Addr) {
        let bytes = self.vector_as_slice(value).to_vec();
        self.rlp_encode_raw(stream, &bytes);
    }

    /// Encodes a byte-element vector as an RLP string.
    pub fn rlp_encode_bytes(&mut self, stream: Addr, value: Addr) {
        let bytes = self.qvector_as_slice(value).to_vec();
        self.rlp_encode_raw(stream, &bytes);
    }

    fn rlp_encode_raw(&mut self, stream: Addr, bytes: &[u8]) {
        if bytes.len() == 1 && bytes[0] < 0x80 {
            self.byte_stream_write_byte(stream, bytes[0]);
            return;
        }
        self.rlp_encode_length(stream, bytes.len() as u32, 0x80);
        self.byte_stream_write_bytes(stream, bytes);
    }

    /// Encodes an element vector of byte-vector addresses as an RLP list of
    /// strings.
    pub fn rlp_encode_str_list(&mut self, stream: Addr, list: Addr) {
        let content_bs = self.new_byte_stream();
        let num = self.qvector_size(list);
        let ctx = crate::context::RuntimeContext::UNKNOWN;
        for i in 0..num {
            let cell = self.qvector_getat(list, i as i32, false, &ctx);
            let item = self.heap.load_u32(cell);
            self.rlp_encode_str(content_bs, item);
        }
        let content_len = self.byte_stream_len(content_bs);
        self.rlp_encode_length(stream, content_len, 0xc0);
        self.byte_stream_write_stream(stream, content_bs);
    }

    /// Encodes an element vector of byte-array addresses as an RLP list.
    /// An empty list writes nothing.
    pub fn rlp_encode_bytes_list(&mut self, stream: Addr, list: Addr) {
        let num = self.qvector_size(list);
        if num == 0 {
            return;
        }
        let content_bs = self.new_byte_stream();
        let ctx = crate::context::RuntimeContext::UNKNOWN;
        for i in 0..num {
            let cell = self.qvector_getat(list, i as i32, false, &ctx);
            let item = self.heap.load_u32(cell);
            self.rlp_encode_bytes(content_bs, item);
        }
        let content_len = self.byte_stream_len(content_bs);
        self.rlp_encode_length(stream, content_len, 0xc0);
        self.byte_stream_write_stream(stream, content_bs);
    }

    fn rlp_bytes_to_int(&mut self, bs: Addr) -> i64 {
        let bytes = self.qvector_as_slice(bs).to_vec();
        if bytes.is_empty() {
            self.abort_str("not enough rlp bytes");
        }
        bytes
            .iter()
            .fold(0i64, |sum, b| sum.wrapping_mul(256).wrapping_add(*b as i64))
    }

    // Parses the prefix at the read cursor: classifies string vs list,
    // consumes the prefix bytes, returns the payload length.
    fn rlp_decode_length(&mut self, stream: Addr) -> (u32, RlpValueType) {
        let len = self.byte_stream_read_remaining_length(stream) as u64;
        if len == 0 {
            self.abort_str("rlp decode input not enough length");
        }
        let read = self.byte_stream_read_offset(stream);
        let prefix = self.heap.load_u8(self.byte_stream_data(stream) + read) as u64;

        if prefix <= 0x7f {
            // The byte is its own payload; nothing consumed here.
            return (1, RlpValueType::Str);
        }
        // Underflowing guards wrap to huge values and fail the comparison,
        // so a prefix whose payload check failed falls through to the next
        // form (and ultimately to the abort below).
        if prefix <= 0xb7 && len > prefix - 0x80 {
            self.byte_stream_advance(stream, 1);
            return ((prefix - 0x80) as u32, RlpValueType::Str);
        }
        if prefix <= 0xbf && len > prefix.wrapping_sub(0xb7) {
            let len_of_str_len = (prefix - 0xb7) as u32;
            let peek = self.byte_stream_read_bytes_but_not_consume(stream, 1, len_of_str_len);
            let str_len = self.rlp_bytes_to_int(peek) as u64;
            if len > prefix - 0xb7 + str_len {
                self.byte_stream_advance(stream, 1 + len_of_str_len);
                return (str_len as u32, RlpValueType::Str);
            }
        }
        if prefix <= 0xf7 && len > prefix.wrapping_sub(0xc0) {
            self.byte_stream_advance(stream, 1);
            return ((prefix - 0xc0) as u32, RlpValueType::List);
        }
        if prefix <= 0xff && len > prefix.wrapping_sub(0xf7) {
            let len_of_list_len = (prefix - 0xf7) as u32;
            let peek = self.byte_stream_read_bytes_but_not_consume(stream, 1, len_of_list_len);
            let list_len = self.rlp_bytes_to_int(peek) as u64;
            if len > prefix - 0xf7 + list_len {
                self.byte_stream_advance(stream, 1 + len_of_list_len);
                return (list_len as u32, RlpValueType::List);
            }
        }
        self.abort_str("rlp decode length failed");
    }

    /// Schema-free decode: returns a byte-element vector for strings, or an
    /// element vector of nested item addresses for lists.
    pub fn rlp_decode(&mut self, stream: Addr) -> Addr {
        if self.byte_stream_read_offset(stream) >= self.byte_stream_len(stream) {
            self.abort_str("rlp decode empty bytes");
        }

        let (data_len, ty) = self.rlp_decode_length(stream);
        match ty {
            RlpValueType::Str => {
                let result = self.qvector(data_len.max(1), 1, QVECTOR_RESIZE_DOUBLE);
                let src = self.byte_stream_data(stream) + self.byte_stream_read_offset(stream);
                let dst = self.qvector_data(result);
                self.heap.copy(dst, src, data_len);
                self.qvector_set_num(result, data_len);
                self.byte_stream_advance(stream, data_len);
                result
            }
            RlpValueType::List => {
                // data_len is the payload byte count, not the item count.
                let result = self.qvector(data_len.max(1), 4, QVECTOR_RESIZE_DOUBLE);
                let end_offset = self.byte_stream_read_offset(stream) + data_len;
                for _ in 0..data_len {
                    if self.byte_stream_read_offset(stream) >= end_offset {
                        break;
                    }
                    let item = self.rlp_decode(stream);
                    self.qvector_addlast(result, &item.to_le_bytes());
                }
                result
            }
        }
    }

    // ── Schema-driven encode ─────────────────────────────────────────────

    /// Encodes a value of the type at `runtime_class_offset` onto `stream`.
    pub fn common_rlp_encode(&mut self, stream: Addr, runtime_class_offset: u32, val: Addr) {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str("unknown ir runtime type in rlp type");
        };
        match ty {
            U8 => {
                let v = self.heap.load_u8(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            U16 => {
                let v = self.heap.load_u16(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            U32 => {
                let v = self.heap.load_u32(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            U64 => {
                let v = self.heap.load_u64(val);
                self.rlp_encode_uint(stream, v);
            }
            I8 => {
                // negative values zero-extend their bit pattern
                let v = self.heap.load_u8(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            I16 => {
                let v = self.heap.load_u16(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            I32 => {
                let v = self.heap.load_u32(val) as u64;
                self.rlp_encode_uint(stream, v);
            }
            I64 => {
                let v = self.heap.load_u64(val);
                self.rlp_encode_uint(stream, v);
            }
            U128 | I128 => {
                let bytes = self.heap.bytes(val, 16).to_vec();
                let be = be_minimal(&bytes);
                self.rlp_encode_raw(stream, &be);
            }
            U256 | I256 => {
                let bytes = self.heap.bytes(val, 32).to_vec();
                let be = be_minimal(&bytes);
                self.rlp_encode_raw(stream, &be);
            }
            Bool => {
                let v = self.heap.load_u8(val) as u64;
                self.rlp_encode_uint(stream, if v != 0 { 1 } else { 0 });
            }
            Str => self.rlp_encode_str(stream, val),
            Asset => self.abort_str("asset not supported in ir rlp"),
            Struct => {
                let fields = self.class_field_offsets(&class);
                let content_bs = self.new_byte_stream();
                let mut offset = 0u32;
                for field in fields {
                    let field_class = self.class(field);
                    let field_ptr = self.get_data_ptr_of_ptr_value(field, val + offset);
                    self.common_rlp_encode(content_bs, field, field_ptr);
                    offset += self.get_ir_type_size_as_element(&field_class);
                }
                let content_len = self.byte_stream_len(content_bs);
                self.rlp_encode_length(stream, content_len, 0xc0);
                self.byte_stream_write_stream(stream, content_bs);
            }
            Array => {
                let elem_ty_offset = class.array_item_ty;
                let elem_class = self.class(elem_ty_offset);
                if elem_class.ty == U8 as u32 || elem_class.ty == I8 as u32 {
                    // [u8]/[i8] goes on the wire as one byte string; an
                    // empty array encodes like empty bytes.
                    self.rlp_encode_bytes(stream, val);
                } else {
                    let content_bs = self.new_byte_stream();
                    let num = self.qvector_size(val);
                    for i in 0..num {
                        let elem_ptr =
                            self.get_array_elem_ptr_at_idx(runtime_class_offset, val, i);
                        self.common_rlp_encode(content_bs, elem_ty_offset, elem_ptr);
                    }
                    let content_len = self.byte_stream_len(content_bs);
                    self.rlp_encode_length(stream, content_len, 0xc0);
                    self.byte_stream_write_stream(stream, content_bs);
                }
            }
            Map => self.abort_str("map type not supported in ir rlp"),
        }
        self.leave_recursion();
    }

    fn rlp_encode_uint(&mut self, stream: Addr, value: u64) {
        let be = be_minimal(&value.to_le_bytes());
        self.rlp_encode_raw(stream, &be);
    }

    pub fn ir_builtin_rlp_encode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        let stream = self.new_byte_stream();
        self.common_rlp_encode(stream, runtime_class_offset, val);
        self.byte_stream_to_bytes(stream)
    }

    // ── Schema-driven decode ─────────────────────────────────────────────

    /// Decodes the next item off `stream` as a value of the type; returns a
    /// fresh value allocation.
    pub fn common_rlp_decode(&mut self, stream: Addr, runtime_class_offset: u32) -> Addr {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str("unknown ir runtime type in ir rlp type");
        };
        let ret = match ty {
            U8 | U16 | U32 | U64 | I8 | I16 | I32 | I64 => {
                let int_bytes = self.rlp_decode(stream);
                let value = fold_be_u64(self.qvector_as_slice(int_bytes));
                let width = class.ir_type().and_then(IrType::int_width).unwrap_or(8);
                let out = self.malloc(width);
                self.heap.write(out, &value.to_le_bytes()[..width as usize]);
                out
            }
            U128 | I128 => {
                let int_bytes = self.rlp_decode(stream);
                let value = fold_be_u128(self.qvector_as_slice(int_bytes));
                let out = self.malloc(16);
                self.heap.write(out, &value.to_le_bytes());
                out
            }
            U256 | I256 => {
                let int_bytes = self.rlp_decode(stream);
                let value = fold_be_u256(self.qvector_as_slice(int_bytes));
                let out = self.malloc(32);
                self.heap.write(out, &value.to_le_bytes());
                out
            }
            Bool => {
                let int_bytes = self.rlp_decode(stream);
                let value = fold_be_u64(self.qvector_as_slice(int_bytes));
                let out = self.malloc(1);
                self.heap.store_u8(out, (value != 0) as u8);
                out
            }
            Str => {
                let decoded = self.rlp_decode(stream);
                let num = self.qvector_size(decoded);
                let data = self.qvector_data(decoded);
                self.vector_new_from_arena_or_empty(num, data)
            }
            Asset => self.abort_str("asset not supported in ir rlp"),
            Struct => {
                let result = self.ir_builtin_create_ir_value(runtime_class_offset);
                let (_, list_ty) = self.rlp_decode_length(stream);
                if list_ty != RlpValueType::List {
                    self.abort_str("invalid rlp type to decode struct");
                }
                let fields = self.class_field_offsets(&class);
                let mut offset = 0u32;
                for field in fields {
                    let field_class = self.class(field);
                    let elem_size = self.get_ir_type_size_as_element(&field_class);
                    let field_value = self.common_rlp_decode(stream, field);
                    if self.is_pointer_type(field) {
                        self.heap.store_u32(result + offset, field_value);
                    } else {
                        self.heap.copy(result + offset, field_value, elem_size);
                    }
                    offset += elem_size;
                }
                result
            }
            Array => {
                let elem_ty_offset = class.array_item_ty;
                let elem_class = self.class(elem_ty_offset);
                if elem_class.ty == U8 as u32 || elem_class.ty == I8 as u32 {
                    // Byte arrays come back as the raw string; the declared
                    // array_size is not enforced.
                    self.rlp_decode(stream)
                } else {
                    let (data_len, list_ty) = self.rlp_decode_length(stream);
                    if list_ty != RlpValueType::List {
                        self.abort_str("unknown rlp value type when decode");
                    }
                    let elem_size = self.get_ir_type_size_as_element(&elem_class);
                    let result =
                        self.qvector(data_len.max(1), elem_size, QVECTOR_RESIZE_DOUBLE);
                    let end_offset = self.byte_stream_read_offset(stream) + data_len;
                    while self.byte_stream_read_offset(stream) < end_offset {
                        let item = self.common_rlp_decode(stream, elem_ty_offset);
                        if self.is_pointer_type(elem_ty_offset) {
                            self.qvector_addlast(result, &item.to_le_bytes());
                        } else {
                            self.qvector_addlast_from_arena(result, item);
                        }
                    }
                    result
                }
            }
            Map => self.abort_str("map type not supported in ir rlp"),
        };
        self.leave_recursion();
        ret
    }

    pub fn ir_builtin_rlp_decode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        let stream = self.byte_stream_from_ir_bytes(val);
        self.common_rlp_decode(stream, runtime_class_offset)
    }
}
