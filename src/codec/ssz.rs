//! Offset-framed, little-endian codec for cross-contract payloads.
//!
//! Two predicates drive the whole layout:
//!
//! - `is_ssz_fixed_len`: true iff every leaf under the type has a size known
//!   purely from the schema (integers, bool, fixed-size arrays of fixed-len
//!   elements, structs whose every field is fixed-len);
//! - `ssz_fix_ty_length`: the byte length of such a type.
//!
//! A struct encodes as `(fixed part ‖ variable part)`: fixed fields inline,
//! variable fields as 4-byte little-endian offsets into the variable part.
//! Arrays of u8/i8 inline their raw bytes; other fixed-element arrays are
//! back-to-back; variable-element arrays lead with an offset table.  There
//! is no outer length prefix and no type tags.

use crate::heap::Addr;
use crate::math::{I256, U256};
use crate::qvector::QVECTOR_RESIZE_DOUBLE;
use crate::runtime::Runtime;
use crate::types::IrType;

const UNKNOWN_TY: &str = "unknown ir runtime type in ssz type";

// ─────────────────────────────────────────────────────────────────────────────
// Integer leaves
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! ssz_int {
    ($enc:ident, $dec:ident, $benc:ident, $bdec:ident, $ty:ty, $size:expr) => {
        impl Runtime {
            /// Little-endian write at `offset`; returns the next offset.
            pub fn $enc(&mut self, v: $ty, buf: Addr, offset: i32) -> i32 {
                self.heap.write(buf + offset as u32, &v.to_le_bytes());
                offset + $size
            }

            /// Little-endian read at `buf`; returns the value.
            pub fn $dec(&mut self, buf: Addr) -> $ty {
                let bytes = self.heap.bytes(buf, $size);
                <$ty>::from_le_bytes(bytes.try_into().unwrap())
            }

            /// Encodes the value behind `val` into a fresh byte array.
            pub fn $benc(&mut self, val: Addr) -> Addr {
                let out = self.qvector($size, 1, QVECTOR_RESIZE_DOUBLE);
                let data = self.qvector_data(out);
                self.heap.copy(data, val, $size);
                self.qvector_set_num(out, $size);
                out
            }

            /// Decodes a byte array into a fresh value allocation.
            pub fn $bdec(&mut self, val: Addr) -> Addr {
                let ret = self.malloc($size);
                let data = self.qvector_data(val);
                self.heap.copy(ret, data, $size);
                ret
            }
        }
    };
}

ssz_int!(ssz_encode_u8, ssz_decode_u8, ir_builtin_ssz_encode_u8, ir_builtin_ssz_decode_u8, u8, 1);
ssz_int!(ssz_encode_u16, ssz_decode_u16, ir_builtin_ssz_encode_u16, ir_builtin_ssz_decode_u16, u16, 2);
ssz_int!(ssz_encode_u32, ssz_decode_u32, ir_builtin_ssz_encode_u32, ir_builtin_ssz_decode_u32, u32, 4);
ssz_int!(ssz_encode_u64, ssz_decode_u64, ir_builtin_ssz_encode_u64, ir_builtin_ssz_decode_u64, u64, 8);
ssz_int!(ssz_encode_u128, ssz_decode_u128, ir_builtin_ssz_encode_u128, ir_builtin_ssz_decode_u128, u128, 16);
ssz_int!(ssz_encode_u256, ssz_decode_u256, ir_builtin_ssz_encode_u256, ir_builtin_ssz_decode_u256, U256, 32);
ssz_int!(ssz_encode_i8, ssz_decode_i8, ir_builtin_ssz_encode_i8, ir_builtin_ssz_decode_i8, i8, 1);
ssz_int!(ssz_encode_i16, ssz_decode_i16, ir_builtin_ssz_encode_i16, ir_builtin_ssz_decode_i16, i16, 2);
ssz_int!(ssz_encode_i32, ssz_decode_i32, ir_builtin_ssz_encode_i32, ir_builtin_ssz_decode_i32, i32, 4);
ssz_int!(ssz_encode_i64, ssz_decode_i64, ir_builtin_ssz_encode_i64, ir_builtin_ssz_decode_i64, i64, 8);
ssz_int!(ssz_encode_i128, ssz_decode_i128, ir_builtin_ssz_encode_i128, ir_builtin_ssz_decode_i128, i128, 16);
ssz_int!(ssz_encode_i256, ssz_decode_i256, ir_builtin_ssz_encode_i256, ir_builtin_ssz_decode_i256, I256, 32);

impl Runtime {
    /// Bool is one byte, 0 or 1.
    pub fn ssz_encode_bool(&mut self, v: bool, buf: Addr, offset: i32) -> i32 {
        self.ssz_encode_u8(v as u8, buf, offset)
    }

    pub fn ssz_decode_bool(&mut self, buf: Addr) -> u8 {
        self.ssz_decode_u8(buf)
    }

    pub fn ir_builtin_ssz_encode_bool(&mut self, val: Addr) -> Addr {
        self.ir_builtin_ssz_encode_u8(val)
    }

    pub fn ir_builtin_ssz_decode_bool(&mut self, val: Addr) -> Addr {
        self.ir_builtin_ssz_decode_u8(val)
    }

    // ── Byte vectors ─────────────────────────────────────────────────────

    /// Writes the 4-byte `data_offset` at `hdr_offset` and the bytes at
    /// `data_offset`; returns the new data cursor.
    pub fn ssz_encode_vec(&mut self, v: Addr, buf: Addr, hdr_offset: i32, data_offset: i32) -> i32 {
        let n = self.vector_len(v);
        self.heap
            .write(buf + hdr_offset as u32, &(data_offset).to_le_bytes());
        let bytes = self.vector_as_slice(v).to_vec();
        self.heap.write(buf + data_offset as u32, &bytes);
        data_offset + n as i32
    }

    /// Fills a pre-sized vector from `length` raw bytes.
    pub fn ssz_decode_vec(&mut self, v: Addr, buf: Addr, length: i32) -> i32 {
        let dst = self.vector_bytes(v);
        self.heap.copy(dst, buf, length as u32);
        length
    }

    pub fn ssz_encode_str(&mut self, v: Addr, buf: Addr, hdr_offset: i32, data_offset: i32) -> i32 {
        self.ssz_encode_vec(v, buf, hdr_offset, data_offset)
    }

    pub fn ssz_decode_str(&mut self, v: Addr, buf: Addr, length: i32) -> i32 {
        self.ssz_decode_vec(v, buf, length)
    }

    /// A string on its own wire is just its raw bytes.
    pub fn ir_builtin_ssz_encode_str(&mut self, val: Addr) -> Addr {
        let len = self.vector_len(val);
        let out = self.qvector(len, 1, QVECTOR_RESIZE_DOUBLE);
        if len > 0 {
            let src = self.vector_bytes(val);
            let dst = self.qvector_data(out);
            self.heap.copy(dst, src, len);
        }
        self.qvector_set_num(out, len);
        out
    }

    pub fn ir_builtin_ssz_decode_str(&mut self, val: Addr) -> Addr {
        let num = self.qvector_size(val);
        let ret = self.vector_new(num, None);
        let src = self.qvector_data(val);
        let dst = self.vector_bytes(ret);
        self.heap.copy(dst, src, num);
        ret
    }

    // ── Classification ───────────────────────────────────────────────────

    /// True iff the encoded length of the type is a pure function of the
    /// schema.
    pub fn is_ssz_fixed_len(&mut self, runtime_class_offset: u32) -> bool {
        use IrType::*;
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        match ty {
            U8 | U16 | U32 | U64 | U128 | U256 | I8 | I16 | I32 | I64 | I128 | I256 | Bool => true,
            Str | Map => false,
            Asset | Struct => {
                let fields = self.class_field_offsets(&class);
                fields.into_iter().all(|field| self.is_ssz_fixed_len(field))
            }
            Array => class.array_size != 0 && self.is_ssz_fixed_len(class.array_item_ty),
        }
    }

    /// Byte length of a fixed-len type.
    pub fn ssz_fix_ty_length(&mut self, runtime_class_offset: u32) -> u32 {
        use IrType::*;
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        match ty {
            Str => self.abort_str("Bug: string is not a ssz encode fixed length"),
            Asset | Struct => {
                let fields = self.class_field_offsets(&class);
                let mut total = 0;
                for field in fields {
                    total += self.ssz_fix_ty_length(field);
                }
                total
            }
            Array => class.array_size * self.ssz_fix_ty_length(class.array_item_ty),
            _ => match ty.int_width() {
                Some(w) => w,
                None => self.abort_str(UNKNOWN_TY),
            },
        }
    }

    /// Total encoded length of a value, walking the schema and the value.
    pub fn ssz_encode_len(&mut self, runtime_class_offset: u32, val: Addr) -> u32 {
        use IrType::*;
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        match ty {
            Str => self.vector_len(val),
            Asset | Struct => {
                let fields = self.class_field_offsets(&class);
                let mut total = 0u32;
                let mut offset = 0u32;
                for field in fields {
                    let field_class = self.class(field);
                    let field_ptr = self.get_data_ptr_of_ptr_value(field, val + offset);
                    total += self.ssz_encode_len(field, field_ptr);
                    if !self.is_ssz_fixed_len(field) {
                        total += 4;
                    }
                    offset += self.get_ir_type_size_as_element(&field_class);
                }
                total
            }
            Array => {
                let elem_ty_offset = class.array_item_ty;
                let elem_class = self.class(elem_ty_offset);
                let num = self.qvector_size(val);
                let mut len = 0u32;
                if elem_class.ty == U8 as u32 || elem_class.ty == I8 as u32 {
                    len += num;
                } else {
                    for i in 0..num {
                        let elem_ptr =
                            self.get_array_elem_ptr_at_idx(runtime_class_offset, val, i);
                        len += self.ssz_encode_len(elem_ty_offset, elem_ptr);
                    }
                }
                if !self.is_ssz_fixed_len(elem_ty_offset) {
                    len += 4 * num;
                }
                len
            }
            Map => self.abort_str(UNKNOWN_TY),
            _ => match ty.int_width() {
                Some(w) => w,
                None => self.abort_str(UNKNOWN_TY),
            },
        }
    }

    // ── Arrays ───────────────────────────────────────────────────────────

    /// Encodes `[T]` / `[T; N]`: u8/i8 arrays inline raw bytes; fixed-len
    /// elements are consecutive; variable-len elements sit behind an
    /// offset table of `4 × n` bytes.
    pub fn ir_builtin_ssz_encode_array(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        let class = self.class(runtime_class_offset);
        debug_assert_eq!(class.ty, IrType::Array as u32);
        let elem_ty_offset = class.array_item_ty;
        let elem_class = self.class(elem_ty_offset);
        let num = self.qvector_size(val);

        let encode_len = self.ssz_encode_len(runtime_class_offset, val);
        let out = self.qvector(encode_len, 1, QVECTOR_RESIZE_DOUBLE);
        let out_data = self.qvector_data(out);

        let mut offset = 0u32;
        if !self.is_ssz_fixed_len(elem_ty_offset) {
            offset = 4 * num;
        }

        if elem_class.ty == IrType::U8 as u32 || elem_class.ty == IrType::I8 as u32 {
            let src = self.qvector_data(val);
            self.heap.copy(out_data + offset, src, num);
        } else {
            for i in 0..num {
                let elem_ptr = self.get_array_elem_ptr_at_idx(runtime_class_offset, val, i);
                let elem_encode = self.ir_builtin_ssz_encode(elem_ty_offset, elem_ptr);
                let elem_len = self.qvector_size(elem_encode);
                let elem_data = self.qvector_data(elem_encode);
                self.heap.copy(out_data + offset, elem_data, elem_len);
                if !self.is_ssz_fixed_len(elem_ty_offset) {
                    self.heap.store_u32(out_data + i * 4, offset);
                }
                offset += elem_len;
            }
        }
        self.qvector_set_num(out, encode_len);
        out
    }

    /// Decodes `[u8]` payloads back into an array value.  The element count
    /// is `payload / elem_len` for fixed-len elements, `first_offset / 4`
    /// for variable-len elements.
    pub fn ir_builtin_ssz_decode_array(
        &mut self,
        runtime_class_offset: u32,
        _allow_empty_object: bool,
        val: Addr,
    ) -> Addr {
        let class = self.class(runtime_class_offset);
        debug_assert_eq!(class.ty, IrType::Array as u32);
        let elem_ty_offset = class.array_item_ty;
        let elem_class = self.class(elem_ty_offset);

        let mut arr_size = 0u32;
        if val != 0 {
            if self.is_ssz_fixed_len(elem_ty_offset) {
                let elem_len = self.ssz_fix_ty_length(elem_ty_offset);
                arr_size = self.qvector_size(val) / elem_len;
            } else if self.qvector_size(val) > 0 {
                let first_offset = self.heap.load_u32(self.qvector_data(val));
                arr_size = first_offset / 4;
            }
        }

        let elem_size = self.get_ir_type_size_as_element(&elem_class);
        if arr_size == 0 {
            return self.qvector(1, elem_size, QVECTOR_RESIZE_DOUBLE);
        }

        let ret = self.qvector(arr_size, elem_size, QVECTOR_RESIZE_DOUBLE);
        self.qvector_set_num(ret, arr_size);
        let ret_data = self.qvector_data(ret);
        let val_data = self.qvector_data(val);

        if self.is_ssz_fixed_len(elem_ty_offset) {
            let elem_len = self.ssz_fix_ty_length(elem_ty_offset);
            let elem_u8_arr = self.qvector(elem_len, 1, QVECTOR_RESIZE_DOUBLE);
            self.qvector_set_num(elem_u8_arr, elem_len);
            for i in 0..arr_size {
                let dst = self.qvector_data(elem_u8_arr);
                self.heap.copy(dst, val_data + i * elem_len, elem_len);
                let elem = self.ir_builtin_ssz_decode_impl(elem_ty_offset, false, elem_u8_arr);
                let elem_ptr = self.get_ptr_of_ptr_value(elem_ty_offset, elem);
                self.heap.copy(ret_data + i * elem_size, elem_ptr, elem_size);
            }
        } else {
            let mut offset = 4 * arr_size;
            for i in 0..arr_size {
                // Malformed offset tables wrap to huge lengths, which the
                // allocator then rejects.
                let elem_len = if i + 1 < arr_size {
                    let next = self.heap.load_u32(val_data + (i + 1) * 4);
                    let this = self.heap.load_u32(val_data + i * 4);
                    next.wrapping_sub(this)
                } else {
                    let this = self.heap.load_u32(val_data + i * 4);
                    (self.qvector_size(val) * self.qvector_objsize(val)).wrapping_sub(this)
                };
                let elem_u8_arr = self.qvector(elem_len, 1, QVECTOR_RESIZE_DOUBLE);
                let dst = self.qvector_data(elem_u8_arr);
                self.heap.copy(dst, val_data + offset, elem_len);
                self.qvector_set_num(elem_u8_arr, elem_len);

                let elem = self.ir_builtin_ssz_decode_impl(elem_ty_offset, false, elem_u8_arr);
                let elem_ptr = self.get_ptr_of_ptr_value(elem_ty_offset, elem);
                self.heap.copy(ret_data + i * elem_size, elem_ptr, elem_size);
                offset += elem_len;
            }
        }
        ret
    }

    // ── Structs / assets ─────────────────────────────────────────────────

    /// Two cursors: `hdr` walks the fixed part from the front, `offset`
    /// starts past it.  Fixed fields land at `hdr`; variable fields write
    /// their `offset` at `hdr` and their payload at `offset`.
    pub fn ir_builtin_ssz_encode_struct_like_ty(
        &mut self,
        runtime_class_offset: u32,
        val: Addr,
    ) -> Addr {
        let class = self.class(runtime_class_offset);
        let encode_len = self.ssz_encode_len(runtime_class_offset, val);
        let out = self.qvector(encode_len, 1, QVECTOR_RESIZE_DOUBLE);
        let out_data = self.qvector_data(out);
        let fields = self.class_field_offsets(&class);

        let mut offset = 0u32;
        for field in &fields {
            if self.is_ssz_fixed_len(*field) {
                offset += self.ssz_fix_ty_length(*field);
            } else {
                offset += 4;
            }
        }

        let mut hdr = 0u32;
        let mut ptr_offset = 0u32;
        for field in fields {
            let field_class = self.class(field);
            let field_ptr = self.get_data_ptr_of_ptr_value(field, val + ptr_offset);
            let elem_encode = self.ir_builtin_ssz_encode(field, field_ptr);
            let elem_len = self.qvector_size(elem_encode);
            let elem_data = self.qvector_data(elem_encode);

            if self.is_ssz_fixed_len(field) {
                self.heap.copy(out_data + hdr, elem_data, elem_len);
                hdr += elem_len;
            } else {
                self.heap.copy(out_data + offset, elem_data, elem_len);
                self.heap.store_u32(out_data + hdr, offset);
                offset += elem_len;
                hdr += 4;
            }
            ptr_offset += self.get_ir_type_size_as_element(&field_class);
        }

        self.qvector_set_num(out, encode_len);
        out
    }

    /// First pass assigns `(offset, length)` to each field — fixed fields
    /// take `(cursor, fix_len)`, variable fields read their 4-byte offset;
    /// a second pass closes variable lengths against the next offset (or
    /// the total length).  Then every field decodes from its slice.
    ///
    /// `val == 0` with `allow_empty_object` yields a fully zeroed value.
    pub fn ir_builtin_ssz_decode_struct_like_ty(
        &mut self,
        runtime_class_offset: u32,
        allow_empty_object: bool,
        val: Addr,
    ) -> Addr {
        if val == 0 && !allow_empty_object {
            self.abort_str("ssz decode empty bytes failed");
        }
        let class = self.class(runtime_class_offset);
        let fields = self.class_field_offsets(&class);
        let fields_count = fields.len();

        // (offset, length) per field; (wire offset, field index) per
        // variable-length field.
        let mut field_spans = vec![(0u32, 0u32); fields_count];
        let mut offsets = vec![(0u32, 0usize); fields_count];
        let mut variable_len_field_count = 0usize;
        let mut offset = 0u32;

        for (i, field) in fields.iter().enumerate() {
            if self.is_ssz_fixed_len(*field) {
                let field_len = self.ssz_fix_ty_length(*field);
                field_spans[i] = (offset, field_len);
                offset += field_len;
            } else {
                if val != 0 {
                    let val_data = self.qvector_data(val);
                    offsets[variable_len_field_count].0 = self.heap.load_u32(val_data + offset);
                }
                offsets[variable_len_field_count].1 = i;
                offset += 4;
                variable_len_field_count += 1;
            }
        }

        if val != 0 && variable_len_field_count > 0 {
            for i in 0..variable_len_field_count - 1 {
                field_spans[offsets[i].1] =
                    (offsets[i].0, offsets[i + 1].0.wrapping_sub(offsets[i].0));
            }
            let last = variable_len_field_count - 1;
            let total = self.qvector_size(val);
            field_spans[offsets[last].1] = (offsets[last].0, total.wrapping_sub(offsets[last].0));
        }

        let value_size = self.calculate_ir_type_size(&class);
        let ret = self.malloc(value_size);
        self.heap.fill(ret, 0, value_size);

        let mut offset = 0u32;
        for (i, field) in fields.iter().enumerate() {
            let field_class = self.class(*field);
            let field_size = self.get_ir_type_size_as_element(&field_class);

            if val == 0 {
                let field_value = self.ir_builtin_create_ir_value(*field);
                self.store_field_slot(ret + offset, &field_class, field_value);
                offset += field_size;
                continue;
            }

            let (span_offset, span_len) = field_spans[i];
            let field_u8_arr = self.qvector(span_len, 1, QVECTOR_RESIZE_DOUBLE);
            let dst = self.qvector_data(field_u8_arr);
            let val_data = self.qvector_data(val);
            self.heap.copy(dst, val_data + span_offset, span_len);
            self.qvector_set_num(field_u8_arr, span_len);

            let field_value = self.ir_builtin_ssz_decode_impl(*field, false, field_u8_arr);
            let field_ptr = self.get_ptr_of_ptr_value(*field, field_value);
            self.heap.copy(ret + offset, field_ptr, field_size);
            offset += field_size;
        }
        ret
    }

    // ── Schema dispatch ──────────────────────────────────────────────────

    /// Encodes any value to a fresh byte array.
    pub fn ir_builtin_ssz_encode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        let out = match ty {
            U8 => self.ir_builtin_ssz_encode_u8(val),
            U16 => self.ir_builtin_ssz_encode_u16(val),
            U32 => self.ir_builtin_ssz_encode_u32(val),
            U64 => self.ir_builtin_ssz_encode_u64(val),
            U128 => self.ir_builtin_ssz_encode_u128(val),
            U256 => self.ir_builtin_ssz_encode_u256(val),
            I8 => self.ir_builtin_ssz_encode_i8(val),
            I16 => self.ir_builtin_ssz_encode_i16(val),
            I32 => self.ir_builtin_ssz_encode_i32(val),
            I64 => self.ir_builtin_ssz_encode_i64(val),
            I128 => self.ir_builtin_ssz_encode_i128(val),
            I256 => self.ir_builtin_ssz_encode_i256(val),
            Bool => self.ir_builtin_ssz_encode_bool(val),
            Str => self.ir_builtin_ssz_encode_str(val),
            Asset | Struct => self.ir_builtin_ssz_encode_struct_like_ty(runtime_class_offset, val),
            Array => self.ir_builtin_ssz_encode_array(runtime_class_offset, val),
            Map => self.abort_str(UNKNOWN_TY),
        };
        self.leave_recursion();
        out
    }

    /// Decodes a byte array into a fresh value of the type.
    pub fn ir_builtin_ssz_decode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        self.ir_builtin_ssz_decode_impl(runtime_class_offset, false, val)
    }

    pub fn ir_builtin_ssz_decode_impl(
        &mut self,
        runtime_class_offset: u32,
        allow_empty_object: bool,
        val: Addr,
    ) -> Addr {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        let ret = match ty {
            U8 => self.ir_builtin_ssz_decode_u8(val),
            U16 => self.ir_builtin_ssz_decode_u16(val),
            U32 => self.ir_builtin_ssz_decode_u32(val),
            U64 => self.ir_builtin_ssz_decode_u64(val),
            U128 => self.ir_builtin_ssz_decode_u128(val),
            U256 => self.ir_builtin_ssz_decode_u256(val),
            I8 => self.ir_builtin_ssz_decode_i8(val),
            I16 => self.ir_builtin_ssz_decode_i16(val),
            I32 => self.ir_builtin_ssz_decode_i32(val),
            I64 => self.ir_builtin_ssz_decode_i64(val),
            I128 => self.ir_builtin_ssz_decode_i128(val),
            I256 => self.ir_builtin_ssz_decode_i256(val),
            Bool => self.ir_builtin_ssz_decode_bool(val),
            Str => self.ir_builtin_ssz_decode_str(val),
            Asset | Struct => {
                self.ir_builtin_ssz_decode_struct_like_ty(runtime_class_offset, allow_empty_object, val)
            }
            Array => self.ir_builtin_ssz_decode_array(runtime_class_offset, allow_empty_object, val),
            Map => self.abort_str(UNKNOWN_TY),
        };
        self.leave_recursion();
        ret
    }

    /// Raw-pointer decode entry: wraps `(ptr, len)` host bytes into a byte
    /// array first.  Assets may legitimately have no persisted data yet, so
    /// `allow_empty_object` turns an empty payload into a zeroed value.
    pub fn ir_builtin_ssz_decode_void_ptr(
        &mut self,
        runtime_class_offset: u32,
        allow_empty_object: bool,
        val: Addr,
        data_len: u32,
    ) -> Addr {
        if data_len == 0 && !allow_empty_object {
            self.abort_str("ssz decode can't decode empty bytes");
        }
        let mut u8_vec = 0;
        if data_len > 0 {
            u8_vec = self.qvector(data_len, 1, QVECTOR_RESIZE_DOUBLE);
            let dst = self.qvector_data(u8_vec);
            self.heap.copy(dst, val, data_len);
            self.qvector_set_num(u8_vec, data_len);
        }
        self.ir_builtin_ssz_decode_impl(runtime_class_offset, allow_empty_object, u8_vec)
    }

    // ── Versioned variants ───────────────────────────────────────────────

    /// Skips a leading version prefix when `is_versioned`.
    pub fn ir_builtin_versioned_ssz_get_data_ptr(
        &mut self,
        data_ptr: Addr,
        data_len: u32,
        is_versioned: bool,
        ssz_version_size: u32,
    ) -> Addr {
        if data_ptr == 0 || data_len == 0 {
            return 0;
        }
        if is_versioned {
            data_ptr + ssz_version_size
        } else {
            data_ptr
        }
    }

    pub fn ir_builtin_versioned_ssz_get_data_len(
        &mut self,
        data_len: u32,
        is_versioned: bool,
        ssz_version_size: u32,
    ) -> u32 {
        if data_len == 0 {
            return 0;
        }
        if is_versioned {
            data_len - ssz_version_size
        } else {
            data_len
        }
    }
}
