//! Schema-driven JSON codec over the `serde_json` object model.
//!
//! Encode mirrors the schema: integers become numbers (arbitrary-precision,
//! so u128/u256 survive), bool and strings map directly, arrays become
//! arrays, structs/assets become objects keyed by field names, and maps
//! become objects with stringified keys (integer keys through decimal
//! rendering).  Decode validates each node's kind against the schema and
//! aborts with a specific message on mismatch; struct members must appear
//! in declared field order, which is why the object model preserves
//! insertion order.

use serde_json::{Number, Value};

use crate::hashtbl::HashtblCursor;
use crate::heap::Addr;
use crate::math::U256;
use crate::qvector::QVECTOR_RESIZE_DOUBLE;
use crate::runtime::Runtime;
use crate::types::IrType;

const UNKNOWN_TY: &str = "unknown ir runtime type in json type";

impl Runtime {
    // ── Encode ───────────────────────────────────────────────────────────

    fn json_number_from_le(&mut self, bytes: &[u8], signed: bool) -> Value {
        let mut wide = [0u8; 32];
        let negative = signed && bytes.last().is_some_and(|b| b & 0x80 != 0);
        if negative {
            wide.fill(0xff);
        }
        wide[..bytes.len()].copy_from_slice(bytes);
        let magnitude = U256::from_le_bytes(wide);
        let rendered = if negative {
            format!("-{}", self.u256_toa(magnitude.wrapping_neg(), 10))
        } else {
            self.u256_toa(magnitude, 10)
        };
        Value::Number(Number::from_string_unchecked(rendered))
    }

    /// Builds the JSON document for a value of the type.
    pub fn ir_type_to_json(&mut self, runtime_class_offset: u32, val: Addr) -> Value {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        let out = match ty {
            U8 | U16 | U32 | U64 | U128 | U256 => {
                let width = ty.int_width().unwrap_or(4);
                let bytes = self.heap.bytes(val, width).to_vec();
                self.json_number_from_le(&bytes, false)
            }
            I8 | I16 | I32 | I64 | I128 | I256 => {
                let width = ty.int_width().unwrap_or(4);
                let bytes = self.heap.bytes(val, width).to_vec();
                self.json_number_from_le(&bytes, true)
            }
            Bool => Value::Bool(self.heap.load_u8(val) != 0),
            Str => {
                let bytes = self.vector_as_slice(val);
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            Array => {
                let elem_ty_offset = class.array_item_ty;
                let num = self.qvector_size(val);
                let mut items = Vec::with_capacity(num as usize);
                for i in 0..num {
                    let elem_ptr = self.get_array_elem_ptr_at_idx(runtime_class_offset, val, i);
                    items.push(self.ir_type_to_json(elem_ty_offset, elem_ptr));
                }
                Value::Array(items)
            }
            Asset | Struct => {
                let fields = self.class_field_offsets(&class);
                let names = self.class_field_name_offsets(&class);
                let mut object = serde_json::Map::new();
                let mut ptr_offset = 0u32;
                for (field, name_offset) in fields.into_iter().zip(names) {
                    let field_class = self.class(field);
                    let field_ptr = self.get_data_ptr_of_ptr_value(field, val + ptr_offset);
                    let field_json = self.ir_type_to_json(field, field_ptr);
                    let name = self.class_name_bytes(name_offset);
                    object.insert(String::from_utf8_lossy(&name).into_owned(), field_json);
                    ptr_offset += self.get_ir_type_size_as_element(&field_class);
                }
                Value::Object(object)
            }
            Map => {
                let mut object = serde_json::Map::new();
                let mut cursor = HashtblCursor::default();
                while self.qhashtbl_getnext(val, &mut cursor, true) {
                    let val_ptr =
                        self.get_data_ptr_of_ptr_value(class.map_value_ty, cursor.data);
                    let key = if self.qhashtbl_key_is_int(val) {
                        self.i64_toa(cursor.key, 10)
                    } else {
                        let key_addr = cursor.key as u32;
                        let key_len = self.cstr_len(key_addr);
                        String::from_utf8_lossy(self.heap.bytes(key_addr, key_len)).into_owned()
                    };
                    let value_json = self.ir_type_to_json(class.map_value_ty, val_ptr);
                    object.insert(key, value_json);
                }
                Value::Object(object)
            }
        };
        self.leave_recursion();
        out
    }

    /// JSON-encodes a value into a byte vector.
    pub fn ir_builtin_json_encode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        let doc = self.ir_type_to_json(runtime_class_offset, val);
        let rendered = doc.to_string();
        self.vector_new(rendered.len() as u32, Some(rendered.as_bytes()))
    }

    // ── Decode ───────────────────────────────────────────────────────────

    // Parses a JSON number literal into `width` little-endian bytes,
    // truncating like an integer cast.
    fn json_number_to_value(&mut self, obj: &Value, width: u32, signed: bool) -> Addr {
        let Value::Number(n) = obj else {
            self.abort_str("json decode error: not a valid number");
        };
        let literal = n.to_string();
        if !signed && literal.starts_with('-') {
            self.abort_str("json decode error: expect uint, but got int value");
        }
        let tmp = self.vector_new(literal.len() as u32, Some(literal.as_bytes()));
        let magnitude = if signed {
            self.ir_builtin_str_to_i256(tmp).0
        } else {
            self.ir_builtin_str_to_u256(tmp)
        };
        let out = self.malloc(width);
        self.heap
            .write(out, &magnitude.to_le_bytes()[..width as usize]);
        out
    }

    pub fn ir_builtin_json_decode_bool(&mut self, obj: &Value) -> Addr {
        let Value::Bool(b) = obj else {
            self.abort_str("json decode error: not a valid bool");
        };
        let ret = self.malloc(1);
        self.heap.store_u8(ret, *b as u8);
        ret
    }

    pub fn ir_builtin_json_decode_str(&mut self, obj: &Value) -> Addr {
        let Value::String(s) = obj else {
            self.abort_str("json decode error: not a valid string");
        };
        let bytes = s.clone().into_bytes();
        self.vector_new(bytes.len() as u32, Some(&bytes))
    }

    pub fn ir_builtin_json_decode_array(&mut self, runtime_class_offset: u32, obj: &Value) -> Addr {
        let Value::Array(items) = obj else {
            self.abort_str("json decode error: not a valid array");
        };
        let class = self.class(runtime_class_offset);
        debug_assert_eq!(class.ty, IrType::Array as u32);
        let elem_class = self.class(class.array_item_ty);
        let elem_size = self.get_ir_type_size_as_element(&elem_class);

        let items = items.clone();
        let ret = self.qvector(items.len() as u32, elem_size, QVECTOR_RESIZE_DOUBLE);
        self.qvector_set_num(ret, items.len() as u32);
        for (i, elem_obj) in items.iter().enumerate() {
            let elem = self.json_to_ir_type(class.array_item_ty, elem_obj);
            let elem_ptr = self.get_ptr_of_ptr_value(class.array_item_ty, elem);
            let ret_data = self.qvector_data(ret);
            self.heap
                .copy(ret_data + i as u32 * elem_size, elem_ptr, elem_size);
        }
        ret
    }

    pub fn ir_builtin_json_decode_struct_like_ty(
        &mut self,
        runtime_class_offset: u32,
        obj: &Value,
    ) -> Addr {
        const FIELD_MISMATCH: &str = "json decode error: struct field name not match";
        let class = self.class(runtime_class_offset);
        let fields = self.class_field_offsets(&class);
        let names = self.class_field_name_offsets(&class);

        let members: Vec<(String, Value)> = match obj {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => self.abort_str(FIELD_MISMATCH),
        };

        let value_size = self.calculate_ir_type_size(&class);
        let ret = self.malloc(value_size);
        self.heap.fill(ret, 0, value_size);

        let mut offset = 0u32;
        for (i, (field, name_offset)) in fields.into_iter().zip(names).enumerate() {
            let Some((member_name, member_value)) = members.get(i) else {
                self.abort_str(FIELD_MISMATCH);
            };
            let declared = self.class_name_bytes(name_offset);
            if declared != member_name.as_bytes() {
                self.abort_str(FIELD_MISMATCH);
            }

            let field_class = self.class(field);
            let field_size = self.get_ir_type_size_as_element(&field_class);
            let field_value = self.json_to_ir_type(field, member_value);
            let field_ptr = self.get_ptr_of_ptr_value(field, field_value);
            self.heap.copy(ret + offset, field_ptr, field_size);
            offset += field_size;
        }
        ret
    }

    pub fn ir_builtin_json_decode_map(&mut self, runtime_class_offset: u32, obj: &Value) -> Addr {
        let class = self.class(runtime_class_offset);
        let key_class = self.class(class.map_key_ty);
        let value_class = self.class(class.map_value_ty);
        let value_size = self.get_ir_type_size_as_element(&value_class);
        let ret = self.qhashtbl(0, key_class.ty, 0);

        let members: Vec<(String, Value)> = match obj {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        };

        for (key_str, elem) in members {
            let item = self.json_to_ir_type(class.map_value_ty, &elem);
            let key = if self.qhashtbl_key_is_int(ret) {
                let key_vec = self.vector_new(key_str.len() as u32, Some(key_str.as_bytes()));
                if self.qhashtbl_key_runtime_ty(ret) != IrType::I256 as u32 {
                    self.ir_builtin_str_to_u256(key_vec).low_u64() as i64
                } else {
                    self.ir_builtin_str_to_i256(key_vec).0.low_u64() as i64
                }
            } else {
                let key_vec = self.vector_new(key_str.len() as u32, Some(key_str.as_bytes()));
                self.vector_bytes(key_vec) as i64
            };
            if self.is_pointer_type(class.map_value_ty) {
                self.qhashtbl_put_slice(ret, key, &item.to_le_bytes());
            } else {
                self.qhashtbl_put(ret, key, item, value_size);
            }
        }
        ret
    }

    /// Builds a value of the type from a JSON node.
    pub fn json_to_ir_type(&mut self, runtime_class_offset: u32, obj: &Value) -> Addr {
        use IrType::*;
        self.enter_recursion();
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str(UNKNOWN_TY);
        };
        let ret = match ty {
            U8 | U16 | U32 | U64 | U128 | U256 => {
                let width = ty.int_width().unwrap_or(4);
                self.json_number_to_value(obj, width, false)
            }
            I8 | I16 | I32 | I64 | I128 | I256 => {
                let width = ty.int_width().unwrap_or(4);
                self.json_number_to_value(obj, width, true)
            }
            Bool => self.ir_builtin_json_decode_bool(obj),
            Str => self.ir_builtin_json_decode_str(obj),
            Asset | Struct => self.ir_builtin_json_decode_struct_like_ty(runtime_class_offset, obj),
            Array => self.ir_builtin_json_decode_array(runtime_class_offset, obj),
            Map => self.ir_builtin_json_decode_map(runtime_class_offset, obj),
        };
        self.leave_recursion();
        ret
    }

    /// Parses a byte vector and decodes it as a value of the type.
    pub fn ir_builtin_json_decode(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        let bytes = self.vector_as_slice(val).to_vec();
        let doc: Value = match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(_) => self.abort_str("json decode error: invalid json"),
        };
        self.json_to_ir_type(runtime_class_offset, &doc)
    }
}
