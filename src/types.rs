//! The runtime type descriptor table.
//!
//! Every IR type reachable in a compiled program is described by a
//! fixed-layout [`RuntimeClass`] record inside one flat, offset-addressed
//! blob.  The blob is installed once per invocation and read-only
//! thereafter; all cross-references inside it (field type lists, field
//! names, element/key/value types) are byte offsets from the blob start.
//!
//! The codecs never build rich per-type objects — they load a descriptor,
//! dispatch on its discriminator, and recurse through sub-offsets.

use crate::heap::Addr;
use crate::runtime::Runtime;

/// Slot size of a pointer-typed field on the 32-bit sandbox target.  The
/// arena model uses `u32` handles, so this holds on every host.
pub const ADDRESS_SIZE: u32 = 4;

/// Byte size of one descriptor record (nine `u32` fields).
pub const RUNTIME_CLASS_SIZE: u32 = 36;

/// Type discriminators.  Integers come first so "is integer" stays a cheap
/// range test; U256/I256 were appended later and are special-cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IrType {
    U8 = 0,
    U16 = 1,
    U32 = 2,
    U64 = 3,
    U128 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    I128 = 9,
    Bool = 10,
    Str = 11,
    Asset = 12,
    Struct = 13,
    Array = 14,
    Map = 15,
    U256 = 16,
    I256 = 17,
}

impl IrType {
    pub fn from_u32(v: u32) -> Option<IrType> {
        use IrType::*;
        Some(match v {
            0 => U8,
            1 => U16,
            2 => U32,
            3 => U64,
            4 => U128,
            5 => I8,
            6 => I16,
            7 => I32,
            8 => I64,
            9 => I128,
            10 => Bool,
            11 => Str,
            12 => Asset,
            13 => Struct,
            14 => Array,
            15 => Map,
            16 => U256,
            17 => I256,
            _ => return None,
        })
    }

    /// True for types whose values live on the heap and are referenced by
    /// address: STR, ASSET, STRUCT, ARRAY, MAP.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            IrType::Str | IrType::Asset | IrType::Struct | IrType::Array | IrType::Map
        )
    }

    /// True for the integer discriminators: everything up to I128, plus the
    /// appended U256/I256.
    pub fn is_integer(self) -> bool {
        (self as u32) <= (IrType::I128 as u32) || matches!(self, IrType::U256 | IrType::I256)
    }

    /// Natural width of an integer/bool value, `None` for pointer types.
    pub fn int_width(self) -> Option<u32> {
        use IrType::*;
        Some(match self {
            U8 | I8 | Bool => 1,
            U16 | I16 => 2,
            U32 | I32 => 4,
            U64 | I64 => 8,
            U128 | I128 => 16,
            U256 | I256 => 32,
            _ => return None,
        })
    }
}

/// One descriptor record, as stored in the blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeClass {
    /// In-memory size of a value of this type.
    pub size: u32,
    /// Discriminator (`IrType` as u32).
    pub ty: u32,
    /// Offset of a `[u32]` of field type offsets.
    pub struct_fields: u32,
    pub struct_fields_count: u32,
    /// Offset of a `[u32]` of field name record offsets.
    pub struct_field_names: u32,
    /// Offset of the element type descriptor.
    pub array_item_ty: u32,
    /// 0 for variable length, N for `[T; N]`.
    pub array_size: u32,
    pub map_key_ty: u32,
    pub map_value_ty: u32,
}

impl RuntimeClass {
    pub fn ir_type(&self) -> Option<IrType> {
        IrType::from_u32(self.ty)
    }
}

/// The immutable descriptor blob.
pub struct TypeTable {
    blob: Box<[u8]>,
}

impl TypeTable {
    pub fn new(blob: Vec<u8>) -> Self {
        TypeTable {
            blob: blob.into_boxed_slice(),
        }
    }

    fn u32_at(&self, offset: u32) -> u32 {
        let o = offset as usize;
        u32::from_le_bytes(self.blob[o..o + 4].try_into().unwrap())
    }

    /// Loads the descriptor at `offset`.
    pub fn class(&self, offset: u32) -> RuntimeClass {
        RuntimeClass {
            size: self.u32_at(offset),
            ty: self.u32_at(offset + 4),
            struct_fields: self.u32_at(offset + 8),
            struct_fields_count: self.u32_at(offset + 12),
            struct_field_names: self.u32_at(offset + 16),
            array_item_ty: self.u32_at(offset + 20),
            array_size: self.u32_at(offset + 24),
            map_key_ty: self.u32_at(offset + 28),
            map_value_ty: self.u32_at(offset + 32),
        }
    }

    /// Loads a `[u32]` of `count` entries at `offset`.
    pub fn u32_array(&self, offset: u32, count: u32) -> Vec<u32> {
        (0..count).map(|i| self.u32_at(offset + i * 4)).collect()
    }

    /// Resolves a field-name record: an inline byte vector whose `data`
    /// field is itself a blob offset.  Only the first length word is
    /// trusted.
    pub fn name_bytes(&self, name_offset: u32) -> Vec<u8> {
        let len = self.u32_at(name_offset);
        let data_offset = self.u32_at(name_offset + 8);
        self.blob[data_offset as usize..(data_offset + len) as usize].to_vec()
    }
}

/// Builds descriptor blobs with the exact binary layout the compiler emits.
/// Used by the test-suite and by embedders that assemble schemas at runtime.
#[derive(Default)]
pub struct TypeTableBuilder {
    buf: Vec<u8>,
}

impl TypeTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push_class(&mut self, c: RuntimeClass) -> u32 {
        let offset = self.buf.len() as u32;
        for v in [
            c.size,
            c.ty,
            c.struct_fields,
            c.struct_fields_count,
            c.struct_field_names,
            c.array_item_ty,
            c.array_size,
            c.map_key_ty,
            c.map_value_ty,
        ] {
            self.push_u32(v);
        }
        offset
    }

    /// Adds a primitive or string descriptor.
    pub fn primitive(&mut self, ty: IrType) -> u32 {
        let size = ty.int_width().unwrap_or(ADDRESS_SIZE);
        self.push_class(RuntimeClass {
            size,
            ty: ty as u32,
            ..RuntimeClass::default()
        })
    }

    /// Adds an array descriptor; `array_size == 0` means variable length.
    pub fn array(&mut self, elem_ty: u32, array_size: u32) -> u32 {
        self.push_class(RuntimeClass {
            size: ADDRESS_SIZE,
            ty: IrType::Array as u32,
            array_item_ty: elem_ty,
            array_size,
            ..RuntimeClass::default()
        })
    }

    pub fn map(&mut self, key_ty: u32, value_ty: u32) -> u32 {
        self.push_class(RuntimeClass {
            size: ADDRESS_SIZE,
            ty: IrType::Map as u32,
            map_key_ty: key_ty,
            map_value_ty: value_ty,
            ..RuntimeClass::default()
        })
    }

    pub fn struct_ty(&mut self, fields: &[(&str, u32)]) -> u32 {
        self.struct_like(IrType::Struct, fields)
    }

    pub fn asset(&mut self, fields: &[(&str, u32)]) -> u32 {
        self.struct_like(IrType::Asset, fields)
    }

    fn struct_like(&mut self, ty: IrType, fields: &[(&str, u32)]) -> u32 {
        let fields_array_offset = self.buf.len() as u32;
        for (_, field_ty) in fields {
            self.push_u32(*field_ty);
        }

        // Name records: `{len, cap, data}` header, then the bytes the data
        // offset points at.
        let mut name_offsets = Vec::with_capacity(fields.len());
        for (name, _) in fields {
            let record = self.buf.len() as u32;
            let len = name.len() as u32;
            self.push_u32(len);
            self.push_u32(len);
            self.push_u32(record + 12);
            self.buf.extend_from_slice(name.as_bytes());
            name_offsets.push(record);
        }

        let names_array_offset = self.buf.len() as u32;
        for off in &name_offsets {
            self.push_u32(*off);
        }

        self.push_class(RuntimeClass {
            size: ADDRESS_SIZE,
            ty: ty as u32,
            struct_fields: fields_array_offset,
            struct_fields_count: fields.len() as u32,
            struct_field_names: names_array_offset,
            ..RuntimeClass::default()
        })
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema-directed layout arithmetic and zero-value construction
// ─────────────────────────────────────────────────────────────────────────────

impl Runtime {
    /// In-parent slot size of a value of this type: the natural integer
    /// width for inline types, one address for pointer types.
    pub fn get_ir_type_size_as_element(&mut self, class: &RuntimeClass) -> u32 {
        match class.ir_type() {
            Some(ty) => ty.int_width().unwrap_or(ADDRESS_SIZE),
            None => ADDRESS_SIZE,
        }
    }

    /// Heap size of a value of this type: struct/asset sizes are the sum of
    /// per-field slot sizes with a floor of 4 bytes so every value has a
    /// unique address.
    pub fn calculate_ir_type_size(&mut self, class: &RuntimeClass) -> u32 {
        use IrType::*;
        let Some(ty) = class.ir_type() else {
            self.abort_str("not supported ir type to get type size");
        };
        match ty {
            Str => crate::vector::VECTOR_SIZE,
            Array => crate::qvector::QVECTOR_SIZE,
            Map => crate::hashtbl::QHASHTBL_SIZE,
            Asset | Struct => {
                let fields = self.class_field_offsets(class);
                let mut total = 0u32;
                for field_offset in fields {
                    let field_class = self.class(field_offset);
                    total += self.get_ir_type_size_as_element(&field_class);
                }
                total.max(4)
            }
            _ => match ty.int_width() {
                Some(w) => w,
                None => self.abort_str("not supported ir type to get type size"),
            },
        }
    }

    /// True when values of the type at `runtime_class_offset` are heap
    /// references.
    pub fn is_pointer_type(&mut self, runtime_class_offset: u32) -> bool {
        let class = self.class(runtime_class_offset);
        match class.ir_type() {
            Some(ty) => ty.is_pointer(),
            None => self.abort_str("unknown ir runtime type in ssz type"),
        }
    }

    /// For a pointer type, dereferences the slot at `val`; otherwise `val`
    /// already addresses the value bytes.
    pub fn get_data_ptr_of_ptr_value(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        if self.is_pointer_type(runtime_class_offset) {
            self.heap.load_u32(val)
        } else {
            val
        }
    }

    /// Inverse of [`Self::get_data_ptr_of_ptr_value`]: boxes a pointer value
    /// into a one-address cell so it can be copied into a slot uniformly.
    pub fn get_ptr_of_ptr_value(&mut self, runtime_class_offset: u32, val: Addr) -> Addr {
        if self.is_pointer_type(runtime_class_offset) {
            let cell = self.malloc(ADDRESS_SIZE);
            self.heap.store_u32(cell, val);
            cell
        } else {
            val
        }
    }

    /// Address of the element value at `idx` in an array, dereferencing
    /// pointer elements.
    pub fn get_array_elem_ptr_at_idx(
        &mut self,
        runtime_class_offset: u32,
        val: Addr,
        idx: u32,
    ) -> Addr {
        let class = self.class(runtime_class_offset);
        debug_assert_eq!(class.ty, IrType::Array as u32);
        let data = self.qvector_data(val);
        let objsize = self.qvector_objsize(val);
        self.get_data_ptr_of_ptr_value(class.array_item_ty, data + idx * objsize)
    }

    /// Builds the zero value of the type at `runtime_class_offset`.
    ///
    /// Inline integers/bools come back as the in-register zero; wide
    /// integers, strings, containers and structs come back as fresh heap
    /// objects.  Struct fields are initialized recursively and stored at
    /// their packed slots.
    pub fn ir_builtin_create_ir_value(&mut self, runtime_class_offset: u32) -> Addr {
        self.enter_recursion();
        let ret = self.create_ir_value_inner(runtime_class_offset);
        self.leave_recursion();
        ret
    }

    fn create_ir_value_inner(&mut self, runtime_class_offset: u32) -> Addr {
        use IrType::*;
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str("unknown ir runtime type in create ir value");
        };
        match ty {
            U8 | U16 | U32 | U64 | I8 | I16 | I32 | I64 | Bool => 0,
            U128 | I128 => {
                let value = self.malloc(16);
                self.heap.fill(value, 0, 16);
                value
            }
            U256 | I256 => {
                let value = self.malloc(32);
                self.heap.fill(value, 0, 32);
                value
            }
            Str => self.vector_new(0, Some(b"")),
            Asset | Struct => {
                let value_size = self.calculate_ir_type_size(&class);
                let value = self.malloc(value_size);
                self.heap.fill(value, 0, value_size);
                let fields = self.class_field_offsets(&class);
                let mut offset = 0u32;
                for field_type_offset in fields {
                    let field_class = self.class(field_type_offset);
                    let field_size = self.get_ir_type_size_as_element(&field_class);
                    let field_init = self.ir_builtin_create_ir_value(field_type_offset);
                    self.store_field_slot(value + offset, &field_class, field_init);
                    offset += field_size;
                }
                value
            }
            Array => {
                let elem_class = self.class(class.array_item_ty);
                let element_size = self.get_ir_type_size_as_element(&elem_class);
                self.qvector(1, element_size, crate::qvector::QVECTOR_RESIZE_DOUBLE)
            }
            Map => {
                let key_class = self.class(class.map_key_ty);
                self.qhashtbl(0, key_class.ty, 0)
            }
        }
    }

    /// Writes an initialized field value into its packed slot: pointer
    /// fields store the address, wide integers copy their buffer, narrow
    /// integers store the inline value.
    pub(crate) fn store_field_slot(&mut self, slot: Addr, field_class: &RuntimeClass, value: Addr) {
        let Some(ty) = field_class.ir_type() else {
            self.abort_str("unknown ir runtime type in create ir value");
        };
        if ty.is_pointer() {
            self.heap.store_u32(slot, value);
            return;
        }
        match ty.int_width() {
            Some(w) if w > 8 => self.heap.copy(slot, value, w),
            Some(w) => {
                let bytes = (value as u64).to_le_bytes();
                self.heap.write(slot, &bytes[..w as usize]);
            }
            None => self.heap.store_u32(slot, value),
        }
    }

    /// Dumps a human-readable description of the type through the host
    /// `println`.  Diagnostic only; the labels are kept bit-compatible with
    /// the sandbox build (including its u256/i16 spellings).
    pub fn ir_builtin_print_type(&mut self, runtime_class_offset: u32) {
        self.enter_recursion();
        self.print_type_inner(runtime_class_offset);
        self.leave_recursion();
    }

    fn print_type_inner(&mut self, runtime_class_offset: u32) {
        use IrType::*;
        let class = self.class(runtime_class_offset);
        let Some(ty) = class.ir_type() else {
            self.abort_str("unknown ir runtime type in print_type");
        };
        match ty {
            U8 => self.host.println(b"u8"),
            U16 => self.host.println(b"u16"),
            U32 => self.host.println(b"u32"),
            U64 => self.host.println(b"u64"),
            U128 => self.host.println(b"u128"),
            U256 => self.host.println(b"i256"),
            I8 => self.host.println(b"i8"),
            I16 => self.host.println(b"u16"),
            I32 => self.host.println(b"i32"),
            I64 => self.host.println(b"i64"),
            I128 => self.host.println(b"i128"),
            I256 => self.host.println(b"i256"),
            Bool => self.host.println(b"bool"),
            Str => self.host.println(b"string"),
            Asset | Struct => {
                if ty == Asset {
                    self.host.println(b"asset");
                } else {
                    self.host.println(b"struct");
                }
                self.host.println(b"fields:");
                let fields = self.class_field_offsets(&class);
                let names = self.class_field_name_offsets(&class);
                for (field_offset, name_offset) in fields.into_iter().zip(names) {
                    let name = self.class_name_bytes(name_offset);
                    self.host.println(&name);
                    self.ir_builtin_print_type(field_offset);
                }
            }
            Array => {
                if class.array_size != 0 {
                    self.host.println(b"array");
                    self.host.println(b"size:");
                    let size = self.i32_toa(class.array_size as i32, 10);
                    self.host.println(size.as_bytes());
                } else {
                    self.host.println(b"vector");
                }
                self.host.println(b"element:");
                self.ir_builtin_print_type(class.array_item_ty);
            }
            Map => {
                self.host.println(b"map");
                self.host.println(b"key:");
                self.ir_builtin_print_type(class.map_key_ty);
                self.host.println(b"value:");
                self.ir_builtin_print_type(class.map_value_ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_with_table() -> (Runtime, u32, u32, u32, u32, u32, u32) {
        let mut b = TypeTableBuilder::new();
        let i32_ty = b.primitive(IrType::I32);
        let i64_ty = b.primitive(IrType::I64);
        let str_ty = b.primitive(IrType::Str);
        let i32_arr = b.array(i32_ty, 0);
        let str_i32_map = b.map(str_ty, i32_ty);
        let school = b.struct_ty(&[("name", str_ty), ("students_count", i32_ty)]);
        let mut rt = Runtime::with_mock_host();
        rt.ir_builtin_set_all_runtimes_classes_address(b.finish());
        (rt, i32_ty, i64_ty, str_ty, i32_arr, str_i32_map, school)
    }

    #[test]
    fn element_sizes() {
        let (mut rt, i32_ty, i64_ty, str_ty, i32_arr, str_i32_map, school) = runtime_with_table();
        for (offset, expect) in [
            (i32_ty, 4),
            (i64_ty, 8),
            (str_ty, ADDRESS_SIZE),
            (i32_arr, ADDRESS_SIZE),
            (str_i32_map, ADDRESS_SIZE),
            (school, ADDRESS_SIZE),
        ] {
            let class = rt.class(offset);
            assert_eq!(rt.get_ir_type_size_as_element(&class), expect);
        }
    }

    #[test]
    fn struct_size_is_packed_field_sum() {
        let (mut rt, _, _, _, _, _, school) = runtime_with_table();
        let class = rt.class(school);
        // str slot (4) + i32 slot (4)
        assert_eq!(rt.calculate_ir_type_size(&class), 8);
    }

    #[test]
    fn pointer_classification() {
        let (mut rt, i32_ty, _, str_ty, i32_arr, str_i32_map, school) = runtime_with_table();
        assert!(!rt.is_pointer_type(i32_ty));
        assert!(rt.is_pointer_type(str_ty));
        assert!(rt.is_pointer_type(i32_arr));
        assert!(rt.is_pointer_type(str_i32_map));
        assert!(rt.is_pointer_type(school));
    }

    #[test]
    fn zero_values() {
        let (mut rt, i32_ty, _, str_ty, i32_arr, str_i32_map, school) = runtime_with_table();

        assert_eq!(rt.ir_builtin_create_ir_value(i32_ty), 0);

        let s = rt.ir_builtin_create_ir_value(str_ty);
        assert_eq!(rt.vector_len(s), 0);

        let arr = rt.ir_builtin_create_ir_value(i32_arr);
        assert_eq!(rt.qvector_size(arr), 0);
        assert_eq!(rt.qvector_objsize(arr), 4);

        let map = rt.ir_builtin_create_ir_value(str_i32_map);
        assert_eq!(rt.qhashtbl_size(map), 0);

        let school_val = rt.ir_builtin_create_ir_value(school);
        let name = rt.heap().load_u32(school_val);
        assert_eq!(rt.vector_len(name), 0);
        assert_eq!(rt.heap().load_u32(school_val + 4), 0);
    }

    #[test]
    fn name_records_resolve() {
        let (mut rt, _, _, _, _, _, school) = runtime_with_table();
        let class = rt.class(school);
        let names = rt.class_field_name_offsets(&class);
        assert_eq!(rt.class_name_bytes(names[0]), b"name");
        assert_eq!(rt.class_name_bytes(names[1]), b"students_count");
    }
}
