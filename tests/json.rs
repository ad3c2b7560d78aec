// Schema-driven JSON: document shape, decode validation messages, and wide
// integer handling.

use sir_runtime::{IrType, Runtime, RuntimeContext, TypeTableBuilder};

const CTX: RuntimeContext = RuntimeContext::new("json_test", 0, 0);

struct Schema {
    u128_ty: u32,
    i64_ty: u32,
    person: u32,
    str_u32_map: u32,
    i32_str_map: u32,
}

// struct Person { name: str, age: u64, tags: [str] }
fn schema_runtime() -> (Runtime, Schema) {
    let mut b = TypeTableBuilder::new();
    let u64_ty = b.primitive(IrType::U64);
    let u128_ty = b.primitive(IrType::U128);
    let i64_ty = b.primitive(IrType::I64);
    let u32_ty = b.primitive(IrType::U32);
    let i32_ty = b.primitive(IrType::I32);
    let str_ty = b.primitive(IrType::Str);
    let tags = b.array(str_ty, 0);
    let person = b.struct_ty(&[("name", str_ty), ("age", u64_ty), ("tags", tags)]);
    let str_u32_map = b.map(str_ty, u32_ty);
    let i32_str_map = b.map(i32_ty, str_ty);
    let mut rt = Runtime::with_mock_host();
    rt.ir_builtin_set_all_runtimes_classes_address(b.finish());
    (
        rt,
        Schema {
            u128_ty,
            i64_ty,
            person,
            str_u32_map,
            i32_str_map,
        },
    )
}

#[test]
fn struct_document_shape_and_roundtrip() {
    let (mut rt, schema) = schema_runtime();

    let person = rt.ir_builtin_create_ir_value(schema.person);
    let name = rt.vector_new(3, Some(b"ada"));
    rt.heap_mut().store_u32(person, name);
    rt.heap_mut().store_u64(person + 4, 36);
    let tags = rt.heap().load_u32(person + 12);
    for tag in [b"math" as &[u8], b"engine"] {
        let t = rt.vector_new(tag.len() as u32, Some(tag));
        rt.qvector_addlast(tags, &t.to_le_bytes());
    }

    let encoded = rt.ir_builtin_json_encode(schema.person, person);
    assert_eq!(
        rt.vector_as_slice(encoded),
        br#"{"name":"ada","age":36,"tags":["math","engine"]}"#
    );

    let decoded = rt.ir_builtin_json_decode(schema.person, encoded);
    let name_back = rt.heap().load_u32(decoded);
    assert_eq!(rt.vector_as_slice(name_back), b"ada");
    assert_eq!(rt.heap().load_u64(decoded + 4), 36);
    let tags_back = rt.heap().load_u32(decoded + 12);
    assert_eq!(rt.qvector_size(tags_back), 2);
    let cell = rt.qvector_getat(tags_back, 1, false, &CTX);
    let second = rt.heap().load_u32(cell);
    assert_eq!(rt.vector_as_slice(second), b"engine");
}

#[test]
fn numbers_beyond_f64_survive() {
    let (mut rt, schema) = schema_runtime();
    let val = rt.heap_mut().alloc(16).unwrap();
    let wide = 240_282_366_920_938_463_463_374_607_431u128;
    rt.heap_mut().write(val, &wide.to_le_bytes());

    let encoded = rt.ir_builtin_json_encode(schema.u128_ty, val);
    assert_eq!(
        rt.vector_as_slice(encoded),
        b"240282366920938463463374607431"
    );
    let decoded = rt.ir_builtin_json_decode(schema.u128_ty, encoded);
    let bytes: [u8; 16] = rt.heap().bytes(decoded, 16).try_into().unwrap();
    assert_eq!(u128::from_le_bytes(bytes), wide);
}

#[test]
fn negative_numbers_carry_their_sign() {
    let (mut rt, schema) = schema_runtime();
    let val = rt.heap_mut().alloc(8).unwrap();
    rt.heap_mut().write(val, &(-77i64).to_le_bytes());
    let encoded = rt.ir_builtin_json_encode(schema.i64_ty, val);
    assert_eq!(rt.vector_as_slice(encoded), b"-77");

    let decoded = rt.ir_builtin_json_decode(schema.i64_ty, encoded);
    assert_eq!(rt.heap().load_i64(decoded), -77);
}

#[test]
fn maps_stringify_keys() {
    let (mut rt, schema) = schema_runtime();

    let map = rt.ir_builtin_create_ir_value(schema.str_u32_map);
    let key = rt.vector_new(5, Some(b"score"));
    let key_bytes = rt.vector_bytes(key) as i64;
    rt.qhashtbl_put_slice(map, key_bytes, &31u32.to_le_bytes());
    let encoded = rt.ir_builtin_json_encode(schema.str_u32_map, map);
    assert_eq!(rt.vector_as_slice(encoded), br#"{"score":31}"#);

    let decoded = rt.ir_builtin_json_decode(schema.str_u32_map, encoded);
    let (value, _) = rt.qhashtbl_get(decoded, key_bytes, false).unwrap();
    assert_eq!(rt.heap().load_u32(value), 31);

    // integer-keyed maps render decimal keys and parse them back
    let imap = rt.ir_builtin_create_ir_value(schema.i32_str_map);
    let word = rt.vector_new(2, Some(b"hi"));
    rt.qhashtbl_put_slice(imap, 7, &word.to_le_bytes());
    let encoded = rt.ir_builtin_json_encode(schema.i32_str_map, imap);
    assert_eq!(rt.vector_as_slice(encoded), br#"{"7":"hi"}"#);

    let decoded = rt.ir_builtin_json_decode(schema.i32_str_map, encoded);
    let (cell, _) = rt.qhashtbl_get(decoded, 7, false).unwrap();
    let word_back = rt.heap().load_u32(cell);
    assert_eq!(rt.vector_as_slice(word_back), b"hi");
}

#[test]
#[should_panic(expected = "json decode error: not a valid number")]
fn string_where_number_expected_aborts() {
    let (mut rt, schema) = schema_runtime();
    let doc = rt.vector_new(4, Some(b"\"x\" "));
    rt.ir_builtin_json_decode(schema.i64_ty, doc);
}

#[test]
#[should_panic(expected = "json decode error: expect uint, but got int value")]
fn negative_where_uint_expected_aborts() {
    let (mut rt, schema) = schema_runtime();
    let doc = rt.vector_new(2, Some(b"-1"));
    rt.ir_builtin_json_decode(schema.u128_ty, doc);
}

#[test]
#[should_panic(expected = "json decode error: struct field name not match")]
fn misnamed_struct_field_aborts() {
    let (mut rt, schema) = schema_runtime();
    let doc = br#"{"nom":"ada","age":36,"tags":[]}"#;
    let v = rt.vector_new(doc.len() as u32, Some(doc));
    rt.ir_builtin_json_decode(schema.person, v);
}

#[test]
#[should_panic(expected = "json decode error: invalid json")]
fn unparsable_document_aborts() {
    let (mut rt, schema) = schema_runtime();
    let doc = rt.vector_new(3, Some(b"{x:"));
    rt.ir_builtin_json_decode(schema.i64_ty, doc);
}
