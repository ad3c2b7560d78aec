// RLP wire fixtures from the Ethereum test vectors, plus schema-driven
// struct/array round trips.

use sir_runtime::{Addr, IrType, Runtime, RuntimeContext, TypeTableBuilder};

const CTX: RuntimeContext = RuntimeContext::new("rlp_test", 0, 0);

fn ir_str(rt: &mut Runtime, s: &[u8]) -> Addr {
    rt.vector_new(s.len() as u32, Some(s))
}

fn ir_bytes(rt: &mut Runtime, bytes: &[u8]) -> Addr {
    let v = rt.qvector(bytes.len().max(1) as u32, 1, sir_runtime::QVECTOR_RESIZE_DOUBLE);
    for b in bytes {
        rt.qvector_addlast(v, &[*b]);
    }
    v
}

#[test]
fn dog_string() {
    let mut rt = Runtime::with_mock_host();
    let bs = rt.new_byte_stream();
    let dog = ir_str(&mut rt, b"dog");
    rt.rlp_encode_str(bs, dog);
    assert_eq!(rt.byte_stream_as_slice(bs), &[0x83, b'd', b'o', b'g']);

    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_as_slice(decoded), b"dog");
}

#[test]
fn cat_dog_list() {
    let mut rt = Runtime::with_mock_host();
    let bs = rt.new_byte_stream();
    let list = rt.qvector(1, 4, sir_runtime::QVECTOR_RESIZE_DOUBLE);
    for word in [b"cat" as &[u8], b"dog"] {
        let s = ir_str(&mut rt, word);
        rt.qvector_addlast(list, &s.to_le_bytes());
    }
    rt.rlp_encode_str_list(bs, list);
    assert_eq!(
        rt.byte_stream_as_slice(bs),
        &[0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
    );

    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_size(decoded), 2);
    let cell0 = rt.qvector_getat(decoded, 0, false, &CTX);
    let item0 = rt.heap().load_u32(cell0);
    assert_eq!(rt.qvector_as_slice(item0), b"cat");
    let cell1 = rt.qvector_getat(decoded, 1, false, &CTX);
    let item1 = rt.heap().load_u32(cell1);
    assert_eq!(rt.qvector_as_slice(item1), b"dog");
}

#[test]
fn empty_string_and_empty_list() {
    let mut rt = Runtime::with_mock_host();

    let bs = rt.new_byte_stream();
    let empty = ir_str(&mut rt, b"");
    rt.rlp_encode_str(bs, empty);
    assert_eq!(rt.byte_stream_as_slice(bs), &[0x80]);
    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_size(decoded), 0);
    assert_eq!(rt.qvector_objsize(decoded), 1);

    let bs2 = rt.new_byte_stream();
    let list = rt.qvector(1, 4, sir_runtime::QVECTOR_RESIZE_DOUBLE);
    rt.rlp_encode_str_list(bs2, list);
    assert_eq!(rt.byte_stream_as_slice(bs2), &[0xc0]);
    let decoded_list = rt.rlp_decode(bs2);
    assert_eq!(rt.qvector_size(decoded_list), 0);
}

#[test]
fn small_byte_values_encode_themselves() {
    let mut rt = Runtime::with_mock_host();
    for (byte, expect) in [(0x00u8, 0x00u8), (0x0f, 0x0f), (0x7f, 0x7f)] {
        let bs = rt.new_byte_stream();
        let bytes = ir_bytes(&mut rt, &[byte]);
        rt.rlp_encode_bytes(bs, bytes);
        assert_eq!(rt.byte_stream_as_slice(bs), &[expect]);

        let decoded = rt.rlp_decode(bs);
        assert_eq!(rt.qvector_as_slice(decoded), &[byte]);
    }
}

#[test]
fn integer_1024_as_bytes() {
    let mut rt = Runtime::with_mock_host();
    let bs = rt.new_byte_stream();
    let bytes = ir_bytes(&mut rt, &[0x04, 0x00]);
    rt.rlp_encode_bytes(bs, bytes);
    assert_eq!(rt.byte_stream_as_slice(bs), &[0x82, 0x04, 0x00]);

    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_as_slice(decoded), &[0x04, 0x00]);
}

#[test]
fn length_prefix_boundaries() {
    let mut rt = Runtime::with_mock_host();

    // 55 bytes: single-byte prefix 0xb7
    let s55 = vec![b'a'; 55];
    let bs = rt.new_byte_stream();
    let v = ir_str(&mut rt, &s55);
    rt.rlp_encode_str(bs, v);
    assert_eq!(rt.byte_stream_as_slice(bs)[0], 0xb7);
    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_as_slice(decoded), &s55[..]);

    // 56 bytes: 0xb8 + length byte
    let s56 = vec![b'b'; 56];
    let bs = rt.new_byte_stream();
    let v = ir_str(&mut rt, &s56);
    rt.rlp_encode_str(bs, v);
    assert_eq!(&rt.byte_stream_as_slice(bs)[..2], &[0xb8, 0x38]);
    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_as_slice(decoded), &s56[..]);

    // 1024 bytes: 0xb9 + two length bytes
    let s1024 = vec![b'c'; 1024];
    let bs = rt.new_byte_stream();
    let v = ir_str(&mut rt, &s1024);
    rt.rlp_encode_str(bs, v);
    assert_eq!(&rt.byte_stream_as_slice(bs)[..3], &[0xb9, 0x04, 0x00]);
    let decoded = rt.rlp_decode(bs);
    assert_eq!(rt.qvector_size(decoded), 1024);
}

#[test]
#[should_panic(expected = "rlp decode empty bytes")]
fn decoding_nothing_aborts() {
    let mut rt = Runtime::with_mock_host();
    let bs = rt.new_byte_stream();
    rt.rlp_decode(bs);
}

// ── Schema-driven paths ─────────────────────────────────────────────────────

struct Schema {
    u64_ty: u32,
    i128_ty: u32,
    u256_ty: u32,
    bytes_arr: u32,
    person: u32,
    map_ty: u32,
    asset_like: u32,
}

// struct Person { id: u64, name: str, scores: [u32] }
fn schema_runtime() -> (Runtime, Schema) {
    let mut b = TypeTableBuilder::new();
    let u8_ty = b.primitive(IrType::U8);
    let u32_ty = b.primitive(IrType::U32);
    let u64_ty = b.primitive(IrType::U64);
    let i128_ty = b.primitive(IrType::I128);
    let u256_ty = b.primitive(IrType::U256);
    let str_ty = b.primitive(IrType::Str);
    let bytes_arr = b.array(u8_ty, 0);
    let scores_arr = b.array(u32_ty, 0);
    let person = b.struct_ty(&[("id", u64_ty), ("name", str_ty), ("scores", scores_arr)]);
    let map_ty = b.map(str_ty, u32_ty);
    let asset_like = b.asset(&[("balance", u64_ty)]);
    let mut rt = Runtime::with_mock_host();
    rt.ir_builtin_set_all_runtimes_classes_address(b.finish());
    (
        rt,
        Schema {
            u64_ty,
            i128_ty,
            u256_ty,
            bytes_arr,
            person,
            map_ty,
            asset_like,
        },
    )
}

#[test]
fn schema_integers_roundtrip() {
    let (mut rt, schema) = schema_runtime();

    let val = rt.heap_mut().alloc(8).unwrap();
    rt.heap_mut().write(val, &1024u64.to_le_bytes());
    let encoded = rt.ir_builtin_rlp_encode(schema.u64_ty, val);
    assert_eq!(rt.qvector_as_slice(encoded), &[0x82, 0x04, 0x00]);
    let decoded = rt.ir_builtin_rlp_decode(schema.u64_ty, encoded);
    assert_eq!(rt.heap().load_u64(decoded), 1024);

    let wide = rt.heap_mut().alloc(16).unwrap();
    rt.heap_mut()
        .write(wide, &(1_234_567_890_123_456_789_012_345i128).to_le_bytes());
    let encoded = rt.ir_builtin_rlp_encode(schema.i128_ty, wide);
    let decoded = rt.ir_builtin_rlp_decode(schema.i128_ty, encoded);
    let bytes: [u8; 16] = rt.heap().bytes(decoded, 16).try_into().unwrap();
    assert_eq!(i128::from_le_bytes(bytes), 1_234_567_890_123_456_789_012_345);

    let huge = rt.heap_mut().alloc(32).unwrap();
    let pattern = sir_runtime::U256([7, 0, 0, 0x0100_0000_0000_0000]);
    rt.heap_mut().write(huge, &pattern.to_le_bytes());
    let encoded = rt.ir_builtin_rlp_encode(schema.u256_ty, huge);
    let decoded = rt.ir_builtin_rlp_decode(schema.u256_ty, encoded);
    let bytes: [u8; 32] = rt.heap().bytes(decoded, 32).try_into().unwrap();
    assert_eq!(sir_runtime::U256::from_le_bytes(bytes), pattern);

    // zero is the empty byte string
    let zero = rt.heap_mut().alloc(8).unwrap();
    rt.heap_mut().write(zero, &0u64.to_le_bytes());
    let encoded = rt.ir_builtin_rlp_encode(schema.u64_ty, zero);
    assert_eq!(rt.qvector_as_slice(encoded), &[0x80]);
    let decoded = rt.ir_builtin_rlp_decode(schema.u64_ty, encoded);
    assert_eq!(rt.heap().load_u64(decoded), 0);
}

#[test]
fn schema_byte_array_is_byte_string() {
    let (mut rt, schema) = schema_runtime();
    let arr = ir_bytes(&mut rt, b"dog");
    let encoded = rt.ir_builtin_rlp_encode(schema.bytes_arr, arr);
    assert_eq!(rt.qvector_as_slice(encoded), &[0x83, b'd', b'o', b'g']);

    let decoded = rt.ir_builtin_rlp_decode(schema.bytes_arr, encoded);
    assert_eq!(rt.qvector_as_slice(decoded), b"dog");
}

#[test]
fn schema_struct_roundtrips_structurally() {
    let (mut rt, schema) = schema_runtime();

    let person = rt.ir_builtin_create_ir_value(schema.person);
    rt.heap_mut().store_u64(person, 42); // id
    let name = ir_str(&mut rt, b"ada");
    rt.heap_mut().store_u32(person + 8, name);
    let scores = rt.heap().load_u32(person + 12);
    for score in [7u32, 9, 11] {
        rt.qvector_addlast(scores, &score.to_le_bytes());
    }

    let encoded = rt.ir_builtin_rlp_encode(schema.person, person);
    let decoded = rt.ir_builtin_rlp_decode(schema.person, encoded);

    assert_eq!(rt.heap().load_u64(decoded), 42);
    let name_back = rt.heap().load_u32(decoded + 8);
    assert_eq!(rt.vector_as_slice(name_back), b"ada");
    let scores_back = rt.heap().load_u32(decoded + 12);
    assert_eq!(rt.qvector_size(scores_back), 3);
    let third = rt.qvector_getat(scores_back, 2, false, &CTX);
    assert_eq!(rt.heap().load_u32(third), 11);
}

#[test]
#[should_panic(expected = "map type not supported in ir rlp")]
fn map_encode_aborts() {
    let (mut rt, schema) = schema_runtime();
    let map = rt.ir_builtin_create_ir_value(schema.map_ty);
    rt.ir_builtin_rlp_encode(schema.map_ty, map);
}

#[test]
#[should_panic(expected = "asset not supported in ir rlp")]
fn asset_encode_aborts() {
    let (mut rt, schema) = schema_runtime();
    let asset = rt.ir_builtin_create_ir_value(schema.asset_like);
    rt.ir_builtin_rlp_encode(schema.asset_like, asset);
}
