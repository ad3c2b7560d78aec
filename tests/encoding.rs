// Hex and Base64 through the builtin (container-level) entry points.

use sir_runtime::{Runtime, QVECTOR_RESIZE_DOUBLE};

fn bytes(rt: &mut Runtime, data: &[u8]) -> u32 {
    let v = rt.qvector(data.len().max(1) as u32, 1, QVECTOR_RESIZE_DOUBLE);
    for b in data {
        rt.qvector_addlast(v, &[*b]);
    }
    v
}

#[test]
fn hex_roundtrip_with_prefix() {
    let mut rt = Runtime::with_mock_host();
    let prefixed = rt.vector_new(12, Some(b"0x68656c6c6f"));
    let decoded = rt.ir_builtin_decode_hex(prefixed);
    assert_eq!(rt.qvector_as_slice(decoded), b"hello");

    let re_encoded = rt.ir_builtin_encode_hex(decoded);
    assert_eq!(rt.vector_as_slice(re_encoded), b"68656c6c6f");
}

#[test]
fn hex_odd_length_decodes_empty() {
    let mut rt = Runtime::with_mock_host();
    let odd = rt.vector_new(3, Some(b"abc"));
    let decoded = rt.ir_builtin_decode_hex(odd);
    assert_eq!(rt.qvector_size(decoded), 0);
}

#[test]
fn base64_vectors_through_builtins() {
    let mut rt = Runtime::with_mock_host();
    let hello = bytes(&mut rt, b"hello");
    let encoded = rt.ir_builtin_encode_base64(hello);
    assert_eq!(rt.vector_as_slice(encoded), b"aGVsbG8=");

    let digits = rt.vector_new(8, Some(b"MTExMQ=="));
    let decoded = rt.ir_builtin_decode_base64(digits);
    assert_eq!(rt.qvector_as_slice(decoded), b"1111");

    let junk = rt.vector_new(8, Some(b"&TExMQ=="));
    let rejected = rt.ir_builtin_decode_base64(junk);
    assert_eq!(rt.qvector_size(rejected), 0);
}

#[test]
fn binary_roundtrip_through_both_codecs() {
    let mut rt = Runtime::with_mock_host();
    let payload: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
    let input = bytes(&mut rt, &payload);

    let hex = rt.ir_builtin_encode_hex(input);
    let from_hex = rt.ir_builtin_decode_hex(hex);
    assert_eq!(rt.qvector_as_slice(from_hex), &payload[..]);

    let b64 = rt.ir_builtin_encode_base64(input);
    let from_b64 = rt.ir_builtin_decode_base64(b64);
    assert_eq!(rt.qvector_as_slice(from_b64), &payload[..]);
}
