// Codec throughput over a representative account schema.
//
// Encode/decode allocate from the runtime arena and (deliberately) never
// free intermediate buffers, so each measured call gets a fresh runtime via
// iter_batched rather than growing one arena across the whole run.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use sir_runtime::{Addr, IrType, Runtime, TypeTableBuilder};

fn account_runtime() -> (Runtime, u32, Addr) {
    let mut b = TypeTableBuilder::new();
    let u8_ty = b.primitive(IrType::U8);
    let u16_ty = b.primitive(IrType::U16);
    let u64_ty = b.primitive(IrType::U64);
    let str_ty = b.primitive(IrType::Str);
    let account = b.struct_ty(&[
        ("version", u16_ty),
        ("owner", str_ty),
        ("address", str_ty),
        ("status", u8_ty),
        ("role", u8_ty),
        ("privilege_bitmap", u64_ty),
        ("access_pk", str_ty),
        ("recovery_pk", str_ty),
        ("last_recovery_block_number", u64_ty),
        ("control_flag", u8_ty),
        ("balance", u64_ty),
    ]);
    let mut rt = Runtime::with_mock_host();
    rt.ir_builtin_set_all_runtimes_classes_address(b.finish());

    let val = rt.ir_builtin_create_ir_value(account);
    rt.heap_mut().store_u8(val + 11, 2);
    let address = rt.vector_new(20, Some(&[0x11; 20]));
    rt.heap_mut().store_u32(val + 6, address);
    let pk = rt.vector_new(33, Some(&[0x22; 33]));
    rt.heap_mut().store_u32(val + 20, pk);
    (rt, account, val)
}

fn bench_ssz(c: &mut Criterion) {
    c.bench_function("ssz_encode_account", |b| {
        b.iter_batched(
            account_runtime,
            |(mut rt, account, val)| black_box(rt.ir_builtin_ssz_encode(account, val)),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("ssz_decode_account", |b| {
        b.iter_batched(
            || {
                let (mut rt, account, val) = account_runtime();
                let encoded = rt.ir_builtin_ssz_encode(account, val);
                (rt, account, encoded)
            },
            |(mut rt, account, encoded)| black_box(rt.ir_builtin_ssz_decode(account, encoded)),
            BatchSize::SmallInput,
        )
    });
}

fn bench_rlp(c: &mut Criterion) {
    c.bench_function("rlp_encode_str_list", |b| {
        b.iter_batched(
            || {
                let mut rt = Runtime::with_mock_host();
                let list = rt.qvector(16, 4, sir_runtime::QVECTOR_RESIZE_DOUBLE);
                for word in ["asdf", "qwer", "zxcv"].iter().cycle().take(24) {
                    let s = rt.vector_new(word.len() as u32, Some(word.as_bytes()));
                    rt.qvector_addlast(list, &s.to_le_bytes());
                }
                (rt, list)
            },
            |(mut rt, list)| {
                let bs = rt.new_byte_stream();
                rt.rlp_encode_str_list(bs, list);
                black_box(rt.byte_stream_len(bs))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_data_stream(c: &mut Criterion) {
    c.bench_function("data_stream_encode_u64array", |b| {
        b.iter_batched(
            || {
                let mut rt = Runtime::with_mock_host();
                let arr = rt.qvector(256, 8, sir_runtime::QVECTOR_RESIZE_DOUBLE);
                for i in 0..256u64 {
                    rt.qvector_addlast(arr, &(i * 7).to_le_bytes());
                }
                (rt, arr)
            },
            |(mut rt, arr)| black_box(rt.ir_builtin_data_stream_encode_u64array(arr)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_ssz, bench_rlp, bench_data_stream);
criterion_main!(benches);
