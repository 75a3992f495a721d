//! Run with:
//!   cargo bench --bench dispatch

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fremd::{
    CallConvention, CallFrame, ForeignFn, SlotWidth, Value, ValueType,
    pack_value,
};

unsafe extern "C" fn add2(a: usize, b: usize) -> usize {
    a.wrapping_add(b)
}

unsafe extern "C" fn scale_f64(bits: u64) -> f64 {
    f64::from_bits(bits) * 2.0
}

/// Benchmark 1: packing a mixed argument list into a call frame.
/// Measures the type-directed marshal path alone, no native call.
fn bench_marshal(c: &mut Criterion) {
    let args = [
        Value::I32(-7),
        Value::F64(2.5),
        Value::cstring("benchmark"),
        Value::U64(u64::MAX),
    ];

    c.bench_function("marshal_mixed_native", |b| {
        b.iter(|| CallFrame::marshal(black_box(&args)));
    });

    c.bench_function("marshal_mixed_width_four", |b| {
        b.iter(|| {
            let mut lanes = Vec::with_capacity(8);
            for value in black_box(&args) {
                pack_value(value, SlotWidth::Four, &mut lanes);
            }
            lanes
        });
    });
}

/// Benchmark 2: full dispatch of a two-word add, against a direct call
/// to the same function as the floor.
fn bench_dispatch_word(c: &mut Criterion) {
    let func = ForeignFn::new(
        add2 as *const (),
        ValueType::U64,
        vec![ValueType::U64, ValueType::U64],
        CallConvention::CDecl,
    );
    let args = [Value::U64(40), Value::U64(2)];

    c.bench_function("dispatch_add2", |b| {
        b.iter(|| unsafe { func.call(black_box(&args)) });
    });

    c.bench_function("direct_add2", |b| {
        b.iter(|| unsafe { add2(black_box(40), black_box(2)) });
    });
}

/// Benchmark 3: dispatch through the double-returning path.
fn bench_dispatch_f64(c: &mut Criterion) {
    let func = ForeignFn::new(
        scale_f64 as *const (),
        ValueType::F64,
        vec![ValueType::F64],
        CallConvention::CDecl,
    );
    let args = [Value::F64(1.5)];

    c.bench_function("dispatch_scale_f64", |b| {
        b.iter(|| unsafe { func.call(black_box(&args)) });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_marshal, bench_dispatch_word, bench_dispatch_f64
}

criterion_main!(benches);
