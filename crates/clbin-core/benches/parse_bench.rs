use criterion::{Criterion, black_box, criterion_group, criterion_main};

use clbin_core::container::{MAGIC_CL, ProgramContainer};

/// Synthetic container with `n` kernels, each with a 2 KiB heap and a
/// small per-kernel patch list.
fn synthetic_container(n: u32) -> Vec<u8> {
    let heap = vec![0x90u8; 2048];
    let patch = vec![0u8; 64];

    let mut d = Vec::new();
    d.extend_from_slice(&MAGIC_CL.to_le_bytes());
    d.extend_from_slice(&1042u32.to_le_bytes());
    d.extend_from_slice(&12u32.to_le_bytes());
    d.extend_from_slice(&8u32.to_le_bytes());
    d.extend_from_slice(&n.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes());

    for i in 0..n {
        let name = format!("kernel_{i}\0");
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&0u64.to_le_bytes());
        d.extend_from_slice(&(name.len() as u32).to_le_bytes());
        d.extend_from_slice(&(patch.len() as u32).to_le_bytes());
        d.extend_from_slice(&(heap.len() as u32).to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&(heap.len() as u32).to_le_bytes());
        d.extend_from_slice(name.as_bytes());
        d.extend_from_slice(&patch);
        d.extend_from_slice(&heap);
    }
    d
}

fn parse_bench(c: &mut Criterion) {
    let data = synthetic_container(16);
    c.bench_function("parse_16_kernels", |b| {
        b.iter(|| ProgramContainer::parse(black_box(&data)).unwrap());
    });

    let container = ProgramContainer::parse(&data).unwrap();
    c.bench_function("extract_last_kernel_heap", |b| {
        b.iter(|| container.kernel_heap(black_box(&data), "kernel_15").unwrap());
    });
}

criterion_group!(benches, parse_bench);
criterion_main!(benches);
