use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use padscan::scanner::scan_for_tables;
use padscan::{recover_bytes, PlatformDescription, ScanOptions};

// Simple xorshift for reproducible filler bytes.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

fn push(buf: &mut Vec<u8>, dw0: u32, dw1: u32) {
    buf.extend_from_slice(&dw0.to_le_bytes());
    buf.extend_from_slice(&dw1.to_le_bytes());
}

/// Random filler with a physical table and two virtual tables in the middle.
fn make_image(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = XorShift64::new(seed);
    let mut data = Vec::with_capacity(size + 4096);
    while data.len() < size / 2 {
        data.extend_from_slice(&rng.next_u64().to_le_bytes());
    }
    data.truncate((size / 2) & !7);

    for i in 0..252u32 {
        let mode = if (1..5).contains(&i) { 1 } else { 0 };
        push(&mut data, 0x8000_0000 | (mode << 10), 0xC << 10);
    }
    for n in [12, 38] {
        data.extend(std::iter::repeat(0xFF).take(64));
        for _ in 0..n {
            push(&mut data, 0x4800_0400, 0xC << 10);
        }
    }

    while data.len() < size {
        data.extend_from_slice(&rng.next_u64().to_le_bytes());
    }
    data
}

// ============================================================================
// 1. Scanner throughput
// ============================================================================

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let platform = PlatformDescription::alder_lake_s();

    for size in [64 * 1024, 1024 * 1024] {
        let data = make_image(size, 0xdead_beef);
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(BenchmarkId::new("default", size), &data, |b, data| {
            let options = ScanOptions::new();
            b.iter(|| scan_for_tables(black_box(data), &options, &platform));
        });

        group.bench_with_input(BenchmarkId::new("thorough", size), &data, |b, data| {
            let options = ScanOptions::thorough();
            b.iter(|| scan_for_tables(black_box(data), &options, &platform));
        });
    }

    group.finish();
}

// ============================================================================
// 2. Full pipeline
// ============================================================================

fn bench_recover(c: &mut Criterion) {
    let data = make_image(1024 * 1024, 0x1234_5678);
    let mut group = c.benchmark_group("recover");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("blind_1mb", |b| b.iter(|| recover_bytes(black_box(&data))));
    group.finish();
}

criterion_group!(benches, bench_scan, bench_recover);
criterion_main!(benches);
