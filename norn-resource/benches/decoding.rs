use criterion::{criterion_group, criterion_main, Criterion};
use norn_resource::Resource;

fn sample_resource() -> Vec<u8> {
    let mut data = vec![0x00];
    // A, AAAA
    data.extend_from_slice(&[0x01, 198, 51, 100, 7]);
    data.push(0x02);
    data.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    // NS with a glue target
    data.extend_from_slice(&[0x09, 0x06]);
    data.extend_from_slice(b"\x03ns1\x05alice\x00");
    data.extend_from_slice(&[198, 51, 100, 8]);
    data.extend_from_slice(&[0u8; 16]);
    // SMTP service
    data.extend_from_slice(&[0x0a, 0x04]);
    data.extend_from_slice(b"smtp");
    data.push(0x03);
    data.extend_from_slice(b"tcp");
    data.extend_from_slice(&[10, 0, 0x05]);
    data.extend_from_slice(b"\x04mail\x05alice\x00");
    data.extend_from_slice(&[0x00, 0x19]);
    // TXT
    data.extend_from_slice(&[0x0d, 0x0b]);
    data.extend_from_slice(b"hello world");
    data
}

fn criterion_benchmark(c: &mut Criterion) {
    let data = sample_resource();
    c.bench_function("decoding resource", |b| {
        b.iter(|| Resource::decode(&data).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
