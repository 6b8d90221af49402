use criterion::criterion_main;


criterion_main!(walker::benches_walker);
