use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{pow::mine_block, Block, Transaction};

fn bench_pow(c: &mut Criterion) {
    c.bench_function("mine_block_three_zero_prefix", |b| {
        let genesis = Block::genesis();
        let mut timestamp = 1_600_000_000_000u64;

        b.iter(|| {
            // vary the timestamp so every iteration searches a fresh nonce space
            timestamp += 1;
            let block = Block::next_at(
                &genesis,
                vec![Transaction::new("alice", "bob", 10)],
                timestamp,
            )
            .expect("genesis has a successor");
            let _mined = mine_block(block);
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
