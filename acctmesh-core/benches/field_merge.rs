use acctmesh_core::core_account::field::{FieldKind, SerializeFormat};
use acctmesh_core::core_account::notify::{ChangeNotifier, PeerMessage};
use acctmesh_core::core_account::sync::{apply_remote, RemoteContext};
use acctmesh_core::{AccountName, AccountStore, NewAccount, Timestamp};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_field_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_decode");

    let cases = [
        ("string", FieldKind::String, "1700000000 :a fairly ordinary greeting"),
        ("int", FieldKind::Int { default: 0 }, "1700000000 :12345"),
        ("bool", FieldKind::Bool, "1700000000 :1"),
        ("timestamp", FieldKind::Timestamp, "1700000000"),
    ];
    for (label, kind, raw) in cases.iter() {
        group.bench_function(*label, |b| {
            b.iter(|| black_box(kind.decode(black_box(raw), SerializeFormat::Network)))
        });
    }

    group.finish();
}

fn bench_field_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_merge");

    group.bench_function("newer_wins", |b| {
        b.iter(|| {
            let mut slot = None;
            for ts in 0..16 {
                FieldKind::String.merge(&mut slot, &format!("{} value", ts), SerializeFormat::Internal);
            }
            black_box(slot)
        });
    });

    group.bench_function("stale_rejected", |b| {
        let mut slot = None;
        FieldKind::String.merge(&mut slot, "1000 current", SerializeFormat::Internal);
        b.iter(|| black_box(FieldKind::String.merge(&mut slot, "999 older", SerializeFormat::Internal)));
    });

    group.finish();
}

fn bench_remote_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote_burst");

    for count in [10usize, 100, 1_000].iter() {
        let messages: Vec<PeerMessage> = (0..*count)
            .map(|i| PeerMessage::Account {
                name: AccountName::new(format!("user{}", i)),
                created_at: Timestamp(i as i64),
                fields: vec![
                    ("hash_password".to_string(), format!("{} sha256 secret{}", i, i)),
                    ("connectclass".to_string(), format!("{} users", i)),
                ],
            })
            .collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("apply", count), &messages, |b, messages| {
            b.iter(|| {
                let store = AccountStore::new(ChangeNotifier::new(16));
                let ctx = RemoteContext::no_propagation();
                for msg in messages {
                    let _ = apply_remote(&store, msg.clone(), &ctx);
                }
                black_box(store.len())
            });
        });
    }

    group.finish();
}

fn bench_resync(c: &mut Criterion) {
    let store = AccountStore::new(ChangeNotifier::new(16));
    for i in 0..1_000 {
        let _ = store.add_account(
            NewAccount::new(format!("user{}", i), Timestamp(i)).with_connect_class("users", Timestamp(i)),
            false,
        );
    }

    c.bench_function("resync_1000", |b| {
        b.iter(|| black_box(store.resync()));
    });
}

criterion_group!(
    benches,
    bench_field_decode,
    bench_field_merge,
    bench_remote_burst,
    bench_resync
);
criterion_main!(benches);
