use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use probe_hash::HashTable as ProbeHashTable;
use probe_hash::hash_fns::hash_with;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

type SipBuildHasher = BuildHasherDefault<SipHasher>;

trait BenchKey: Clone + Eq + Hash + Send + Sync + 'static {
    fn new(key: u64) -> Self;
}

impl BenchKey for u64 {
    fn new(key: u64) -> Self {
        black_box(key)
    }
}

impl BenchKey for String {
    fn new(key: u64) -> Self {
        black_box(format!("key_{key:016X}"))
    }
}

fn probe_table<K: BenchKey>() -> ProbeHashTable<K, u64> {
    ProbeHashTable::new(hash_with(SipBuildHasher::default()))
}

fn hashbrown_map<K: BenchKey>() -> HashbrownMap<K, u64, SipBuildHasher> {
    HashbrownMap::with_hasher(SipBuildHasher::default())
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Find,
    Remove,
}

fn random_keys<K: BenchKey>(size: usize) -> Vec<K> {
    let mut rng = SmallRng::from_os_rng();
    (0..size).map(|_| K::new(rng.random::<u64>())).collect()
}

fn bench_insert_random<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("insert_random_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = probe_table::<K>();
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(table.insert(key, i as u64));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = hashbrown_map::<K>();
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_hit_miss_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(size * 2);
        let present = &keys[..size];

        let mut table = probe_table::<K>();
        let mut map = hashbrown_map::<K>();
        for (i, key) in present.iter().enumerate() {
            table.insert(key.clone(), i as u64);
            map.insert(key.clone(), i as u64);
        }

        let mut probes = keys.clone();
        probes.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(table.lookup(key));
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(map.get(key));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(size);
        let mut table = probe_table::<K>();
        let mut map = hashbrown_map::<K>();
        for (i, key) in keys.iter().enumerate() {
            table.insert(key.clone(), i as u64);
            map.insert(key.clone(), i as u64);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter_batched(
                || table.clone(),
                |mut table| {
                    for key in &keys {
                        black_box(table.remove(key));
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || map.clone(),
                |mut map| {
                    for key in &keys {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("iteration_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        let mut table = probe_table::<K>();
        let mut map = hashbrown_map::<K>();
        for (i, key) in random_keys::<K>(size).into_iter().enumerate() {
            table.insert(key.clone(), i as u64);
            map.insert(key, i as u64);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter(|| black_box(table.values().sum::<u64>()))
        });
        group.bench_function(format!("probe_hash_cursor/{size}"), |b| {
            b.iter(|| {
                let mut cursor = table.cursor();
                let mut sum = 0u64;
                while let Ok(Some((_, value))) = cursor.next(&table) {
                    sum = sum.wrapping_add(*value);
                }
                black_box(sum)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| black_box(map.values().sum::<u64>()))
        });
    }

    group.finish();
}

fn bench_mixed_zipf<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    for exponent in [1.0, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<K>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        const KEY_SPACE_MULTIPLIER: f64 = 2.0;

        for &size in SIZES[..=MAX_SIZE].iter() {
            let mut rng = SmallRng::from_os_rng();
            let op_distr = Zipf::new(3.0, exponent).unwrap();
            let insert_distr = Zipf::new(size as f64 - 1.0, 1.0).unwrap();
            let find_remove_distr = Zipf::new(size as f64 * KEY_SPACE_MULTIPLIER - 1.0, 1.0).unwrap();

            let operations = (0..size * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(op_distr);
                    let (operation, distr) = if op_choice <= 1.0 {
                        (Operation::Find, find_remove_distr)
                    } else if op_choice <= 2.0 {
                        (Operation::Insert, insert_distr)
                    } else {
                        (Operation::Remove, find_remove_distr)
                    };
                    (operation, K::new(rng.sample(distr) as u64))
                })
                .collect::<Vec<(Operation, K)>>();

            group.throughput(Throughput::Elements(operations.len() as u64));
            group.bench_function(format!("probe_hash/{size}"), |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut table = probe_table::<K>();
                        for (i, (operation, key)) in operations.into_iter().enumerate() {
                            match operation {
                                Operation::Insert => {
                                    black_box(table.insert(key, i as u64));
                                }
                                Operation::Find => {
                                    black_box(table.lookup(&key));
                                }
                                Operation::Remove => {
                                    black_box(table.remove(&key));
                                }
                            }
                        }
                        black_box(table)
                    },
                    BatchSize::SmallInput,
                )
            });

            group.bench_function(format!("hashbrown/{size}"), |b| {
                b.iter_batched(
                    || operations.clone(),
                    |operations| {
                        let mut map = hashbrown_map::<K>();
                        for (i, (operation, key)) in operations.into_iter().enumerate() {
                            match operation {
                                Operation::Insert => {
                                    black_box(map.insert(key, i as u64));
                                }
                                Operation::Find => {
                                    black_box(map.get(&key));
                                }
                                Operation::Remove => {
                                    black_box(map.remove(&key));
                                }
                            }
                        }
                        black_box(map)
                    },
                    BatchSize::SmallInput,
                )
            });
        }

        group.finish();
    }
}

fn bench_churn<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES[..=MAX_SIZE].iter() {
        // Every key appears twice: the first sighting inserts, the second
        // removes, leaving a trail of tombstones behind.
        let insertions_and_removals = (0..size as u64)
            .flat_map(|i| {
                let key = K::new(i);
                [key.clone(), key]
            })
            .collect::<Vec<K>>();

        group.throughput(Throughput::Elements(insertions_and_removals.len() as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = insertions_and_removals.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = probe_table::<K>();
                    for key in keys {
                        if !table.remove(&key) {
                            table.insert(key, 0);
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = insertions_and_removals.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = hashbrown_map::<K>();
                    for key in keys {
                        if map.remove(&key).is_none() {
                            map.insert(key, 0);
                        }
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mixed_zipf::<u64, 4>,
    bench_mixed_zipf::<String, 3>,
    bench_churn::<u64, 4>,
    bench_churn::<String, 3>,
    bench_insert_random::<u64, 4>,
    bench_insert_random::<String, 3>,
    bench_find_hit_miss::<u64, 4>,
    bench_find_hit_miss::<String, 3>,
    bench_remove::<u64, 4>,
    bench_remove::<String, 3>,
    bench_iteration::<u64, 4>,
    bench_iteration::<String, 3>,
);

criterion_main!(benches);
