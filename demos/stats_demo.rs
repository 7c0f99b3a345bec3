use std::collections::hash_map::RandomState;

use clap::Parser;
use probe_hash::HashTable;
use probe_hash::hash_fns::hash_with;
use probe_hash::hash_fns::uint_hash;

#[derive(Parser, Debug)]
struct Args {
    /// Number of keys to insert
    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: usize,

    /// Percentage of keys to remove after filling the table
    #[arg(short = 'r', long = "remove_percent", default_value_t = 50)]
    remove_percent: usize,

    /// Hash keys to themselves instead of through a seeded hasher
    #[arg(long = "identity")]
    identity: bool,
}

fn main() {
    let args = Args::parse();

    let mut table: HashTable<usize, usize> = if args.identity {
        HashTable::new(uint_hash)
    } else {
        HashTable::new(hash_with(RandomState::new()))
    };

    println!("Filling table with {} keys...", args.count);
    for i in 0..args.count {
        table.insert(i, i);
    }
    println!(
        "Inserted {} values into {} slots",
        table.len(),
        table.capacity()
    );
    table.print_probe_histogram();
    table.debug_stats().print();

    let to_remove = args.count * args.remove_percent.min(100) / 100;
    println!();
    println!("Removing {to_remove} keys through a cursor...");

    // Cursor removal never shrinks, so the tombstones stay visible.
    let mut cursor = table.cursor();
    let mut removed = 0;
    while removed < to_remove {
        match cursor.next(&table) {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => panic!("cursor failed: {err}"),
        }
        if let Err(err) = cursor.remove(&mut table) {
            panic!("cursor failed: {err}");
        }
        removed += 1;
    }
    table.debug_stats().print();

    println!();
    println!("Reinserting {to_remove} keys over the tombstones...");
    for i in args.count..args.count + to_remove {
        table.insert(i, i);
    }
    table.print_probe_histogram();
    table.debug_stats().print();
}
