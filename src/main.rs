use std::sync::Arc;

use privdb::buffer::BufferPool;
use privdb::storage::{DbFile, HeapFile};
use privdb::tuple::{TupleBuilder, TupleDesc};
use privdb::TransactionId;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("privdb - A page-cached heap-file storage engine");
    println!("================================================\n");

    let dir = std::env::temp_dir().join(format!("privdb-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create demo directory");
    let path = dir.join("people.dat");

    let pool = Arc::new(BufferPool::new(4));
    println!("Created buffer pool with {} pages", pool.capacity());

    let desc = TupleDesc::builder().string("name").int("age").build_arc();
    let file = HeapFile::open(&path, desc.clone(), pool.clone()).expect("Failed to open heap file");
    println!("Opened heap file {} {}\n", path.display(), desc);

    // Insert a few people in one transaction
    let tid = TransactionId::new();
    pool.begin_transaction(tid);
    let mut inserted = Vec::new();
    for (name, age) in [("sam", 25), ("alex", 31), ("kim", 47), ("jo", 19)] {
        let mut tuple = TupleBuilder::new(desc.clone()).value(name).value(age).build();
        let rid = file.insert_tuple(&mut tuple, tid).expect("Failed to insert tuple");
        println!("Inserted {:<6} at {}", name, rid);
        inserted.push(tuple);
    }
    pool.commit_transaction(tid).expect("Failed to commit");

    // Delete one of them
    let tid = TransactionId::new();
    file.delete_tuple(&inserted[1], tid).expect("Failed to delete tuple");
    pool.commit_transaction(tid).expect("Failed to commit");
    println!("\nDeleted {}", inserted[1].value(0).map(|v| v.to_string()).unwrap_or_default());

    // Scan what is left
    let tid = TransactionId::new();
    println!("\nScanning {} ({} pages):", path.display(), file.num_pages().unwrap_or(0));
    for tuple in file.iter(tid).expect("Failed to start scan") {
        let tuple = tuple.expect("Failed to read tuple");
        let rid = tuple.rid().map(|r| r.to_string()).unwrap_or_default();
        let values: Vec<String> = tuple.values().iter().map(|v| v.to_string()).collect();
        println!("  - {}: {}", rid, values.join(", "));
    }
    pool.commit_transaction(tid).expect("Failed to commit");

    println!("\nDisk reads: {}, writes: {}", file.num_reads(), file.num_writes());

    // Clean up
    drop(file);
    std::fs::remove_dir_all(&dir).ok();
    println!("\nDemo completed successfully!");
}
