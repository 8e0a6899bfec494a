//! Integration tests for the disk manager

use std::sync::Arc;
use std::thread;

use privdb::common::{DbError, PAGE_SIZE};
use privdb::storage::disk::DiskManager;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_random_access() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    for page_no in 0..10 {
        dm.write_page(page_no, &[0u8; PAGE_SIZE]).unwrap();
    }

    // Overwrite pages in random order
    let write_order = [5, 2, 8, 0, 7, 3, 9, 1, 6, 4];
    for &i in &write_order {
        let mut data = [0u8; PAGE_SIZE];
        data[0] = i as u8;
        data[PAGE_SIZE - 1] = 0xFF - i as u8;
        dm.write_page(i, &data).unwrap();
    }

    assert_eq!(dm.num_pages().unwrap(), 10);
    for i in 0..10 {
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(i, &mut data).unwrap();
        assert_eq!(data[0], i as u8);
        assert_eq!(data[PAGE_SIZE - 1], 0xFF - i as u8);
    }
}

#[test]
fn test_disk_manager_short_write_is_padded() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    dm.write_page(0, &[0xAB; PAGE_SIZE]).unwrap();
    dm.write_page(0, b"short").unwrap();

    let mut data = [0u8; PAGE_SIZE];
    dm.read_page(0, &mut data).unwrap();
    assert_eq!(&data[..5], b"short");
    assert!(data[5..].iter().all(|&b| b == 0));
    assert_eq!(std::fs::metadata(temp_file.path()).unwrap().len(), PAGE_SIZE as u64);
}

#[test]
fn test_disk_manager_persistence() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let dm = DiskManager::new(&path).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        data[..16].copy_from_slice(b"Persistence test");
        dm.write_page(0, &data).unwrap();
        dm.write_page(1, &data).unwrap();
    }

    let dm = DiskManager::new(&path).unwrap();
    assert_eq!(dm.num_pages().unwrap(), 2);
    let mut data = [0u8; PAGE_SIZE];
    dm.read_page(1, &mut data).unwrap();
    assert_eq!(&data[..16], b"Persistence test");
    assert!(matches!(
        dm.read_page(2, &mut data),
        Err(DbError::PageOutOfRange { page_no: 2, page_count: 2 })
    ));
}

#[test]
fn test_disk_manager_concurrent_writers() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());

    // Every thread owns a disjoint set of pages
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let dm = Arc::clone(&dm);
            thread::spawn(move || {
                for i in 0..8 {
                    let page_no = i * 4 + t;
                    let data = [page_no as u8; PAGE_SIZE];
                    dm.write_page(page_no, &data).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(dm.num_pages().unwrap(), 32);
    assert_eq!(dm.num_writes(), 32);
    for page_no in 0..32 {
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(page_no, &mut data).unwrap();
        assert!(data.iter().all(|&b| b == page_no as u8));
    }
}
