use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{DbError, Result, PAGE_SIZE};

/// DiskManager reads and writes fixed-size pages of one flat file.
///
/// The file is the concatenation of its pages with no gaps and no file
/// header, so page `n` lives at byte offset `n * PAGE_SIZE`. The page count
/// is derived from the file length on every call and never stored.
pub struct DiskManager {
    /// The backing file
    file: Mutex<File>,
    /// Path to the backing file
    path: PathBuf,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating an empty one if it doesn't exist.
    /// An existing file is never truncated.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Returns the number of whole pages in the file.
    pub fn num_pages(&self) -> Result<usize> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as usize)
    }

    /// Reads page `page_no` into `data`, which must be PAGE_SIZE bytes.
    pub fn read_page(&self, page_no: usize, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.file.lock();
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as usize;
        if page_no >= page_count {
            return Err(DbError::PageOutOfRange {
                page_no,
                page_count,
            });
        }

        file.seek(SeekFrom::Start(Self::offset(page_no)))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data` as page `page_no`, zero padding it to PAGE_SIZE.
    /// Writing at `num_pages()` extends the file by one page.
    pub fn write_page(&self, page_no: usize, data: &[u8]) -> Result<()> {
        assert!(data.len() <= PAGE_SIZE, "Page image exceeds PAGE_SIZE");

        let mut block = [0u8; PAGE_SIZE];
        block[..data.len()].copy_from_slice(data);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::offset(page_no)))?;
        file.write_all(&block)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of page reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn offset(page_no: usize) -> u64 {
        (page_no as u64) * (PAGE_SIZE as u64)
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_manager_new() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_disk_manager_read_write() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        dm.write_page(0, &[42, 7]).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 1);

        let mut data = [0xFFu8; PAGE_SIZE];
        dm.read_page(0, &mut data).unwrap();
        assert_eq!(data[0], 42);
        assert_eq!(data[1], 7);
        assert!(data[2..].iter().all(|&b| b == 0));
        assert_eq!(dm.num_reads(), 1);
        assert_eq!(dm.num_writes(), 1);
    }

    #[test]
    fn test_disk_manager_read_past_end() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();
        dm.write_page(0, &[1]).unwrap();

        let mut data = [0u8; PAGE_SIZE];
        assert!(matches!(
            dm.read_page(1, &mut data),
            Err(DbError::PageOutOfRange {
                page_no: 1,
                page_count: 1
            })
        ));
    }

    #[test]
    fn test_disk_manager_does_not_truncate() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        {
            let dm = DiskManager::new(&path).unwrap();
            dm.write_page(0, &[1]).unwrap();
            dm.write_page(1, &[2]).unwrap();
        }

        let dm = DiskManager::new(&path).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 2);

        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(1, &mut data).unwrap();
        assert_eq!(data[0], 2);
    }

    #[test]
    fn test_partial_trailing_page_is_ignored() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), vec![0u8; PAGE_SIZE + 10]).unwrap();

        let dm = DiskManager::new(temp_file.path()).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 1);
    }
}
