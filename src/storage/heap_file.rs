use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::vec;

use log::debug;
use parking_lot::Mutex;

use crate::buffer::BufferPool;
use crate::common::{
    DbError, Permission, RecordId, Result, TransactionId, PAGE_SIZE, STRING_LENGTH,
};
use crate::tuple::{DataType, Tuple, TupleDesc, Value};

use super::disk::DiskManager;
use super::page::HeapPage;
use super::traits::{DbFile, Page, TupleIter};

/// An unordered table stored as a flat file of [`HeapPage`]s.
///
/// All page access for reads and writes goes through the shared
/// [`BufferPool`], which takes page locks on behalf of the calling
/// transaction. The file itself only does raw page I/O.
pub struct HeapFile {
    disk: DiskManager,
    desc: Arc<TupleDesc>,
    pool: Arc<BufferPool>,
    /// Canonical path of the backing file, unique per open file
    file_id: Arc<str>,
    /// Handed to pages so they can find their way back for flushing
    self_ref: Weak<HeapFile>,
    /// Serializes appending a new page
    extend_latch: Mutex<()>,
}

impl HeapFile {
    /// Opens the heap file at `path`, creating it empty if it does not exist.
    ///
    /// Fails with [`DbError::UnusableDescriptor`] if a page cannot hold a
    /// single tuple of `desc` (no fields, or wider than a page).
    pub fn open<P: AsRef<Path>>(
        path: P,
        desc: Arc<TupleDesc>,
        pool: Arc<BufferPool>,
    ) -> Result<Arc<Self>> {
        if HeapPage::capacity_for(&desc) == 0 {
            return Err(DbError::UnusableDescriptor(desc.to_string()));
        }
        let disk = DiskManager::new(path.as_ref())?;
        let file_id: Arc<str> = std::fs::canonicalize(path.as_ref())?
            .to_string_lossy()
            .into();
        debug!("opened heap file {} with {} pages", file_id, disk.num_pages()?);

        Ok(Arc::new_cyclic(|me| Self {
            disk,
            desc,
            pool,
            file_id,
            self_ref: me.clone(),
            extend_latch: Mutex::new(()),
        }))
    }

    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    /// Number of pages read from disk so far.
    pub fn num_reads(&self) -> u32 {
        self.disk.num_reads()
    }

    /// Number of pages written to disk so far.
    pub fn num_writes(&self) -> u32 {
        self.disk.num_writes()
    }

    fn weak_self(&self) -> Weak<dyn DbFile> {
        self.self_ref.clone()
    }

    /// Whether the cached copy of `page_no` looks like it has room. A page
    /// that is not cached, or is latched right now, counts as a candidate.
    fn may_have_room(&self, page_no: usize) -> bool {
        match self.pool.peek_page(&self.page_key(page_no)) {
            Some(page) => page.try_read().map_or(true, |p| p.has_free_slot()),
            None => true,
        }
    }

    fn try_insert_into(
        &self,
        page_no: usize,
        tuple: &mut Tuple,
        tid: TransactionId,
    ) -> Result<Option<RecordId>> {
        let page = self.pool.get_page(self, page_no, tid, Permission::Write)?;
        let mut page = page.write();
        if !page.has_free_slot() {
            return Ok(None);
        }
        page.insert_tuple(tuple).map(Some)
    }

    /// Appends an empty page to the file and returns its number.
    fn append_page(&self) -> Result<usize> {
        let _extend = self.extend_latch.lock();
        let page_no = self.disk.num_pages()?;
        let mut page = HeapPage::new(Arc::clone(&self.desc), page_no, self.weak_self());
        self.flush_page(&mut page)?;
        debug!("allocated page {} of {}", page_no, self.file_id);
        Ok(page_no)
    }

    /// Bulk-loads delimited text, one row per tuple.
    ///
    /// Integer columns are parsed as floats and truncated; strings longer
    /// than STRING_LENGTH bytes are cut at the last char boundary that fits.
    /// When `skip_last_field` is set the final field of every row is dropped
    /// (some generators end each line with a separator). Every row is
    /// inserted and committed in its own transaction. Returns the number of
    /// rows loaded.
    pub fn load_csv<R: Read>(
        &self,
        reader: R,
        has_header: bool,
        separator: u8,
        skip_last_field: bool,
    ) -> Result<usize> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(has_header)
            .delimiter(separator)
            .flexible(true)
            .from_reader(reader);

        let mut loaded = 0;
        for (line, record) in csv.records().enumerate() {
            let record = record?;
            let mut fields: Vec<&str> = record.iter().collect();
            if skip_last_field {
                fields.pop();
            }
            if fields.len() != self.desc.field_count() {
                return Err(DbError::MalformedCsv(format!(
                    "row {} has {} fields, expected {}",
                    line + 1,
                    fields.len(),
                    self.desc.field_count()
                )));
            }

            let values = fields
                .iter()
                .zip(self.desc.fields())
                .map(|(raw, field)| Self::parse_field(raw, field.data_type(), line + 1))
                .collect::<Result<Vec<_>>>()?;

            let mut tuple = Tuple::new(Arc::clone(&self.desc), values);
            let tid = TransactionId::new();
            self.pool.begin_transaction(tid);
            if let Err(e) = self.insert_tuple(&mut tuple, tid) {
                self.pool.abort_transaction(tid);
                return Err(e);
            }
            self.pool.commit_transaction(tid)?;
            loaded += 1;
        }

        debug!("loaded {} rows into {}", loaded, self.file_id);
        Ok(loaded)
    }

    fn parse_field(raw: &str, data_type: DataType, row: usize) -> Result<Value> {
        match data_type {
            DataType::Int => raw
                .trim()
                .parse::<f64>()
                .map(|f| Value::Int(f as i64))
                .map_err(|_| {
                    DbError::MalformedCsv(format!("row {}: cannot convert {:?} to int", row, raw))
                }),
            DataType::String => {
                let mut end = raw.len().min(STRING_LENGTH);
                while !raw.is_char_boundary(end) {
                    end -= 1;
                }
                Ok(Value::String(raw[..end].to_string()))
            }
        }
    }
}

impl DbFile for HeapFile {
    fn file_id(&self) -> Arc<str> {
        Arc::clone(&self.file_id)
    }

    fn num_pages(&self) -> Result<usize> {
        self.disk.num_pages()
    }

    fn read_page(&self, page_no: usize) -> Result<HeapPage> {
        let mut data = vec![0u8; PAGE_SIZE];
        self.disk.read_page(page_no, &mut data)?;
        HeapPage::from_bytes(Arc::clone(&self.desc), page_no, self.weak_self(), &data)
    }

    fn flush_page(&self, page: &mut HeapPage) -> Result<()> {
        let data = page.serialize()?;
        self.disk.write_page(page.page_no(), &data)?;
        page.set_dirty(false);
        Ok(())
    }

    /// Finds a free slot in three passes: pages of this file already in the
    /// buffer pool (most recent first), then every page on disk, then a
    /// freshly appended page.
    fn insert_tuple(&self, tuple: &mut Tuple, tid: TransactionId) -> Result<RecordId> {
        tuple.validate()?;

        let resident = self.pool.resident_pages(&self.file_id);
        for &page_no in &resident {
            if !self.may_have_room(page_no) {
                continue;
            }
            if let Some(rid) = self.try_insert_into(page_no, tuple, tid)? {
                return Ok(rid);
            }
        }

        for page_no in 0..self.num_pages()? {
            if resident.contains(&page_no) || !self.may_have_room(page_no) {
                continue;
            }
            if let Some(rid) = self.try_insert_into(page_no, tuple, tid)? {
                return Ok(rid);
            }
        }

        // a concurrent inserter can fill the new page first
        loop {
            let page_no = self.append_page()?;
            if let Some(rid) = self.try_insert_into(page_no, tuple, tid)? {
                return Ok(rid);
            }
        }
    }

    fn delete_tuple(&self, tuple: &Tuple, tid: TransactionId) -> Result<()> {
        let rid = tuple.rid().ok_or(DbError::MissingRecordId)?;
        let page = self.pool.get_page(self, rid.page_no, tid, Permission::Write)?;
        let result = page.write().delete_tuple(rid);
        result
    }

    fn iter(&self, tid: TransactionId) -> Result<TupleIter<'_>> {
        Ok(Box::new(HeapFileIter {
            file: self,
            tid,
            next_page: 0,
            num_pages: self.num_pages()?,
            current: Vec::new().into_iter(),
        }))
    }

    fn descriptor(&self) -> &Arc<TupleDesc> {
        &self.desc
    }
}

/// Page-at-a-time scan over a heap file. Each page is read-locked through
/// the buffer pool and its tuples copied out before moving on.
struct HeapFileIter<'a> {
    file: &'a HeapFile,
    tid: TransactionId,
    next_page: usize,
    /// Page count when the scan started
    num_pages: usize,
    current: vec::IntoIter<Tuple>,
}

impl Iterator for HeapFileIter<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            if self.next_page >= self.num_pages {
                return None;
            }

            let page_no = self.next_page;
            self.next_page += 1;
            match self
                .file
                .pool
                .get_page(self.file, page_no, self.tid, Permission::Read)
            {
                Ok(page) => {
                    let tuples: Vec<Tuple> = page.read().tuples().cloned().collect();
                    self.current = tuples.into_iter();
                }
                Err(e) => {
                    self.next_page = self.num_pages;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::TupleBuilder;
    use tempfile::TempDir;

    fn create_file(capacity: usize) -> (Arc<BufferPool>, Arc<HeapFile>, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(BufferPool::new(capacity));
        let desc = TupleDesc::builder().string("name").int("age").build_arc();
        let file = HeapFile::open(dir.path().join("people.dat"), desc, Arc::clone(&pool)).unwrap();
        (pool, file, dir)
    }

    #[test]
    fn test_open_creates_empty_file() {
        let (_pool, file, _dir) = create_file(4);
        assert!(file.path().exists());
        assert_eq!(file.num_pages().unwrap(), 0);

        let tid = TransactionId::new();
        assert_eq!(file.iter(tid).unwrap().count(), 0);
    }

    #[test]
    fn test_insert_allocates_page() {
        let (pool, file, _dir) = create_file(4);
        let tid = TransactionId::new();

        let mut t = TupleBuilder::new(Arc::clone(file.descriptor()))
            .value("sam")
            .value(25)
            .build();
        let rid = file.insert_tuple(&mut t, tid).unwrap();

        assert_eq!(rid, RecordId::new(0, 0));
        assert_eq!(file.num_pages().unwrap(), 1);
        assert!(pool.holds_lock(tid, &file.page_key(0), Permission::Write));
    }

    #[test]
    fn test_delete_requires_rid() {
        let (_pool, file, _dir) = create_file(4);
        let t = TupleBuilder::new(Arc::clone(file.descriptor()))
            .value("sam")
            .value(25)
            .build();
        assert!(matches!(
            file.delete_tuple(&t, TransactionId::new()),
            Err(DbError::MissingRecordId)
        ));
    }

    #[test]
    fn test_read_page_out_of_range() {
        let (_pool, file, _dir) = create_file(4);
        assert!(matches!(
            file.read_page(0),
            Err(DbError::PageOutOfRange { page_no: 0, page_count: 0 })
        ));
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(
            HeapFile::parse_field(" 42.9 ", DataType::Int, 1).unwrap(),
            Value::Int(42)
        );
        assert!(HeapFile::parse_field("abc", DataType::Int, 1).is_err());

        let long = "é".repeat(20);
        let cut = HeapFile::parse_field(&long, DataType::String, 1).unwrap();
        assert_eq!(cut.as_str().unwrap().len(), STRING_LENGTH);
    }
}
