use std::fmt;
use std::sync::{Arc, Weak};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::{DbError, RecordId, Result, PAGE_HEADER_SIZE, PAGE_SIZE};
use crate::storage::{DbFile, Page};
use crate::tuple::{Tuple, TupleDesc};

/// Marks the start of the free slot list; a zero-padded tail never matches
const FREE_LIST_TAG: u16 = 0xF5EE;

/// Heap page layout:
///
/// | Field              | Offset          | Size                        |
/// |--------------------|-----------------|-----------------------------|
/// | slot_capacity      | 0               | 4 (i32, LE)                 |
/// | used_slot_count    | 4               | 4 (i32, LE)                 |
/// | tuples             | 8               | used * bytes_per_tuple      |
/// | free list tag      | after tuples    | 2 (u16, LE)                 |
/// | free slot list     | after tag       | (capacity - used) * 2 (u16) |
/// | padding            | rest            | zeros up to PAGE_SIZE       |
///
/// Occupied slots are written in slot order with no gaps. The tagged free
/// slot list is only present when the page has holes and lets a reader put
/// every tuple back in the slot it was written from, so record IDs survive a
/// flush and re-read. A page without the tag, or with an invalid list, is
/// read back with its tuples in slots `0..used`.
///
/// All tuples of a file have the same width, so the capacity is fixed:
/// `(PAGE_SIZE - PAGE_HEADER_SIZE) / bytes_per_tuple`.
pub struct HeapPage {
    page_no: usize,
    desc: Arc<TupleDesc>,
    /// One entry per slot; `None` marks a free slot
    slots: Vec<Option<Tuple>>,
    /// Number of `Some` entries in `slots`
    used: usize,
    dirty: bool,
    file: Weak<dyn DbFile>,
}

impl HeapPage {
    /// Creates an empty page with every slot free.
    pub fn new(desc: Arc<TupleDesc>, page_no: usize, file: Weak<dyn DbFile>) -> Self {
        let capacity = Self::capacity_for(&desc);
        Self {
            page_no,
            desc,
            slots: vec![None; capacity],
            used: 0,
            dirty: false,
            file,
        }
    }

    /// Number of tuple slots a page holds for tuples of `desc`.
    pub fn capacity_for(desc: &TupleDesc) -> usize {
        (PAGE_SIZE - PAGE_HEADER_SIZE)
            .checked_div(desc.bytes_per_tuple())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_count(&self) -> usize {
        self.used
    }

    pub fn has_free_slot(&self) -> bool {
        self.used < self.capacity()
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Stores `tuple` in the first free slot and assigns its record ID.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if **tuple.desc() != *self.desc {
            return Err(DbError::TypeMismatch {
                expected: self.desc.to_string(),
                found: tuple.desc().to_string(),
            });
        }
        tuple.validate()?;

        let slot_no = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DbError::NoFreeSlot(self.page_no))?;

        let rid = RecordId::new(self.page_no, slot_no);
        tuple.set_rid(Some(rid));
        self.slots[slot_no] = Some(tuple.clone());
        self.used += 1;
        self.dirty = true;
        Ok(rid)
    }

    /// Frees the slot named by `rid`. The slot is not compacted.
    pub fn delete_tuple(&mut self, rid: RecordId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(rid.slot_no)
            .ok_or(DbError::InvalidSlot(rid))?;
        if slot.take().is_none() {
            return Err(DbError::EmptySlot(rid));
        }
        self.used -= 1;
        self.dirty = true;
        Ok(())
    }

    /// Returns the tuple in `slot_no`, if that slot is occupied.
    pub fn get_tuple(&self, slot_no: usize) -> Option<&Tuple> {
        self.slots.get(slot_no).and_then(Option::as_ref)
    }

    /// Returns the occupied slots in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().flatten()
    }

    /// Encodes the page. The result is at most PAGE_SIZE bytes; the caller
    /// pads it when writing a block.
    pub fn serialize(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(PAGE_SIZE);
        buf.put_i32_le(self.capacity() as i32);
        buf.put_i32_le(self.used as i32);

        for tuple in self.tuples() {
            tuple.write_to(&mut buf)?;
        }

        if self.has_free_slot() {
            buf.put_u16_le(FREE_LIST_TAG);
            for (slot_no, _) in self.slots.iter().enumerate().filter(|(_, s)| s.is_none()) {
                buf.put_u16_le(slot_no as u16);
            }
        }

        debug_assert!(buf.len() <= PAGE_SIZE);
        Ok(buf.freeze())
    }

    /// Decodes a page image produced by [`HeapPage::serialize`].
    pub fn from_bytes(
        desc: Arc<TupleDesc>,
        page_no: usize,
        file: Weak<dyn DbFile>,
        data: &[u8],
    ) -> Result<Self> {
        let mut page = Self::new(desc, page_no, file);
        let mut buf = data;

        if buf.remaining() < PAGE_HEADER_SIZE {
            return Err(DbError::MalformedPage(format!(
                "page {} is {} bytes, shorter than its header",
                page_no,
                data.len()
            )));
        }
        let capacity = buf.get_i32_le();
        let used = buf.get_i32_le();

        if capacity < 0 || capacity as usize != page.capacity() {
            return Err(DbError::MalformedPage(format!(
                "page {} has {} slots, expected {}",
                page_no,
                capacity,
                page.capacity()
            )));
        }
        if used < 0 || used > capacity {
            return Err(DbError::MalformedPage(format!(
                "page {} claims {} used slots of {}",
                page_no, used, capacity
            )));
        }
        let used = used as usize;

        let mut tuples = Vec::with_capacity(used);
        for _ in 0..used {
            tuples.push(Tuple::read_from(&page.desc, &mut buf)?);
        }

        let occupied = Self::occupied_slots(&mut buf, page.capacity(), used);
        for (slot_no, mut tuple) in occupied.into_iter().zip(tuples) {
            tuple.set_rid(Some(RecordId::new(page_no, slot_no)));
            page.slots[slot_no] = Some(tuple);
        }
        page.used = used;

        Ok(page)
    }

    /// Works out which slots the serialized tuples came from. Falls back to
    /// `0..used` unless a tagged free slot list follows the tuples and is
    /// strictly ascending and in range.
    fn occupied_slots(buf: &mut &[u8], capacity: usize, used: usize) -> Vec<usize> {
        let holes = capacity - used;
        if holes == 0 || buf.remaining() < 2 + holes * 2 || buf.get_u16_le() != FREE_LIST_TAG {
            return (0..used).collect();
        }

        let mut free = Vec::with_capacity(holes);
        for _ in 0..holes {
            let slot_no = buf.get_u16_le() as usize;
            let ascending = free.last().map_or(true, |&prev| slot_no > prev);
            if slot_no >= capacity || !ascending {
                return (0..used).collect();
            }
            free.push(slot_no);
        }

        (0..capacity)
            .filter(|slot_no| free.binary_search(slot_no).is_err())
            .collect()
    }
}

impl Page for HeapPage {
    fn page_no(&self) -> usize {
        self.page_no
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn owning_file(&self) -> Option<Arc<dyn DbFile>> {
        self.file.upgrade()
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapPage")
            .field("page_no", &self.page_no)
            .field("capacity", &self.capacity())
            .field("used", &self.used)
            .field("dirty", &self.dirty)
            .finish()
    }
}
