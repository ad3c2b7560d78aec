//! Generic element vector: a contiguous array of fixed-size slots.
//!
//! Arena layout: `{ num, max, objsize, options, initnum, data }`.  `objsize`
//! is the slot size in bytes; `num ≤ max`; `data` addresses `max × objsize`
//! contiguous bytes.  Growth on insert-when-full is governed by the creation
//! options, in this exact priority: double, then linear (by the initial
//! count), then exact (one slot at a time).
//!
//! The thread-safe option bit is accepted and ignored — execution is
//! single-threaded cooperative, and `lock`/`unlock` are no-ops.

use crate::context::RuntimeContext;
use crate::heap::Addr;
use crate::runtime::Runtime;

/// Arena size of the vector header.
pub const QVECTOR_SIZE: u32 = 24;

/// Accepted and ignored.
pub const QVECTOR_THREADSAFE: u32 = 0x01;
/// Grow to `(max + 1) * 2` slots when full.
pub const QVECTOR_RESIZE_DOUBLE: u32 = 0x02;
/// Grow by the creation-time slot count when full.
pub const QVECTOR_RESIZE_LINEAR: u32 = 0x04;
/// Grow one slot at a time.
pub const QVECTOR_RESIZE_EXACT: u32 = 0x08;

const OFF_NUM: u32 = 0;
const OFF_MAX: u32 = 4;
const OFF_OBJSIZE: u32 = 8;
const OFF_OPTIONS: u32 = 12;
const OFF_INITNUM: u32 = 16;
const OFF_DATA: u32 = 20;

const INDEX_ERROR: &str = "IndexError: list index out of range";

/// Caller-owned iteration cursor; the zero value starts from the beginning.
#[derive(Debug, Default, Clone, Copy)]
pub struct QVectorCursor {
    pub index: u32,
    /// Address of the current element (or of a malloc'd copy when iterating
    /// with `newmem`).
    pub data: Addr,
}

impl Runtime {
    /// Creates an element vector with `max` initial slots of `objsize`
    /// bytes.  Returns the null address when `objsize` is zero.
    pub fn qvector(&mut self, max: u32, objsize: u32, options: u32) -> Addr {
        if objsize == 0 {
            return 0;
        }
        let v = self.malloc(QVECTOR_SIZE);
        let data = if max == 0 {
            0
        } else {
            self.malloc(max * objsize)
        };
        self.heap.store_u32(v + OFF_NUM, 0);
        self.heap.store_u32(v + OFF_MAX, max);
        self.heap.store_u32(v + OFF_OBJSIZE, objsize);
        self.heap.store_u32(v + OFF_DATA, data);

        let (resolved, initnum) = if options & QVECTOR_RESIZE_DOUBLE != 0 {
            (QVECTOR_RESIZE_DOUBLE, 0)
        } else if options & QVECTOR_RESIZE_LINEAR != 0 {
            (QVECTOR_RESIZE_LINEAR, if max == 0 { 1 } else { max })
        } else {
            (QVECTOR_RESIZE_EXACT, 0)
        };
        self.heap.store_u32(v + OFF_OPTIONS, resolved);
        self.heap.store_u32(v + OFF_INITNUM, initnum);
        v
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn qvector_size(&self, v: Addr) -> u32 {
        self.heap.load_u32(v + OFF_NUM)
    }

    pub(crate) fn qvector_set_num(&mut self, v: Addr, num: u32) {
        self.heap.store_u32(v + OFF_NUM, num);
    }

    pub fn qvector_max(&self, v: Addr) -> u32 {
        self.heap.load_u32(v + OFF_MAX)
    }

    pub fn qvector_objsize(&self, v: Addr) -> u32 {
        self.heap.load_u32(v + OFF_OBJSIZE)
    }

    pub(crate) fn qvector_set_objsize(&mut self, v: Addr, objsize: u32) {
        self.heap.store_u32(v + OFF_OBJSIZE, objsize);
    }

    pub fn qvector_data(&self, v: Addr) -> Addr {
        self.heap.load_u32(v + OFF_DATA)
    }

    /// Host-side view of the populated slots.
    pub fn qvector_as_slice(&self, v: Addr) -> &[u8] {
        let num = self.qvector_size(v);
        let objsize = self.qvector_objsize(v);
        if num == 0 {
            return &[];
        }
        self.heap.bytes(self.qvector_data(v), num * objsize)
    }

    // ── Insertion ────────────────────────────────────────────────────────

    pub fn qvector_addfirst(&mut self, v: Addr, data: &[u8]) -> bool {
        self.qvector_addat(v, 0, data)
    }

    pub fn qvector_addlast(&mut self, v: Addr, data: &[u8]) -> bool {
        let num = self.qvector_size(v) as i32;
        self.qvector_addat(v, num, data)
    }

    /// Inserts a slot at `index` (negative indices resolve from the end).
    pub fn qvector_addat(&mut self, v: Addr, index: i32, data: &[u8]) -> bool {
        let num = self.qvector_size(v);
        let mut index = index;
        if index < 0 {
            index += num as i32;
        }
        if index < 0 || index as u32 > num {
            return false;
        }
        let index = index as u32;

        let max = self.qvector_max(v);
        if num >= max {
            let options = self.heap.load_u32(v + OFF_OPTIONS);
            let newmax = if options & QVECTOR_RESIZE_DOUBLE != 0 {
                (max + 1) * 2
            } else if options & QVECTOR_RESIZE_LINEAR != 0 {
                max + self.heap.load_u32(v + OFF_INITNUM)
            } else {
                max + 1
            };
            if !self.qvector_resize(v, newmax) {
                return false;
            }
        }

        let objsize = self.qvector_objsize(v);
        let base = self.qvector_data(v);
        if index < num {
            // Shift index..num up one slot.
            self.heap.copy(
                base + (index + 1) * objsize,
                base + index * objsize,
                (num - index) * objsize,
            );
        }
        let dst = base + index * objsize;
        self.heap.write(dst, &data[..objsize as usize]);
        self.heap.store_u32(v + OFF_NUM, num + 1);
        true
    }

    /// Arena-sourced variant of [`Self::qvector_addat`] appending at the end.
    pub fn qvector_addlast_from_arena(&mut self, v: Addr, src: Addr) -> bool {
        let objsize = self.qvector_objsize(v);
        let bytes = self.heap.bytes(src, objsize).to_vec();
        self.qvector_addlast(v, &bytes)
    }

    // ── Element access ───────────────────────────────────────────────────

    fn get_at(&mut self, v: Addr, index: i32, newmem: bool) -> Option<Addr> {
        let num = self.qvector_size(v);
        let mut index = index;
        if index < 0 {
            index += num as i32;
        }
        if index < 0 || index as u32 >= num {
            return None;
        }
        let objsize = self.qvector_objsize(v);
        let src = self.qvector_data(v) + index as u32 * objsize;
        if newmem {
            let dump = self.malloc(objsize);
            self.heap.copy(dump, src, objsize);
            Some(dump)
        } else {
            Some(src)
        }
    }

    /// Address of the element at `index`; `newmem` returns a malloc'd copy
    /// instead of a pointer into storage.  Out of range aborts.
    pub fn qvector_getat(
        &mut self,
        v: Addr,
        index: i32,
        newmem: bool,
        ctx: &RuntimeContext,
    ) -> Addr {
        match self.get_at(v, index, newmem) {
            Some(data) => data,
            None => self.runtime_abort(INDEX_ERROR, ctx),
        }
    }

    pub fn qvector_getfirst(&mut self, v: Addr, newmem: bool, ctx: &RuntimeContext) -> Addr {
        self.qvector_getat(v, 0, newmem, ctx)
    }

    pub fn qvector_getlast(&mut self, v: Addr, newmem: bool, ctx: &RuntimeContext) -> Addr {
        let size = self.qvector_size(v) as i32;
        self.qvector_getat(v, size - 1, newmem, ctx)
    }

    pub fn qvector_setat(&mut self, v: Addr, index: i32, data: &[u8], ctx: &RuntimeContext) -> bool {
        let Some(old) = self.get_at(v, index, false) else {
            self.runtime_abort(INDEX_ERROR, ctx);
        };
        let objsize = self.qvector_objsize(v);
        self.heap.write(old, &data[..objsize as usize]);
        true
    }

    pub fn qvector_setfirst(&mut self, v: Addr, data: &[u8], ctx: &RuntimeContext) -> bool {
        self.qvector_setat(v, 0, data, ctx)
    }

    pub fn qvector_setlast(&mut self, v: Addr, data: &[u8], ctx: &RuntimeContext) -> bool {
        let size = self.qvector_size(v) as i32;
        self.qvector_setat(v, size - 1, data, ctx)
    }

    /// Replaces the whole contents with `size` elements read from `data`.
    pub fn qvector_setdata(&mut self, v: Addr, data: &[u8], size: u32) -> bool {
        if data.is_empty() && size != 0 {
            return false;
        }
        if !self.qvector_resize(v, size) {
            return false;
        }
        self.heap.store_u32(v + OFF_NUM, size);
        if size == 0 {
            return true;
        }
        let objsize = self.qvector_objsize(v);
        let dst = self.qvector_data(v);
        self.heap.write(dst, &data[..(size * objsize) as usize]);
        true
    }

    // ── Removal ──────────────────────────────────────────────────────────

    /// Returns a malloc'd copy of the element at `index` and removes it.
    /// Popping an empty vector aborts.
    pub fn qvector_popat(&mut self, v: Addr, index: i32, ctx: &RuntimeContext) -> Addr {
        if self.qvector_size(v) == 0 {
            self.runtime_abort("vector::pop called for empty vector", ctx);
        }
        let Some(data) = self.get_at(v, index, true) else {
            return 0;
        };
        if !self.remove_at(v, index) {
            self.mfree(data);
            return 0;
        }
        let num = self.qvector_size(v);
        self.heap.store_u32(v + OFF_NUM, num - 1);
        data
    }

    pub fn qvector_popfirst(&mut self, v: Addr, ctx: &RuntimeContext) -> Addr {
        self.qvector_popat(v, 0, ctx)
    }

    pub fn qvector_poplast(&mut self, v: Addr, ctx: &RuntimeContext) -> Addr {
        let size = self.qvector_size(v) as i32;
        self.qvector_popat(v, size - 1, ctx)
    }

    fn remove_at(&mut self, v: Addr, index: i32) -> bool {
        let num = self.qvector_size(v);
        let mut index = index;
        if index < 0 {
            index += num as i32;
        }
        if index < 0 || index as u32 >= num {
            return false;
        }
        let index = index as u32;
        let objsize = self.qvector_objsize(v);
        let base = self.qvector_data(v);
        if index + 1 < num {
            self.heap.copy(
                base + index * objsize,
                base + (index + 1) * objsize,
                (num - index - 1) * objsize,
            );
        }
        true
    }

    pub fn qvector_removeat(&mut self, v: Addr, index: i32) -> bool {
        let removed = self.remove_at(v, index);
        if removed {
            let num = self.qvector_size(v);
            self.heap.store_u32(v + OFF_NUM, num - 1);
        }
        removed
    }

    pub fn qvector_removefirst(&mut self, v: Addr) -> bool {
        self.qvector_removeat(v, 0)
    }

    pub fn qvector_removelast(&mut self, v: Addr) -> bool {
        let size = self.qvector_size(v) as i32;
        self.qvector_removeat(v, size - 1)
    }

    // ── Whole-vector operations ──────────────────────────────────────────

    pub fn qvector_clear(&mut self, v: Addr) {
        self.heap.store_u32(v + OFF_NUM, 0);
    }

    pub fn qvector_free(&mut self, v: Addr) {
        self.qvector_clear(v);
        let data = self.qvector_data(v);
        if data != 0 {
            self.mfree(data);
        }
        self.mfree(v);
    }

    /// Changes the allocated slot count.  `newmax == 0` drops the buffer
    /// (and the slot size — the vector must be re-created to be reused).
    pub fn qvector_resize(&mut self, v: Addr, newmax: u32) -> bool {
        let data = self.qvector_data(v);
        if newmax == 0 {
            if data != 0 {
                self.mfree(data);
            }
            self.heap.store_u32(v + OFF_DATA, 0);
            self.heap.store_u32(v + OFF_MAX, 0);
            self.heap.store_u32(v + OFF_NUM, 0);
            self.heap.store_u32(v + OFF_OBJSIZE, 0);
            return true;
        }

        let objsize = self.qvector_objsize(v);
        let newdata = if data == 0 {
            self.malloc(newmax * objsize)
        } else {
            self.mrealloc(data, newmax * objsize)
        };
        self.heap.store_u32(v + OFF_DATA, newdata);
        self.heap.store_u32(v + OFF_MAX, newmax);
        let num = self.qvector_size(v);
        if num > newmax {
            self.heap.store_u32(v + OFF_NUM, newmax);
        }
        true
    }

    /// Flat malloc'd copy of the populated slots; null when empty.
    pub fn qvector_toarray(&mut self, v: Addr) -> (Addr, u32) {
        let num = self.qvector_size(v);
        if num == 0 {
            return (0, 0);
        }
        let objsize = self.qvector_objsize(v);
        let array = self.malloc(num * objsize);
        let data = self.qvector_data(v);
        self.heap.copy(array, data, num * objsize);
        (array, num)
    }

    /// Reverses the slots in place.
    pub fn qvector_reverse(&mut self, v: Addr) {
        let num = self.qvector_size(v);
        if num <= 1 {
            return;
        }
        let objsize = self.qvector_objsize(v) as usize;
        let data = self.qvector_data(v);
        let bytes = self.heap.bytes_mut(data, num * objsize as u32);
        let (mut i, mut j) = (0usize, (num - 1) as usize);
        while i < j {
            for k in 0..objsize {
                bytes.swap(i * objsize + k, j * objsize + k);
            }
            i += 1;
            j -= 1;
        }
    }

    /// Advances the cursor to the next element.  A zeroed cursor starts at
    /// the first element; with `newmem` the cursor's data is a malloc'd
    /// copy the caller owns.
    pub fn qvector_getnext(&mut self, v: Addr, cursor: &mut QVectorCursor, newmem: bool) -> bool {
        let num = self.qvector_size(v);
        if cursor.index >= num {
            cursor.data = 0;
            return false;
        }
        let objsize = self.qvector_objsize(v);
        let data = self.qvector_data(v) + cursor.index * objsize;
        if newmem {
            let dump = self.malloc(objsize);
            self.heap.copy(dump, data, objsize);
            cursor.data = dump;
        } else {
            cursor.data = data;
        }
        cursor.index += 1;
        true
    }

    /// Copies the slots in `[begin, end)` into a fresh vector.  Out-of-range
    /// bounds abort.
    pub fn qvector_slice(&mut self, src: Addr, begin: u32, end: u32, ctx: &RuntimeContext) -> Addr {
        let num = self.qvector_size(src);
        if end < begin || end > num {
            self.runtime_abort(INDEX_ERROR, ctx);
        }
        let objsize = self.qvector_objsize(src);
        let options = self.heap.load_u32(src + OFF_OPTIONS);
        let result = self.qvector(end - begin, objsize, options);
        let src_data = self.qvector_data(src);
        let dst_data = self.qvector_data(result);
        self.heap
            .copy(dst_data, src_data + objsize * begin, (end - begin) * objsize);
        self.heap.store_u32(result + OFF_NUM, end - begin);
        result
    }

    /// Collects a byte-element vector into a byte vector.
    pub fn qvector_to_str(&mut self, src: Addr, ctx: &RuntimeContext) -> Addr {
        let res = self.vector_new(0, None);
        let mut cursor = QVectorCursor::default();
        while self.qvector_getnext(src, &mut cursor, false) {
            let byte = self.heap.load_u8(cursor.data);
            self.vector_appd(res, &[byte], ctx);
        }
        res
    }

    /// Critical-section hooks: no-ops in this single-threaded design.
    pub fn qvector_lock(&mut self, _v: Addr) {}

    pub fn qvector_unlock(&mut self, _v: Addr) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: RuntimeContext = RuntimeContext::new("qvector_test", 0, 0);

    fn i32vec(rt: &mut Runtime, options: u32) -> Addr {
        rt.qvector(3, 4, options)
    }

    fn push(rt: &mut Runtime, v: Addr, x: i32) {
        assert!(rt.qvector_addlast(v, &x.to_le_bytes()));
    }

    fn read(rt: &mut Runtime, v: Addr, i: i32) -> i32 {
        let addr = rt.qvector_getat(v, i, false, &CTX);
        i32::from_le_bytes(rt.heap().bytes(addr, 4).try_into().unwrap())
    }

    #[test]
    fn add_get_set_roundtrip() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        for x in [100, 101, 102] {
            push(&mut rt, v, x);
        }
        assert_eq!(rt.qvector_size(v), 3);
        assert_eq!(read(&mut rt, v, 0), 100);
        assert_eq!(read(&mut rt, v, 2), 102);
        assert_eq!(read(&mut rt, v, -1), 102);

        assert!(rt.qvector_setat(v, 1, &7i32.to_le_bytes(), &CTX));
        assert_eq!(read(&mut rt, v, 1), 7);
    }

    #[test]
    fn addfirst_shifts() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        push(&mut rt, v, 2);
        assert!(rt.qvector_addfirst(v, &1i32.to_le_bytes()));
        assert_eq!(read(&mut rt, v, 0), 1);
        assert_eq!(read(&mut rt, v, 1), 2);
    }

    #[test]
    fn growth_policies() {
        let mut rt = Runtime::with_mock_host();

        let double = rt.qvector(2, 4, QVECTOR_RESIZE_DOUBLE);
        for x in 0..3 {
            push(&mut rt, double, x);
        }
        assert_eq!(rt.qvector_max(double), 6); // (2 + 1) * 2

        let linear = rt.qvector(2, 4, QVECTOR_RESIZE_LINEAR);
        for x in 0..3 {
            push(&mut rt, linear, x);
        }
        assert_eq!(rt.qvector_max(linear), 4); // 2 + 2

        let exact = rt.qvector(2, 4, QVECTOR_RESIZE_EXACT);
        for x in 0..3 {
            push(&mut rt, exact, x);
        }
        assert_eq!(rt.qvector_max(exact), 3); // 2 + 1
    }

    #[test]
    fn addlast_then_poplast_restores_state() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        push(&mut rt, v, 1);
        push(&mut rt, v, 2);
        let before = rt.qvector_as_slice(v).to_vec();

        push(&mut rt, v, 3);
        let popped = rt.qvector_poplast(v, &CTX);
        assert_eq!(rt.heap().load_u32(popped), 3);
        assert_eq!(rt.qvector_as_slice(v), &before[..]);
    }

    #[test]
    fn remove_and_clear() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        for x in [10, 20, 30] {
            push(&mut rt, v, x);
        }
        assert!(rt.qvector_removeat(v, 1));
        assert_eq!(rt.qvector_size(v), 2);
        assert_eq!(read(&mut rt, v, 1), 30);

        rt.qvector_clear(v);
        assert_eq!(rt.qvector_size(v), 0);
    }

    #[test]
    fn reverse_and_slice() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        for x in [1, 2, 3, 4] {
            push(&mut rt, v, x);
        }
        rt.qvector_reverse(v);
        assert_eq!(read(&mut rt, v, 0), 4);
        assert_eq!(read(&mut rt, v, 3), 1);

        let s = rt.qvector_slice(v, 1, 3, &CTX);
        assert_eq!(rt.qvector_size(s), 2);
        assert_eq!(read(&mut rt, s, 0), 3);
        assert_eq!(read(&mut rt, s, 1), 2);
    }

    #[test]
    fn getnext_iterates_all() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        for x in [5, 6, 7] {
            push(&mut rt, v, x);
        }
        let mut cursor = QVectorCursor::default();
        let mut seen = Vec::new();
        while rt.qvector_getnext(v, &mut cursor, false) {
            seen.push(rt.heap().load_u32(cursor.data));
        }
        assert_eq!(seen, [5, 6, 7]);
    }

    #[test]
    #[should_panic(expected = "IndexError: list index out of range")]
    fn out_of_range_get_aborts() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        push(&mut rt, v, 1);
        rt.qvector_getat(v, 5, false, &CTX);
    }

    #[test]
    #[should_panic(expected = "vector::pop called for empty vector")]
    fn pop_empty_aborts() {
        let mut rt = Runtime::with_mock_host();
        let v = i32vec(&mut rt, QVECTOR_RESIZE_DOUBLE);
        rt.qvector_popat(v, 0, &CTX);
    }
}
