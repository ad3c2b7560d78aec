//! Deterministic bump/free-list allocator over a linear-memory arena.
//!
//! The production target is a 32-bit sandbox whose heap grows by whole
//! 64 KiB pages.  This module models that memory as a single `Vec<u8>` arena;
//! every "pointer" handed out is a [`Addr`] — a `u32` byte offset into the
//! arena.  The allocator itself is the classic size-class design:
//!
//! - every allocation is prefixed by a 12-byte header `{ size, prev, next }`;
//! - four fixed-size free lists (4, 8, 16, 64 bytes) plus one varying-size
//!   list for blocks of 128 bytes or more;
//! - free lists are kept sorted by address and doubly linked through per-list
//!   sentinel start/end nodes;
//! - the varying list coalesces freed blocks with their neighbours, and any
//!   run of free blocks ending exactly at the heap pointer is returned to the
//!   heap (compaction).
//!
//! Determinism matters: `free(alloc(n))` followed by `alloc(n)` must return
//! the same address, and the descriptor/coverage layers assume stable heap
//! addresses within one invocation.

use log::debug;

/// A heap address: byte offset into the arena.  `0` is the null address and
/// is never handed out.
pub type Addr = u32;

/// Page granularity of the sandbox linear memory.
pub const WASM_PAGE_SIZE: u32 = 65536;

/// Size of the per-allocation block header: `{ size: u32, prev: u32, next: u32 }`.
pub const HEAP_BLOCK_HEADER_SIZE: u32 = 12;

/// Default ceiling on arena growth, in pages (64 MiB).
pub const DEFAULT_MAX_PAGES: u32 = 1024;

/// Number of slots in the builtin cache.
pub const BUILTIN_CACHE_SLOTS: usize = 8;

// Size classes: four fixed lists and one varying list.  For the varying list
// the size is the minimum block size.
const HEAP_CLASSES: [(bool, u32); 5] = [
    (true, 4),
    (true, 8),
    (true, 16),
    (true, 64),
    (false, 128),
];

// The per-list sentinel nodes live at the bottom of the arena, below the
// first real block, so address-ordered scans never confuse them with data.
const SENTINEL_BASE: Addr = 16;
const SENTINEL_SPAN: Addr = 2 * HEAP_BLOCK_HEADER_SIZE;

/// First address handed to allocations.  Everything below is sentinel space.
const HEAP_BASE: Addr = SENTINEL_BASE + HEAP_CLASSES.len() as u32 * SENTINEL_SPAN + 8;

const OFF_SIZE: u32 = 0;
const OFF_PREV: u32 = 4;
const OFF_NEXT: u32 = 8;

/// The arena plus allocator state.
pub struct Heap {
    mem: Vec<u8>,
    heap_ptr: Addr,
    heap_top: Addr,
    max_pages: u32,
    builtin_cache: [Addr; BUILTIN_CACHE_SLOTS],
}

impl Heap {
    /// Creates a one-page arena with empty free lists.
    pub fn new() -> Self {
        Self::with_max_pages(DEFAULT_MAX_PAGES)
    }

    /// Creates an arena whose growth is capped at `max_pages` pages.
    pub fn with_max_pages(max_pages: u32) -> Self {
        let mut heap = Heap {
            mem: vec![0u8; WASM_PAGE_SIZE as usize],
            heap_ptr: HEAP_BASE,
            heap_top: WASM_PAGE_SIZE,
            max_pages: max_pages.max(1),
            builtin_cache: [0; BUILTIN_CACHE_SLOTS],
        };
        heap.init_free();
        heap
    }

    fn init_free(&mut self) {
        for i in 0..HEAP_CLASSES.len() {
            let start = Self::sentinel_start(i);
            let end = Self::sentinel_end(i);
            self.store_u32(start + OFF_SIZE, 0);
            self.store_u32(start + OFF_PREV, 0);
            self.store_u32(start + OFF_NEXT, end);
            self.store_u32(end + OFF_SIZE, 0);
            self.store_u32(end + OFF_PREV, start);
            self.store_u32(end + OFF_NEXT, 0);
        }
        self.builtin_cache = [0; BUILTIN_CACHE_SLOTS];
    }

    fn sentinel_start(class: usize) -> Addr {
        SENTINEL_BASE + class as u32 * SENTINEL_SPAN
    }

    fn sentinel_end(class: usize) -> Addr {
        Self::sentinel_start(class) + HEAP_BLOCK_HEADER_SIZE
    }

    // ── Raw arena access ─────────────────────────────────────────────────

    pub fn load_u8(&self, addr: Addr) -> u8 {
        self.mem[addr as usize]
    }

    pub fn store_u8(&mut self, addr: Addr, v: u8) {
        self.mem[addr as usize] = v;
    }

    pub fn load_u16(&self, addr: Addr) -> u16 {
        let a = addr as usize;
        u16::from_le_bytes(self.mem[a..a + 2].try_into().unwrap())
    }

    pub fn load_u32(&self, addr: Addr) -> u32 {
        let a = addr as usize;
        u32::from_le_bytes(self.mem[a..a + 4].try_into().unwrap())
    }

    pub fn store_u32(&mut self, addr: Addr, v: u32) {
        let a = addr as usize;
        self.mem[a..a + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn load_u64(&self, addr: Addr) -> u64 {
        let a = addr as usize;
        u64::from_le_bytes(self.mem[a..a + 8].try_into().unwrap())
    }

    pub fn store_u64(&mut self, addr: Addr, v: u64) {
        let a = addr as usize;
        self.mem[a..a + 8].copy_from_slice(&v.to_le_bytes());
    }

    pub fn load_i64(&self, addr: Addr) -> i64 {
        self.load_u64(addr) as i64
    }

    pub fn store_i64(&mut self, addr: Addr, v: i64) {
        self.store_u64(addr, v as u64);
    }

    /// Immutable view of `len` bytes at `addr`.
    pub fn bytes(&self, addr: Addr, len: u32) -> &[u8] {
        &self.mem[addr as usize..(addr + len) as usize]
    }

    /// Mutable view of `len` bytes at `addr`.
    pub fn bytes_mut(&mut self, addr: Addr, len: u32) -> &mut [u8] {
        &mut self.mem[addr as usize..(addr + len) as usize]
    }

    /// Arena-to-arena copy.  Handles overlapping ranges.
    pub fn copy(&mut self, dst: Addr, src: Addr, len: u32) {
        if len == 0 {
            return;
        }
        self.mem
            .copy_within(src as usize..(src + len) as usize, dst as usize);
    }

    /// Copies a host slice into the arena.
    pub fn write(&mut self, dst: Addr, bytes: &[u8]) {
        let a = dst as usize;
        self.mem[a..a + bytes.len()].copy_from_slice(bytes);
    }

    pub fn fill(&mut self, addr: Addr, val: u8, len: u32) {
        if len == 0 {
            return;
        }
        self.mem[addr as usize..(addr + len) as usize].fill(val);
    }

    // ── Allocation ───────────────────────────────────────────────────────

    fn class_for(size: u32) -> usize {
        for (i, (_, class_size)) in HEAP_CLASSES[..HEAP_CLASSES.len() - 1].iter().enumerate() {
            if size <= *class_size {
                return i;
            }
        }
        HEAP_CLASSES.len() - 1
    }

    fn block_size(&self, block: Addr) -> u32 {
        self.load_u32(block + OFF_SIZE)
    }

    fn block_data(block: Addr) -> Addr {
        block + HEAP_BLOCK_HEADER_SIZE
    }

    fn unlink(&mut self, block: Addr) {
        let prev = self.load_u32(block + OFF_PREV);
        let next = self.load_u32(block + OFF_NEXT);
        self.store_u32(prev + OFF_NEXT, next);
        self.store_u32(next + OFF_PREV, prev);
        self.store_u32(block + OFF_PREV, 0);
        self.store_u32(block + OFF_NEXT, 0);
    }

    fn reuse_fixed(&mut self, class: usize) -> Addr {
        let start = Self::sentinel_start(class);
        let end = Self::sentinel_end(class);
        let b = self.load_u32(start + OFF_NEXT);
        if b != 0 && b != end {
            self.unlink(b);
            self.heap_check(class);
            return b;
        }
        0
    }

    fn reuse_varying(&mut self, class: usize, size: u32) -> Addr {
        let start = Self::sentinel_start(class);
        let end = Self::sentinel_end(class);
        let min_size = HEAP_CLASSES[class].1;

        let mut b = self.load_u32(start + OFF_NEXT);
        while b != end {
            let bsize = self.block_size(b);
            if bsize >= HEAP_BLOCK_HEADER_SIZE + min_size + size {
                // Split: the remainder becomes a free block in place.
                let remaining = Self::block_data(b) + size;
                let prev = self.load_u32(b + OFF_PREV);
                let next = self.load_u32(b + OFF_NEXT);
                self.store_u32(remaining + OFF_SIZE, bsize - (HEAP_BLOCK_HEADER_SIZE + size));
                self.store_u32(remaining + OFF_PREV, prev);
                self.store_u32(remaining + OFF_NEXT, next);
                self.store_u32(prev + OFF_NEXT, remaining);
                self.store_u32(next + OFF_PREV, remaining);

                self.store_u32(b + OFF_SIZE, size);
                self.store_u32(b + OFF_PREV, 0);
                self.store_u32(b + OFF_NEXT, 0);
                self.heap_check(class);
                return b;
            } else if bsize >= size {
                self.unlink(b);
                self.heap_check(class);
                return b;
            }
            b = self.load_u32(b + OFF_NEXT);
        }
        0
    }

    fn new_allocation(&mut self, size: u32) -> Option<Addr> {
        let ptr = self.heap_ptr;
        let block_size = HEAP_BLOCK_HEADER_SIZE + size;
        self.heap_ptr += block_size;

        if self.heap_ptr >= self.heap_top {
            let pages = (self.heap_ptr - self.heap_top) / WASM_PAGE_SIZE + 1;
            let total = self.heap_top / WASM_PAGE_SIZE + pages;
            if total > self.max_pages {
                self.heap_ptr = ptr;
                return None;
            }
            debug!("heap: growing by {pages} page(s) to {total}");
            self.heap_top += pages * WASM_PAGE_SIZE;
            self.mem.resize(self.heap_top as usize, 0);
        }

        self.store_u32(ptr + OFF_SIZE, size);
        self.store_u32(ptr + OFF_PREV, 0);
        self.store_u32(ptr + OFF_NEXT, 0);
        Some(Self::block_data(ptr))
    }

    /// Allocates `size` bytes, reusing a free block when one fits.
    /// Returns `None` only when the arena page budget is exhausted.
    pub fn alloc(&mut self, size: u32) -> Option<Addr> {
        let class = Self::class_for(size);
        self.heap_check(class);

        let b = if HEAP_CLASSES[class].0 {
            self.reuse_fixed(class)
        } else {
            self.reuse_varying(class, size)
        };
        if b != 0 {
            return Some(Self::block_data(b));
        }

        let size = if HEAP_CLASSES[class].0 {
            HEAP_CLASSES[class].1
        } else {
            size
        };
        self.new_allocation(size)
    }

    /// Returns a block to its free list, coalescing on the varying list and
    /// giving back any tail run that ends at the heap pointer.
    pub fn free(&mut self, ptr: Addr) {
        let block = ptr - HEAP_BLOCK_HEADER_SIZE;
        let size = self.block_size(block);
        let class = Self::class_for(size);
        let start = Self::sentinel_start(class);
        let end = Self::sentinel_end(class);
        let fixed = HEAP_CLASSES[class].0;
        self.heap_check(class);

        // Find the free block just before this one in address order.
        let mut prev = start;
        let mut b = self.load_u32(prev + OFF_NEXT);
        while b < block && b != end {
            prev = b;
            b = self.load_u32(b + OFF_NEXT);
        }

        if !fixed {
            let prev_size = self.block_size(prev);
            let prev_end = Self::block_data(prev) + prev_size;
            let block_end = Self::block_data(block) + size;
            let next = self.load_u32(prev + OFF_NEXT);

            if prev_end == block {
                self.store_u32(prev + OFF_SIZE, prev_size + HEAP_BLOCK_HEADER_SIZE + size);
                self.compact_free(class);
                return;
            }
            if block_end == next {
                let next_next = self.load_u32(next + OFF_NEXT);
                let next_size = self.block_size(next);
                self.store_u32(block + OFF_PREV, prev);
                self.store_u32(block + OFF_NEXT, next_next);
                self.store_u32(block + OFF_SIZE, size + HEAP_BLOCK_HEADER_SIZE + next_size);
                self.store_u32(prev + OFF_NEXT, block);
                self.store_u32(next_next + OFF_PREV, block);
                self.compact_free(class);
                return;
            }
        }

        let next = self.load_u32(prev + OFF_NEXT);
        self.store_u32(block + OFF_PREV, prev);
        self.store_u32(block + OFF_NEXT, next);
        self.store_u32(prev + OFF_NEXT, block);
        self.store_u32(next + OFF_PREV, block);
        self.compact_free(class);
    }

    /// Grows or shrinks an allocation; the contents are copied up to the
    /// smaller of the two sizes.
    pub fn realloc(&mut self, ptr: Addr, size: u32) -> Option<Addr> {
        let old_size = self.block_size(ptr - HEAP_BLOCK_HEADER_SIZE);
        let p = self.alloc(size)?;
        self.copy(p, ptr, old_size.min(size));
        self.free(ptr);
        Some(p)
    }

    // Drops trailing free blocks that end exactly at the heap pointer.
    fn compact_free(&mut self, class: usize) -> bool {
        let start = Self::sentinel_start(class);
        let end = Self::sentinel_end(class);
        let old_heap_ptr = self.heap_ptr;

        loop {
            let last = self.load_u32(end + OFF_PREV);
            if last == start {
                break;
            }
            if Self::block_data(last) + self.block_size(last) != self.heap_ptr {
                break;
            }
            self.heap_ptr -= HEAP_BLOCK_HEADER_SIZE + self.block_size(last);
            let last_prev = self.load_u32(last + OFF_PREV);
            self.store_u32(last_prev + OFF_NEXT, end);
            self.store_u32(end + OFF_PREV, last_prev);
        }

        self.heap_check(class);
        old_heap_ptr != self.heap_ptr
    }

    /// Compacts every free list until no further progress is made.
    /// Test entry point.
    pub fn heap_compact(&mut self) {
        let mut progress = true;
        while progress {
            progress = false;
            for i in 0..HEAP_CLASSES.len() {
                progress |= self.compact_free(i);
            }
        }
    }

    /// Counts free blocks across all lists, verifying that forward and
    /// backward traversals agree.  Test entry point.
    pub fn heap_free_blocks(&self) -> usize {
        let mut blocks1 = 0usize;
        let mut blocks2 = 0usize;
        for i in 0..HEAP_CLASSES.len() {
            let start = Self::sentinel_start(i);
            let end = Self::sentinel_end(i);
            let mut b = self.load_u32(start + OFF_NEXT);
            while b != end {
                blocks1 += 1;
                b = self.load_u32(b + OFF_NEXT);
            }
            let mut b = self.load_u32(end + OFF_PREV);
            while b != start {
                blocks2 += 1;
                b = self.load_u32(b + OFF_PREV);
            }
        }
        assert_eq!(blocks1, blocks2, "__malloc: corrupted heap");
        blocks1
    }

    /// Current bump pointer.
    pub fn heap_ptr_get(&self) -> Addr {
        self.heap_ptr
    }

    /// Current top of the grown arena.
    pub fn heap_top_get(&self) -> Addr {
        self.heap_top
    }

    pub(crate) fn builtin_cache_get(&self, i: usize) -> Option<Addr> {
        self.builtin_cache.get(i).copied()
    }

    pub(crate) fn builtin_cache_set(&mut self, i: usize, p: Addr) -> bool {
        match self.builtin_cache.get_mut(i) {
            Some(slot) => {
                *slot = p;
                true
            }
            None => false,
        }
    }

    // Verifies the doubly-linked invariant of one list after a mutation.
    #[cfg(debug_assertions)]
    fn heap_check(&self, class: usize) {
        let start = Self::sentinel_start(class);
        let end = Self::sentinel_end(class);
        let mut prev = start;
        let mut b = self.load_u32(start + OFF_NEXT);
        while b != end {
            assert_eq!(self.load_u32(b + OFF_PREV), prev, "heap list corrupted");
            prev = b;
            b = self.load_u32(b + OFF_NEXT);
        }
        assert_eq!(self.load_u32(end + OFF_PREV), prev, "heap list corrupted");
    }

    #[cfg(not(debug_assertions))]
    fn heap_check(&self, _class: usize) {}
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
