//! Chaining hash table keyed by integers or byte strings.
//!
//! Arena layout: `{ num, range, key_runtime_ty, slots }`, where `slots`
//! addresses `range` chain heads.  Each entry is
//! `{ hash, key: i64, data, size, has_value, next }` and owns a malloc'd
//! copy of its value bytes.  String keys are stored as the address of the
//! caller's NUL-terminated bytes and hashed with MurmurHash3-32; integer
//! keys compare by value and hash to themselves.  `has_value`
//! disambiguates "integer key zero is present" from an uninitialized
//! iteration cursor.
//!
//! New entries are prepended, so each chain enumerates newest-first.

use crate::heap::Addr;
use crate::runtime::Runtime;
use crate::types::IrType;

/// Arena size of the table header.
pub const QHASHTBL_SIZE: u32 = 16;

/// Chain-entry arena size.
pub const QHASHTBL_OBJ_SIZE: u32 = 28;

/// Slot count used when the caller passes zero.
pub const DEFAULT_INDEX_RANGE: u32 = 100;

const OFF_NUM: u32 = 0;
const OFF_RANGE: u32 = 4;
const OFF_KEY_TY: u32 = 8;
const OFF_SLOTS: u32 = 12;

const ENT_HASH: u32 = 0;
const ENT_KEY: u32 = 4;
const ENT_DATA: u32 = 12;
const ENT_SIZE: u32 = 16;
const ENT_HAS_VALUE: u32 = 20;
const ENT_NEXT: u32 = 24;

/// Caller-owned iteration cursor; the zero value starts from slot 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashtblCursor {
    pub hash: u32,
    pub key: i64,
    /// Address of the entry's value bytes (or of a malloc'd copy when
    /// iterating with `newmem`).
    pub data: Addr,
    pub size: u32,
    pub has_value: bool,
    pub next: Addr,
}

/// MurmurHash3 x86 32-bit.  Used for string keys only; never on the wire.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, b) in tail.iter().enumerate() {
            k |= (*b as u32) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

impl Runtime {
    /// Creates a table with `range` chain slots (0 ⇒ the default 100) keyed
    /// by the given runtime type.  Options are accepted and ignored.
    pub fn qhashtbl(&mut self, range: u32, key_runtime_ty: u32, _options: u32) -> Addr {
        let range = if range == 0 { DEFAULT_INDEX_RANGE } else { range };
        let tbl = self.malloc(QHASHTBL_SIZE);
        let slots = self.malloc(range * 4);
        self.heap.fill(slots, 0, range * 4);
        self.heap.store_u32(tbl + OFF_NUM, 0);
        self.heap.store_u32(tbl + OFF_RANGE, range);
        self.heap.store_u32(tbl + OFF_KEY_TY, key_runtime_ty);
        self.heap.store_u32(tbl + OFF_SLOTS, slots);
        tbl
    }

    pub fn qhashtbl_size(&self, tbl: Addr) -> u32 {
        self.heap.load_u32(tbl + OFF_NUM)
    }

    pub(crate) fn qhashtbl_range(&self, tbl: Addr) -> u32 {
        self.heap.load_u32(tbl + OFF_RANGE)
    }

    pub fn qhashtbl_key_runtime_ty(&self, tbl: Addr) -> u32 {
        self.heap.load_u32(tbl + OFF_KEY_TY)
    }

    /// True when the key type is an integer discriminator (`U8..I128`,
    /// `U256`, `I256`).  String-keyed tables are everything else.
    pub fn qhashtbl_key_is_int(&self, tbl: Addr) -> bool {
        match IrType::from_u32(self.qhashtbl_key_runtime_ty(tbl)) {
            Some(ty) => ty.is_integer(),
            None => true,
        }
    }

    fn slot_head(&self, tbl: Addr, idx: u32) -> Addr {
        let slots = self.heap.load_u32(tbl + OFF_SLOTS);
        self.heap.load_u32(slots + idx * 4)
    }

    fn set_slot_head(&mut self, tbl: Addr, idx: u32, head: Addr) {
        let slots = self.heap.load_u32(tbl + OFF_SLOTS);
        self.heap.store_u32(slots + idx * 4, head);
    }

    /// Length of the NUL-terminated byte string at `addr`.
    pub(crate) fn cstr_len(&self, addr: Addr) -> u32 {
        let mut n = 0;
        while self.heap.load_u8(addr + n) != 0 {
            n += 1;
        }
        n
    }

    fn cstr_eq(&self, left: Addr, right: Addr) -> bool {
        let left_len = self.cstr_len(left);
        let right_len = self.cstr_len(right);
        left_len == right_len && self.heap.bytes(left, left_len) == self.heap.bytes(right, right_len)
    }

    /// Hash of a key in this table: the value itself for integer keys,
    /// MurmurHash3-32 of the bytes for string keys.
    pub fn qhashtbl_hash(&self, tbl: Addr, key: i64) -> u32 {
        if self.qhashtbl_key_is_int(tbl) {
            key as u32
        } else {
            let addr = key as u32;
            let len = self.cstr_len(addr);
            murmur3_32(self.heap.bytes(addr, len), 0)
        }
    }

    fn is_same_key(&self, tbl: Addr, entry_key: i64, key: i64, entry_hash: u32, hash: u32) -> bool {
        if self.qhashtbl_key_is_int(tbl) {
            entry_key == key
        } else {
            entry_hash == hash && self.cstr_eq(entry_key as u32, key as u32)
        }
    }

    fn find_entry(&self, tbl: Addr, key: i64, hash: u32) -> Addr {
        let idx = hash % self.qhashtbl_range(tbl);
        let mut obj = self.slot_head(tbl, idx);
        while obj != 0 {
            let entry_key = self.heap.load_i64(obj + ENT_KEY);
            let entry_hash = self.heap.load_u32(obj + ENT_HASH);
            if self.is_same_key(tbl, entry_key, key, entry_hash, hash) {
                return obj;
            }
            obj = self.heap.load_u32(obj + ENT_NEXT);
        }
        0
    }

    /// Stores a copy of `data` under `key`, replacing any existing value.
    pub fn qhashtbl_put_slice(&mut self, tbl: Addr, key: i64, data: &[u8]) -> bool {
        if !self.qhashtbl_key_is_int(tbl) && key == 0 {
            return false;
        }
        let hash = self.qhashtbl_hash(tbl, key);
        let obj = self.find_entry(tbl, key, hash);

        let dupdata = self.malloc(data.len() as u32);
        self.heap.write(dupdata, data);

        let obj = if obj == 0 {
            let obj = self.malloc(QHASHTBL_OBJ_SIZE);
            let idx = hash % self.qhashtbl_range(tbl);
            let head = self.slot_head(tbl, idx);
            self.heap.store_u32(obj + ENT_NEXT, head);
            self.set_slot_head(tbl, idx, obj);
            let num = self.qhashtbl_size(tbl);
            self.heap.store_u32(tbl + OFF_NUM, num + 1);
            obj
        } else {
            let old = self.heap.load_u32(obj + ENT_DATA);
            self.mfree(old);
            obj
        };

        self.heap.store_u32(obj + ENT_HASH, hash);
        self.heap.store_i64(obj + ENT_KEY, key);
        self.heap.store_u32(obj + ENT_DATA, dupdata);
        self.heap.store_u32(obj + ENT_SIZE, data.len() as u32);
        self.heap.store_u32(obj + ENT_HAS_VALUE, 1);
        true
    }

    /// Arena-sourced [`Self::qhashtbl_put_slice`].
    pub fn qhashtbl_put(&mut self, tbl: Addr, key: i64, data: Addr, size: u32) -> bool {
        if data == 0 {
            return false;
        }
        let bytes = self.heap.bytes(data, size).to_vec();
        self.qhashtbl_put_slice(tbl, key, &bytes)
    }

    /// Stores a NUL-terminated string value (the NUL is part of the copy).
    pub fn qhashtbl_putstr(&mut self, tbl: Addr, key: i64, s: Addr) -> bool {
        if s == 0 {
            return false;
        }
        let len = self.cstr_len(s);
        self.qhashtbl_put(tbl, key, s, len + 1)
    }

    /// Looks up `key`; returns the value address and size.  With `newmem`
    /// the address is a malloc'd copy the caller owns.
    pub fn qhashtbl_get(&mut self, tbl: Addr, key: i64, newmem: bool) -> Option<(Addr, u32)> {
        if !self.qhashtbl_key_is_int(tbl) && key == 0 {
            return None;
        }
        let hash = self.qhashtbl_hash(tbl, key);
        let obj = self.find_entry(tbl, key, hash);
        if obj == 0 {
            return None;
        }
        let data = self.heap.load_u32(obj + ENT_DATA);
        let size = self.heap.load_u32(obj + ENT_SIZE);
        if newmem {
            let copy = self.malloc(size);
            self.heap.copy(copy, data, size);
            Some((copy, size))
        } else {
            Some((data, size))
        }
    }

    pub fn qhashtbl_getstr(&mut self, tbl: Addr, key: i64, newmem: bool) -> Option<Addr> {
        self.qhashtbl_get(tbl, key, newmem).map(|(data, _)| data)
    }

    pub fn qhashtbl_contains_key(&mut self, tbl: Addr, key: i64) -> bool {
        if !self.qhashtbl_key_is_int(tbl) && key == 0 {
            return false;
        }
        let hash = self.qhashtbl_hash(tbl, key);
        self.find_entry(tbl, key, hash) != 0
    }

    /// Unlinks and frees the entry under `key`.
    pub fn qhashtbl_remove(&mut self, tbl: Addr, key: i64) -> bool {
        if !self.qhashtbl_key_is_int(tbl) && key == 0 {
            return false;
        }
        let hash = self.qhashtbl_hash(tbl, key);
        let idx = hash % self.qhashtbl_range(tbl);

        let mut prev = 0;
        let mut obj = self.slot_head(tbl, idx);
        while obj != 0 {
            let entry_key = self.heap.load_i64(obj + ENT_KEY);
            let entry_hash = self.heap.load_u32(obj + ENT_HASH);
            if self.is_same_key(tbl, entry_key, key, entry_hash, hash) {
                let next = self.heap.load_u32(obj + ENT_NEXT);
                if prev == 0 {
                    self.set_slot_head(tbl, idx, next);
                } else {
                    self.heap.store_u32(prev + ENT_NEXT, next);
                }
                let data = self.heap.load_u32(obj + ENT_DATA);
                self.mfree(data);
                self.mfree(obj);
                let num = self.qhashtbl_size(tbl);
                self.heap.store_u32(tbl + OFF_NUM, num - 1);
                return true;
            }
            prev = obj;
            obj = self.heap.load_u32(obj + ENT_NEXT);
        }
        false
    }

    /// Advances the cursor to the next entry.  A zeroed cursor starts the
    /// scan; traversal walks slot 0..range, each chain newest-first.
    /// Entries inserted mid-scan may or may not be observed; use `newmem`
    /// when deletion during the scan is expected.
    pub fn qhashtbl_getnext(&mut self, tbl: Addr, cursor: &mut HashtblCursor, newmem: bool) -> bool {
        let range = self.qhashtbl_range(tbl);
        let prev_slot_index = cursor.hash % range;

        let mut slot_index = 0;
        let mut cur = 0;
        if cursor.has_value {
            slot_index = prev_slot_index + 1;
            cur = cursor.next;
        }

        if cur == 0 {
            while slot_index < range {
                let head = self.slot_head(tbl, slot_index);
                if head != 0 {
                    cur = head;
                    break;
                }
                slot_index += 1;
            }
        }

        if cur == 0 {
            return false;
        }

        cursor.key = self.heap.load_i64(cur + ENT_KEY);
        cursor.size = self.heap.load_u32(cur + ENT_SIZE);
        cursor.has_value = self.heap.load_u32(cur + ENT_HAS_VALUE) != 0;
        cursor.hash = self.heap.load_u32(cur + ENT_HASH);
        cursor.next = self.heap.load_u32(cur + ENT_NEXT);
        let data = self.heap.load_u32(cur + ENT_DATA);
        if newmem {
            let copy = self.malloc(cursor.size);
            self.heap.copy(copy, data, cursor.size);
            cursor.data = copy;
        } else {
            cursor.data = data;
        }
        true
    }

    /// Removes every entry.
    pub fn qhashtbl_clear(&mut self, tbl: Addr) {
        let range = self.qhashtbl_range(tbl);
        for idx in 0..range {
            if self.qhashtbl_size(tbl) == 0 {
                break;
            }
            let mut obj = self.slot_head(tbl, idx);
            self.set_slot_head(tbl, idx, 0);
            while obj != 0 {
                let next = self.heap.load_u32(obj + ENT_NEXT);
                let data = self.heap.load_u32(obj + ENT_DATA);
                self.mfree(data);
                self.mfree(obj);
                obj = next;
                let num = self.qhashtbl_size(tbl);
                self.heap.store_u32(tbl + OFF_NUM, num - 1);
            }
        }
    }

    pub fn qhashtbl_free(&mut self, tbl: Addr) {
        self.qhashtbl_clear(tbl);
        let slots = self.heap.load_u32(tbl + OFF_SLOTS);
        self.mfree(slots);
        self.mfree(tbl);
    }
}
