// Allocator invariants under sustained traffic: address reuse, the
// doubly-linked free-list invariant, and full compaction.

use sir_runtime::Heap;

#[test]
fn freed_address_is_reused_for_same_size() {
    let mut h = Heap::new();
    let _low = h.alloc(64).unwrap();
    let target = h.alloc(64).unwrap();
    let _high = h.alloc(64).unwrap();
    h.free(target);
    assert_eq!(h.alloc(64).unwrap(), target);
}

#[test]
fn invariant_holds_after_many_alloc_free_pairs() {
    let mut h = Heap::new();
    // Deterministic pseudo-random size sequence across all size classes.
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut live: Vec<(u32, u32)> = Vec::new();

    for round in 0..500 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let size = 1 + (state >> 33) as u32 % 300;
        let addr = h.alloc(size).unwrap();
        live.push((addr, size));

        if round % 3 == 0 {
            let idx = (state as usize) % live.len();
            let (victim, _) = live.swap_remove(idx);
            h.free(victim);
        }
        let _ = h.heap_free_blocks();
    }

    for (addr, _) in live {
        h.free(addr);
    }
    let _ = h.heap_free_blocks();

    h.heap_compact();
    let _ = h.heap_free_blocks();
}

#[test]
fn compaction_returns_tail_to_the_heap() {
    let mut h = Heap::new();
    let base = h.heap_ptr_get();
    let mut blocks = Vec::new();
    for _ in 0..10 {
        blocks.push(h.alloc(256).unwrap());
    }
    for addr in blocks.into_iter().rev() {
        h.free(addr);
    }
    assert_eq!(h.heap_ptr_get(), base);
    assert_eq!(h.heap_free_blocks(), 0);
}

#[test]
fn realloc_preserves_contents_across_growth() {
    let mut h = Heap::new();
    let mut addr = h.alloc(16).unwrap();
    h.write(addr, &[0xabu8; 16]);
    for new_size in [32u32, 150, 4000] {
        addr = h.realloc(addr, new_size).unwrap();
        assert_eq!(h.bytes(addr, 16), &[0xabu8; 16]);
    }
}
