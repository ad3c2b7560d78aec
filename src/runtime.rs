//! The runtime value: arena, descriptor table, host, coverage counters.
//!
//! One [`Runtime`] owns everything a single contract invocation touches.
//! Container, codec and builtin operations are implemented as methods on it
//! in their own modules; this module holds the shared plumbing — allocation
//! wrappers, the abort paths, the descriptor-table bootstrap and the
//! recursion guard used by the schema-driven codecs.

use crate::context::RuntimeContext;
use crate::heap::{Addr, Heap};
use crate::host::{HostApi, MockHost};
use crate::types::TypeTable;

/// Cap on schema recursion (nested structs/arrays/maps).  Deep enough for
/// anything the compiler emits, shallow enough to never blow the stack.
pub const MAX_RECURSION_DEPTH: u32 = 64;

/// One contract invocation's runtime state.
pub struct Runtime {
    pub(crate) heap: Heap,
    pub(crate) classes: Option<TypeTable>,
    pub(crate) host: Box<dyn HostApi>,
    pub(crate) counters: Addr,
    depth: u32,
}

impl Runtime {
    pub fn new(host: Box<dyn HostApi>) -> Self {
        Runtime {
            heap: Heap::new(),
            classes: None,
            host,
            counters: 0,
            depth: 0,
        }
    }

    /// Runtime backed by the recording [`MockHost`].
    pub fn with_mock_host() -> Self {
        Self::new(Box::new(MockHost::new()))
    }

    /// Direct access to the arena.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn host(&self) -> &dyn HostApi {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn HostApi {
        self.host.as_mut()
    }

    /// The recording mock, when this runtime was built with one.
    pub fn mock_host(&self) -> Option<&MockHost> {
        self.host.as_any().downcast_ref::<MockHost>()
    }

    pub fn mock_host_mut(&mut self) -> Option<&mut MockHost> {
        self.host.as_any_mut().downcast_mut::<MockHost>()
    }

    // ── Bootstrap ────────────────────────────────────────────────────────

    /// Installs the descriptor-table blob.  Called once by the bootstrap
    /// entry point before any user code runs; all descriptor offsets are
    /// byte offsets into this blob.
    pub fn ir_builtin_set_all_runtimes_classes_address(&mut self, blob: Vec<u8>) {
        log::debug!("type table installed ({} bytes)", blob.len());
        self.classes = Some(TypeTable::new(blob));
    }

    /// Reads one descriptor out of the installed table.
    pub(crate) fn class(&mut self, runtime_class_offset: u32) -> crate::types::RuntimeClass {
        match self.classes {
            Some(ref table) => table.class(runtime_class_offset),
            None => self.abort_str("ir runtime type table not set"),
        }
    }

    pub(crate) fn class_field_offsets(&mut self, class: &crate::types::RuntimeClass) -> Vec<u32> {
        match self.classes {
            Some(ref table) => table.u32_array(class.struct_fields, class.struct_fields_count),
            None => self.abort_str("ir runtime type table not set"),
        }
    }

    pub(crate) fn class_field_name_offsets(
        &mut self,
        class: &crate::types::RuntimeClass,
    ) -> Vec<u32> {
        match self.classes {
            Some(ref table) => {
                table.u32_array(class.struct_field_names, class.struct_fields_count)
            }
            None => self.abort_str("ir runtime type table not set"),
        }
    }

    pub(crate) fn class_name_bytes(&mut self, name_offset: u32) -> Vec<u8> {
        match self.classes {
            Some(ref table) => table.name_bytes(name_offset),
            None => self.abort_str("ir runtime type table not set"),
        }
    }

    // ── Allocation ───────────────────────────────────────────────────────

    /// `alloc` that aborts the invocation when the heap cannot grow.
    pub(crate) fn malloc(&mut self, size: u32) -> Addr {
        match self.heap.alloc(size) {
            Some(addr) => addr,
            None => self.abort_str("__malloc: failed"),
        }
    }

    pub(crate) fn mrealloc(&mut self, ptr: Addr, size: u32) -> Addr {
        match self.heap.realloc(ptr, size) {
            Some(addr) => addr,
            None => self.abort_str("__malloc: failed"),
        }
    }

    pub(crate) fn mfree(&mut self, ptr: Addr) {
        self.heap.free(ptr);
    }

    /// Builtin cache slot accessors; an out-of-range index aborts.
    pub fn builtin_cache_get(&mut self, i: usize) -> Addr {
        match self.heap.builtin_cache_get(i) {
            Some(p) => p,
            None => self.abort_str("__malloc: illegal builtin cache index"),
        }
    }

    pub fn builtin_cache_set(&mut self, i: usize, p: Addr) {
        if !self.heap.builtin_cache_set(i, p) {
            self.abort_str("__malloc: illegal builtin cache index");
        }
    }

    // ── Abort paths ──────────────────────────────────────────────────────

    /// Host abort with a bare message.
    pub(crate) fn abort_str(&mut self, msg: &str) -> ! {
        self.host.abort(msg.as_bytes())
    }

    /// Abort carrying the source location: `"{msg}, {file}:{line}:{col}"`.
    pub fn runtime_abort(&mut self, msg: &str, ctx: &RuntimeContext) -> ! {
        let full = format!("{}, {}:{}:{}", msg, ctx.file_name, ctx.line, ctx.col);
        self.host.abort(full.as_bytes())
    }

    // ── Recursion guard ──────────────────────────────────────────────────

    pub(crate) fn enter_recursion(&mut self) {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.abort_str("recursion depth limit exceeded");
        }
    }

    pub(crate) fn leave_recursion(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "__malloc: failed")]
    fn exhausted_heap_aborts() {
        let mut rt = Runtime {
            heap: Heap::with_max_pages(1),
            classes: None,
            host: Box::new(MockHost::new()),
            counters: 0,
            depth: 0,
        };
        rt.malloc(10 * crate::heap::WASM_PAGE_SIZE);
    }

    #[test]
    #[should_panic(expected = "boom, lib.ir:3:9")]
    fn runtime_abort_formats_location() {
        let mut rt = Runtime::with_mock_host();
        let ctx = RuntimeContext::new("lib.ir", 3, 9);
        rt.runtime_abort("boom", &ctx);
    }
}
