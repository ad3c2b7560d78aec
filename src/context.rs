//! Source-location context threaded through every operation that can abort.

/// `(file, line, col)` triple carried into anything that can abort, so abort
/// messages report where in the contract source the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeContext {
    pub file_name: &'static str,
    pub line: u32,
    pub col: u32,
}

impl RuntimeContext {
    /// Context used when the call site carries no location information.
    pub const UNKNOWN: RuntimeContext = RuntimeContext {
        file_name: "",
        line: 0,
        col: 0,
    };

    pub const fn new(file_name: &'static str, line: u32, col: u32) -> Self {
        RuntimeContext {
            file_name,
            line,
            col,
        }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::UNKNOWN
    }
}
