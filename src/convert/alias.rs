//! Table alias allocation.

use tracing::trace;

/// Allocates `t0, t1, …` in order. Aliases are never reused within one
/// conversion, sub-queries included.
#[derive(Debug, Default)]
pub(crate) struct AliasGenerator {
    next: u32,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.next);
        self.next += 1;
        trace!(alias = %alias, "allocated table alias");
        alias
    }

    /// Number of aliases handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
