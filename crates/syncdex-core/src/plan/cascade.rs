use crate::MAX_CASCADE_DEPTH;

///
/// DepthGuard
///
/// Explicit remaining-depth counter threaded through cascade recursion.
///
/// Exhaustion is a legitimate traversal boundary, not an error: deep or
/// cyclic contained-in graphs are expected, and the walk simply stops along
/// that path. The per-type work tables act as the visited-set; the guard
/// bounds paths that keep discovering fresh keys.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DepthGuard {
    remaining: u32,
}

impl DepthGuard {
    #[must_use]
    pub const fn new(depth: u32) -> Self {
        Self { remaining: depth }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// One hop down, or `None` once the budget is spent.
    #[must_use]
    pub const fn descend(&self) -> Option<Self> {
        match self.remaining.checked_sub(1) {
            Some(remaining) => Some(Self { remaining }),
            None => None,
        }
    }
}

impl Default for DepthGuard {
    fn default() -> Self {
        Self::new(MAX_CASCADE_DEPTH)
    }
}
