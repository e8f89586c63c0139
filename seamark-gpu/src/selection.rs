/*!
# Selected-Identifier Register

A single shared `i32` holding the numeric identifier of the feature under
the pointer, or [`NO_SELECTION`]. The pointer-move handler is the only
writer; the uniform provider reads it when building the visible pass.

Both sides run on the render thread, so no lock is involved. The handle is
an atomic only so that ownership stays explicit and the register can be
injected into the event handler and the uniform rule independently.
*/

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Sentinel meaning "no feature selected".
pub const NO_SELECTION: i32 = -1;

/// Cloneable handle to the shared selection register.
#[derive(Debug, Clone)]
pub struct SelectionRegister {
    inner: Arc<AtomicI32>,
}

impl SelectionRegister {
    /// A fresh register starts with nothing selected.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicI32::new(NO_SELECTION)),
        }
    }

    pub fn get(&self) -> i32 {
        self.inner.load(Ordering::Relaxed)
    }

    pub fn set(&self, id: i32) {
        self.inner.store(id, Ordering::Relaxed);
    }

    /// Reset to [`NO_SELECTION`]; every pointer-move evaluation starts here
    /// before re-probing.
    pub fn clear(&self) {
        self.set(NO_SELECTION);
    }

    pub fn has_selection(&self) -> bool {
        self.get() != NO_SELECTION
    }
}

impl Default for SelectionRegister {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let reg = SelectionRegister::new();
        assert_eq!(reg.get(), NO_SELECTION);
        assert!(!reg.has_selection());
    }

    #[test]
    fn test_set_and_clear() {
        let reg = SelectionRegister::new();
        reg.set(12345);
        assert_eq!(reg.get(), 12345);
        assert!(reg.has_selection());

        reg.clear();
        assert_eq!(reg.get(), NO_SELECTION);
    }

    #[test]
    fn test_handles_share_state() {
        let reg = SelectionRegister::new();
        let other = reg.clone();
        reg.set(7);
        assert_eq!(other.get(), 7);
    }
}
