//! SharedFont - a wrapper that allows sharing a Font between components
//!
//! The wrapper holds an `Arc<Mutex<Font>>` so that all mutating entry points
//! on one font instance are serialized, e.g. a loader thread populating a
//! font while an edit thread reads it. Event fan-out happens synchronously
//! inside the locked region; a subscriber that re-enters a mutating call on
//! the same font is on its own.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::{Font, FontSnapshot, Size};

pub struct SharedFont {
    inner: Arc<Mutex<Font>>,
}

impl SharedFont {
    pub fn new(font: Font) -> Self {
        Self {
            inner: Arc::new(Mutex::new(font)),
        }
    }

    /// Wrap an existing Arc for sharing with other components
    pub fn from_arc(inner: Arc<Mutex<Font>>) -> Self {
        Self { inner }
    }

    /// Get access to the inner Arc for sharing with other components
    pub fn inner(&self) -> Arc<Mutex<Font>> {
        self.inner.clone()
    }

    /// Lock the font for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, Font> {
        self.inner.lock()
    }

    /// Run a closure under the font's lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut Font) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn size(&self) -> Size {
        let font = self.inner.lock();
        Size::new(font.width(), font.height())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> FontSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Clone for SharedFont {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}
