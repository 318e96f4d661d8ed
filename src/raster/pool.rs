use std::cell::RefCell;

use crate::raster::engine::RasterScratch;

/// Recycling pool for [`RasterScratch`] working contexts.
///
/// Scratch buffers are expensive to grow, so every render call checks one
/// out and the RAII guard puts it back on every exit path, normal or
/// failing. Thread-confined; no internal locking.
pub struct ScratchPool {
    free: RefCell<Vec<Box<RasterScratch>>>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self {
            free: RefCell::new(Vec::new()),
        }
    }

    /// Check out a scratch context, allocating when the pool is empty.
    pub fn acquire(&self) -> ScratchGuard<'_> {
        let scratch = self
            .free
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Box::new(RasterScratch::new()));
        ScratchGuard {
            pool: self,
            scratch: Some(scratch),
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.free.borrow().len()
    }

    fn put_back(&self, scratch: Box<RasterScratch>) {
        self.free.borrow_mut().push(scratch);
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Checked-out scratch; returns itself to the pool on drop.
pub struct ScratchGuard<'p> {
    pool: &'p ScratchPool,
    scratch: Option<Box<RasterScratch>>,
}

impl std::ops::Deref for ScratchGuard<'_> {
    type Target = RasterScratch;

    fn deref(&self) -> &RasterScratch {
        self.scratch.as_deref().expect("scratch present until drop")
    }
}

impl std::ops::DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut RasterScratch {
        self.scratch
            .as_deref_mut()
            .expect("scratch present until drop")
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            self.pool.put_back(scratch);
        }
    }
}
