use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// System allocator that keeps a running total of live heap bytes.
pub struct MeasureMemory {
    count: AtomicUsize,
}

impl MeasureMemory {
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    pub fn measure(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for MeasureMemory {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for MeasureMemory {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.count
            .fetch_add(layout.pad_to_align().size(), Ordering::Relaxed);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.count
            .fetch_sub(layout.pad_to_align().size(), Ordering::Relaxed);
        System.dealloc(ptr, layout);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.count
            .fetch_add(layout.pad_to_align().size(), Ordering::Relaxed);
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.count
            .fetch_sub(layout.pad_to_align().size(), Ordering::Relaxed);
        self.count.fetch_add(new_size, Ordering::Relaxed);
        System.realloc(ptr, layout, new_size)
    }
}
