//! Realtime instrumentation.
//!
//! [`TrapAllocator`] wraps the process allocator and counts heap activity on
//! threads that are currently armed. The render engine arms the render thread
//! around every node callback; a non-zero count afterwards means the node
//! broke the allocation-free contract.
//!
//! Hosts opt in by installing the allocator:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: TrapAllocator = TrapAllocator::system();
//! ```
//!
//! Without it, only panics are detected.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::fmt;

thread_local! {
    static ARMED: Cell<bool> = const { Cell::new(false) };
    static TRIPS: Cell<usize> = const { Cell::new(0) };
}

/// How a node broke the realtime contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Heap operations observed while the node was processing.
    Allocation { count: usize },
    /// The node panicked.
    Panic,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Allocation { count } => {
                write!(f, "{} heap operation(s) during process", count)
            }
            ViolationKind::Panic => f.write_str("panicked during process"),
        }
    }
}

/// Allocator wrapper that counts heap operations on armed threads.
#[derive(Debug, Default)]
pub struct TrapAllocator<A = System> {
    inner: A,
}

impl TrapAllocator<System> {
    /// Wraps the system allocator.
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A> TrapAllocator<A> {
    /// Wraps another allocator.
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[inline]
fn record() {
    // `try_with` keeps the allocator usable while thread-locals are torn down.
    let armed = ARMED.try_with(Cell::get).unwrap_or(false);
    if armed {
        let _ = TRIPS.try_with(|trips| trips.set(trips.get() + 1));
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrapAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record();
        self.inner.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record();
        self.inner.alloc_zeroed(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record();
        self.inner.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record();
        self.inner.realloc(ptr, layout, new_size)
    }
}

/// Arms the current thread until dropped.
///
/// Guards nest: dropping restores the previous armed state.
#[derive(Debug)]
pub struct TrapGuard {
    was_armed: bool,
    start: usize,
}

/// Arms allocation tracking on the current thread.
pub fn arm() -> TrapGuard {
    let was_armed = ARMED.with(|armed| armed.replace(true));
    TrapGuard {
        was_armed,
        start: TRIPS.with(Cell::get),
    }
}

impl TrapGuard {
    /// Heap operations observed on this thread since the guard was armed.
    pub fn trips(&self) -> usize {
        TRIPS.with(Cell::get).wrapping_sub(self.start)
    }
}

impl Drop for TrapGuard {
    fn drop(&mut self) {
        let was_armed = self.was_armed;
        ARMED.with(|armed| armed.set(was_armed));
    }
}
