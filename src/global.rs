//! One process-wide heap growing the program break.
//!
//! The heap itself assumes exclusive access; here it sits behind a mutex so
//! the free functions may be called from any thread. Corruption aborts while
//! the lock is held, so the lock is never poisoned by this crate, but a
//! poisoned lock is recovered rather than propagated all the same.

use std::{
  ptr::NonNull,
  sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
  error::Result,
  grower::SbrkGrower,
  heap::{Heap, HeapStats},
};

static HEAP: Mutex<Heap<SbrkGrower>> = Mutex::new(Heap::sbrk());

fn heap() -> MutexGuard<'static, Heap<SbrkGrower>> {
  HEAP.lock().unwrap_or_else(PoisonError::into_inner)
}

/// See [`Heap::allocate`].
pub fn allocate(size: usize) -> Result<NonNull<u8>> {
  heap().allocate(size)
}

/// See [`Heap::zero_allocate`].
pub fn zero_allocate(
  count: usize,
  elem_size: usize,
) -> Result<NonNull<u8>> {
  heap().zero_allocate(count, elem_size)
}

/// See [`Heap::resize`].
///
/// # Safety
///
/// `ptr` must be `None` or a live pointer returned by this module.
pub unsafe fn resize(
  ptr: Option<NonNull<u8>>,
  new_size: usize,
) -> Result<Option<NonNull<u8>>> {
  unsafe { heap().resize(ptr, new_size) }
}

/// See [`Heap::release`].
///
/// # Safety
///
/// `ptr` must be `None` or a live pointer returned by this module.
pub unsafe fn release(ptr: Option<NonNull<u8>>) {
  unsafe { heap().release(ptr) }
}

/// See [`Heap::usable_size`].
///
/// # Safety
///
/// `ptr` must be a live pointer returned by this module.
pub unsafe fn usable_size(ptr: NonNull<u8>) -> usize {
  unsafe { heap().usable_size(ptr) }
}

pub fn stats() -> HeapStats {
  heap().stats()
}
