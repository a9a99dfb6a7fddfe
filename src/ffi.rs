//! C-ABI exports of the malloc family over the [`global`](crate::global) heap.
//!
//! Gated behind `features = ["ffi"]`. Failures come back as null pointers.

use std::ptr::{self, NonNull};

use libc::c_void;

use crate::global;

#[unsafe(no_mangle)]
pub extern "C" fn brkheap_malloc(size: usize) -> *mut c_void {
  global::allocate(size).map_or(ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub extern "C" fn brkheap_calloc(
  count: usize,
  size: usize,
) -> *mut c_void {
  global::zero_allocate(count, size).map_or(ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

/// # Safety
///
/// `ptr` must be null or a live pointer returned by this family.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkheap_realloc(
  ptr: *mut c_void,
  new_size: usize,
) -> *mut c_void {
  match unsafe { global::resize(NonNull::new(ptr.cast()), new_size) } {
    Ok(Some(ptr)) => ptr.as_ptr().cast(),
    Ok(None) | Err(_) => ptr::null_mut(),
  }
}

/// # Safety
///
/// `ptr` must be null or a live pointer returned by this family.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn brkheap_free(ptr: *mut c_void) {
  unsafe { global::release(NonNull::new(ptr.cast())) }
}
