//! Sources of fresh arena memory.

use std::{
  alloc::{self, Layout},
  ptr::NonNull,
};
#[cfg(unix)]
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::{
  align,
  align::{ALIGNMENT, align_up, padding_for},
};

/// Extends the arena with raw, never-before-used address space.
///
/// # Safety
///
/// Implementors must hand out regions that are `ALIGNMENT`-aligned, valid for
/// reads and writes of `bytes` bytes for as long as the grower lives, never
/// overlap, and sit at strictly higher addresses than every earlier region.
/// The heap keeps its headers inside these regions and trusts all of this.
pub unsafe trait ArenaGrower {
  /// Returns the start of a new region of `bytes` bytes, or `None` when the
  /// underlying resource is exhausted.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

/// Grows the arena by moving the program break with `sbrk(2)`.
///
/// Memory obtained this way is never given back. Other code in the process
/// may also move the break upwards (the system allocator does), in which case
/// consecutive regions are simply not adjacent; nothing may move it down.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct SbrkGrower;

// sbrk keeps its bookkeeping in an unsynchronised global.
#[cfg(unix)]
static BREAK: Mutex<()> = Mutex::new(());

#[cfg(unix)]
impl SbrkGrower {
  pub const fn new() -> Self {
    Self
  }

  /// The current program break.
  pub fn program_break() -> *mut u8 {
    unsafe { libc::sbrk(0) as *mut u8 }
  }
}

#[cfg(unix)]
unsafe impl ArenaGrower for SbrkGrower {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let _break = BREAK.lock().unwrap_or_else(PoisonError::into_inner);

    // Someone else may have left the break misaligned.
    let pad = padding_for(Self::program_break() as usize);
    let total = bytes.checked_add(pad)?;
    let increment = libc::intptr_t::try_from(total).ok()?;

    let address = unsafe { libc::sbrk(increment) };

    if address == usize::MAX as *mut libc::c_void {
      trace!(bytes, "sbrk refused to extend the break");
      return None;
    }

    let start = align!(address as usize);
    let end = address as usize + total;

    if start + bytes > end {
      // The break moved between the probe and the extension.
      let shortfall = (start + bytes - end) as libc::intptr_t;
      let extra = unsafe { libc::sbrk(shortfall) };

      if extra as usize != end {
        trace!(bytes, "program break moved underneath the grower");
        return None;
      }
    }

    trace!(bytes, pad, start = format_args!("{start:#x}"), "moved program break");

    NonNull::new(start as *mut u8)
  }
}

/// A bounded arena carved out of one up-front reservation.
///
/// Regions are handed out back to back, so consecutive growths are always
/// address-adjacent. Once `capacity` bytes are used every further growth
/// fails. The reservation is released on drop, which dangles every pointer
/// a heap built on this region has handed out.
#[derive(Debug)]
pub struct FixedRegion {
  base: NonNull<u8>,
  layout: Layout,
  used: usize,
}

impl FixedRegion {
  /// Reserves `capacity` bytes (rounded up to `ALIGNMENT`).
  ///
  /// Returns `None` if the system allocator refuses the reservation.
  pub fn with_capacity(capacity: usize) -> Option<Self> {
    let capacity = align_up(capacity.max(ALIGNMENT))?;
    let layout = Layout::from_size_align(capacity, ALIGNMENT).ok()?;
    let base = NonNull::new(unsafe { alloc::alloc(layout) })?;

    Some(Self {
      base,
      layout,
      used: 0,
    })
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  pub fn used(&self) -> usize {
    self.used
  }

  pub fn remaining(&self) -> usize {
    self.capacity() - self.used
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }
}

unsafe impl ArenaGrower for FixedRegion {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let bytes = align_up(bytes)?;

    if bytes > self.remaining() {
      trace!(bytes, remaining = self.remaining(), "fixed region exhausted");
      return None;
    }

    let start = unsafe { self.base.add(self.used) };
    self.used += bytes;

    Some(start)
  }
}

impl Drop for FixedRegion {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}

// SAFETY: the region is uniquely owned; nothing else holds its base pointer.
unsafe impl Send for FixedRegion {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fixed_region_is_contiguous() {
    let mut region = FixedRegion::with_capacity(256).unwrap();

    let first = region.grow(48).unwrap();
    let second = region.grow(32).unwrap();

    assert_eq!(first, region.base());
    assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 48);
    assert_eq!(second.as_ptr() as usize % ALIGNMENT, 0);
    assert_eq!(region.used(), 80);
  }

  #[test]
  fn test_fixed_region_rounds_requests() {
    let mut region = FixedRegion::with_capacity(64).unwrap();

    let first = region.grow(1).unwrap();
    let second = region.grow(1).unwrap();

    assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, ALIGNMENT);
  }

  #[test]
  fn test_fixed_region_exhaustion() {
    let mut region = FixedRegion::with_capacity(64).unwrap();

    assert!(region.grow(48).is_some());
    assert!(region.grow(32).is_none());
    assert!(region.grow(16).is_some());
    assert!(region.grow(1).is_none());
    assert_eq!(region.remaining(), 0);
  }

  #[cfg(unix)]
  #[test]
  fn test_sbrk_grower_moves_break_up() {
    let mut grower = SbrkGrower::new();

    let first = grower.grow(64).unwrap();
    let second = grower.grow(64).unwrap();

    assert_eq!(first.as_ptr() as usize % ALIGNMENT, 0);
    assert_eq!(second.as_ptr() as usize % ALIGNMENT, 0);
    assert!(second > first);
    assert!(SbrkGrower::program_break() as usize >= second.as_ptr() as usize + 64);
  }

  #[cfg(unix)]
  #[test]
  fn test_sbrk_grower_rejects_absurd_request() {
    let mut grower = SbrkGrower::new();

    assert!(grower.grow(usize::MAX).is_none());
  }
}
