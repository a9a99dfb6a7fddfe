use std::ptr::NonNull;

use tracing::debug;

use crate::{
  block::{Block, HEADER_SIZE},
  free_list::FreeList,
};

/// Merges the freshly freed `block` with the free blocks directly before and
/// after it in memory, returning the header that now owns the merged span.
///
/// Neighbours are found by address, not by list position. Every absorbed
/// header is unlinked from `free` before its memory becomes payload.
///
/// # Safety
///
/// `block` must be a member of `free`, and every header reachable from `free`
/// must be valid.
pub unsafe fn coalesce(
  free: &mut FreeList,
  block: NonNull<Block>,
) -> NonNull<Block> {
  let mut merged = block;

  unsafe {
    if let Some(prev) = free.find_prev(block) {
      free.remove(block);
      absorb(prev, block);
      merged = prev;
    }

    if let Some(next) = free.find_next(merged) {
      free.remove(next);
      absorb(merged, next);
    }
  }

  merged
}

unsafe fn absorb(
  into: NonNull<Block>,
  victim: NonNull<Block>,
) {
  unsafe {
    (*into.as_ptr()).size += (*victim.as_ptr()).size + HEADER_SIZE;

    debug!(
      into = format_args!("{:#x}", Block::address(into)),
      victim = format_args!("{:#x}", Block::address(victim)),
      size = (*into.as_ptr()).size,
      "coalesced free blocks"
    );
  }
}
