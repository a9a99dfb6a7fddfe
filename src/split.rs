use std::ptr::NonNull;

use tracing::debug;

use crate::{
  block::{Block, HEADER_SIZE},
  free_list::FreeList,
};

/// Smallest payload worth giving its own header.
pub const MIN_REMAINDER: usize = 1;

/// Outcome of [`split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
  /// A remainder was carved off and has taken the block's place in the list.
  Carved { remainder: NonNull<Block> },
  /// The leftover would have been a sliver; the block is served whole and is
  /// still in the list.
  Whole,
}

/// Carves `size` bytes off the front of the free `block`.
///
/// # Safety
///
/// `block` must be a member of `free`, and `size` must be a multiple of
/// `ALIGNMENT` no larger than the block.
pub unsafe fn split(
  free: &mut FreeList,
  block: NonNull<Block>,
  size: usize,
) -> Split {
  let available = unsafe { (*block.as_ptr()).size };

  if available < size + HEADER_SIZE + MIN_REMAINDER {
    return Split::Whole;
  }

  let remainder_size = available - size - HEADER_SIZE;

  unsafe {
    let at = Block::payload(block).add(size);
    let remainder = Block::init(at, remainder_size);

    free.replace(block, remainder);
    (*block.as_ptr()).size = size;

    debug!(
      block = format_args!("{:#x}", Block::address(block)),
      size, remainder_size, "split free block"
    );

    Split::Carved { remainder }
  }
}
