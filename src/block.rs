use std::{
  mem,
  ptr::{self, NonNull},
};

use crate::align::ALIGNMENT;

/// Written into `tag` while a block is handed out to a caller.
pub const ALLOCATED_TAG: usize = 0x0123_4567;

/// Written into `tag` when a block is released.
pub const FREE_TAG: usize = 0;

/// Bytes taken by a [`Block`] header in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

const _: () = assert!(mem::align_of::<Block>() == ALIGNMENT);
const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

/// Metadata placed immediately before every payload in the arena.
///
/// ```text
///   ┌─────────────────────┬──────────────────────────┐
///   │ size │ next │ tag   │      size bytes          │
///   └─────────────────────┴──────────────────────────┘
///   ▲                     ▲                          ▲
///   header                payload                    end
/// ```
///
/// `next` is only meaningful while the block sits in the free list, `tag`
/// is only trusted while the block is allocated. Use [`Block::state`] rather
/// than reading either field directly.
#[repr(C, align(16))]
pub struct Block {
  pub size: usize,
  pub next: *mut Block,
  pub tag: usize,
}

/// Typed view of a header decoded from its raw `tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free { next: Option<NonNull<Block>> },
  Allocated,
}

impl Block {
  pub fn new(size: usize) -> Self {
    Self {
      size,
      next: ptr::null_mut(),
      tag: FREE_TAG,
    }
  }

  /// Writes a fresh, unlinked free header at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be `ALIGNMENT`-aligned and valid for `HEADER_SIZE + size` bytes.
  pub unsafe fn init(
    at: NonNull<u8>,
    size: usize,
  ) -> NonNull<Block> {
    let block = at.cast::<Block>();
    unsafe { block.write(Block::new(size)) };
    block
  }

  /// # Safety
  ///
  /// `block` must point to a header written by this crate.
  pub unsafe fn payload(block: NonNull<Block>) -> NonNull<u8> {
    unsafe { block.cast::<u8>().add(HEADER_SIZE) }
  }

  /// Recovers the header that owns a payload pointer.
  ///
  /// # Safety
  ///
  /// `ptr` must be at least `HEADER_SIZE` bytes past the start of the arena.
  pub unsafe fn from_payload(ptr: NonNull<u8>) -> NonNull<Block> {
    unsafe { ptr.sub(HEADER_SIZE).cast() }
  }

  pub fn address(block: NonNull<Block>) -> usize {
    block.as_ptr() as usize
  }

  /// Address one past the last payload byte.
  ///
  /// # Safety
  ///
  /// `block` must point to a valid header.
  pub unsafe fn end(block: NonNull<Block>) -> usize {
    Self::address(block) + HEADER_SIZE + unsafe { (*block.as_ptr()).size }
  }

  /// Decodes the header state, or returns the raw tag if it is neither
  /// [`ALLOCATED_TAG`] nor [`FREE_TAG`].
  pub fn state(&self) -> Result<BlockState, usize> {
    match self.tag {
      ALLOCATED_TAG => Ok(BlockState::Allocated),
      FREE_TAG => Ok(BlockState::Free {
        next: NonNull::new(self.next),
      }),
      other => Err(other),
    }
  }

  pub fn is_allocated(&self) -> bool {
    self.tag == ALLOCATED_TAG
  }

  pub fn mark_allocated(&mut self) {
    self.tag = ALLOCATED_TAG;
    self.next = ptr::null_mut();
  }

  pub fn mark_free(&mut self) {
    self.tag = FREE_TAG;
    self.next = ptr::null_mut();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[repr(C, align(16))]
  struct Buf([u8; 256]);

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER_SIZE % ALIGNMENT, 0);
    assert!(HEADER_SIZE >= 3 * mem::size_of::<usize>());
    assert_eq!(mem::align_of::<Block>(), ALIGNMENT);
  }

  #[test]
  fn test_payload_round_trip() {
    let mut buf = Buf([0; 256]);
    let at = NonNull::new(buf.0.as_mut_ptr()).unwrap();

    unsafe {
      let block = Block::init(at, 64);
      let payload = Block::payload(block);

      assert_eq!(payload.as_ptr() as usize - at.as_ptr() as usize, HEADER_SIZE);
      assert_eq!(Block::from_payload(payload), block);
      assert_eq!(Block::end(block), Block::address(block) + HEADER_SIZE + 64);
    }
  }

  #[test]
  fn test_state_transitions() {
    let mut block = Block::new(16);
    assert_eq!(block.state(), Ok(BlockState::Free { next: None }));

    block.mark_allocated();
    assert!(block.is_allocated());
    assert_eq!(block.state(), Ok(BlockState::Allocated));

    block.mark_free();
    assert!(!block.is_allocated());
    assert_eq!(block.state(), Ok(BlockState::Free { next: None }));

    block.tag = 0xdead_beef;
    assert_eq!(block.state(), Err(0xdead_beef));
  }
}
