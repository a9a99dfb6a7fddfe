use std::{
  fmt, process,
  ptr::{self, NonNull},
};

use tracing::{error, trace};

use crate::{
  align::{ALIGNMENT, align_up},
  block::{Block, BlockState, FREE_TAG, HEADER_SIZE},
  coalesce::coalesce,
  config::HeapConfig,
  error::{AllocError, Result},
  free_list::FreeList,
  grower::{ArenaGrower, FixedRegion},
  split::{Split, split},
};

#[cfg(unix)]
use crate::grower::SbrkGrower;

/// Point-in-time counters for a [`Heap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes obtained from the grower, headers included.
  pub arena_bytes: usize,
  /// Number of successful grower calls.
  pub growths: usize,
  pub free_blocks: usize,
  /// Usable bytes across all free blocks, headers excluded.
  pub free_bytes: usize,
}

/// A free block as seen from outside the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  /// Address of the block header.
  pub address: usize,
  pub size: usize,
}

/// Free-list allocator on top of a monotonically growing arena.
///
/// The heap is single-threaded: it is `Send` but not `Sync`, and all four
/// entry points need `&mut self`. Wrap it in a lock to share it, as
/// [`global`](crate::global) does.
///
/// Requested sizes are rounded up to [`ALIGNMENT`], so every payload is
/// `ALIGNMENT`-aligned and may be larger than asked for.
pub struct Heap<G> {
  grower: G,
  free: FreeList,
  config: HeapConfig,
  // Span of every address ever obtained from the grower.
  low: usize,
  high: usize,
  arena_bytes: usize,
  growths: usize,
}

// SAFETY: the raw pointers only ever reference memory owned by the grower,
// which moves together with the heap.
unsafe impl<G: Send> Send for Heap<G> {}

#[cfg(unix)]
impl Heap<SbrkGrower> {
  /// A heap that grows by moving the program break.
  pub const fn sbrk() -> Self {
    Self::new(SbrkGrower::new())
  }
}

impl Heap<FixedRegion> {
  /// A heap confined to a fresh region of `capacity` bytes.
  pub fn with_capacity(capacity: usize) -> Option<Self> {
    FixedRegion::with_capacity(capacity).map(Self::new)
  }
}

impl<G: ArenaGrower> Heap<G> {
  pub const fn new(grower: G) -> Self {
    Self::with_config(grower, HeapConfig::new())
  }

  pub const fn with_config(
    grower: G,
    config: HeapConfig,
  ) -> Self {
    Self {
      grower,
      free: FreeList::new(config.search),
      config,
      low: usize::MAX,
      high: 0,
      arena_bytes: 0,
      growths: 0,
    }
  }

  pub fn config(&self) -> HeapConfig {
    self.config
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  /// Serves at least `size` bytes, reusing a free block when one fits and
  /// growing the arena otherwise.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let oom = AllocError::OutOfMemory { requested: size };
    let size = align_up(size).ok_or(oom)?;

    let block = match unsafe { self.free.find_fit(size) } {
      Some(block) => unsafe { self.take(block, size) },
      None => self.grow(size).ok_or(oom)?,
    };

    unsafe {
      (*block.as_ptr()).mark_allocated();
      Ok(Block::payload(block))
    }
  }

  /// Allocates room for `count` elements of `elem_size` bytes, zero-filled.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<NonNull<u8>> {
    let total = count
      .checked_mul(elem_size)
      .ok_or(AllocError::SizeOverflow { count, elem_size })?;

    let ptr = self.allocate(total)?;

    unsafe {
      let usable = (*Block::from_payload(ptr).as_ptr()).size;
      ptr::write_bytes(ptr.as_ptr(), 0, usable);
    }

    Ok(ptr)
  }

  /// Resizes an allocation, preserving its contents.
  ///
  /// * `None` behaves as [`allocate`](Self::allocate).
  /// * `new_size == 0` releases the block and returns `Ok(None)`.
  /// * If the block already holds `new_size` bytes the same pointer comes
  ///   back; blocks are never shrunk.
  /// * Otherwise the contents move to a new block. If that allocation fails
  ///   the original block is left untouched.
  ///
  /// # Safety
  ///
  /// `ptr` must be `None` or a live pointer returned by this heap.
  pub unsafe fn resize(
    &mut self,
    ptr: Option<NonNull<u8>>,
    new_size: usize,
  ) -> Result<Option<NonNull<u8>>> {
    let Some(ptr) = ptr else {
      return self.allocate(new_size).map(Some);
    };

    if new_size == 0 {
      unsafe { self.release(Some(ptr)) };
      return Ok(None);
    }

    let block = unsafe { self.owned_block(ptr, "resize") };
    let old_size = unsafe { (*block.as_ptr()).size };

    if old_size >= new_size {
      return Ok(Some(ptr));
    }

    let new_ptr = self.allocate(new_size)?;

    unsafe {
      ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));
      self.release(Some(ptr));
    }

    Ok(Some(new_ptr))
  }

  /// Returns a block to the free list and merges it with free neighbours.
  ///
  /// Aborts the process if `ptr` does not lead to an allocated header.
  ///
  /// # Safety
  ///
  /// `ptr` must be `None` or a pointer returned by this heap. Releasing it
  /// twice is caught only while its old header is still intact.
  pub unsafe fn release(
    &mut self,
    ptr: Option<NonNull<u8>>,
  ) {
    let Some(ptr) = ptr else {
      return;
    };

    unsafe {
      let block = self.owned_block(ptr, "release");

      (*block.as_ptr()).mark_free();
      self.free.insert(block);
      coalesce(&mut self.free, block);
    }
  }

  /// Usable bytes behind a live pointer, which may exceed what was requested.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { (*self.owned_block(ptr, "usable_size").as_ptr()).size }
  }

  pub fn free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
    self.free.iter().map(|block| FreeBlock {
      address: Block::address(block),
      size: unsafe { (*block.as_ptr()).size },
    })
  }

  pub fn stats(&self) -> HeapStats {
    let (free_blocks, free_bytes) = self
      .free_blocks()
      .fold((0, 0), |(count, bytes), block| (count + 1, bytes + block.size));

    HeapStats {
      arena_bytes: self.arena_bytes,
      growths: self.growths,
      free_blocks,
      free_bytes,
    }
  }

  /// Pulls `block` out of the free list, carving off whatever is not needed.
  unsafe fn take(
    &mut self,
    block: NonNull<Block>,
    size: usize,
  ) -> NonNull<Block> {
    unsafe {
      if split(&mut self.free, block, size) == Split::Whole {
        self.free.remove(block);
      }

      trace!(
        block = format_args!("{:#x}", Block::address(block)),
        size = (*block.as_ptr()).size,
        "reused free block"
      );
    }

    block
  }

  fn grow(
    &mut self,
    size: usize,
  ) -> Option<NonNull<Block>> {
    let bytes = size.checked_add(HEADER_SIZE)?;
    let region = self.grower.grow(bytes)?;

    let start = region.as_ptr() as usize;
    self.low = self.low.min(start);
    self.high = self.high.max(start + bytes);
    self.arena_bytes += bytes;
    self.growths += 1;

    trace!(
      block = format_args!("{start:#x}"),
      size,
      arena_bytes = self.arena_bytes,
      "grew arena"
    );

    Some(unsafe { Block::init(region, size) })
  }

  /// Maps a caller's pointer back to its header, aborting unless it is an
  /// allocated block inside the arena.
  unsafe fn owned_block(
    &self,
    ptr: NonNull<u8>,
    operation: &'static str,
  ) -> NonNull<Block> {
    let address = ptr.as_ptr() as usize;

    if address % ALIGNMENT != 0
      || address < self.low.saturating_add(HEADER_SIZE)
      || address >= self.high
    {
      corrupted(address, None, operation);
    }

    let block = unsafe { Block::from_payload(ptr) };

    match unsafe { (*block.as_ptr()).state() } {
      Ok(BlockState::Allocated) => block,
      Ok(BlockState::Free { .. }) => corrupted(address, Some(FREE_TAG), operation),
      Err(tag) => corrupted(address, Some(tag), operation),
    }
  }
}

impl<G> fmt::Debug for Heap<G> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("config", &self.config)
      .field("arena_bytes", &self.arena_bytes)
      .field("growths", &self.growths)
      .field("free_blocks", &self.free.len())
      .finish()
  }
}

/// The free list can no longer be trusted; there is no way to carry on.
#[cold]
#[inline(never)]
fn corrupted(
  address: usize,
  tag: Option<usize>,
  operation: &'static str,
) -> ! {
  error!(
    address = format_args!("{address:#x}"),
    tag = ?tag.map(|tag| format!("{tag:#x}")),
    operation,
    "MEMORY CORRUPTION DETECTED"
  );

  process::abort()
}
