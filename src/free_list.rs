//! Singly linked list of free blocks, threaded through the headers'
//! `next` fields. Insertion is at the head, so the list has no address order.

use std::{
  iter::FusedIterator,
  marker::PhantomData,
  ptr::{self, NonNull},
};

use crate::{block::Block, config::SearchMode};

pub struct FreeList {
  head: *mut Block,
  mode: SearchMode,
  // Next-fit resume point; null means "start from the head".
  cursor: *mut Block,
  len: usize,
}

impl FreeList {
  pub const fn new(mode: SearchMode) -> Self {
    Self {
      head: ptr::null_mut(),
      mode,
      cursor: ptr::null_mut(),
      len: 0,
    }
  }

  pub fn mode(&self) -> SearchMode {
    self.mode
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }

  /// Pushes `block` at the head.
  ///
  /// # Safety
  ///
  /// `block` must be a valid header that is not already in the list.
  pub unsafe fn insert(
    &mut self,
    block: NonNull<Block>,
  ) {
    unsafe { (*block.as_ptr()).next = self.head };
    self.head = block.as_ptr();
    self.len += 1;
  }

  /// Unlinks `block` wherever it sits. Returns `false` if it was not a member.
  ///
  /// # Safety
  ///
  /// Every header reachable from the list must be valid.
  pub unsafe fn remove(
    &mut self,
    block: NonNull<Block>,
  ) -> bool {
    let target = block.as_ptr();

    unsafe {
      let Some(link) = self.link_to(target) else {
        return false;
      };

      *link = (*target).next;
      (*target).next = ptr::null_mut();
    }

    if self.cursor == target {
      self.cursor = ptr::null_mut();
    }
    self.len -= 1;

    true
  }

  /// Puts `new` into the list slot held by `old`, unlinking `old`.
  ///
  /// # Safety
  ///
  /// `old` must be in the list, `new` must be a valid header outside it.
  pub unsafe fn replace(
    &mut self,
    old: NonNull<Block>,
    new: NonNull<Block>,
  ) {
    let (old, new) = (old.as_ptr(), new.as_ptr());

    unsafe {
      if let Some(link) = self.link_to(old) {
        *link = new;
        (*new).next = (*old).next;
        (*old).next = ptr::null_mut();
      }
    }

    if self.cursor == old {
      self.cursor = new;
    }
  }

  /// Finds a block whose usable size is at least `size`, using the list's
  /// search mode. Next-fit remembers the hit as the start of the next search.
  ///
  /// # Safety
  ///
  /// Every header reachable from the list must be valid.
  pub unsafe fn find_fit(
    &mut self,
    size: usize,
  ) -> Option<NonNull<Block>> {
    let found = match self.mode {
      SearchMode::FirstFit => unsafe { Self::scan(self.head, ptr::null_mut(), size) },
      SearchMode::NextFit => {
        let start = if self.cursor.is_null() {
          self.head
        } else {
          self.cursor
        };

        match unsafe { Self::scan(start, ptr::null_mut(), size) } {
          Some(block) => Some(block),
          None => unsafe { Self::scan(self.head, start, size) },
        }
      }
    };

    if let (SearchMode::NextFit, Some(block)) = (self.mode, found) {
      self.cursor = block.as_ptr();
    }

    found
  }

  /// The free block whose end touches the start of `block`.
  ///
  /// # Safety
  ///
  /// Every header reachable from the list must be valid.
  pub unsafe fn find_prev(
    &self,
    block: NonNull<Block>,
  ) -> Option<NonNull<Block>> {
    let start = Block::address(block);

    self
      .iter()
      .find(|&candidate| unsafe { Block::end(candidate) } == start)
  }

  /// The free block that starts where `block` ends.
  ///
  /// # Safety
  ///
  /// `block` and every header reachable from the list must be valid.
  pub unsafe fn find_next(
    &self,
    block: NonNull<Block>,
  ) -> Option<NonNull<Block>> {
    let end = unsafe { Block::end(block) };

    self
      .iter()
      .find(|&candidate| Block::address(candidate) == end)
  }

  pub fn contains(
    &self,
    block: NonNull<Block>,
  ) -> bool {
    self.iter().any(|candidate| candidate == block)
  }

  pub fn iter(&self) -> Iter<'_> {
    Iter {
      current: self.head,
      _list: PhantomData,
    }
  }

  /// Walks `[from, until)` looking for a block of at least `size` bytes.
  unsafe fn scan(
    from: *mut Block,
    until: *mut Block,
    size: usize,
  ) -> Option<NonNull<Block>> {
    let mut current = from;

    while !current.is_null() && current != until {
      unsafe {
        if (*current).size >= size {
          return NonNull::new(current);
        }
        current = (*current).next;
      }
    }

    None
  }

  /// The link (head or some header's `next`) that currently points at `target`.
  unsafe fn link_to(
    &mut self,
    target: *mut Block,
  ) -> Option<*mut *mut Block> {
    let mut link: *mut *mut Block = &mut self.head;

    unsafe {
      while !(*link).is_null() {
        if *link == target {
          return Some(link);
        }
        link = &raw mut (**link).next;
      }
    }

    None
  }
}

/// Iterator over the headers currently in a [`FreeList`].
pub struct Iter<'a> {
  current: *mut Block,
  _list: PhantomData<&'a FreeList>,
}

impl Iterator for Iter<'_> {
  type Item = NonNull<Block>;

  fn next(&mut self) -> Option<Self::Item> {
    let block = NonNull::new(self.current)?;
    self.current = unsafe { (*block.as_ptr()).next };
    Some(block)
  }
}

impl FusedIterator for Iter<'_> {}
