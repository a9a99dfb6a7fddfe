/// How [`FreeList::find_fit`](crate::free_list::FreeList::find_fit) picks a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
  /// Always scan from the head of the free list.
  #[default]
  FirstFit,
  /// Resume from the block that satisfied the previous request, wrapping to
  /// the head. The resume point is dropped as soon as that block stops being
  /// free.
  NextFit,
}

/// Construction-time settings for a [`Heap`](crate::Heap).
///
/// Settings are fixed for the lifetime of the heap so that every request
/// follows the same policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapConfig {
  pub search: SearchMode,
}

impl HeapConfig {
  pub const fn new() -> Self {
    Self {
      search: SearchMode::FirstFit,
    }
  }

  pub const fn with_search(
    mut self,
    search: SearchMode,
  ) -> Self {
    self.search = search;
    self
  }
}
