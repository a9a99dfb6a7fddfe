/// Alignment of every block header and every payload handed out by the heap.
pub const ALIGNMENT: usize = 16;

/// Rounds `value` up to the heap [`ALIGNMENT`](crate::align::ALIGNMENT).
///
/// # Examples
///
/// ```rust
/// use brkheap::align;
///
/// assert_eq!(align!(1), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(17), 32);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Rounds `value` up to `align`, which must be a power of two.
///
/// ```rust
/// use brkheap::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(24, 8), 24);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Checked [`align!`] for sizes coming from callers.
pub fn align_up(value: usize) -> Option<usize> {
  value
    .checked_add(ALIGNMENT - 1)
    .map(|v| v & !(ALIGNMENT - 1))
}

/// Bytes needed to move `addr` up to the next [`ALIGNMENT`] boundary.
pub fn padding_for(addr: usize) -> usize {
  align!(addr) - addr
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), align_up(size));
      }
    }
  }

  #[test]
  fn test_align_to_word() {
    let word = std::mem::size_of::<usize>();

    assert_eq!(align_to!(1, word), word);
    assert_eq!(align_to!(word + 1, word), 2 * word);
  }

  #[test]
  fn test_align_up_overflow() {
    assert_eq!(align_up(usize::MAX), None);
    assert_eq!(align_up(usize::MAX - ALIGNMENT + 2), None);
    assert_eq!(align_up(0), Some(0));
  }

  #[test]
  fn test_padding() {
    assert_eq!(padding_for(0), 0);
    assert_eq!(padding_for(1), ALIGNMENT - 1);
    assert_eq!(padding_for(ALIGNMENT), 0);
    assert_eq!(padding_for(ALIGNMENT + 8), 8);
  }
}
