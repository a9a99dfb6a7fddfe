use thiserror::Error;

/// Recoverable allocation failures.
///
/// Heap corruption is deliberately absent: it aborts the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("zero-sized allocation requested")]
  ZeroSize,

  #[error("size overflow: {count} elements of {elem_size} bytes")]
  SizeOverflow { count: usize, elem_size: usize },

  #[error("out of memory: arena could not grow to serve {requested} bytes")]
  OutOfMemory { requested: usize },
}

pub type Result<T, E = AllocError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages() {
    assert_eq!(
      AllocError::SizeOverflow {
        count: 2,
        elem_size: usize::MAX
      }
      .to_string(),
      format!("size overflow: 2 elements of {} bytes", usize::MAX)
    );
    assert_eq!(
      AllocError::OutOfMemory { requested: 64 }.to_string(),
      "out of memory: arena could not grow to serve 64 bytes"
    );
  }
}
