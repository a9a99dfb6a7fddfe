//! End-to-end behaviour of a heap confined to a fixed region, under both
//! search modes.

use std::ptr::{self, NonNull};

use brkheap::{FixedRegion, Heap, HeapConfig, SearchMode, block::HEADER_SIZE};
use rstest::rstest;

fn heap(search: SearchMode) -> Heap<FixedRegion> {
  Heap::with_config(
    FixedRegion::with_capacity(1 << 20).unwrap(),
    HeapConfig::new().with_search(search),
  )
}

#[rstest]
fn coalescing_reduces_fragmentation(
  #[values(16, 64, 400)] n: usize,
  #[values(SearchMode::FirstFit, SearchMode::NextFit)] search: SearchMode,
) {
  let mut heap = heap(search);

  let a = heap.allocate(n).unwrap();
  let b = heap.allocate(n).unwrap();
  let c = heap.allocate(n).unwrap();

  assert_eq!(b.as_ptr() as usize, a.as_ptr() as usize + n + HEADER_SIZE);
  assert_eq!(c.as_ptr() as usize, b.as_ptr() as usize + n + HEADER_SIZE);

  unsafe {
    heap.release(Some(a));
    heap.release(Some(c));
    assert_eq!(heap.stats().free_blocks, 2);
    heap.release(Some(b));
  }

  let blocks: Vec<_> = heap.free_blocks().collect();
  assert_eq!(blocks.len(), 1);
  assert_eq!(blocks[0].size, 3 * n + 2 * HEADER_SIZE);
  assert_eq!(blocks[0].address, a.as_ptr() as usize - HEADER_SIZE);

  let growths = heap.stats().growths;
  let merged = heap.allocate(2 * n).unwrap();

  assert_eq!(merged, a);
  assert_eq!(heap.stats().growths, growths);
}

#[rstest]
fn release_order_does_not_matter(
  #[values([0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0])] order: [usize; 3],
) {
  let mut heap = heap(SearchMode::FirstFit);

  let blocks: Vec<_> = (0..3).map(|_| heap.allocate(48).unwrap()).collect();

  for i in order {
    unsafe { heap.release(Some(blocks[i])) };
  }

  let free: Vec<_> = heap.free_blocks().collect();
  assert_eq!(free.len(), 1);
  assert_eq!(free[0].size, 3 * 48 + 2 * HEADER_SIZE);
}

#[rstest]
#[case(1)]
#[case(16)]
#[case(100)]
#[case(4096)]
fn reuse_over_growth(
  #[case] n: usize,
  #[values(SearchMode::FirstFit, SearchMode::NextFit)] search: SearchMode,
) {
  let mut heap = heap(search);

  let _before = heap.allocate(32).unwrap();
  let block = heap.allocate(n).unwrap();
  let _after = heap.allocate(32).unwrap();
  let growths = heap.stats().growths;

  unsafe { heap.release(Some(block)) };
  let again = heap.allocate(n).unwrap();

  assert_eq!(again, block);
  assert_eq!(heap.stats().growths, growths);
}

#[rstest]
#[case(64, 64)]
#[case(64, 1)]
#[case(100, 97)]
#[case(100, 112)]
fn resize_within_capacity_keeps_pointer(
  #[case] n: usize,
  #[case] m: usize,
) {
  let mut heap = heap(SearchMode::FirstFit);

  let ptr = heap.allocate(n).unwrap();
  let resized = unsafe { heap.resize(Some(ptr), m) }.unwrap();

  assert_eq!(resized, Some(ptr));
}

#[test]
fn resize_reuses_freed_space_after_growth() {
  let mut heap = heap(SearchMode::FirstFit);

  let small = heap.allocate(32).unwrap();
  let _pin = heap.allocate(16).unwrap();
  let spare = heap.allocate(256).unwrap();
  unsafe { heap.release(Some(spare)) };

  let growths = heap.stats().growths;
  let grown = unsafe { heap.resize(Some(small), 200) }.unwrap().unwrap();

  assert_eq!(grown, spare);
  assert_eq!(heap.stats().growths, growths);

  // The old block went back on the free list.
  assert!(
    heap
      .free_blocks()
      .any(|block| block.address == small.as_ptr() as usize - HEADER_SIZE)
  );
}

#[test]
fn split_remainder_is_usable() {
  let mut heap = heap(SearchMode::FirstFit);

  let big = heap.allocate(1024).unwrap();
  unsafe { heap.release(Some(big)) };

  let first = heap.allocate(256).unwrap();
  let second = heap.allocate(256).unwrap();

  assert_eq!(first, big);
  assert_eq!(second.as_ptr() as usize, big.as_ptr() as usize + 256 + HEADER_SIZE);
  assert_eq!(heap.stats().growths, 1);

  unsafe {
    ptr::write_bytes(first.as_ptr(), 0x11, 256);
    ptr::write_bytes(second.as_ptr(), 0x22, 256);

    assert!(std::slice::from_raw_parts(first.as_ptr(), 256).iter().all(|&b| b == 0x11));
  }
}

#[test]
fn exhausted_region_reports_out_of_memory() {
  let mut heap = Heap::with_capacity(4 * (64 + HEADER_SIZE)).unwrap();

  let blocks: Vec<NonNull<u8>> = (0..4).map(|_| heap.allocate(64).unwrap()).collect();

  assert!(heap.allocate(64).is_err());

  unsafe { heap.release(Some(blocks[2])) };
  assert_eq!(heap.allocate(64).unwrap(), blocks[2]);
  assert_eq!(heap.grower().remaining(), 0);
}
