use std::{env, io::Read, ptr};

use brkheap::{Heap, SbrkGrower, block::HEADER_SIZE};
use tracing_subscriber::EnvFilter;

/// Waits until the user presses ENTER when run with `--step`.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just visually track how the program break moves.
fn pause(step: bool) {
  if !step {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    SbrkGrower::program_break(),
  );
}

fn print_heap(heap: &Heap<SbrkGrower>) {
  let stats = heap.stats();
  println!(
    "    arena = {} bytes in {} growths, free list = {} blocks / {} bytes",
    stats.arena_bytes, stats.growths, stats.free_blocks, stats.free_bytes
  );
  for block in heap.free_blocks() {
    println!("      free block at {:#x}, size {}", block.address, block.size);
  }
}

fn main() {
  // RUST_LOG=brkheap=trace shows every growth, split and merge.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let step = env::args().any(|arg| arg == "--step");
  let mut heap = Heap::sbrk();

  unsafe {
    print_program_break("start");
    pause(step);

    // 1) Three equal blocks, each grown fresh from the break.
    let n = 64;
    let a = heap.allocate(n).unwrap();
    let b = heap.allocate(n).unwrap();
    let c = heap.allocate(n).unwrap();
    println!("\n[1] Allocated A = {a:?}, B = {b:?}, C = {c:?} ({HEADER_SIZE}-byte headers)");
    ptr::write_bytes(a.as_ptr(), 0xAB, n);
    print_program_break("after A, B, C");
    print_heap(&heap);
    pause(step);

    // 2) Release A then C: two separate free blocks.
    heap.release(Some(a));
    heap.release(Some(c));
    println!("\n[2] Released A and C");
    print_heap(&heap);
    pause(step);

    // 3) Release B: A, B and C merge if the break was not moved in between.
    heap.release(Some(b));
    println!("\n[3] Released B");
    print_heap(&heap);
    pause(step);

    // 4) 2n bytes fit into the merged block without touching the break.
    let before = SbrkGrower::program_break();
    let d = heap.allocate(2 * n).unwrap();
    println!(
      "\n[4] Allocated 2n = {:?}; reused A? {}; break moved? {}",
      d,
      d == a,
      before != SbrkGrower::program_break()
    );
    print_heap(&heap);
    pause(step);

    // 5) Growing D copies it elsewhere and frees the old block.
    ptr::write_bytes(d.as_ptr(), 0x42, 2 * n);
    let e = heap.resize(Some(d), 64 * 1024).unwrap().unwrap();
    println!("\n[5] Resized D to 64 KiB: {e:?}, first byte = {:#x}", e.as_ptr().read());
    print_program_break("after large resize");
    print_heap(&heap);
    pause(step);

    // 6) calloc-style allocation comes back zeroed.
    let z = heap.zero_allocate(16, 4).unwrap();
    println!("\n[6] zero_allocate(16, 4) = {z:?}, first byte = {}", z.as_ptr().read());

    println!("\n[7] End of example. The break is never lowered; the OS reclaims it all on exit.");
  }
}
