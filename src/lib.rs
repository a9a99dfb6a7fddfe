//! # brkheap - A Free-List Heap Allocator
//!
//! This crate provides a **free-list allocator** that serves the classic
//! allocation family (allocate, zero-allocate, resize, release) out of a single
//! arena that only ever grows, by default by moving the program break with `sbrk`.
//!
//! ## Overview
//!
//! Every region of the arena starts with a block header. Released blocks are
//! threaded onto a singly linked free list and handed out again before the
//! arena is grown:
//!
//! ```text
//!   Free-List Heap Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         ARENA                                        │
//!   │                                                                      │
//!   │   ┌──┬─────┬──┬─────┬──┬─────────┬──┬─────┐                          │
//!   │   │H │ A1  │H │free │H │   A3    │H │free │                          │
//!   │   └──┴─────┴──┴─────┴──┴─────────┴──┴─────┘                          │
//!   │               ▲                     ▲     ▲                          │
//!   │               │                     │     │                          │
//!   │   head ───────┼─────────────────────┘   Program                      │
//!   │               └──────── next ◄──────    Break                        │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   allocate: search the free list, split off the excess, or grow the arena.
//!   release:  push on the free list, merge with free neighbours in memory.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkheap
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Block header and its Free / Allocated states
//!   ├── grower     - Arena growth: SbrkGrower, FixedRegion
//!   ├── free_list  - Free list with first-fit / next-fit search
//!   ├── split      - Carving a served block out of a larger free one
//!   ├── coalesce   - Merging address-adjacent free blocks
//!   ├── heap       - Heap, the four public entry points
//!   ├── global     - Process-wide heap behind a mutex (unix)
//!   └── ffi        - C-ABI malloc family (feature "ffi")
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkheap::Heap;
//!
//! let mut heap = Heap::with_capacity(4096).expect("reserve arena");
//!
//! let ptr = heap.allocate(8).unwrap().cast::<u64>();
//!
//! unsafe {
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//!
//!     heap.release(Some(ptr.cast()));
//! }
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: free only │  │  │                          │  │
//!   │  │ tag: allocated  │  │  │  N bytes usable          │  │
//!   │  └─────────────────┘  │  │  (N rounded up to 16)    │  │
//!   │   32 bytes (64-bit)   │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Releasing a pointer whose header does not carry the allocated tag is
//! treated as heap corruption and aborts the process.
//!
//! ## Limitations
//!
//! - **Single-threaded heap**: `Heap` needs `&mut self`; only [`global`] locks
//! - **Grow-only arena**: memory is never returned to the operating system
//! - **16-byte alignment**: no larger alignments are honoured
//! - **O(n) free list**: search and neighbour discovery are linear scans
//!
//! ## Safety
//!
//! Handing pointers back to the heap (`resize`, `release`) is `unsafe`: the
//! heap can only partially verify that a pointer is one of its own.

pub mod align;
pub mod block;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod free_list;
pub mod grower;
mod heap;
pub mod split;

#[cfg(unix)]
pub mod global;

#[cfg(all(unix, feature = "ffi"))]
pub mod ffi;

#[cfg(unix)]
pub use grower::SbrkGrower;

pub use config::{HeapConfig, SearchMode};
pub use error::AllocError;
pub use grower::{ArenaGrower, FixedRegion};
pub use heap::{FreeBlock, Heap, HeapStats};
