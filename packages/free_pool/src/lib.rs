#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Object pools that recycle frequently reused objects, such as byte buffers, to avoid paying
//! for allocation and initialization on every use.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms for
//! high-performance hardware-aware programming in Rust.
//!
//! Two pools are provided:
//!
//! * [`FreePool`] is shared between threads. It keeps one shard per processor, so threads on
//!   different processors almost never touch the same memory. Each shard has a tiny private
//!   array accessed without locking and a mutex-protected shared list for overflow. Overflow is
//!   balanced between shards by sampling two of them and picking the less loaded one.
//! * [`LocalPool`] is owned by a single thread and needs no synchronization at all.
//!
//! Both pools hand out objects by value and take them back by value. A returned object is not
//! reset by the pool - clear it before returning it if that matters.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use free_pool::FreePool;
//!
//! // Retain up to roughly 1024 buffers in total, on top of a few per processor.
//! let pool = Arc::new(FreePool::with_capacity(|| Vec::<u8>::with_capacity(64 * 1024), 1024));
//!
//! let workers = (0..4)
//!     .map(|_| {
//!         let pool = Arc::clone(&pool);
//!
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 let mut buffer = pool.get();
//!                 buffer.extend_from_slice(b"payload");
//!
//!                 buffer.clear();
//!                 pool.put(buffer);
//!             }
//!         })
//!     })
//!     .collect::<Vec<_>>();
//!
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//!
//! println!("{} buffers cached", pool.approx_len());
//! ```
//!
//! # Best effort
//!
//! The pools are caches, not containers. `put()` drops objects that do not fit and `get()` on
//! a [`FreePool`] only considers objects near the current processor, creating a new object
//! instead of searching other processors. Never rely on a specific object coming back.
//!
//! # Observability
//!
//! The pool reports how each `get()` and `put()` was served via [`nm`] events named
//! `free_pool_*`, and logs its configuration and fallbacks via [`tracing`].

mod balance;
mod constants;
mod error;
mod local_pool;
mod metrics;
mod pin;
mod pool;
mod processors;
mod shard;

pub use constants::*;
pub use error::*;
pub use local_pool::*;
pub use pool::*;
