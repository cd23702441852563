//! Background Tasks Module
//!
//! Contains background tasks the hosting binary may run alongside the cache.
//!
//! # Tasks
//! - Local Sweep: Removes expired local entries at a fixed interval. Off by
//!   default; the local layer otherwise sweeps only when it passes its watermark.

mod sweep;

pub use sweep::spawn_sweep_task;
