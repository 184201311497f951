//! Serial number allocation and lifecycle.
//!
//! A work order hands out serials from a contiguous range that starts at
//! `serial_number_start`. The `last_serial_number` watermark only moves
//! forward, so two allocations never overlap and never leave gaps.
//!
//! Serial status transitions:
//! ```text
//! Generated ──► Printed ──► Verified ──► Rejected
//!     │            │           │
//!     └────────────┴───────────┴──► Aggregated ──(removed from box)──► Verified
//! ```

mod allocator;
mod lifecycle;
mod service;

pub use allocator::{SerialRange, allocate};
pub use lifecycle::{Mark, aggregate, apply_mark, release};
pub use service::SerializationService;
