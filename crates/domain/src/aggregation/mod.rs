//! The aggregation engine.
//!
//! Items go into boxes, boxes go onto pallets. The tree has two fixed levels
//! and parent links only point from a box to a pallet, so it cannot contain
//! cycles:
//! ```text
//! Pallet ──► Box ──► SerialNumber
//! ```
//!
//! Capacity and ownership are checked against the stored state inside the
//! same commit that mutates it. The target container is always part of that
//! commit (updated or touched), so two writers filling the same box or pallet
//! cannot both succeed on a stale count.

mod hierarchy;
pub mod rules;
mod service;

pub use hierarchy::{AggregationHierarchy, BoxContents, HierarchyContents};
pub use service::AggregationService;
