use common::{SerialNumber, Sscc};
use serde::Serialize;

/// A container together with everything packed in it.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationHierarchy {
    pub container: Sscc,
    pub contents: HierarchyContents,
}

/// What a container holds: serial numbers for a box, boxes for a pallet.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "children")]
pub enum HierarchyContents {
    Items(Vec<SerialNumber>),
    Boxes(Vec<BoxContents>),
}

/// A box on a pallet with its serial numbers.
#[derive(Debug, Clone, Serialize)]
pub struct BoxContents {
    pub container: Sscc,
    pub items: Vec<SerialNumber>,
}

impl AggregationHierarchy {
    /// Number of serial numbers in the tree.
    pub fn item_count(&self) -> usize {
        match &self.contents {
            HierarchyContents::Items(items) => items.len(),
            HierarchyContents::Boxes(boxes) => boxes.iter().map(|b| b.items.len()).sum(),
        }
    }

    /// Number of boxes directly under a pallet; zero for a box.
    pub fn box_count(&self) -> usize {
        match &self.contents {
            HierarchyContents::Items(_) => 0,
            HierarchyContents::Boxes(boxes) => boxes.len(),
        }
    }
}
