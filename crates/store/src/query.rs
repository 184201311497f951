use common::{ProductId, WorkOrder, WorkOrderStatus};

/// Filter for listing active work orders.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderQuery {
    /// Filter by status.
    pub status: Option<WorkOrderStatus>,

    /// Filter by product.
    pub product_id: Option<ProductId>,
}

impl WorkOrderQuery {
    /// Creates a query matching every active work order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by status.
    pub fn status(mut self, status: WorkOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by product.
    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Returns true if `work_order` passes the filter.
    ///
    /// Inactive work orders never match.
    pub fn matches(&self, work_order: &WorkOrder) -> bool {
        work_order.is_active
            && self.status.is_none_or(|s| work_order.status == s)
            && self.product_id.is_none_or(|p| work_order.product_id == p)
    }
}
