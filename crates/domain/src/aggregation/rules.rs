//! Pure checks behind the aggregation operations.
//!
//! Each check receives everything it needs already loaded and either
//! returns the records that must change or a `Validation` error listing the
//! offending identifiers.

use std::collections::{HashMap, HashSet};

use common::{SerialNumber, SerialNumberId, Sscc, SsccId, WorkOrder};

use crate::{DomainError, Result};

/// Returns `ids` without repeats, keeping the first occurrence.
pub fn dedupe<T: Copy + Eq + std::hash::Hash>(ids: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Validates adding `requested` serials to `target`.
///
/// `found` holds the serials that resolved and `current_count` the number of
/// serials already in the box. Returns the serials that are not yet in the
/// box; serials already in it are accepted and left alone.
pub fn check_items_for_box(
    target: &Sscc,
    work_order: &WorkOrder,
    requested: &[SerialNumberId],
    found: &[SerialNumber],
    current_count: u64,
) -> Result<Vec<SerialNumber>> {
    if !target.is_box() {
        return Err(DomainError::validation_with(
            format!("SSCC {} is a {}, items can only be added to a box", target.code, target.kind),
            [&target.code],
        ));
    }

    let requested = dedupe(requested);
    if requested.is_empty() {
        return Err(DomainError::validation("No serial numbers to add"));
    }

    let by_id: HashMap<_, _> = found.iter().map(|s| (s.id, s)).collect();
    let missing: Vec<_> = requested.iter().filter(|id| !by_id.contains_key(*id)).collect();
    if !missing.is_empty() {
        return Err(DomainError::validation_with(
            "Serial numbers not found",
            missing,
        ));
    }

    let serials: Vec<&SerialNumber> = requested
        .iter()
        .filter_map(|id| by_id.get(id).copied())
        .collect();

    let foreign: Vec<_> = serials
        .iter()
        .filter(|s| s.work_order_id != target.work_order_id)
        .map(|s| &s.serial)
        .collect();
    if !foreign.is_empty() {
        return Err(DomainError::validation_with(
            format!(
                "Serial numbers belong to a different work order than box {}",
                target.code
            ),
            foreign,
        ));
    }

    let elsewhere: Vec<_> = serials
        .iter()
        .filter(|s| s.container_id.is_some_and(|c| c != target.id))
        .map(|s| &s.serial)
        .collect();
    if !elsewhere.is_empty() {
        return Err(DomainError::validation_with(
            "Serial numbers are already in another box",
            elsewhere,
        ));
    }

    let rejected: Vec<_> = serials
        .iter()
        .filter(|s| !s.status.can_aggregate())
        .map(|s| &s.serial)
        .collect();
    if !rejected.is_empty() {
        return Err(DomainError::validation_with(
            "Rejected serial numbers cannot be aggregated",
            rejected,
        ));
    }

    let incoming: Vec<SerialNumber> = serials
        .into_iter()
        .filter(|s| !s.is_in(target.id))
        .cloned()
        .collect();

    let limit = u64::from(work_order.items_per_box);
    let adding = incoming.len() as u64;
    if current_count + adding > limit {
        return Err(DomainError::validation_with(
            format!(
                "Box {} capacity exceeded: current {current_count}, incoming {adding}, limit {limit}",
                target.code
            ),
            [&target.code],
        ));
    }

    Ok(incoming)
}

/// Validates putting `requested` boxes onto `target`.
///
/// `item_counts` maps box ids to their item count (empty boxes may be
/// absent) and `current_children` is the number of boxes already on the
/// pallet. Returns the boxes that are not yet on the pallet.
pub fn check_boxes_for_pallet(
    target: &Sscc,
    work_order: &WorkOrder,
    requested: &[SsccId],
    found: &[Sscc],
    item_counts: &HashMap<SsccId, u64>,
    current_children: u64,
) -> Result<Vec<Sscc>> {
    if !target.is_pallet() {
        return Err(DomainError::validation_with(
            format!(
                "SSCC {} is a {}, boxes can only be added to a pallet",
                target.code, target.kind
            ),
            [&target.code],
        ));
    }

    let requested = dedupe(requested);
    if requested.is_empty() {
        return Err(DomainError::validation("No boxes to add"));
    }

    let by_id: HashMap<_, _> = found.iter().map(|c| (c.id, c)).collect();
    let missing: Vec<_> = requested.iter().filter(|id| !by_id.contains_key(*id)).collect();
    if !missing.is_empty() {
        return Err(DomainError::validation_with("Boxes not found", missing));
    }

    let boxes: Vec<&Sscc> = requested.iter().filter_map(|id| by_id.get(id).copied()).collect();

    let not_boxes: Vec<_> = boxes.iter().filter(|c| !c.is_box()).map(|c| &c.code).collect();
    if !not_boxes.is_empty() {
        return Err(DomainError::validation_with(
            "Only boxes can be put on a pallet",
            not_boxes,
        ));
    }

    let empty: Vec<_> = boxes
        .iter()
        .filter(|c| item_counts.get(&c.id).copied().unwrap_or(0) == 0)
        .map(|c| &c.code)
        .collect();
    if !empty.is_empty() {
        return Err(DomainError::validation_with(
            "Empty boxes cannot be put on a pallet",
            empty,
        ));
    }

    let foreign: Vec<_> = boxes
        .iter()
        .filter(|c| c.work_order_id != target.work_order_id)
        .map(|c| &c.code)
        .collect();
    if !foreign.is_empty() {
        return Err(DomainError::validation_with(
            format!(
                "Boxes belong to a different work order than pallet {}",
                target.code
            ),
            foreign,
        ));
    }

    let elsewhere: Vec<_> = boxes
        .iter()
        .filter(|c| c.parent_id.is_some_and(|p| p != target.id))
        .map(|c| &c.code)
        .collect();
    if !elsewhere.is_empty() {
        return Err(DomainError::validation_with(
            "Boxes are already on another pallet",
            elsewhere,
        ));
    }

    let incoming: Vec<Sscc> = boxes
        .into_iter()
        .filter(|c| c.parent_id != Some(target.id))
        .cloned()
        .collect();

    let limit = u64::from(work_order.boxes_per_pallet);
    let adding = incoming.len() as u64;
    if current_children + adding > limit {
        return Err(DomainError::validation_with(
            format!(
                "Pallet {} capacity exceeded: current {current_children}, incoming {adding}, limit {limit}",
                target.code
            ),
            [&target.code],
        ));
    }

    Ok(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{ContainerKind, ProductId, SerialStatus, WorkOrderId};

    fn work_order(items_per_box: u32, boxes_per_pallet: u32) -> WorkOrder {
        WorkOrder::new(
            "WO-1",
            ProductId::new(),
            1000,
            "LOT",
            NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        )
        .with_capacities(items_per_box, boxes_per_pallet)
    }

    fn container(kind: ContainerKind, work_order_id: WorkOrderId, code: &str) -> Sscc {
        Sscc::new(kind, work_order_id, code, format!("00{code}"))
    }

    fn serials(work_order_id: WorkOrderId, n: usize) -> Vec<SerialNumber> {
        (0..n)
            .map(|i| SerialNumber::generated(work_order_id, format!("S{i}"), "dm"))
            .collect()
    }

    fn ids(serials: &[SerialNumber]) -> Vec<SerialNumberId> {
        serials.iter().map(|s| s.id).collect()
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        assert_eq!(dedupe(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn items_fit_exactly() {
        let wo = work_order(3, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let items = serials(wo.id, 2);

        let incoming = check_items_for_box(&target, &wo, &ids(&items), &items, 1).unwrap();
        assert_eq!(incoming.len(), 2);
    }

    #[test]
    fn capacity_overflow_names_the_numbers() {
        let wo = work_order(3, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let items = serials(wo.id, 2);

        let err = check_items_for_box(&target, &wo, &ids(&items), &items, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Box B1 capacity exceeded: current 2, incoming 2, limit 3"
        );
        assert_eq!(err.offending(), ["B1".to_string()]);
    }

    #[test]
    fn items_already_in_the_box_do_not_count() {
        let wo = work_order(2, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let mut items = serials(wo.id, 2);
        items[0].container_id = Some(target.id);
        items[0].status = SerialStatus::Aggregated;

        let incoming = check_items_for_box(&target, &wo, &ids(&items), &items, 1).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, items[1].id);
    }

    #[test]
    fn duplicate_ids_count_once() {
        let wo = work_order(1, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let items = serials(wo.id, 1);
        let requested = vec![items[0].id, items[0].id];

        let incoming = check_items_for_box(&target, &wo, &requested, &items, 0).unwrap();
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn unresolved_ids_are_listed() {
        let wo = work_order(10, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let ghost = SerialNumberId::new();

        let err = check_items_for_box(&target, &wo, &[ghost], &[], 0).unwrap_err();
        assert_eq!(err.offending(), [ghost.to_string()]);
    }

    #[test]
    fn items_from_another_work_order_are_rejected() {
        let wo = work_order(10, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let mut items = serials(wo.id, 2);
        items[1].work_order_id = WorkOrderId::new();

        let err = check_items_for_box(&target, &wo, &ids(&items), &items, 0).unwrap_err();
        assert_eq!(err.offending(), ["S1".to_string()]);
    }

    #[test]
    fn items_in_another_box_are_rejected() {
        let wo = work_order(10, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let mut items = serials(wo.id, 1);
        items[0].container_id = Some(SsccId::new());

        let err = check_items_for_box(&target, &wo, &ids(&items), &items, 0).unwrap_err();
        assert_eq!(err.to_string(), "Serial numbers are already in another box");
    }

    #[test]
    fn rejected_items_cannot_be_boxed() {
        let wo = work_order(10, 10);
        let target = container(ContainerKind::Box, wo.id, "B1");
        let mut items = serials(wo.id, 1);
        items[0].status = SerialStatus::Rejected;

        assert!(check_items_for_box(&target, &wo, &ids(&items), &items, 0).is_err());
    }

    #[test]
    fn items_cannot_go_on_a_pallet() {
        let wo = work_order(10, 10);
        let target = container(ContainerKind::Pallet, wo.id, "P1");
        let items = serials(wo.id, 1);

        let err = check_items_for_box(&target, &wo, &ids(&items), &items, 0).unwrap_err();
        assert_eq!(err.offending(), ["P1".to_string()]);
    }

    #[test]
    fn boxes_fit_on_pallet() {
        let wo = work_order(10, 2);
        let pallet = container(ContainerKind::Pallet, wo.id, "P1");
        let a = container(ContainerKind::Box, wo.id, "B1");
        let b = container(ContainerKind::Box, wo.id, "B2");
        let counts = HashMap::from([(a.id, 3), (b.id, 1)]);

        let incoming = check_boxes_for_pallet(
            &pallet,
            &wo,
            &[a.id, b.id],
            &[a.clone(), b.clone()],
            &counts,
            0,
        )
        .unwrap();
        assert_eq!(incoming.len(), 2);
    }

    #[test]
    fn empty_box_is_refused() {
        let wo = work_order(10, 5);
        let pallet = container(ContainerKind::Pallet, wo.id, "P1");
        let full = container(ContainerKind::Box, wo.id, "B1");
        let empty = container(ContainerKind::Box, wo.id, "B2");
        let counts = HashMap::from([(full.id, 4)]);

        let err = check_boxes_for_pallet(
            &pallet,
            &wo,
            &[full.id, empty.id],
            &[full.clone(), empty.clone()],
            &counts,
            0,
        )
        .unwrap_err();
        assert_eq!(err.offending(), ["B2".to_string()]);
    }

    #[test]
    fn pallet_capacity_is_enforced() {
        let wo = work_order(10, 2);
        let pallet = container(ContainerKind::Pallet, wo.id, "P1");
        let a = container(ContainerKind::Box, wo.id, "B1");
        let b = container(ContainerKind::Box, wo.id, "B2");
        let counts = HashMap::from([(a.id, 1), (b.id, 1)]);

        let err = check_boxes_for_pallet(
            &pallet,
            &wo,
            &[a.id, b.id],
            &[a.clone(), b.clone()],
            &counts,
            1,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pallet P1 capacity exceeded: current 1, incoming 2, limit 2"
        );
    }

    #[test]
    fn pallets_cannot_be_nested() {
        let wo = work_order(10, 5);
        let target = container(ContainerKind::Pallet, wo.id, "P1");
        let other = container(ContainerKind::Pallet, wo.id, "P2");
        let counts = HashMap::new();

        let err = check_boxes_for_pallet(&target, &wo, &[other.id], &[other.clone()], &counts, 0)
            .unwrap_err();
        assert_eq!(err.offending(), ["P2".to_string()]);
    }

    #[test]
    fn box_on_another_pallet_is_refused() {
        let wo = work_order(10, 5);
        let target = container(ContainerKind::Pallet, wo.id, "P1");
        let mut boxed = container(ContainerKind::Box, wo.id, "B1");
        boxed.parent_id = Some(SsccId::new());
        let counts = HashMap::from([(boxed.id, 1)]);

        let err = check_boxes_for_pallet(&target, &wo, &[boxed.id], &[boxed.clone()], &counts, 0)
            .unwrap_err();
        assert_eq!(err.to_string(), "Boxes are already on another pallet");
    }

    #[test]
    fn box_target_refuses_boxes() {
        let wo = work_order(10, 5);
        let target = container(ContainerKind::Box, wo.id, "B0");
        let counts = HashMap::new();

        let err = check_boxes_for_pallet(&target, &wo, &[], &[], &counts, 0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
