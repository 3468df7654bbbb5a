use serde::{Deserialize, Serialize};

use allocation_core::{DomainError, DomainResult, OrderId, Sku, ValueObject};

/// A line of a customer order: some quantity of one SKU.
///
/// Equality and hashing use `(order_id, sku)` only. A line resubmitted with a
/// corrected quantity is the same line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    order_id: OrderId,
    sku: Sku,
    qty: u32,
}

impl OrderLine {
    pub fn new(order_id: OrderId, sku: Sku, qty: u32) -> DomainResult<Self> {
        if qty == 0 {
            return Err(DomainError::validation("order line quantity must be positive"));
        }
        Ok(Self { order_id, sku, qty })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn qty(&self) -> u32 {
        self.qty
    }
}

impl PartialEq for OrderLine {
    fn eq(&self, other: &Self) -> bool {
        self.order_id == other.order_id && self.sku == other.sku
    }
}

impl Eq for OrderLine {}

impl core::hash::Hash for OrderLine {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.order_id.hash(state);
        self.sku.hash(state);
    }
}

impl ValueObject for OrderLine {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn line(order_id: &str, sku: &str, qty: u32) -> OrderLine {
        OrderLine::new(order_id.parse().unwrap(), sku.parse().unwrap(), qty).unwrap()
    }

    #[test]
    fn quantity_is_not_part_of_identity() {
        assert_eq!(line("o1", "LAMP", 10), line("o1", "LAMP", 3));
        assert_ne!(line("o1", "LAMP", 10), line("o2", "LAMP", 10));
        assert_ne!(line("o1", "LAMP", 10), line("o1", "TABLE", 10));

        let set: HashSet<_> = [line("o1", "LAMP", 10), line("o1", "LAMP", 3)].into();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = OrderLine::new("o1".parse().unwrap(), "LAMP".parse().unwrap(), 0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
