//! In-memory sorting by named field comparators.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use horizon_grid_core::logging::targets;

use super::query::{SortDirection, SortOrder};

/// Type alias for a compare function used by in-memory sorting.
pub type CompareFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Comparators keyed by field id.
///
/// Sort orders naming a field without a registered comparator are skipped.
pub struct Comparators<T> {
    by_field: HashMap<String, CompareFn<T>>,
}

impl<T> Default for Comparators<T> {
    fn default() -> Self {
        Self {
            by_field: HashMap::new(),
        }
    }
}

impl<T> Clone for Comparators<T> {
    fn clone(&self) -> Self {
        Self {
            by_field: self.by_field.clone(),
        }
    }
}

impl<T> Comparators<T> {
    /// Registers (or replaces) the comparator for `field`.
    pub fn insert(&mut self, field: impl Into<String>, compare: CompareFn<T>) {
        self.by_field.insert(field.into(), compare);
    }

    /// Returns `true` if `field` has a comparator.
    pub fn contains(&self, field: &str) -> bool {
        self.by_field.contains_key(field)
    }

    /// Compares two items under `orders`, most significant order first.
    pub fn compare(&self, orders: &[SortOrder], a: &T, b: &T) -> Ordering {
        for order in orders {
            let Some(compare) = self.by_field.get(&order.field) else {
                continue;
            };
            let ordering = match order.direction {
                SortDirection::Ascending => compare(a, b),
                SortDirection::Descending => compare(a, b).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable-sorts `items` under `orders`.
    pub fn sort(&self, orders: &[SortOrder], items: &mut [T]) {
        if orders.is_empty() {
            return;
        }
        for order in orders.iter().filter(|o| !self.contains(&o.field)) {
            tracing::debug!(
                target: targets::SOURCE,
                field = %order.field,
                "no comparator registered for sort field, ignoring"
            );
        }
        items.sort_by(|a, b| self.compare(orders, a, b));
    }
}
