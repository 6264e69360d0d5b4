//! One year of purchases, indexed three ways.
//!
//! A [`YearPartition`] keeps the same purchase set under three views: by shop,
//! by employee and by customer. Every purchase appears exactly once in each
//! view; the views share the record through an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Customer, CustomerId, EmployeeId, Purchase, Shop, ShopId};

/// Per-year index of purchases by shop, employee and customer.
#[derive(Debug, Clone, Default)]
pub struct YearPartition {
    year: i32,
    by_shop: BTreeMap<ShopId, Vec<Arc<Purchase>>>,
    by_employee: BTreeMap<EmployeeId, Vec<Arc<Purchase>>>,
    by_customer: BTreeMap<CustomerId, Vec<Arc<Purchase>>>,
}

impl YearPartition {
    /// Create an empty partition for `year`.
    pub fn new(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    /// Build a partition from a full list of purchases in one pass.
    pub fn from_purchases(year: i32, purchases: impl IntoIterator<Item = Purchase>) -> Self {
        let mut partition = Self::new(year);
        for purchase in purchases {
            partition.add(purchase);
        }
        partition
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Index `purchase` under its shop, employee and customer.
    pub fn add(&mut self, purchase: Purchase) {
        let purchase = Arc::new(purchase);
        self.by_shop
            .entry(purchase.shop().id)
            .or_default()
            .push(Arc::clone(&purchase));
        self.by_employee
            .entry(purchase.employee().id)
            .or_default()
            .push(Arc::clone(&purchase));
        self.by_customer
            .entry(purchase.customer().id)
            .or_default()
            .push(purchase);
    }

    /// Purchases made in `shop`, or an empty slice.
    pub fn by_shop(&self, shop: ShopId) -> &[Arc<Purchase>] {
        self.by_shop.get(&shop).map(Vec::as_slice).unwrap_or_default()
    }

    /// Purchases handled by `employee`, or an empty slice.
    pub fn by_employee(&self, employee: EmployeeId) -> &[Arc<Purchase>] {
        self.by_employee.get(&employee).map(Vec::as_slice).unwrap_or_default()
    }

    /// Purchases made by `customer`, or an empty slice.
    pub fn by_customer(&self, customer: CustomerId) -> &[Arc<Purchase>] {
        self.by_customer.get(&customer).map(Vec::as_slice).unwrap_or_default()
    }

    /// Purchases of every shop matching `predicate`, concatenated in shop id order.
    pub fn by_shops<'a>(&'a self, predicate: impl Fn(&Shop) -> bool) -> Vec<&'a Purchase> {
        self.by_shop
            .values()
            .filter(|list| list.first().is_some_and(|p| predicate(p.shop())))
            .flat_map(|list| list.iter().map(|p| &**p))
            .collect()
    }

    /// Every purchase of the year, grouped by shop.
    pub fn purchases(&self) -> impl Iterator<Item = &Purchase> {
        self.by_shop.values().flatten().map(|p| &**p)
    }

    /// Number of purchases in the partition.
    pub fn len(&self) -> usize {
        self.by_shop.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct customers seen this year, in id order.
    pub fn customers(&self) -> Vec<Customer> {
        self.by_customer
            .values()
            .filter_map(|list| list.first().map(|p| p.customer().clone()))
            .collect()
    }

    /// Empty every view's list, releasing the purchases but keeping the keys.
    pub fn clear(&mut self) {
        for list in self
            .by_shop
            .values_mut()
            .chain(self.by_employee.values_mut())
            .chain(self.by_customer.values_mut())
        {
            list.clear();
            list.shrink_to_fit();
        }
    }
}

/// Bumped whenever the snapshot layout changes.
pub(crate) const SNAPSHOT_VERSION: u16 = 1;

/// Serialized form of a partition. Only the purchases are stored; the three
/// views are rebuilt on decode.
#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
    pub format_version: u16,
    pub year: i32,
    pub purchases: Vec<&'a Purchase>,
}

#[derive(Deserialize)]
pub(crate) struct Snapshot {
    pub format_version: u16,
    pub year: i32,
    pub purchases: Vec<Purchase>,
}

impl YearPartition {
    pub(crate) fn snapshot(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            format_version: SNAPSHOT_VERSION,
            year: self.year,
            purchases: self.purchases().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, City, Employee, Item, Money};
    use chrono::NaiveDate;

    fn purchase(shop: u32, employee: u32, customer: u32, country: &str) -> Purchase {
        let city = City::new(format!("City{shop}"), country);
        Purchase::new(
            Shop::new(shop, format!("Shop {shop}"), city.clone()),
            Employee::new(employee, format!("Emp {employee}")),
            Customer::new(customer, format!("Cust {customer}"), city),
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            vec![Item::new(Book::new(1, "Dune", Money(1_000)), 1).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn add_indexes_every_view_once() {
        let mut p = YearPartition::new(2024);
        p.add(purchase(1, 10, 100, "Austria"));
        p.add(purchase(1, 11, 101, "Austria"));
        p.add(purchase(2, 10, 100, "Germany"));

        assert_eq!(p.len(), 3);
        assert_eq!(p.by_shop(ShopId(1)).len(), 2);
        assert_eq!(p.by_shop(ShopId(2)).len(), 1);
        assert_eq!(p.by_employee(EmployeeId(10)).len(), 2);
        assert_eq!(p.by_customer(CustomerId(101)).len(), 1);

        let employee_total: usize = p.by_employee.values().map(Vec::len).sum();
        let customer_total: usize = p.by_customer.values().map(Vec::len).sum();
        assert_eq!(employee_total, 3);
        assert_eq!(customer_total, 3);
    }

    #[test]
    fn views_share_the_record() {
        let mut p = YearPartition::new(2024);
        p.add(purchase(1, 10, 100, "Austria"));
        let a = &p.by_shop(ShopId(1))[0];
        let b = &p.by_customer(CustomerId(100))[0];
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn unknown_keys_are_empty() {
        let p = YearPartition::new(2024);
        assert!(p.by_shop(ShopId(9)).is_empty());
        assert!(p.by_employee(EmployeeId(9)).is_empty());
        assert!(p.by_customer(CustomerId(9)).is_empty());
        assert!(p.by_shops(|_| true).is_empty());
    }

    #[test]
    fn by_shops_filters_on_shop() {
        let mut p = YearPartition::new(2024);
        p.add(purchase(1, 10, 100, "Austria"));
        p.add(purchase(2, 10, 101, "Germany"));
        p.add(purchase(3, 11, 102, "Austria"));

        let austrian = p.by_shops(|shop| shop.city.country == "Austria");
        assert_eq!(austrian.len(), 2);
        assert!(austrian.iter().all(|p| p.shop().city.country == "Austria"));
    }

    #[test]
    fn customers_are_distinct() {
        let mut p = YearPartition::new(2024);
        p.add(purchase(1, 10, 100, "Austria"));
        p.add(purchase(2, 10, 100, "Austria"));
        p.add(purchase(2, 10, 101, "Austria"));
        let ids: Vec<u32> = p.customers().iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![100, 101]);
    }

    #[test]
    fn clear_empties_lists_but_keeps_keys() {
        let mut p = YearPartition::new(2024);
        p.add(purchase(1, 10, 100, "Austria"));
        p.clear();
        assert!(p.is_empty());
        assert!(p.by_shop.contains_key(&ShopId(1)));
        assert!(p.by_shop(ShopId(1)).is_empty());
        assert!(p.customers().is_empty());
    }
}
