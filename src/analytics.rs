//! Sales analytics over purchase sequences.
//!
//! The functions at the top are pure transforms over `&[&Purchase]` and do no
//! locking; aggregation is parallelised with rayon. The `*_in_year` and
//! `*_in_country` helpers scope a [`PurchaseLedger`] query first and run the
//! matching transform inside it.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::LedgerResult;
use crate::ledger::PurchaseLedger;
use crate::model::{Book, BookId, BookSales, Employee, EmployeeId, Money, Purchase, Shop, ShopId};

/// Revenue attributed to one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeSales {
    pub employee: Employee,
    pub revenue: Money,
}

/// Copies sold per book, best seller first. Ties go to the lower book id.
pub fn best_seller_list(purchases: &[&Purchase]) -> Vec<BookSales> {
    let totals = purchases
        .par_iter()
        .fold(HashMap::<BookId, (&Book, u64)>::new, |mut acc, purchase| {
            for item in purchase.items() {
                acc.entry(item.book().id)
                    .or_insert((item.book(), 0))
                    .1 += u64::from(item.amount());
            }
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (id, (book, amount)) in right {
                left.entry(id).or_insert((book, 0)).1 += amount;
            }
            left
        });

    let mut sales: Vec<BookSales> = totals
        .into_values()
        .map(|(book, amount)| BookSales::new(book.clone(), amount))
        .collect();
    sales.par_sort_unstable();
    sales
}

/// Sum of all purchase totals.
pub fn revenue(purchases: &[&Purchase]) -> Money {
    purchases.par_iter().map(|p| p.total()).sum()
}

/// The employee with the highest revenue, or `None` for an empty sequence.
/// Ties go to the lower employee id.
pub fn employee_of_the_year(purchases: &[&Purchase]) -> Option<EmployeeSales> {
    let totals = purchases
        .par_iter()
        .fold(
            HashMap::<EmployeeId, (&Employee, Money)>::new,
            |mut acc, purchase| {
                acc.entry(purchase.employee().id)
                    .or_insert((purchase.employee(), Money::ZERO))
                    .1 += purchase.total();
                acc
            },
        )
        .reduce(HashMap::new, |mut left, right| {
            for (id, (employee, revenue)) in right {
                left.entry(id).or_insert((employee, Money::ZERO)).1 += revenue;
            }
            left
        });

    totals
        .into_iter()
        .max_by(|(a_id, (_, a)), (b_id, (_, b))| a.cmp(b).then_with(|| b_id.cmp(a_id)))
        .map(|(_, (employee, revenue))| EmployeeSales {
            employee: employee.clone(),
            revenue,
        })
}

/// Purchases whose customer lives in a different city than the shop.
pub fn purchases_of_foreigners<'a>(purchases: &[&'a Purchase]) -> Vec<&'a Purchase> {
    purchases.iter().copied().filter(|p| p.is_foreign()).collect()
}

pub fn count_purchases_of_foreigners(purchases: &[&Purchase]) -> usize {
    purchases.par_iter().filter(|p| p.is_foreign()).count()
}

fn in_country(country: &str) -> impl Fn(&Shop) -> bool + '_ {
    move |shop: &Shop| shop.city.country == country
}

fn owned(purchases: Vec<&Purchase>) -> Vec<Purchase> {
    purchases.into_iter().cloned().collect()
}

pub fn best_sellers_in_year(ledger: &PurchaseLedger, year: i32) -> LedgerResult<Vec<BookSales>> {
    ledger.compute_by_year(year, best_seller_list)
}

/// Best sellers across all shops located in `country`.
pub fn best_sellers_in_country(
    ledger: &PurchaseLedger,
    country: &str,
    year: i32,
) -> LedgerResult<Vec<BookSales>> {
    ledger.compute_by_shops_and_year(in_country(country), year, best_seller_list)
}

pub fn revenue_of_shop_in_year(ledger: &PurchaseLedger, shop: ShopId, year: i32) -> LedgerResult<Money> {
    ledger.compute_by_shop_and_year(shop, year, revenue)
}

pub fn employee_of_the_year_in(ledger: &PurchaseLedger, year: i32) -> LedgerResult<Option<EmployeeSales>> {
    ledger.compute_by_year(year, employee_of_the_year)
}

pub fn employee_of_the_year_in_country(
    ledger: &PurchaseLedger,
    country: &str,
    year: i32,
) -> LedgerResult<Option<EmployeeSales>> {
    ledger.compute_by_shops_and_year(in_country(country), year, employee_of_the_year)
}

/// Foreign purchases of `year`, cloned out of the ledger.
pub fn purchases_of_foreigners_in_year(ledger: &PurchaseLedger, year: i32) -> LedgerResult<Vec<Purchase>> {
    ledger.compute_by_year(year, |purchases| owned(purchases_of_foreigners(purchases)))
}

pub fn purchases_of_foreigners_in_country(
    ledger: &PurchaseLedger,
    country: &str,
    year: i32,
) -> LedgerResult<Vec<Purchase>> {
    ledger.compute_by_shops_and_year(in_country(country), year, |purchases| {
        owned(purchases_of_foreigners(purchases))
    })
}

pub fn count_purchases_of_foreigners_in_year(ledger: &PurchaseLedger, year: i32) -> LedgerResult<usize> {
    ledger.compute_by_year(year, count_purchases_of_foreigners)
}

pub fn count_purchases_of_foreigners_in_country(
    ledger: &PurchaseLedger,
    country: &str,
    year: i32,
) -> LedgerResult<usize> {
    ledger.compute_by_shops_and_year(in_country(country), year, count_purchases_of_foreigners)
}
