//! Sales records held by the ledger.
//!
//! Entities (books, shops, employees, customers) are plain value types keyed
//! by small integer ids. A [`Purchase`] snapshots everything it refers to at
//! sale time, including each item's unit price, so later catalogue changes
//! never rewrite history.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Book`].
    BookId
);
entity_id!(
    /// Identifier of a [`Shop`].
    ShopId
);
entity_id!(
    /// Identifier of an [`Employee`].
    EmployeeId
);
entity_id!(
    /// Identifier of a [`Customer`].
    CustomerId
);

/// A monetary amount in minor currency units (cents).
///
/// Arithmetic saturates at `u64::MAX` instead of overflowing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(pub u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> u64 {
        self.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Mul<u32> for Money {
    type Output = Money;

    fn mul(self, rhs: u32) -> Money {
        Money(self.0.saturating_mul(u64::from(rhs)))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// A city, qualified by its country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub country: String,
}

impl City {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Current list price. Purchases capture their own copy.
    pub price: Money,
}

impl Book {
    pub fn new(id: u32, title: impl Into<String>, price: Money) -> Self {
        Self {
            id: BookId(id),
            title: title.into(),
            price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub city: City,
}

impl Shop {
    pub fn new(id: u32, name: impl Into<String>, city: City) -> Self {
        Self {
            id: ShopId(id),
            name: name.into(),
            city,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
}

impl Employee {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId(id),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub city: City,
}

impl Customer {
    pub fn new(id: u32, name: impl Into<String>, city: City) -> Self {
        Self {
            id: CustomerId(id),
            name: name.into(),
            city,
        }
    }
}

/// One line of a purchase: a book, how many copies, and the unit price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    book: Book,
    amount: u32,
    price: Money,
}

impl Item {
    /// Create an item priced at the book's current list price.
    pub fn new(book: Book, amount: u32) -> Result<Self, ValidationError> {
        let price = book.price;
        Self::with_price(book, amount, price)
    }

    /// Create an item with an explicit unit price (discounts, historical data).
    pub fn with_price(book: Book, amount: u32, price: Money) -> Result<Self, ValidationError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount { book: book.id.get() });
        }
        Ok(Self {
            book,
            amount,
            price,
        })
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    /// Unit price captured at sale time.
    pub fn price(&self) -> Money {
        self.price
    }

    pub fn item_total(&self) -> Money {
        self.price * self.amount
    }
}

/// An immutable sales transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    shop: Shop,
    employee: Employee,
    customer: Customer,
    timestamp: NaiveDateTime,
    items: Vec<Item>,
    #[serde(skip)]
    total: OnceLock<Money>,
}

impl Purchase {
    pub fn new(
        shop: Shop,
        employee: Employee,
        customer: Customer,
        timestamp: NaiveDateTime,
        items: Vec<Item>,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyPurchase);
        }
        Ok(Self {
            shop,
            employee,
            customer,
            timestamp,
            items,
            total: OnceLock::new(),
        })
    }

    pub fn shop(&self) -> &Shop {
        &self.shop
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Calendar year the purchase is partitioned under.
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Sum of all item totals, computed on first use.
    pub fn total(&self) -> Money {
        *self
            .total
            .get_or_init(|| self.items.iter().map(Item::item_total).sum())
    }

    /// Whether the customer lives in a different city than the shop.
    pub fn is_foreign(&self) -> bool {
        self.customer.city != self.shop.city
    }
}

impl PartialEq for Purchase {
    fn eq(&self, other: &Self) -> bool {
        self.shop == other.shop
            && self.employee == other.employee
            && self.customer == other.customer
            && self.timestamp == other.timestamp
            && self.items == other.items
    }
}

impl Eq for Purchase {}

/// Copies of one book sold within some scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSales {
    pub book: Book,
    pub amount: u64,
}

impl BookSales {
    pub fn new(book: Book, amount: u64) -> Self {
        Self { book, amount }
    }
}

impl Ord for BookSales {
    /// Higher amount first; equal amounts fall back to ascending book id.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .amount
            .cmp(&self.amount)
            .then_with(|| self.book.id.cmp(&other.book.id))
    }
}

impl PartialOrd for BookSales {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
