use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use crate::server::model::item::{ItemId, NewOrderItem, OrderItem};
use crate::server::model::order::{LocalId, LocalOrdersQuery, NewOrder, Order, OrderId, OrderStatus, OrderSummary, UserId};
use crate::server::model::product::{Product, ProductId};

#[derive(Debug, Display, Error)]
pub(crate) enum StoreError {
    #[display("database error: {source}")]
    Db { source: tokio_postgres::Error },
    #[display("unexpected value {value:?} in column {column}")]
    Decode { column: &'static str, value: String },
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(source: tokio_postgres::Error) -> Self {
        StoreError::Db { source }
    }
}

pub(crate) fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T, StoreError> {
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(StoreError::Decode { column, value }),
    }
}

/// Persistence needed by the order flows. One instance spans one transaction.
pub(crate) trait OrderStore {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// the new order starts `open` with a zero total
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// newest first
    async fn list_orders_by_user(&mut self, user_id: UserId) -> Result<Vec<OrderSummary>, StoreError>;

    /// a venue's orders, newest first, narrowed by the optional filters
    async fn list_orders_by_local(&mut self, local_id: LocalId, filter: &LocalOrdersQuery) -> Result<Vec<OrderSummary>, StoreError>;

    /// the user's newest order that is neither closed nor cancelled
    async fn find_active_order(&mut self, user_id: UserId) -> Result<Option<Order>, StoreError>;

    /// items enriched with product names, ordered by id
    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    async fn find_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<Option<OrderItem>, StoreError>;

    async fn insert_item(&mut self, order_id: OrderId, item: &NewOrderItem) -> Result<OrderItem, StoreError>;

    /// persist quantity, note and subtotal of an existing item
    async fn update_item(&mut self, item: &OrderItem) -> Result<(), StoreError>;

    /// `false` when no such item belongs to the order
    async fn delete_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<bool, StoreError>;

    /// set the order total to the sum of its item subtotals and return it
    async fn refresh_total(&mut self, order_id: OrderId, updated_at: DateTime<Utc>) -> Result<i64, StoreError>;

    async fn update_status(&mut self, order_id: OrderId, status: OrderStatus, updated_at: DateTime<Utc>) -> Result<(), StoreError>;
}
