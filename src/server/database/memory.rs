//! in-memory `OrderStore` for tests

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crate::server::database::store::{OrderStore, StoreError};
use crate::server::model::item::{ItemId, NewOrderItem, OrderItem};
use crate::server::model::order::{LocalId, LocalOrdersQuery, NewOrder, Order, OrderId, OrderStatus, OrderSummary, UserId};
use crate::server::model::product::{Product, ProductId};

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub products: BTreeMap<ProductId, Product>,
    pub orders: BTreeMap<OrderId, Order>,
    pub items: BTreeMap<ItemId, OrderItem>,
    next_order_id: OrderId,
    next_item_id: ItemId,
}

impl MemoryStore {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            ..Self::default()
        }
    }

    fn summarize<'a>(&self, orders: impl Iterator<Item = &'a Order>) -> Vec<OrderSummary> {
        let mut summaries = orders
            .map(|o| OrderSummary {
                id: o.id,
                local_id: o.local_id,
                table: o.table.clone(),
                status: o.status,
                total: o.total,
                created_at: o.created_at,
                item_count: self.items_of(o.id).len() as i64,
            })
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        summaries
    }

    pub fn items_of(&self, order_id: OrderId) -> Vec<&OrderItem> {
        self.items.values().filter(|i| i.order_id == order_id).collect()
    }
}

impl OrderStore for MemoryStore {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        self.next_order_id += 1;
        let order = Order {
            id: self.next_order_id,
            local_id: order.local_id,
            table: order.table.clone(),
            user_id: order.user_id,
            status: OrderStatus::Open,
            total: 0,
            created_at: order.created_at,
        };
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).cloned())
    }

    async fn list_orders_by_user(&mut self, user_id: UserId) -> Result<Vec<OrderSummary>, StoreError> {
        Ok(self.summarize(self.orders.values().filter(|o| o.user_id == Some(user_id))))
    }

    async fn list_orders_by_local(&mut self, local_id: LocalId, filter: &LocalOrdersQuery) -> Result<Vec<OrderSummary>, StoreError> {
        Ok(self.summarize(self.orders.values().filter(|o| {
            o.local_id == local_id
                && filter.status.map_or(true, |s| o.status == s)
                && filter.table.as_deref().map_or(true, |t| o.table == t)
        })))
    }

    async fn find_active_order(&mut self, user_id: UserId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders
            .values()
            .filter(|o| o.user_id == Some(user_id) && !o.status.is_terminal())
            .max_by_key(|o| (o.created_at, o.id))
            .cloned())
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.items_of(order_id).into_iter().cloned().collect())
    }

    async fn find_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<Option<OrderItem>, StoreError> {
        Ok(self.items.get(&item_id).filter(|i| i.order_id == order_id).cloned())
    }

    async fn insert_item(&mut self, order_id: OrderId, item: &NewOrderItem) -> Result<OrderItem, StoreError> {
        self.next_item_id += 1;
        let item = OrderItem {
            id: self.next_item_id,
            order_id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            note: item.note.clone(),
            subtotal: item.subtotal,
        };
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<(), StoreError> {
        if let Some(stored) = self.items.get_mut(&item.id).filter(|i| i.order_id == item.order_id) {
            stored.quantity = item.quantity;
            stored.note = item.note.clone();
            stored.subtotal = item.subtotal;
        }
        Ok(())
    }

    async fn delete_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<bool, StoreError> {
        let belongs = self.items.get(&item_id).is_some_and(|i| i.order_id == order_id);
        Ok(belongs && self.items.remove(&item_id).is_some())
    }

    async fn refresh_total(&mut self, order_id: OrderId, _: DateTime<Utc>) -> Result<i64, StoreError> {
        let total: i64 = self.items_of(order_id).iter().map(|i| i.subtotal).sum();
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.total = total;
        }
        Ok(total)
    }

    async fn update_status(&mut self, order_id: OrderId, status: OrderStatus, _: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.status = status;
        }
        Ok(())
    }
}
