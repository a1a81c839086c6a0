use chrono::{DateTime, Utc};
use tokio_postgres::{Row, Transaction};
use tokio_postgres::types::ToSql;
use crate::server::database::store::{parse_column, OrderStore, StoreError};
use crate::server::model::item::{ItemId, NewOrderItem, OrderItem};
use crate::server::model::order::{LocalId, LocalOrdersQuery, NewOrder, Order, OrderId, OrderStatus, OrderSummary, UserId};
use crate::server::model::product::{Product, ProductId};

const ORDER_COLUMNS: &str = "id, local_id, table_label, user_id, status, total, created_at";

const SUMMARY_SELECT: &str = r#"
    SELECT o.id, o.local_id, o.table_label, o.status, o.total, o.created_at,
           COUNT(oi.id) AS item_count
    FROM orders o
    LEFT JOIN order_item oi
    ON oi.order_id = o.id
"#;

const SUMMARY_ORDER: &str = "GROUP BY o.id ORDER BY o.created_at DESC, o.id DESC";

const ITEM_SELECT: &str = r#"
    SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
           oi.quantity, oi.unit_price, oi.note, oi.subtotal
    FROM order_item oi
    JOIN product p
    ON p.id = oi.product_id
"#;

/// `OrderStore` backed by an open postgres transaction
pub(crate) struct PgStore<'a> {
    txn: &'a Transaction<'a>,
}

impl<'a> PgStore<'a> {
    pub fn new(txn: &'a Transaction<'a>) -> Self {
        Self { txn }
    }
}

fn product_from_row(row: &Row) -> Result<Product, StoreError> {
    Ok(Product {
        id: row.try_get("id")?,
        local_id: row.try_get("local_id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        status: parse_column("status", row.try_get("status")?)?,
    })
}

fn order_from_row(row: &Row) -> Result<Order, StoreError> {
    Ok(Order {
        id: row.try_get("id")?,
        local_id: row.try_get("local_id")?,
        table: row.try_get("table_label")?,
        user_id: row.try_get("user_id")?,
        status: parse_column("status", row.try_get("status")?)?,
        total: row.try_get("total")?,
        created_at: row.try_get("created_at")?,
    })
}

fn summary_from_row(row: &Row) -> Result<OrderSummary, StoreError> {
    Ok(OrderSummary {
        id: row.try_get("id")?,
        local_id: row.try_get("local_id")?,
        table: row.try_get("table_label")?,
        status: parse_column("status", row.try_get("status")?)?,
        total: row.try_get("total")?,
        created_at: row.try_get("created_at")?,
        item_count: row.try_get("item_count")?,
    })
}

fn item_from_row(row: &Row) -> Result<OrderItem, StoreError> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        note: row.try_get("note")?,
        subtotal: row.try_get("subtotal")?,
    })
}

impl OrderStore for PgStore<'_> {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.txn
            .query_opt("SELECT id, local_id, name, price, status FROM product WHERE id = $1", &[&id])
            .await?
            .as_ref()
            .map(product_from_row)
            .transpose()
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let status = OrderStatus::Open.to_string();
        let params: &[&(dyn ToSql + Sync)] = &[
            &order.local_id,
            &order.table,
            &order.user_id,
            &status,
            &order.created_at,
        ];
        let row = self.txn
            .query_one(
                format!(r#"
                INSERT INTO orders(local_id, table_label, user_id, status, total, created_at, updated_at)
                VALUES ($1, $2, $3, $4, 0, $5, $5)
                RETURNING {ORDER_COLUMNS}
            "#).as_str(),
                params,
            )
            .await?;
        order_from_row(&row)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.txn
            .query_opt(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1").as_str(), &[&id])
            .await?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    async fn list_orders_by_user(&mut self, user_id: UserId) -> Result<Vec<OrderSummary>, StoreError> {
        let rows = self.txn
            .query(format!("{SUMMARY_SELECT} WHERE o.user_id = $1 {SUMMARY_ORDER}").as_str(), &[&user_id])
            .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn list_orders_by_local(&mut self, local_id: LocalId, filter: &LocalOrdersQuery) -> Result<Vec<OrderSummary>, StoreError> {
        let status = filter.status.map(|s| s.to_string());
        let params: &[&(dyn ToSql + Sync)] = &[&local_id, &status, &filter.table];
        let rows = self.txn
            .query(
                format!(r#"
                {SUMMARY_SELECT}
                WHERE o.local_id = $1
                AND ($2::TEXT IS NULL OR o.status = $2)
                AND ($3::TEXT IS NULL OR o.table_label = $3)
                {SUMMARY_ORDER}
            "#).as_str(),
                params,
            )
            .await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn find_active_order(&mut self, user_id: UserId) -> Result<Option<Order>, StoreError> {
        self.txn
            .query_opt(
                format!(r#"
                SELECT {ORDER_COLUMNS}
                FROM orders
                WHERE user_id = $1
                AND status NOT IN ('{}', '{}')
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            "#, OrderStatus::Closed, OrderStatus::Cancelled).as_str(),
                &[&user_id],
            )
            .await?
            .as_ref()
            .map(order_from_row)
            .transpose()
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let rows = self.txn
            .query(format!("{ITEM_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id").as_str(), &[&order_id])
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn find_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<Option<OrderItem>, StoreError> {
        self.txn
            .query_opt(
                format!("{ITEM_SELECT} WHERE oi.order_id = $1 AND oi.id = $2").as_str(),
                &[&order_id, &item_id],
            )
            .await?
            .as_ref()
            .map(item_from_row)
            .transpose()
    }

    async fn insert_item(&mut self, order_id: OrderId, item: &NewOrderItem) -> Result<OrderItem, StoreError> {
        let params: &[&(dyn ToSql + Sync)] = &[
            &order_id,
            &item.product_id,
            &item.quantity,
            &item.unit_price,
            &item.note,
            &item.subtotal,
        ];
        let row = self.txn
            .query_one(r#"
                INSERT INTO order_item(order_id, product_id, quantity, unit_price, note, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
            "#, params)
            .await?;
        Ok(OrderItem {
            id: row.try_get("id")?,
            order_id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            note: item.note.clone(),
            subtotal: item.subtotal,
        })
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<(), StoreError> {
        let params: &[&(dyn ToSql + Sync)] = &[
            &item.id,
            &item.order_id,
            &item.quantity,
            &item.note,
            &item.subtotal,
        ];
        self.txn
            .execute(r#"
                UPDATE order_item
                SET quantity = $3, note = $4, subtotal = $5
                WHERE id = $1 AND order_id = $2
            "#, params)
            .await?;
        Ok(())
    }

    async fn delete_item(&mut self, order_id: OrderId, item_id: ItemId) -> Result<bool, StoreError> {
        let deleted = self.txn
            .execute("DELETE FROM order_item WHERE order_id = $1 AND id = $2", &[&order_id, &item_id])
            .await?;
        Ok(deleted > 0)
    }

    async fn refresh_total(&mut self, order_id: OrderId, updated_at: DateTime<Utc>) -> Result<i64, StoreError> {
        let row = self.txn
            .query_one(r#"
                UPDATE orders
                SET total = COALESCE((SELECT SUM(subtotal) FROM order_item WHERE order_id = $1), 0)::BIGINT,
                    updated_at = $2
                WHERE id = $1
                RETURNING total
            "#, &[&order_id, &updated_at])
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn update_status(&mut self, order_id: OrderId, status: OrderStatus, updated_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.txn
            .execute(
                "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1",
                &[&order_id, &status.to_string(), &updated_at],
            )
            .await?;
        Ok(())
    }
}
