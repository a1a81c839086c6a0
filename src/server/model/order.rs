use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::server::model::{deserialize_id, serialize_id_str};
use crate::server::model::item::OrderItem;
use crate::server::model::product::ProductId;
use crate::server::util::time::serialize_timestamp;

pub(crate) type OrderId = i32;
pub(crate) type LocalId = i32;
pub(crate) type UserId = i32;

/// Longest table label accepted, matches the column width
pub(crate) const MAX_TABLE_LEN: usize = 50;

/// Display/FromStr give the stored value, serde gives the wire value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub(crate) enum OrderStatus {
    #[display("open")]
    #[serde(rename = "abierto")]
    Open,
    #[display("in_preparation")]
    #[serde(rename = "en_preparacion")]
    InPreparation,
    #[display("served")]
    #[serde(rename = "servido")]
    Served,
    #[display("closed")]
    #[serde(rename = "cerrado")]
    Closed,
    #[display("cancelled")]
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// closed and cancelled orders accept no further changes
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Cancelled) => true,
            (Open, InPreparation)
            | (InPreparation, Served)
            | (Served, InPreparation)
            | (Served, Closed) => true,
            _ => false,
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_preparation" => Ok(Self::InPreparation),
            "served" => Ok(Self::Served),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(format!("Invalid OrderStatus: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Order {
    pub id: OrderId,
    pub local_id: LocalId,
    #[serde(rename = "mesa_numero")]
    pub table: String,
    #[serde(rename = "usuario_id")]
    pub user_id: Option<UserId>,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    /// always the sum of the item subtotals, in minor currency units
    pub total: i64,
    #[serde(rename = "creado_el", serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewOrder {
    pub local_id: LocalId,
    pub table: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderSummary {
    pub id: OrderId,
    #[serde(rename = "localId")]
    pub local_id: LocalId,
    #[serde(rename = "mesaNumero")]
    pub table: String,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    pub total: i64,
    #[serde(rename = "creado_el", serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "items_count")]
    pub item_count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Staff filters over a venue's orders
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LocalOrdersQuery {
    #[serde(rename = "estado")]
    pub status: Option<OrderStatus>,
    #[serde(rename = "mesa")]
    pub table: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveOrder {
    #[serde(rename = "pedido_id")]
    pub id: OrderId,
    #[serde(rename = "localId")]
    pub local_id: LocalId,
    #[serde(rename = "mesaNumero")]
    pub table: String,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    pub total: i64,
}

impl From<Order> for ActiveOrder {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            local_id: order.local_id,
            table: order.table,
            status: order.status,
            total: order.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveOrderResponse {
    #[serde(rename = "tiene_pedido")]
    pub has_order: bool,
    #[serde(flatten)]
    pub order: Option<ActiveOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateOrderRequest {
    #[serde(rename = "localId", deserialize_with = "deserialize_id")]
    pub local_id: LocalId,
    #[serde(rename = "mesaNumero")]
    pub table: String,
    pub items: Vec<CreateOrderItem>,
    /// client side total, compared but never persisted
    pub total: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateOrderItem {
    #[serde(rename = "productoId", deserialize_with = "deserialize_id")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    #[serde(rename = "precio")]
    pub unit_price: i64,
    #[serde(rename = "comentario", default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateOrderResponse {
    #[serde(rename = "pedidoId")]
    pub order_id: OrderId,
    pub id: OrderId,
    #[serde(rename = "localId", serialize_with = "serialize_id_str")]
    pub local_id: LocalId,
    #[serde(rename = "mesaNumero")]
    pub table: String,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
    pub total: i64,
}

impl From<Order> for CreateOrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            id: order.id,
            local_id: order.local_id,
            table: order.table,
            status: order.status,
            total: order.total,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StatusChangeRequest {
    #[serde(rename = "estado")]
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusChangeResponse {
    pub id: OrderId,
    #[serde(rename = "estado_anterior")]
    pub previous_status: OrderStatus,
    #[serde(rename = "estado")]
    pub status: OrderStatus,
}
