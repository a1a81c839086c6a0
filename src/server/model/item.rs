use serde::{Deserialize, Serialize};
use crate::server::model::deserialize_id;
use crate::server::model::order::OrderId;
use crate::server::model::product::ProductId;

pub(crate) type ItemId = i32;

/// Longest note accepted on a line item
pub(crate) const MAX_NOTE_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OrderItem {
    pub id: ItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    #[serde(rename = "producto_id")]
    pub product_id: ProductId,
    #[serde(rename = "producto_nombre")]
    pub product_name: String,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    /// price copied from the product when the item was added
    #[serde(rename = "precio_unitario")]
    pub unit_price: i64,
    #[serde(rename = "observaciones")]
    pub note: Option<String>,
    pub subtotal: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub note: Option<String>,
    pub subtotal: i64,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AddItemRequest {
    #[serde(rename = "productoId", deserialize_with = "deserialize_id")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad", default = "one")]
    pub quantity: i32,
    #[serde(rename = "observaciones", default)]
    pub note: Option<String>,
}

/// Absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpdateItemRequest {
    #[serde(rename = "cantidad")]
    pub quantity: Option<i32>,
    #[serde(rename = "observaciones")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemResponse {
    #[serde(flatten)]
    pub item: OrderItem,
    #[serde(rename = "nuevo_total")]
    pub order_total: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RemovedItemResponse {
    #[serde(rename = "mensaje")]
    pub message: &'static str,
    #[serde(rename = "nuevo_total")]
    pub order_total: i64,
}

impl RemovedItemResponse {
    pub fn new(order_total: i64) -> Self {
        Self { message: "Item eliminado exitosamente", order_total }
    }
}

/// `None` when the product would overflow the total column
pub(crate) fn subtotal(quantity: i32, unit_price: i64) -> Option<i64> {
    i64::from(quantity).checked_mul(unit_price)
}
