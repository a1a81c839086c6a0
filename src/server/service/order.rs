//! Order and line item flows.
//!
//! Every function runs against one `OrderStore`, i.e. one transaction. Any
//! mutation of an order's items ends with `refresh_total`, so the stored
//! total always equals the sum of the current item subtotals.

use derive_more::{Display, Error};
use log::{info, warn};
use crate::server::database::store::{OrderStore, StoreError};
use crate::server::model::item::{
    subtotal, AddItemRequest, ItemId, ItemResponse, NewOrderItem, RemovedItemResponse,
    UpdateItemRequest, MAX_NOTE_LEN,
};
use crate::server::model::order::{
    ActiveOrderResponse, CreateOrderRequest, CreateOrderResponse, LocalId, LocalOrdersQuery,
    NewOrder, Order, OrderDetail, OrderId, OrderSummary, StatusChangeRequest, StatusChangeResponse,
    UserId, MAX_TABLE_LEN,
};
use crate::server::model::product::{Product, ProductId};
use crate::server::util::time;

#[derive(Debug, Display, Error)]
pub(crate) enum OrderError {
    /// malformed input
    #[display("{message}")]
    Validation { message: String },
    #[display("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    /// well formed, but breaks a business rule
    #[display("{message}")]
    Rejected { message: String },
    /// the order belongs to someone else
    #[display("{message}")]
    Forbidden { message: String },
    #[display("{source}")]
    Store { source: StoreError },
}

impl From<StoreError> for OrderError {
    fn from(source: StoreError) -> Self {
        OrderError::Store { source }
    }
}

fn invalid(message: impl Into<String>) -> OrderError {
    OrderError::Validation { message: message.into() }
}

fn rejected(message: impl Into<String>) -> OrderError {
    OrderError::Rejected { message: message.into() }
}

fn ensure_quantity(quantity: i32) -> Result<(), OrderError> {
    if quantity < 1 {
        return Err(invalid(format!("quantity must be at least 1, got {quantity}")));
    }
    Ok(())
}

fn ensure_table(table: &str) -> Result<(), OrderError> {
    if table.is_empty() {
        return Err(invalid("table must not be empty"));
    }
    if table.chars().count() > MAX_TABLE_LEN {
        return Err(invalid(format!("table must be at most {MAX_TABLE_LEN} characters")));
    }
    Ok(())
}

/// blank notes are stored as no note
fn normalize_note(note: &str) -> Result<Option<String>, OrderError> {
    let note = note.trim();
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(invalid(format!("note must be at most {MAX_NOTE_LEN} characters")));
    }
    Ok((!note.is_empty()).then(|| note.to_string()))
}

fn line_subtotal(quantity: i32, unit_price: i64) -> Result<i64, OrderError> {
    subtotal(quantity, unit_price).ok_or_else(|| invalid("item subtotal is too large"))
}

/// the order total once `removed` leaves it and `added` joins it
fn next_total(total: i64, removed: i64, added: i64) -> Result<i64, OrderError> {
    total
        .checked_sub(removed)
        .and_then(|t| t.checked_add(added))
        .ok_or_else(|| invalid("order total is too large"))
}

/// the product must exist, be sold at the order's venue and be available
async fn orderable_product<S: OrderStore>(store: &mut S, product_id: ProductId, local_id: LocalId) -> Result<Product, OrderError> {
    let product = store
        .find_product(product_id)
        .await?
        .ok_or(OrderError::NotFound { entity: "product", id: product_id })?;
    if product.local_id != local_id {
        return Err(rejected(format!("product {product_id} is not sold at local {local_id}")));
    }
    if !product.is_available() {
        return Err(rejected(format!("product {product_id} is not available ({})", product.status)));
    }
    Ok(product)
}

fn new_item(product: Product, quantity: i32, note: Option<String>) -> Result<NewOrderItem, OrderError> {
    Ok(NewOrderItem {
        subtotal: line_subtotal(quantity, product.price)?,
        product_id: product.id,
        product_name: product.name,
        quantity,
        unit_price: product.price,
        note,
    })
}

async fn find_order<S: OrderStore>(store: &mut S, order_id: OrderId) -> Result<Order, OrderError> {
    store
        .find_order(order_id)
        .await?
        .ok_or(OrderError::NotFound { entity: "order", id: order_id })
}

/// An order whose items may still change. Anonymous callers are staff,
/// identified callers may only touch their own orders.
async fn editable_order<S: OrderStore>(store: &mut S, order_id: OrderId, caller: Option<UserId>) -> Result<Order, OrderError> {
    let order = find_order(store, order_id).await?;
    if let (Some(caller), Some(owner)) = (caller, order.user_id) {
        if caller != owner {
            warn!("user {} tried to modify order {} owned by {}", caller, order_id, owner);
            return Err(OrderError::Forbidden { message: format!("order {order_id} belongs to another user") });
        }
    }
    if order.status.is_terminal() {
        return Err(rejected(format!("order {order_id} is already {}", order.status)));
    }
    Ok(order)
}

/// Open an order with its first items. Prices come from the products, the
/// client's unit prices and total are only compared.
pub(crate) async fn create_order<S: OrderStore>(
    store: &mut S,
    user_id: Option<UserId>,
    req: CreateOrderRequest,
) -> Result<CreateOrderResponse, OrderError> {
    let table = req.table.trim();
    ensure_table(table)?;
    if req.items.is_empty() {
        return Err(invalid("order must contain at least one item"));
    }
    if req.total <= 0 {
        return Err(invalid(format!("total must be positive, got {}", req.total)));
    }

    // validate everything before the first write
    let mut new_items = Vec::with_capacity(req.items.len());
    let mut total = 0;
    for item in &req.items {
        ensure_quantity(item.quantity)?;
        if item.unit_price <= 0 {
            return Err(invalid(format!("unit price must be positive, got {}", item.unit_price)));
        }
        let note = match item.note.as_deref() {
            Some(note) => normalize_note(note)?,
            None => None,
        };
        let product = orderable_product(store, item.product_id, req.local_id).await?;
        if product.price != item.unit_price {
            warn!(
                "unit price mismatch for product {}, client={} server={}",
                product.id, item.unit_price, product.price
            );
        }
        let line = new_item(product, item.quantity, note)?;
        total = next_total(total, 0, line.subtotal)?;
        new_items.push(line);
    }

    let order = store
        .insert_order(&NewOrder {
            local_id: req.local_id,
            table: table.to_string(),
            user_id,
            created_at: time::helper::get_utc_now(),
        })
        .await?;
    for item in &new_items {
        store.insert_item(order.id, item).await?;
    }
    let total = store.refresh_total(order.id, order.created_at).await?;
    if total != req.total {
        warn!("order {} total mismatch, client={} server={}", order.id, req.total, total);
    }
    info!("order {} created for local={} table={} with {} items", order.id, order.local_id, order.table, new_items.len());

    Ok(Order { total, ..order }.into())
}

pub(crate) async fn get_order<S: OrderStore>(store: &mut S, order_id: OrderId) -> Result<OrderDetail, OrderError> {
    let order = find_order(store, order_id).await?;
    let items = store.list_items(order_id).await?;
    Ok(OrderDetail { order, items })
}

pub(crate) async fn list_orders_for_user<S: OrderStore>(store: &mut S, user_id: UserId) -> Result<Vec<OrderSummary>, OrderError> {
    Ok(store.list_orders_by_user(user_id).await?)
}

/// The caller's newest order still in progress, if any.
pub(crate) async fn active_order_for_user<S: OrderStore>(store: &mut S, user_id: UserId) -> Result<ActiveOrderResponse, OrderError> {
    let order = store.find_active_order(user_id).await?;
    Ok(ActiveOrderResponse {
        has_order: order.is_some(),
        order: order.map(Into::into),
    })
}

pub(crate) async fn list_orders_for_local<S: OrderStore>(
    store: &mut S,
    local_id: LocalId,
    filter: LocalOrdersQuery,
) -> Result<Vec<OrderSummary>, OrderError> {
    let filter = LocalOrdersQuery {
        table: filter.table.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        ..filter
    };
    Ok(store.list_orders_by_local(local_id, &filter).await?)
}

/// Append one item, priced from the product as it is now.
pub(crate) async fn add_item<S: OrderStore>(
    store: &mut S,
    caller: Option<UserId>,
    order_id: OrderId,
    req: AddItemRequest,
) -> Result<ItemResponse, OrderError> {
    ensure_quantity(req.quantity)?;
    let note = match req.note.as_deref() {
        Some(note) => normalize_note(note)?,
        None => None,
    };
    let order = editable_order(store, order_id, caller).await?;
    let product = orderable_product(store, req.product_id, order.local_id).await?;
    let line = new_item(product, req.quantity, note)?;
    next_total(order.total, 0, line.subtotal)?;

    let item = store.insert_item(order_id, &line).await?;
    let order_total = store.refresh_total(order_id, time::helper::get_utc_now()).await?;
    info!("item {} added to order {}, total={}", item.id, order_id, order_total);
    Ok(ItemResponse { item, order_total })
}

/// Partial update, absent fields keep their value. The unit price snapshot never changes.
pub(crate) async fn update_item<S: OrderStore>(
    store: &mut S,
    caller: Option<UserId>,
    order_id: OrderId,
    item_id: ItemId,
    req: UpdateItemRequest,
) -> Result<ItemResponse, OrderError> {
    if let Some(quantity) = req.quantity {
        ensure_quantity(quantity)?;
    }
    let order = editable_order(store, order_id, caller).await?;
    let mut item = store
        .find_item(order_id, item_id)
        .await?
        .ok_or(OrderError::NotFound { entity: "item", id: item_id })?;

    if let Some(quantity) = req.quantity {
        let subtotal = line_subtotal(quantity, item.unit_price)?;
        next_total(order.total, item.subtotal, subtotal)?;
        item.quantity = quantity;
        item.subtotal = subtotal;
    }
    if let Some(note) = req.note.as_deref() {
        item.note = normalize_note(note)?;
    }
    store.update_item(&item).await?;
    let order_total = store.refresh_total(order_id, time::helper::get_utc_now()).await?;
    Ok(ItemResponse { item, order_total })
}

pub(crate) async fn remove_item<S: OrderStore>(
    store: &mut S,
    caller: Option<UserId>,
    order_id: OrderId,
    item_id: ItemId,
) -> Result<RemovedItemResponse, OrderError> {
    editable_order(store, order_id, caller).await?;
    if !store.delete_item(order_id, item_id).await? {
        return Err(OrderError::NotFound { entity: "item", id: item_id });
    }
    let order_total = store.refresh_total(order_id, time::helper::get_utc_now()).await?;
    info!("item {} removed from order {}, total={}", item_id, order_id, order_total);
    Ok(RemovedItemResponse::new(order_total))
}

pub(crate) async fn change_status<S: OrderStore>(
    store: &mut S,
    order_id: OrderId,
    req: StatusChangeRequest,
) -> Result<StatusChangeResponse, OrderError> {
    let order = find_order(store, order_id).await?;
    if !order.status.can_transition_to(req.status) {
        return Err(rejected(format!("order {order_id} cannot move from {} to {}", order.status, req.status)));
    }
    store.update_status(order_id, req.status, time::helper::get_utc_now()).await?;
    info!("order {} moved from {} to {}", order_id, order.status, req.status);
    Ok(StatusChangeResponse {
        id: order_id,
        previous_status: order.status,
        status: req.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::database::memory::MemoryStore;
    use crate::server::model::order::{CreateOrderItem, OrderStatus};
    use crate::server::model::product::ProductStatus;

    const LOCAL: LocalId = 1;
    const USER: UserId = 42;
    /// 2^62, two of them overflow an i64
    const HUGE: i64 = i64::MAX / 2 + 1;
    /// 2^61
    const BIG: i64 = i64::MAX / 4 + 1;

    fn product(id: ProductId, name: &str, price: i64, status: ProductStatus) -> Product {
        Product { id, local_id: LOCAL, name: name.to_string(), price, status }
    }

    fn menu() -> MemoryStore {
        let mut other_local = product(4, "Pisco sour", 4_000, ProductStatus::Available);
        other_local.local_id = LOCAL + 1;
        MemoryStore::with_products(vec![
            product(1, "Empanada", 2_500, ProductStatus::Available),
            product(2, "Cazuela", 6_900, ProductStatus::Available),
            product(3, "Completo", 1_800, ProductStatus::SoldOut),
            other_local,
            product(5, "Caviar", HUGE, ProductStatus::Available),
            product(6, "Trufa", BIG, ProductStatus::Available),
        ])
    }

    fn line(product_id: ProductId, quantity: i32, unit_price: i64) -> CreateOrderItem {
        CreateOrderItem { product_id, quantity, unit_price, note: None }
    }

    fn create_request(items: Vec<CreateOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest { local_id: LOCAL, table: "A3".to_string(), items, total: 1 }
    }

    fn add(product_id: ProductId, quantity: i32) -> AddItemRequest {
        AddItemRequest { product_id, quantity, note: None }
    }

    fn set_quantity(quantity: i32) -> UpdateItemRequest {
        UpdateItemRequest { quantity: Some(quantity), note: None }
    }

    async fn open_order(store: &mut MemoryStore) -> OrderId {
        create_order(store, Some(USER), create_request(vec![line(1, 2, 2_500)]))
            .await
            .unwrap()
            .id
    }

    fn assert_total_consistent(store: &MemoryStore, order_id: OrderId) {
        let sum: i64 = store.items_of(order_id).iter().map(|i| i.subtotal).sum();
        assert_eq!(store.orders[&order_id].total, sum);
    }

    #[tokio::test]
    async fn create_computes_total_from_product_prices() {
        let mut store = menu();
        let mut req = create_request(vec![line(1, 2, 2_500), line(2, 1, 1)]);
        req.items[0].note = Some("  sin cebolla ".to_string());
        req.total = 123;

        let created = create_order(&mut store, Some(USER), req).await.unwrap();

        assert_eq!(created.id, created.order_id);
        assert_eq!(created.total, 2 * 2_500 + 6_900);
        assert_eq!(created.status, OrderStatus::Open);
        assert_eq!(created.table, "A3");
        let order = &store.orders[&created.id];
        assert_eq!(order.user_id, Some(USER));
        let items = store.items_of(created.id);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].note.as_deref(), Some("sin cebolla"));
        assert_eq!(items[1].unit_price, 6_900);
        assert_eq!(items[1].product_name, "Cazuela");
        assert_total_consistent(&store, created.id);
    }

    #[tokio::test]
    async fn create_rejects_bad_input_without_writing() {
        let mut store = menu();

        let empty = create_order(&mut store, None, create_request(vec![])).await;
        assert!(matches!(empty, Err(OrderError::Validation { .. })));

        let mut blank_table = create_request(vec![line(1, 1, 2_500)]);
        blank_table.table = "   ".to_string();
        assert!(matches!(create_order(&mut store, None, blank_table).await, Err(OrderError::Validation { .. })));

        let zero = create_order(&mut store, None, create_request(vec![line(1, 0, 2_500)])).await;
        assert!(matches!(zero, Err(OrderError::Validation { .. })));

        let free = create_order(&mut store, None, create_request(vec![line(1, 1, 0)])).await;
        assert!(matches!(free, Err(OrderError::Validation { .. })));

        let mut no_total = create_request(vec![line(1, 1, 2_500)]);
        no_total.total = 0;
        assert!(matches!(create_order(&mut store, None, no_total).await, Err(OrderError::Validation { .. })));

        let missing = create_order(&mut store, None, create_request(vec![line(1, 1, 2_500), line(99, 1, 100)])).await;
        assert!(matches!(missing, Err(OrderError::NotFound { entity: "product", id: 99 })));

        let sold_out = create_order(&mut store, None, create_request(vec![line(3, 1, 1_800)])).await;
        assert!(matches!(sold_out, Err(OrderError::Rejected { .. })));

        let elsewhere = create_order(&mut store, None, create_request(vec![line(4, 1, 4_000)])).await;
        assert!(matches!(elsewhere, Err(OrderError::Rejected { .. })));

        assert!(store.orders.is_empty());
        assert!(store.items.is_empty());
    }

    #[tokio::test]
    async fn table_label_fits_its_column() {
        let mut store = menu();

        let mut too_long = create_request(vec![line(1, 1, 2_500)]);
        too_long.table = "T".repeat(MAX_TABLE_LEN + 1);
        let res = create_order(&mut store, None, too_long).await;
        assert!(matches!(res, Err(OrderError::Validation { .. })));
        assert!(store.orders.is_empty());

        let mut widest = create_request(vec![line(1, 1, 2_500)]);
        widest.table = format!("  {}  ", "ñ".repeat(MAX_TABLE_LEN));
        let created = create_order(&mut store, None, widest).await.unwrap();
        assert_eq!(created.table.chars().count(), MAX_TABLE_LEN);
    }

    #[tokio::test]
    async fn create_rejects_total_overflow_without_writing() {
        let mut store = menu();
        let res = create_order(&mut store, None, create_request(vec![line(5, 1, HUGE), line(5, 1, HUGE)])).await;
        assert!(matches!(res, Err(OrderError::Validation { .. })));
        assert!(store.orders.is_empty());
        assert!(store.items.is_empty());
    }

    #[tokio::test]
    async fn item_changes_reject_total_overflow() {
        let mut store = menu();
        let order_id = create_order(&mut store, None, create_request(vec![line(5, 1, HUGE), line(6, 1, BIG)]))
            .await
            .unwrap()
            .id;
        let truffle = store.items_of(order_id)[1].id;
        let before = store.orders[&order_id].total;
        assert_eq!(before, HUGE + BIG);

        let add_res = add_item(&mut store, None, order_id, add(5, 1)).await;
        assert!(matches!(add_res, Err(OrderError::Validation { .. })));

        // each line still fits, the sum does not
        let update = update_item(&mut store, None, order_id, truffle, set_quantity(2)).await;
        assert!(matches!(update, Err(OrderError::Validation { .. })));

        assert_eq!(store.items_of(order_id).len(), 2);
        assert_eq!(store.items[&truffle].quantity, 1);
        assert_eq!(store.orders[&order_id].total, before);
        assert_total_consistent(&store, order_id);
    }

    #[tokio::test]
    async fn get_order_lists_items_with_names() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        add_item(&mut store, None, order_id, add(2, 1)).await.unwrap();

        let detail = get_order(&mut store, order_id).await.unwrap();
        assert_eq!(detail.order.id, order_id);
        assert_eq!(detail.items.iter().map(|i| i.product_name.as_str()).collect::<Vec<_>>(), ["Empanada", "Cazuela"]);
        assert_eq!(detail.order.total, 5_000 + 6_900);
    }

    #[tokio::test]
    async fn get_missing_order_is_not_found() {
        let mut store = menu();
        assert!(matches!(
            get_order(&mut store, 404).await,
            Err(OrderError::NotFound { entity: "order", id: 404 })
        ));
    }

    #[tokio::test]
    async fn list_returns_only_own_orders_newest_first() {
        let mut store = menu();
        time::helper::set_utc_now(100);
        let first = open_order(&mut store).await;
        time::helper::set_utc_now(200);
        let second = open_order(&mut store).await;
        create_order(&mut store, Some(USER + 1), create_request(vec![line(2, 1, 6_900)])).await.unwrap();
        create_order(&mut store, None, create_request(vec![line(2, 1, 6_900)])).await.unwrap();
        time::helper::set_utc_now(0);

        let mine = list_orders_for_user(&mut store, USER).await.unwrap();
        assert_eq!(mine.iter().map(|o| o.id).collect::<Vec<_>>(), [second, first]);
        assert!(mine.iter().all(|o| o.item_count == 1 && o.total == 5_000));

        assert!(list_orders_for_user(&mut store, 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_order_is_newest_unfinished_one() {
        let mut store = menu();
        let none = active_order_for_user(&mut store, USER).await.unwrap();
        assert!(!none.has_order && none.order.is_none());

        time::helper::set_utc_now(100);
        let older = open_order(&mut store).await;
        time::helper::set_utc_now(200);
        let newer = open_order(&mut store).await;
        time::helper::set_utc_now(0);

        let active = active_order_for_user(&mut store, USER).await.unwrap();
        assert!(active.has_order);
        assert_eq!(active.order.as_ref().map(|o| o.id), Some(newer));

        change_status(&mut store, newer, StatusChangeRequest { status: OrderStatus::Cancelled }).await.unwrap();
        let active = active_order_for_user(&mut store, USER).await.unwrap();
        assert_eq!(active.order.map(|o| o.id), Some(older));

        assert!(!active_order_for_user(&mut store, USER + 1).await.unwrap().has_order);
    }

    #[tokio::test]
    async fn local_listing_filters_by_status_and_table() {
        let mut store = menu();
        let a3 = open_order(&mut store).await;
        let mut b1 = create_request(vec![line(2, 1, 6_900)]);
        b1.table = "B1".to_string();
        let b1 = create_order(&mut store, None, b1).await.unwrap().id;
        change_status(&mut store, b1, StatusChangeRequest { status: OrderStatus::InPreparation }).await.unwrap();
        let mut elsewhere = create_request(vec![line(4, 1, 4_000)]);
        elsewhere.local_id = LOCAL + 1;
        create_order(&mut store, None, elsewhere).await.unwrap();

        let ids = |orders: Vec<OrderSummary>| orders.iter().map(|o| o.id).collect::<Vec<_>>();

        let all = list_orders_for_local(&mut store, LOCAL, LocalOrdersQuery::default()).await.unwrap();
        assert_eq!(ids(all), [b1, a3]);

        let cooking = LocalOrdersQuery { status: Some(OrderStatus::InPreparation), table: None };
        assert_eq!(ids(list_orders_for_local(&mut store, LOCAL, cooking).await.unwrap()), [b1]);

        let at_a3 = LocalOrdersQuery { status: None, table: Some(" A3 ".to_string()) };
        assert_eq!(ids(list_orders_for_local(&mut store, LOCAL, at_a3).await.unwrap()), [a3]);

        let blank = LocalOrdersQuery { status: None, table: Some("  ".to_string()) };
        assert_eq!(list_orders_for_local(&mut store, LOCAL, blank).await.unwrap().len(), 2);

        let served = LocalOrdersQuery { status: Some(OrderStatus::Served), table: None };
        assert!(list_orders_for_local(&mut store, LOCAL, served).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_item_snapshots_price_and_refreshes_total() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;

        let added = add_item(&mut store, Some(USER), order_id, AddItemRequest { product_id: 2, quantity: 3, note: Some("tibia".to_string()) })
            .await
            .unwrap();
        assert_eq!(added.item.unit_price, 6_900);
        assert_eq!(added.item.subtotal, 3 * 6_900);
        assert_eq!(added.order_total, 5_000 + 3 * 6_900);
        assert_total_consistent(&store, order_id);

        // later price changes do not touch existing lines
        store.products.get_mut(&2).unwrap().price = 9_999;
        let detail = get_order(&mut store, order_id).await.unwrap();
        assert_eq!(detail.items[1].unit_price, 6_900);
        assert_eq!(detail.order.total, 5_000 + 3 * 6_900);
    }

    #[tokio::test]
    async fn add_item_rejections_leave_order_unchanged() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let before = store.orders[&order_id].total;

        let missing = add_item(&mut store, None, order_id, add(99, 1)).await;
        assert!(matches!(missing, Err(OrderError::NotFound { entity: "product", .. })));

        let sold_out = add_item(&mut store, None, order_id, add(3, 1)).await;
        assert!(matches!(sold_out, Err(OrderError::Rejected { .. })));

        let no_order = add_item(&mut store, None, 777, add(1, 1)).await;
        assert!(matches!(no_order, Err(OrderError::NotFound { entity: "order", .. })));

        let long_note = add_item(&mut store, None, order_id, AddItemRequest { product_id: 1, quantity: 1, note: Some("x".repeat(MAX_NOTE_LEN + 1)) }).await;
        assert!(matches!(long_note, Err(OrderError::Validation { .. })));

        assert_eq!(store.items_of(order_id).len(), 1);
        assert_eq!(store.orders[&order_id].total, before);
        assert_total_consistent(&store, order_id);
    }

    #[tokio::test]
    async fn only_the_owner_or_staff_may_edit_items() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let item_id = store.items_of(order_id)[0].id;
        let stranger = Some(USER + 1);

        let add_res = add_item(&mut store, stranger, order_id, add(2, 1)).await;
        assert!(matches!(add_res, Err(OrderError::Forbidden { .. })));
        let update_res = update_item(&mut store, stranger, order_id, item_id, set_quantity(9)).await;
        assert!(matches!(update_res, Err(OrderError::Forbidden { .. })));
        let remove_res = remove_item(&mut store, stranger, order_id, item_id).await;
        assert!(matches!(remove_res, Err(OrderError::Forbidden { .. })));
        assert_eq!(store.items_of(order_id).len(), 1);
        assert_eq!(store.items[&item_id].quantity, 2);

        // owner and anonymous staff
        add_item(&mut store, Some(USER), order_id, add(2, 1)).await.unwrap();
        update_item(&mut store, None, order_id, item_id, set_quantity(3)).await.unwrap();

        // orders without an owner are open to anyone
        let walk_in = create_order(&mut store, None, create_request(vec![line(1, 1, 2_500)])).await.unwrap().id;
        add_item(&mut store, stranger, walk_in, add(1, 1)).await.unwrap();
        assert_total_consistent(&store, walk_in);
    }

    #[tokio::test]
    async fn update_quantity_keeps_note() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let item = add_item(&mut store, Some(USER), order_id, AddItemRequest { product_id: 2, quantity: 1, note: Some("sin sal".to_string()) })
            .await
            .unwrap()
            .item;

        let updated = update_item(&mut store, Some(USER), order_id, item.id, set_quantity(4))
            .await
            .unwrap();
        assert_eq!(updated.item.quantity, 4);
        assert_eq!(updated.item.subtotal, 4 * 6_900);
        assert_eq!(updated.item.note.as_deref(), Some("sin sal"));
        assert_eq!(updated.order_total, 5_000 + 4 * 6_900);
        assert_total_consistent(&store, order_id);
    }

    #[tokio::test]
    async fn update_note_keeps_quantity_and_total() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let item_id = store.items_of(order_id)[0].id;
        let total = store.orders[&order_id].total;

        let updated = update_item(&mut store, None, order_id, item_id, UpdateItemRequest { quantity: None, note: Some("bien cocido".to_string()) })
            .await
            .unwrap();
        assert_eq!(updated.item.quantity, 2);
        assert_eq!(updated.item.note.as_deref(), Some("bien cocido"));
        assert_eq!(updated.order_total, total);

        let cleared = update_item(&mut store, None, order_id, item_id, UpdateItemRequest { quantity: None, note: Some(String::new()) })
            .await
            .unwrap();
        assert!(cleared.item.note.is_none());
        assert_eq!(store.items[&item_id].note, None);
    }

    #[tokio::test]
    async fn update_item_of_another_order_is_not_found() {
        let mut store = menu();
        let first = open_order(&mut store).await;
        let second = open_order(&mut store).await;
        let foreign_item = store.items_of(first)[0].id;

        let res = update_item(&mut store, None, second, foreign_item, set_quantity(9)).await;
        assert!(matches!(res, Err(OrderError::NotFound { entity: "item", .. })));
        assert_eq!(store.items[&foreign_item].quantity, 2);

        let res = update_item(&mut store, None, first, foreign_item, set_quantity(0)).await;
        assert!(matches!(res, Err(OrderError::Validation { .. })));
    }

    #[tokio::test]
    async fn removing_last_item_zeroes_total() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let second = add_item(&mut store, None, order_id, add(2, 1)).await.unwrap().item;

        let removed = remove_item(&mut store, None, order_id, second.id).await.unwrap();
        assert_eq!(removed.order_total, 5_000);
        assert_total_consistent(&store, order_id);

        let last = store.items_of(order_id)[0].id;
        let removed = remove_item(&mut store, Some(USER), order_id, last).await.unwrap();
        assert_eq!(removed.order_total, 0);
        assert_eq!(store.orders[&order_id].total, 0);

        assert!(matches!(
            remove_item(&mut store, None, order_id, last).await,
            Err(OrderError::NotFound { entity: "item", .. })
        ));
    }

    #[tokio::test]
    async fn status_flow_and_terminal_orders() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let item_id = store.items_of(order_id)[0].id;

        let skip = change_status(&mut store, order_id, StatusChangeRequest { status: OrderStatus::Closed }).await;
        assert!(matches!(skip, Err(OrderError::Rejected { .. })));

        for status in [OrderStatus::InPreparation, OrderStatus::Served, OrderStatus::Closed] {
            change_status(&mut store, order_id, StatusChangeRequest { status }).await.unwrap();
        }
        assert_eq!(store.orders[&order_id].status, OrderStatus::Closed);

        let add_res = add_item(&mut store, None, order_id, add(1, 1)).await;
        assert!(matches!(add_res, Err(OrderError::Rejected { .. })));
        let update = update_item(&mut store, None, order_id, item_id, set_quantity(5)).await;
        assert!(matches!(update, Err(OrderError::Rejected { .. })));
        let remove = remove_item(&mut store, None, order_id, item_id).await;
        assert!(matches!(remove, Err(OrderError::Rejected { .. })));
        let reopen = change_status(&mut store, order_id, StatusChangeRequest { status: OrderStatus::Cancelled }).await;
        assert!(matches!(reopen, Err(OrderError::Rejected { .. })));

        assert_eq!(store.orders[&order_id].total, 5_000);
    }

    #[tokio::test]
    async fn total_matches_items_after_every_mutation() {
        let mut store = menu();
        let order_id = open_order(&mut store).await;
        let mut ids = Vec::new();
        for (product_id, quantity) in [(2, 1), (1, 5), (2, 2)] {
            ids.push(add_item(&mut store, Some(USER), order_id, add(product_id, quantity)).await.unwrap().item.id);
            assert_total_consistent(&store, order_id);
        }
        update_item(&mut store, Some(USER), order_id, ids[1], set_quantity(1)).await.unwrap();
        assert_total_consistent(&store, order_id);
        remove_item(&mut store, Some(USER), order_id, ids[0]).await.unwrap();
        assert_total_consistent(&store, order_id);
        assert_eq!(store.orders[&order_id].total, 5_000 + 2_500 + 2 * 6_900);
    }
}
