use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use tokio_postgres::Client;
use crate::server::controller::auth::{Caller, CurrentUser};
use crate::server::controller::error::CustomError;
use crate::server::controller::timed;
use crate::server::database::connection::Connection;
use crate::server::database::pool::Pool;
use crate::server::database::postgres::PgStore;
use crate::server::model::item::{AddItemRequest, ItemId, UpdateItemRequest};
use crate::server::model::order::{CreateOrderRequest, LocalId, LocalOrdersQuery, OrderId, StatusChangeRequest};
use crate::server::service::order;
use crate::server::state::AppState;

async fn acquire(pool: Pool<Client>, data: &AppState) -> Result<Connection<Client>, CustomError> {
    pool.acquire(data.get_db_timeout())
        .await
        .ok_or(CustomError::ServerIsBusy)
}

#[post("/v1/orders")]
/// Open an order together with its first items
async fn post_order(
    body: web::Json<CreateOrderRequest>,
    caller: Caller,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let mut conn = acquire(data.get_db_write_pool(), &data).await?;
    let created = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let created = order::create_order(&mut PgStore::new(&txn), caller.0, body.into_inner()).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(created)
    })
    .await?;
    Ok(HttpResponse::Created().json(created))
}

#[get("/v1/orders/mine")]
/// Orders owned by the caller, newest first
async fn get_my_orders(user: CurrentUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let mut conn = acquire(data.get_db_read_pool(), &data).await?;
    let orders = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let orders = order::list_orders_for_user(&mut PgStore::new(&txn), user.0).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(orders)
    })
    .await?;
    Ok(web::Json(orders))
}

#[get("/v1/orders/mine/active")]
/// The caller's newest order that is still in progress
async fn get_my_active_order(user: CurrentUser, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let mut conn = acquire(data.get_db_read_pool(), &data).await?;
    let active = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let active = order::active_order_for_user(&mut PgStore::new(&txn), user.0).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(active)
    })
    .await?;
    Ok(web::Json(active))
}

#[get("/v1/locals/{id}/orders")]
/// Staff view of a venue's orders, filtered by `estado` and `mesa`
async fn get_local_orders(
    id: web::Path<LocalId>,
    filter: web::Query<LocalOrdersQuery>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    let mut conn = acquire(data.get_db_read_pool(), &data).await?;
    let orders = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let orders = order::list_orders_for_local(&mut PgStore::new(&txn), id, filter.into_inner()).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(orders)
    })
    .await?;
    Ok(web::Json(orders))
}

#[get("/v1/orders/{id}")]
/// One order with all of its items
async fn get_order(id: web::Path<OrderId>, data: web::Data<AppState>) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    let mut conn = acquire(data.get_db_read_pool(), &data).await?;
    let detail = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let detail = order::get_order(&mut PgStore::new(&txn), id).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(detail)
    })
    .await?;
    Ok(web::Json(detail))
}

#[post("/v1/orders/{id}/items")]
/// Add one item priced from the product
async fn post_order_item(
    id: web::Path<OrderId>,
    body: web::Json<AddItemRequest>,
    caller: Caller,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    let mut conn = acquire(data.get_db_write_pool(), &data).await?;
    let added = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let added = order::add_item(&mut PgStore::new(&txn), caller.0, id, body.into_inner()).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(added)
    })
    .await?;
    Ok(HttpResponse::Created().json(added))
}

#[put("/v1/orders/{id}/items/{item_id}")]
/// Change quantity and/or note of one item
async fn put_order_item(
    path: web::Path<(OrderId, ItemId)>,
    body: web::Json<UpdateItemRequest>,
    caller: Caller,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let (id, item_id) = path.into_inner();
    let mut conn = acquire(data.get_db_write_pool(), &data).await?;
    let updated = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let updated = order::update_item(&mut PgStore::new(&txn), caller.0, id, item_id, body.into_inner()).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(updated)
    })
    .await?;
    Ok(web::Json(updated))
}

#[delete("/v1/orders/{id}/items/{item_id}")]
/// Remove one item
async fn delete_order_item(
    path: web::Path<(OrderId, ItemId)>,
    caller: Caller,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let (id, item_id) = path.into_inner();
    let mut conn = acquire(data.get_db_write_pool(), &data).await?;
    let removed = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let removed = order::remove_item(&mut PgStore::new(&txn), caller.0, id, item_id).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(removed)
    })
    .await?;
    Ok(web::Json(removed))
}

#[patch("/v1/orders/{id}/status")]
/// Move an order along its lifecycle
async fn patch_order_status(
    id: web::Path<OrderId>,
    body: web::Json<StatusChangeRequest>,
    data: web::Data<AppState>,
) -> Result<impl Responder, CustomError> {
    let id = id.into_inner();
    let mut conn = acquire(data.get_db_write_pool(), &data).await?;
    let changed = timed(data.get_db_timeout(), async {
        let txn = conn.transaction().await?;
        let changed = order::change_status(&mut PgStore::new(&txn), id, body.into_inner()).await?;
        txn.commit().await?;
        Ok::<_, CustomError>(changed)
    })
    .await?;
    Ok(web::Json(changed))
}
