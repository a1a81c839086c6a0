use std::future::Future;
use std::time::Duration;
use actix_web::web;
use log::warn;
use tokio::time;
use crate::server::controller::error::CustomError;

pub(crate) mod auth;
pub(crate) mod error;
pub(crate) mod order;

/// register every endpoint plus the extractor configs
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        // before `/v1/orders/{id}` so `mine` is not taken for an id
        .service(order::get_my_orders)
        .service(order::get_my_active_order)
        .service(order::post_order)
        .service(order::get_order)
        .service(order::post_order_item)
        .service(order::put_order_item)
        .service(order::delete_order_item)
        .service(order::patch_order_status)
        .service(order::get_local_orders);
}

/// malformed bodies answer with the same error shape as everything else
pub(crate) fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _| CustomError::bad_request(format!("invalid request body, {err}")).into())
}

pub(crate) fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _| CustomError::bad_request(format!("invalid path, {err}")).into())
}

pub(crate) fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _| CustomError::bad_request(format!("invalid query, {err}")).into())
}

/// bound one transactional unit, the transaction rolls back when it is dropped here
pub(crate) async fn timed<T, F>(timeout: Duration, unit: F) -> Result<T, CustomError>
where
    F: Future<Output = Result<T, CustomError>>,
{
    match time::timeout(timeout, unit).await {
        Ok(result) => result,
        Err(_) => {
            warn!("transaction timed out after {:?}", timeout);
            Err(CustomError::Timeout)
        }
    }
}
