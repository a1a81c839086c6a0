//! main file for the server

mod controller;
mod database;
pub mod model;
mod service;
mod state;
mod util;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;
use tokio_postgres::Client;
use crate::server::database::pool::Pool;
use crate::server::model::config::ServerConfig;
use crate::server::state::AppState;

/// Run the server
pub async fn run(ServerConfig { addr, db }: ServerConfig) -> anyhow::Result<()> {
    let read_pool = Pool::<Client>::connect("read", &db.read_conn_str, db.pool_size).await?;
    let write_pool = Pool::<Client>::connect("write", &db.write_conn_str, db.pool_size).await?;
    let state = AppState::new(read_pool, write_pool, db.timeout);

    info!("listening on {}", addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(controller::configure)
    })
        .bind(addr)
        .with_context(|| format!("failed to bind {addr}"))?
        .run()
        .await
        .context("server stopped with error")
}
