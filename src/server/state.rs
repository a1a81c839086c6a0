use std::time::Duration;
use tokio_postgres::Client;
use crate::server::database::pool::Pool;

#[derive(Clone)]
pub(crate) struct AppState {
    db_read_pool: Pool<Client>,
    db_write_pool: Pool<Client>,
    db_timeout: Duration,
}

impl AppState {
    pub fn new(db_read_pool: Pool<Client>, db_write_pool: Pool<Client>, db_timeout: Duration) -> Self {
        Self {
            db_read_pool,
            db_write_pool,
            db_timeout,
        }
    }

    pub fn get_db_read_pool(&self) -> Pool<Client> {
        self.db_read_pool.clone()
    }

    pub fn get_db_write_pool(&self) -> Pool<Client> {
        self.db_write_pool.clone()
    }

    pub fn get_db_timeout(&self) -> Duration {
        self.db_timeout
    }
}
