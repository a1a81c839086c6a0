use std::ops::{Deref, DerefMut};
use tokio::sync::OwnedSemaphorePermit;
use crate::server::database::pool::{Pool, PoolClient};

/// A pooled client, handed back to its pool on drop
pub(crate) struct Connection<C: PoolClient> {
    client: Option<C>,
    pool: Pool<C>,
    // returned after the client is back in the pool
    permit: Option<OwnedSemaphorePermit>,
}

impl<C: PoolClient> Connection<C> {
    pub fn new(client: C, pool: Pool<C>, permit: OwnedSemaphorePermit) -> Self {
        Self { client: Some(client), pool, permit: Some(permit) }
    }
}

impl<C: PoolClient> Deref for Connection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        // only taken in drop
        self.client.as_ref().expect("connection used after release")
    }
}

impl<C: PoolClient> DerefMut for Connection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client.as_mut().expect("connection used after release")
    }
}

impl<C: PoolClient> Drop for Connection<C> {
    fn drop(&mut self) {
        if let (Some(client), Some(permit)) = (self.client.take(), self.permit.take()) {
            self.pool.release(client, permit);
        }
    }
}

pub(crate) mod connect_util {
    use log::error;
    use tokio_postgres::{Client, NoTls};

    /// open a client and drive its connection on a background task
    pub async fn connect(conn_str: &str) -> Result<Client, tokio_postgres::Error> {
        let (client, conn) = tokio_postgres::connect(conn_str, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("connection returned error and aborted, {}", e);
            }
        });
        Ok(client)
    }
}
