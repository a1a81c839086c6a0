use crate::server::database::connection::{connect_util, Connection};
use anyhow::{Context, Error};
use log::{error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_postgres::Client;

pub(crate) struct CommonPool<C> {
    /// pool name
    name: String,
    /// idle connections in the pool, accessed in a FIFO manner
    connections: Mutex<VecDeque<C>>,
    /// one permit per idle connection, waiters queue here
    permits: Arc<Semaphore>,
}

/// What the pool needs to know about a client before recycling it
pub(crate) trait PoolClient {
    fn is_closed(&self) -> bool;
}

impl PoolClient for Client {
    fn is_closed(&self) -> bool {
        Client::is_closed(self)
    }
}

/// Fixed size pool, cheap to clone
pub(crate) struct Pool<C>(Arc<CommonPool<C>>);

impl<C> Clone for Pool<C> {
    fn clone(&self) -> Pool<C> {
        Pool(self.0.clone())
    }
}

impl<C> Pool<C> {
    /// build a pool around already established clients
    pub fn from_clients(name: impl Into<String>, clients: Vec<C>) -> Self {
        let permits = Arc::new(Semaphore::new(clients.len()));
        Self(Arc::new(CommonPool {
            name: name.into(),
            connections: Mutex::new(clients.into()),
            permits,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// number of connections currently sitting idle
    #[cfg(test)]
    pub fn idle(&self) -> usize {
        self.0.connections.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl<C: PoolClient> Pool<C> {
    /// acquire a connection with specified timeout, bail out if timeout exceeds.
    pub async fn acquire(&self, timeout: Duration) -> Option<Connection<C>> {
        let permit = match time::timeout(timeout, self.0.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => {
                error!("pool {} is closed, {}", self.name(), e);
                return None;
            }
            Err(_) => {
                warn!("timed out to acquire a connection from pool {} after {:?}", self.name(), timeout);
                return None;
            }
        };
        let client = match self.0.connections.lock() {
            Ok(mut connections) => connections.pop_front(),
            Err(e) => {
                error!("pool {} lock poisoned, {}", self.name(), e);
                None
            }
        }?;
        Some(Connection::new(client, self.clone(), permit))
    }

    /// hand a client back, called when a `Connection` drops. A closed client is
    /// dropped together with its permit, so the pool shrinks by one.
    pub(crate) fn release(&self, client: C, permit: OwnedSemaphorePermit) {
        if client.is_closed() {
            error!("pool {} dropping a closed connection", self.name());
            permit.forget();
            return;
        }
        match self.0.connections.lock() {
            Ok(mut connections) => connections.push_back(client),
            Err(e) => {
                error!("pool {} lock poisoned, dropping connection, {}", self.name(), e);
                permit.forget();
                return;
            }
        }
        // the permit goes back only once the client is queued
        drop(permit);
    }
}

impl Pool<Client> {
    /// open `size` connections concurrently, fails if any of them cannot be established
    pub async fn connect(name: &str, conn_str: &str, size: usize) -> Result<Self, Error> {
        let mut set = JoinSet::new();
        for _ in 0..size {
            let conn_str = conn_str.to_string();
            set.spawn(async move { connect_util::connect(conn_str.as_str()).await });
        }
        let mut clients = Vec::with_capacity(size);
        while let Some(res) = set.join_next().await {
            let client = res
                .context("connection task aborted")?
                .with_context(|| format!("failed to create connection for pool {name}"))?;
            clients.push(client);
        }
        info!("pool {} created with {} connections", name, clients.len());
        Ok(Self::from_clients(name, clients))
    }
}
