use std::net::SocketAddrV4;
use std::time::Duration;

/// Server configs
#[derive(Debug)]
pub(crate) struct ServerConfig {
    pub addr: SocketAddrV4,
    pub db: DbConfig,
}

/// Connection settings shared by the read and write pools
#[derive(Debug, Clone)]
pub(crate) struct DbConfig {
    pub read_conn_str: String,
    pub write_conn_str: String,
    pub pool_size: usize,
    /// upper bound for acquiring a connection and for each transactional unit
    pub timeout: Duration,
}

impl ServerConfig {
    pub fn new(addr: SocketAddrV4, db: DbConfig) -> Self {
        Self {
            addr,
            db,
        }
    }
}
