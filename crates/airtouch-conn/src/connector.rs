use std::net::SocketAddr;
use std::time::Duration;

use airtouch_frame::Generation;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::{ConnectionError, Result};

/// Open a TCP stream to a console within `timeout`.
pub async fn open_stream(addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(ConnectionError::Connect { addr, source }),
        Err(_) => return Err(ConnectionError::ConnectTimeout { addr, timeout }),
    };
    stream
        .set_nodelay(true)
        .map_err(|source| ConnectionError::Connect { addr, source })?;
    debug!(%addr, "opened console stream");
    Ok(stream)
}

/// Connect to a console with the default configuration.
pub async fn connect(addr: SocketAddr, generation: Generation) -> Result<Connection> {
    connect_with_config(addr, generation, ConnectionConfig::default()).await
}

/// Connect with explicit configuration.
pub async fn connect_with_config(
    addr: SocketAddr,
    generation: Generation,
    config: ConnectionConfig,
) -> Result<Connection> {
    let connection = Connection::new(addr, generation, config);
    connection.connect().await?;
    Ok(connection)
}
