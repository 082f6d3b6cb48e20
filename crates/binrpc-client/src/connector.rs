use binrpc_transport::Endpoint;
use tracing::debug;

use crate::client::{Client, ClientConfig};
use crate::error::Result;

/// Connect to a BINRPC server with default configuration.
pub fn connect(endpoint: &Endpoint) -> Result<Client> {
    connect_with_config(endpoint, &ClientConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(endpoint: &Endpoint, config: &ClientConfig) -> Result<Client> {
    let stream = binrpc_transport::connect(endpoint, config.connect_timeout)?;
    let client = Client::from_transport(stream, config)?;
    debug!(%endpoint, transport = client.transport_name(), "connected");
    Ok(client)
}
