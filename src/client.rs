mod strings;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::info;

use crate::codec::Codec;
use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionOptions};
use crate::error::{Error, Result};
use crate::output;
use crate::protocol::RespValue;

/// Typed commands over a shared [`Connection`], bound to one codec.
///
/// Cloning is cheap and every clone multiplexes onto the same connection.
pub struct Client<C: Codec> {
    connection: Connection,
    codec: Arc<C>,
}

impl<C: Codec> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<C: Codec> Client<C> {
    pub fn new(connection: Connection, codec: C) -> Self {
        Self {
            connection,
            codec: Arc::new(codec),
        }
    }

    /// Opens a TCP connection and runs the handshake described by `config`:
    /// `AUTH`, `SELECT` and `CLIENT SETNAME`, each only when configured.
    pub async fn connect(config: &ClientConfig, codec: C) -> Result<Self> {
        let socket = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| {
                Error::from(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", config.addr),
                ))
            })??;
        socket.set_nodelay(true)?;
        let peer = socket.peer_addr()?;
        let (reader, writer) = socket.into_split();
        let connection = Connection::from_parts(reader, writer, config.connection_options());
        info!(connection_id = connection.id(), peer = %peer, "connected");

        let client = Self::new(connection, codec);
        if let Err(e) = client.handshake(config).await {
            client.close();
            return Err(e);
        }
        Ok(client)
    }

    /// Starts a client over any established byte stream, without a handshake.
    pub fn with_stream<S>(stream: S, options: ConnectionOptions, codec: C) -> Self
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    {
        Self::new(Connection::new(stream, options), codec)
    }

    async fn handshake(&self, config: &ClientConfig) -> Result<()> {
        if let Some(password) = &config.password {
            let mut command = Command::new("AUTH");
            if let Some(username) = &config.username {
                command.arg(username.clone());
            }
            command.arg(password.clone());
            output::status(self.connection.execute(command).await?)?;
        }

        if config.database != 0 {
            let mut command = Command::new("SELECT");
            command.arg_u64(u64::from(config.database));
            output::status(self.connection.execute(command).await?)?;
        }

        if let Some(name) = &config.client_name {
            let mut command = Command::new("CLIENT");
            command.arg("SETNAME").arg(name.clone());
            output::status(self.connection.execute(command).await?)?;
        }

        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Sends an arbitrary command and returns the raw reply.
    pub async fn execute(&self, command: Command) -> Result<RespValue> {
        self.connection.execute(command).await
    }

    pub async fn execute_with_timeout(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<RespValue> {
        self.connection.execute_with_timeout(command, timeout).await
    }

    pub async fn ping(&self) -> Result<String> {
        output::status(self.connection.execute(Command::new("PING")).await?)
    }

    pub fn close(&self) {
        self.connection.close();
    }
}
