//! Async Redis client core: a RESP2 command engine that multiplexes typed
//! calls over one connection with strict FIFO reply correlation, and the
//! String command set on top of it.
//!
//! ```no_run
//! use fedis_client::{Client, ClientConfig, StringCodec};
//!
//! # async fn run() -> fedis_client::Result<()> {
//! let config = ClientConfig::from_url("redis://127.0.0.1:6379")?;
//! let client = Client::connect(&config, StringCodec::utf8()).await?;
//! client.set(&"greeting".to_string(), &"hello".to_string()).await?;
//! assert_eq!(client.get(&"greeting".to_string()).await?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod output;
pub mod protocol;
pub mod stats;

pub use client::Client;
pub use codec::{ByteArrayCodec, Charset, Codec, JsonCodec, StringCodec};
pub use command::{
    BitFieldArgs, BitFieldType, Command, MatchedPosition, Offset, OverflowBehavior, Position,
    SetArgs, StrAlgoArgs, StringMatchResult,
};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionOptions, ConnectionState};
pub use error::{Error, Result};
pub use output::KeyValue;
pub use protocol::RespValue;
pub use stats::ConnectionStats;
