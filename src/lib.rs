//! Async client for the FreeSWITCH Event Socket protocol
//!
//! This crate speaks the text-framed Event Socket protocol over a plain TCP
//! session: it authenticates, executes commands synchronously (`api`) or in
//! the background (`bgapi`), and fans server events out to any number of
//! filtered subscribers. A single engine task owns the socket and reconnects
//! with bounded retries when the transport drops.
//!
//! # Examples
//!
//! ## Synchronous command
//!
//! ```rust,no_run
//! use event_socket::{EslClient, EslError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EslError> {
//!     let client = EslClient::connect("localhost", 8021, "ClueCon").await?;
//!
//!     let reply = client.api("status", "").await?;
//!     println!("status: {}", reply.body_text());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Background job
//!
//! ```rust,no_run
//! use event_socket::{EslClient, EslError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EslError> {
//!     let client = EslClient::connect("localhost", 8021, "ClueCon").await?;
//!
//!     let job = client.bgapi("originate", "sofia/internal/1001 &park").await?;
//!     println!("queued as {}", job.job_id());
//!     let result = job.result().await?;
//!     println!("finished: {}", result.success());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Filtered event stream
//!
//! ```rust,no_run
//! use event_socket::{EslClient, EventFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EslClient::connect("localhost", 8021, "ClueCon").await?;
//!     client.event(EventFormat::Plain, "ALL").await?;
//!
//!     let mut channel_events = client
//!         .start_listening_with(|packet| {
//!             packet.event_name().is_some_and(|name| name.starts_with("CHANNEL_"))
//!         })
//!         .await?;
//!
//!     while let Some(event) = channel_events.recv().await {
//!         println!("{:?}", event.event_name());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod command;
pub mod connection;
pub mod constants;
pub mod error;
pub mod job;
pub mod packet;
pub mod parser;
pub mod subscriber;

pub use command::{Command, EventFormat};
pub use connection::{
    BackgroundJob, ClientConfig, ConnectionStatus, EngineStats, EslClient, EventSubscription,
    StopReason,
};
pub use error::{EslError, EslResult};
pub use packet::{Packet, PacketType};
pub use parser::PacketParser;
pub use subscriber::{EventFilter, SubscriberId};
