//! Server-Sent Events sessions for load generators and probes.
//!
//! `sseload` opens one HTTP/1.1 connection per session, decodes the
//! [`text/event-stream`](https://html.spec.whatwg.org/multipage/server-sent-events.html) body and
//! calls the handlers registered for `open`, `event` and `error` occurrences. Telemetry samples
//! (connection time, request count and durations, events received) go to a [`MetricsSink`]
//! supplied at construction.
//!
//! - [`Engine::open`] connects, runs the setup callback, then drives the session until it is
//!   released by end of stream, [`SessionHandle::close`] or the engine's cancellation context.
//!   Handlers run on the task awaiting `open`, the body is read on its own task.
//! - [`EventStream`] is the decoder underneath, a [`Stream`][futures_core::Stream] adapter over
//!   any `Stream<Item = Result<impl AsRef<[u8]>, E>>`.
//! - Low-level parsing via [`parser::parse_line_from_buffer`] for custom integrations.
//!
//! # Opening a session
//!
//! ```ignore
//! use std::sync::Arc;
//! use sseload::{Engine, EngineConfig, OpenParams, TransportConfig, metrics::Discard};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(EngineConfig::default(), TransportConfig::default(), Arc::new(Discard))?;
//!
//! let summary = engine
//!     .open("https://example.com/events", OpenParams::new(), |client| {
//!         client
//!             .on_open(|_| Ok(()))
//!             .on_event(|session, event| {
//!                 println!("{}: {}", event.id, event.data);
//!                 if &*event.data == "bye" {
//!                     session.close();
//!                 }
//!                 Ok(())
//!             })
//!             .on_error(|session, err| {
//!                 eprintln!("{err}");
//!                 session.close();
//!                 Ok(())
//!             });
//!         Ok(())
//!     })
//!     .await?;
//!
//! println!("status {}", summary.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Using `EventStream` directly
//!
//! ```rust
//! use bytes::Bytes;
//! use futures::StreamExt;
//! use sseload::EventStream;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let chunks = vec![
//!     Ok::<_, std::io::Error>(Bytes::from("data: hello\n\ndata: world\n\n")),
//! ];
//! let mut stream = EventStream::new(futures::stream::iter(chunks));
//!
//! while let Some(Ok(event)) = stream.next().await {
//!     println!("{}", event.data);
//! }
//! # }
//! ```
//!
//! # Feature flags
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `serde` | off | Derives [`Serialize`][::serde::Serialize] and [`Deserialize`][::serde::Deserialize] on [`Event`] and [`ResponseSummary`] and enables `serde` support in [`bytes-utils`][bytes_utils]. |
//! | `json` | off | Adds [`Event::json`] for deserialising event data via [`serde_json`]. |

pub mod client;
pub mod config;
pub mod connection;
pub(crate) mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod event_stream;
pub mod metrics;
pub mod parser;
mod reader;
pub mod response;

pub use client::{Client, EventKind, Handler, SessionHandle};
pub use config::{EngineConfig, OpenParams, TransportConfig};
pub use engine::Engine;
pub use errors::{BoxError, Error, Result};
pub use event::Event;
pub use event_stream::EventStream;
pub use metrics::{ChannelSink, MetricsSink};
pub use response::ResponseSummary;
