//! TUIO 2.0 processing toolkit.
//!
//! The crate decodes OSC bundle streams into a typed message model, keeps a
//! one-bundle-at-a-time frame model with dispatch to chained adaptors, and
//! ships the harder processors: a multi-source session multiplexer, a
//! coordinate autoconfigurator, touch re-identification, a viewport
//! projector, gesture collectors and axis scaling. A mirror daemon built on
//! top forwards received bundles to a configurable set of OSC sinks.
//!
//! The data path never aborts on a per-message failure: malformed messages
//! are dropped and logged, incomplete bundles are discarded, and network
//! errors surface only to the caller of `load`/`send`.

pub mod adaptors;
pub mod bundle;
pub mod client;
pub mod codec;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod messages;
pub mod mirror;
pub mod server;
pub mod types;

pub use bundle::{BundleHandle, BundleStack, StackIndex};
pub use client::{Client, Listener};
pub use codec::{BundleAssembler, Codec};
pub use error::Error;
pub use messages::{Message, OutputMode, TreeCompat};
pub use server::Server;
pub use types::{SessionId, SessionSet, Timetag};
