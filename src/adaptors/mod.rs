//! Bundle adaptors: stateful processors chained between a client and its
//! listeners. Each adaptor consumes one input handle and produces one
//! output handle; `flush` lets time-driven adaptors emit between receive
//! rounds.

pub mod autoconf;
pub mod multiplexing;
pub mod primitive_touch;
pub mod recognizers;
pub mod scaling;
pub mod viewport;

pub use autoconf::Autoconfigurator;
pub use multiplexing::MultiplexingAdaptor;
pub use primitive_touch::PrimitiveTouch;
pub use recognizers::{Matcher, MultistrokeCollector, Scores, UnistrokeCollector};
pub use scaling::{ScalingAdaptor, ServerScalingAdaptor};
pub use viewport::ViewportProjector;

use crate::bundle::BundleHandle;
use crate::error::Error;

/// A client-side bundle processor.
///
/// Implementations may buffer state across bundles; an empty output handle
/// means "drop this bundle".
pub trait Adaptor: Send {
    fn process_bundle(&mut self, bundle: &BundleHandle) -> Result<BundleHandle, Error>;

    /// Called once per completed load round; bundles returned here are fed
    /// to the rest of the chain as if they had been received.
    fn flush(&mut self) -> Vec<BundleHandle> {
        Vec::new()
    }
}

/// A server-side bundle processor, run on the staged bundle before send.
pub trait ServerAdaptor: Send {
    fn process_bundle(&mut self, bundle: &mut BundleHandle) -> Result<(), Error>;
}
