pub mod cache;
pub mod outcome;
pub mod resolver;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;

pub use cache::{CachedResolution, ResolutionCache};
pub use outcome::{FailureKind, Resolution, ResolutionStatus};
pub use resolver::Resolver;
pub use transport::{HopResponse, HopTransport, HttpTransport, TransportError};
