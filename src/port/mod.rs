pub mod reader;
pub mod sink;

pub use reader::TelemetryReader;
pub use sink::RecordSink;

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by the dyn-safe port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
