pub mod debug;
pub mod registry;
pub mod reporter;

pub use registry::RequestTracker;
pub use reporter::{DebugReporter, ReporterHandle};
