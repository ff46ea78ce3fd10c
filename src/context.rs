//! Service context bundling all port trait objects.

use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. The fields are
/// public so tests can substitute in-memory fakes for individual ports.
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Box<dyn Clock>,
    /// Filesystem for file I/O.
    pub fs: Box<dyn FileSystem>,
}

impl ServiceContext {
    /// Creates a live context with real adapters for the clock and filesystem.
    #[must_use]
    pub fn live() -> Self {
        use crate::adapters::live::clock::LiveClock;
        use crate::adapters::live::filesystem::LiveFileSystem;

        Self { clock: Box::new(LiveClock), fs: Box::new(LiveFileSystem) }
    }
}
