//! Data-source collectors for osintel.
//!
//! Each collector turns an external source (GitHub repositories, RSS feeds)
//! into [`NewItem`] records for persistence. Collectors are created through
//! an owned [`CollectorRegistry`] instance constructed at startup; there is
//! no global mutable collector table.

pub mod error;
pub mod github;
pub mod registry;
pub mod rss;
pub mod types;

use futures::future::BoxFuture;

pub use error::CollectError;
pub use github::GithubCollector;
pub use registry::CollectorRegistry;
pub use rss::RssCollector;
pub use types::{HttpSettings, NewItem};

/// A data-source collector.
///
/// `collect` returns the newly produced item shapes; persisting them (and
/// counting inserted rows) is the caller's concern.
pub trait Collector: Send + Sync {
    /// Connectivity probe: true when the source is reachable with the
    /// configured credentials.
    fn test_connection(&self) -> BoxFuture<'_, bool>;

    /// Collect recent items from the source.
    ///
    /// Partial failures inside the source (one repository or feed among
    /// several) are logged and skipped; an `Err` means the collection as a
    /// whole could not run.
    fn collect(&self) -> BoxFuture<'_, Result<Vec<NewItem>, CollectError>>;
}
