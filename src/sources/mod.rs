//! Vulnerability data sources.
//!
//! A source turns a [`DateWindow`] into the complete, ordered list of records
//! the upstream API holds for it.
//!
//! # Available Sources
//!
//! - [`nvd::NvdClient`] - NIST National Vulnerability Database, CVE API 2.0

pub mod nvd;
pub mod pacing;

use crate::error::Result;
use crate::models::{CveRecord, DateWindow};
use async_trait::async_trait;

/// Trait for paginated CVE sources.
///
/// # Example
///
/// ```ignore
/// use cyberset::sources::CveSource;
/// use cyberset::models::{CveRecord, DateWindow};
/// use async_trait::async_trait;
///
/// struct Fixture(Vec<CveRecord>);
///
/// #[async_trait]
/// impl CveSource for Fixture {
///     async fn fetch_all(&self, _window: &DateWindow) -> Result<Vec<CveRecord>> {
///         Ok(self.0.clone())
///     }
///
///     fn name(&self) -> &str {
///         "fixture"
///     }
/// }
/// ```
#[async_trait]
pub trait CveSource: Send + Sync {
    /// Fetch every record matching `window`, in server order.
    ///
    /// Any terminal failure discards what was accumulated so far.
    async fn fetch_all(&self, window: &DateWindow) -> Result<Vec<CveRecord>>;

    /// Get the name of this source (used for logging and error messages).
    fn name(&self) -> &str;

    /// Whether requests carry an access credential.
    fn uses_credential(&self) -> bool {
        false
    }
}
