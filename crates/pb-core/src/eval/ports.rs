use std::future::Future;
use std::pin::Pin;

use crate::eval::{ResponseRecord, SinkError};

// ---------------------------------------------------------------------------
// ResponseSink — durable destination for completed responses
// ---------------------------------------------------------------------------

/// Appends completed responses to a backing store (object-safe async via
/// Pin<Box>). Implementations append rows in the canonical column order and
/// return the number of rows written. Failures propagate to the caller;
/// there is no retry or partial-success tracking at this seam.
pub trait ResponseSink: Send + Sync {
    fn append<'a>(
        &'a self,
        rows: &'a [ResponseRecord],
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkError>> + Send + 'a>>;
}
