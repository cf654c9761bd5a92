//! Request-level retry on conflicting operations
//!
//! The control plane allows only one structural change to a pool at a time and
//! rejects the rest with a conflict. Mutating calls are wrapped here so those
//! rejections are absorbed up to the attempt budget carried by `RequestOpts`.

use std::future::Future;

use tracing::{debug, warn};

use crate::RequestOpts;
use crate::error::Result;

/// Run `call` until it succeeds, fails with a non-conflict error, or the
/// attempt budget is spent.
///
/// Makes at most `opts.conflict_retry_amount` attempts (at least one) and
/// sleeps `opts.conflict_retry_interval` after each conflict. The last conflict
/// is returned once the budget is exhausted.
pub async fn retry_on_conflict<T, F, Fut>(opts: &RequestOpts, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = opts.conflict_retry_amount.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Err(e) if e.is_conflict() && attempt < attempts => {
                debug!(
                    operation,
                    attempt,
                    attempts,
                    retry_in_secs = opts.conflict_retry_interval.as_secs(),
                    "conflicting operation in progress, retrying"
                );
                metrics::counter!("lbmember_conflict_retries_total", "operation" => operation.to_string())
                    .increment(1);
                tokio::time::sleep(opts.conflict_retry_interval).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_conflict() {
                    warn!(operation, attempts, error = %e, "conflict retry budget exhausted");
                }
                return Err(e);
            }
            Ok(value) => return Ok(value),
        }
    }
}
