//! Remote control-plane abstraction for load balancer pools
//!
//! Defines the `CloudApi` trait that decouples member lifecycle logic from the
//! transport. `HttpCloudApi` talks to the real REST endpoints; tests implement
//! the same trait with an in-memory fake.
//!
//! Every mutating call returns a list of task IDs. The remote executes the
//! change asynchronously and the caller polls `get_task` until the task reaches
//! a terminal state. Mutating calls accept `RequestOpts` so the transport can
//! retry "conflicting operation" rejections natively (see `retry_on_conflict`).

pub mod error;
pub mod http;
pub mod retry;
pub mod types;

pub use error::{ApiError, Result, classify_status};
pub use http::HttpCloudApi;
pub use retry::retry_on_conflict;
pub use types::{LbPool, MemberSpec, PoolMember, TaskId, TaskInfo, TaskResults, TaskState};

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by every `CloudApi` operation.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Project and region a client is bound to.
///
/// Every pool and task URL is namespaced by these two numeric IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub project_id: u64,
    pub region_id: u64,
}

/// Per-request options for mutating calls.
///
/// `conflict_retry_amount` is the total number of attempts (at least one);
/// `conflict_retry_interval` is the sleep between attempts that were rejected
/// with a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOpts {
    pub conflict_retry_amount: u32,
    pub conflict_retry_interval: Duration,
}

impl Default for RequestOpts {
    fn default() -> Self {
        Self {
            conflict_retry_amount: 1,
            conflict_retry_interval: Duration::ZERO,
        }
    }
}

/// Load balancer pool operations consumed by the member lifecycle.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn CloudApi>`).
pub trait CloudApi: Send + Sync {
    /// Project/region this client operates in.
    fn scope(&self) -> Scope;

    /// Attach a new member to a pool. Returns the task tracking the creation.
    fn create_member<'a>(
        &'a self,
        pool_id: &'a str,
        spec: &'a MemberSpec,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults>;

    /// Fetch a pool with its full member collection.
    fn get_pool<'a>(&'a self, pool_id: &'a str) -> ApiFuture<'a, LbPool>;

    /// Replace the pool's entire member collection.
    ///
    /// Members omitted from `members` are removed by the remote, so callers
    /// must round-trip every member they do not intend to change.
    fn update_members<'a>(
        &'a self,
        pool_id: &'a str,
        name: &'a str,
        members: &'a [MemberSpec],
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults>;

    /// Detach a member from a pool. Fails with `ApiError::NotFound` if the
    /// member (or pool) no longer exists.
    fn delete_member<'a>(
        &'a self,
        pool_id: &'a str,
        member_id: &'a str,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults>;

    /// Fetch the current state of an async task.
    fn get_task<'a>(&'a self, task_id: &'a str) -> ApiFuture<'a, TaskInfo>;
}
