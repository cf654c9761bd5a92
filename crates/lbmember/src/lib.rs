//! Load balancer pool member lifecycle over an async task API
//!
//! Converges a single pool member with its declared configuration. Every
//! mutating call returns a task that is polled to completion before the member
//! state is refreshed from the pool's authoritative member collection.
//!
//! Member lifecycle:
//! 1. `create` submits the member, waits for the task, adopts the new ID, reads
//! 2. `read` refreshes fields from the pool by identity match
//! 3. `update` rewrites the pool's whole member collection with one member changed
//! 4. `delete` removes the member and waits until the pool no longer lists it
//! 5. `import` decodes a `project:region:member:pool` ID, then `read` fills the rest
//!
//! Mutating calls carry a conflict-retry budget derived from the operation
//! timeout, so "pool busy" rejections from concurrent writers are retried by
//! the transport instead of failing the operation.

pub mod error;
pub mod import;
pub mod member;
pub mod reconcile;
pub mod resource;
pub mod retry;
pub mod tasks;

#[cfg(test)]
mod fake;

pub use error::{Error, Result};
pub use import::{ImportId, parse_import_id};
pub use member::{
    DesiredMember, LifecycleState, MemberConfig, MemberLocation, MemberState, ScopeRef,
};
pub use reconcile::{build_replacement_set, ensure_member_present};
pub use resource::{LB_MEMBER_TIMEOUT_MINUTES, MemberResource, ReadOutcome, Timeouts};
pub use retry::ConflictRetryConfig;
pub use tasks::{WaitOptions, extract_member_id, wait_for_task};
