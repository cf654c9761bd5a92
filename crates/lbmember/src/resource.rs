//! Member lifecycle: create, read, update, delete, import
//!
//! Each operation is composed from the same primitives: a mutating call carrying
//! a conflict-retry budget, a task wait, and a read of the pool's member
//! collection as the authoritative result.

use std::time::Duration;

use cloud_api::CloudApi;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::import::parse_import_id;
use crate::member::{DesiredMember, LifecycleState, MemberState};
use crate::reconcile::{build_replacement_set, ensure_member_present};
use crate::retry::ConflictRetryConfig;
use crate::tasks::{DEFAULT_POLL_INTERVAL, WaitOptions, extract_member_id, wait_for_task};

/// Default budget for create, update and delete.
pub const LB_MEMBER_TIMEOUT_MINUTES: u64 = 30;

/// RFC 850 layout used for `last_updated`.
const RFC850: &str = "%A, %d-%b-%y %H:%M:%S UTC";

/// Per-operation wait budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        let budget = Duration::from_secs(LB_MEMBER_TIMEOUT_MINUTES * 60);
        Self {
            create: budget,
            update: budget,
            delete: budget,
        }
    }
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Fields were refreshed from the pool.
    Found,
    /// The pool no longer lists the member; the local identity was cleared so
    /// the next reconciliation recreates it.
    Gone,
}

/// Lifecycle operations for members reachable through one API handle.
///
/// The caller must not run two operations on the same `MemberState` at once;
/// the `&mut` borrows enforce this for a single state value.
pub struct MemberResource<'a, A: CloudApi + ?Sized> {
    api: &'a A,
    timeouts: Timeouts,
    poll_interval: Duration,
}

impl<'a, A: CloudApi + ?Sized> MemberResource<'a, A> {
    pub fn new(api: &'a A, timeouts: Timeouts) -> Self {
        Self {
            api,
            timeouts,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn wait_options(&self, timeout: Duration) -> WaitOptions {
        WaitOptions::new(timeout).with_poll_interval(self.poll_interval)
    }

    /// Create the member and return its freshly read state.
    ///
    /// No state is returned on failure, so the member stays `Absent` locally
    /// even if the remote task eventually completes.
    pub async fn create(&self, desired: &DesiredMember) -> Result<MemberState> {
        debug!(pool_id = %desired.pool_id, state = LifecycleState::Creating.label(), "start member creating");

        let spec = desired.to_spec(None);
        let opts = ConflictRetryConfig::from_timeout(self.timeouts.create).request_opts();
        let results = self
            .api
            .create_member(&desired.pool_id, &spec, &opts)
            .await?;
        let task_id = results.first().ok_or(Error::NoTask {
            operation: "create_member",
        })?;

        let member_id = wait_for_task(
            self.api,
            task_id,
            self.wait_options(self.timeouts.create),
            |task| async move { extract_member_id(&task) },
        )
        .await?;

        let mut state = MemberState {
            id: Some(member_id.clone()),
            pool_id: desired.pool_id.clone(),
            ..MemberState::default()
        };
        if self.read(&mut state).await? == ReadOutcome::Gone {
            return Err(Error::MemberMissing {
                pool_id: desired.pool_id.clone(),
                member_id,
            });
        }

        info!(pool_id = %desired.pool_id, member_id = %member_id, "member created");
        Ok(state)
    }

    /// Refresh `state` from the pool's member collection.
    ///
    /// Project and region are always re-derived from the API scope.
    pub async fn read(&self, state: &mut MemberState) -> Result<ReadOutcome> {
        let member_id = state
            .id
            .clone()
            .ok_or(Error::NoIdentity { operation: "read" })?;
        debug!(pool_id = %state.pool_id, member_id = %member_id, "start member reading");

        let pool = self.api.get_pool(&state.pool_id).await?;

        let scope = self.api.scope();
        state.project_id = Some(scope.project_id);
        state.region_id = Some(scope.region_id);

        let outcome = match pool.member(&member_id) {
            Some(member) => {
                state.apply(member);
                ReadOutcome::Found
            }
            None => {
                warn!(
                    pool_id = %state.pool_id,
                    member_id = %member_id,
                    "member no longer listed in pool, clearing identity"
                );
                state.id = None;
                ReadOutcome::Gone
            }
        };

        debug!(pool_id = %state.pool_id, member_id = %member_id, ?outcome, "finish member reading");
        Ok(outcome)
    }

    /// Converge an existing member with `desired` by replacing the pool's
    /// whole member collection, then read the result back.
    pub async fn update(&self, state: &mut MemberState, desired: &DesiredMember) -> Result<()> {
        let member_id = state
            .id
            .clone()
            .ok_or(Error::NoIdentity { operation: "update" })?;
        if desired.pool_id != state.pool_id {
            return Err(Error::validation(
                "pool_id",
                format!(
                    "cannot move member from pool {} to {}; pool_id is immutable",
                    state.pool_id, desired.pool_id
                ),
            ));
        }
        debug!(
            pool_id = %state.pool_id,
            member_id = %member_id,
            state = LifecycleState::Updating.label(),
            "start member updating"
        );

        let pool = self.api.get_pool(&state.pool_id).await?;
        ensure_member_present(&pool, &member_id)?;
        let members = build_replacement_set(&pool.members, &member_id, desired);

        let opts = ConflictRetryConfig::from_timeout(self.timeouts.update).request_opts();
        let results = self
            .api
            .update_members(&pool.id, &pool.name, &members, &opts)
            .await?;
        let task_id = results.first().ok_or(Error::NoTask {
            operation: "update_members",
        })?;

        // The reported ID is only logged; the read below is authoritative.
        let reported = wait_for_task(
            self.api,
            task_id,
            self.wait_options(self.timeouts.update),
            |task| async move { Ok::<_, Error>(extract_member_id(&task).ok()) },
        )
        .await?;
        match reported {
            Some(id) => debug!(task_id = %task_id, reported_member_id = %id, "update task finished"),
            None => debug!(task_id = %task_id, "update task finished without member metadata"),
        }

        state.last_updated = Some(chrono::Utc::now().format(RFC850).to_string());
        if self.read(state).await? == ReadOutcome::Gone {
            return Err(Error::MemberMissing {
                pool_id: state.pool_id.clone(),
                member_id,
            });
        }

        info!(pool_id = %state.pool_id, member_id = %member_id, "member updated");
        Ok(())
    }

    /// Remove the member and wait until the pool stops listing it.
    ///
    /// A member that is already gone counts as deleted.
    pub async fn delete(&self, state: &mut MemberState) -> Result<()> {
        let Some(member_id) = state.id.clone() else {
            debug!(pool_id = %state.pool_id, "member has no identity, nothing to delete");
            return Ok(());
        };
        let pool_id = state.pool_id.clone();
        debug!(
            pool_id = %pool_id,
            member_id = %member_id,
            state = LifecycleState::Deleting.label(),
            "start member deleting"
        );

        let opts = ConflictRetryConfig::from_timeout(self.timeouts.delete).request_opts();
        let results = match self.api.delete_member(&pool_id, &member_id, &opts).await {
            Ok(results) => results,
            Err(e) if e.is_not_found() => {
                info!(pool_id = %pool_id, member_id = %member_id, "member already gone");
                state.id = None;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let task_id = results.first().ok_or(Error::NoTask {
            operation: "delete_member",
        })?;

        let api = self.api;
        let (pool_ref, member_ref) = (pool_id.as_str(), member_id.as_str());
        wait_for_task(
            api,
            task_id,
            self.wait_options(self.timeouts.delete),
            |_task| async move {
                match api.get_pool(pool_ref).await {
                    Ok(pool) if pool.member(member_ref).is_some() => Err(Error::NotReady(
                        format!("pool member {member_ref} still exists"),
                    )),
                    Ok(_) => Ok(()),
                    // Pool gone means the member went with it
                    Err(e) if e.is_not_found() => Ok(()),
                    Err(e) => Err(Error::Api(e)),
                }
            },
        )
        .await?;

        state.id = None;
        info!(pool_id = %pool_id, member_id = %member_id, "member deleted");
        Ok(())
    }

    /// Start tracking an existing member from a composite import ID.
    ///
    /// Only identity fields are set; call `read` to populate the rest.
    pub fn import(&self, composite_id: &str) -> Result<MemberState> {
        let id = parse_import_id(composite_id)?;
        debug!(pool_id = %id.pool_id, member_id = %id.member_id, "importing member");
        Ok(MemberState {
            id: Some(id.member_id),
            project_id: Some(id.project_id),
            region_id: Some(id.region_id),
            pool_id: id.pool_id,
            ..MemberState::default()
        })
    }
}
