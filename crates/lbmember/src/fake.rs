//! In-memory `CloudApi` for lifecycle tests
//!
//! Mutations apply to the stored pools immediately and return a scripted task
//! that reports `RUNNING` for a configurable number of polls. Conflicts and
//! delayed member removal can be injected to exercise retry and verification.

use std::collections::HashMap;
use std::sync::Mutex;

use cloud_api::{
    ApiError, ApiFuture, CloudApi, LbPool, MemberSpec, PoolMember, RequestOpts, Scope, TaskInfo,
    TaskResults, TaskState, retry_on_conflict,
};
use serde_json::json;

struct ScriptedTask {
    running_polls: u32,
    info: TaskInfo,
    polls: u32,
}

struct PendingRemoval {
    pool_id: String,
    member_id: String,
    /// Pool reads that still list the member.
    visible_reads: u32,
}

#[derive(Default)]
struct State {
    pools: HashMap<String, LbPool>,
    tasks: HashMap<String, ScriptedTask>,
    next_id: u32,
    conflicts_remaining: u32,
    mutation_attempts: u32,
    task_running_polls: u32,
    fail_task: Option<String>,
    delete_visible_reads: u32,
    pending_removals: Vec<PendingRemoval>,
    updates: Vec<Vec<MemberSpec>>,
    drop_pool_on_delete: bool,
    drop_members_on_update: bool,
}

pub struct FakeCloudApi {
    state: Mutex<State>,
}

impl FakeCloudApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn add_pool(&self, pool: LbPool) {
        self.state.lock().unwrap().pools.insert(pool.id.clone(), pool);
    }

    pub fn pool(&self, pool_id: &str) -> Option<LbPool> {
        self.state.lock().unwrap().pools.get(pool_id).cloned()
    }

    /// Reject the next `n` mutating attempts with a conflict.
    pub fn conflict_next(&self, n: u32) {
        self.state.lock().unwrap().conflicts_remaining = n;
    }

    /// Total mutating attempts seen, including rejected ones.
    pub fn mutation_attempts(&self) -> u32 {
        self.state.lock().unwrap().mutation_attempts
    }

    /// Tasks created by mutations report RUNNING for `n` polls first.
    pub fn set_task_running_polls(&self, n: u32) {
        self.state.lock().unwrap().task_running_polls = n;
    }

    /// Tasks created by mutations end in ERROR with this detail.
    pub fn fail_tasks_with(&self, detail: &str) {
        self.state.lock().unwrap().fail_task = Some(detail.to_string());
    }

    /// Deleted members stay listed for `n` pool reads.
    pub fn set_delete_visible_reads(&self, n: u32) {
        self.state.lock().unwrap().delete_visible_reads = n;
    }

    /// The whole pool disappears once a member delete is accepted.
    pub fn drop_pool_on_delete(&self) {
        self.state.lock().unwrap().drop_pool_on_delete = true;
    }

    /// Accepted updates leave the pool without members.
    pub fn drop_members_on_update(&self) {
        self.state.lock().unwrap().drop_members_on_update = true;
    }

    /// Member collections submitted through `update_members`.
    pub fn updates(&self) -> Vec<Vec<MemberSpec>> {
        self.state.lock().unwrap().updates.clone()
    }

    /// Register a task directly and return its ID.
    pub fn push_task(
        &self,
        running_polls: u32,
        state: TaskState,
        created_resources: serde_json::Value,
        error: Option<&str>,
    ) -> String {
        let mut s = self.state.lock().unwrap();
        let id = next_id(&mut s, "t");
        s.tasks.insert(
            id.clone(),
            ScriptedTask {
                running_polls,
                info: TaskInfo {
                    id: id.clone(),
                    state,
                    error: error.map(str::to_string),
                    created_resources: Some(created_resources),
                },
                polls: 0,
            },
        );
        id
    }

    pub fn task_polls(&self, task_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(task_id)
            .map(|t| t.polls)
            .unwrap_or(0)
    }

    fn begin_mutation(&self) -> Result<(), ApiError> {
        let mut s = self.state.lock().unwrap();
        s.mutation_attempts += 1;
        if s.conflicts_remaining > 0 {
            s.conflicts_remaining -= 1;
            return Err(ApiError::Conflict("pool has a conflicting operation in progress".into()));
        }
        Ok(())
    }

    fn mutation_task(&self, created_resources: serde_json::Value) -> TaskResults {
        let (running, state, error) = {
            let s = self.state.lock().unwrap();
            match &s.fail_task {
                Some(detail) => (s.task_running_polls, TaskState::Error, Some(detail.clone())),
                None => (s.task_running_polls, TaskState::Finished, None),
            }
        };
        let id = self.push_task(running, state, created_resources, error.as_deref());
        TaskResults { tasks: vec![id] }
    }

    fn try_create(&self, pool_id: &str, spec: &MemberSpec) -> Result<TaskResults, ApiError> {
        self.begin_mutation()?;
        let member_id = {
            let mut s = self.state.lock().unwrap();
            let member_id = next_id(&mut s, "m");
            let pool = s
                .pools
                .get_mut(pool_id)
                .ok_or_else(|| ApiError::NotFound(format!("pool {pool_id}")))?;
            pool.members.push(PoolMember {
                id: member_id.clone(),
                address: spec.address,
                protocol_port: spec.protocol_port,
                weight: spec.weight,
                subnet_id: spec.subnet_id.clone().or_else(|| Some("s-auto".into())),
                instance_id: spec.instance_id.clone(),
                operating_status: Some("ONLINE".into()),
            });
            member_id
        };
        Ok(self.mutation_task(json!({"members": [member_id]})))
    }

    fn try_update(
        &self,
        pool_id: &str,
        name: &str,
        members: &[MemberSpec],
    ) -> Result<TaskResults, ApiError> {
        self.begin_mutation()?;
        let touched = {
            let mut s = self.state.lock().unwrap();
            s.updates.push(members.to_vec());
            let drop_members = s.drop_members_on_update;
            let pool = s
                .pools
                .get_mut(pool_id)
                .ok_or_else(|| ApiError::NotFound(format!("pool {pool_id}")))?;
            pool.name = name.to_string();
            pool.members = members
                .iter()
                .map(|m| PoolMember {
                    id: m.id.clone().unwrap_or_default(),
                    address: m.address,
                    protocol_port: m.protocol_port,
                    weight: m.weight,
                    subnet_id: m.subnet_id.clone(),
                    instance_id: m.instance_id.clone(),
                    operating_status: Some("ONLINE".into()),
                })
                .collect();
            if drop_members {
                pool.members.clear();
            }
            members.iter().filter_map(|m| m.id.clone()).collect::<Vec<_>>()
        };
        Ok(self.mutation_task(json!({"members": touched})))
    }

    fn try_delete(&self, pool_id: &str, member_id: &str) -> Result<TaskResults, ApiError> {
        self.begin_mutation()?;
        {
            let mut s = self.state.lock().unwrap();
            let exists = s
                .pools
                .get(pool_id)
                .is_some_and(|p| p.member(member_id).is_some());
            let already_pending = s
                .pending_removals
                .iter()
                .any(|r| r.pool_id == pool_id && r.member_id == member_id);
            if !exists || already_pending {
                return Err(ApiError::NotFound(format!("member {member_id}")));
            }
            let visible_reads = s.delete_visible_reads;
            s.pending_removals.push(PendingRemoval {
                pool_id: pool_id.to_string(),
                member_id: member_id.to_string(),
                visible_reads,
            });
            if s.drop_pool_on_delete {
                s.pools.remove(pool_id);
                s.pending_removals.retain(|r| r.pool_id != pool_id);
            }
        }
        Ok(self.mutation_task(json!({})))
    }

    fn read_pool(&self, pool_id: &str) -> Result<LbPool, ApiError> {
        let mut s = self.state.lock().unwrap();
        let State {
            pools,
            pending_removals,
            ..
        } = &mut *s;
        let pool = pools
            .get_mut(pool_id)
            .ok_or_else(|| ApiError::NotFound(format!("pool {pool_id}")))?;
        pending_removals.retain_mut(|r| {
            if r.pool_id != pool_id {
                return true;
            }
            if r.visible_reads == 0 {
                pool.members.retain(|m| m.id != r.member_id);
                return false;
            }
            r.visible_reads = r.visible_reads.saturating_sub(1);
            true
        });
        Ok(pool.clone())
    }

    fn read_task(&self, task_id: &str) -> Result<TaskInfo, ApiError> {
        let mut s = self.state.lock().unwrap();
        let task = s
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;
        task.polls += 1;
        if task.running_polls > 0 {
            task.running_polls -= 1;
            let mut info = task.info.clone();
            info.state = TaskState::Running;
            return Ok(info);
        }
        Ok(task.info.clone())
    }
}

fn next_id(s: &mut State, prefix: &str) -> String {
    s.next_id += 1;
    format!("{prefix}-{}", s.next_id)
}

impl CloudApi for FakeCloudApi {
    fn scope(&self) -> Scope {
        Scope {
            project_id: 42,
            region_id: 5,
        }
    }

    fn create_member<'a>(
        &'a self,
        pool_id: &'a str,
        spec: &'a MemberSpec,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            retry_on_conflict(opts, "create_member", || {
                let result = self.try_create(pool_id, spec);
                async move { result }
            })
            .await
        })
    }

    fn get_pool<'a>(&'a self, pool_id: &'a str) -> ApiFuture<'a, LbPool> {
        let result = self.read_pool(pool_id);
        Box::pin(async move { result })
    }

    fn update_members<'a>(
        &'a self,
        pool_id: &'a str,
        name: &'a str,
        members: &'a [MemberSpec],
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            retry_on_conflict(opts, "update_members", || {
                let result = self.try_update(pool_id, name, members);
                async move { result }
            })
            .await
        })
    }

    fn delete_member<'a>(
        &'a self,
        pool_id: &'a str,
        member_id: &'a str,
        opts: &'a RequestOpts,
    ) -> ApiFuture<'a, TaskResults> {
        Box::pin(async move {
            retry_on_conflict(opts, "delete_member", || {
                let result = self.try_delete(pool_id, member_id);
                async move { result }
            })
            .await
        })
    }

    fn get_task<'a>(&'a self, task_id: &'a str) -> ApiFuture<'a, TaskInfo> {
        let result = self.read_task(task_id);
        Box::pin(async move { result })
    }
}
