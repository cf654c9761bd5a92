//! Wire types for pools, members and tasks

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote async task.
pub type TaskId = String;

/// Request-side shape of a pool member.
///
/// Used both as the body of a create call (`id` unset) and as an element of the
/// full collection sent by a pool update (`id` set so the remote keeps the
/// member rather than recreating it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub address: IpAddr,
    pub protocol_port: u16,
    pub weight: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Member as reported by the remote inside a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMember {
    pub id: String,
    pub address: IpAddr,
    pub protocol_port: u16,
    pub weight: u16,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub operating_status: Option<String>,
}

impl PoolMember {
    /// Copy the remote-observed fields into a request spec, keeping the identity.
    pub fn to_spec(&self) -> MemberSpec {
        MemberSpec {
            id: Some(self.id.clone()),
            address: self.address,
            protocol_port: self.protocol_port,
            weight: self.weight,
            subnet_id: self.subnet_id.clone(),
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Load balancer pool with its ordered member collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbPool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<PoolMember>,
}

impl LbPool {
    /// Find a member by identity.
    pub fn member(&self, member_id: &str) -> Option<&PoolMember> {
        self.members.iter().find(|m| m.id == member_id)
    }
}

/// Body of a pool update call.
#[derive(Debug, Serialize)]
pub(crate) struct UpdatePoolRequest<'a> {
    pub name: &'a str,
    pub members: &'a [MemberSpec],
}

/// Response of every mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResults {
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

impl TaskResults {
    /// The task tracking the change. The remote returns exactly one relevant
    /// task per member call.
    pub fn first(&self) -> Option<&TaskId> {
        self.tasks.first()
    }
}

/// Remote task state.
///
/// `New` and `Running` are the only non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    New,
    Running,
    Finished,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Error)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskState::New => "NEW",
            TaskState::Running => "RUNNING",
            TaskState::Finished => "FINISHED",
            TaskState::Error => "ERROR",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of an async task.
///
/// `created_resources` is free-form JSON keyed by resource kind, e.g.
/// `{"members": ["<member id>"]}` for member creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub state: TaskState,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub created_resources: Option<serde_json::Value>,
}
