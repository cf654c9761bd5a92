//! Desired configuration and local state of a pool member
//!
//! `MemberConfig` is the loosely typed shape read from configuration. It is
//! validated once into `DesiredMember`; lifecycle operations only ever see the
//! validated form, so no remote call is made with an invalid address or weight.

use std::net::IpAddr;

use cloud_api::{MemberSpec, PoolMember};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_WEIGHT: i64 = 0;
pub const MAX_WEIGHT: i64 = 256;
pub const DEFAULT_WEIGHT: i64 = 1;

fn default_weight() -> i64 {
    DEFAULT_WEIGHT
}

/// Project or region, selected by numeric ID or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScopeRef {
    Id(u64),
    Name(String),
}

impl ScopeRef {
    /// Build from a mutually exclusive `<kind>_id` / `<kind>_name` pair.
    fn from_pair(field: &'static str, id: Option<i64>, name: Option<String>) -> Result<Self> {
        match (id, name) {
            (Some(_), Some(_)) => Err(Error::validation(
                field,
                "only one of the ID and the name may be set",
            )),
            (None, None) => Err(Error::validation(
                field,
                "one of the ID and the name must be set",
            )),
            (Some(id), None) => u64::try_from(id)
                .map(ScopeRef::Id)
                .map_err(|_| Error::validation(field, format!("ID must not be negative, got: {id}"))),
            (None, Some(name)) if name.trim().is_empty() => {
                Err(Error::validation(field, "name must not be empty"))
            }
            (None, Some(name)) => Ok(ScopeRef::Name(name)),
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            ScopeRef::Id(id) => Some(*id),
            ScopeRef::Name(_) => None,
        }
    }
}

/// Member configuration as declared by the caller, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberConfig {
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub region_name: Option<String>,
    pub pool_id: String,
    /// Only required by create and update.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub protocol_port: i64,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
}

/// Where a member lives: enough to read or delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLocation {
    pub project: ScopeRef,
    pub region: ScopeRef,
    pub pool_id: String,
}

impl MemberConfig {
    /// Validate only the project/region pair and the pool.
    pub fn locate(&self) -> Result<MemberLocation> {
        let project = ScopeRef::from_pair("project", self.project_id, self.project_name.clone())?;
        let region = ScopeRef::from_pair("region", self.region_id, self.region_name.clone())?;

        if self.pool_id.trim().is_empty() {
            return Err(Error::validation("pool_id", "must not be empty"));
        }

        Ok(MemberLocation {
            project,
            region,
            pool_id: self.pool_id.clone(),
        })
    }

    /// Validate every field and produce the strongly typed desired state.
    pub fn validate(self) -> Result<DesiredMember> {
        let MemberLocation {
            project,
            region,
            pool_id,
        } = self.locate()?;

        Ok(DesiredMember {
            project,
            region,
            pool_id,
            address: validate_address(&self.address)?,
            protocol_port: validate_port(self.protocol_port)?,
            weight: validate_weight(self.weight)?,
            subnet_id: self.subnet_id.filter(|s| !s.is_empty()),
            instance_id: self.instance_id.filter(|s| !s.is_empty()),
        })
    }
}

/// Parse an IP literal (v4 or v6).
pub fn validate_address(address: &str) -> Result<IpAddr> {
    address
        .parse()
        .map_err(|_| Error::validation("address", format!("must be a valid ip, got: {address}")))
}

/// Weight must lie in `[MIN_WEIGHT, MAX_WEIGHT]`.
pub fn validate_weight(weight: i64) -> Result<u16> {
    if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        return Err(Error::validation(
            "weight",
            format!("valid values: {MIN_WEIGHT} to {MAX_WEIGHT}, got: {weight}"),
        ));
    }
    // Range checked above.
    Ok(weight as u16)
}

pub fn validate_port(port: i64) -> Result<u16> {
    match u16::try_from(port) {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(Error::validation(
            "protocol_port",
            format!("valid values: 1 to 65535, got: {port}"),
        )),
    }
}

/// Validated desired configuration of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredMember {
    pub project: ScopeRef,
    pub region: ScopeRef,
    pub pool_id: String,
    pub address: IpAddr,
    pub protocol_port: u16,
    pub weight: u16,
    pub subnet_id: Option<String>,
    pub instance_id: Option<String>,
}

impl DesiredMember {
    pub fn location(&self) -> MemberLocation {
        MemberLocation {
            project: self.project.clone(),
            region: self.region.clone(),
            pool_id: self.pool_id.clone(),
        }
    }

    /// Request spec for this member; `id` is set when it is part of a pool update.
    pub fn to_spec(&self, id: Option<String>) -> MemberSpec {
        MemberSpec {
            id,
            address: self.address,
            protocol_port: self.protocol_port,
            weight: self.weight,
            subnet_id: self.subnet_id.clone(),
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Where a member is in its lifecycle.
///
/// Transitions:
/// - Absent → Creating → Present (create)
/// - Present → Updating → Present (update)
/// - Present → Deleting → Absent (delete)
/// - Absent → Present (import, fields filled by the next read)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl LifecycleState {
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Absent => "absent",
            LifecycleState::Creating => "creating",
            LifecycleState::Present => "present",
            LifecycleState::Updating => "updating",
            LifecycleState::Deleting => "deleting",
        }
    }
}

/// Locally tracked view of a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberState {
    /// Remote identity; `None` while the member does not exist.
    pub id: Option<String>,
    pub project_id: Option<u64>,
    pub region_id: Option<u64>,
    pub pool_id: String,
    pub address: Option<IpAddr>,
    pub protocol_port: Option<u16>,
    pub weight: Option<u16>,
    pub subnet_id: Option<String>,
    pub instance_id: Option<String>,
    pub operating_status: Option<String>,
    /// RFC 850 timestamp of the last successful update.
    pub last_updated: Option<String>,
}

impl MemberState {
    pub fn lifecycle(&self) -> LifecycleState {
        if self.id.is_some() {
            LifecycleState::Present
        } else {
            LifecycleState::Absent
        }
    }

    /// Overwrite every remote-observed field from the authoritative record.
    pub(crate) fn apply(&mut self, member: &PoolMember) {
        self.address = Some(member.address);
        self.protocol_port = Some(member.protocol_port);
        self.weight = Some(member.weight);
        self.subnet_id = member.subnet_id.clone();
        self.instance_id = member.instance_id.clone();
        self.operating_status = member.operating_status.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MemberConfig {
        MemberConfig {
            project_id: Some(42),
            project_name: None,
            region_id: None,
            region_name: Some("Luxembourg".into()),
            pool_id: "p-7".into(),
            address: "10.0.0.10".into(),
            protocol_port: 8080,
            weight: DEFAULT_WEIGHT,
            subnet_id: None,
            instance_id: Some("i-1".into()),
        }
    }

    #[test]
    fn valid_config_produces_desired_member() {
        let desired = config().validate().unwrap();
        assert_eq!(desired.project, ScopeRef::Id(42));
        assert_eq!(desired.region, ScopeRef::Name("Luxembourg".into()));
        assert_eq!(desired.address, "10.0.0.10".parse::<IpAddr>().unwrap());
        assert_eq!(desired.protocol_port, 8080);
        assert_eq!(desired.weight, 1);
        assert_eq!(desired.instance_id.as_deref(), Some("i-1"));
    }

    #[test]
    fn weight_bounds_are_inclusive() {
        for w in [0, 1, 128, 256] {
            let mut c = config();
            c.weight = w;
            assert_eq!(c.validate().unwrap().weight as i64, w);
        }
    }

    #[test]
    fn weight_out_of_range_is_rejected() {
        for w in [-1, 257] {
            let mut c = config();
            c.weight = w;
            let err = c.validate().unwrap_err();
            assert!(
                matches!(err, Error::Validation { field: "weight", .. }),
                "weight {w}: {err:?}"
            );
        }
    }

    #[test]
    fn any_ip_literal_is_accepted() {
        for addr in ["192.168.0.1", "0.0.0.0", "::1", "2001:db8::10", "fe80::1"] {
            assert!(validate_address(addr).is_ok(), "{addr}");
        }
    }

    #[test]
    fn non_ip_address_names_the_field() {
        let mut c = config();
        c.address = "not-an-ip".into();
        let err = c.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { field: "address", .. }));
        assert!(err.to_string().contains("not-an-ip"), "got: {err}");
    }

    #[test]
    fn port_must_fit() {
        assert!(validate_port(0).is_err());
        assert!(validate_port(65536).is_err());
        assert!(validate_port(-80).is_err());
        assert_eq!(validate_port(443).unwrap(), 443);
    }

    #[test]
    fn project_pair_is_exactly_one_of() {
        let mut both = config();
        both.project_name = Some("default".into());
        assert!(matches!(
            both.validate(),
            Err(Error::Validation { field: "project", .. })
        ));

        let mut neither = config();
        neither.project_id = None;
        assert!(matches!(
            neither.validate(),
            Err(Error::Validation { field: "project", .. })
        ));
    }

    #[test]
    fn empty_pool_id_is_rejected() {
        let mut c = config();
        c.pool_id = " ".into();
        assert!(matches!(
            c.validate(),
            Err(Error::Validation { field: "pool_id", .. })
        ));
    }

    #[test]
    fn weight_defaults_to_one_when_omitted() {
        let c: MemberConfig = serde_json::from_value(serde_json::json!({
            "project_id": 1,
            "region_id": 1,
            "pool_id": "p-1",
            "address": "10.0.0.1",
            "protocol_port": 80
        }))
        .unwrap();
        assert_eq!(c.weight, 1);
    }

    #[test]
    fn locate_ignores_member_fields() {
        let c: MemberConfig = serde_json::from_value(serde_json::json!({
            "project_id": 42,
            "region_name": "Luxembourg",
            "pool_id": "p-7"
        }))
        .unwrap();

        let location = c.locate().unwrap();
        assert_eq!(config().validate().unwrap().location(), config().locate().unwrap());
        assert_eq!(location.project.id(), Some(42));
        assert_eq!(location.region.id(), None);
        assert_eq!(location.pool_id, "p-7");

        let err = c.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { field: "address", .. }), "got {err:?}");
    }

    #[test]
    fn locate_still_checks_scope_and_pool() {
        let mut c = config();
        c.address = "not-an-ip".into();
        c.pool_id = String::new();
        assert!(matches!(
            c.locate(),
            Err(Error::Validation { field: "pool_id", .. })
        ));
    }

    #[test]
    fn lifecycle_follows_identity() {
        let mut state = MemberState::default();
        assert_eq!(state.lifecycle(), LifecycleState::Absent);
        state.id = Some("m-1".into());
        assert_eq!(state.lifecycle(), LifecycleState::Present);
    }
}
