//! Full member collection for a pool update
//!
//! The pool update call replaces the entire member list, so changing one
//! member means sending every other member back unchanged. Dropping one would
//! delete it remotely.

use cloud_api::{LbPool, MemberSpec, PoolMember};

use crate::error::{Error, Result};
use crate::member::DesiredMember;

/// Look up `member_id` in the pool before building an update.
///
/// Without this check a missing member would yield a replacement set that
/// silently omits the intended change.
pub fn ensure_member_present<'a>(pool: &'a LbPool, member_id: &str) -> Result<&'a PoolMember> {
    pool.member(member_id).ok_or_else(|| Error::MemberMissing {
        pool_id: pool.id.clone(),
        member_id: member_id.to_string(),
    })
}

/// Build the replacement collection: same length and order as `current`, the
/// member with `target_id` rebuilt from `desired`, every other member copied
/// verbatim from its remote-observed fields.
pub fn build_replacement_set(
    current: &[PoolMember],
    target_id: &str,
    desired: &DesiredMember,
) -> Vec<MemberSpec> {
    current
        .iter()
        .map(|member| {
            if member.id == target_id {
                desired.to_spec(Some(member.id.clone()))
            } else {
                member.to_spec()
            }
        })
        .collect()
}
