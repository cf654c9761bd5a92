//! Composite import ID
//!
//! An existing member is imported from `project:region:member:pool`. The `/`
//! separator is accepted as well; a single ID must use one separator only.

use crate::error::{Error, Result};

/// Coordinates decoded from an import ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub project_id: u64,
    pub region_id: u64,
    pub member_id: String,
    pub pool_id: String,
}

/// Decode `project:region:member:pool` (or the same with `/`).
pub fn parse_import_id(id: &str) -> Result<ImportId> {
    let invalid = |reason: String| Error::Import {
        id: id.to_string(),
        reason,
    };

    let separator = match (id.contains(':'), id.contains('/')) {
        (true, true) => return Err(invalid("mixes ':' and '/' separators".into())),
        (true, false) => ':',
        (false, _) => '/',
    };

    let tokens: Vec<&str> = id.split(separator).collect();
    let [project, region, member, pool] = tokens.as_slice() else {
        return Err(invalid(format!(
            "expected 4 tokens (project, region, member, pool), got {}",
            tokens.len()
        )));
    };
    if tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(invalid("tokens must not be empty".into()));
    }

    let project_id = project
        .parse()
        .map_err(|_| invalid(format!("project ID must be an integer, got: {project}")))?;
    let region_id = region
        .parse()
        .map_err(|_| invalid(format!("region ID must be an integer, got: {region}")))?;

    Ok(ImportId {
        project_id,
        region_id,
        member_id: member.to_string(),
        pool_id: pool.to_string(),
    })
}
