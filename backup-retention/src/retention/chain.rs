//! Integrity checks for incremental backup chains.
//!
//! The resolver tolerates broken chains. Callers that would rather refuse to
//! prune a damaged repository run [`validate_chains`] first.

use super::backup::Backup;
use crate::utils::errors::RetentionError;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnPath,
    Done,
}

/// Every dangling reference and dependency cycle found in `backups`.
pub fn chain_issues(backups: &[Backup]) -> Vec<RetentionError> {
    let mut index: HashMap<&str, &Backup> = HashMap::with_capacity(backups.len());
    for backup in backups {
        index.entry(backup.backup_name.as_str()).or_insert(backup);
    }

    let mut issues = Vec::new();

    for backup in backups {
        if let Some(required) = backup.required_backup.as_deref() {
            if !index.contains_key(required) {
                issues.push(RetentionError::DanglingReference {
                    backup: backup.backup_name.clone(),
                    required: required.to_string(),
                });
            }
        }
    }

    // Every backup has at most one predecessor, so following the references
    // from each unvisited backup finds each cycle exactly once.
    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(backups.len());
    for backup in backups {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(backup.backup_name.as_str());

        while let Some(name) = current {
            match state.get(name) {
                Some(Visit::Done) => break,
                Some(Visit::OnPath) => {
                    let start = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    issues.push(RetentionError::DependencyCycle(cycle));
                    break;
                }
                None => {}
            }
            state.insert(name, Visit::OnPath);
            path.push(name);
            current = index
                .get(name)
                .copied()
                .and_then(|b| b.required_backup.as_deref());
        }

        for name in path {
            state.insert(name, Visit::Done);
        }
    }

    issues
}

/// Fails on the first dangling reference or dependency cycle.
pub fn validate_chains(backups: &[Backup]) -> Result<(), RetentionError> {
    match chain_issues(backups).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}
