//! Remote backup retention.
//!
//! Decides which backups fall outside a "keep the N most recent" policy and
//! can be deleted without breaking an incremental chain that a kept backup
//! still restores from, or racing an upload whose date is not committed yet.

pub mod backup;
pub mod chain;

use crate::utils::errors::Result;
use backup::Backup;
use std::collections::HashMap;
use tracing::{debug, info};

/// Outcome of a retention pass over one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Copy of the listing, most recent first. Ties keep listing order.
    pub sorted: Vec<Backup>,
    /// The `keep` most recent backups.
    pub kept: Vec<Backup>,
    /// Older backups retained because a kept backup is built on top of them.
    pub rescued: Vec<Backup>,
    /// Older backups retained because their upload has not been committed.
    pub in_progress: Vec<Backup>,
    /// Backups the pruning job may delete, most recent first.
    pub deletable: Vec<Backup>,
}

impl RetentionPlan {
    pub fn deletable_names(&self) -> Vec<&str> {
        self.deletable.iter().map(|b| b.backup_name.as_str()).collect()
    }
}

/// Backups that can be deleted while keeping the `keep` most recent ones.
///
/// The caller's slice is left untouched.
pub fn resolve_deletable(backups: &[Backup], keep: usize) -> Vec<Backup> {
    plan_retention(backups, keep).deletable
}

/// Full retention plan for `backups` under a keep-`keep` policy.
pub fn plan_retention(backups: &[Backup], keep: usize) -> RetentionPlan {
    let mut sorted = backups.to_vec();
    // `sort_by` is stable: equal upload dates keep their listing order.
    sorted.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));

    if sorted.len() <= keep {
        debug!(total = sorted.len(), keep, "Nothing to prune");
        return RetentionPlan {
            kept: sorted.clone(),
            sorted,
            ..Default::default()
        };
    }

    let (kept, candidates) = sorted.split_at(keep);
    let rescued_mask = rescue_required_chains(kept, candidates);

    let mut rescued = Vec::new();
    let mut in_progress = Vec::new();
    let mut deletable = Vec::new();

    for (backup, is_rescued) in candidates.iter().zip(rescued_mask) {
        if is_rescued {
            rescued.push(backup.clone());
        } else if backup.is_upload_pending() {
            debug!(backup = %backup.backup_name, "Skipping backup with uncommitted upload date");
            in_progress.push(backup.clone());
        } else {
            deletable.push(backup.clone());
        }
    }

    info!(
        total = sorted.len(),
        keep,
        rescued = rescued.len(),
        in_progress = in_progress.len(),
        deletable = deletable.len(),
        "Retention plan computed"
    );

    RetentionPlan {
        kept: kept.to_vec(),
        sorted,
        rescued,
        in_progress,
        deletable,
    }
}

/// Retention plan that refuses listings with dangling references or cycles.
pub fn plan_retention_checked(backups: &[Backup], keep: usize) -> Result<RetentionPlan> {
    chain::validate_chains(backups)?;
    Ok(plan_retention(backups, keep))
}

/// Marks every candidate that a kept backup transitively depends on.
///
/// Each candidate is marked at most once, so the walk is linear in the number
/// of candidates and stops on cyclic references. Names are unique in a valid
/// listing; if one repeats, only the most recent candidate with that name can
/// be rescued.
fn rescue_required_chains(kept: &[Backup], candidates: &[Backup]) -> Vec<bool> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(candidates.len());
    for (i, backup) in candidates.iter().enumerate() {
        index.entry(backup.backup_name.as_str()).or_insert(i);
    }

    let mut rescued = vec![false; candidates.len()];

    for backup in kept {
        let mut next = backup.required_backup.as_deref();
        while let Some(name) = next {
            match index.get(name) {
                Some(&i) if !rescued[i] => {
                    debug!(
                        backup = %name,
                        required_by = %backup.backup_name,
                        "Keeping backup required by incremental chain"
                    );
                    rescued[i] = true;
                    next = candidates[i].required_backup.as_deref();
                }
                Some(_) => break,
                None => {
                    debug!(
                        backup = %name,
                        required_by = %backup.backup_name,
                        "Required backup is not a deletion candidate"
                    );
                    break;
                }
            }
        }
    }

    rescued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::{RetentionError, RetentionToolError};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn names(backups: &[Backup]) -> Vec<&str> {
        backups.iter().map(|b| b.backup_name.as_str()).collect()
    }

    #[test]
    fn test_nothing_to_delete_when_list_fits() {
        let backups = vec![Backup::new("a", day(1)), Backup::new("b", day(2))];

        assert!(resolve_deletable(&backups, 2).is_empty());
        assert!(resolve_deletable(&backups, 5).is_empty());
        assert!(resolve_deletable(&[], 0).is_empty());
    }

    #[test]
    fn test_keep_zero_deletes_everything_committed() {
        let backups = vec![Backup::new("a", day(1)), Backup::new("b", day(2))];
        let deletable = resolve_deletable(&backups, 0);
        assert_eq!(names(&deletable), vec!["b", "a"]);
    }

    #[test]
    fn test_oldest_backups_are_deletable() {
        let backups = vec![
            Backup::new("d3", day(3)),
            Backup::new("d1", day(1)),
            Backup::new("d5", day(5)),
            Backup::new("d2", day(2)),
            Backup::new("d4", day(4)),
        ];

        let deletable = resolve_deletable(&backups, 2);
        assert_eq!(names(&deletable), vec!["d3", "d2", "d1"]);
    }

    #[test]
    fn test_caller_order_is_untouched() {
        let backups = vec![
            Backup::new("old", day(1)),
            Backup::new("new", day(9)),
            Backup::new("mid", day(5)),
        ];
        let before = backups.clone();

        let plan = plan_retention(&backups, 1);

        assert_eq!(backups, before);
        assert_eq!(names(&plan.sorted), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_equal_dates_keep_listing_order() {
        let backups = vec![
            Backup::new("first", day(1)),
            Backup::new("second", day(1)),
            Backup::new("third", day(1)),
        ];

        let plan = plan_retention(&backups, 1);
        assert_eq!(names(&plan.kept), vec!["first"]);
        assert_eq!(names(&plan.deletable), vec!["second", "third"]);
    }

    #[test]
    fn test_incremental_chain_of_kept_backup_survives() {
        // A -> B -> C, only A is within the keep window.
        let backups = vec![
            Backup::new("C", day(1)),
            Backup::new("B", day(2)).with_required("C"),
            Backup::new("A", day(3)).with_required("B"),
        ];

        let plan = plan_retention(&backups, 1);

        assert!(plan.deletable.is_empty());
        assert_eq!(names(&plan.rescued), vec!["B", "C"]);
    }

    #[test]
    fn test_unrelated_old_backups_still_deleted_next_to_chain() {
        let backups = vec![
            Backup::new("full-old", day(1)),
            Backup::new("base", day(2)),
            Backup::new("orphan", day(3)),
            Backup::new("inc", day(4)).with_required("base"),
        ];

        let deletable = resolve_deletable(&backups, 1);
        assert_eq!(names(&deletable), vec!["orphan", "full-old"]);
    }

    #[test]
    fn test_chain_through_kept_backup_is_walked_from_each_kept() {
        // inc2 -> inc1 -> base, keep=2 keeps inc2 and inc1; base must survive.
        let backups = vec![
            Backup::new("base", day(1)),
            Backup::new("inc1", day(2)).with_required("base"),
            Backup::new("inc2", day(3)).with_required("inc1"),
        ];

        assert!(resolve_deletable(&backups, 2).is_empty());
    }

    #[test]
    fn test_shared_ancestor_rescued_once() {
        let backups = vec![
            Backup::new("base", day(1)),
            Backup::new("x", day(2)),
            Backup::new("inc-a", day(3)).with_required("base"),
            Backup::new("inc-b", day(4)).with_required("base"),
        ];

        let plan = plan_retention(&backups, 2);
        assert_eq!(names(&plan.rescued), vec!["base"]);
        assert_eq!(names(&plan.deletable), vec!["x"]);
    }

    #[test]
    fn test_dangling_reference_is_ignored() {
        let backups = vec![
            Backup::new("old", day(1)),
            Backup::new("inc", day(2)).with_required("gone"),
        ];

        let deletable = resolve_deletable(&backups, 1);
        assert_eq!(names(&deletable), vec!["old"]);
    }

    #[test]
    fn test_cyclic_references_terminate() {
        let backups = vec![
            Backup::new("a", day(1)).with_required("b"),
            Backup::new("b", day(2)).with_required("a"),
            Backup::new("self", day(3)).with_required("self"),
            Backup::new("head", day(4)).with_required("b"),
        ];

        let plan = plan_retention(&backups, 1);
        assert_eq!(names(&plan.rescued), vec!["b", "a"]);
        assert_eq!(names(&plan.deletable), vec!["self"]);
    }

    #[test]
    fn test_pending_upload_never_deletable() {
        let backups = vec![
            Backup::new("pending-old", backup::pending_upload_date()),
            Backup::new("d1", day(1)),
            Backup::new("d2", day(2)),
            Backup::new("d3", day(3)),
        ];

        let plan = plan_retention(&backups, 1);
        assert_eq!(names(&plan.in_progress), vec!["pending-old"]);
        assert_eq!(names(&plan.deletable), vec!["d2", "d1"]);
    }

    #[test]
    fn test_pending_upload_with_keep_zero() {
        let backups = vec![
            Backup::new("done", day(1)),
            Backup::new("uploading", backup::pending_upload_date()),
        ];

        let deletable = resolve_deletable(&backups, 0);
        assert_eq!(names(&deletable), vec!["done"]);
    }

    #[test]
    fn test_resolution_is_idempotent_across_relisting() {
        let listing = vec![
            Backup::new("b1", day(1)),
            Backup::new("b2", day(2)).with_required("b1"),
            Backup::new("b3", day(3)),
            Backup::new("b4", day(4)).with_required("b3"),
            Backup::new("b5", day(5)),
            Backup::new("up", backup::pending_upload_date()),
        ];
        let mut relisted = listing.clone();
        relisted.reverse();

        let first = resolve_deletable(&listing, 2);
        let second = resolve_deletable(&relisted, 2);
        let again = resolve_deletable(&listing, 2);

        assert_eq!(first, second);
        assert_eq!(first, again);
        assert_eq!(names(&first), vec!["b2", "b1"]);
    }

    #[test]
    fn test_plan_accounts_for_every_backup() {
        let backups = vec![
            Backup::new("b1", day(1)),
            Backup::new("b2", day(2)),
            Backup::new("b3", day(3)).with_required("b1"),
            Backup::new("up", backup::pending_upload_date()),
        ];

        let plan = plan_retention(&backups, 1);
        let accounted =
            plan.kept.len() + plan.rescued.len() + plan.in_progress.len() + plan.deletable.len();
        assert_eq!(accounted, backups.len());
        assert_eq!(plan.deletable_names(), vec!["b2"]);
    }

    #[test]
    fn test_duplicate_name_rescues_most_recent_candidate_only() {
        let backups = vec![
            Backup::new("base", day(1)),
            Backup::new("base", day(2)),
            Backup::new("inc", day(3)).with_required("base"),
        ];

        let plan = plan_retention(&backups, 1);
        assert_eq!(plan.rescued, vec![Backup::new("base", day(2))]);
        assert_eq!(plan.deletable, vec![Backup::new("base", day(1))]);
    }

    #[test]
    fn test_checked_plan_rejects_broken_chains() {
        let backups = vec![
            Backup::new("a", day(1)).with_required("b"),
            Backup::new("b", day(2)).with_required("a"),
        ];

        let err = plan_retention_checked(&backups, 1).unwrap_err();
        assert!(matches!(
            err,
            RetentionToolError::Retention(RetentionError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_checked_plan_matches_plan_on_valid_chains() {
        let backups = vec![
            Backup::new("base", day(1)),
            Backup::new("old", day(2)),
            Backup::new("inc", day(3)).with_required("base"),
        ];

        let checked = plan_retention_checked(&backups, 1).unwrap();
        assert_eq!(checked, plan_retention(&backups, 1));
        assert_eq!(checked.deletable_names(), vec!["old"]);
    }
}
