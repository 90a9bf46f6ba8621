// Copyright 2026 The Jujutsu Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Multi-branch commit splitting (§4.3), the exclusion filter (§4.4), and
//! commit verification with file→commit back-linking (§4.5).

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::instrument;

use crate::catalog::{branch_name_for, CatalogError, FileCatalog};
use crate::commit::{Commit, CommitError, FileRevision};
use crate::repo_state::{Flavor, RepositoryState};
use crate::rules::IncludeRules;
use crate::settings::ImporterSettings;

const FUSSY_TIME_SPAN_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Replaces any commit whose members span more than one branch with one
/// commit per branch, `<id>-<branch>`, in order of each branch's first
/// appearance among the commit's members.
#[instrument(skip(catalog, commits))]
pub fn split_multi_branch(
    catalog: &FileCatalog,
    commits: Vec<Commit>,
    main_branch_name: &str,
) -> Result<Vec<Commit>, FilterError> {
    let mut out = Vec::with_capacity(commits.len());
    for commit in commits {
        let commit_id = commit.commit_id().to_string();
        let mut by_branch: Vec<(String, Vec<FileRevision>)> = Vec::new();
        for member in commit.members().to_vec() {
            let branch = branch_name_for(catalog, member.file, &member.revision, main_branch_name)?;
            match by_branch.iter_mut().find(|(b, _)| *b == branch) {
                Some((_, members)) => members.push(member),
                None => by_branch.push((branch, vec![member])),
            }
        }
        if by_branch.len() == 1 {
            let (branch, members) = by_branch.into_iter().next().unwrap();
            out.push(Commit::new(commit_id, branch, members));
        } else {
            for (branch, members) in by_branch {
                out.push(Commit::new(format!("{commit_id}-{branch}"), branch, members));
            }
        }
    }
    Ok(out)
}

/// What survived the exclusion filter: the commits to carry forward into
/// resolution, and the changes-only state accumulated from files that were
/// excluded from history but marked head-only (§4.4, consumed by §4.11).
pub struct FilterOutcome {
    pub included: Vec<Commit>,
    pub head_only_state: RepositoryState,
}

/// Drops members on excluded branches outright; of the remainder, routes
/// included-file members into the surviving commit and excluded-but-
/// head-only members into `head_only_state`. A commit left with no included
/// members is dropped entirely.
#[instrument(skip_all)]
pub fn apply_exclusion_filter(
    catalog: &FileCatalog,
    commits: Vec<Commit>,
    branch_rules: &IncludeRules,
    file_rules: &IncludeRules,
    head_only_rules: &IncludeRules,
) -> Result<FilterOutcome, FilterError> {
    let mut included = Vec::with_capacity(commits.len());
    let mut head_only_state = RepositoryState::new(Flavor::ChangesOnly);

    for commit in commits {
        if !branch_rules.evaluate(commit.branch()) {
            continue;
        }
        let commit_id = commit.commit_id().to_string();
        let branch = commit.branch().to_string();
        let mut kept = Vec::new();
        let mut head_only_members = Vec::new();
        for member in commit.members().to_vec() {
            let file_name = catalog.get(member.file)?.name().to_string();
            if file_rules.evaluate(&file_name) {
                kept.push(member);
            } else if head_only_rules.evaluate(&file_name) {
                head_only_members.push(member);
            }
        }
        if !head_only_members.is_empty() {
            let shadow = Commit::new(commit_id.clone(), branch.clone(), head_only_members);
            head_only_state.apply(&shadow, false, catalog).ok();
        }
        if !kept.is_empty() {
            included.push(Commit::new(commit_id, branch, kept));
        }
    }
    Ok(FilterOutcome {
        included,
        head_only_state,
    })
}

/// Verifies each commit (§4.5) and writes file→commit back-references.
/// Verification problems are non-fatal: they're pushed onto the commit's own
/// error list, never raised as an `Err`.
#[instrument(skip_all)]
pub fn verify_and_backlink(
    catalog: &mut FileCatalog,
    mut commits: Vec<Commit>,
    settings: &ImporterSettings,
) -> Result<Vec<Commit>, FilterError> {
    for commit in &mut commits {
        let authors = commit.authors();
        if authors.len() > 1 {
            commit.push_error(CommitError::MultipleAuthors);
        }
        if settings.fussy_verification {
            let times: Vec<_> = commit.members().iter().map(|m| m.time).collect();
            if let (Some(&min), Some(&max)) = (
                times.iter().min_by_key(|t| t.epoch_seconds()),
                times.iter().max_by_key(|t| t.epoch_seconds()),
            ) {
                if min.gap(max) > FUSSY_TIME_SPAN_SECONDS {
                    commit.push_error(CommitError::TimeSpanExceeded);
                }
            }
        }

        let mut member_branches = BTreeSet::new();
        for member in commit.members() {
            let branch = branch_name_for(catalog, member.file, &member.revision, &settings.main_branch_name)?;
            member_branches.insert(branch);
        }
        if member_branches.len() > 1 {
            commit.push_error(CommitError::MultipleBranches);
        }

        let mut merge_source_branches = BTreeSet::new();
        for member in commit.members() {
            if let Some(mergepoint) = &member.mergepoint {
                let branch = branch_name_for(catalog, member.file, mergepoint, &settings.main_branch_name)?;
                merge_source_branches.insert(branch);
            }
        }
        if merge_source_branches.len() > 1 {
            commit.push_error(CommitError::MultipleMergeSourceBranches);
        }

        for member in commit.members() {
            catalog
                .get_mut(member.file)?
                .record_commit(member.revision.clone(), commit.commit_id());
        }
    }
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::interner;
    use crate::time::Timestamp;

    fn member(file: crate::catalog::FileId, revision: &[u32], author: &str) -> FileRevision {
        FileRevision {
            file,
            revision: interner().intern(revision).unwrap(),
            time: Timestamp::from_epoch_seconds(0),
            author: author.to_string(),
            commit_id: "c0".to_string(),
            mergepoint: None,
            is_dead: false,
            message: "m".to_string(),
        }
    }

    #[test]
    fn splits_commit_spanning_two_branches() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commit = Commit::new(
            "c0",
            "MAIN",
            vec![member(f1, &[1, 1], "a"), member(f2, &[1, 2, 4, 1], "a")],
        );
        let split = split_multi_branch(&catalog, vec![commit], "MAIN").unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].commit_id(), "c0-MAIN");
        assert_eq!(split[1].commit_id(), "c0-1.2.4");
    }

    #[test]
    fn exclusion_filter_drops_excluded_branch_commit() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commit = Commit::new("c0", "experimental", vec![member(f1, &[1, 1], "a")]);
        let mut branch_rules = IncludeRules::new(true);
        branch_rules.push("^experimental$").unwrap();
        let file_rules = IncludeRules::new(true);
        let head_only_rules = IncludeRules::new(false);
        let outcome =
            apply_exclusion_filter(&catalog, vec![commit], &branch_rules, &file_rules, &head_only_rules)
                .unwrap();
        assert!(outcome.included.is_empty());
    }

    #[test]
    fn excluded_head_only_file_feeds_changes_only_state_not_history() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("big-binary");
        let commit = Commit::new("c0", "MAIN", vec![member(f1, &[1, 1], "a")]);
        let branch_rules = IncludeRules::new(true);
        let mut file_rules = IncludeRules::new(true);
        file_rules.push("^big-binary$").unwrap();
        let mut head_only_rules = IncludeRules::new(false);
        head_only_rules.push("^big-binary$").unwrap();
        let outcome =
            apply_exclusion_filter(&catalog, vec![commit], &branch_rules, &file_rules, &head_only_rules)
                .unwrap();
        assert!(outcome.included.is_empty());
        assert!(outcome
            .head_only_state
            .branch("MAIN")
            .unwrap()
            .is_live(f1));
    }

    #[test]
    fn multiple_authors_recorded_as_verification_error() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commit = Commit::new(
            "c0",
            "MAIN",
            vec![member(f1, &[1, 1], "alice"), member(f2, &[1, 1], "bob")],
        );
        let settings = ImporterSettings::default();
        let verified = verify_and_backlink(&mut catalog, vec![commit], &settings).unwrap();
        assert!(verified[0]
            .errors()
            .contains(&CommitError::MultipleAuthors));
    }

    #[test]
    fn backlink_written_to_catalog() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commit = Commit::new("c0", "MAIN", vec![member(f1, &[1, 1], "alice")]);
        let settings = ImporterSettings::default();
        verify_and_backlink(&mut catalog, vec![commit], &settings).unwrap();
        let revision = interner().intern(&[1, 1]).unwrap();
        assert_eq!(catalog.get(f1).unwrap().commit_for(&revision), Some("c0"));
    }
}
