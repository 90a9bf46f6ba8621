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

//! Head-only overlay (§4.11): synthesizes one `headonly-<branch>` commit per
//! configured branch from the changes-only state the exclusion filter
//! accumulated (§4.4), appended to each branch's head with no reordering.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{instrument, warn};

use crate::branch_stream::{BranchStreamCollection, BranchStreamError};
use crate::catalog::{CatalogError, FileCatalog, FileId};
use crate::commit::{Commit, CommitPosition, FileRevision};
use crate::repo_state::RepositoryState;

const SYNTHETIC_AUTHOR: &str = "cvs-import";
const SYNTHETIC_MESSAGE: &str = "head-only snapshot";

#[derive(Debug, Error)]
pub enum HeadOnlyError {
    #[error(transparent)]
    BranchStream(#[from] BranchStreamError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Appends a `headonly-<branch>` commit to every branch `head_only_state`
/// has recorded content for, in parent-before-child order, linking each
/// child overlay commit's `merge_from` to its parent's when the parent also
/// got one. A branch with no corresponding head in the stream (no real
/// commits survived) is skipped with a warning.
#[instrument(skip_all)]
pub fn apply_head_only_overlay(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    head_only_state: &RepositoryState,
) -> Result<(), HeadOnlyError> {
    let branches: Vec<String> = head_only_state.branch_names().map(str::to_string).collect();
    let ordered = order_parent_before_child(stream, &branches);

    let mut synthesized: HashMap<String, CommitPosition> = HashMap::new();

    for branch in ordered {
        let Some(branch_state) = head_only_state.branch(&branch) else {
            continue;
        };
        let Some(head) = stream.head(&branch) else {
            warn!(branch = branch.as_str(), "no surviving commits to anchor a head-only overlay");
            continue;
        };
        let seed_time = stream.get(head)?.time() + 1;
        let commit_id = format!("headonly-{branch}");

        let mut child_files: HashSet<FileId> = HashSet::new();
        let mut members = Vec::new();
        for (file, revision) in branch_state.live_files() {
            child_files.insert(file);
            members.push(synthetic_member(file, revision.clone(), seed_time, &commit_id, false));
        }

        let parent_name = stream.parent_branch(&branch).map(str::to_string);
        let parent_pos = parent_name.as_deref().and_then(|p| synthesized.get(p)).copied();
        if let Some(parent_name) = &parent_name {
            if let Some(parent_state) = head_only_state.branch(parent_name) {
                for (file, revision) in parent_state.live_files() {
                    if !child_files.contains(&file) {
                        members.push(synthetic_member(file, revision.clone(), seed_time, &commit_id, true));
                    }
                }
            }
        }

        if members.is_empty() {
            continue;
        }
        for member in &members {
            catalog.get_mut(member.file)?.record_commit(member.revision.clone(), &commit_id);
        }

        let commit = Commit::new(commit_id, branch.clone(), members);
        let pos = stream.append_existing(commit, catalog)?;
        if let Some(parent_pos) = parent_pos {
            stream.set_merge_from(pos, Some(parent_pos));
        }
        synthesized.insert(branch, pos);
    }
    Ok(())
}

fn synthetic_member(
    file: FileId,
    revision: crate::revision::Revision,
    time: crate::time::Timestamp,
    commit_id: &str,
    is_dead: bool,
) -> FileRevision {
    FileRevision {
        file,
        revision,
        time,
        author: SYNTHETIC_AUTHOR.to_string(),
        commit_id: commit_id.to_string(),
        mergepoint: None,
        is_dead,
        message: SYNTHETIC_MESSAGE.to_string(),
    }
}

/// Orders `branches` so that a branch always follows its parent branch,
/// where both are present in the set (a parent with no head-only content of
/// its own imposes no ordering constraint).
fn order_parent_before_child(stream: &BranchStreamCollection, branches: &[String]) -> Vec<String> {
    let set: HashSet<&str> = branches.iter().map(String::as_str).collect();
    let mut visited = HashSet::new();
    let mut out = Vec::new();

    fn visit<'a>(
        branch: &'a str,
        stream: &BranchStreamCollection,
        set: &HashSet<&'a str>,
        visited: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        if !visited.insert(branch.to_string()) {
            return;
        }
        if let Some(parent) = stream.parent_branch(branch) {
            if set.contains(parent) {
                visit(parent, stream, set, visited, out);
            }
        }
        out.push(branch.to_string());
    }

    for branch in branches {
        visit(branch, stream, &set, &mut visited, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileCatalog;
    use crate::commit::FileRevision as FR;
    use crate::repo_state::Flavor;
    use crate::revision::interner;
    use crate::time::Timestamp;

    fn member(file: FileId, revision: &[u32], time: i64) -> FR {
        FR {
            file,
            revision: interner().intern(revision).unwrap(),
            time: Timestamp::from_epoch_seconds(time),
            author: "alice".to_string(),
            commit_id: "c".to_string(),
            mergepoint: None,
            is_dead: false,
            message: "m".to_string(),
        }
    }

    #[test]
    fn synthesizes_live_and_dead_members_against_parent() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1-history");
        let f2 = catalog.get_or_create("f2-headonly");

        let c0 = Commit::new("c0", "MAIN", vec![member(f1, &[1, 1], 0)]);
        let mut stream = BranchStreamCollection::build(vec![c0], &catalog, "MAIN").unwrap();
        catalog.get_mut(f1).unwrap().record_commit(interner().intern(&[1, 1]).unwrap(), "c0");

        let mut head_only_state = RepositoryState::new(Flavor::ChangesOnly);
        let shadow = Commit::new("c0", "MAIN", vec![member(f2, &[1, 1], 0)]);
        head_only_state.apply(&shadow, false, &catalog).unwrap();

        apply_head_only_overlay(&catalog, &mut stream, &head_only_state).unwrap();

        let head = stream.head("MAIN").unwrap();
        assert_eq!(stream.get(head).unwrap().commit_id(), "headonly-MAIN");
        assert_eq!(stream.get(head).unwrap().members().len(), 1);
        assert!(!stream.get(head).unwrap().members()[0].is_dead);
    }

    #[test]
    fn child_branch_gets_dead_revision_for_file_missing_from_its_own_set() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let marker = interner().intern(&[1, 1, 0, 2]).unwrap();
        catalog.get_mut(f1).unwrap().bind_branch("feature", marker).unwrap();

        let c0 = Commit::new("c0", "MAIN", vec![member(f1, &[1, 1], 0)]);
        let mut stream = BranchStreamCollection::build(vec![c0], &catalog, "MAIN").unwrap();
        catalog.get_mut(f1).unwrap().record_commit(interner().intern(&[1, 1]).unwrap(), "c0");
        let b1 = Commit::new("b1", "feature", vec![member(f1, &[1, 1, 2, 1], 5)]);
        stream.append_existing(b1, &catalog).unwrap();

        let mut head_only_state = RepositoryState::new(Flavor::ChangesOnly);
        head_only_state.start_branch("MAIN", None);
        head_only_state.start_branch("feature", None);
        let shadow = Commit::new("c0", "MAIN", vec![member(f2, &[1, 1], 0)]);
        head_only_state.apply(&shadow, false, &catalog).unwrap();

        apply_head_only_overlay(&catalog, &mut stream, &head_only_state).unwrap();

        let feature_head = stream.head("feature").unwrap();
        assert_eq!(stream.get(feature_head).unwrap().commit_id(), "headonly-feature");
        let members = stream.get(feature_head).unwrap().members();
        assert_eq!(members.len(), 1);
        assert!(members[0].is_dead);
        assert_eq!(members[0].file, f2);

        let main_head = stream.head("MAIN").unwrap();
        assert_eq!(
            stream.get(feature_head).unwrap().merge_from(),
            Some(main_head)
        );
    }
}
