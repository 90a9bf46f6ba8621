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

//! Per-branch live-file state, replayed as the oracle the label resolver
//! (§4.6) and the exclusion filter's head-only tracking (§4.4) compare
//! against.

use std::collections::HashMap;

use thiserror::Error;

use crate::catalog::{CatalogError, FileCatalog, FileId};
use crate::commit::Commit;
use crate::revision::Revision;

#[derive(Debug, Error)]
pub enum RepoStateError {
    #[error(
        "strict apply: {file:?} on branch {branch:?} has revision {previous:?}, \
         which {new:?} does not directly precede"
    )]
    NotDirectSuccessor {
        branch: String,
        file: String,
        previous: Revision,
        new: Revision,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Whether a newly started branch's state inherits its parent's live-file
/// map or starts from nothing (§3).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Flavor {
    /// Every file live on the parent branch at the branchpoint is live on
    /// the child too. Used by the label resolver's replay.
    Full,
    /// The child starts empty; only files the branch itself touches appear.
    /// Used to accumulate head-only overlay content (§4.4, §4.11).
    ChangesOnly,
}

/// The live filename→current-revision map for a single branch.
#[derive(Clone, Debug, Default)]
pub struct RepositoryBranchState {
    files: HashMap<FileId, Revision>,
}

impl RepositoryBranchState {
    pub fn is_live(&self, file: FileId) -> bool {
        self.files.contains_key(&file)
    }

    pub fn revision_of(&self, file: FileId) -> Option<&Revision> {
        self.files.get(&file)
    }

    pub fn live_files(&self) -> impl Iterator<Item = (FileId, &Revision)> {
        self.files.iter().map(|(&f, r)| (f, r))
    }

    fn apply_member(
        &mut self,
        branch: &str,
        file_name: &str,
        file: FileId,
        revision: &Revision,
        is_dead: bool,
        strict: bool,
    ) -> Result<(), RepoStateError> {
        if is_dead {
            self.files.remove(&file);
            return Ok(());
        }
        if strict {
            if let Some(previous) = self.files.get(&file) {
                if !previous.directly_precedes(revision) {
                    return Err(RepoStateError::NotDirectSuccessor {
                        branch: branch.to_string(),
                        file: file_name.to_string(),
                        previous: previous.clone(),
                        new: revision.clone(),
                    });
                }
            }
        }
        self.files.insert(file, revision.clone());
        Ok(())
    }
}

/// The whole repository's per-branch live state, replayed commit by commit.
pub struct RepositoryState {
    flavor: Flavor,
    branches: HashMap<String, RepositoryBranchState>,
}

impl RepositoryState {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            branches: HashMap::new(),
        }
    }

    pub fn branch(&self, name: &str) -> Option<&RepositoryBranchState> {
        self.branches.get(name)
    }

    /// Every branch with state recorded so far, in no particular order.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    /// Ensures `branch` has a state, inheriting `parent`'s current live
    /// files if this state is `Flavor::Full` and `parent` is known.
    pub fn start_branch(&mut self, branch: &str, parent: Option<&str>) {
        if self.branches.contains_key(branch) {
            return;
        }
        let files = match (self.flavor, parent.and_then(|p| self.branches.get(p))) {
            (Flavor::Full, Some(parent_state)) => parent_state.files.clone(),
            _ => HashMap::new(),
        };
        self.branches
            .insert(branch.to_string(), RepositoryBranchState { files });
    }

    /// Applies `commit` to its own branch's state, then propagates the same
    /// member revisions to any other already-live branch whose branchpoint
    /// is exactly one of this commit's revisions (§3's "branchpoint
    /// side-effect").
    pub fn apply(
        &mut self,
        commit: &Commit,
        strict: bool,
        catalog: &FileCatalog,
    ) -> Result<(), RepoStateError> {
        self.start_branch(commit.branch(), None);
        for member in commit.members() {
            let file_name = catalog.get(member.file)?.name().to_string();
            let state = self
                .branches
                .get_mut(commit.branch())
                .expect("start_branch just ensured this");
            state.apply_member(
                commit.branch(),
                &file_name,
                member.file,
                &member.revision,
                member.is_dead,
                strict,
            )?;

            let departing = catalog
                .get(member.file)?
                .branches_departing_at(&member.revision)
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>();
            for child in departing {
                if child == commit.branch() {
                    continue;
                }
                if let Some(child_state) = self.branches.get_mut(&child) {
                    child_state.apply_member(
                        &child,
                        &file_name,
                        member.file,
                        &member.revision,
                        member.is_dead,
                        false,
                    )?;
                }
            }
        }
        Ok(())
    }
}
