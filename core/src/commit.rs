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

//! `FileRevision` (one per-file event) and `Commit` (a bag of such events
//! sharing identity).
//!
//! A commit's `predecessor`/`successor`/`merge_from`/`branches` links are
//! dense-integer [`CommitPosition`]s into the arena a [`crate::branch_stream`]
//! owns, not pointers: positions stay valid across the `Vec` regardless of
//! how many times the collection is reshuffled, whereas a commit's `index` is
//! the renumbered, order-reflecting value that *does* change on every
//! structural edit. Only `branch_stream` is allowed to write either; every
//! setter here is `pub(crate)` for that reason.

use crate::catalog::FileId;
use crate::revision::Revision;
use crate::time::Timestamp;

/// A stable slot in the branch-stream arena. Never reused while the commit it
/// names is alive; a split commit's two halves each get a fresh position.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct CommitPosition(pub(crate) u32);

impl CommitPosition {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One (file, revision) event: what the legacy tool recorded for a single
/// file at a single check-in.
#[derive(Clone, Debug)]
pub struct FileRevision {
    pub file: FileId,
    pub revision: Revision,
    pub time: Timestamp,
    pub author: String,
    /// Non-empty when the legacy source recorded an explicit commit id.
    pub commit_id: String,
    pub mergepoint: Option<Revision>,
    pub is_dead: bool,
    pub message: String,
}

impl FileRevision {
    /// The branch this revision lives on, `None` for the trunk.
    pub fn branch_stem(&self) -> Option<Revision> {
        self.revision.branch_stem()
    }
}

/// One verification problem recorded against a commit (§4.5). Non-fatal;
/// surfaced both here and as a [`crate::diagnostics::Diagnostic`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommitError {
    MultipleAuthors,
    TimeSpanExceeded,
    MultipleBranches,
    MultipleMergeSourceBranches,
}

/// An ordered bag of `FileRevision`s that share commit identity, plus the
/// graph position assigned once it's placed on a branch stream.
#[derive(Clone, Debug)]
pub struct Commit {
    commit_id: String,
    members: Vec<FileRevision>,
    branch: String,
    index: u32,
    predecessor: Option<CommitPosition>,
    successor: Option<CommitPosition>,
    merge_from: Option<CommitPosition>,
    branches: Vec<CommitPosition>,
    errors: Vec<CommitError>,
}

impl Commit {
    pub fn new(commit_id: impl Into<String>, branch: impl Into<String>, members: Vec<FileRevision>) -> Self {
        Self {
            commit_id: commit_id.into(),
            members,
            branch: branch.into(),
            index: 0,
            predecessor: None,
            successor: None,
            merge_from: None,
            branches: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn commit_id(&self) -> &str {
        &self.commit_id
    }

    pub fn members(&self) -> &[FileRevision] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut Vec<FileRevision> {
        &mut self.members
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn predecessor(&self) -> Option<CommitPosition> {
        self.predecessor
    }

    pub fn successor(&self) -> Option<CommitPosition> {
        self.successor
    }

    pub fn merge_from(&self) -> Option<CommitPosition> {
        self.merge_from
    }

    pub fn branches(&self) -> &[CommitPosition] {
        &self.branches
    }

    pub fn errors(&self) -> &[CommitError] {
        &self.errors
    }

    pub fn push_error(&mut self, error: CommitError) {
        self.errors.push(error);
    }

    /// Earliest member time: a commit's nominal time.
    pub fn time(&self) -> Timestamp {
        self.members
            .iter()
            .map(|m| m.time)
            .min_by_key(|t| t.epoch_seconds())
            .expect("a commit always has at least one member")
    }

    /// The unique authors across all members, in first-seen order.
    pub fn authors(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for member in &self.members {
            if !seen.contains(&member.author.as_str()) {
                seen.push(member.author.as_str());
            }
        }
        seen
    }

    pub fn author(&self) -> &str {
        self.members[0].author.as_str()
    }

    /// Unique member messages, joined in first-seen order.
    pub fn message(&self) -> String {
        let mut seen = Vec::new();
        for member in &self.members {
            if !seen.contains(&member.message.as_str()) {
                seen.push(member.message.as_str());
            }
        }
        seen.join("\n")
    }

    /// The distinct branches touched by this commit's members. A
    /// post-split commit should always return exactly one.
    pub fn member_branches<'a>(&'a self, branch_of: impl Fn(&FileRevision) -> &'a str) -> Vec<&'a str> {
        let mut seen = Vec::new();
        for member in &self.members {
            let branch = branch_of(member);
            if !seen.contains(&branch) {
                seen.push(branch);
            }
        }
        seen
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    pub(crate) fn set_predecessor(&mut self, predecessor: Option<CommitPosition>) {
        self.predecessor = predecessor;
    }

    pub(crate) fn set_successor(&mut self, successor: Option<CommitPosition>) {
        self.successor = successor;
    }

    pub(crate) fn set_merge_from(&mut self, merge_from: Option<CommitPosition>) {
        self.merge_from = merge_from;
    }

    pub(crate) fn add_branch_root(&mut self, root: CommitPosition) {
        if !self.branches.contains(&root) {
            self.branches.push(root);
        }
    }

    pub(crate) fn remove_branch_root(&mut self, root: CommitPosition) {
        self.branches.retain(|&p| p != root);
    }

    pub(crate) fn set_branch(&mut self, branch: impl Into<String>) {
        self.branch = branch.into();
    }

    pub(crate) fn set_commit_id(&mut self, commit_id: impl Into<String>) {
        self.commit_id = commit_id.into();
    }
}
