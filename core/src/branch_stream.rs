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

//! The branch-stream DAG (§4 "Branch-stream DAG"): doubly-linked per-branch
//! commit chains over a single commit arena, with branchpoint attachment,
//! dense index management, and the move/split operations the label resolver
//! and merge resolver build on.
//!
//! Two coordinates exist for every commit:
//! - [`CommitPosition`]: a stable arena slot, assigned once and never reused
//!   while the commit is alive (a split commit's two halves each get a fresh
//!   position).
//! - `index` (stored on [`Commit`] itself): the dense, order-reflecting
//!   integer, reassigned over the whole surviving set after every structural
//!   edit. This is the value §5 and §8 call "index" and requires to be
//!   strictly increasing and contiguous.
//!
//! This module is the *sole* authority that mutates `predecessor`,
//! `successor`, `merge_from`, `branches`, and `index` on a [`Commit`]; every
//! other stage only reads them.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::catalog::{FileCatalog, FileId};
use crate::commit::{Commit, CommitPosition};

#[derive(Debug, Error)]
pub enum BranchStreamError {
    #[error("unknown commit position")]
    UnknownPosition,
    #[error("unknown branch {0:?}")]
    UnknownBranch(String),
    #[error("move destination {dst:?} precedes source {src:?}")]
    DestinationPrecedesSource { src: CommitPosition, dst: CommitPosition },
    #[error("move source {0:?} and destination are on different branches")]
    CrossBranchMove(CommitPosition),
    #[error("commit {0:?} references a branchpoint revision with no owning commit")]
    DanglingBranchpoint(String),
    #[error("commit {commit_id:?} on branch {branch:?} already exists in the stream")]
    DuplicateCommit { commit_id: String, branch: String },
}

/// Owns every [`Commit`] in the import as a stable arena, plus the doubly
/// linked per-branch chains and the dense global ordering over them.
pub struct BranchStreamCollection {
    arena: Vec<Commit>,
    /// The current global ordering: `order[i]` is the commit whose `index` is
    /// `i`. Reassigned in full after any structural edit (§5: "any operation
    /// that changes the set reassigns indices before returning").
    order: Vec<CommitPosition>,
    roots: IndexMap<String, CommitPosition>,
    heads: IndexMap<String, CommitPosition>,
    by_commit_id: HashMap<String, CommitPosition>,
    main_branch_name: String,
}

impl BranchStreamCollection {
    /// Builds the initial branch-stream DAG from a time-ordered commit
    /// sequence (the output of aggregation/filter/verification). Each
    /// commit's branch membership was already settled by §4.3's splitting;
    /// this stage only attaches branch roots to their branchpoint commit and
    /// links each branch's chain in the order commits arrive.
    pub fn build(
        commits: Vec<Commit>,
        catalog: &FileCatalog,
        main_branch_name: &str,
    ) -> Result<Self, BranchStreamError> {
        let mut stream = Self {
            arena: Vec::with_capacity(commits.len()),
            order: Vec::with_capacity(commits.len()),
            roots: IndexMap::new(),
            heads: IndexMap::new(),
            by_commit_id: HashMap::new(),
            main_branch_name: main_branch_name.to_string(),
        };
        for commit in commits {
            stream.append_existing(commit, catalog)?;
        }
        Ok(stream)
    }

    /// Appends `commit` as the new tail of the global order and the new head
    /// of its branch's chain, attaching it to its branchpoint if it's the
    /// first commit seen on that branch. Used both during initial
    /// construction and by the head-only overlay's append-only contract
    /// (§4.11), which never reorders.
    pub fn append_existing(&mut self, commit: Commit, catalog: &FileCatalog) -> Result<CommitPosition, BranchStreamError> {
        let branch = commit.branch().to_string();
        let commit_id = commit.commit_id().to_string();
        if self.by_commit_id.contains_key(&commit_id) {
            return Err(BranchStreamError::DuplicateCommit { commit_id, branch });
        }
        let pos = CommitPosition(self.arena.len() as u32);
        self.arena.push(commit);
        self.by_commit_id.insert(commit_id, pos);

        if let Some(&head) = self.heads.get(&branch) {
            self.set_successor(head, Some(pos));
            self.set_predecessor(pos, Some(head));
        } else {
            // First commit on this branch: attach to its branchpoint, if any.
            let branchpoint = self.find_branchpoint(pos, &branch, catalog)?;
            self.set_predecessor(pos, branchpoint);
            if let Some(bp) = branchpoint {
                self.add_branch_root(bp, pos);
            }
            self.roots.insert(branch.clone(), pos);
        }
        self.heads.insert(branch, pos);
        self.order.push(pos);
        self.reassign_indices();
        Ok(pos)
    }

    /// Finds the commit that owns the branchpoint revision this branch
    /// departs from, by asking each of the new root's files for the revision
    /// their branch departs at and looking up which commit recorded it.
    fn find_branchpoint(
        &self,
        pos: CommitPosition,
        branch: &str,
        catalog: &FileCatalog,
    ) -> Result<Option<CommitPosition>, BranchStreamError> {
        if branch == self.main_branch_name {
            return Ok(None);
        }
        let commit = self.get(pos)?;
        for member in commit.members() {
            if let Some(stem) = member.revision.branch_stem() {
                if let Some(bp) = stem.branchpoint() {
                    let info = catalog.get(member.file).map_err(|_| BranchStreamError::UnknownBranch(branch.to_string()))?;
                    if info.branch_name_by_stem(&stem).is_some() {
                        if let Some(commit_id) = info.commit_for(&bp) {
                            if let Some(&owner) = self.by_commit_id.get(commit_id) {
                                return Ok(Some(owner));
                            }
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    fn reassign_indices(&mut self) {
        for (i, &pos) in self.order.iter().enumerate() {
            self.arena[pos.index()].set_index(i as u32);
        }
    }

    pub fn get(&self, pos: CommitPosition) -> Result<&Commit, BranchStreamError> {
        self.arena.get(pos.index()).ok_or(BranchStreamError::UnknownPosition)
    }

    pub fn get_mut(&mut self, pos: CommitPosition) -> Result<&mut Commit, BranchStreamError> {
        self.arena.get_mut(pos.index()).ok_or(BranchStreamError::UnknownPosition)
    }

    pub fn by_commit_id(&self, commit_id: &str) -> Option<CommitPosition> {
        self.by_commit_id.get(commit_id).copied()
    }

    pub fn root(&self, branch: &str) -> Option<CommitPosition> {
        self.roots.get(branch).copied()
    }

    pub fn head(&self, branch: &str) -> Option<CommitPosition> {
        self.heads.get(branch).copied()
    }

    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn main_branch_name(&self) -> &str {
        &self.main_branch_name
    }

    /// The parent branch of `branch` (the branch its root's predecessor
    /// lives on), or `None` for the main branch or a branch whose root has
    /// no resolved branchpoint.
    pub fn parent_branch(&self, branch: &str) -> Option<&str> {
        let root = self.root(branch)?;
        let predecessor = self.get(root).ok()?.predecessor()?;
        Some(self.get(predecessor).ok()?.branch())
    }

    /// All commits in current global (index) order.
    pub fn in_global_order(&self) -> impl Iterator<Item = CommitPosition> + '_ {
        self.order.iter().copied()
    }

    /// All commits on `branch`, in chain order from root to head.
    pub fn branch_chain(&self, branch: &str) -> Vec<CommitPosition> {
        let mut out = Vec::new();
        let mut cursor = self.root(branch);
        while let Some(pos) = cursor {
            out.push(pos);
            cursor = self.get(pos).ok().and_then(Commit::successor);
        }
        out
    }

    fn set_predecessor(&mut self, pos: CommitPosition, predecessor: Option<CommitPosition>) {
        self.arena[pos.index()].set_predecessor(predecessor);
    }

    fn set_successor(&mut self, pos: CommitPosition, successor: Option<CommitPosition>) {
        self.arena[pos.index()].set_successor(successor);
    }

    fn add_branch_root(&mut self, parent: CommitPosition, root: CommitPosition) {
        self.arena[parent.index()].add_branch_root(root);
    }

    fn remove_branch_root(&mut self, parent: CommitPosition, root: CommitPosition) {
        self.arena[parent.index()].remove_branch_root(root);
    }

    pub(crate) fn set_merge_from(&mut self, pos: CommitPosition, source: Option<CommitPosition>) {
        self.arena[pos.index()].set_merge_from(source);
    }

    /// Re-parents `branch`'s root to depart from `new_branchpoint` instead of
    /// its current predecessor (§4.8's manual branch-to-branchpoint facade).
    /// Any commits already on `branch` keep their relative order; only the
    /// root's predecessor link and the old/new parents' `branches` sets
    /// change. The global order is left untouched by this alone — callers
    /// that need the chain physically adjacent to `new_branchpoint` still
    /// call `move_after` afterward.
    pub fn reattach_root(&mut self, branch: &str, new_branchpoint: CommitPosition) -> Result<(), BranchStreamError> {
        let root = self.root(branch).ok_or_else(|| BranchStreamError::UnknownBranch(branch.to_string()))?;
        if let Some(old_parent) = self.get(root)?.predecessor() {
            self.remove_branch_root(old_parent, root);
        }
        self.set_predecessor(root, Some(new_branchpoint));
        self.add_branch_root(new_branchpoint, root);
        Ok(())
    }

    /// Shifts `c` forward within its own branch chain (and the global
    /// order) to sit immediately after `dst`. Fails if `dst` precedes `c`
    /// (nothing to move forward to) or if the two live on different
    /// branches. When `c` was its branch's root, the branchpoint predecessor
    /// and the parent's `branches` set move to `c`'s old successor, which
    /// becomes the new root (§3).
    pub fn move_after(&mut self, c: CommitPosition, dst: CommitPosition) -> Result<(), BranchStreamError> {
        if c == dst {
            return Ok(());
        }
        let c_index = self.get(c)?.index();
        let dst_index = self.get(dst)?.index();
        if dst_index < c_index {
            return Err(BranchStreamError::DestinationPrecedesSource { src: c, dst });
        }
        let branch = self.get(c)?.branch().to_string();
        if self.get(dst)?.branch() != branch {
            return Err(BranchStreamError::CrossBranchMove(c));
        }
        if self.get(c)?.predecessor() == Some(dst) {
            return Ok(()); // already immediately after dst
        }

        self.unlink(c, &branch)?;
        self.link_after(c, dst)?;

        let old_pos_in_order = self.order.iter().position(|&p| p == c).expect("c is in order");
        self.order.remove(old_pos_in_order);
        let dst_pos_in_order = self.order.iter().position(|&p| p == dst).expect("dst is in order");
        self.order.insert(dst_pos_in_order + 1, c);
        self.reassign_indices();
        Ok(())
    }

    /// Detaches `pos` from its current branch-chain position, reattaching
    /// its neighbors. Does not touch the global `order` vec.
    fn unlink(&mut self, pos: CommitPosition, branch: &str) -> Result<(), BranchStreamError> {
        let old_pred = self.get(pos)?.predecessor();
        let old_succ = self.get(pos)?.successor();
        let was_root = self.roots.get(branch) == Some(&pos);

        if was_root {
            let new_root = old_succ.ok_or(BranchStreamError::UnknownPosition)?;
            self.set_predecessor(new_root, old_pred);
            if let Some(bp) = old_pred {
                self.remove_branch_root(bp, pos);
                self.add_branch_root(bp, new_root);
            }
            self.roots.insert(branch.to_string(), new_root);
        } else {
            let pred = old_pred.expect("non-root commit has a same-branch predecessor");
            self.set_successor(pred, old_succ);
        }

        match old_succ {
            Some(succ) => self.set_predecessor(succ, old_pred),
            // pos had no successor, so it was the branch head; since `was_root`
            // with no successor was already rejected above, pos was a
            // non-root tail and its predecessor becomes the new head.
            None => {
                let new_head = old_pred.expect("non-root, non-head commit has a predecessor");
                self.heads.insert(branch.to_string(), new_head);
            }
        }
        Ok(())
    }

    /// Links `pos` (already detached, or brand new) into the chain
    /// immediately after `dst`, which must live on the same branch.
    fn link_after(&mut self, pos: CommitPosition, dst: CommitPosition) -> Result<(), BranchStreamError> {
        let branch = self.get(dst)?.branch().to_string();
        let old_succ = self.get(dst)?.successor();
        self.set_successor(dst, Some(pos));
        self.set_predecessor(pos, Some(dst));
        self.set_successor(pos, old_succ);
        if let Some(succ) = old_succ {
            self.set_predecessor(succ, Some(pos));
        } else {
            self.heads.insert(branch, pos);
        }
        Ok(())
    }

    /// Splits the commit at `pos` into an included half (members whose file
    /// is in `included`) and an excluded half (the rest), then moves the
    /// included half to sit after `dst`. The excluded half keeps `pos`'s
    /// arena slot and its current chain position; the included half gets a
    /// fresh position. Returns the included half's position (the label
    /// resolver's new candidate) or `pos` unchanged if every member is
    /// included (no real split needed, just a move).
    ///
    /// Caller is responsible for rewriting the moved files' catalog
    /// back-references; this method only touches stream structure.
    pub fn split_and_move(
        &mut self,
        pos: CommitPosition,
        included: &std::collections::HashSet<FileId>,
    ) -> Result<CommitPosition, BranchStreamError> {
        let members = self.get(pos)?.members().to_vec();
        let all_included = members.iter().all(|m| included.contains(&m.file));
        if all_included {
            return Ok(pos);
        }
        let (included_members, excluded_members): (Vec<_>, Vec<_>) =
            members.into_iter().partition(|m| included.contains(&m.file));
        if included_members.is_empty() {
            return Ok(pos);
        }

        let branch = self.get(pos)?.branch().to_string();
        let original_id = self.get(pos)?.commit_id().to_string();

        // The excluded half keeps pos's slot, links, and order position.
        *self.get_mut(pos)?.members_mut() = excluded_members;
        self.get_mut(pos)?.set_commit_id(format!("{original_id}-2"));

        // The included half is a brand new, as-yet-unlinked commit.
        let new_commit = Commit::new(format!("{original_id}-1"), branch, included_members);
        let new_pos = CommitPosition(self.arena.len() as u32);
        self.arena.push(new_commit);
        self.by_commit_id
            .insert(self.arena[new_pos.index()].commit_id().to_string(), new_pos);
        // Splice the new position into the global order right after pos,
        // with no branch links yet; the caller immediately calls
        // `move_after` to place it relative to its real destination, which
        // both links it into the chain and repositions it in `order`.
        let pos_in_order = self.order.iter().position(|&p| p == pos).expect("pos is in order");
        self.order.insert(pos_in_order + 1, new_pos);
        // Give the new node a provisional link right after `pos` so it has
        // a well-formed predecessor/successor before the caller moves it.
        self.link_after(new_pos, pos)?;
        self.reassign_indices();
        Ok(new_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::FileRevision;
    use crate::revision::interner;
    use crate::time::Timestamp;

    fn member(file: FileId, revision: &[u32]) -> FileRevision {
        FileRevision {
            file,
            revision: interner().intern(revision).unwrap(),
            time: Timestamp::from_epoch_seconds(0),
            author: "alice".to_string(),
            commit_id: "c".to_string(),
            mergepoint: None,
            is_dead: false,
            message: "m".to_string(),
        }
    }

    #[test]
    fn linear_main_chain_has_dense_indices() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f1, &[1, 2])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 3])]),
        ];
        let stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let chain = stream.branch_chain("MAIN");
        assert_eq!(chain.len(), 3);
        for (i, &pos) in chain.iter().enumerate() {
            assert_eq!(stream.get(pos).unwrap().index(), i as u32);
        }
        assert_eq!(stream.get(chain[0]).unwrap().predecessor(), None);
        assert_eq!(stream.get(chain[0]).unwrap().successor(), Some(chain[1]));
    }

    #[test]
    fn branch_root_attaches_to_branchpoint_commit() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let marker = interner().intern(&[1, 2, 0, 4]).unwrap();
        catalog.get_mut(f1).unwrap().bind_branch("stable", marker).unwrap();

        let c0 = Commit::new("c0", "MAIN", vec![member(f1, &[1, 2])]);
        let b0 = Commit::new("b0", "stable", vec![member(f1, &[1, 2, 4, 1])]);
        let mut stream = BranchStreamCollection::build(vec![c0], &catalog, "MAIN").unwrap();
        catalog.get_mut(f1).unwrap().record_commit(interner().intern(&[1, 2]).unwrap(), "c0");
        let b0_pos = stream.append_existing(b0, &catalog).unwrap();
        let c0_pos = stream.root("MAIN").unwrap();
        assert_eq!(stream.get(b0_pos).unwrap().predecessor(), Some(c0_pos));
        assert!(stream.get(c0_pos).unwrap().branches().contains(&b0_pos));
        assert_eq!(stream.parent_branch("stable"), Some("MAIN"));
    }

    #[test]
    fn move_after_reorders_and_reindexes() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f2, &[1, 1])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let c0 = stream.by_commit_id("c0").unwrap();
        let c1 = stream.by_commit_id("c1").unwrap();
        let c2 = stream.by_commit_id("c2").unwrap();
        stream.move_after(c1, c2).unwrap();
        let chain = stream.branch_chain("MAIN");
        assert_eq!(chain, vec![c0, c2, c1]);
        for (i, &pos) in chain.iter().enumerate() {
            assert_eq!(stream.get(pos).unwrap().index(), i as u32);
        }
        assert_eq!(stream.head("MAIN"), Some(c1));
    }

    #[test]
    fn move_fails_when_destination_precedes_source() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let c0 = stream.by_commit_id("c0").unwrap();
        let c1 = stream.by_commit_id("c1").unwrap();
        assert!(matches!(
            stream.move_after(c1, c0),
            Err(BranchStreamError::DestinationPrecedesSource { .. })
        ));
    }

    #[test]
    fn split_and_move_keeps_excluded_half_in_place() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f1, &[1, 2])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 3]), member(f2, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let c1 = stream.by_commit_id("c1").unwrap();
        let c2 = stream.by_commit_id("c2").unwrap();
        let mut included = std::collections::HashSet::new();
        included.insert(f2);
        let new_pos = stream.split_and_move(c2, &included).unwrap();
        stream.move_after(new_pos, c1).unwrap();

        assert_eq!(stream.get(c2).unwrap().commit_id(), "c2-2");
        assert_eq!(stream.get(c2).unwrap().members().len(), 1);
        assert_eq!(stream.get(new_pos).unwrap().commit_id(), "c2-1");
        assert_eq!(stream.get(new_pos).unwrap().members().len(), 1);
        let chain = stream.branch_chain("MAIN");
        assert_eq!(chain, vec![stream.by_commit_id("c0").unwrap(), c1, new_pos, c2]);
    }
}
