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

//! The label resolver (§4.6–§4.8): pins a symbolic name to exactly one
//! commit, reordering or splitting commits as needed.
//!
//! The same walk serves both tags and branch labels; the two differ only in
//! which revision on a file counts as the label's target and whether a
//! missing file is legitimately absent. [`LabelKind`] carries that as a pair
//! of function pointers rather than a trait object, per the "tag vs branch"
//! polymorphism called for over inheritance.

use std::collections::{BTreeSet, HashSet};

use thiserror::Error;
use tracing::instrument;

use crate::branch_stream::{BranchStreamCollection, BranchStreamError};
use crate::catalog::{CatalogError, FileCatalog, FileId, FileInfo};
use crate::commit::CommitPosition;
use crate::diagnostics::{Diagnostic, DiagnosticLog, Severity, Stage};
use crate::repo_state::{Flavor, RepoStateError, RepositoryState};
use crate::revision::Revision;
use crate::settings::ImporterSettings;

#[derive(Debug, Error)]
pub enum LabelResolutionError {
    #[error("label {0:?} has no candidate commit")]
    NoCandidate(String),
    #[error("label {0:?} touches a branch path that leaves and revisits {1:?}")]
    InconsistentBranchPath(String, String),
    #[error("label {label:?} is partial: {extra} extra file(s) exceed the threshold of {threshold}")]
    Partial {
        label: String,
        extra: usize,
        threshold: u32,
    },
    #[error("label {label:?} is missing file {file:?}, with no reachable add or delete")]
    UnreachableMissing { label: String, file: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    BranchStream(#[from] BranchStreamError),
    #[error(transparent)]
    RepoState(#[from] RepoStateError),
}

/// The capability pair that parameterizes the resolver over "tag" vs
/// "branch" labels (§9 Design Notes: function pointers, not inheritance).
pub struct LabelKind {
    pub description: &'static str,
    /// The revision this file reports as bound to `label`, or `None` if the
    /// file has no such binding.
    pub target_revision: fn(&FileInfo, &str) -> Option<Revision>,
    /// True if a file missing from the candidate's state is nonetheless
    /// legitimate and should be excluded from the "missing" reconciliation
    /// set (§4.7: a file not yet added when its owning branch departed).
    pub suppress_missing: fn(&FileInfo, &str) -> bool,
}

pub fn tag_kind() -> LabelKind {
    LabelKind {
        description: "tag",
        target_revision: |file, label| file.tag_revision(label).cloned(),
        suppress_missing: |_file, _label| false,
    }
}

pub fn branch_kind() -> LabelKind {
    LabelKind {
        description: "branch",
        target_revision: |file, label| file.branch_marker(label).and_then(Revision::branchpoint),
        suppress_missing: |file, label| file.branch_added_on.as_deref() == Some(label),
    }
}

/// One resolved label: the commit it now points at.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedLabel {
    pub commit: CommitPosition,
}

/// Every distinct tag name bound on any file, in a stable (sorted) order.
pub fn all_tag_names(catalog: &FileCatalog) -> Result<Vec<String>, CatalogError> {
    let mut names = BTreeSet::new();
    for id in catalog.ids() {
        for (name, _) in catalog.get(id)?.tags() {
            names.insert(name.to_string());
        }
    }
    Ok(names.into_iter().collect())
}

/// Every distinct branch name bound on any file, in a stable (sorted) order.
pub fn all_branch_names(catalog: &FileCatalog) -> Result<Vec<String>, CatalogError> {
    let mut names = BTreeSet::new();
    for id in catalog.ids() {
        for (name, _) in catalog.get(id)?.branches() {
            names.insert(name.to_string());
        }
    }
    Ok(names.into_iter().collect())
}

/// What one commit's comparison against the label's intended per-file state
/// looks like, per §4.6 step 4.
enum Compare {
    /// Some member has already passed the label's target revision.
    Ahead(HashSet<FileId>),
    /// Every file in the catalog with a revision for this label matches the
    /// branch state exactly.
    ExactMatch,
    Behind,
}

fn compare_state(
    catalog: &FileCatalog,
    branch_state: &crate::repo_state::RepositoryBranchState,
    kind: &LabelKind,
    label: &str,
    commit_members: &[crate::commit::FileRevision],
) -> Result<Compare, LabelResolutionError> {
    let mut ahead = HashSet::new();
    for member in commit_members {
        if member.is_dead {
            continue;
        }
        let file_info = catalog.get(member.file)?;
        let Some(target) = (kind.target_revision)(&file_info, label) else {
            continue;
        };
        if let Some(current) = branch_state.revision_of(member.file) {
            if target.precedes(current) {
                ahead.insert(member.file);
            }
        }
    }
    if !ahead.is_empty() {
        return Ok(Compare::Ahead(ahead));
    }
    for id in catalog.ids() {
        let info = catalog.get(id)?;
        if let Some(target) = (kind.target_revision)(&info, label) {
            if branch_state.revision_of(id) != Some(&target) {
                return Ok(Compare::Behind);
            }
        }
    }
    Ok(Compare::ExactMatch)
}

/// Whether `commit_members` touches any file the label has an opinion about
/// at all; used to tell "noise" (irrelevant filler between two candidates)
/// from commits that merely haven't reached the target revision yet.
fn touches_label(
    catalog: &FileCatalog,
    kind: &LabelKind,
    label: &str,
    commit_members: &[crate::commit::FileRevision],
) -> Result<bool, LabelResolutionError> {
    for member in commit_members {
        let info = catalog.get(member.file)?;
        if (kind.target_revision)(&info, label).is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

struct WalkOutcome {
    /// The commit every moved/split commit is relocated to sit after. When
    /// the walk ends in `ExactMatch`, this *is* the resolved commit; when it
    /// ends in `Ahead`, the resolved commit is the split's included half,
    /// placed here instead.
    anchor: CommitPosition,
    /// Non-candidate commits with no label-relevant members, encountered
    /// between the first and the final candidate, in ascending index order.
    noise: Vec<CommitPosition>,
    /// Set when the final commit examined overshot some of its members; the
    /// named files stay behind (excluded half) while the rest move to sit
    /// after `anchor`.
    final_split: Option<(CommitPosition, HashSet<FileId>)>,
    /// The commit the walk settled on absent any split (anchor itself, or
    /// the final candidate if the walk ran out without ahead/exact).
    settled: CommitPosition,
}

#[allow(clippy::too_many_arguments)]
fn walk(
    catalog: &FileCatalog,
    stream: &BranchStreamCollection,
    kind: &LabelKind,
    label: &str,
    candidates: &[CommitPosition],
    filtered: &[CommitPosition],
    final_branch: &str,
) -> Result<WalkOutcome, LabelResolutionError> {
    let candidate_set: HashSet<_> = candidates.iter().copied().collect();
    let mut state = RepositoryState::new(Flavor::Full);
    let mut chain = Vec::new();
    let mut cursor = Some(final_branch.to_string());
    while let Some(branch) = cursor {
        cursor = stream.parent_branch(&branch).map(str::to_string);
        chain.push(branch);
    }
    for branch in chain.iter().rev() {
        state.start_branch(branch, stream.parent_branch(branch));
    }

    let mut curr_candidate: Option<CommitPosition> = None;
    let mut noise = Vec::new();

    for &pos in filtered {
        let commit = stream.get(pos)?;
        state.apply(commit, false, catalog)?;
        let is_candidate = candidate_set.contains(&pos);
        let prev_candidate = curr_candidate;
        if is_candidate {
            curr_candidate = Some(pos);
        }

        let branch_state = state
            .branch(commit.branch())
            .expect("apply just ensured this branch has state");
        let cmp = compare_state(catalog, branch_state, kind, label, commit.members())?;

        match cmp {
            Compare::Ahead(ahead_files) => {
                let anchor = if is_candidate { prev_candidate } else { curr_candidate };
                let anchor = anchor.ok_or_else(|| LabelResolutionError::NoCandidate(label.to_string()))?;
                return Ok(WalkOutcome {
                    anchor,
                    noise,
                    final_split: Some((pos, ahead_files)),
                    settled: pos,
                });
            }
            Compare::ExactMatch => {
                return Ok(WalkOutcome {
                    anchor: pos,
                    noise,
                    final_split: None,
                    settled: pos,
                });
            }
            Compare::Behind => {
                if curr_candidate.is_some() && !is_candidate && !touches_label(catalog, kind, label, commit.members())? {
                    noise.push(pos);
                }
            }
        }

        if candidates.last() == Some(&pos) {
            return Ok(WalkOutcome {
                anchor: pos,
                noise,
                final_split: None,
                settled: pos,
            });
        }
    }
    Err(LabelResolutionError::NoCandidate(label.to_string()))
}

fn rewrite_backrefs(catalog: &FileCatalog, stream: &BranchStreamCollection, pos: CommitPosition) -> Result<(), LabelResolutionError> {
    let commit = stream.get(pos)?;
    let commit_id = commit.commit_id().to_string();
    for member in commit.members() {
        catalog.get_mut(member.file)?.record_commit(member.revision.clone(), commit_id.clone());
    }
    Ok(())
}

fn apply_moves(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    outcome: &WalkOutcome,
) -> Result<CommitPosition, LabelResolutionError> {
    let mut resolved = outcome.settled;
    if let Some((pos, excluded)) = &outcome.final_split {
        let members = stream.get(*pos)?.members().to_vec();
        let included: HashSet<FileId> = members.iter().map(|m| m.file).filter(|f| !excluded.contains(f)).collect();
        let new_pos = stream.split_and_move(*pos, &included)?;
        rewrite_backrefs(catalog, stream, *pos)?;
        if new_pos != *pos {
            rewrite_backrefs(catalog, stream, new_pos)?;
        }
        stream.move_after(new_pos, outcome.anchor)?;
        resolved = new_pos;
    }
    for &pos in outcome.noise.iter().rev() {
        stream.move_after(pos, outcome.anchor)?;
    }
    Ok(resolved)
}

/// Missing/extra reconciliation (§4.6 step 5) against the candidate's
/// settled branch state. Returns the (possibly unchanged) final commit.
#[allow(clippy::too_many_arguments)]
fn reconcile(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    kind: &LabelKind,
    label: &str,
    final_branch: &str,
    filtered: &[CommitPosition],
    resolved: CommitPosition,
    settings: &ImporterSettings,
    diagnostics: &mut DiagnosticLog,
) -> Result<CommitPosition, LabelResolutionError> {
    let mut state = RepositoryState::new(Flavor::Full);
    let mut chain = Vec::new();
    let mut cursor = Some(final_branch.to_string());
    while let Some(branch) = cursor {
        cursor = stream.parent_branch(&branch).map(str::to_string);
        chain.push(branch);
    }
    for branch in chain.iter().rev() {
        state.start_branch(branch, stream.parent_branch(branch));
    }
    let resolved_index = stream.get(resolved)?.index();
    for &pos in filtered {
        if stream.get(pos)?.index() > resolved_index {
            break;
        }
        let commit = stream.get(pos)?;
        state.apply(commit, false, catalog)?;
    }
    let branch_state = state
        .branch(final_branch)
        .ok_or_else(|| LabelResolutionError::NoCandidate(label.to_string()))?;

    let mut extra_files = Vec::new();
    for (file, _) in branch_state.live_files() {
        let info = catalog.get(file)?;
        if (kind.target_revision)(&info, label).is_none() {
            extra_files.push(file);
        }
    }
    let mut missing_files = Vec::new();
    for id in catalog.ids() {
        let info = catalog.get(id)?;
        let Some(target) = (kind.target_revision)(&info, label) else {
            continue;
        };
        if (kind.suppress_missing)(&info, label) {
            continue;
        }
        if branch_state.revision_of(id).is_none() {
            missing_files.push((id, target));
        }
    }

    let mut resolved = resolved;
    let mut extra = 0usize;
    for file in extra_files {
        match find_and_apply_extra(stream, file, final_branch, resolved)? {
            Some(new_resolved) => resolved = new_resolved,
            None => extra += 1,
        }
    }
    if extra as u32 > settings.partial_label_threshold {
        if settings.continue_on_error {
            diagnostics.push(
                Diagnostic::new(
                    Severity::Warning,
                    Stage::LabelResolution,
                    format!(
                        "label resolved with {extra} extra file(s), exceeding threshold of {}",
                        settings.partial_label_threshold
                    ),
                )
                .with_label(label),
            );
        } else {
            return Err(LabelResolutionError::Partial {
                label: label.to_string(),
                extra,
                threshold: settings.partial_label_threshold,
            });
        }
    }

    for (id, target) in missing_files {
        match find_and_apply_missing(stream, id, &target, final_branch, resolved)? {
            Some(new_resolved) => resolved = new_resolved,
            None => {
                return Err(LabelResolutionError::UnreachableMissing {
                    label: label.to_string(),
                    file: catalog.get(id)?.name().to_string(),
                });
            }
        }
    }
    Ok(resolved)
}

/// Searches forward from `resolved` on `final_branch` for a live revision of
/// `file` equal to `target`. If found, the candidate advances to that commit
/// and any other commit strictly between `resolved` and it that also touches
/// `file` follows it there (§4.6 step 5). Failing that, searches backward for
/// a dead revision, which needs no move since it already explains the file's
/// absence at `resolved`. Returns `None`, leaving `resolved` untouched, if
/// neither exists.
fn find_and_apply_missing(
    stream: &mut BranchStreamCollection,
    file: FileId,
    target: &Revision,
    final_branch: &str,
    resolved: CommitPosition,
) -> Result<Option<CommitPosition>, LabelResolutionError> {
    let chain = stream.branch_chain(final_branch);
    let resolved_index = stream.get(resolved)?.index();

    let mut add_pos = None;
    for &pos in &chain {
        if stream.get(pos)?.index() <= resolved_index {
            continue;
        }
        if stream
            .get(pos)?
            .members()
            .iter()
            .any(|m| m.file == file && !m.is_dead && m.revision == *target)
        {
            add_pos = Some(pos);
            break;
        }
    }
    if let Some(add_pos) = add_pos {
        let add_index = stream.get(add_pos)?.index();
        let mut intervening = Vec::new();
        for &pos in &chain {
            let idx = stream.get(pos)?.index();
            if idx <= resolved_index {
                continue;
            }
            if idx >= add_index {
                break;
            }
            if stream.get(pos)?.members().iter().any(|m| m.file == file) {
                intervening.push(pos);
            }
        }
        for pos in intervening.into_iter().rev() {
            stream.move_after(pos, add_pos)?;
        }
        return Ok(Some(add_pos));
    }

    for &pos in chain.iter().rev() {
        if stream.get(pos)?.index() >= resolved_index {
            continue;
        }
        if stream.get(pos)?.members().iter().any(|m| m.file == file && m.is_dead) {
            return Ok(Some(resolved));
        }
    }
    Ok(None)
}

/// Searches around `resolved` on `final_branch` for a way to account for an
/// "extra" live file the label has no revision for: a stray add sitting
/// before `resolved` (moved forward past it, so the file is no longer live
/// there) or a delete sitting after it (the candidate advances to it). The
/// closer of the two wins; ties favor the forward delete (§4.6 step 5's third
/// bullet). Returns `None`, leaving `resolved` untouched and the file still
/// counted as extra, if neither exists.
fn find_and_apply_extra(
    stream: &mut BranchStreamCollection,
    file: FileId,
    final_branch: &str,
    resolved: CommitPosition,
) -> Result<Option<CommitPosition>, LabelResolutionError> {
    let chain = stream.branch_chain(final_branch);
    let resolved_index = stream.get(resolved)?.index();

    let mut backward_add = None;
    for &pos in chain.iter().rev() {
        if stream.get(pos)?.index() >= resolved_index {
            continue;
        }
        if stream.get(pos)?.members().iter().any(|m| m.file == file && !m.is_dead) {
            backward_add = Some(pos);
            break;
        }
    }
    let mut forward_delete = None;
    for &pos in &chain {
        if stream.get(pos)?.index() <= resolved_index {
            continue;
        }
        if stream.get(pos)?.members().iter().any(|m| m.file == file && m.is_dead) {
            forward_delete = Some(pos);
            break;
        }
    }

    let back_distance = match backward_add {
        Some(pos) => Some(resolved_index - stream.get(pos)?.index()),
        None => None,
    };
    let fwd_distance = match forward_delete {
        Some(pos) => Some(stream.get(pos)?.index() - resolved_index),
        None => None,
    };

    match (back_distance, fwd_distance) {
        (None, None) => Ok(None),
        (Some(back), Some(fwd)) if back < fwd => {
            stream.move_after(backward_add.expect("back_distance implies backward_add"), resolved)?;
            Ok(Some(resolved))
        }
        (_, Some(_)) => Ok(forward_delete),
        (Some(_), None) => {
            stream.move_after(backward_add.expect("back_distance implies backward_add"), resolved)?;
            Ok(Some(resolved))
        }
    }
}

/// Resolves a single label end to end: candidate set, branch-path check,
/// filter, walk, apply, reconcile.
#[instrument(skip(catalog, stream, settings, diagnostics), fields(label))]
pub fn resolve_label(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    kind: &LabelKind,
    label: &str,
    settings: &ImporterSettings,
    diagnostics: &mut DiagnosticLog,
) -> Result<ResolvedLabel, LabelResolutionError> {
    let mut candidates = Vec::new();
    for pos in stream.in_global_order() {
        let commit = stream.get(pos)?;
        for member in commit.members() {
            let info = catalog.get(member.file)?;
            if let Some(target) = (kind.target_revision)(&info, label) {
                if member.revision == target {
                    candidates.push(pos);
                    break;
                }
            }
        }
    }
    if candidates.is_empty() {
        return Err(LabelResolutionError::NoCandidate(label.to_string()));
    }

    let mut path = Vec::new();
    for &pos in &candidates {
        let branch = stream.get(pos)?.branch().to_string();
        if path.last() != Some(&branch) {
            path.push(branch);
        }
    }
    let mut seen = HashSet::new();
    for branch in &path {
        if !seen.insert(branch.clone()) {
            return Err(LabelResolutionError::InconsistentBranchPath(label.to_string(), branch.clone()));
        }
    }
    let final_branch = path.last().expect("at least one candidate").clone();

    let mut ancestors = HashSet::new();
    let mut cursor = Some(final_branch.clone());
    while let Some(branch) = cursor {
        cursor = stream.parent_branch(&branch).map(str::to_string);
        ancestors.insert(branch);
    }
    let mut filtered = Vec::new();
    for pos in stream.in_global_order() {
        if ancestors.contains(stream.get(pos)?.branch()) {
            filtered.push(pos);
        }
    }

    let outcome = walk(catalog, stream, kind, label, &candidates, &filtered, &final_branch)?;

    if settings.no_reorder && (outcome.final_split.is_some() || !outcome.noise.is_empty()) {
        return Err(LabelResolutionError::NoCandidate(label.to_string()));
    }

    let resolved = apply_moves(catalog, stream, &outcome)?;

    let mut filtered_after = Vec::new();
    for pos in stream.in_global_order() {
        if ancestors.contains(stream.get(pos)?.branch()) {
            filtered_after.push(pos);
        }
    }
    let resolved = reconcile(
        catalog,
        stream,
        kind,
        label,
        &final_branch,
        &filtered_after,
        resolved,
        settings,
        diagnostics,
    )?;
    Ok(ResolvedLabel { commit: resolved })
}

/// Resolves every label in `labels`, downgrading a failure to a diagnostic
/// (and skipping that label) when `settings.continue_on_error` is set.
pub fn resolve_labels(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    kind: &LabelKind,
    labels: &[String],
    settings: &ImporterSettings,
    diagnostics: &mut DiagnosticLog,
) -> Result<Vec<(String, ResolvedLabel)>, LabelResolutionError> {
    let mut resolved = Vec::new();
    for label in labels {
        match resolve_label(catalog, stream, kind, label, settings, diagnostics) {
            Ok(r) => resolved.push((label.clone(), r)),
            Err(err) if settings.continue_on_error => {
                diagnostics.push(
                    Diagnostic::new(Severity::Warning, Stage::LabelResolution, format!("label left unresolved: {err}"))
                        .with_label(label.as_str()),
                );
            }
            Err(err) => return Err(err),
        }
    }
    Ok(resolved)
}

/// §4.8: for each branch matched by a rename rule, adopt the corresponding
/// already-resolved tag's commit as its branchpoint, re-parenting the
/// branch's root and sliding any stray commits already on it to follow.
/// Branches with no matching resolved tag fall through untouched (the
/// caller has already resolved them via [`branch_kind`] instead).
pub fn apply_manual_branchpoints(
    stream: &mut BranchStreamCollection,
    manual: &[(String, String)],
    resolved_tags: &[(String, ResolvedLabel)],
) -> Result<(), BranchStreamError> {
    for (branch, tag_name) in manual {
        let Some((_, resolved)) = resolved_tags.iter().find(|(name, _)| name == tag_name) else {
            continue;
        };
        stream.reattach_root(branch, resolved.commit)?;
        if let Some(root) = stream.root(branch) {
            if root != resolved.commit {
                stream.move_after(root, resolved.commit)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch_stream::BranchStreamCollection;
    use crate::commit::{Commit, FileRevision};
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

    fn dead_member(file: FileId, revision: &[u32]) -> FileRevision {
        let mut m = member(file, revision);
        m.is_dead = true;
        m
    }

    #[test]
    fn split_across_commits() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        catalog.get_mut(f1).unwrap().bind_tag("t", interner().intern(&[1, 2]).unwrap()).unwrap();
        catalog.get_mut(f2).unwrap().bind_tag("t", interner().intern(&[1, 2]).unwrap()).unwrap();

        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1]), member(f2, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f1, &[1, 2])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 3]), member(f2, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let settings = ImporterSettings::default();
        let kind = tag_kind();
        let mut diagnostics = DiagnosticLog::new();
        let resolved = resolve_label(&catalog, &mut stream, &kind, "t", &settings, &mut diagnostics).unwrap();

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2-1", "c2-2"]);
        assert_eq!(stream.get(resolved.commit).unwrap().commit_id(), "c2-1");
        assert_eq!(stream.get(resolved.commit).unwrap().members().len(), 1);
    }

    #[test]
    fn reorder_with_add_in_middle() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let f3 = catalog.get_or_create("f3");
        catalog.get_mut(f1).unwrap().bind_tag("t", interner().intern(&[1, 1]).unwrap()).unwrap();
        catalog.get_mut(f2).unwrap().bind_tag("t", interner().intern(&[1, 2]).unwrap()).unwrap();

        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1]), member(f2, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f3, &[1, 1])]),
            Commit::new("c2", "MAIN", vec![member(f2, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let settings = ImporterSettings::default();
        let kind = tag_kind();
        let mut diagnostics = DiagnosticLog::new();
        let resolved = resolve_label(&catalog, &mut stream, &kind, "t", &settings, &mut diagnostics).unwrap();

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c2", "c1"]);
        assert_eq!(stream.get(resolved.commit).unwrap().commit_id(), "c2");
    }

    #[test]
    fn file_deleted_before_tag_needs_no_reorder() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        catalog.get_mut(f1).unwrap().bind_tag("t", interner().intern(&[1, 2]).unwrap()).unwrap();

        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1]), member(f2, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![dead_member(f2, &[1, 2])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let settings = ImporterSettings::default();
        let kind = tag_kind();
        let mut diagnostics = DiagnosticLog::new();
        let resolved = resolve_label(&catalog, &mut stream, &kind, "t", &settings, &mut diagnostics).unwrap();

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
        assert_eq!(stream.get(resolved.commit).unwrap().commit_id(), "c2");
    }

    #[test]
    fn missing_reconciliation_advances_to_forward_add_and_carries_intervening_commit() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f2, &[1, 1])]),
            Commit::new("c2", "MAIN", vec![member(f1, &[1, 5])]),
            Commit::new("c3", "MAIN", vec![member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let resolved = stream.by_commit_id("c0").unwrap();
        let target = interner().intern(&[1, 2]).unwrap();

        let outcome = find_and_apply_missing(&mut stream, f1, &target, "MAIN", resolved).unwrap();
        assert_eq!(outcome, Some(stream.by_commit_id("c3").unwrap()));

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c3", "c2"]);
    }

    #[test]
    fn missing_reconciliation_accepts_preceding_delete_without_a_move() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![dead_member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f2, &[1, 1])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let resolved = stream.by_commit_id("c1").unwrap();
        let target = interner().intern(&[9, 9]).unwrap();

        let outcome = find_and_apply_missing(&mut stream, f1, &target, "MAIN", resolved).unwrap();
        assert_eq!(outcome, Some(resolved));

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c1"]);
    }

    #[test]
    fn missing_reconciliation_reports_failure_when_unreachable() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commits = vec![Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])])];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let resolved = stream.by_commit_id("c0").unwrap();
        let target = interner().intern(&[9, 9]).unwrap();

        let outcome = find_and_apply_missing(&mut stream, f1, &target, "MAIN", resolved).unwrap();
        assert_eq!(outcome, None);
    }

    #[test]
    fn extra_reconciliation_prefers_forward_delete_on_tie_or_closer() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f2, &[1, 1])]),
            Commit::new("c2", "MAIN", vec![member(f2, &[1, 2])]),
            Commit::new("c3", "MAIN", vec![dead_member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let resolved = stream.by_commit_id("c2").unwrap();

        let outcome = find_and_apply_extra(&mut stream, f1, "MAIN", resolved).unwrap();
        assert_eq!(outcome, Some(stream.by_commit_id("c3").unwrap()));

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3"]);
    }

    #[test]
    fn extra_reconciliation_moves_closer_backward_add_past_the_candidate() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let f2 = catalog.get_or_create("f2");
        let commits = vec![
            Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])]),
            Commit::new("c1", "MAIN", vec![member(f2, &[1, 1])]),
            Commit::new("c2", "MAIN", vec![member(f2, &[1, 2])]),
            Commit::new("c3", "MAIN", vec![dead_member(f1, &[1, 2])]),
        ];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let resolved = stream.by_commit_id("c1").unwrap();

        let outcome = find_and_apply_extra(&mut stream, f1, "MAIN", resolved).unwrap();
        assert_eq!(outcome, Some(resolved));

        let chain = stream.branch_chain("MAIN");
        let ids: Vec<_> = chain.iter().map(|&p| stream.get(p).unwrap().commit_id().to_string()).collect();
        assert_eq!(ids, vec!["c1", "c0", "c2", "c3"]);
    }

    #[test]
    fn no_candidate_is_an_error() {
        let mut catalog = FileCatalog::new();
        let f1 = catalog.get_or_create("f1");
        let commits = vec![Commit::new("c0", "MAIN", vec![member(f1, &[1, 1])])];
        let mut stream = BranchStreamCollection::build(commits, &catalog, "MAIN").unwrap();
        let settings = ImporterSettings::default();
        let kind = tag_kind();
        assert!(matches!(
            resolve_label(&catalog, &mut stream, &kind, "nonexistent", &settings, &mut DiagnosticLog::new()),
            Err(LabelResolutionError::NoCandidate(_))
        ));
    }
}
