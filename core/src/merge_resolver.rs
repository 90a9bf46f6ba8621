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

//! Merge-edge resolution (§4.9): for every commit carrying per-file
//! mergepoint markers, elects a single source commit on the branch those
//! markers name, detecting and reordering crossed merges.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use crate::branch_stream::{BranchStreamCollection, BranchStreamError};
use crate::catalog::{CatalogError, FileCatalog};
use crate::commit::CommitPosition;
use crate::diagnostics::{Diagnostic, DiagnosticLog, Severity, Stage};

#[derive(Debug, Error)]
pub enum MergeResolutionError {
    #[error(transparent)]
    BranchStream(#[from] BranchStreamError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Elects and links `merge_from` for every commit in the stream that carries
/// mergepoint markers, in branch-registration order and chain order within
/// each branch. `last_merge_from` tracks, per source branch, the most
/// recently elected source commit, so a later election that lands behind it
/// is detected as a crossed merge and reordered forward.
#[instrument(skip_all)]
pub fn resolve_merges(
    catalog: &FileCatalog,
    stream: &mut BranchStreamCollection,
    diagnostics: &mut DiagnosticLog,
) -> Result<(), MergeResolutionError> {
    let branches: Vec<String> = stream.branches().map(str::to_string).collect();
    let mut last_merge_from: HashMap<String, CommitPosition> = HashMap::new();

    for branch in branches {
        for destination in stream.branch_chain(&branch) {
            let Some(source) = elect_source(catalog, stream, destination)? else {
                continue;
            };
            let source_branch = stream.get(source)?.branch().to_string();
            let destination_branch = stream.get(destination)?.branch().to_string();

            // A merge source must depart from the destination's own branch;
            // otherwise this is a merge from an ancestor or an excluded
            // branch, and is left unresolved.
            if stream.parent_branch(&source_branch) != Some(destination_branch.as_str()) {
                continue;
            }

            if let Some(&prior) = last_merge_from.get(&source_branch) {
                if stream.get(source)?.index() < stream.get(prior)?.index() {
                    let source_is_branchpoint = !stream.get(source)?.branches().is_empty();
                    let prior_is_branchpoint = !stream.get(prior)?.branches().is_empty();
                    if source_is_branchpoint || prior_is_branchpoint {
                        diagnostics.push(
                            Diagnostic::new(
                                Severity::Warning,
                                Stage::MergeResolution,
                                format!(
                                    "crossed merge on branch {source_branch:?} detected but a branchpoint blocks reordering"
                                ),
                            )
                            .with_commit(stream.get(source)?.commit_id().to_string()),
                        );
                    } else {
                        stream.move_after(source, prior)?;
                    }
                }
            }

            stream.set_merge_from(destination, Some(source));
            last_merge_from.insert(source_branch, source);
        }
    }
    Ok(())
}

/// The commit with greatest index among the commits that own the mergepoint
/// revisions named by `destination`'s members, or `None` if it carries no
/// mergepoint markers (or none of them resolve to a known commit).
fn elect_source(
    catalog: &FileCatalog,
    stream: &BranchStreamCollection,
    destination: CommitPosition,
) -> Result<Option<CommitPosition>, MergeResolutionError> {
    let mut best: Option<CommitPosition> = None;
    for member in stream.get(destination)?.members() {
        let Some(mergepoint) = &member.mergepoint else {
            continue;
        };
        let info = catalog.get(member.file)?;
        let Some(commit_id) = info.commit_for(mergepoint) else {
            continue;
        };
        let Some(owner) = stream.by_commit_id(commit_id) else {
            continue;
        };
        let owner_index = stream.get(owner)?.index();
        if best.map_or(true, |b| stream.get(b).map(|c| c.index()).unwrap_or(0) < owner_index) {
            best = Some(owner);
        }
    }
    Ok(best)
}
