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

//! Groups a flat stream of [`FileRevision`]s into [`Commit`]s (§4.2).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::instrument;

use crate::catalog::{branch_name_for, CatalogError, FileCatalog};
use crate::commit::{Commit, FileRevision};

/// Consecutive commit-id-less revisions with the same message split into a
/// new synthetic commit once their timestamps are this many seconds apart.
const AGGREGATION_GAP_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

static ADDED_ON_BRANCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"was initially added on branch (?P<branch>\S+)").unwrap());

/// True for the marker revision CVS writes when a file is first introduced
/// directly on a branch: a dead `1.1` whose message names the branch.
fn added_on_branch(revision: &FileRevision) -> Option<String> {
    if revision.revision.parts() != [1, 1] || !revision.is_dead {
        return None;
    }
    ADDED_ON_BRANCH
        .captures(&revision.message)
        .map(|caps| caps["branch"].to_string())
}

/// Groups `revisions` into commits, consuming "added on branch" markers into
/// the catalog's `branch_added_on` annotations instead of emitting a commit
/// for them. Returns commits sorted by time.
#[instrument(skip(catalog, revisions))]
pub fn aggregate_commits(
    catalog: &mut FileCatalog,
    revisions: Vec<FileRevision>,
    main_branch_name: &str,
) -> Result<Vec<Commit>, AggregationError> {
    let mut by_commit_id: BTreeMap<String, Vec<FileRevision>> = BTreeMap::new();
    let mut by_message: BTreeMap<String, Vec<FileRevision>> = BTreeMap::new();

    for revision in revisions {
        if let Some(branch) = added_on_branch(&revision) {
            let mut file = catalog.get_mut(revision.file)?;
            if file.branch_added_on.is_none() {
                file.branch_added_on = Some(branch);
            }
            continue;
        }
        if revision.commit_id.is_empty() {
            by_message
                .entry(revision.message.clone())
                .or_default()
                .push(revision);
        } else {
            by_commit_id
                .entry(revision.commit_id.clone())
                .or_default()
                .push(revision);
        }
    }

    let mut commits = Vec::new();

    for (commit_id, members) in by_commit_id {
        let branch = branch_name_for(catalog, members[0].file, &members[0].revision, main_branch_name)?;
        commits.push(Commit::new(commit_id, branch, members));
    }

    for (message, mut members) in by_message {
        members.sort_by_key(|m| m.time.epoch_seconds());
        let mut run: Vec<FileRevision> = Vec::new();
        let mut seq = 0u32;
        for member in members {
            if let Some(last) = run.last() {
                if member.time.gap(last.time) > AGGREGATION_GAP_SECONDS {
                    commits.push(synthesize_commit(catalog, std::mem::take(&mut run), seq, main_branch_name)?);
                    seq += 1;
                }
            }
            run.push(member);
        }
        if !run.is_empty() {
            commits.push(synthesize_commit(catalog, run, seq, main_branch_name)?);
        }
    }

    commits.sort_by_key(|c| c.time().epoch_seconds());
    Ok(commits)
}

fn synthesize_commit(
    catalog: &FileCatalog,
    members: Vec<FileRevision>,
    seq: u32,
    main_branch_name: &str,
) -> Result<Commit, CatalogError> {
    let first = &members[0];
    let date: DateTime<Utc> =
        DateTime::from_timestamp(first.time.epoch_seconds(), 0).unwrap_or_default();
    let commit_id = format!("{}-{}-{seq}", date.format("%y%m%d"), first.author);
    let branch = branch_name_for(catalog, first.file, &first.revision, main_branch_name)?;
    Ok(Commit::new(commit_id, branch, members))
}
