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

//! Playback ordering (§4.10): the final emission sequence over a resolved
//! branch-stream, respecting branchpoint and merge-source prefix closure.

use std::collections::HashSet;

use thiserror::Error;
use tracing::instrument;

use crate::branch_stream::{BranchStreamCollection, BranchStreamError};
use crate::commit::CommitPosition;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    BranchStream(#[from] BranchStreamError),
}

/// Yields every commit in the stream exactly once, in an order where a
/// commit's predecessor, branchpoint, and merge source (if any) always
/// precede it (§4.10's contract).
#[instrument(skip_all)]
pub fn playback_order(stream: &BranchStreamCollection) -> Result<Vec<CommitPosition>, PlaybackError> {
    let mut heads: Vec<(String, Option<CommitPosition>)> = stream
        .branches()
        .map(|branch| (branch.to_string(), stream.root(branch)))
        .collect();
    heads.sort_by(|a, b| a.0.cmp(&b.0));

    let mut emitted = HashSet::new();
    let mut out = Vec::new();

    loop {
        // Advance each head past whatever a merge fast-forward already
        // emitted on its behalf, dropping branches run to completion.
        for head in &mut heads {
            while let Some(pos) = head.1 {
                if emitted.contains(&pos) {
                    head.1 = stream.get(pos)?.successor();
                } else {
                    break;
                }
            }
        }

        let next = heads
            .iter()
            .enumerate()
            .filter_map(|(i, (_, pos))| pos.map(|p| (i, p)))
            .min_by_key(|(_, pos)| stream.get(*pos).expect("head position is valid").time().epoch_seconds());

        let Some((branch_index, head)) = next else {
            break;
        };
        fast_forward_branch_up_to(stream, head, &mut emitted, &mut out)?;
        heads[branch_index].1 = stream.get(head)?.successor();
    }
    Ok(out)
}

/// Emits `pos`'s merge source chain (recursively fast-forwarding any stacked
/// sources) before emitting `pos` itself. Idempotent: a position already in
/// `emitted` is skipped.
fn fast_forward_and_emit(
    stream: &BranchStreamCollection,
    pos: CommitPosition,
    emitted: &mut HashSet<CommitPosition>,
    out: &mut Vec<CommitPosition>,
) -> Result<(), PlaybackError> {
    if emitted.contains(&pos) {
        return Ok(());
    }
    if let Some(merge_from) = stream.get(pos)?.merge_from() {
        fast_forward_branch_up_to(stream, merge_from, emitted, out)?;
    }
    emitted.insert(pos);
    out.push(pos);
    Ok(())
}

/// Emits every not-yet-emitted commit on `target`'s branch chain from its
/// branch root up to and including `target`, fast-forwarding each one's own
/// merge source first.
fn fast_forward_branch_up_to(
    stream: &BranchStreamCollection,
    target: CommitPosition,
    emitted: &mut HashSet<CommitPosition>,
    out: &mut Vec<CommitPosition>,
) -> Result<(), PlaybackError> {
    if emitted.contains(&target) {
        return Ok(());
    }
    let branch = stream.get(target)?.branch().to_string();
    if let Some(root) = stream.root(&branch) {
        if let Some(predecessor) = stream.get(root)?.predecessor() {
            fast_forward_branch_up_to(stream, predecessor, emitted, out)?;
        }
        let mut cursor = Some(root);
        while let Some(pos) = cursor {
            fast_forward_and_emit(stream, pos, emitted, out)?;
            if pos == target {
                break;
            }
            cursor = stream.get(pos)?.successor();
        }
    }
    Ok(())
}
