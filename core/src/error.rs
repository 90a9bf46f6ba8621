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

//! The top-level error taxonomy (§7): every stage's error composed into one
//! `thiserror` enum the `Importer` driver returns.

use thiserror::Error;

use crate::aggregate::AggregationError;
use crate::branch_stream::BranchStreamError;
use crate::catalog::CatalogError;
use crate::filter::FilterError;
use crate::head_only::HeadOnlyError;
use crate::label_resolver::LabelResolutionError;
use crate::merge_resolver::MergeResolutionError;
use crate::playback::PlaybackError;
use crate::repo_state::RepoStateError;
use crate::revision::RevisionError;

use crate::adapters::LogSourceError;

/// A post-resolution invariant violation: the final commit set failed a
/// consistency check the rest of the pipeline assumes holds (§7's
/// "ImportFailed" category). Always fatal, regardless of `continue_on_error`.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ImportError {
    #[error("commit {commit_id:?} was moved to an unreachable destination during resolution")]
    UnreachableMove { commit_id: String },
    #[error("branch {branch:?}'s branchpoint commit does not list it in its branches set")]
    MissingBranchpointLinkage { branch: String },
}

/// The top-level error type the `Importer` driver returns. Composes every
/// stage's own error type; `RepositoryConsistency` strict-apply violations
/// surface as `RepoState`, parse failures as `Parse`.
#[derive(Debug, Error)]
pub enum ImporterError {
    #[error("cancelled")]
    Cancelled,
    #[error("parse error: {0}")]
    Parse(#[from] LogSourceError),
    #[error(transparent)]
    Revision(#[from] RevisionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    BranchStream(#[from] BranchStreamError),
    #[error(transparent)]
    RepoState(#[from] RepoStateError),
    #[error(transparent)]
    LabelResolution(#[from] LabelResolutionError),
    #[error(transparent)]
    MergeResolution(#[from] MergeResolutionError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    HeadOnly(#[from] HeadOnlyError),
    #[error(transparent)]
    Import(#[from] ImportError),
}
