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

//! External collaborator interfaces (§6): the legacy-log source, the content
//! fetcher, the fast-import-style emitter, and the progress reporter. The
//! core only consumes these traits; parsers, fetchers, and emitters are the
//! embedder's responsibility.

use thiserror::Error;

use crate::revision::Revision;
use crate::time::Timestamp;

#[derive(Debug, Error)]
pub enum LogSourceError {
    #[error("malformed log record: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to fetch {file:?} at revision {revision:?}: {reason}")]
    Fetch {
        file: String,
        revision: Revision,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("emitter rejected record: {0}")]
    Rejected(String),
}

/// Whether a symbolic-name binding names a tag (single revision) or a branch
/// (marker revision).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum SymbolKind {
    Tag,
    Branch,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum RevisionState {
    Live,
    Dead,
}

/// One record pulled from the legacy log: a file's header, a symbolic-name
/// binding, or a single per-file revision event.
#[derive(Clone, Debug)]
pub enum LogRecord {
    FileHeader {
        path: String,
        keyword_substitution: bool,
    },
    SymbolicName {
        name: String,
        revision: Revision,
        kind: SymbolKind,
    },
    Revision {
        revision: Revision,
        time: Timestamp,
        author: String,
        commit_id: Option<String>,
        mergepoint: Option<Revision>,
        state: RevisionState,
        message: String,
    },
}

/// A pull-based stream of parsed log records, so the embedder's parser can
/// stream records without materializing the whole log up front.
pub trait LogSource {
    fn records(&mut self) -> Result<Option<LogRecord>, LogSourceError>;
}

/// Bytes plus metadata for one (file, revision) pair.
#[derive(Clone, Debug)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub is_binary: bool,
    pub is_dead: bool,
}

/// Retrieves file content for a given (file, revision). Must tolerate up to
/// `cvs_processes` concurrent calls; the core itself never calls this
/// concurrently — that's the emitter driver's job, outside the core.
pub trait ContentFetcher: Send + Sync {
    fn fetch(&self, file: &str, revision: &Revision) -> Result<FileContent, ContentError>;
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum FileMode {
    Normal,
    Executable,
    Symlink,
}

/// One file-tree change attached to an emitted commit.
#[derive(Clone, Debug)]
pub enum FileOp {
    Delete { path: String },
    Modify { mode: FileMode, path: String, content: Vec<u8> },
}

/// One commit handed to the emitter, in playback order.
#[derive(Clone, Debug)]
pub struct EmitCommit {
    pub branch: String,
    pub mark: u64,
    pub author: String,
    pub time: Timestamp,
    pub message: Vec<u8>,
    pub predecessor_mark: Option<u64>,
    pub merge_from_mark: Option<u64>,
    pub file_ops: Vec<FileOp>,
}

/// One resolved label, emitted after every commit.
#[derive(Clone, Debug)]
pub struct EmitTag {
    pub name: String,
    pub commit_mark: u64,
    pub tagger: String,
    pub time: Timestamp,
}

/// Streams the finished DAG out to the target version-control tool.
pub trait Emitter {
    fn emit_commit(&mut self, record: EmitCommit) -> Result<(), EmitError>;
    fn emit_tag(&mut self, record: EmitTag) -> Result<(), EmitError>;
}

/// A pipeline stage the `Importer` driver reports progress against.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Stage {
    Aggregate,
    Filter,
    BranchStream,
    LabelResolution,
    MergeResolution,
    HeadOnlyOverlay,
    Playback,
}

/// Progress UI hook. Every method defaults to a no-op so embedders that
/// don't care pay nothing.
pub trait ProgressReporter {
    fn stage_started(&mut self, stage: Stage, total: Option<u64>) {
        let _ = (stage, total);
    }

    fn stage_progress(&mut self, done: u64) {
        let _ = done;
    }

    fn stage_finished(&mut self, stage: Stage) {
        let _ = stage;
    }
}

/// The default reporter: observes nothing.
#[derive(Default)]
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {}
