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

//! Fixture builders shared by `cvsimport-core`'s integration tests: revision
//! shorthand, `LogRecord` builders in the order a real log emits them, and a
//! fixed in-memory `LogSource`.

use std::collections::VecDeque;

use cvsimport_core::adapters::{LogRecord, LogSource, LogSourceError, RevisionState, SymbolKind};
use cvsimport_core::revision::{interner, Revision};
use cvsimport_core::time::Timestamp;

pub fn rev(parts: &[u32]) -> Revision {
    interner().intern(parts).unwrap()
}

pub fn file_header(path: &str, keyword_substitution: bool) -> LogRecord {
    LogRecord::FileHeader {
        path: path.to_string(),
        keyword_substitution,
    }
}

pub fn tag_record(name: &str, revision: &[u32]) -> LogRecord {
    LogRecord::SymbolicName {
        name: name.to_string(),
        revision: rev(revision),
        kind: SymbolKind::Tag,
    }
}

pub fn branch_record(name: &str, marker: &[u32]) -> LogRecord {
    LogRecord::SymbolicName {
        name: name.to_string(),
        revision: rev(marker),
        kind: SymbolKind::Branch,
    }
}

/// A live revision record with no commit-id (groups by message/time gap) or
/// mergepoint. Use the `_full` variant below for the other cases.
pub fn revision_record(revision: &[u32], time: i64, author: &str, message: &str) -> LogRecord {
    revision_record_full(revision, time, author, None, None, false, message)
}

#[allow(clippy::too_many_arguments)]
pub fn revision_record_full(
    revision: &[u32],
    time: i64,
    author: &str,
    commit_id: Option<&str>,
    mergepoint: Option<&[u32]>,
    is_dead: bool,
    message: &str,
) -> LogRecord {
    LogRecord::Revision {
        revision: rev(revision),
        time: Timestamp::from_epoch_seconds(time),
        author: author.to_string(),
        commit_id: commit_id.map(str::to_string),
        mergepoint: mergepoint.map(rev),
        state: if is_dead { RevisionState::Dead } else { RevisionState::Live },
        message: message.to_string(),
    }
}

/// A `LogSource` draining a fixed, in-memory record list front to back, as if
/// it had already parsed the whole legacy log.
pub struct VecLogSource {
    records: VecDeque<LogRecord>,
}

impl VecLogSource {
    pub fn new(records: Vec<LogRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl LogSource for VecLogSource {
    fn records(&mut self) -> Result<Option<LogRecord>, LogSourceError> {
        Ok(self.records.pop_front())
    }
}
