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

//! Durable, inspectable record of non-fatal pipeline events. `tracing`
//! carries the same information for live observability, but a `Diagnostic`
//! is never lost even if nobody was listening: every skip/downgrade decision
//! is pushed here, not just logged (§7).

use std::fmt;

/// Which pipeline stage produced a diagnostic. Mirrors the §2 stage order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Aggregation,
    Filter,
    Verification,
    BranchStream,
    LabelResolution,
    MergeResolution,
    Playback,
    HeadOnly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Aggregation => "aggregation",
            Stage::Filter => "filter",
            Stage::Verification => "verification",
            Stage::BranchStream => "branch-stream",
            Stage::LabelResolution => "label-resolution",
            Stage::MergeResolution => "merge-resolution",
            Stage::Playback => "playback",
            Stage::HeadOnly => "head-only",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded non-fatal event: a verification error, a skipped label, a
/// downgraded failure.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    /// Commit id this diagnostic is about, if any.
    pub commit_id: Option<String>,
    /// Label name this diagnostic is about, if any.
    pub label: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            message: message.into(),
            commit_id: None,
            label: None,
        }
    }

    pub fn with_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = Some(commit_id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Accumulates diagnostics across the whole run. Returned alongside the
/// finished commit sequence; never consulted by the pipeline itself to make
/// decisions (that's what `ImporterSettings` is for).
#[derive(Clone, Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                stage = %diagnostic.stage,
                commit_id = diagnostic.commit_id.as_deref().unwrap_or(""),
                label = diagnostic.label.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                stage = %diagnostic.stage,
                commit_id = diagnostic.commit_id.as_deref().unwrap_or(""),
                label = diagnostic.label.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
