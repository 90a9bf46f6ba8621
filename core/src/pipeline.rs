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

//! The pipeline driver (§4.12): `Importer` owns the run's settings,
//! revision interner, and diagnostic log, and exposes one method per stage
//! plus `run_to_playback`, which chains all of them in §2 order and checks
//! for cancellation between stages.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::instrument;

use crate::adapters::{LogRecord, LogSource, LogSourceError, RevisionState, SymbolKind};
use crate::aggregate::aggregate_commits;
use crate::branch_stream::BranchStreamCollection;
use crate::catalog::FileCatalog;
use crate::commit::{Commit, CommitPosition, FileRevision};
use crate::diagnostics::DiagnosticLog;
use crate::error::{ImportError, ImporterError};
use crate::filter::{apply_exclusion_filter, split_multi_branch, verify_and_backlink, FilterOutcome};
use crate::head_only::apply_head_only_overlay;
use crate::label_resolver::{apply_manual_branchpoints, branch_kind, resolve_labels, tag_kind, ResolvedLabel};
use crate::merge_resolver::resolve_merges;
use crate::playback::playback_order;
use crate::repo_state::RepositoryState;
use crate::revision::RevisionInterner;
use crate::rules::IncludeRules;
use crate::settings::ImporterSettings;

/// Adapts a caller-owned `AtomicBool` into the `Fn() -> bool` predicate
/// `Importer`'s stage-boundary checks expect.
pub fn atomic_cancel_flag(flag: &AtomicBool) -> impl Fn() -> bool + '_ {
    move || flag.load(Ordering::Relaxed)
}

/// Thin orchestration over the pipeline stages in §2's order. Holds nothing
/// that a stage function doesn't already need by value; re-entrant across
/// multiple imports sharing one settings/interner/diagnostics triple.
pub struct Importer {
    pub settings: ImporterSettings,
    pub interner: RevisionInterner,
    pub diagnostics: DiagnosticLog,
}

impl Importer {
    pub fn new(settings: ImporterSettings) -> Self {
        Self {
            settings,
            interner: RevisionInterner::new(),
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// Drains `source` into a flat revision stream, populating `catalog`
    /// with file headers and symbolic-name bindings as they're encountered.
    /// Parsing the legacy log's textual format itself is the embedder's
    /// job (§1); this only adapts the record stream into the core's types.
    #[instrument(skip_all)]
    pub fn ingest(
        &mut self,
        catalog: &mut FileCatalog,
        source: &mut dyn LogSource,
    ) -> Result<Vec<FileRevision>, ImporterError> {
        let mut revisions = Vec::new();
        let mut current = None;
        while let Some(record) = source.records()? {
            match record {
                LogRecord::FileHeader { path, keyword_substitution } => {
                    let id = catalog.get_or_create(&path);
                    catalog.get_mut(id)?.is_binary = !keyword_substitution;
                    current = Some(id);
                }
                LogRecord::SymbolicName { name, revision, kind } => {
                    let id = current.ok_or_else(|| {
                        ImporterError::Parse(LogSourceError::Malformed(
                            "symbolic name record before any file header".to_string(),
                        ))
                    })?;
                    match kind {
                        SymbolKind::Tag => catalog.get_mut(id)?.bind_tag(&name, revision)?,
                        SymbolKind::Branch => catalog.get_mut(id)?.bind_branch(&name, revision)?,
                    }
                }
                LogRecord::Revision {
                    revision,
                    time,
                    author,
                    commit_id,
                    mergepoint,
                    state,
                    message,
                } => {
                    let id = current.ok_or_else(|| {
                        ImporterError::Parse(LogSourceError::Malformed(
                            "revision record before any file header".to_string(),
                        ))
                    })?;
                    revisions.push(FileRevision {
                        file: id,
                        revision,
                        time,
                        author,
                        commit_id: commit_id.unwrap_or_default(),
                        mergepoint,
                        is_dead: state == RevisionState::Dead,
                        message,
                    });
                }
            }
        }
        Ok(revisions)
    }

    #[instrument(skip_all)]
    pub fn aggregate(
        &mut self,
        catalog: &mut FileCatalog,
        revisions: Vec<FileRevision>,
    ) -> Result<Vec<Commit>, ImporterError> {
        Ok(aggregate_commits(catalog, revisions, &self.settings.main_branch_name)?)
    }

    #[instrument(skip_all)]
    pub fn split_and_filter(
        &mut self,
        catalog: &mut FileCatalog,
        commits: Vec<Commit>,
        branch_rules: &IncludeRules,
        file_rules: &IncludeRules,
        head_only_rules: &IncludeRules,
    ) -> Result<FilterOutcome, ImporterError> {
        let split = split_multi_branch(catalog, commits, &self.settings.main_branch_name)?;
        let outcome = apply_exclusion_filter(catalog, split, branch_rules, file_rules, head_only_rules)?;
        let verified = verify_and_backlink(catalog, outcome.included, &self.settings)?;
        Ok(FilterOutcome {
            included: verified,
            head_only_state: outcome.head_only_state,
        })
    }

    #[instrument(skip_all)]
    pub fn build_branch_stream(
        &mut self,
        catalog: &FileCatalog,
        commits: Vec<Commit>,
    ) -> Result<BranchStreamCollection, ImporterError> {
        Ok(BranchStreamCollection::build(commits, catalog, &self.settings.main_branch_name)?)
    }

    #[instrument(skip_all)]
    pub fn resolve_tags(
        &mut self,
        catalog: &FileCatalog,
        stream: &mut BranchStreamCollection,
        tags: &[String],
    ) -> Result<Vec<(String, ResolvedLabel)>, ImporterError> {
        Ok(resolve_labels(catalog, stream, &tag_kind(), tags, &self.settings, &mut self.diagnostics)?)
    }

    #[instrument(skip_all)]
    pub fn resolve_branches(
        &mut self,
        catalog: &FileCatalog,
        stream: &mut BranchStreamCollection,
        branches: &[String],
    ) -> Result<Vec<(String, ResolvedLabel)>, ImporterError> {
        Ok(resolve_labels(catalog, stream, &branch_kind(), branches, &self.settings, &mut self.diagnostics)?)
    }

    #[instrument(skip_all)]
    pub fn apply_manual_branchpoints(
        &mut self,
        stream: &mut BranchStreamCollection,
        manual: &[(String, String)],
        resolved_tags: &[(String, ResolvedLabel)],
    ) -> Result<(), ImporterError> {
        Ok(apply_manual_branchpoints(stream, manual, resolved_tags)?)
    }

    #[instrument(skip_all)]
    pub fn resolve_merges(
        &mut self,
        catalog: &FileCatalog,
        stream: &mut BranchStreamCollection,
    ) -> Result<(), ImporterError> {
        Ok(resolve_merges(catalog, stream, &mut self.diagnostics)?)
    }

    #[instrument(skip_all)]
    pub fn apply_head_only(
        &mut self,
        catalog: &FileCatalog,
        stream: &mut BranchStreamCollection,
        head_only_state: &RepositoryState,
    ) -> Result<(), ImporterError> {
        Ok(apply_head_only_overlay(catalog, stream, head_only_state)?)
    }

    #[instrument(skip_all)]
    pub fn playback(&mut self, stream: &BranchStreamCollection) -> Result<Vec<CommitPosition>, ImporterError> {
        Ok(playback_order(stream)?)
    }

    /// Chains every stage in §2 order, checking `is_cancelled` between each
    /// and returning `ImporterError::Cancelled` the first time it reports
    /// true. A stage already in progress always runs to completion (§5).
    #[allow(clippy::too_many_arguments)]
    pub fn run_to_playback(
        &mut self,
        catalog: &mut FileCatalog,
        source: &mut dyn LogSource,
        branch_rules: &IncludeRules,
        file_rules: &IncludeRules,
        head_only_rules: &IncludeRules,
        tags: &[String],
        branches: &[String],
        manual_branchpoints: &[(String, String)],
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<Vec<CommitPosition>, ImporterError> {
        let check = |is_cancelled: &dyn Fn() -> bool| -> Result<(), ImporterError> {
            if is_cancelled() {
                Err(ImporterError::Cancelled)
            } else {
                Ok(())
            }
        };

        let revisions = self.ingest(catalog, source)?;
        check(is_cancelled)?;
        let commits = self.aggregate(catalog, revisions)?;
        check(is_cancelled)?;
        let outcome = self.split_and_filter(catalog, commits, branch_rules, file_rules, head_only_rules)?;
        check(is_cancelled)?;
        let mut stream = self.build_branch_stream(catalog, outcome.included)?;
        check(is_cancelled)?;
        let resolved_tags = self.resolve_tags(catalog, &mut stream, tags)?;
        self.apply_manual_branchpoints(&mut stream, manual_branchpoints, &resolved_tags)?;
        check(is_cancelled)?;
        self.resolve_branches(catalog, &mut stream, branches)?;
        check(is_cancelled)?;
        self.resolve_merges(catalog, &mut stream)?;
        check(is_cancelled)?;
        self.apply_head_only(catalog, &mut stream, &outcome.head_only_state)?;
        check(is_cancelled)?;
        self.playback(&stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::interner;

    struct FixedLogSource {
        records: Vec<LogRecord>,
    }

    impl LogSource for FixedLogSource {
        fn records(&mut self) -> Result<Option<LogRecord>, LogSourceError> {
            Ok(if self.records.is_empty() {
                None
            } else {
                Some(self.records.remove(0))
            })
        }
    }

    #[test]
    fn ingest_builds_revisions_from_header_and_revision_records() {
        let mut importer = Importer::new(ImporterSettings::default());
        let mut catalog = FileCatalog::new();
        let mut source = FixedLogSource {
            records: vec![
                LogRecord::FileHeader {
                    path: "f1".to_string(),
                    keyword_substitution: true,
                },
                LogRecord::Revision {
                    revision: interner().intern(&[1, 1]).unwrap(),
                    time: crate::time::Timestamp::from_epoch_seconds(0),
                    author: "alice".to_string(),
                    commit_id: None,
                    mergepoint: None,
                    state: RevisionState::Live,
                    message: "initial".to_string(),
                },
            ],
        };
        let revisions = importer.ingest(&mut catalog, &mut source).unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(catalog.get(revisions[0].file).unwrap().name(), "f1");
    }

    #[test]
    fn ingest_rejects_revision_before_any_header() {
        let mut importer = Importer::new(ImporterSettings::default());
        let mut catalog = FileCatalog::new();
        let mut source = FixedLogSource {
            records: vec![LogRecord::Revision {
                revision: interner().intern(&[1, 1]).unwrap(),
                time: crate::time::Timestamp::from_epoch_seconds(0),
                author: "alice".to_string(),
                commit_id: None,
                mergepoint: None,
                state: RevisionState::Live,
                message: "initial".to_string(),
            }],
        };
        assert!(importer.ingest(&mut catalog, &mut source).is_err());
    }

    #[test]
    fn cancellation_flag_stops_run_before_aggregation() {
        let mut importer = Importer::new(ImporterSettings::default());
        let mut catalog = FileCatalog::new();
        let mut source = FixedLogSource { records: vec![] };
        let flag = AtomicBool::new(true);
        let branch_rules = IncludeRules::new(true);
        let file_rules = IncludeRules::new(true);
        let head_only_rules = IncludeRules::new(false);
        let result = importer.run_to_playback(
            &mut catalog,
            &mut source,
            &branch_rules,
            &file_rules,
            &head_only_rules,
            &[],
            &[],
            &[],
            &atomic_cancel_flag(&flag),
        );
        assert!(matches!(result, Err(ImporterError::Cancelled)));
    }
}
