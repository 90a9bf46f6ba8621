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

//! Programmatic configuration surface. There is no file or CLI parsing here
//! on purpose: turning argv or a config file into an `ImporterSettings` is
//! the embedder's job.

/// Knobs that the pipeline consults. Threaded by reference through every
/// stage that needs one; owns no mutable state of its own.
#[derive(Clone, Debug)]
pub struct ImporterSettings {
    /// Number of "extra" live files tolerated at a label's resolved commit
    /// before the label is considered partial (§4.6 step 5).
    pub partial_label_threshold: u32,
    /// When set, a failed label resolution or a non-fatal verification
    /// problem is downgraded to a diagnostic instead of aborting the run.
    pub continue_on_error: bool,
    /// When set, the label resolver never reorders or splits commits; a
    /// label that would otherwise require it is reported unresolved instead
    /// (§4.6 step 7).
    pub no_reorder: bool,
    /// Enables the stricter commit-verification policy (§4.5): a commit
    /// whose members span more than one minute is flagged.
    pub fussy_verification: bool,
    /// Use strict-apply semantics (reject a revision that doesn't directly
    /// precede the branch state's current revision) wherever a
    /// `RepositoryState` is replayed. The resolver's own full-state replay is
    /// always non-strict regardless of this flag (§7).
    pub strict_apply: bool,
    /// Name of the branch treated as the repository's trunk/main line.
    pub main_branch_name: String,
    /// Worker count advertised to the (out-of-core) content-fetch
    /// collaborator; the core itself never spawns threads.
    pub cvs_processes: u32,
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Self {
            partial_label_threshold: 0,
            continue_on_error: false,
            no_reorder: false,
            fussy_verification: false,
            strict_apply: false,
            main_branch_name: "MAIN".to_string(),
            cvs_processes: 1,
        }
    }
}
