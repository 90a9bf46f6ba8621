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

//! Reconstructs a whole-repository commit DAG from a legacy per-file,
//! revision-numbered log: aggregates per-file revisions into commits,
//! builds per-branch streams, resolves symbolic names against replayed
//! repository state, elects merge sources, and plays the result back
//! in a single topological order an embedder can emit.
//!
//! [`pipeline::Importer`] drives the stages in order; each stage is also
//! usable on its own for embedders that want to intervene between steps.

pub mod adapters;
pub mod aggregate;
pub mod branch_stream;
pub mod catalog;
pub mod commit;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod head_only;
pub mod label_resolver;
pub mod merge_resolver;
pub mod pipeline;
pub mod playback;
pub mod repo_state;
pub mod revision;
pub mod rules;
pub mod settings;
pub mod time;

pub use error::{ImportError, ImporterError};
pub use pipeline::Importer;
pub use settings::ImporterSettings;
