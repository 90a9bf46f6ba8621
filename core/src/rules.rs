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

//! Rename rules and include/exclude rules (§6 design surface): ordered,
//! first-relevant-wins regex transforms applied to branch/tag/file names.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One `(pattern, replacement)` pair. `Regex::replace` semantics: `$1`-style
/// capture references in `replacement` are honored.
struct RenameRule {
    pattern: Regex,
    replacement: String,
}

/// Ordered rename rules; the first pattern that matches a name wins, and
/// unmatched names pass through unchanged.
#[derive(Default)]
pub struct RenameRules {
    rules: Vec<RenameRule>,
}

impl RenameRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pattern: &str, replacement: impl Into<String>) -> Result<(), RulesError> {
        let regex = Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.rules.push(RenameRule {
            pattern: regex,
            replacement: replacement.into(),
        });
        Ok(())
    }

    pub fn apply(&self, name: &str) -> String {
        for rule in &self.rules {
            if rule.pattern.is_match(name) {
                return rule.pattern.replace(name, rule.replacement.as_str()).into_owned();
            }
        }
        name.to_string()
    }
}

/// Ordered include/exclude rules over a name. Starting from a default
/// (`true` for tags/branches/files, `false` for head-only candidates per
/// §6), each matching rule flips the running state; the value after the last
/// matching rule is the final verdict.
#[derive(Default)]
pub struct IncludeRules {
    patterns: Vec<Regex>,
    default: bool,
}

impl IncludeRules {
    pub fn new(default: bool) -> Self {
        Self {
            patterns: Vec::new(),
            default,
        }
    }

    pub fn push(&mut self, pattern: &str) -> Result<(), RulesError> {
        let regex = Regex::new(pattern).map_err(|source| RulesError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.patterns.push(regex);
        Ok(())
    }

    pub fn evaluate(&self, name: &str) -> bool {
        let mut state = self.default;
        for pattern in &self.patterns {
            if pattern.is_match(name) {
                state = !state;
            }
        }
        state
    }
}
