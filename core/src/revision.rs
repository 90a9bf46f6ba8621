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

//! Dotted revision numbers (`1.2.4.3`) and the arithmetic that relates them.
//!
//! A [`Revision`] is a thin, interned handle around a sequence of positive
//! integer parts. All operations here are pure functions of the parts
//! vector; nothing in this module touches files, commits, or time.
//!
//! Two shapes of non-trunk identifier exist, matching the legacy tool's
//! "magic branch number" convention:
//! - a *revision* actually carries file content and has an even number of
//!   parts, e.g. `1.2.4.3` (branch number `4` off `1.2`, third revision on
//!   it); its branch number sits second-to-last.
//! - a *branch marker* names a branch itself (no specific revision) and has
//!   the branch number moved to the last slot with a `0` inserted in front of
//!   it, e.g. `1.2.0.4`. The vendor-branch form is the one exception: it is
//!   written without the inserted zero, as a bare odd-length stem (`1.1.1`).
//!
//! A marker and the branch's first revision therefore have the same part
//! count but differ in where the branch number and the zero/one sit.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use thiserror::Error;

/// A parsed dotted revision number, or the sentinel "empty" revision used for
/// files that don't exist yet on a given branch.
///
/// Two `Revision`s compare equal iff their parts are equal; the
/// [`RevisionInterner`] guarantees that equal parts always produce the same
/// `Arc`, so pointer identity and value identity coincide. Callers that only
/// ever obtain `Revision`s from one interner can rely on `Arc::ptr_eq` as a
/// cheap equality check, but `PartialEq`/`Eq`/`Hash` are value-based so a
/// `Revision` behaves correctly even if two interners are mixed (e.g. in
/// tests).
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Revision(Arc<[u32]>);

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Revision").field(&self.to_string()).finish()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<empty>");
        }
        let mut parts = self.0.iter();
        if let Some(first) = parts.next() {
            write!(f, "{first}")?;
        }
        for part in parts {
            write!(f, ".{part}")?;
        }
        Ok(())
    }
}

/// Error returned when a sequence of parts doesn't describe a valid revision.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RevisionError {
    /// A part was zero somewhere other than the branch-marker position.
    #[error("revision part {index} is zero in an unexpected position: {parts:?}")]
    UnexpectedZero { parts: Vec<u32>, index: usize },
    /// A branch number was odd where an even value was expected.
    #[error("branch number must be even (except on a vendor branch): {parts:?}")]
    OddBranchNumber { parts: Vec<u32> },
    /// Wrong number of parts for any recognized shape.
    #[error("revision has an invalid part count: {parts:?}")]
    MalformedLength { parts: Vec<u32> },
}

impl Revision {
    /// The sentinel revision meaning "this file does not exist yet".
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new().into_boxed_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(parts: &[u32]) -> Result<(), RevisionError> {
        if parts.is_empty() {
            return Ok(());
        }
        let len = parts.len();
        if len < 2 {
            return Err(RevisionError::MalformedLength {
                parts: parts.to_vec(),
            });
        }
        // Vendor-branch stem: `1.1.1`-shaped, odd length, no inserted zero.
        if len == 3 {
            if let Some(index) = parts.iter().position(|&p| p == 0) {
                return Err(RevisionError::UnexpectedZero {
                    parts: parts.to_vec(),
                    index,
                });
            }
            return Ok(());
        }
        if len % 2 != 0 {
            return Err(RevisionError::MalformedLength {
                parts: parts.to_vec(),
            });
        }
        // Length >= 4, even: either a branch revision (branch number at
        // len-2, nonzero, even) or a branch marker (zero at len-2, branch
        // number at len-1, even).
        let marker_index = len - 2;
        for (index, &part) in parts.iter().enumerate() {
            if part == 0 && index != marker_index {
                return Err(RevisionError::UnexpectedZero {
                    parts: parts.to_vec(),
                    index,
                });
            }
        }
        let branch_number = if parts[marker_index] == 0 {
            parts[len - 1]
        } else {
            parts[marker_index]
        };
        if branch_number % 2 != 0 {
            return Err(RevisionError::OddBranchNumber {
                parts: parts.to_vec(),
            });
        }
        Ok(())
    }

    pub fn parts(&self) -> &[u32] {
        &self.0
    }

    /// True for a branch marker: names a branch, not a specific revision on
    /// it. Covers both the normal `a.b.0.c` form and the vendor-branch
    /// `a.b.c` form.
    pub fn is_branch(&self) -> bool {
        let len = self.0.len();
        if len == 3 {
            return true;
        }
        len >= 4 && len % 2 == 0 && self.0[len - 2] == 0
    }

    /// True for a revision that lives directly on the trunk (`N.M`, no
    /// branch component).
    pub fn is_trunk(&self) -> bool {
        self.0.len() == 2
    }

    /// The revision identifying the branch this (non-trunk, non-marker)
    /// revision lives on: all parts but the trailing sequence number.
    pub fn branch_stem(&self) -> Option<Revision> {
        if self.0.len() < 4 || self.is_branch() {
            return None;
        }
        Some(Revision(Arc::from(&self.0[..self.0.len() - 1])))
    }

    /// The ancestor revision on the parent line from which this branch
    /// departs. `None` for the trunk or the empty sentinel.
    pub fn branchpoint(&self) -> Option<Revision> {
        let len = self.0.len();
        if len < 3 {
            return None;
        }
        if len == 3 {
            return Some(Revision(Arc::from(&self.0[..2])));
        }
        Some(Revision(Arc::from(&self.0[..len - 2])))
    }

    /// True iff `other` is the immediate next revision after `self` on the
    /// same branch line, including the transition from a branch marker to
    /// that branch's first revision (e.g. `1.2.0.4` directly precedes
    /// `1.2.4.1`, and `1.3` directly precedes `1.4`).
    pub fn directly_precedes(&self, other: &Revision) -> bool {
        if self.0.is_empty() {
            return other.0.len() >= 2 && *other.0.last().unwrap() == 1;
        }
        if self.is_branch() {
            return self.first_revision_on_branch().as_ref() == Some(other);
        }
        if self.0.len() != other.0.len() {
            return false;
        }
        let (init, last) = self.0.split_at(self.0.len() - 1);
        let (other_init, other_last) = other.0.split_at(other.0.len() - 1);
        init == other_init && other_last[0] == last[0] + 1
    }

    /// For a branch marker, the `branch_stem`-style identifier of the branch
    /// it names: the value a real revision on that branch would report from
    /// its own `branch_stem()`. `None` if `self` isn't a marker.
    pub fn marker_to_stem(&self) -> Option<Revision> {
        if !self.is_branch() {
            return None;
        }
        let len = self.0.len();
        if len == 3 {
            return Some(self.clone());
        }
        let branch_number = self.0[len - 1];
        let mut out = self.0[..len - 2].to_vec();
        out.push(branch_number);
        Some(Revision(Arc::from(out)))
    }

    /// The first real revision on the branch this marker names, or `None` if
    /// `self` isn't a marker.
    fn first_revision_on_branch(&self) -> Option<Revision> {
        if !self.is_branch() {
            return None;
        }
        let len = self.0.len();
        if len == 3 {
            let mut out = self.0.to_vec();
            out.push(1);
            return Some(Revision(Arc::from(out)));
        }
        let branch_number = self.0[len - 1];
        let mut out = self.0[..len - 2].to_vec();
        out.push(branch_number);
        out.push(1);
        Some(Revision(Arc::from(out)))
    }

    /// Strict ancestry on the same branch line: `self` is a proper ancestor
    /// of `other`.
    pub fn precedes(&self, other: &Revision) -> bool {
        if self.0.is_empty() {
            return !other.0.is_empty();
        }
        if self.0.len() != other.0.len() {
            return false;
        }
        let (init, last) = self.0.split_at(self.0.len() - 1);
        let (other_init, other_last) = other.0.split_at(other.0.len() - 1);
        init == other_init && last[0] < other_last[0]
    }
}

/// Process-wide cache that deduplicates `Revision` storage.
///
/// Per the design notes, this is the one piece of global mutable state
/// carried over from the source material: it is write-once-per-distinct-value
/// and read-only thereafter, so sharing it process-wide is safe. The type
/// itself is constructible so tests that want isolation from other tests'
/// interned values can build their own instance instead of using
/// [`interner()`].
pub struct RevisionInterner {
    table: Mutex<HashMap<Box<[u32]>, Arc<[u32]>>>,
}

impl Default for RevisionInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionInterner {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Validates and interns `parts`, returning the canonical `Revision`.
    pub fn intern(&self, parts: &[u32]) -> Result<Revision, RevisionError> {
        Revision::validate(parts)?;
        let mut table = self.table.lock().unwrap();
        if let Some(arc) = table.get(parts) {
            return Ok(Revision(arc.clone()));
        }
        let arc: Arc<[u32]> = Arc::from(parts);
        table.insert(parts.into(), arc.clone());
        Ok(Revision(arc))
    }

    /// Parses `s` as a dot-separated sequence of parts and interns it.
    pub fn parse(&self, s: &str) -> Result<Revision, RevisionError> {
        let mut parts = Vec::with_capacity(4);
        for part in s.split('.') {
            let value = part
                .parse::<u32>()
                .map_err(|_| RevisionError::MalformedLength { parts: Vec::new() })?;
            parts.push(value);
        }
        self.intern(&parts)
    }
}

/// The default process-wide interner. Most embedders should thread an
/// explicit `RevisionInterner` through their pipeline; this exists for
/// convenience and for one-off arithmetic that doesn't carry a context.
pub fn interner() -> &'static RevisionInterner {
    static GLOBAL: Lazy<RevisionInterner> = Lazy::new(RevisionInterner::new);
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn rev(parts: &[u32]) -> Revision {
        interner().intern(parts).unwrap()
    }

    #[test]
    fn trunk_revision_is_not_branch() {
        assert!(!rev(&[1, 2]).is_branch());
        assert!(rev(&[1, 2]).is_trunk());
    }

    #[test]
    fn branch_marker_is_branch_not_trunk() {
        assert!(rev(&[1, 2, 0, 4]).is_branch());
        assert!(!rev(&[1, 2, 0, 4]).is_trunk());
    }

    #[test]
    fn vendor_branch_stem_is_branch_marker() {
        assert!(rev(&[1, 1, 1]).is_branch());
    }

    #[test]
    fn branch_revision_is_not_a_marker() {
        assert!(!rev(&[1, 2, 4, 3]).is_branch());
        assert!(!rev(&[1, 1, 1, 3]).is_branch());
    }

    #[test]
    fn odd_branch_number_rejected() {
        assert_eq!(
            interner().intern(&[1, 2, 3, 1]),
            Err(RevisionError::OddBranchNumber {
                parts: vec![1, 2, 3, 1]
            })
        );
        assert_eq!(
            interner().intern(&[1, 2, 0, 3]),
            Err(RevisionError::OddBranchNumber {
                parts: vec![1, 2, 0, 3]
            })
        );
    }

    #[test]
    fn zero_outside_marker_position_rejected() {
        assert!(matches!(
            interner().intern(&[1, 0]),
            Err(RevisionError::MalformedLength { .. })
        ));
        assert!(matches!(
            interner().intern(&[1, 2, 4, 0]),
            Err(RevisionError::UnexpectedZero { .. })
        ));
    }

    #[test]
    fn marker_to_stem_matches_revision_branch_stem() {
        let marker = rev(&[1, 2, 0, 4]);
        let on_branch = rev(&[1, 2, 4, 3]);
        assert_eq!(marker.marker_to_stem(), on_branch.branch_stem());
        let vendor_marker = rev(&[1, 1, 1]);
        let vendor_revision = rev(&[1, 1, 1, 2]);
        assert_eq!(vendor_marker.marker_to_stem(), vendor_revision.branch_stem());
    }

    #[test]
    fn branch_stem_of_branch_revision() {
        let on_branch = rev(&[1, 2, 4, 3]);
        assert_eq!(on_branch.branch_stem(), Some(rev(&[1, 2, 4])));
        assert_eq!(rev(&[1, 4]).branch_stem(), None);
        assert_eq!(rev(&[1, 1, 1, 3]).branch_stem(), Some(rev(&[1, 1, 1])));
    }

    #[test]
    fn branchpoint_of_branch_revision() {
        let on_branch = rev(&[1, 2, 4, 3]);
        assert_eq!(on_branch.branchpoint(), Some(rev(&[1, 2])));
        let marker = rev(&[1, 2, 0, 4]);
        assert_eq!(marker.branchpoint(), Some(rev(&[1, 2])));
        assert_eq!(rev(&[1, 1, 1, 3]).branchpoint(), Some(rev(&[1, 1])));
        assert_eq!(rev(&[1, 1, 1]).branchpoint(), Some(rev(&[1, 1])));
        assert_eq!(rev(&[1, 4]).branchpoint(), None);
    }

    #[test_case(&[1, 1], &[1, 2] ; "trunk successive")]
    #[test_case(&[1, 2, 0, 4], &[1, 2, 4, 1] ; "marker to first on branch")]
    #[test_case(&[1, 1, 1], &[1, 1, 1, 1] ; "vendor marker to first on branch")]
    #[test_case(&[1, 2, 4, 1], &[1, 2, 4, 2] ; "successive on branch")]
    fn directly_precedes_true(a: &[u32], b: &[u32]) {
        assert!(rev(a).directly_precedes(&rev(b)));
    }

    #[test]
    fn empty_directly_precedes_first_revision() {
        assert!(Revision::empty().directly_precedes(&rev(&[1, 1])));
        assert!(Revision::empty().directly_precedes(&rev(&[1, 2, 4, 1])));
        assert!(!Revision::empty().directly_precedes(&rev(&[1, 2])));
    }

    #[test]
    fn directly_precedes_false_across_branches() {
        assert!(!rev(&[1, 2]).directly_precedes(&rev(&[1, 2, 4, 1])));
        assert!(!rev(&[1, 3]).directly_precedes(&rev(&[1, 2])));
        assert!(!rev(&[1, 2, 0, 4]).directly_precedes(&rev(&[1, 2, 6, 1])));
    }

    #[test]
    fn precedes_is_strict_same_line_ancestry() {
        assert!(rev(&[1, 2]).precedes(&rev(&[1, 4])));
        assert!(!rev(&[1, 4]).precedes(&rev(&[1, 2])));
        assert!(!rev(&[1, 2]).precedes(&rev(&[1, 2])));
        assert!(!rev(&[1, 2, 4, 1]).precedes(&rev(&[1, 4])));
    }

    #[test]
    fn interning_deduplicates_equal_values() {
        let a = interner().intern(&[1, 5]).unwrap();
        let b = interner().intern(&[1, 5]).unwrap();
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn parse_accepts_dotted_string() {
        assert_eq!(interner().parse("1.2.4.3").unwrap(), rev(&[1, 2, 4, 3]));
    }

    #[test]
    fn display_round_trips_parts() {
        assert_eq!(rev(&[1, 2, 4, 3]).to_string(), "1.2.4.3");
        assert_eq!(Revision::empty().to_string(), "<empty>");
    }
}
