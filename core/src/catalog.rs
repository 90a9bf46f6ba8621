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

//! The file catalog: per-file tables of tags, branches, and
//! revision-to-commit back-references.
//!
//! `FileInfo`s are stored in a single arena (`FileCatalog`) and referenced
//! elsewhere by the dense [`FileId`] index rather than by pointer, following
//! the same arena-plus-index discipline the branch-stream graph uses for
//! commits. Interior mutability (`RefCell`) lets the verification and
//! split/move stages update a file's revision-to-commit back-reference
//! without the catalog itself changing hands.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::revision::Revision;

/// A dense, stable index into a [`FileCatalog`]. Never reused once assigned.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FileId(u32);

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CatalogError {
    #[error("tag {tag:?} on {file:?} references branch marker {revision:?}, not a revision")]
    TagOnBranchRevision {
        file: String,
        tag: String,
        revision: Revision,
    },
    #[error("branch {branch:?} on {file:?} references non-marker revision {revision:?}")]
    BranchEntryNotMarker {
        file: String,
        branch: String,
        revision: Revision,
    },
    #[error("unknown file id")]
    UnknownFile,
}

/// One tracked file: its name plus every tag/branch binding and
/// revision-to-commit back-reference recorded against it.
#[derive(Debug, Default)]
pub struct FileInfo {
    name: String,
    tag_to_revision: IndexMap<String, Revision>,
    revision_to_tags: HashMap<Revision, Vec<String>>,
    branch_to_marker: IndexMap<String, Revision>,
    marker_to_branch: HashMap<Revision, String>,
    stem_to_branch: HashMap<Revision, String>,
    revision_to_commit: HashMap<Revision, String>,
    /// `true` for files imported with RCS keyword substitution off (treated
    /// as binary content by the content fetcher's caller).
    pub is_binary: bool,
    /// The branch this file was first introduced on, if not the trunk.
    pub branch_added_on: Option<String>,
}

impl FileInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bind_tag(&mut self, tag: &str, revision: Revision) -> Result<(), CatalogError> {
        if revision.is_branch() {
            return Err(CatalogError::TagOnBranchRevision {
                file: self.name.clone(),
                tag: tag.to_string(),
                revision,
            });
        }
        self.tag_to_revision.insert(tag.to_string(), revision.clone());
        self.revision_to_tags
            .entry(revision)
            .or_default()
            .push(tag.to_string());
        Ok(())
    }

    pub fn bind_branch(&mut self, branch: &str, marker: Revision) -> Result<(), CatalogError> {
        if !marker.is_branch() {
            return Err(CatalogError::BranchEntryNotMarker {
                file: self.name.clone(),
                branch: branch.to_string(),
                revision: marker,
            });
        }
        let stem = marker
            .marker_to_stem()
            .expect("validated above to be a branch marker");
        self.branch_to_marker.insert(branch.to_string(), marker.clone());
        self.marker_to_branch.insert(marker, branch.to_string());
        self.stem_to_branch.insert(stem, branch.to_string());
        Ok(())
    }

    pub fn tag_revision(&self, tag: &str) -> Option<&Revision> {
        self.tag_to_revision.get(tag)
    }

    pub fn tags_at(&self, revision: &Revision) -> &[String] {
        self.revision_to_tags
            .get(revision)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &Revision)> {
        self.tag_to_revision.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn branch_marker(&self, branch: &str) -> Option<&Revision> {
        self.branch_to_marker.get(branch)
    }

    /// Looks up a branch by its marker revision (the `a.b.0.c` / vendor
    /// `a.b.c` form stored in the branch-name→marker map).
    pub fn branch_name_by_marker(&self, marker: &Revision) -> Option<&str> {
        self.marker_to_branch.get(marker).map(String::as_str)
    }

    /// Looks up a branch by the stem form real revisions on it report from
    /// `Revision::branch_stem` (the branch-stem-revision→branch-name map).
    pub fn branch_name_by_stem(&self, stem: &Revision) -> Option<&str> {
        self.stem_to_branch.get(stem).map(String::as_str)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &Revision)> {
        self.branch_to_marker.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Branch names whose marker's branchpoint is exactly `revision`: the
    /// branches that depart from this file's revision.
    pub fn branches_departing_at(&self, revision: &Revision) -> Vec<&str> {
        self.branch_to_marker
            .iter()
            .filter(|(_, marker)| marker.branchpoint().as_ref() == Some(revision))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn record_commit(&mut self, revision: Revision, commit_id: impl Into<String>) {
        self.revision_to_commit.insert(revision, commit_id.into());
    }

    pub fn commit_for(&self, revision: &Revision) -> Option<&str> {
        self.revision_to_commit.get(revision).map(String::as_str)
    }
}

/// Owns every [`FileInfo`] for the import. Files are looked up by name once
/// (at parse time) and thereafter by the stable [`FileId`] handed out here.
#[derive(Debug, Default)]
pub struct FileCatalog {
    files: Vec<RefCell<FileInfo>>,
    by_name: IndexMap<String, FileId>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str) -> FileId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(RefCell::new(FileInfo {
            name: name.to_string(),
            ..FileInfo::default()
        }));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<FileId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: FileId) -> Result<Ref<'_, FileInfo>, CatalogError> {
        self.files
            .get(id.0 as usize)
            .map(RefCell::borrow)
            .ok_or(CatalogError::UnknownFile)
    }

    pub fn get_mut(&self, id: FileId) -> Result<RefMut<'_, FileInfo>, CatalogError> {
        self.files
            .get(id.0 as usize)
            .map(RefCell::borrow_mut)
            .ok_or(CatalogError::UnknownFile)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(|i| FileId(i as u32))
    }
}

/// The symbolic branch name `revision` (on `file`) lives on: `main_branch_name`
/// for the trunk, the catalog's stem binding for a branch revision, falling
/// back to the stem's dotted form when the branch was never named on this
/// file (a branch created but never tagged anywhere, for instance).
pub fn branch_name_for(
    catalog: &FileCatalog,
    file: FileId,
    revision: &Revision,
    main_branch_name: &str,
) -> Result<String, CatalogError> {
    if revision.is_trunk() {
        return Ok(main_branch_name.to_string());
    }
    let stem = revision.branch_stem().unwrap_or_else(|| revision.clone());
    let info = catalog.get(file)?;
    Ok(info
        .branch_name_by_stem(&stem)
        .map(str::to_string)
        .unwrap_or_else(|| stem.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::interner;

    #[test]
    fn tag_on_branch_revision_is_rejected() {
        let mut catalog = FileCatalog::new();
        let id = catalog.get_or_create("README");
        let marker = interner().intern(&[1, 2, 0, 4]).unwrap();
        let mut file = catalog.get_mut(id).unwrap();
        assert_eq!(
            file.bind_tag("release-1", marker.clone()),
            Err(CatalogError::TagOnBranchRevision {
                file: "README".to_string(),
                tag: "release-1".to_string(),
                revision: marker,
            })
        );
    }

    #[test]
    fn branch_entry_requires_marker() {
        let mut catalog = FileCatalog::new();
        let id = catalog.get_or_create("README");
        let revision = interner().intern(&[1, 2]).unwrap();
        let mut file = catalog.get_mut(id).unwrap();
        assert!(file.bind_branch("stable", revision).is_err());
    }

    #[test]
    fn same_name_returns_same_id() {
        let mut catalog = FileCatalog::new();
        let a = catalog.get_or_create("README");
        let b = catalog.get_or_create("README");
        assert_eq!(a, b);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn tag_round_trips_through_catalog() {
        let mut catalog = FileCatalog::new();
        let id = catalog.get_or_create("README");
        let revision = interner().intern(&[1, 3]).unwrap();
        catalog
            .get_mut(id)
            .unwrap()
            .bind_tag("release-1", revision.clone())
            .unwrap();
        let file = catalog.get(id).unwrap();
        assert_eq!(file.tag_revision("release-1"), Some(&revision));
        assert_eq!(file.tags_at(&revision), &["release-1".to_string()]);
    }
}
