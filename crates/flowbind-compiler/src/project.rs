// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Package, module and document model.
//!
//! A package directory looks like:
//!
//! ```text
//! orders/
//!   Flowbind.toml          optional: [package] org = "acme", name = "orders"
//!   service.wf             default module `orders`
//!   modules/
//!     m1/activities.wf     module `orders.m1`
//! ```

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use flowbind_syntax::ast::ModulePart;
use flowbind_syntax::{ParseError, SourceFile, parse};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Manifest file name at the package root.
pub const MANIFEST_FILE: &str = "Flowbind.toml";
/// Extension of workflow source files.
pub const SOURCE_EXTENSION: &str = "wf";
/// Directory holding submodules.
pub const MODULES_DIR: &str = "modules";

/// Errors raised while loading a package.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Reading a file or directory failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or has the wrong shape.
    #[error("invalid manifest {path}: {source}")]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A source file has a syntax error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The package root is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// No `.wf` files were found.
    #[error("no source files found in {0}")]
    NoSources(PathBuf),

    /// A source path does not belong to the default module or a submodule.
    #[error("{0} is not a package source path")]
    InvalidSourcePath(PathBuf),
}

/// Result type for project loading.
pub type Result<T> = std::result::Result<T, ProjectError>;

// ============================================================================
// Identifiers
// ============================================================================

/// Fully qualified module identity, `org/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    /// Owning organization.
    pub org: String,
    /// Dotted module name.
    pub name: String,
}

impl ModuleId {
    /// Create a module id.
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// Position of a document inside a [`Package`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    /// Index into [`Package::modules`].
    pub module: usize,
    /// Index into [`Module::documents`].
    pub document: usize,
}

// ============================================================================
// Package model
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Position in the package.
    pub id: DocumentId,
    /// Source text; its path is relative to the package root.
    pub source: SourceFile,
    /// Syntax tree.
    pub tree: ModulePart,
}

impl Document {
    /// Path relative to the package root.
    pub fn path(&self) -> &Path {
        self.source.path()
    }
}

/// A module and its documents.
#[derive(Debug, Clone)]
pub struct Module {
    /// Module identity.
    pub id: ModuleId,
    /// Submodule directory name, `None` for the default module.
    pub submodule: Option<String>,
    /// Documents sorted by path.
    pub documents: Vec<Document>,
}

/// A loaded package.
#[derive(Debug, Clone)]
pub struct Package {
    /// Owning organization.
    pub org: String,
    /// Package name, also the default module's name.
    pub name: String,
    /// Directory the package was loaded from.
    pub root: PathBuf,
    /// Default module first, then submodules sorted by name.
    pub modules: Vec<Module>,
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    package: ManifestPackage,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestPackage {
    org: Option<String>,
    name: Option<String>,
}

impl Package {
    /// Load and parse every source file under `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ProjectError::NotADirectory(root.to_path_buf()));
        }

        let manifest = read_manifest(root)?;
        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());
        let org = manifest.package.org.unwrap_or_else(|| "local".to_string());
        let name = manifest.package.name.unwrap_or(dir_name);

        let mut sources = Vec::new();
        for path in source_files(root)? {
            sources.push((relative(root, &path), read(&path)?));
        }
        let modules_dir = root.join(MODULES_DIR);
        if modules_dir.is_dir() {
            for module_dir in sorted_entries(&modules_dir)? {
                if !module_dir.is_dir() {
                    continue;
                }
                for path in source_files(&module_dir)? {
                    sources.push((relative(root, &path), read(&path)?));
                }
            }
        }
        if sources.is_empty() {
            return Err(ProjectError::NoSources(root.to_path_buf()));
        }

        let mut package = Self::from_sources(org, name, sources)?;
        package.root = root.to_path_buf();
        Ok(package)
    }

    /// Build a package from in-memory sources.
    ///
    /// Paths are relative to the package root: `name.wf` belongs to the
    /// default module and `modules/<m>/name.wf` to submodule `<m>`.
    pub fn from_sources<P, S>(
        org: impl Into<String>,
        name: impl Into<String>,
        sources: impl IntoIterator<Item = (P, S)>,
    ) -> Result<Self>
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let org = org.into();
        let name = name.into();
        let mut modules = vec![Module {
            id: ModuleId::new(&org, &name),
            submodule: None,
            documents: Vec::new(),
        }];

        let mut sources: Vec<(PathBuf, String)> = sources
            .into_iter()
            .map(|(p, s)| (p.into(), s.into()))
            .collect();
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        for (path, text) in sources {
            let submodule = submodule_of(&path)?;
            let module = match &submodule {
                None => 0,
                Some(sub) => match modules
                    .iter()
                    .position(|m| m.submodule.as_deref() == Some(sub.as_str()))
                {
                    Some(idx) => idx,
                    None => {
                        modules.push(Module {
                            id: ModuleId::new(&org, format!("{}.{}", name, sub)),
                            submodule: Some(sub.clone()),
                            documents: Vec::new(),
                        });
                        modules.len() - 1
                    }
                },
            };
            let source = SourceFile::new(path, text);
            let tree = parse(&source)?;
            let id = DocumentId {
                module,
                document: modules[module].documents.len(),
            };
            debug!(path = %source.path().display(), module = %modules[module].id, "Parsed document");
            modules[module].documents.push(Document { id, source, tree });
        }

        // Submodules sorted by name keep document ids stable across loads.
        let mut submodules = modules.split_off(1);
        submodules.sort_by(|a, b| a.submodule.cmp(&b.submodule));
        modules.extend(submodules);
        for (module_idx, module) in modules.iter_mut().enumerate() {
            for doc in &mut module.documents {
                doc.id.module = module_idx;
            }
        }

        Ok(Self {
            org,
            name,
            root: PathBuf::new(),
            modules,
        })
    }

    /// Look up a document.
    pub fn document(&self, id: DocumentId) -> &Document {
        &self.modules[id.module].documents[id.document]
    }

    /// Every document in module order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.modules.iter().flat_map(|m| m.documents.iter())
    }

    /// Find a document by its package-relative path.
    pub fn document_by_path(&self, path: impl AsRef<Path>) -> Option<&Document> {
        let path = path.as_ref();
        self.documents().find(|d| d.path() == path)
    }

    /// Index of the module with the given identity.
    pub fn module_index(&self, id: &ModuleId) -> Option<usize> {
        self.modules.iter().position(|m| &m.id == id)
    }
}

fn read_manifest(root: &Path) -> Result<Manifest> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(Manifest::default());
    }
    let text = read(&path)?;
    toml::from_str(&text).map_err(|source| ProjectError::Manifest { path, source })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| ProjectError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == SOURCE_EXTENSION))
        .collect())
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn submodule_of(path: &Path) -> Result<Option<String>> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    match parts.as_slice() {
        [_file] => Ok(None),
        [dir, sub, _file] if dir == MODULES_DIR => Ok(Some(sub.clone())),
        _ => Err(ProjectError::InvalidSourcePath(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sources_groups_modules() {
        let package = Package::from_sources(
            "acme",
            "orders",
            [
                ("service.wf", "function a() {}"),
                ("modules/m2/b.wf", "function b() {}"),
                ("modules/m1/c.wf", "function c() {}"),
            ],
        )
        .unwrap();
        let names: Vec<String> = package.modules.iter().map(|m| m.id.to_string()).collect();
        assert_eq!(names, vec!["acme/orders", "acme/orders.m1", "acme/orders.m2"]);
        let doc = package.document_by_path("modules/m1/c.wf").unwrap();
        assert_eq!(doc.id, DocumentId { module: 1, document: 0 });
    }

    #[test]
    fn test_nested_source_path_is_rejected() {
        let err = Package::from_sources("acme", "orders", [("a/b.wf", "")]).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidSourcePath(_)));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Package::from_sources("acme", "orders", [("bad.wf", "function (")]).unwrap_err();
        assert!(err.to_string().starts_with("bad.wf:1:"));
    }
}
