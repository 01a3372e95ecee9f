//! Classloader overlap detection
//!
//! Lists the classes of every archive a module loads on its own (archives
//! the platform loader also sees are left out) and compares archive class
//! sets pairwise. Two archives shipping the same classes usually means a
//! library is packaged twice.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const CLASS_SUFFIX: &str = ".class";
const SKIPPED_CLASSES: &[&str] = &["module-info", "package-info"];

/// Archives backing a classloader, with an optional parent loader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPath {
    pub archives: Vec<PathBuf>,
    pub parent: Option<Arc<ClassPath>>,
}

impl ClassPath {
    pub fn new<P: Into<PathBuf>>(archives: impl IntoIterator<Item = P>) -> Self {
        Self {
            archives: archives.into_iter().map(Into::into).collect(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: Arc<ClassPath>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The top of the parent chain (the platform loader)
    pub fn root(&self) -> &ClassPath {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent.as_ref();
        }
        current
    }

    /// Own archives followed by every ancestor's, without repeats
    pub fn all_archives(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut archives = Vec::new();
        let mut current = Some(self);

        while let Some(class_path) = current {
            for archive in &class_path.archives {
                if seen.insert(archive) {
                    archives.push(archive.clone());
                }
            }
            current = class_path.parent.as_deref();
        }

        archives
    }

    /// Archives visible to this loader but not to the platform loader
    pub fn exclusive_archives(&self) -> Vec<PathBuf> {
        if self.parent.is_none() {
            return self.all_archives();
        }

        let platform: HashSet<&PathBuf> = self.root().archives.iter().collect();
        self.all_archives()
            .into_iter()
            .filter(|archive| !platform.contains(archive))
            .collect()
    }
}

/// Lists the classes an archive provides
pub trait ArchiveScanner {
    fn list_classes(&self, path: &Path) -> io::Result<BTreeSet<String>>;
}

/// Reads jar/zip files and exploded class directories from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArchiveScanner;

impl FsArchiveScanner {
    fn list_directory(&self, path: &Path) -> io::Result<BTreeSet<String>> {
        let mut classes = BTreeSet::new();

        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(path) else {
                continue;
            };
            let entry_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if let Some(class) = class_name(&entry_name) {
                classes.insert(class);
            }
        }

        Ok(classes)
    }

    fn list_zip(&self, path: &Path) -> io::Result<BTreeSet<String>> {
        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut classes = BTreeSet::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if entry.is_dir() {
                continue;
            }
            if let Some(class) = class_name(entry.name()) {
                classes.insert(class);
            }
        }

        Ok(classes)
    }
}

impl ArchiveScanner for FsArchiveScanner {
    fn list_classes(&self, path: &Path) -> io::Result<BTreeSet<String>> {
        if path.is_dir() {
            self.list_directory(path)
        } else {
            self.list_zip(path)
        }
    }
}

/// `a/b/C.class` -> `a.b.C`. Non-class entries and module/package
/// descriptors yield `None`.
pub fn class_name(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(CLASS_SUFFIX)?;
    let simple = stem.rsplit(['/', '\\']).next().unwrap_or(stem);
    if simple.is_empty() || SKIPPED_CLASSES.contains(&simple) {
        return None;
    }
    Some(stem.trim_start_matches('/').replace(['/', '\\'], "."))
}

/// Scans each archive at most once and builds tables from the results
pub struct ArchiveIndex<'s> {
    scanner: &'s dyn ArchiveScanner,
    scanned: HashMap<PathBuf, Option<BTreeSet<String>>>,
}

impl<'s> ArchiveIndex<'s> {
    pub fn new(scanner: &'s dyn ArchiveScanner) -> Self {
        Self {
            scanner,
            scanned: HashMap::new(),
        }
    }

    /// Classes of `archive`, or `None` when it could not be read
    pub fn classes(&mut self, archive: &Path) -> Option<&BTreeSet<String>> {
        let scanner = self.scanner;
        self.scanned
            .entry(archive.to_path_buf())
            .or_insert_with(|| match scanner.list_classes(archive) {
                Ok(classes) => {
                    log::trace!("{}: {} classes", archive.display(), classes.len());
                    Some(classes)
                }
                Err(e) => {
                    log::warn!("skipping unreadable archive {}: {}", archive.display(), e);
                    None
                }
            })
            .as_ref()
    }

    /// Table of the readable archives among `archives`, keyed by file name.
    /// A file name seen twice falls back to the full path.
    pub fn table(&mut self, archives: &[PathBuf]) -> ArchiveTable {
        let mut table = ArchiveTable::new();

        for archive in archives {
            let Some(classes) = self.classes(archive).cloned() else {
                continue;
            };
            let name = archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| archive.display().to_string());
            let name = if table.archives.contains_key(&name) {
                archive.display().to_string()
            } else {
                name
            };
            table.insert(name, classes);
        }

        table
    }
}

/// Archive name -> classes, ordered by archive name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveTable {
    archives: BTreeMap<String, BTreeSet<String>>,
}

impl ArchiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the archives only `class_path` sees.
    ///
    /// An archive that cannot be read is logged and left out of the table.
    pub fn from_class_path(class_path: &ClassPath, scanner: &dyn ArchiveScanner) -> Self {
        ArchiveIndex::new(scanner).table(&class_path.exclusive_archives())
    }

    pub fn insert(&mut self, archive: impl Into<String>, classes: BTreeSet<String>) {
        self.archives.insert(archive.into(), classes);
    }

    pub fn classes(&self, archive: &str) -> Option<&BTreeSet<String>> {
        self.archives.get(archive)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.archives.iter()
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, BTreeSet<String>)> for ArchiveTable {
    fn from_iter<T: IntoIterator<Item = (S, BTreeSet<String>)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (archive, classes) in iter {
            table.insert(archive, classes);
        }
        table
    }
}

/// How two archives' class sets relate, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverlapKind {
    /// Both archives hold exactly the same classes
    Same,
    /// Every class of the first archive is in the second
    Included,
    /// Every class of the second archive is in the first
    Containing,
    /// Partial overlap
    Diff,
}

impl OverlapKind {
    fn classify(common: usize, first: usize, second: usize) -> Self {
        match (common == first, common == second) {
            (true, true) => OverlapKind::Same,
            (true, false) => OverlapKind::Included,
            (false, true) => OverlapKind::Containing,
            (false, false) => OverlapKind::Diff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapItem {
    pub kind: OverlapKind,
    pub first: String,
    pub second: String,
    pub classes: BTreeSet<String>,
}

impl OverlapItem {
    pub fn class_list(&self) -> String {
        self.classes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Compare every archive of `first` with every archive of `second`.
///
/// With `same_table`, both arguments are the same table and each unordered
/// pair is compared once. Pairs with nothing in common are left out.
pub fn intersection(first: &ArchiveTable, second: &ArchiveTable, same_table: bool) -> Vec<OverlapItem> {
    let mut items = Vec::new();

    for (i, (first_name, first_classes)) in first.iter().enumerate() {
        for (j, (second_name, second_classes)) in second.iter().enumerate() {
            if same_table && j <= i {
                continue;
            }

            let classes: BTreeSet<String> = first_classes
                .intersection(second_classes)
                .cloned()
                .collect();
            if classes.is_empty() {
                continue;
            }

            items.push(OverlapItem {
                kind: OverlapKind::classify(classes.len(), first_classes.len(), second_classes.len()),
                first: first_name.clone(),
                second: second_name.clone(),
                classes,
            });
        }
    }

    items.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.first.cmp(&b.first))
            .then_with(|| a.second.cmp(&b.second))
    });
    items
}
