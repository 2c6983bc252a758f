pub use codespan_reporting::files::{Files, SimpleFile};

use crate::diagnostics::Diagnostic;

use std::fmt::{self, Display};
use std::fs;
use std::ops::Range;
use std::path::PathBuf;

use fxhash::FxHashMap;

pub type Result<T> = std::result::Result<T, Diagnostic>;

#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub struct FileId(usize);

#[derive(Debug, Clone)]
pub struct FileName(PathBuf);

impl Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

type File = SimpleFile<FileName, String>;

/// In-memory database of template sources. Sessions are single threaded
/// (see the concurrency notes on `template`), so a plain map is enough here.
pub struct FileSystem {
    next_id: usize,
    files: FxHashMap<FileId, File>,
    ids: FxHashMap<PathBuf, FileId>,
    paths: FxHashMap<FileId, PathBuf>,
}

impl Default for FileSystem {
    fn default() -> Self {
        FileSystem::new()
    }
}

impl FileSystem {
    pub fn new() -> Self {
        FileSystem {
            next_id: 0,
            files: FxHashMap::default(),
            ids: FxHashMap::default(),
            paths: FxHashMap::default(),
        }
    }

    pub fn id_for_path(&self, path: &PathBuf) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub fn path_for_id(&self, id: &FileId) -> PathBuf {
        self.paths
            .get(id)
            .expect("Expect path for id")
            .to_path_buf()
    }

    pub fn update(&mut self, id: FileId, text: String) {
        if let Some(file) = self.files.get_mut(&id) {
            *file = File::new(file.name().clone(), text);
        }
    }

    /// Register an already-read template source under `path`.
    pub fn load(&mut self, path: &PathBuf, text: String) -> Result<FileId> {
        let name = FileName(path.clone());
        let file = File::new(name, text);
        let id = self.next_id;
        self.next_id += 1;
        let fileid = FileId(id);
        self.files.insert(fileid, file);
        self.ids.insert(path.clone(), fileid);
        self.paths.insert(fileid, path.clone());
        Ok(fileid)
    }

    /// Read `path` from disk unless it has already been loaded.
    pub fn resolve(&mut self, path: &PathBuf) -> Result<FileId> {
        if let Some(fileid) = self.id_for_path(path) {
            Ok(fileid)
        } else {
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(os_err) => {
                    return Err(Diagnostic::error().with_message(os_err.to_string()));
                }
            };
            self.load(path, source)
        }
    }

    pub fn with_source<F, T, E>(&self, id: &FileId, func: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&str) -> std::result::Result<T, E>,
    {
        let file = self.files.get(id).expect("Expect a source for a FileId");
        func(file.source())
    }
}

impl<'a> Files<'a> for FileSystem {
    type FileId = FileId;
    type Name = FileName;
    type Source = String;

    fn name(&self, id: FileId) -> Option<Self::Name> {
        let file = self.files.get(&id)?;
        Some(file.name().clone())
    }

    fn source(&self, id: FileId) -> Option<Self::Source> {
        let file = self.files.get(&id)?;
        Some(file.source().clone())
    }

    fn line_index(&self, file_id: FileId, byte_index: usize) -> Option<usize> {
        self.files.get(&file_id)?.line_index((), byte_index)
    }

    fn line_range(&'a self, file_id: FileId, line_index: usize) -> Option<Range<usize>> {
        self.files.get(&file_id)?.line_range((), line_index)
    }
}

#[cfg(test)]
mod tests {
    use super::{Files, FileSystem};
    use std::path::PathBuf;

    #[test]
    fn loads_and_looks_up_sources() {
        let mut files = FileSystem::new();
        let path = PathBuf::from("app/feed.tmpl");
        let id = files
            .load(&path, "<p>one\ntwo</p>".to_string())
            .unwrap();
        assert_eq!(files.id_for_path(&path), Some(id));
        assert_eq!(files.path_for_id(&id), path);
        let length = files
            .with_source::<_, usize, ()>(&id, |source| Ok(source.len()))
            .unwrap();
        assert_eq!(length, 14);
        // Second line starts after "<p>one\n".
        assert_eq!(files.line_index(id, 8), Some(1));
    }

    #[test]
    fn updates_replace_the_source_in_place() {
        let mut files = FileSystem::new();
        let path = PathBuf::from("app/feed.tmpl");
        let id = files.load(&path, "old".to_string()).unwrap();
        files.update(id, "new".to_string());
        assert_eq!(Files::source(&files, id), Some("new".to_string()));
    }
}
