use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::cache::human_readable_size;
use crate::error::CopilotError;

/// Extensions and bare file names that may be read
const ALLOWED_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".tsx", ".jsx", ".java", ".go", ".rs", ".rb", ".php", ".cs", ".cpp",
    ".c", ".h", ".hpp", ".swift", ".kt", ".scala", ".vue", ".sql", ".sh", ".bash", ".zsh",
    ".yaml", ".yml", ".json", ".toml", ".xml", ".html", ".css", ".scss", ".sass", ".less", ".md",
    ".txt", ".rst", ".ini", ".cfg", ".conf", ".env", ".gitignore", ".dockerignore",
    "Dockerfile", "Makefile", "requirements.txt", "package.json",
];

/// Directories never descended into
pub(crate) const IGNORED_DIRS: &[&str] = &[
    "__pycache__", ".git", ".svn", ".hg", "node_modules", ".venv", "venv", "env", ".env", ".tox",
    ".pytest_cache", ".mypy_cache", ".ruff_cache", "dist", "build", ".next", "coverage",
    ".coverage", "htmlcov", ".idea", ".vscode", "target",
];

const DEFAULT_MAX_FILE_SIZE: u64 = 1_000_000;

/// Metadata about a file or directory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
    pub size_bytes: u64,
    pub is_directory: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Aggregate counts for a project tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_size_bytes: u64,
    pub total_size_human: String,
    /// Extension (or bare name) with its file count, most common first
    pub file_types: Vec<(String, usize)>,
}

/// Read-only access to project files, limited to known text formats
#[derive(Debug, Clone)]
pub struct FileReader {
    workspace_root: PathBuf,
    allowed: BTreeSet<String>,
    max_file_size: u64,
}

impl FileReader {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        debug!(root = %workspace_root.display(), "file reader initialized");
        Self {
            workspace_root,
            allowed: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Reader rooted at the current directory
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Allow additional extensions (".vue") or bare names ("Justfile")
    pub fn with_extra_extensions(mut self, extra: &[String]) -> Self {
        self.allowed.extend(extra.iter().cloned());
        self
    }

    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Join `path` onto the workspace root and refuse anything that lands outside it.
    ///
    /// Existing paths are compared after symlinks are resolved. Missing paths are
    /// compared as written so callers can still report them as not found.
    fn resolve(&self, path: &Path) -> Result<PathBuf, CopilotError> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(CopilotError::OutsideWorkspace(path.to_path_buf()));
        }

        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        let root = self
            .workspace_root
            .canonicalize()
            .unwrap_or_else(|_| self.workspace_root.clone());

        let inside = match joined.canonicalize() {
            Ok(canonical) => canonical.starts_with(&root),
            Err(_) => joined.starts_with(&root) || joined.starts_with(&self.workspace_root),
        };
        if !inside {
            debug!(path = %path.display(), "path outside workspace refused");
            return Err(CopilotError::OutsideWorkspace(path.to_path_buf()));
        }
        Ok(joined)
    }

    /// Whether the file's extension or full name is on the allow-list
    pub fn is_allowed(&self, path: &Path) -> bool {
        let by_extension = path
            .extension()
            .map(|ext| self.allowed.contains(&format!(".{}", ext.to_string_lossy())))
            .unwrap_or(false);
        let by_name = path
            .file_name()
            .map(|name| self.allowed.contains(name.to_string_lossy().as_ref()))
            .unwrap_or(false);
        by_extension || by_name
    }

    /// Read a text file, optionally keeping only the first `max_lines` lines.
    pub fn read_file(
        &self,
        path: impl AsRef<Path>,
        max_lines: Option<usize>,
    ) -> Result<String, CopilotError> {
        let requested = path.as_ref();
        let path = self.resolve(requested)?;

        if !path.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }
        if !path.is_file() {
            return Err(CopilotError::NotAFile(requested.to_path_buf()));
        }
        if !self.is_allowed(&path) {
            return Err(CopilotError::DisallowedExtension(requested.to_path_buf()));
        }

        let size = std::fs::metadata(&path)?.len();
        if size > self.max_file_size {
            return Err(CopilotError::FileTooLarge {
                path: requested.to_path_buf(),
                size,
                max: self.max_file_size,
            });
        }

        let bytes = std::fs::read(&path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let Some(max_lines) = max_lines else {
            return Ok(content);
        };

        let lines: Vec<&str> = content.split('\n').collect();
        if lines.len() <= max_lines {
            return Ok(content);
        }
        let mut truncated = lines[..max_lines].join("\n");
        truncated.push_str(&format!(
            "\n\n... ({} lines omitted)",
            lines.len() - max_lines
        ));
        Ok(truncated)
    }

    pub fn file_info(&self, path: impl AsRef<Path>) -> Result<FileInfo, CopilotError> {
        let requested = path.as_ref();
        let path = self.resolve(requested)?;
        if !path.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }
        Ok(info_for(&path)?)
    }

    /// Entries of one directory, directories first, then by case-insensitive name.
    pub fn list_directory(
        &self,
        path: impl AsRef<Path>,
        include_hidden: bool,
    ) -> Result<Vec<FileInfo>, CopilotError> {
        let requested = path.as_ref();
        let dir = self.resolve(requested)?;
        if !dir.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(CopilotError::NotAFile(requested.to_path_buf()));
        }

        let mut items = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.path().is_dir();

            if !include_hidden && name.starts_with('.') {
                continue;
            }
            if is_dir && IGNORED_DIRS.contains(&name.as_str()) {
                continue;
            }
            if let Ok(info) = info_for(&entry.path()) {
                items.push(info);
            }
        }

        items.sort_by_key(|info| (!info.is_directory, info.name.to_lowercase()));
        Ok(items)
    }

    /// ASCII tree of `path` down to `max_depth` levels.
    pub fn directory_structure(
        &self,
        path: impl AsRef<Path>,
        max_depth: usize,
        include_files: bool,
    ) -> Result<String, CopilotError> {
        let requested = path.as_ref();
        let dir = self.resolve(requested)?;
        if !dir.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }

        let root_name = dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| requested.display().to_string());

        let mut lines = vec![format!("{}/", root_name)];
        build_tree(&dir, &mut lines, "", max_depth, include_files, 0);
        Ok(lines.join("\n"))
    }

    /// Files whose name matches a glob `pattern`, sorted.
    pub fn find_files(
        &self,
        pattern: &str,
        path: impl AsRef<Path>,
        recursive: bool,
    ) -> Result<Vec<PathBuf>, CopilotError> {
        let requested = path.as_ref();
        let dir = self.resolve(requested)?;
        if !dir.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| CopilotError::Config(format!("invalid glob pattern: {}", e)))?;

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut matches: Vec<PathBuf> = WalkDir::new(&dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| pattern.matches(&e.file_name().to_string_lossy()))
            .map(|e| e.into_path())
            .collect();

        matches.sort();
        Ok(matches)
    }

    /// File counts, line counts and size for a project tree
    pub fn project_summary(&self, path: impl AsRef<Path>) -> Result<ProjectSummary, CopilotError> {
        let requested = path.as_ref();
        let dir = self.resolve(requested)?;
        if !dir.exists() {
            return Err(CopilotError::FileNotFound(requested.to_path_buf()));
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total_lines = 0;
        let mut total_size = 0;

        for entry in WalkDir::new(&dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let kind = entry
                .path()
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or(name);
            *counts.entry(kind).or_default() += 1;

            if let Ok(meta) = entry.metadata() {
                total_size += meta.len();
            }
            if self.is_allowed(entry.path()) {
                if let Ok(content) = std::fs::read_to_string(entry.path()) {
                    total_lines += content.split('\n').count();
                }
            }
        }

        let mut file_types: Vec<(String, usize)> = counts.into_iter().collect();
        file_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(ProjectSummary {
            total_files: file_types.iter().map(|(_, n)| n).sum(),
            total_lines,
            total_size_bytes: total_size,
            total_size_human: human_readable_size(total_size),
            file_types,
        })
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || IGNORED_DIRS.contains(&name.as_ref())
}

fn info_for(path: &Path) -> std::io::Result<FileInfo> {
    let meta = std::fs::metadata(path)?;
    Ok(FileInfo {
        path: path.to_path_buf(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        extension: path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default(),
        size_bytes: meta.len(),
        is_directory: meta.is_dir(),
        last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
    })
}

fn build_tree(
    dir: &Path,
    lines: &mut Vec<String>,
    prefix: &str,
    max_depth: usize,
    include_files: bool,
    depth: usize,
) {
    if depth >= max_depth {
        return;
    }
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };

    let mut items: Vec<(String, PathBuf, bool)> = read
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            let is_dir = path.is_dir();
            (e.file_name().to_string_lossy().into_owned(), path, is_dir)
        })
        .filter(|(name, _, is_dir)| {
            !name.starts_with('.')
                && !(*is_dir && IGNORED_DIRS.contains(&name.as_str()))
                && (include_files || *is_dir)
        })
        .collect();
    items.sort_by_key(|(name, _, is_dir)| (!is_dir, name.to_lowercase()));

    let count = items.len();
    for (i, (name, path, is_dir)) in items.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        if is_dir {
            lines.push(format!("{}{}{}/", prefix, connector, name));
            let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            build_tree(&path, lines, &child_prefix, max_depth, include_files, depth + 1);
        } else {
            lines.push(format!("{}{}{}", prefix, connector, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/main.py"), "print('hi')\nprint('bye')\n").unwrap();
        std::fs::write(dir.path().join("src/util.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Demo\n").unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        dir
    }

    #[test]
    fn reads_allowed_file() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        let content = reader.read_file("src/main.py", None).unwrap();
        assert!(content.contains("print('hi')"));
    }

    #[test]
    fn reads_bare_file_names_on_allow_list() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        assert!(reader.read_file("Dockerfile", None).is_ok());
    }

    #[test]
    fn truncates_with_omitted_note() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        let content = reader.read_file("src/main.py", Some(1)).unwrap();
        assert_eq!(content, "print('hi')\n\n... (2 lines omitted)");
    }

    #[test]
    fn rejects_missing_directory_disallowed_and_large_files() {
        let dir = project();
        let reader = FileReader::new(dir.path()).with_max_file_size(4);

        assert!(matches!(
            reader.read_file("missing.py", None),
            Err(CopilotError::FileNotFound(_))
        ));
        assert!(matches!(
            reader.read_file("src", None),
            Err(CopilotError::NotAFile(_))
        ));
        assert!(matches!(
            reader.read_file("image.png", None),
            Err(CopilotError::DisallowedExtension(_))
        ));
        assert!(matches!(
            reader.read_file("src/main.py", None),
            Err(CopilotError::FileTooLarge { max: 4, .. })
        ));
    }

    #[test]
    fn refuses_paths_outside_workspace() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "token").unwrap();
        let dir = project();
        let reader = FileReader::new(dir.path());

        let absolute = outside.path().join("secret.txt");
        assert!(matches!(
            reader.read_file(&absolute, None),
            Err(CopilotError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            reader.read_file("../secret.txt", None),
            Err(CopilotError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            reader.read_file("src/../../secret.txt", None),
            Err(CopilotError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            reader.list_directory(outside.path(), true),
            Err(CopilotError::OutsideWorkspace(_))
        ));
        assert!(matches!(
            reader.project_summary(".."),
            Err(CopilotError::OutsideWorkspace(_))
        ));

        let inside = dir.path().join("src/main.py");
        assert!(reader.read_file(&inside, None).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn refuses_symlinks_leaving_workspace() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "token").unwrap();
        let dir = project();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link.txt"))
            .unwrap();
        let reader = FileReader::new(dir.path());

        let err = reader.read_file("link.txt", None).unwrap_err();
        assert_eq!(err.code(), "outside_workspace");
    }

    #[test]
    fn extra_extensions_extend_allow_list() {
        let dir = project();
        let reader = FileReader::new(dir.path()).with_extra_extensions(&[".png".to_string()]);
        assert!(reader.is_allowed(&dir.path().join("image.png")));
    }

    #[test]
    fn lists_directories_first_and_skips_ignored() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        let items = reader.list_directory(".", false).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names[0], "src");
        assert!(!names.contains(&"node_modules"));
        assert!(names.contains(&"README.md"));
    }

    #[test]
    fn builds_tree() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        let tree = reader.directory_structure(".", 3, true).unwrap();

        assert!(tree.contains("├── src/"));
        assert!(tree.contains("│   ├── main.py"));
        assert!(!tree.contains("node_modules"));

        let dirs_only = reader.directory_structure(".", 3, false).unwrap();
        assert!(!dirs_only.contains("README.md"));
    }

    #[test]
    fn finds_files_by_glob() {
        let dir = project();
        let reader = FileReader::new(dir.path());

        let recursive = reader.find_files("*.py", ".", true).unwrap();
        assert_eq!(recursive.len(), 2);

        let shallow = reader.find_files("*.py", ".", false).unwrap();
        assert!(shallow.is_empty());

        let js = reader.find_files("*.js", ".", true).unwrap();
        assert!(js.is_empty(), "ignored dirs must be skipped");
    }

    #[test]
    fn summarizes_project() {
        let dir = project();
        let reader = FileReader::new(dir.path());
        let summary = reader.project_summary(".").unwrap();

        assert_eq!(summary.total_files, 5);
        assert_eq!(summary.file_types[0], (".py".to_string(), 2));
        assert!(summary.total_lines >= 4);
    }
}
