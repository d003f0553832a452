use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use super::analysis::detect_language;
use super::file::IGNORED_DIRS;
use crate::error::CopilotError;

const MAX_RESULTS: usize = 100;
const MAX_TODO_RESULTS: usize = 200;
const MAX_CONTENT_PREVIEW: usize = 200;

/// Extensions searched by default
const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "tsx", "jsx", "java", "go", "rs", "rb", "php", "cs", "cpp", "c", "h", "hpp",
    "swift", "kt", "scala", "vue", "sql", "sh",
];

const TODO_PATTERN: &str = r"\b(TODO|FIXME|HACK|XXX|BUG|NOTE)[\s:]*(.+)";

/// Find the largest byte index <= `index` that is a valid char boundary.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// One matching line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub content: String,
    /// Byte offsets of the match within the line
    pub match_start: usize,
    pub match_end: usize,
}

/// A symbol definition found by [`SearchTool::find_symbol`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMatch {
    pub name: String,
    /// function, class, variable, interface or type
    pub kind: &'static str,
    pub file: PathBuf,
    pub line: usize,
    pub signature: String,
}

/// Text and regex search over a source tree
#[derive(Debug, Clone)]
pub struct SearchTool {
    root: PathBuf,
}

impl SearchTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Literal text search, optionally restricted by a file-name glob
    pub fn search_text(
        &self,
        query: &str,
        path: impl AsRef<Path>,
        file_pattern: Option<&str>,
        case_sensitive: bool,
    ) -> Result<Vec<SearchMatch>, CopilotError> {
        let regex = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| CopilotError::Config(format!("invalid query: {}", e)))?;
        self.search(&regex, path.as_ref(), file_pattern, MAX_RESULTS)
    }

    pub fn search_regex(
        &self,
        pattern: &str,
        path: impl AsRef<Path>,
    ) -> Result<Vec<SearchMatch>, CopilotError> {
        let regex = Regex::new(pattern)
            .map_err(|e| CopilotError::Config(format!("invalid regex pattern: {}", e)))?;
        self.search(&regex, path.as_ref(), None, MAX_RESULTS)
    }

    /// TODO/FIXME/HACK/XXX/BUG/NOTE markers
    pub fn find_todos(&self, path: impl AsRef<Path>) -> Result<Vec<SearchMatch>, CopilotError> {
        let regex = Regex::new(TODO_PATTERN)
            .map_err(|e| CopilotError::Config(format!("invalid regex pattern: {}", e)))?;
        self.search(&regex, path.as_ref(), None, MAX_TODO_RESULTS)
    }

    /// Whole-word uses of `name`
    pub fn find_references(
        &self,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<Vec<SearchMatch>, CopilotError> {
        let regex = Regex::new(&format!(r"\b{}\b", regex::escape(name)))
            .map_err(|e| CopilotError::Config(format!("invalid symbol name: {}", e)))?;
        self.search(&regex, path.as_ref(), None, MAX_RESULTS)
    }

    /// Definitions of `name`, optionally only in files of one language
    pub fn find_symbol(
        &self,
        name: &str,
        path: impl AsRef<Path>,
        language: Option<&str>,
    ) -> Result<Vec<SymbolMatch>, CopilotError> {
        let mut symbols = Vec::new();

        for file in self.files(path.as_ref(), None) {
            let file_language = detect_language(&file);
            if language.is_some_and(|l| l != file_language) {
                continue;
            }
            let patterns = symbol_patterns(name, file_language);
            if patterns.is_empty() {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&file) else {
                continue;
            };

            for (pattern, kind) in &patterns {
                let Ok(regex) = Regex::new(pattern) else {
                    continue;
                };
                for (i, line) in content.split('\n').enumerate() {
                    if regex.is_match(line) {
                        symbols.push(SymbolMatch {
                            name: name.to_string(),
                            kind: *kind,
                            file: file.clone(),
                            line: i + 1,
                            signature: line.trim().to_string(),
                        });
                    }
                }
            }
        }

        symbols.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
        Ok(symbols)
    }

    fn search(
        &self,
        regex: &Regex,
        path: &Path,
        file_pattern: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchMatch>, CopilotError> {
        if !self.resolve(path).exists() {
            return Err(CopilotError::FileNotFound(path.to_path_buf()));
        }
        let file_pattern = file_pattern
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| CopilotError::Config(format!("invalid file pattern: {}", e)))?;

        let mut results = Vec::new();
        for file in self.files(path, file_pattern.as_ref()) {
            if results.len() >= max_results {
                break;
            }
            search_file(&file, regex, &mut results, max_results);
        }

        debug!(pattern = %regex.as_str(), matches = results.len(), "search complete");
        Ok(results)
    }

    fn files(&self, path: &Path, file_pattern: Option<&glob::Pattern>) -> Vec<PathBuf> {
        let start = self.resolve(path);
        if start.is_file() {
            return vec![start];
        }

        WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !IGNORED_DIRS.contains(&name.as_ref())
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| CODE_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .filter(|e| {
                file_pattern
                    .map(|p| p.matches(&e.file_name().to_string_lossy()))
                    .unwrap_or(true)
            })
            .map(|e| e.into_path())
            .collect()
    }
}

fn search_file(path: &Path, regex: &Regex, results: &mut Vec<SearchMatch>, max_results: usize) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return, // Skip files we can't read
    };

    for (line_num, line) in content.split('\n').enumerate() {
        if results.len() >= max_results {
            break;
        }

        if let Some(m) = regex.find(line) {
            let preview = if line.len() > MAX_CONTENT_PREVIEW {
                let boundary = floor_char_boundary(line, MAX_CONTENT_PREVIEW);
                format!("{}...", &line[..boundary])
            } else {
                line.to_string()
            };
            results.push(SearchMatch {
                file: path.to_path_buf(),
                line: line_num + 1,
                content: preview,
                match_start: m.start(),
                match_end: m.end(),
            });
        }
    }
}

fn symbol_patterns(name: &str, language: &str) -> Vec<(String, &'static str)> {
    let n = regex::escape(name);
    match language {
        "python" => vec![
            (format!(r"^\s*(?:async\s+)?def\s+{}\s*\(", n), "function"),
            (format!(r"^\s*class\s+{}\s*[\(:]", n), "class"),
            (format!(r"^\s*{}\s*=", n), "variable"),
        ],
        "javascript" => vec![
            (format!(r"function\s+{}\s*\(", n), "function"),
            (format!(r"(?:const|let)\s+{}\s*=", n), "variable"),
            (format!(r"class\s+{}\s*[\{{]", n), "class"),
        ],
        "typescript" => vec![
            (format!(r"function\s+{}\s*[\(<]", n), "function"),
            (format!(r"const\s+{}\s*[=:]", n), "variable"),
            (format!(r"class\s+{}\s*[\{{<]", n), "class"),
            (format!(r"interface\s+{}\s*[\{{<]", n), "interface"),
        ],
        "rust" => vec![
            (format!(r"\bfn\s+{}\s*[\(<]", n), "function"),
            (format!(r"\b(?:struct|enum|trait|union)\s+{}\b", n), "class"),
            (format!(r"\b(?:const|static)\s+{}\s*:", n), "variable"),
            (format!(r"\btype\s+{}\b", n), "type"),
        ],
        "go" => vec![
            (format!(r"^\s*func\s+(?:\([^)]*\)\s*)?{}\s*\(", n), "function"),
            (format!(r"^\s*type\s+{}\s+(?:struct|interface)", n), "class"),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(
            dir.path().join("src/app.py"),
            "class Handler:\n    pass\n\ndef process(x):\n    # TODO: validate input\n    return Process(x)\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("src/lib.rs"),
            "pub struct Engine;\n\npub fn process() {}\n// FIXME leaks\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "process everything").unwrap();
        std::fs::write(dir.path().join("node_modules/x.js"), "process()").unwrap();
        dir
    }

    #[test]
    fn text_search_respects_case_and_skips_non_code() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());

        let insensitive = tool.search_text("process", ".", None, false).unwrap();
        assert_eq!(insensitive.len(), 3);

        let sensitive = tool.search_text("Process", ".", None, true).unwrap();
        assert_eq!(sensitive.len(), 1);
        assert_eq!(sensitive[0].line, 6);
        assert_eq!(sensitive[0].match_start, 11);
    }

    #[test]
    fn file_pattern_filters() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());
        let matches = tool.search_text("process", ".", Some("*.rs"), false).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].file.ends_with("lib.rs"));
    }

    #[test]
    fn finds_todos() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());
        let todos = tool.find_todos(".").unwrap();
        assert_eq!(todos.len(), 2);
    }

    #[test]
    fn finds_symbols_per_language() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());

        let all = tool.find_symbol("process", ".", None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| s.kind == "function"));

        let rust_only = tool.find_symbol("Engine", ".", Some("rust")).unwrap();
        assert_eq!(rust_only.len(), 1);
        assert_eq!(rust_only[0].kind, "class");
        assert_eq!(rust_only[0].signature, "pub struct Engine;");
    }

    #[test]
    fn references_are_whole_words() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());
        let refs = tool.find_references("Handler", ".").unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn invalid_regex_and_missing_path_error() {
        let dir = tree();
        let tool = SearchTool::new(dir.path());
        assert!(tool.search_regex("(", ".").is_err());
        assert!(tool.search_regex("x", "missing").is_err());
    }

    #[test]
    fn preview_is_truncated_on_char_boundary() {
        let line = "é".repeat(150);
        let boundary = floor_char_boundary(&line, MAX_CONTENT_PREVIEW);
        assert!(line.is_char_boundary(boundary));
        assert!(boundary <= MAX_CONTENT_PREVIEW);
    }
}
