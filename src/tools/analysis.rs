use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Size and shape metrics for a piece of source code
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeMetrics {
    /// Total lines, including blanks and comments
    pub lines_of_code: usize,
    /// Non-blank, non-comment lines
    pub logical_lines: usize,
    pub functions: usize,
    /// Classes, structs, enums, traits and interfaces
    pub classes: usize,
    pub imports: usize,
    pub avg_function_length: f64,
    pub max_function_length: usize,
}

/// Computes [`CodeMetrics`] for source text
pub trait CodeAnalyzer: Send + Sync {
    fn get_metrics(&self, code: &str, language: &str) -> CodeMetrics;
}

/// Best analyzer for `language`
pub fn analyzer_for(language: &str) -> Box<dyn CodeAnalyzer> {
    match language {
        "rust" => Box::new(RustAnalyzer),
        _ => Box::new(PatternAnalyzer),
    }
}

/// Language name for a file path, "text" when unknown
pub fn detect_language(path: impl AsRef<Path>) -> &'static str {
    let extension = path
        .as_ref()
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "cpp" | "hpp" => "cpp",
        "c" | "h" => "c",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "vue" => "vue",
        "sql" => "sql",
        "sh" => "bash",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        "md" => "markdown",
        _ => "text",
    }
}

/// Line numbers (1-based) where each regex matches. Invalid patterns map to an empty list.
pub fn find_patterns(code: &str, patterns: &[&str]) -> BTreeMap<String, Vec<usize>> {
    patterns
        .iter()
        .map(|pattern| {
            let lines = match Regex::new(pattern) {
                Ok(re) => code
                    .split('\n')
                    .enumerate()
                    .filter(|(_, line)| re.is_match(line))
                    .map(|(i, _)| i + 1)
                    .collect(),
                Err(e) => {
                    debug!(pattern, error = %e, "skipping invalid pattern");
                    Vec::new()
                }
            };
            (pattern.to_string(), lines)
        })
        .collect()
}

/// Imported module paths, in source order
pub fn get_imports(code: &str, language: &str) -> Vec<String> {
    match language {
        "rust" => match syn::parse_file(code) {
            Ok(file) => {
                let mut imports = Vec::new();
                for item in &file.items {
                    if let syn::Item::Use(item) = item {
                        flatten_use_tree(&item.tree, String::new(), &mut imports);
                    }
                }
                imports
            }
            Err(_) => capture_all(&RUST_USE_RE, code),
        },
        "python" => python_imports(code),
        "javascript" | "typescript" => capture_all(&JS_IMPORT_RE, code),
        "java" | "kotlin" | "scala" => capture_all(&JAVA_IMPORT_RE, code),
        "go" => capture_all(&GO_IMPORT_RE, code),
        _ => Vec::new(),
    }
}

static RUST_USE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:pub\s+)?use\s+([^;]+);").expect("valid regex"));
static JS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^\s*import\s+(?:[^'"]*\s+from\s+)?|require\(\s*)['"]([^'"]+)['"]"#)
        .expect("valid regex")
});
static JAVA_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.*]+)").expect("valid regex")
});
static GO_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import\s+)?(?:\w+\s+)?"([\w./-]+)"\s*$"#).expect("valid regex")
});
static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").expect("valid regex"));
static PY_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(\S+)\s+import\s+(.+)$").expect("valid regex"));

fn capture_all(re: &Regex, code: &str) -> Vec<String> {
    re.captures_iter(code)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<String>())
        .collect()
}

fn python_imports(code: &str) -> Vec<String> {
    let mut imports = Vec::new();
    for line in code.lines() {
        if let Some(cap) = PY_FROM_RE.captures(line) {
            let module = &cap[1];
            for name in split_names(&cap[2]) {
                imports.push(format!("{}.{}", module, name));
            }
        } else if let Some(cap) = PY_IMPORT_RE.captures(line) {
            imports.extend(split_names(&cap[1]));
        }
    }
    imports
}

/// `a as b, (c, d)` -> `a`, `c`, `d`
fn split_names(names: &str) -> Vec<String> {
    names
        .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(|name| name.trim_matches(|c| c == '(' || c == ')').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn flatten_use_tree(tree: &syn::UseTree, prefix: String, out: &mut Vec<String>) {
    let join = |segment: String| {
        if prefix.is_empty() {
            segment
        } else {
            format!("{}::{}", prefix, segment)
        }
    };
    match tree {
        syn::UseTree::Path(path) => flatten_use_tree(&path.tree, join(path.ident.to_string()), out),
        syn::UseTree::Name(name) => out.push(join(name.ident.to_string())),
        syn::UseTree::Rename(rename) => out.push(join(rename.ident.to_string())),
        syn::UseTree::Glob(_) => out.push(join("*".to_string())),
        syn::UseTree::Group(group) => {
            for item in &group.items {
                flatten_use_tree(item, prefix.clone(), out);
            }
        }
    }
}

/// Per-language line patterns
struct LanguagePatterns {
    function: Regex,
    class: Regex,
    import: Regex,
    comments: &'static [&'static str],
    indentation_blocks: bool,
}

fn compile(function: &str, class: &str, import: &str) -> (Regex, Regex, Regex) {
    (
        Regex::new(function).expect("valid function regex"),
        Regex::new(class).expect("valid class regex"),
        Regex::new(import).expect("valid import regex"),
    )
}

const HASH_COMMENTS: &[&str] = &["#"];
const SLASH_COMMENTS: &[&str] = &["//", "/*", "*"];
const ANY_COMMENTS: &[&str] = &["#", "//"];

static PATTERNS: LazyLock<BTreeMap<&'static str, LanguagePatterns>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();

    let (function, class, import) = compile(
        r"^\s*(?:async\s+)?def\s+\w+",
        r"^\s*class\s+\w+",
        r"^\s*(?:import|from)\s+\S+",
    );
    map.insert(
        "python",
        LanguagePatterns {
            function,
            class,
            import,
            comments: HASH_COMMENTS,
            indentation_blocks: true,
        },
    );

    let (function, class, import) = compile(
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+\w+"#,
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+\w+",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+",
    );
    map.insert(
        "rust",
        LanguagePatterns {
            function,
            class,
            import,
            comments: SLASH_COMMENTS,
            indentation_blocks: false,
        },
    );

    for language in ["javascript", "typescript"] {
        let (function, class, import) = compile(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b|=\s*(?:async\s+)?\([^)]*\)\s*=>",
            r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:class|interface)\s+\w+",
            r"^\s*import\s+|require\(",
        );
        map.insert(
            language,
            LanguagePatterns {
                function,
                class,
                import,
                comments: SLASH_COMMENTS,
                indentation_blocks: false,
            },
        );
    }

    let (function, class, import) = compile(
        r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized)\s+)*[\w<>\[\],]+\s+\w+\s*\([^;]*$",
        r"^\s*(?:(?:public|private|protected|abstract|final|static)\s+)*(?:class|interface|enum|record)\s+\w+",
        r"^\s*import\s+",
    );
    map.insert(
        "java",
        LanguagePatterns {
            function,
            class,
            import,
            comments: SLASH_COMMENTS,
            indentation_blocks: false,
        },
    );

    let (function, class, import) = compile(
        r"^\s*func\s+",
        r"^\s*type\s+\w+\s+(?:struct|interface)\b",
        r"^\s*import\b",
    );
    map.insert(
        "go",
        LanguagePatterns {
            function,
            class,
            import,
            comments: SLASH_COMMENTS,
            indentation_blocks: false,
        },
    );

    map
});

static GENERIC_PATTERNS: LazyLock<LanguagePatterns> = LazyLock::new(|| {
    let (function, class, import) = compile(
        r"\b(?:def|function|fn|func)\s+\w+",
        r"\b(?:class|struct|interface|trait)\s+\w+",
        r"^\s*(?:import|from|use|require|#include)\b",
    );
    LanguagePatterns {
        function,
        class,
        import,
        comments: ANY_COMMENTS,
        indentation_blocks: false,
    }
});

/// Line-oriented analyzer driven by per-language regexes
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    fn function_lengths(lines: &[&str], patterns: &LanguagePatterns) -> Vec<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| patterns.function.is_match(line))
            .map(|(start, _)| {
                if patterns.indentation_blocks {
                    indented_block_length(lines, start)
                } else {
                    braced_block_length(lines, start)
                }
            })
            .collect()
    }
}

impl CodeAnalyzer for PatternAnalyzer {
    fn get_metrics(&self, code: &str, language: &str) -> CodeMetrics {
        let patterns = PATTERNS.get(language).unwrap_or(&*GENERIC_PATTERNS);
        let lines: Vec<&str> = code.split('\n').collect();

        let logical_lines = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .filter(|line| !patterns.comments.iter().any(|c| line.starts_with(c)))
            .count();

        let lengths = Self::function_lengths(&lines, patterns);
        let (avg, max) = length_stats(&lengths);

        CodeMetrics {
            lines_of_code: lines.len(),
            logical_lines,
            functions: lengths.len(),
            classes: lines.iter().filter(|l| patterns.class.is_match(l)).count(),
            imports: lines.iter().filter(|l| patterns.import.is_match(l)).count(),
            avg_function_length: avg,
            max_function_length: max,
        }
    }
}

/// Rust analyzer that counts items from the parsed syntax tree
#[derive(Debug, Clone, Copy, Default)]
pub struct RustAnalyzer;

#[derive(Default)]
struct ItemCounts {
    functions: usize,
    classes: usize,
    imports: usize,
}

impl ItemCounts {
    fn visit(&mut self, items: &[syn::Item]) {
        for item in items {
            match item {
                syn::Item::Fn(_) => self.functions += 1,
                syn::Item::Struct(_) | syn::Item::Enum(_) | syn::Item::Union(_) => {
                    self.classes += 1
                }
                syn::Item::Trait(t) => {
                    self.classes += 1;
                    self.functions += t
                        .items
                        .iter()
                        .filter(|i| matches!(i, syn::TraitItem::Fn(f) if f.default.is_some()))
                        .count();
                }
                syn::Item::Impl(i) => {
                    self.functions += i
                        .items
                        .iter()
                        .filter(|i| matches!(i, syn::ImplItem::Fn(_)))
                        .count();
                }
                syn::Item::Use(_) => self.imports += 1,
                syn::Item::Mod(m) => {
                    if let Some((_, items)) = &m.content {
                        self.visit(items);
                    }
                }
                _ => {}
            }
        }
    }
}

impl CodeAnalyzer for RustAnalyzer {
    fn get_metrics(&self, code: &str, _language: &str) -> CodeMetrics {
        let baseline = PatternAnalyzer.get_metrics(code, "rust");

        let file = match syn::parse_file(code) {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "rust parse failed, using pattern metrics");
                return baseline;
            }
        };

        let mut counts = ItemCounts::default();
        counts.visit(&file.items);

        CodeMetrics {
            functions: counts.functions,
            classes: counts.classes,
            imports: counts.imports,
            ..baseline
        }
    }
}

fn length_stats(lengths: &[usize]) -> (f64, usize) {
    if lengths.is_empty() {
        return (0.0, 0);
    }
    let avg = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    ((avg * 100.0).round() / 100.0, lengths.iter().copied().max().unwrap_or(0))
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Lines from `start` through the last line indented deeper than it
fn indented_block_length(lines: &[&str], start: usize) -> usize {
    let base = indent_of(lines[start]);
    let mut last = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        last = i;
    }
    last - start + 1
}

/// Lines from `start` until its first brace block closes
fn braced_block_length(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (offset, line) in lines[start..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return offset + 1;
        }
        if !opened && line.trim_end().ends_with(';') {
            return offset + 1;
        }
    }
    lines.len() - start
}
