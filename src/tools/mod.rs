mod analysis;
mod file;
mod git;
mod search;

pub use analysis::{
    CodeAnalyzer, CodeMetrics, PatternAnalyzer, RustAnalyzer, analyzer_for, detect_language,
    find_patterns, get_imports,
};
pub use file::{FileInfo, FileReader, ProjectSummary};
pub use git::{CommitInfo, FileChange, GitStatus, GitTool};
pub use search::{SearchMatch, SearchTool, SymbolMatch};
