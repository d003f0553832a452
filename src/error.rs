use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("file type not allowed: {}", .0.display())]
    DisallowedExtension(PathBuf),

    #[error("path outside workspace: {}", .0.display())]
    OutsideWorkspace(PathBuf),

    #[error("file too large: {} ({size} bytes, max {max})", path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CopilotError {
    /// Short machine-readable code, used as `metadata.error` in failure responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "file_not_found",
            Self::NotAFile(_) => "not_a_file",
            Self::DisallowedExtension(_) => "disallowed_extension",
            Self::OutsideWorkspace(_) => "outside_workspace",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::Config(_) => "config",
            Self::Provider(_) => "provider",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}
