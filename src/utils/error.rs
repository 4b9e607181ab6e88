use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackcheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor list failed validation. Carries every violation found,
    /// not just the first. No report is produced; maps to exit code 2.
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Config(Vec<String>),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("System error: {0}")]
    System(String),
}

pub type Result<T> = std::result::Result<T, StackcheckError>;
