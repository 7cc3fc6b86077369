use relative_path::RelativePathBuf;

/// Bytes that are not valid UTF-8 for a path whose extension says they should be text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path} is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
pub struct DecodeError {
    pub path: RelativePathBuf,
    pub valid_up_to: usize,
}

/// A pluggable transform failed. Scoped to the one file being processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hook `{hook}` failed: {message}")]
pub struct HookError {
    pub hook: String,
    pub message: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Why a load or save of one file did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to read {path}: {reason}")]
    Read { path: RelativePathBuf, reason: String },
    #[error("failed to write {path}: {reason}")]
    Write { path: RelativePathBuf, reason: String },
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("{path} is not a literate file and cannot be saved from blocks")]
    NotLiterate { path: RelativePathBuf },
}
