//! Decides how a requested file is handled: binary, plain text, pure markup, or a
//! code/doc mix that goes through the lexer.

use relative_path::{RelativePath, RelativePathBuf};

use crate::cache::ProjectState;
use crate::error::DecodeError;
use crate::models::{LanguageProfile, LanguageTable};

/// The classifier's verdict for one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileKind<'l> {
    /// The file could not be read; nothing else is known about it.
    ReadError { reason: String },
    /// Not text. `decode_error` is set when the extension promised text.
    Binary {
        bytes: Vec<u8>,
        decode_error: Option<DecodeError>,
    },
    /// Text with no language mapping.
    PlainText(String),
    /// Pure markup, rendered as a single doc block.
    LiterateDocument {
        text: String,
        profile: &'l LanguageProfile,
    },
    /// Code interleaved with doc comments.
    LiterateSource {
        text: String,
        profile: &'l LanguageProfile,
    },
}

/// Classifies `path` from its bytes (or read failure).
///
/// `is_toc` marks the project's table-of-contents root, which is always treated as a
/// markup document while the project is in project mode.
pub fn classify<'l>(
    path: &RelativePath,
    contents: Result<Vec<u8>, String>,
    is_toc: bool,
    state: &ProjectState,
    languages: &'l LanguageTable,
) -> FileKind<'l> {
    let bytes = match contents {
        Ok(bytes) => bytes,
        Err(reason) => return FileKind::ReadError { reason },
    };

    let profile = if is_toc && state.is_project() {
        languages.document_profile()
    } else {
        languages.for_path(path)
    };

    // NUL bytes never occur in text we are willing to edit.
    if bytes.contains(&0) {
        return FileKind::Binary {
            bytes,
            decode_error: None,
        };
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            let decode_error = profile.map(|_| DecodeError {
                path: RelativePathBuf::from(path.as_str()),
                valid_up_to: err.utf8_error().valid_up_to(),
            });
            if let Some(decode_error) = &decode_error {
                log::warn!("{decode_error}; serving as binary");
            }
            return FileKind::Binary {
                bytes: err.into_bytes(),
                decode_error,
            };
        }
    };

    match profile {
        Some(profile) if profile.is_document() => FileKind::LiterateDocument { text, profile },
        Some(profile) => FileKind::LiterateSource { text, profile },
        None => FileKind::PlainText(text),
    }
}
