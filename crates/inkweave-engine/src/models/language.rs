use relative_path::RelativePath;
use serde::{Deserialize, Serialize};

/// Opening and closing delimiters of a block comment, e.g. `/*` and `*/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelimiters {
    pub open: String,
    pub close: String,
}

impl BlockDelimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Markup language used inside doc blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkupDialect {
    #[default]
    Markdown,
}

/// Whether files of a profile mix code and docs or are pure markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    /// Code interleaved with comment-delimited documentation.
    Source,
    /// The whole file is markup; it becomes a single doc block.
    Document,
}

/// Comment syntax and markup dialect of one source language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub name: String,
    pub extensions: Vec<String>,
    pub kind: ProfileKind,
    #[serde(default)]
    pub inline_comments: Vec<String>,
    #[serde(default)]
    pub block_comments: Vec<BlockDelimiters>,
    #[serde(default)]
    pub dialect: MarkupDialect,
}

impl LanguageProfile {
    pub fn source(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            kind: ProfileKind::Source,
            inline_comments: Vec::new(),
            block_comments: Vec::new(),
            dialect: MarkupDialect::Markdown,
        }
    }

    pub fn document(name: &str, extensions: &[&str]) -> Self {
        Self {
            kind: ProfileKind::Document,
            ..Self::source(name, extensions)
        }
    }

    pub fn with_inline(mut self, delimiter: &str) -> Self {
        self.inline_comments.push(delimiter.to_string());
        self
    }

    pub fn with_block(mut self, open: &str, close: &str) -> Self {
        self.block_comments.push(BlockDelimiters::new(open, close));
        self
    }

    pub fn is_document(&self) -> bool {
        self.kind == ProfileKind::Document
    }

    /// False when the lexer has nothing to match and must emit a single code block.
    pub fn has_comment_delimiters(&self) -> bool {
        !self.inline_comments.is_empty() || !self.block_comments.is_empty()
    }

    /// The closing delimiter when `delimiter` opens a block comment.
    pub fn block_close_for(&self, delimiter: &str) -> Option<&str> {
        self.block_comments
            .iter()
            .find(|b| b.open == delimiter)
            .map(|b| b.close.as_str())
    }

    /// Delimiter used for doc blocks that arrive without one.
    pub fn preferred_doc_delimiter(&self) -> Option<&str> {
        self.inline_comments
            .first()
            .map(String::as_str)
            .or_else(|| self.block_comments.first().map(|b| b.open.as_str()))
    }

    fn matches_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Lookup table from file extension to [`LanguageProfile`].
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    profiles: Vec<LanguageProfile>,
}

impl LanguageTable {
    pub fn new(profiles: Vec<LanguageProfile>) -> Self {
        Self { profiles }
    }

    /// The profiles this crate knows about out of the box.
    pub fn builtin() -> Self {
        let c_like = |name: &str, exts: &[&str]| {
            LanguageProfile::source(name, exts)
                .with_inline("//")
                .with_block("/*", "*/")
        };
        let hash = |name: &str, exts: &[&str]| LanguageProfile::source(name, exts).with_inline("#");

        Self::new(vec![
            hash("python", &["py", "pyw"]),
            hash("shell", &["sh", "bash", "zsh"]),
            hash("toml", &["toml"]),
            hash("yaml", &["yml", "yaml"]),
            c_like("rust", &["rs"]),
            c_like("c", &["c", "h"]),
            c_like("cpp", &["cpp", "cc", "cxx", "hpp", "hh"]),
            c_like("go", &["go"]),
            c_like("java", &["java"]),
            c_like("javascript", &["js", "mjs", "cjs", "jsx"]),
            c_like("typescript", &["ts", "mts", "tsx"]),
            LanguageProfile::source("css", &["css"]).with_block("/*", "*/"),
            LanguageProfile::source("sql", &["sql"])
                .with_inline("--")
                .with_block("/*", "*/"),
            LanguageProfile::source("lua", &["lua"]).with_inline("--"),
            LanguageProfile::document("markdown", &["md", "markdown"]),
        ])
    }

    /// Add a profile, replacing any existing profile with the same name.
    pub fn insert(&mut self, profile: LanguageProfile) {
        self.profiles.retain(|p| p.name != profile.name);
        self.profiles.push(profile);
    }

    pub fn by_name(&self, name: &str) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn for_path(&self, path: &RelativePath) -> Option<&LanguageProfile> {
        let extension = path.extension()?;
        // Later entries win so user-supplied profiles override built-ins.
        self.profiles
            .iter()
            .rev()
            .find(|p| p.matches_extension(extension))
    }

    /// The document-only profile used when a file must be treated as pure markup.
    pub fn document_profile(&self) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.is_document())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_by_extension() {
        let table = LanguageTable::builtin();
        let python = table.for_path(RelativePath::new("src/a.py")).unwrap();
        assert_eq!(python.name, "python");
        assert_eq!(python.inline_comments, vec!["#".to_string()]);

        let rust = table.for_path(RelativePath::new("lib.RS")).unwrap();
        assert_eq!(rust.name, "rust");
        assert_eq!(rust.block_close_for("/*"), Some("*/"));
    }

    #[test]
    fn unknown_extension_has_no_profile() {
        let table = LanguageTable::builtin();
        assert!(table.for_path(RelativePath::new("notes.txt")).is_none());
        assert!(table.for_path(RelativePath::new("Makefile")).is_none());
    }

    #[test]
    fn markdown_is_document_profile() {
        let table = LanguageTable::builtin();
        let md = table.for_path(RelativePath::new("toc.md")).unwrap();
        assert!(md.is_document());
        assert!(!md.has_comment_delimiters());
        assert_eq!(table.document_profile().unwrap().name, "markdown");
    }

    #[test]
    fn insert_overrides_builtin() {
        let mut table = LanguageTable::builtin();
        table.insert(LanguageProfile::source("python", &["py"]).with_inline(";;"));
        let python = table.for_path(RelativePath::new("a.py")).unwrap();
        assert_eq!(python.preferred_doc_delimiter(), Some(";;"));
    }

    #[test]
    fn preferred_delimiter_falls_back_to_block_opener() {
        let table = LanguageTable::builtin();
        let css = table.by_name("css").unwrap();
        assert_eq!(css.preferred_doc_delimiter(), Some("/*"));
    }
}
