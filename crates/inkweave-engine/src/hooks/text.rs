use std::fmt;

use super::HookContext;
use crate::error::HookError;

/// A whole-file text transform: `forward` runs before lexing on load, `reverse` after
/// de-lexing on save.
pub type TextTransform = fn(&str, &HookContext<'_>) -> anyhow::Result<String>;

#[derive(Clone, Copy)]
pub enum PreParseHook {
    /// CRLF to LF on load. Files come back with LF endings on save.
    NormalizeLineEndings,
    /// Strips trailing spaces and tabs from every line on save.
    TrimTrailingWhitespace,
    Custom {
        name: &'static str,
        forward: TextTransform,
        reverse: TextTransform,
    },
}

impl PreParseHook {
    pub fn name(&self) -> &'static str {
        match self {
            PreParseHook::NormalizeLineEndings => "normalize-line-endings",
            PreParseHook::TrimTrailingWhitespace => "trim-trailing-whitespace",
            PreParseHook::Custom { name, .. } => *name,
        }
    }

    pub fn forward(&self, text: &str, ctx: &HookContext<'_>) -> Result<String, HookError> {
        match self {
            PreParseHook::NormalizeLineEndings => Ok(text.replace("\r\n", "\n")),
            PreParseHook::TrimTrailingWhitespace => Ok(text.to_string()),
            PreParseHook::Custom { forward, .. } => {
                forward(text, ctx).map_err(|e| HookError::new(self.name(), format!("{e:#}")))
            }
        }
    }

    pub fn reverse(&self, text: &str, ctx: &HookContext<'_>) -> Result<String, HookError> {
        match self {
            PreParseHook::NormalizeLineEndings => Ok(text.to_string()),
            PreParseHook::TrimTrailingWhitespace => Ok(trim_trailing_whitespace(text)),
            PreParseHook::Custom { reverse, .. } => {
                reverse(text, ctx).map_err(|e| HookError::new(self.name(), format!("{e:#}")))
            }
        }
    }
}

impl fmt::Debug for PreParseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreParseHook({})", self.name())
    }
}

fn trim_trailing_whitespace(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let (body, ending) = match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            };
            format!("{}{ending}", body.trim_end_matches([' ', '\t']))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageTable;
    use relative_path::RelativePath;

    fn with_ctx<R>(f: impl FnOnce(&HookContext<'_>) -> R) -> R {
        let table = LanguageTable::builtin();
        let ctx = HookContext {
            path: RelativePath::new("a.py"),
            profile: table.by_name("python").unwrap(),
        };
        f(&ctx)
    }

    #[test]
    fn line_endings_normalize_on_load_only() {
        with_ctx(|ctx| {
            let hook = PreParseHook::NormalizeLineEndings;
            assert_eq!(hook.forward("a\r\nb\r\n", ctx).unwrap(), "a\nb\n");
            assert_eq!(hook.reverse("a\nb\n", ctx).unwrap(), "a\nb\n");
        });
    }

    #[test]
    fn trailing_whitespace_is_trimmed_on_save() {
        with_ctx(|ctx| {
            let hook = PreParseHook::TrimTrailingWhitespace;
            assert_eq!(hook.reverse("x = 1  \n# a\t\nend ", ctx).unwrap(), "x = 1\n# a\nend");
            assert_eq!(hook.forward("x = 1  \n", ctx).unwrap(), "x = 1  \n");
        });
    }

    #[test]
    fn custom_failure_names_the_hook() {
        fn fail(_: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
            anyhow::bail!("formatter crashed")
        }
        fn keep(text: &str, _: &HookContext<'_>) -> anyhow::Result<String> {
            Ok(text.to_string())
        }

        with_ctx(|ctx| {
            let hook = PreParseHook::Custom {
                name: "black",
                forward: fail,
                reverse: keep,
            };
            let err = hook.forward("x", ctx).unwrap_err();
            assert_eq!(err.hook, "black");
            assert_eq!(err.message, "formatter crashed");
            assert_eq!(hook.reverse("x", ctx).unwrap(), "x");
        });
    }
}
