use kuchikiki::NodeRef;
use relative_path::RelativePath;

use super::html::{HtmlHook, HtmlVisitor, attr, has_class, plain_text, replace_text, resolve_href};
use crate::cache::{AnchorKey, FileUpdate, ProjectState};
use crate::error::HookError;

/// Class that asks for a link's text to be replaced by its target's title.
pub const AUTOTITLE_CLASS: &str = "autotitle";

/// Fills in the text of `<a class="autotitle">` references from the cache.
///
/// Targets in the file being processed are looked up in `pending` first, so a heading
/// renamed in the same edit is picked up before the cache commit.
#[derive(Debug)]
pub struct CrossReferences<'a> {
    path: &'a RelativePath,
    state: &'a ProjectState,
    pending: Option<&'a FileUpdate>,
    rewritten: usize,
}

impl<'a> CrossReferences<'a> {
    pub fn new(
        path: &'a RelativePath,
        state: &'a ProjectState,
        pending: Option<&'a FileUpdate>,
    ) -> Self {
        Self {
            path,
            state,
            pending,
            rewritten: 0,
        }
    }

    /// Number of references whose text changed.
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    fn title_of(&self, key: &AnchorKey) -> Option<String> {
        if let Some(update) = self.pending.filter(|u| u.path == key.file) {
            return if key.is_file_level() {
                update.title.clone()
            } else {
                update.anchor(&key.id).map(|a| a.title.clone())
            };
        }
        self.state.title_of(key).map(str::to_string)
    }

    fn retitle(&mut self, element: &NodeRef) -> bool {
        if !has_class(element, AUTOTITLE_CLASS) {
            return false;
        }
        let Some(target) = attr(element, "href").and_then(|href| resolve_href(self.path, &href))
        else {
            return false;
        };
        let Some(title) = self.title_of(&target) else {
            log::debug!(
                "{}: no title known for {}#{}",
                self.path,
                target.file,
                target.id
            );
            return false;
        };
        if plain_text(element) == title {
            return false;
        }
        replace_text(element, &title);
        self.rewritten += 1;
        true
    }
}

impl HtmlVisitor for CrossReferences<'_> {
    fn visit(
        &mut self,
        hook: HtmlHook,
        element: &NodeRef,
        _fragment: usize,
    ) -> Result<bool, HookError> {
        match hook {
            HtmlHook::AutoTitle => Ok(self.retitle(element)),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::DocFragments;
    use crate::models::Block;
    use crate::tests::{heading_anchor, update_with};
    use pretty_assertions::assert_eq;
    use std::time::SystemTime;

    fn retitle(
        path: &str,
        html: &str,
        state: &ProjectState,
        pending: Option<&FileUpdate>,
    ) -> (String, bool) {
        let mut blocks = vec![Block::doc("", "#", html)];
        let mut fragments = DocFragments::from_blocks(&blocks);
        let mut xref = CrossReferences::new(RelativePath::new(path), state, pending);
        fragments.walk(&[HtmlHook::AutoTitle], &mut xref).unwrap();
        fragments.write_back(&mut blocks);
        (blocks.remove(0).content, fragments.any_modified())
    }

    fn state_with_setup_heading() -> ProjectState {
        let mut state = ProjectState::single_file();
        let mut update = update_with("b.md", &[], &[]);
        update.anchors.push(heading_anchor("b.md", "setup", "Setting up"));
        update.title = Some("Bee".to_string());
        state.apply_update(update, SystemTime::now());
        state
    }

    #[test]
    fn autotitle_links_take_target_title() {
        let state = state_with_setup_heading();
        let (html, modified) = retitle(
            "a.md",
            "<p><a class=\"autotitle\" href=\"b.md#setup\">old</a> and <a class=\"autotitle\" href=\"b.md\">x</a></p>",
            &state,
            None,
        );
        assert!(modified);
        assert_eq!(
            html,
            "<p><a class=\"autotitle\" href=\"b.md#setup\">Setting up</a> and <a class=\"autotitle\" href=\"b.md\">Bee</a></p>"
        );
    }

    #[test]
    fn plain_links_and_matching_titles_are_left_alone() {
        let state = state_with_setup_heading();
        let original = "<p><a href=\"b.md#setup\">old</a> <a class=\"autotitle\" href=\"b.md#setup\">Setting up</a> <a class=\"autotitle\" href=\"b.md#gone\">?</a></p>";
        let (html, modified) = retitle("a.md", original, &state, None);
        assert!(!modified);
        assert_eq!(html, original);
    }

    #[test]
    fn pending_update_wins_for_the_same_file() {
        let state = ProjectState::single_file();
        let mut pending = update_with("a.md", &[], &[]);
        pending.anchors.push(heading_anchor("a.md", "intro", "Introduction"));
        let (html, modified) = retitle(
            "a.md",
            "<p><a class=\"autotitle\" href=\"#intro\">Intro</a></p>",
            &state,
            Some(&pending),
        );
        assert!(modified);
        assert!(html.contains(">Introduction</a>"));
    }
}
