use relative_path::RelativePath;
use std::time::SystemTime;

use super::{LoadOutcome, LoadRequest, Processor, RenderedPage, stamp_after};
use crate::cache::SharedProject;
use crate::classifier::{FileKind, classify};
use crate::error::ProcessError;
use crate::hooks::{CacheScan, CrossReferences, DocFragments, HookContext, HtmlRole};
use crate::models::LanguageProfile;

impl Processor {
    /// The load direction without taking the path's section. The caller must hold it.
    pub(crate) fn load_unlocked(&self, shared: &SharedProject, request: LoadRequest) -> LoadOutcome {
        let LoadRequest {
            path,
            contents,
            is_toc,
        } = request;

        let (bytes, modified) = match contents {
            Ok(contents) => (Ok(contents.bytes), Some(contents.modified)),
            Err(reason) => (Err(reason), None),
        };
        let kind = classify(&path, bytes, is_toc, &shared.read(), &self.languages);

        match kind {
            FileKind::ReadError { reason } => {
                log::warn!("failed to read {path}: {reason}");
                LoadOutcome::Failed(ProcessError::Read { path, reason })
            }
            FileKind::Binary {
                bytes,
                decode_error,
            } => LoadOutcome::Binary {
                bytes,
                decode_error,
            },
            FileKind::PlainText(text) => LoadOutcome::PlainText(text),
            FileKind::LiterateDocument { text, profile }
            | FileKind::LiterateSource { text, profile } => {
                let modified = modified.unwrap_or(SystemTime::UNIX_EPOCH);
                match self.render(shared, &path, text, profile, modified, is_toc) {
                    Ok(page) => LoadOutcome::Rendered(page),
                    Err(err) => {
                        log::warn!("failed to render {path}: {err}");
                        LoadOutcome::Failed(err)
                    }
                }
            }
        }
    }

    fn render(
        &self,
        shared: &SharedProject,
        path: &RelativePath,
        text: String,
        profile: &LanguageProfile,
        modified: SystemTime,
        is_toc: bool,
    ) -> Result<RenderedPage, ProcessError> {
        let ctx = HookContext { path, profile };
        let (fresh, numbering_depth, toc_enabled) = {
            let state = shared.read();
            (
                state.is_fresh(path, modified),
                state.numbering_depth(),
                is_toc && state.is_project(),
            )
        };

        let (text, pre_dirty) = if fresh {
            (text, false)
        } else {
            let transformed = self.hooks.pre_forward(text.clone(), &ctx)?;
            let changed = transformed != text;
            (transformed, changed)
        };

        let mut blocks = self.parse(&text, &ctx)?;
        let mut fragments = DocFragments::from_blocks(&blocks);

        let update = if fresh {
            log::debug!("{path}: cache entry is fresh; skipping cache hooks");
            None
        } else {
            log::debug!("{path}: cache entry is stale; running cache hooks");
            let mut scan = CacheScan::new(path, numbering_depth, toc_enabled);
            fragments.walk(&self.hooks.html_hooks(HtmlRole::Cache), &mut scan)?;
            Some(scan.finish(&mut fragments))
        };
        let ids_inserted = fragments.any_modified();

        let rewritten = {
            let state = shared.read();
            let mut xref = CrossReferences::new(path, &state, update.as_ref());
            fragments.walk(&self.hooks.html_hooks(HtmlRole::CrossReference), &mut xref)?;
            xref.rewritten()
        };
        fragments.write_back(&mut blocks);

        let cache_refreshed = update.is_some();
        let mut state = shared.write();
        if let Some(update) = update {
            state.apply_update(update, stamp_after(modified));
        }

        Ok(RenderedPage {
            blocks,
            nav: state.nav_for(path),
            dirty: pre_dirty || ids_inserted || rewritten > 0,
            cache_refreshed,
            numbering_depth,
            toc_number: state.toc_number_for(path),
            language: profile.name.clone(),
        })
    }
}
