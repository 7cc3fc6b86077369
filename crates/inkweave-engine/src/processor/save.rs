use std::time::SystemTime;

use super::{LoadRequest, Processor, SaveOutcome, SaveRequest};
use crate::cache::SharedProject;
use crate::error::ProcessError;
use crate::hooks::{CacheScan, CrossReferences, DocFragments, HookContext, HtmlRole};
use crate::io::FileContents;
use crate::lexing::delex;

impl Processor {
    /// The save direction without taking the path's section. The caller must hold it.
    pub(crate) fn save_unlocked(
        &self,
        shared: &SharedProject,
        request: SaveRequest,
    ) -> Result<SaveOutcome, ProcessError> {
        let SaveRequest {
            path,
            mut blocks,
            is_toc,
        } = request;

        let (numbering_depth, is_project) = {
            let state = shared.read();
            (state.numbering_depth(), state.is_project())
        };
        let profile = self
            .profile_for(&path, is_toc, is_project)
            .ok_or_else(|| ProcessError::NotLiterate { path: path.clone() })?;
        let ctx = HookContext {
            path: &path,
            profile,
        };

        let mut fragments = DocFragments::from_blocks(&blocks);
        let mut scan = CacheScan::new(&path, numbering_depth, is_toc && is_project);
        fragments.walk(&self.hooks.html_hooks(HtmlRole::Cache), &mut scan)?;
        let update = scan.finish(&mut fragments);
        {
            let state = shared.read();
            let mut xref = CrossReferences::new(&path, &state, Some(&update));
            fragments.walk(&self.hooks.html_hooks(HtmlRole::CrossReference), &mut xref)?;
        }
        fragments.write_back(&mut blocks);
        let html_dirty = fragments.any_modified();

        let mut source_blocks = self.hooks.post_reverse(blocks.clone(), &ctx)?;
        // The last block keeps the newline that ends the file.
        if let Some(last) = source_blocks.last_mut()
            && last.is_doc()
            && !last.content.ends_with('\n')
        {
            last.content.push('\n');
        }
        let text = delex(&source_blocks, profile);
        let persist_text = self.hooks.pre_reverse(text.clone(), &ctx)?;
        let pre_dirty = persist_text != text;

        let relexed = self.hooks.pre_forward(persist_text.clone(), &ctx)?;
        let lex_mismatch = self.parse(&relexed, &ctx)? != blocks;
        if lex_mismatch {
            log::info!("{path}: persisted text does not re-lex to the submitted blocks");
        }

        let dirty = html_dirty || pre_dirty || lex_mismatch;
        let stamp = SystemTime::now();
        shared.write().apply_update(update, stamp);
        log::debug!("{path}: saved (dirty: {dirty})");

        let reload = dirty.then(|| {
            Box::new(self.load_unlocked(
                shared,
                LoadRequest {
                    path: path.clone(),
                    contents: Ok(FileContents {
                        bytes: persist_text.clone().into_bytes(),
                        modified: stamp,
                    }),
                    is_toc,
                },
            ))
        });

        Ok(SaveOutcome {
            persist_text,
            dirty,
            blocks,
            reload,
        })
    }
}
