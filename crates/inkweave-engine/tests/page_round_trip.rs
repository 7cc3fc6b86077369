use inkweave_engine::cache::SharedProject;
use inkweave_engine::{
    Block, FileContents, LanguageTable, LoadRequest, Processor, SaveRequest, delex, lex,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::SystemTime;

mod common;

/// Loading a file and saving its rendering untouched writes the same bytes back.
#[rstest]
#[case::python(
    "pkg/config.py",
    "import os\n\n# Reads *config* files.\n#\n# - one\n# - two\ndef f():\n    # Inner note.\n    return 1\n"
)]
#[case::rust(
    "src/add.rs",
    "// Adds two numbers.\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n"
)]
#[case::c_block_comment("lib/x.c", "/* A *block* doc. */\nint x;\n")]
#[case::sql("q.sql", "-- Selects **everything**.\nSELECT * FROM t;\n")]
#[case::markdown_document("guide.md", "# Guide {#guide}\n\nSome text with `code`.\n")]
fn unchanged_page_saves_byte_identical(#[case] path: &str, #[case] text: &str) {
    let shared = SharedProject::default();
    let processor = Processor::default();

    let page = common::page(processor.load(
        &shared,
        LoadRequest {
            path: path.into(),
            contents: Ok(FileContents {
                bytes: text.as_bytes().to_vec(),
                modified: SystemTime::UNIX_EPOCH,
            }),
            is_toc: false,
        },
    ));
    assert!(!page.dirty);

    let outcome = processor
        .save(
            &shared,
            SaveRequest {
                path: path.into(),
                blocks: page.blocks,
                is_toc: false,
            },
        )
        .unwrap();

    assert_eq!(outcome.persist_text, text);
    assert!(!outcome.dirty);
    assert!(outcome.reload.is_none());
}

#[test]
fn code_then_doc_scenario() {
    let table = LanguageTable::builtin();
    let python = table.by_name("python").unwrap();
    let text = "x = 1\n# hello\n";

    let blocks = lex(text, python);

    assert_eq!(
        blocks,
        vec![Block::code("x = 1"), Block::doc("", "#", " hello\n")]
    );
    assert_eq!(delex(&blocks, python), text);
}

#[rstest]
#[case("python", "#!/usr/bin/env python\n# Doc\n\nx = 1  # trailing\n    # indented\n#\n")]
#[case("rust", "//! crate\n/// item\n// doc\nfn f() {}\n")]
#[case("javascript", "  /* a\n     b */\nlet x;\n/* nested /* no */ */\n")]
#[case("lua", "-- doc\nlocal x = 1\n--[[ long ]]\n")]
fn lex_delex_is_lossless(#[case] language: &str, #[case] text: &str) {
    let table = LanguageTable::builtin();
    let profile = table.by_name(language).unwrap();

    let blocks = lex(text, profile);
    assert_eq!(delex(&blocks, profile), text);
    assert_eq!(lex(&delex(&blocks, profile), profile), blocks);
}
