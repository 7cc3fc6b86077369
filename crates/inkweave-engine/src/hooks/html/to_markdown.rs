//! HTML to Markdown, for the reverse direction of the Markdown hook.
//!
//! Covers the markup pulldown-cmark produces with tables, strikethrough and heading
//! attributes enabled. Anything else (unknown tags, extra attributes) is kept as raw
//! HTML, which Markdown passes through unchanged.

use kuchikiki::NodeRef;

use super::{HtmlFragment, attr, heading_level, tag_name};

pub fn html_to_markdown(html: &str) -> String {
    let fragment = HtmlFragment::parse(0, html);
    let mut out = render_blocks(fragment.body(), false).join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

fn is_block(node: &NodeRef) -> bool {
    node.as_comment().is_some()
        || tag_name(node).is_some_and(|tag| BLOCK_TAGS.contains(&tag.as_str()))
}

/// Renders the children of `parent` as a list of Markdown blocks. Runs of inline
/// content between block elements become paragraphs.
fn render_blocks(parent: &NodeRef, in_list_item: bool) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut inline = String::new();

    for child in parent.children() {
        if is_block(&child) {
            flush_paragraph(&mut inline, &mut blocks, in_list_item);
            let block = render_block(&child);
            if !block.is_empty() {
                blocks.push(block);
            }
        } else {
            inline.push_str(&render_inline(&child));
        }
    }
    flush_paragraph(&mut inline, &mut blocks, in_list_item);
    blocks
}

fn flush_paragraph(inline: &mut String, blocks: &mut Vec<String>, in_list_item: bool) {
    let text = inline.trim();
    if !text.is_empty() {
        blocks.push(escape_line_starts(text, in_list_item));
    }
    inline.clear();
}

fn render_block(node: &NodeRef) -> String {
    if node.as_comment().is_some() {
        return node.to_string();
    }
    let Some(tag) = tag_name(node) else {
        return String::new();
    };

    let rendered = match tag.as_str() {
        "p" if only_attrs(node, &[]) => Some(escape_line_starts(inline_children(node).trim(), false)),
        "pre" => code_block(node),
        "blockquote" if only_attrs(node, &[]) => Some(blockquote(node)),
        "ul" if only_attrs(node, &[]) => list(node, false),
        "ol" if only_attrs(node, &["start"]) => list(node, true),
        "hr" if only_attrs(node, &[]) => Some("---".to_string()),
        "table" if only_attrs(node, &[]) => table(node),
        _ => heading_level(&tag).and_then(|level| heading(node, level)),
    };
    rendered.unwrap_or_else(|| node.to_string())
}

fn heading(node: &NodeRef, level: u8) -> Option<String> {
    if !only_attrs(node, &["id"]) {
        return None;
    }
    let mut out = format!(
        "{} {}",
        "#".repeat(usize::from(level)),
        inline_children(node).trim()
    );
    if let Some(id) = attr(node, "id") {
        out.push_str(&format!(" {{#{id}}}"));
    }
    Some(out)
}

fn code_block(pre: &NodeRef) -> Option<String> {
    if !only_attrs(pre, &[]) {
        return None;
    }
    let mut elements = pre.children().filter(|c| c.as_element().is_some());
    let code = elements.next()?;
    if elements.next().is_some() || tag_name(&code).as_deref() != Some("code") {
        return None;
    }
    if !only_attrs(&code, &["class"]) {
        return None;
    }
    let language = match attr(&code, "class") {
        Some(class) => class.strip_prefix("language-")?.to_string(),
        None => String::new(),
    };

    let mut body = code.text_contents();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    let fence = "`".repeat(longest_run(&body, '`').max(2) + 1);
    Some(format!("{fence}{language}\n{body}{fence}"))
}

fn blockquote(node: &NodeRef) -> String {
    render_blocks(node, false)
        .join("\n\n")
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list(node: &NodeRef, ordered: bool) -> Option<String> {
    let start = match attr(node, "start") {
        Some(start) => start.parse::<usize>().ok()?,
        None => 1,
    };
    let items: Vec<NodeRef> = node
        .children()
        .filter(|c| tag_name(c).as_deref() == Some("li"))
        .collect();
    if items.iter().any(|li| !only_attrs(li, &[])) {
        return None;
    }
    let loose = items
        .iter()
        .any(|li| li.children().any(|c| tag_name(&c).as_deref() == Some("p")));
    let separator = if loose { "\n\n" } else { "\n" };

    let rendered: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, li)| {
            let marker = if ordered {
                format!("{}. ", start + i)
            } else {
                "- ".to_string()
            };
            let content = render_blocks(li, true).join(separator);
            indent_item(&marker, &content)
        })
        .collect();
    Some(rendered.join(separator))
}

fn indent_item(marker: &str, content: &str) -> String {
    if content.is_empty() {
        return marker.trim_end().to_string();
    }
    let pad = " ".repeat(marker.len());
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{marker}{line}")
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn table(node: &NodeRef) -> Option<String> {
    let mut header: Option<Vec<(String, &'static str)>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for section in node.children().filter(|c| c.as_element().is_some()) {
        let section_tag = tag_name(&section)?;
        if !matches!(section_tag.as_str(), "thead" | "tbody") || !only_attrs(&section, &[]) {
            return None;
        }
        for row in section.children().filter(|c| c.as_element().is_some()) {
            if tag_name(&row).as_deref() != Some("tr") || !only_attrs(&row, &[]) {
                return None;
            }
            let cells: Vec<NodeRef> = row
                .children()
                .filter(|c| c.as_element().is_some())
                .collect();
            if section_tag == "thead" {
                let mut columns = Vec::new();
                for cell in &cells {
                    columns.push((table_cell(cell)?, alignment_rule(cell)?));
                }
                header = Some(columns);
            } else {
                rows.push(cells.iter().map(table_cell).collect::<Option<Vec<_>>>()?);
            }
        }
    }

    let header = header?;
    let mut lines = vec![
        table_row(header.iter().map(|(cell, _)| cell.as_str())),
        table_row(header.iter().map(|(_, rule)| *rule)),
    ];
    for row in &rows {
        lines.push(table_row(row.iter().map(String::as_str)));
    }
    Some(lines.join("\n"))
}

fn table_cell(cell: &NodeRef) -> Option<String> {
    if !matches!(tag_name(cell).as_deref(), Some("th" | "td")) || !only_attrs(cell, &["style"]) {
        return None;
    }
    Some(
        inline_children(cell)
            .trim()
            .replace('|', "\\|")
            .replace('\n', " "),
    )
}

fn alignment_rule(cell: &NodeRef) -> Option<&'static str> {
    match attr(cell, "style").as_deref() {
        None => Some("---"),
        Some("text-align: left") => Some(":---"),
        Some("text-align: center") => Some(":---:"),
        Some("text-align: right") => Some("---:"),
        Some(_) => None,
    }
}

fn table_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let cells: Vec<&str> = cells.collect();
    format!("| {} |", cells.join(" | "))
}

fn inline_children(node: &NodeRef) -> String {
    node.children().map(|child| render_inline(&child)).collect()
}

fn render_inline(node: &NodeRef) -> String {
    if let Some(text) = node.as_text() {
        let text = text.borrow();
        // A hard break is serialized as `<br />` plus a newline; the newline belongs
        // to the break.
        let after_break = node
            .previous_sibling()
            .is_some_and(|prev| tag_name(&prev).as_deref() == Some("br"));
        let text = match text.strip_prefix('\n') {
            Some(rest) if after_break => rest,
            _ => text.as_str(),
        };
        return escape_text(text);
    }
    let Some(tag) = tag_name(node) else {
        // Comments and processing instructions pass through as raw HTML.
        return node.to_string();
    };

    let rendered = match tag.as_str() {
        "em" if only_attrs(node, &[]) => Some(format!("*{}*", inline_children(node))),
        "strong" if only_attrs(node, &[]) => Some(format!("**{}**", inline_children(node))),
        "del" if only_attrs(node, &[]) => Some(format!("~~{}~~", inline_children(node))),
        "code" if only_attrs(node, &[]) => Some(code_span(&node.text_contents())),
        "br" if only_attrs(node, &[]) => Some("\\\n".to_string()),
        "a" if only_attrs(node, &["href", "title"]) => attr(node, "href").map(|href| {
            format!(
                "[{}]({}{})",
                inline_children(node),
                destination(&href),
                link_title(node)
            )
        }),
        "img" if only_attrs(node, &["src", "alt", "title"]) => attr(node, "src").map(|src| {
            format!(
                "![{}]({}{})",
                escape_text(&attr(node, "alt").unwrap_or_default()),
                destination(&src),
                link_title(node)
            )
        }),
        _ => None,
    };
    rendered.unwrap_or_else(|| node.to_string())
}

fn only_attrs(node: &NodeRef, allowed: &[&str]) -> bool {
    node.as_element().is_some_and(|element| {
        element
            .attributes
            .borrow()
            .map
            .keys()
            .all(|name| allowed.contains(&name.local.as_ref()))
    })
}

fn destination(url: &str) -> String {
    if url.is_empty() || url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

fn link_title(node: &NodeRef) -> String {
    match attr(node, "title") {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn code_span(code: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`') + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Escapes characters that Markdown would otherwise read as syntax. `_` is only
/// special at word boundaries, so intra-word underscores stay readable.
fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\\' | '`' | '*' | '[' | ']' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '_' => {
                let alnum = |c: Option<&char>| c.is_some_and(|c| c.is_alphanumeric());
                let inner = i > 0 && alnum(chars.get(i - 1)) && alnum(chars.get(i + 1));
                if !inner {
                    out.push('\\');
                }
                out.push('_');
            }
            _ => out.push(c),
        }
    }
    html_escape::encode_text(&out).into_owned()
}

/// Escapes text at the start of a line that would begin a heading, quote, list or
/// thematic break.
fn escape_line_starts(text: &str, in_list_item: bool) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            // The first line of a list item follows its marker, where a `#` is safe.
            if i == 0 && in_list_item {
                return line.to_string();
            }
            escape_line_start(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str) -> String {
    let trimmed = line.trim_start();
    let lead = &line[..line.len() - trimmed.len()];
    let mut chars = trimmed.chars();
    let first = chars.next();
    let second = chars.next();
    let spaced = matches!(second, None | Some(' '));

    match first {
        Some('#') | Some('>') | Some('=') => format!("{lead}\\{trimmed}"),
        Some('-') | Some('+') if spaced => format!("{lead}\\{trimmed}"),
        Some('-') if trimmed.chars().all(|c| c == '-') => format!("{lead}\\{trimmed}"),
        Some(c) if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
            let rest = &trimmed[digits..];
            let after = rest.chars().nth(1);
            if digits <= 9
                && (rest.starts_with('.') || rest.starts_with(')'))
                && matches!(after, None | Some(' '))
            {
                format!("{lead}{}\\{rest}", &trimmed[..digits])
            } else {
                line.to_string()
            }
        }
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::markdown::markdown_to_html;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::paragraph("Hello *world* and **bold**\n")]
    #[case::heading_with_id("## Setup {#setup}\n\nSome text.\n")]
    #[case::link("See [the guide](docs/guide.md#intro \"Guide\").\n")]
    #[case::image("![A chart](img/chart.png)\n")]
    #[case::code_span("Call `foo()` now\n")]
    #[case::fenced("```python\nx = 1\n```\n")]
    #[case::tight_list("- one\n- two\n  - nested\n")]
    #[case::ordered_list("3. three\n4. four\n")]
    #[case::loose_list("- one\n\n- two\n")]
    #[case::quote("> quoted\n>\n> more\n")]
    #[case::table("| a | b |\n| :--- | ---: |\n| 1 | 2 |\n")]
    #[case::rule("before\n\n---\n\nafter\n")]
    #[case::strike("~~gone~~\n")]
    #[case::escapes("1\\. not a list and \\*stars\\* and snake_case\n")]
    #[case::raw_inline("Go to <a class=\"autotitle\" href=\"b.md#x\">Old</a>.\n")]
    #[case::hard_break("line one\\\nline two\n")]
    fn markdown_survives_html_round_trip(#[case] markdown: &str) {
        let html = markdown_to_html(markdown);
        assert_eq!(html_to_markdown(&html), markdown);
    }

    #[test]
    fn unknown_block_is_kept_as_html() {
        assert_eq!(
            html_to_markdown("<div class=\"note\"><p>x</p></div>"),
            "<div class=\"note\"><p>x</p></div>\n"
        );
    }

    #[test]
    fn heading_with_extra_attributes_is_raw() {
        assert_eq!(
            html_to_markdown("<h2 class=\"b\" id=\"a\">T</h2>"),
            "<h2 class=\"b\" id=\"a\">T</h2>\n"
        );
    }

    #[test]
    fn html_special_characters_are_reencoded() {
        assert_eq!(html_to_markdown("<p>a &lt;b&gt; &amp; c</p>"), "a &lt;b&gt; &amp; c\n");
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(html_to_markdown(""), "");
        assert_eq!(html_to_markdown("\n"), "");
    }
}
