use super::HeadingNode;

/// An anchor found while scanning a file, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineItem {
    Heading { id: String, level: u8, title: String },
    Anchor { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outline {
    pub headings: Vec<HeadingNode>,
    pub preamble_anchors: Vec<String>,
}

/// Nests headings by level and numbers the outermost `depth` levels of the tree.
///
/// A heading nests under the closest earlier heading with a lower level, so skipped
/// levels (`h1` then `h3`) still produce a single step in the tree. Non-heading
/// anchors attach to the heading above them.
pub fn build_outline(items: &[OutlineItem], depth: usize) -> Outline {
    let mut outline = Outline::default();
    // Levels of the chain of most recent headings, root first.
    let mut chain: Vec<u8> = Vec::new();

    for item in items {
        match item {
            OutlineItem::Heading { id, level, title } => {
                while chain.last().is_some_and(|open| open >= level) {
                    chain.pop();
                }
                let node = HeadingNode {
                    id: id.clone(),
                    level: *level,
                    title: title.clone(),
                    number: None,
                    contained_anchors: Vec::new(),
                    children: Vec::new(),
                };
                insert_at(&mut outline.headings, chain.len(), node);
                chain.push(*level);
            }
            OutlineItem::Anchor { id } => {
                match chain
                    .len()
                    .checked_sub(1)
                    .and_then(|d| last_at(&mut outline.headings, d))
                {
                    Some(heading) => heading.contained_anchors.push(id.clone()),
                    None => outline.preamble_anchors.push(id.clone()),
                }
            }
        }
    }

    assign_numbers(&mut outline.headings, "", 1, depth);
    outline
}

fn insert_at(nodes: &mut Vec<HeadingNode>, depth: usize, node: HeadingNode) {
    if depth == 0 {
        nodes.push(node);
        return;
    }
    match nodes.last_mut() {
        Some(last) => insert_at(&mut last.children, depth - 1, node),
        None => nodes.push(node),
    }
}

fn last_at(nodes: &mut [HeadingNode], depth: usize) -> Option<&mut HeadingNode> {
    let last = nodes.last_mut()?;
    if depth == 0 {
        Some(last)
    } else {
        last_at(&mut last.children, depth - 1)
    }
}

fn assign_numbers(nodes: &mut [HeadingNode], prefix: &str, tree_depth: usize, max_depth: usize) {
    for (i, node) in nodes.iter_mut().enumerate() {
        let number = if prefix.is_empty() {
            (i + 1).to_string()
        } else {
            format!("{prefix}.{}", i + 1)
        };
        node.number = (tree_depth <= max_depth).then(|| number.clone());
        assign_numbers(&mut node.children, &number, tree_depth + 1, max_depth);
    }
}
