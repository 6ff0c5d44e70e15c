use std::collections::{HashMap, HashSet};

use crate::document::MindmapNode;

/// `parentId` value the generator uses to mark a root explicitly.
pub const ROOT_SENTINEL: &str = "root";

/// Parent reference of a node, or `None` for a root (absent, empty, or the sentinel).
pub fn parent_of(node: &MindmapNode) -> Option<&str> {
    match node.parent_id.as_deref() {
        None | Some("") | Some(ROOT_SENTINEL) => None,
        Some(parent_id) => Some(parent_id),
    }
}

/// `id -> children` index over a flat node list, built once per document.
///
/// Positions refer to the original slice, so sibling order is the input order.
#[derive(Debug, Clone, Default)]
pub struct MindmapIndex {
    roots: Vec<usize>,
    children: HashMap<String, Vec<usize>>,
    orphans: Vec<usize>,
}

/// Owned subtree, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub children: Vec<TreeNode>,
}

impl MindmapIndex {
    pub fn build(nodes: &[MindmapNode]) -> Self {
        let ids = nodes.iter().map(|n| n.id.as_str()).collect::<HashSet<_>>();
        let mut index = Self::default();
        for (pos, node) in nodes.iter().enumerate() {
            match parent_of(node) {
                None => index.roots.push(pos),
                Some(parent_id) => {
                    if !ids.contains(parent_id) {
                        index.orphans.push(pos);
                    }
                    index
                        .children
                        .entry(parent_id.to_owned())
                        .or_default()
                        .push(pos);
                }
            }
        }
        index
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, id: &str) -> &[usize] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Nodes whose parent id matches no node.
    pub fn orphans(&self) -> &[usize] {
        &self.orphans
    }

    /// Materializes every tree reachable from a root. Orphan subtrees are left out.
    pub fn forest(&self, nodes: &[MindmapNode]) -> Vec<TreeNode> {
        let mut visiting = HashSet::new();
        self.roots
            .iter()
            .filter_map(|pos| self.subtree(nodes, *pos, &mut visiting))
            .collect()
    }

    fn subtree(
        &self,
        nodes: &[MindmapNode],
        pos: usize,
        visiting: &mut HashSet<usize>,
    ) -> Option<TreeNode> {
        let node = nodes.get(pos)?;
        // Duplicate ids can make a node its own descendant.
        if !visiting.insert(pos) {
            return None;
        }
        let children = self
            .children(&node.id)
            .iter()
            .filter_map(|child| self.subtree(nodes, *child, visiting))
            .collect();
        visiting.remove(&pos);

        Some(TreeNode {
            id: node.id.clone(),
            label: node.label.clone(),
            description: node.description.clone(),
            children,
        })
    }
}

/// Open/closed state of rendered nodes. Roots start open, everything else closed.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    toggled: HashSet<String>,
}

impl Expansion {
    pub fn is_expanded(&self, id: &str, depth: usize) -> bool {
        (depth == 0) != self.toggled.contains(id)
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.toggled.remove(id) {
            self.toggled.insert(id.to_owned());
        }
    }
}

pub fn render_outline(forest: &[TreeNode]) -> String {
    let mut out = String::new();
    for root in forest {
        render_node(root, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str("- ");
    out.push_str(&node.label);
    if let Some(description) = node.description.as_deref()
        && !description.trim().is_empty()
    {
        out.push_str(": ");
        out.push_str(description.trim());
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
