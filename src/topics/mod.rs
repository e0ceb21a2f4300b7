//! Topic hierarchy builder
//!
//! Turns a plain-text article with `== Heading ==` markers into a tree of
//! sections. The root holds the lead text; every heading of level `n`
//! becomes a child of the nearest open section with a lower level.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

pub mod naming;

pub use naming::{function_name, prefixed_function_name, NameAllocator, MAX_FUNCTION_NAME_LEN};

static HEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(={2,})\s*(.*?)\s*(={2,})$").expect("static regex"));

/// Sections that carry links rather than content
const BOILERPLATE_SECTIONS: [&str; 5] = [
    "see also",
    "references",
    "further reading",
    "external links",
    "notes",
];

/// One section of an article
#[derive(Debug, Clone, PartialEq)]
pub struct TopicNode {
    pub title: String,
    /// Name the section is offered under as a function; unique among siblings
    pub function_name: String,
    /// Heading level: 1 for the root, `n` for a heading with `n` `=` signs
    pub level: usize,
    /// Text between this heading and the next one
    pub text: String,
    pub children: Vec<TopicNode>,
}

impl TopicNode {
    fn open(title: impl Into<String>, level: usize) -> Self {
        let title = title.into();
        Self {
            function_name: function_name(&title),
            title,
            level,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child offered under `function_name`
    pub fn find_child(&self, function_name: &str) -> Option<&TopicNode> {
        self.children
            .iter()
            .find(|child| child.function_name == function_name)
    }

    /// Function names of the direct children, in document order
    pub fn child_function_names(&self) -> Vec<String> {
        self.children
            .iter()
            .map(|child| child.function_name.clone())
            .collect()
    }

    /// Own text followed by every descendant's heading and text
    pub fn full_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            let child_text = child.full_text();
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&child.title);
            if !child_text.is_empty() {
                out.push('\n');
                out.push_str(&child_text);
            }
        }
        out
    }

    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TopicNode::node_count).sum::<usize>()
    }

    /// Longest root-to-leaf path, counted in nodes
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TopicNode::depth)
            .max()
            .unwrap_or(0)
    }

    fn append_line(&mut self, line: &str) {
        if !self.text.is_empty() || !line.trim().is_empty() {
            self.text.push_str(line);
            self.text.push('\n');
        }
    }

    /// Trim text and make child function names unique, recursively
    fn finish(&mut self) {
        self.text = self.text.trim().to_string();
        let mut names = NameAllocator::new();
        for child in &mut self.children {
            child.function_name = names.allocate(&child.title);
            child.finish();
        }
    }
}

/// Heading level and title of a heading line, if it is one
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let captures = HEADING_PATTERN.captures(line.trim())?;
    let open = captures.get(1)?.as_str().len();
    let close = captures.get(3)?.as_str().len();
    let title = captures.get(2)?.as_str();

    if open != close || title.is_empty() || title.chars().all(|c| c == '=') {
        return None;
    }
    Some((open, title))
}

fn is_boilerplate(title: &str) -> bool {
    let lowered = title.trim().to_lowercase();
    BOILERPLATE_SECTIONS.contains(&lowered.as_str())
}

/// Builds topic trees from plain text
#[derive(Debug, Clone, Copy)]
pub struct TopicTreeBuilder {
    skip_boilerplate: bool,
}

impl Default for TopicTreeBuilder {
    fn default() -> Self {
        Self {
            skip_boilerplate: true,
        }
    }
}

impl TopicTreeBuilder {
    pub fn new(skip_boilerplate: bool) -> Self {
        Self { skip_boilerplate }
    }

    /// Build the tree for one document in a single pass
    pub fn build(&self, title: &str, text: &str) -> TopicTree {
        let mut stack = vec![TopicNode::open(title, 1)];

        for line in text.lines() {
            match parse_heading(line) {
                Some((level, heading)) => {
                    self.close_until(&mut stack, level);
                    stack.push(TopicNode::open(heading, level));
                }
                None => {
                    if let Some(current) = stack.last_mut() {
                        current.append_line(line);
                    }
                }
            }
        }

        self.close_until(&mut stack, 1);
        let mut root = stack
            .pop()
            .unwrap_or_else(|| TopicNode::open(title, 1));
        root.finish();
        TopicTree { root }
    }

    /// Close every open section whose level is at least `level`
    fn close_until(&self, stack: &mut Vec<TopicNode>, level: usize) {
        while stack.len() > 1 && stack.last().map_or(false, |n| n.level >= level) {
            let Some(node) = stack.pop() else { break };
            if self.skip_boilerplate && is_boilerplate(&node.title) {
                continue;
            }
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }
}

/// Section tree of one document
#[derive(Debug, Clone, PartialEq)]
pub struct TopicTree {
    root: TopicNode,
}

impl TopicTree {
    /// Build with the default builder (boilerplate sections dropped)
    pub fn build(title: &str, text: &str) -> Self {
        TopicTreeBuilder::default().build(title, text)
    }

    pub fn root(&self) -> &TopicNode {
        &self.root
    }

    pub fn title(&self) -> &str {
        &self.root.title
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Node reached by following function names from the root
    pub fn resolve_path(&self, path: &[String]) -> Option<&TopicNode> {
        path.iter()
            .try_fold(&self.root, |node, name| node.find_child(name))
    }

    /// Indented outline, one section per line
    pub fn outline(&self) -> String {
        let mut out = String::new();
        Self::write_outline(&mut out, &self.root, 0);
        out
    }

    fn write_outline(out: &mut String, node: &TopicNode, indent: usize) {
        let _ = writeln!(
            out,
            "{}{} [{}] ({} words)",
            "  ".repeat(indent),
            node.title,
            node.function_name,
            node.text.split_whitespace().count()
        );
        for child in &node.children {
            Self::write_outline(out, child, indent + 1);
        }
    }
}
