//! Logging and debugging facilities for eez-outline.
//!
//! This module provides:
//! - Target names for filtering the `tracing` output of each subsystem
//! - A text renderer for any tree that implements [`DebugTree`]
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! eez-outline uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("eez_outline::adapter=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```
//! use eez_outline_core::logging::{DebugTree, TreeDebug, TreeFormatOptions, TreeStyle};
//!
//! // (label, children) by index; node 0 is the root
//! struct Outline(Vec<(&'static str, Vec<usize>)>);
//!
//! impl DebugTree for Outline {
//!     type Node = usize;
//!     fn roots(&self) -> Vec<usize> { vec![0] }
//!     fn label(&self, node: &usize) -> String { self.0[*node].0.to_string() }
//!     fn children(&self, node: &usize) -> Vec<usize> { self.0[*node].1.clone() }
//! }
//!
//! let outline = Outline(vec![("root", vec![1, 2]), ("a", vec![]), ("b", vec![])]);
//! let text = TreeDebug::with_options(TreeFormatOptions {
//!     style: TreeStyle::Ascii,
//!     ..Default::default()
//! })
//! .format(&outline);
//! assert_eq!(text, "root\n+-- a\n`-- b\n");
//! ```

use std::fmt::Write as FmtWrite;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "eez_outline_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "eez_outline_core::signal";
    /// Document model and store target.
    pub const DOCUMENT: &str = "eez_outline::document";
    /// Tree/selection adapter target.
    pub const ADAPTER: &str = "eez_outline::adapter";
    /// Flat row projection and list adapter target.
    pub const ROWS: &str = "eez_outline::rows";
    /// Clipboard target.
    pub const CLIPBOARD: &str = "eez_outline::clipboard";
    /// Drag and drop target.
    pub const DRAG: &str = "eez_outline::drag";
    /// Home tab manager target.
    pub const TABS: &str = "eez_outline::tabs";
    /// Performance spans target.
    pub const PERF: &str = "eez_outline::perf";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            max_depth: None,
            indent_size: 2,
        }
    }
}

/// A tree that can be rendered by [`TreeDebug`].
///
/// Nodes are handed out by value so that trees whose children are computed
/// on demand can be rendered without storing them.
pub trait DebugTree {
    /// Node handle type.
    type Node;

    /// Top-level nodes, rendered without a connector.
    fn roots(&self) -> Vec<Self::Node>;

    /// One-line label of a node.
    fn label(&self, node: &Self::Node) -> String;

    /// Children of a node in display order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
}

/// Debug utility for visualizing trees as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree.
    pub fn format<T: DebugTree>(&self, tree: &T) -> String {
        let mut output = String::new();
        let mut open = Vec::new();
        for root in tree.roots() {
            self.format_subtree_into(tree, &root, 0, true, &mut open, &mut output);
        }
        output
    }

    /// `open` has one entry per ancestor between the root and `node`, true
    /// while that ancestor still has siblings below it.
    fn format_subtree_into<T: DebugTree>(
        &self,
        tree: &T,
        node: &T::Node,
        depth: usize,
        is_last: bool,
        open: &mut Vec<bool>,
        output: &mut String,
    ) {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return;
            }
        }

        output.push_str(&self.build_prefix(open, depth, is_last));
        let _ = writeln!(output, "{}", tree.label(node));

        let children = tree.children(node);
        let child_count = children.len();
        if depth > 0 {
            open.push(!is_last);
        }
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(tree, &child, depth + 1, i + 1 == child_count, open, output);
        }
        if depth > 0 {
            open.pop();
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, open: &[bool], depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, blank, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", " ", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", " ", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "", "- ", "- "),
        };

        let mut prefix = String::new();

        for &more in open {
            prefix.push_str(if more { branch } else { blank });
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }

        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of derived recomputations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "eez_outline::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with a consistent
/// target.
#[macro_export]
macro_rules! outline_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "eez_outline_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! outline_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "eez_outline_core", $($arg)*)
    };
}
