//! Browser bookmark tree: the live side of every synchronization.
//!
//! Accepts the node arrays produced by `chrome.bookmarks.getTree()` as well as
//! the Chromium on-disk `Bookmarks` profile file, where nodes carry `name`
//! instead of `title` and the top level is a `roots` object.

use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

/// A bookmark as currently present in the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveBookmark {
    pub title: String,
    pub url: String,
}

/// Change notification emitted by the bookmark source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BookmarkEvent {
    Created { node: BookmarkNode },
    Changed { url: String, title: String },
    /// Removing a folder removes every bookmark below it.
    Removed { node: BookmarkNode },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TreeFile {
    // must stay first: a profile file would also parse as an empty node
    Profile { roots: BTreeMap<String, BookmarkNode> },
    Nodes(Vec<BookmarkNode>),
    Node(BookmarkNode),
}

pub fn parse_tree(json: &str) -> anyhow::Result<Vec<BookmarkNode>> {
    let file: TreeFile = serde_json::from_str(json).context("malformed bookmark tree")?;

    Ok(match file {
        TreeFile::Profile { roots } => roots.into_values().collect(),
        TreeFile::Nodes(nodes) => nodes,
        TreeFile::Node(node) => vec![node],
    })
}

pub fn load_tree(path: &Path) -> anyhow::Result<Vec<BookmarkNode>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("couldnt read bookmark tree {}", path.display()))?;
    parse_tree(&json)
}

/// Depth-first walk collecting every node that carries a url.
pub fn flatten(nodes: &[BookmarkNode]) -> Vec<LiveBookmark> {
    let mut out = vec![];
    let mut stack: Vec<&BookmarkNode> = nodes.iter().rev().collect();

    while let Some(node) = stack.pop() {
        if let Some(url) = &node.url {
            out.push(LiveBookmark {
                title: node.title.clone(),
                url: url.clone(),
            });
        }

        if let Some(children) = &node.children {
            stack.extend(children.iter().rev());
        }
    }

    out
}

/// Chrome and Chromium default profile locations.
pub fn default_tree_path() -> Option<std::path::PathBuf> {
    let home = homedir::my_home().ok().flatten()?;

    ["google-chrome", "chromium"]
        .into_iter()
        .map(|browser| home.join(".config").join(browser).join("Default/Bookmarks"))
        .find(|path| path.exists())
}
