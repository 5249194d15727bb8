use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// 預設列出的目錄層數。 / Default number of directory levels listed below the root.
pub const DEFAULT_TREE_DEPTH: usize = 3;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// 樹中每個節點的唯一識別碼。 / Unique identifier assigned to each node in the workspace tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeNodeId(u64);

impl TreeNodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TreeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// 節點類型。 / The kind of a tree node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNodeKind {
    Directory {
        /// Whether the children were read from disk.
        loaded: bool,
        expanded: bool,
    },
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeNode {
    pub id: TreeNodeId,
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: TreeNodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, TreeNodeKind::Directory { .. })
    }

    /// 目錄名稱後加上 `/`。 / Display label; directories carry a trailing `/`.
    pub fn label(&self) -> String {
        if self.is_dir() {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// 啟用節點後的結果。 / What activating a node did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Expanded,
    Collapsed,
    OpenFile(PathBuf),
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("node {0} not found")]
    NodeNotFound(TreeNodeId),
}

/// 工作區根目錄的樹狀檢視。 / Depth-bounded view of a workspace root, expanded lazily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceTree {
    pub root: PathBuf,
    pub depth: usize,
    pub nodes: Vec<TreeNode>,
}

impl WorkspaceTree {
    /// 掃描根目錄；無法讀取的子目錄會被略過。 / Scans `root`, skipping unreadable directories.
    pub fn scan(root: impl AsRef<Path>, depth: usize) -> Result<Self, TreeError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(TreeError::NotADirectory(root.to_path_buf()));
        }
        let nodes = list_dir(root, depth);
        tracing::debug!(root = %root.display(), depth, entries = nodes.len(), "workspace scanned");
        Ok(Self {
            root: root.to_path_buf(),
            depth,
            nodes,
        })
    }

    /// 工作區名稱（根目錄名）。 / Workspace name, i.e. the root directory's name.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn find(&self, id: TreeNodeId) -> Option<&TreeNode> {
        find_in(&self.nodes, &|node: &TreeNode| node.id == id)
    }

    pub fn find_path(&self, path: &Path) -> Option<&TreeNode> {
        find_in(&self.nodes, &|node: &TreeNode| node.path == path)
    }

    /// 目錄：首次展開時載入並切換展開狀態；檔案：要求開啟。 / Toggles a directory (loading it on first use) or asks to open a file.
    pub fn activate(&mut self, id: TreeNodeId) -> Result<Activation, TreeError> {
        let depth = self.depth;
        let node = find_in_mut(&mut self.nodes, id).ok_or(TreeError::NodeNotFound(id))?;
        match &mut node.kind {
            TreeNodeKind::File => Ok(Activation::OpenFile(node.path.clone())),
            TreeNodeKind::Directory { loaded, expanded } => {
                if !*loaded {
                    node.children = list_dir(&node.path, depth);
                    *loaded = true;
                    *expanded = true;
                    return Ok(Activation::Expanded);
                }
                *expanded = !*expanded;
                Ok(if *expanded {
                    Activation::Expanded
                } else {
                    Activation::Collapsed
                })
            }
        }
    }

    /// 以縮排文字輸出已載入的節點。 / Renders every loaded node as indented text.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        render_into(&self.nodes, 0, &mut lines);
        lines
    }
}

fn render_into(nodes: &[TreeNode], level: usize, lines: &mut Vec<String>) {
    for node in nodes {
        lines.push(format!("{}{}", "  ".repeat(level), node.label()));
        render_into(&node.children, level + 1, lines);
    }
}

fn find_in<'a>(nodes: &'a [TreeNode], matches: &dyn Fn(&TreeNode) -> bool) -> Option<&'a TreeNode> {
    for node in nodes {
        if matches(node) {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, matches) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(nodes: &mut [TreeNode], id: TreeNodeId) -> Option<&mut TreeNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// 目錄優先，名稱不分大小寫排序。 / Directories first, then case-insensitive by name.
fn compare_entries(a: &DirEntry, b: &DirEntry) -> CmpOrdering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir.cmp(&a_dir).then_with(|| {
        let a_name = a.file_name().to_string_lossy().to_lowercase();
        let b_name = b.file_name().to_string_lossy().to_lowercase();
        a_name.cmp(&b_name)
    })
}

/// Lists `dir` down to `depth` levels below its direct entries.
fn list_dir(dir: &Path, depth: usize) -> Vec<TreeNode> {
    let max_depth = depth + 1;
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by(compare_entries)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                None
            }
        });
    build_level(&mut walker.peekable(), 1, max_depth)
}

fn build_level<I>(entries: &mut Peekable<I>, level: usize, max_depth: usize) -> Vec<TreeNode>
where
    I: Iterator<Item = DirEntry>,
{
    let mut nodes = Vec::new();
    while let Some(entry) = entries.next_if(|entry| entry.depth() == level) {
        let is_dir = entry.file_type().is_dir();
        let children = if is_dir {
            build_level(entries, level + 1, max_depth)
        } else {
            Vec::new()
        };
        let kind = if is_dir {
            TreeNodeKind::Directory {
                loaded: level < max_depth,
                expanded: false,
            }
        } else {
            TreeNodeKind::File
        };
        nodes.push(TreeNode {
            id: TreeNodeId::next(),
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.into_path(),
            kind,
            children,
        });
    }
    nodes
}
