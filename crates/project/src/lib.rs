//! Workspace tree browsing for Vanilla Studio.
//! 工作區樹狀瀏覽：限深列出、目錄優先排序與延遲展開。

pub mod tree;

pub use tree::{Activation, TreeError, TreeNode, TreeNodeId, TreeNodeKind, WorkspaceTree, DEFAULT_TREE_DEPTH};
