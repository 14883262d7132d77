//! # Tree Transformation Module
//!
//! Rewrites of the architecture tree, applied before the network is built.
//!
//! ## Layers
//!
//! - [`walk`]: generic traversal primitives. [`postwalk_node`] rebuilds a tree
//!   bottom-up from a per-node rewrite function, [`transform_root_node`] rewrites the
//!   root as a whole.
//! - [`library`]: named rewrites built on the primitives, addressing nodes by name.
//!
//! ```text
//! Tree -> remove_node / add_parent / ... -> Tree -> Network::build
//! ```
//!
//! Every rewrite takes the tree by reference and returns a new, re-validated tree.
//! A failing rewrite returns an error and no partial tree.
//!
//! ## Example
//!
//! ```ignore
//! use rustytree::transform::{add_hyperparameters, remove_node};
//!
//! let tree = remove_node(&tree, &["dropout1", "dropout2"])?;
//! let tree = add_hyperparameters(&tree, "defaults", options)?;
//! ```

pub mod library;
pub mod walk;

pub use library::{
    add_hyperparameters, add_parent, remove_node, remove_nodes_with_kind, remove_parent, remove_parents,
    remove_subtree,
};
pub use walk::{postwalk_node, transform_root_node, transform_root_node_postwalk, visit_with_scope};
