//! # RustyTree: tree-structured neural network architectures
//!
//! **RustyTree** describes a network as a tree of named nodes. Configuration is not
//! passed to every layer explicitly: each node declares local options, and a
//! node's hyperparameters are resolved by searching its scope chain (the node,
//! then its parent, up to the root). The tree can be rewritten structurally before
//! it is compiled into a dataflow graph.
//!
//! ## Usage Example
//!
//! ```no_run
//! use rustytree::config::BuildConfig;
//! use rustytree::network::Network;
//! use rustytree::transform::{add_hyperparameters, remove_node};
//! use rustytree::tree::{Node, OptionValue, Options, Tree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Describe the architecture
//! let tree = Tree::new(Node::sequential(
//!     "seq",
//!     vec![
//!         Node::input("x", vec![None, Some(784)]),
//!         Node::dense("fc1", 256),
//!         Node::relu("relu1"),
//!         Node::dropout("drop1"),
//!         Node::new(rustytree::tree::NodeKind::Dense, "fc2"),
//!     ],
//! ))?;
//!
//! // 2. Rewrite it: drop the dropout, provide a tree-wide default for num_units
//! let tree = remove_node(&tree, &["drop1"])?;
//! let defaults = Options::from([("num_units".to_string(), OptionValue::Int(10))]);
//! let tree = add_hyperparameters(&tree, "defaults", defaults)?;
//!
//! // 3. Resolve and compile
//! let network = Network::build(tree, &BuildConfig::default())?;
//! assert_eq!(network.find_hyperparameter("fc2", &["num_units"], None)?, OptionValue::Int(10));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod hyperparameters;
pub mod network;
pub mod serialization;
pub mod transform;
pub mod tree;
