//! # Network Build Pipeline
//!
//! Turns a finalized [`Tree`] into a [`Network`]: every node's build-time
//! hyperparameters are resolved through its scope chain, then the tree is
//! compiled into a dataflow graph of [`GraphOp`]s.
//!
//! ## Dataflow rules
//!
//! - `sequential` feeds each child's output into the next child;
//! - `container` feeds its own input to every child, and outputs the last child's output;
//! - `identity` and `hyperparameter` pass their input through;
//! - `input` starts a new flow and ignores anything upstream.
//!
//! ## Example
//!
//! ```ignore
//! use rustytree::config::BuildConfig;
//! use rustytree::network::Network;
//!
//! let network = Network::build(tree, &BuildConfig::default())?;
//! let units = network.find_hyperparameter("fc1", &["num_units"], None)?;
//! ```

pub mod requirements;

use crate::config::BuildConfig;
use crate::hyperparameters::{ResolveError, Scope};
use crate::transform::visit_with_scope;
use crate::tree::{Node, NodeKind, OptionValue, Options, Tree, TreeError};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Topo;
use requirements::{requirements, Fallback};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Hyperparameter error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Invalid value {value} for hyperparameter '{name}' of node '{node}': expected {expected}.")]
    InvalidHyperparameter {
        node: String,
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("Node '{0}' has no upstream input. Place it after an input node inside a sequential or container node.")]
    MissingInput(String),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Handle of a compiled operation in [`Network::graph`].
pub type OpHandle = NodeIndex;

/// Cache of scope lookups. Key: (node name, candidate names).
pub type Memo = HashMap<(String, Vec<String>), OptionValue>;

/// One compiled operation: a tree node with its hyperparameters resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOp {
    pub name: String,
    pub kind: NodeKind,
    pub hyperparameters: Options,
}

/// A compiled network. Immutable once built; build a new one from a new tree instead.
#[derive(Debug)]
pub struct Network {
    tree: Tree,
    config: BuildConfig,
    graph: DiGraph<GraphOp, ()>,
    handles: HashMap<String, OpHandle>,
    inputs: BTreeMap<String, OpHandle>,
    output: OpHandle,
    memo: RefCell<Memo>,
}

impl Network {
    /// Resolves and compiles `tree` in one deterministic pass over its nodes.
    #[instrument(skip_all, fields(root = tree.root().name(), nodes = tree.len()))]
    pub fn build(tree: Tree, config: &BuildConfig) -> NetworkResult<Network> {
        if config.strict_hyperparameters {
            tree.check_hyperparameter_names()?;
        }

        let mut memo = Memo::new();
        let mut resolved: HashMap<String, Options> = HashMap::new();
        visit_with_scope(tree.root(), |node, scope| {
            let options = Self::resolve_node(node, scope, config, &mut memo)?;
            resolved.insert(node.name().to_string(), options);
            Ok::<(), NetworkError>(())
        })?;

        let mut compiler = Compiler {
            graph: DiGraph::new(),
            handles: HashMap::new(),
            inputs: BTreeMap::new(),
            resolved,
        };
        let output = compiler.compile(tree.root(), None)?;

        info!(
            ops = compiler.graph.node_count(),
            edges = compiler.graph.edge_count(),
            inputs = compiler.inputs.len(),
            "network built"
        );

        Ok(Network {
            tree,
            config: config.clone(),
            graph: compiler.graph,
            handles: compiler.handles,
            inputs: compiler.inputs,
            output,
            memo: RefCell::new(memo),
        })
    }

    fn resolve_node(node: &Node, scope: &Scope<'_>, config: &BuildConfig, memo: &mut Memo) -> NetworkResult<Options> {
        let mut options = Options::new();
        for requirement in requirements(node.kind(), config) {
            let default = match &requirement.fallback {
                Fallback::Value(value) => Some(value.clone()),
                Fallback::Required | Fallback::Optional => None,
            };
            let (value, from_scope) = match scope.resolve_with_source(requirement.names, default, &config.defaults) {
                Ok(found) => found,
                Err(ResolveError::Unresolved { .. }) if requirement.fallback == Fallback::Optional => continue,
                Err(err) => return Err(err.into()),
            };

            if !requirement.check.accepts(&value) {
                return Err(NetworkError::InvalidHyperparameter {
                    node: node.name().to_string(),
                    name: requirement.key.to_string(),
                    expected: requirement.check.expected(),
                    value: value.to_string(),
                });
            }
            if from_scope {
                memo.insert(memo_key(node.name(), requirement.names), value.clone());
            }
            debug!(node = node.name(), hyperparameter = requirement.key, %value, "resolved");
            options.insert(requirement.key.to_string(), value);
        }
        Ok(options)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn graph(&self) -> &DiGraph<GraphOp, ()> {
        &self.graph
    }

    /// Input nodes by name.
    pub fn inputs(&self) -> &BTreeMap<String, OpHandle> {
        &self.inputs
    }

    /// Output of the root node.
    pub fn output(&self) -> OpHandle {
        self.output
    }

    pub fn handle(&self, name: &str) -> Option<OpHandle> {
        self.handles.get(name).copied()
    }

    pub fn op(&self, handle: OpHandle) -> Option<&GraphOp> {
        self.graph.node_weight(handle)
    }

    /// Hyperparameters resolved for the named node at build time.
    pub fn hyperparameters(&self, name: &str) -> Option<&Options> {
        self.handle(name).and_then(|h| self.op(h)).map(|op| &op.hyperparameters)
    }

    /// Operations in an order where every op comes after all of its inputs.
    pub fn execution_order(&self) -> Vec<&GraphOp> {
        let mut topo = Topo::new(&self.graph);
        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(index) = topo.next(&self.graph) {
            order.push(&self.graph[index]);
        }
        order
    }

    /// Resolves `names` for the named node against the finalized tree.
    ///
    /// Fallback order: scope chain, the config's default table, `default`.
    /// Scope hits are memoized for the lifetime of this network.
    pub fn find_hyperparameter(
        &self,
        node_name: &str,
        names: &[&str],
        default: Option<OptionValue>,
    ) -> NetworkResult<OptionValue> {
        let key = memo_key(node_name, names);
        if let Some(value) = self.memo.borrow().get(&key) {
            return Ok(value.clone());
        }

        let chain = self.tree.scope_of(node_name)?;
        let mut scope = Scope::new();
        for node in chain.into_iter().rev() {
            scope.push(node);
        }
        let (value, from_scope) = scope.resolve_with_source(names, default, &self.config.defaults)?;
        if from_scope {
            self.memo.borrow_mut().insert(key, value.clone());
        }
        Ok(value)
    }

    /// Returns the `n`-th axis that is not the batch axis, e.g. the feature axis for `n = 0`.
    ///
    /// Axes at or past the batch axis shift by one; this deliberately reverses the
    /// older `batch_axis >= n` comparison, which skipped the wrong axes.
    pub fn nth_non_batch_axis(&self, node_name: &str, n: usize) -> NetworkResult<usize> {
        let default = OptionValue::Int(self.config.batch_axis as i64);
        let value = self.find_hyperparameter(node_name, &["batch_axis"], Some(default))?;
        let batch_axis = value.as_usize().ok_or_else(|| NetworkError::InvalidHyperparameter {
            node: node_name.to_string(),
            name: "batch_axis".to_string(),
            expected: "a non-negative integer",
            value: value.to_string(),
        })?;
        Ok(if n >= batch_axis { n + 1 } else { n })
    }

    /// Number of memoized scope lookups.
    pub fn memoized_lookups(&self) -> usize {
        self.memo.borrow().len()
    }
}

fn memo_key(node_name: &str, names: &[&str]) -> (String, Vec<String>) {
    (
        node_name.to_string(),
        names.iter().map(|name| name.to_string()).collect(),
    )
}

struct Compiler {
    graph: DiGraph<GraphOp, ()>,
    handles: HashMap<String, OpHandle>,
    inputs: BTreeMap<String, OpHandle>,
    resolved: HashMap<String, Options>,
}

impl Compiler {
    /// Adds `node` and its subtree to the graph and returns the handle of its output.
    fn compile(&mut self, node: &Node, upstream: Option<OpHandle>) -> NetworkResult<OpHandle> {
        let hyperparameters = self.resolved.remove(node.name()).unwrap_or_default();
        let op = self.graph.add_node(GraphOp {
            name: node.name().to_string(),
            kind: node.kind(),
            hyperparameters,
        });
        self.handles.insert(node.name().to_string(), op);

        let feed = match node.kind() {
            NodeKind::Input => {
                self.inputs.insert(node.name().to_string(), op);
                None
            }
            NodeKind::Identity => upstream,
            NodeKind::Hyperparameter | NodeKind::Sequential => {
                let mut current = upstream;
                for child in node.children() {
                    current = Some(self.compile(child, current)?);
                }
                current
            }
            NodeKind::Container => {
                let mut last = upstream;
                for child in node.children() {
                    last = Some(self.compile(child, upstream)?);
                }
                last
            }
            NodeKind::Dense
            | NodeKind::Conv2d
            | NodeKind::MaxPool2d
            | NodeKind::ReLU
            | NodeKind::Softmax
            | NodeKind::Dropout
            | NodeKind::BatchNormalization => match upstream {
                Some(source) => Some(source),
                None => return Err(NetworkError::MissingInput(node.name().to_string())),
            },
        };

        if let Some(source) = feed {
            self.graph.add_edge(source, op, ());
        }
        Ok(op)
    }
}
