//! Дерево архитектуры: корневая структура именованных узлов.
//!
//! `Tree` гарантирует два инварианта, проверяемых при каждом построении:
//! - имена узлов уникальны в пределах дерева;
//! - число детей каждого узла соответствует его виду (`Arity`).
//!
//! Трансформации никогда не меняют дерево на месте: они возвращают новое `Tree`,
//! поэтому вызывающий код может сохранить ссылку на дерево "до" трансформации.

pub mod node;
pub mod value;

pub use node::{Arity, Node, NodeKind};
pub use value::{OptionValue, Options};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub type TreeResult<T> = std::result::Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node name '{0}' appears more than once in the tree. Node names must be unique.")]
    DuplicateName(String),

    #[error("Cannot splice out node '{name}': it has {children} children, so it is ambiguous which one should take its place.")]
    AmbiguousReplacement { name: String, children: usize },

    #[error("Node(s) not found in the tree: {0:?}")]
    NotFound(Vec<String>),

    #[error("Node '{name}' of kind '{kind}' expects {expected}, got {actual}.")]
    ArityMismatch {
        name: String,
        kind: NodeKind,
        expected: Arity,
        actual: usize,
    },

    #[error("Node '{node}' of kind '{kind}' does not accept hyperparameter '{option}'.")]
    UnknownHyperparameter {
        node: String,
        kind: NodeKind,
        option: String,
    },
}

/// Проверенное дерево архитектуры.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Строит дерево, проверяя уникальность имен и арность узлов.
    pub fn new(root: Node) -> TreeResult<Self> {
        let mut seen = HashSet::new();
        Self::validate(&root, &mut seen)?;
        Ok(Self { root })
    }

    fn validate<'a>(node: &'a Node, seen: &mut HashSet<&'a str>) -> TreeResult<()> {
        if !seen.insert(node.name()) {
            return Err(TreeError::DuplicateName(node.name().to_string()));
        }
        let arity = node.kind().arity();
        if !arity.accepts(node.children().len()) {
            return Err(TreeError::ArityMismatch {
                name: node.name().to_string(),
                kind: node.kind(),
                expected: arity,
                actual: node.children().len(),
            });
        }
        node.children()
            .iter()
            .try_for_each(|child| Self::validate(child, seen))
    }

    /// Checks that every locally declared option is one the node's kind accepts.
    pub fn check_hyperparameter_names(&self) -> TreeResult<()> {
        fn check(node: &Node) -> TreeResult<()> {
            if let Some(option) = node
                .options()
                .keys()
                .find(|option| !node.kind().accepts_hyperparameter(option))
            {
                return Err(TreeError::UnknownHyperparameter {
                    node: node.name().to_string(),
                    kind: node.kind(),
                    option: option.clone(),
                });
            }
            node.children().iter().try_for_each(check)
        }
        check(&self.root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Ищет узел по имени (обход в глубину).
    pub fn find(&self, name: &str) -> Option<&Node> {
        fn find_in<'a>(node: &'a Node, name: &str) -> Option<&'a Node> {
            if node.name() == name {
                return Some(node);
            }
            node.children().iter().find_map(|child| find_in(child, name))
        }
        find_in(&self.root, name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Имена всех узлов в прямом порядке обхода.
    pub fn names(&self) -> Vec<&str> {
        fn collect<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
            out.push(node.name());
            for child in node.children() {
                collect(child, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        collect(&self.root, &mut out);
        out
    }

    /// Количество узлов в дереве.
    pub fn len(&self) -> usize {
        self.root.subtree_len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn depth(&self) -> usize {
        self.root.subtree_depth()
    }

    /// Цепочка области видимости узла: сам узел, затем родитель, ..., корень.
    pub fn scope_of(&self, name: &str) -> TreeResult<Vec<&Node>> {
        fn path_to<'a>(node: &'a Node, name: &str, path: &mut Vec<&'a Node>) -> bool {
            path.push(node);
            if node.name() == name
                || node.children().iter().any(|child| path_to(child, name, path))
            {
                return true;
            }
            path.pop();
            false
        }

        let mut path = Vec::new();
        if !path_to(&self.root, name, &mut path) {
            return Err(TreeError::NotFound(vec![name.to_string()]));
        }
        path.reverse();
        Ok(path)
    }

    /// Предки узла от ближайшего (родителя) к самому внешнему (корню).
    pub fn ancestors_of(&self, name: &str) -> TreeResult<Vec<&Node>> {
        let mut scope = self.scope_of(name)?;
        scope.remove(0);
        Ok(scope)
    }
}

impl TryFrom<Node> for Tree {
    type Error = TreeError;

    fn try_from(root: Node) -> TreeResult<Self> {
        Tree::new(root)
    }
}

impl From<Tree> for Node {
    fn from(tree: Tree) -> Self {
        tree.root
    }
}

impl fmt::Display for Tree {
    /// Печатает дерево с отступами: `name (kind) {option=value, ...}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
            write!(f, "{}{} ({})", "  ".repeat(depth), node.name(), node.kind())?;
            if !node.options().is_empty() {
                let options: Vec<String> = node
                    .options()
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect();
                write!(f, " {{{}}}", options.join(", "))?;
            }
            writeln!(f)?;
            node.children()
                .iter()
                .try_for_each(|child| write_node(f, child, depth + 1))
        }
        write_node(f, &self.root, 0)
    }
}
