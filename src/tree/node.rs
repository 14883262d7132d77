//! Узлы дерева архитектуры.
//!
//! Каждый узел имеет имя, вид (`NodeKind`), локальные опции и упорядоченный
//! список дочерних узлов. Вид узла определяет допустимое число детей и набор
//! гиперпараметров, которые узел может объявить.

use super::value::{OptionValue, Options};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Допустимое количество дочерних узлов для вида узла.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arity {
    /// Ровно ноль детей.
    Leaf,
    /// Ровно один ребенок (обертка).
    Single,
    /// Любое количество детей.
    Many,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Leaf => count == 0,
            Arity::Single => count == 1,
            Arity::Many => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Leaf => write!(f, "no children"),
            Arity::Single => write!(f, "exactly one child"),
            Arity::Many => write!(f, "any number of children"),
        }
    }
}

/// Вид узла.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Пропускает вход без изменений. Используется как заглушка при удалении узлов.
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "input")]
    Input,
    /// Объявляет гиперпараметры для всего своего поддерева.
    #[serde(rename = "hyperparameter")]
    Hyperparameter,
    #[serde(rename = "sequential")]
    Sequential,
    #[serde(rename = "container")]
    Container,
    #[serde(rename = "dense")]
    Dense,
    #[serde(rename = "conv2d")]
    Conv2d,
    #[serde(rename = "max_pool2d")]
    MaxPool2d,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "softmax")]
    Softmax,
    #[serde(rename = "dropout")]
    Dropout,
    #[serde(rename = "batch_normalization")]
    BatchNormalization,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Identity,
        NodeKind::Input,
        NodeKind::Hyperparameter,
        NodeKind::Sequential,
        NodeKind::Container,
        NodeKind::Dense,
        NodeKind::Conv2d,
        NodeKind::MaxPool2d,
        NodeKind::ReLU,
        NodeKind::Softmax,
        NodeKind::Dropout,
        NodeKind::BatchNormalization,
    ];

    pub fn arity(self) -> Arity {
        match self {
            NodeKind::Hyperparameter => Arity::Single,
            NodeKind::Sequential | NodeKind::Container => Arity::Many,
            _ => Arity::Leaf,
        }
    }

    /// Имена гиперпараметров, которые узел этого вида может объявить локально.
    ///
    /// `None` означает "любые" (так ведет себя `Hyperparameter`).
    pub fn hyperparameter_names(self) -> Option<&'static [&'static str]> {
        let names: &'static [&'static str] = match self {
            NodeKind::Hyperparameter => return None,
            NodeKind::Identity | NodeKind::ReLU | NodeKind::Softmax => &[],
            NodeKind::Input => &["shape", "dtype"],
            NodeKind::Sequential | NodeKind::Container => &[],
            NodeKind::Dense => &["num_units", "inits"],
            NodeKind::Conv2d => &["num_filters", "filter_size", "stride", "pad", "inits"],
            NodeKind::MaxPool2d => &["pool_size", "pool_stride"],
            NodeKind::Dropout => &["dropout_probability", "p"],
            NodeKind::BatchNormalization => &["epsilon", "batch_axis"],
        };
        Some(names)
    }

    pub fn accepts_hyperparameter(self, name: &str) -> bool {
        self.hyperparameter_names()
            .map_or(true, |names| names.contains(&name))
    }

    /// Identifier used in serialized architectures and on the command line.
    pub fn identifier(self) -> &'static str {
        match self {
            NodeKind::Identity => "identity",
            NodeKind::Input => "input",
            NodeKind::Hyperparameter => "hyperparameter",
            NodeKind::Sequential => "sequential",
            NodeKind::Container => "container",
            NodeKind::Dense => "dense",
            NodeKind::Conv2d => "conv2d",
            NodeKind::MaxPool2d => "max_pool2d",
            NodeKind::ReLU => "relu",
            NodeKind::Softmax => "softmax",
            NodeKind::Dropout => "dropout",
            NodeKind::BatchNormalization => "batch_normalization",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.identifier() == s)
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}

/// Узел дерева архитектуры.
///
/// Узлы неизменяемы снаружи: трансформации получают узел по значению и
/// возвращают новый, а не редактируют его на месте.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    options: Options,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Создает узел без детей и без опций.
    pub fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            options: Options::new(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_option(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options.extend(options);
        self
    }

    // --- Конструкторы для распространенных видов ---

    pub fn identity(name: &str) -> Self {
        Self::new(NodeKind::Identity, name)
    }

    pub fn input(name: &str, shape: Vec<Option<usize>>) -> Self {
        Self::new(NodeKind::Input, name).with_option("shape", shape)
    }

    /// Оборачивает `child` в узел, объявляющий `options` для всего поддерева.
    ///
    /// Сигнатура совпадает с конструктором родителя, который ожидает `add_parent`.
    pub fn hyperparameter(name: &str, child: Node, options: Options) -> Self {
        Self::new(NodeKind::Hyperparameter, name)
            .with_options(options)
            .with_child(child)
    }

    pub fn sequential(name: &str, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Sequential, name).with_children(children)
    }

    pub fn container(name: &str, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Container, name).with_children(children)
    }

    pub fn dense(name: &str, num_units: usize) -> Self {
        Self::new(NodeKind::Dense, name).with_option("num_units", num_units)
    }

    pub fn relu(name: &str) -> Self {
        Self::new(NodeKind::ReLU, name)
    }

    pub fn dropout(name: &str) -> Self {
        Self::new(NodeKind::Dropout, name)
    }

    // --- Доступ ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Значение, объявленное непосредственно на этом узле (без поиска по предкам).
    pub fn get_option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Отделяет детей от узла, возвращая "голову" с пустым списком детей.
    pub fn detach_children(mut self) -> (Node, Vec<Node>) {
        let children = std::mem::take(&mut self.children);
        (self, children)
    }

    /// Пересобирает узел с новым списком детей.
    pub fn rebuild(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Количество узлов в поддереве, включая этот.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    /// Глубина поддерева; лист имеет глубину 1.
    pub fn subtree_depth(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(NodeKind::Dense.arity().accepts(0));
        assert!(!NodeKind::Dense.arity().accepts(1));
        assert!(NodeKind::Hyperparameter.arity().accepts(1));
        assert!(!NodeKind::Hyperparameter.arity().accepts(2));
        assert!(NodeKind::Sequential.arity().accepts(5));
    }

    #[test]
    fn test_kind_identifier_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.identifier().parse::<NodeKind>(), Ok(kind));
        }
        assert!("lstm".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_hyperparameter_kind_accepts_anything() {
        assert!(NodeKind::Hyperparameter.accepts_hyperparameter("whatever"));
        assert!(NodeKind::Dense.accepts_hyperparameter("num_units"));
        assert!(!NodeKind::ReLU.accepts_hyperparameter("num_units"));
    }

    #[test]
    fn test_detach_and_rebuild() {
        let node = Node::sequential("seq", vec![Node::relu("a"), Node::relu("b")]);
        let (head, children) = node.detach_children();
        assert!(head.children().is_empty());
        assert_eq!(children.len(), 2);

        let rebuilt = head.rebuild(children.into_iter().rev().collect());
        assert_eq!(rebuilt.children()[0].name(), "b");
    }

    #[test]
    fn test_subtree_metrics() {
        let node = Node::sequential(
            "seq",
            vec![Node::hyperparameter("hp", Node::dense("fc", 10), Options::new()), Node::relu("r")],
        );
        assert_eq!(node.subtree_len(), 4);
        assert_eq!(node.subtree_depth(), 3);
    }
}
