//! Интеграционный тест: от дерева до собранной сети.

use rustytree::config::BuildConfig;
use rustytree::hyperparameters::{resolve, ResolveError};
use rustytree::network::{Network, NetworkError};
use rustytree::serialization::{from_json_str, to_json_string};
use rustytree::transform::{add_hyperparameters, remove_nodes_with_kind};
use rustytree::tree::{Node, NodeKind, OptionValue, Options, Tree};

fn options(pairs: &[(&str, OptionValue)]) -> Options {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Небольшая сверточная сеть в духе классификатора MNIST.
fn convnet() -> Tree {
    let features = Node::hyperparameter(
        "features",
        Node::sequential(
            "feature_seq",
            vec![
                Node::new(NodeKind::Conv2d, "conv1"),
                Node::new(NodeKind::MaxPool2d, "pool1"),
                Node::new(NodeKind::Conv2d, "conv2").with_option("num_filters", 64),
                Node::new(NodeKind::BatchNormalization, "bn"),
                Node::relu("relu"),
            ],
        ),
        options(&[
            ("num_filters", OptionValue::Int(32)),
            ("filter_size", OptionValue::from((3, 3))),
            ("pool_size", OptionValue::Int(2)),
        ]),
    );
    Tree::new(Node::hyperparameter(
        "model",
        Node::sequential(
            "seq",
            vec![
                Node::input("x", vec![None, Some(1), Some(28), Some(28)]),
                features,
                Node::dropout("drop").with_option("p", 0.25),
                Node::dense("logits", 10),
                Node::new(NodeKind::Softmax, "probs"),
            ],
        ),
        options(&[("num_units", OptionValue::Int(100))]),
    ))
    .unwrap()
}

#[test]
fn resolver_nearest_ancestor_wins() {
    let tree = Tree::new(Node::hyperparameter(
        "Root",
        Node::hyperparameter("Mid", Node::relu("Leaf"), options(&[("a", OptionValue::Int(2))])),
        options(&[("a", OptionValue::Int(1))]),
    ))
    .unwrap();

    let chain = tree.scope_of("Leaf").unwrap();
    assert_eq!(resolve(&chain, &["a"], None), Ok(OptionValue::Int(2)));
}

#[test]
fn resolver_stops_at_first_ancestor_match() {
    let tree = Tree::new(Node::hyperparameter(
        "Root",
        Node::hyperparameter("Parent", Node::relu("Leaf"), options(&[("y", OptionValue::Int(2))])),
        options(&[("x", OptionValue::Int(1))]),
    ))
    .unwrap();

    let chain = tree.scope_of("Leaf").unwrap();
    assert_eq!(resolve(&chain, &["x", "y"], None), Ok(OptionValue::Int(2)));
}

#[test]
fn resolver_fails_without_default() {
    let tree = Tree::new(Node::hyperparameter("Root", Node::relu("Leaf"), Options::new())).unwrap();
    let chain = tree.scope_of("Leaf").unwrap();
    assert_eq!(
        resolve(&chain, &["nowhere"], None),
        Err(ResolveError::Unresolved {
            node: "Leaf".to_string(),
            names: vec!["nowhere".to_string()],
        })
    );
    assert_eq!(
        resolve(&chain, &["nowhere"], Some(OptionValue::Bool(true))),
        Ok(OptionValue::Bool(true))
    );
}

#[test]
fn convnet_hyperparameters_follow_scopes() {
    let network = Network::build(convnet(), &BuildConfig::default()).unwrap();

    let conv1 = network.hyperparameters("conv1").unwrap();
    assert_eq!(conv1.get("num_filters"), Some(&OptionValue::Int(32)));
    assert_eq!(conv1.get("stride"), Some(&OptionValue::Int(1)));

    let conv2 = network.hyperparameters("conv2").unwrap();
    assert_eq!(conv2.get("num_filters"), Some(&OptionValue::Int(64)));

    let pool = network.hyperparameters("pool1").unwrap();
    assert_eq!(pool.get("pool_size"), Some(&OptionValue::Int(2)));
    // шаг пулинга по умолчанию равен размеру окна
    assert_eq!(pool.get("pool_stride"), Some(&OptionValue::Int(2)));

    let drop = network.hyperparameters("drop").unwrap();
    assert_eq!(drop.get("dropout_probability"), Some(&OptionValue::Float(0.25)));

    let bn = network.hyperparameters("bn").unwrap();
    assert_eq!(bn.get("epsilon"), Some(&OptionValue::Float(1e-4)));
    assert_eq!(bn.get("batch_axis"), Some(&OptionValue::Int(0)));

    let logits = network.hyperparameters("logits").unwrap();
    assert_eq!(logits.get("num_units"), Some(&OptionValue::Int(10)));
}

#[test]
fn convnet_compiles_to_a_chain() {
    let network = Network::build(convnet(), &BuildConfig::default()).unwrap();
    let order: Vec<&str> = network.execution_order().iter().map(|op| op.name.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "x", "conv1", "pool1", "conv2", "bn", "relu", "feature_seq", "features", "drop", "logits",
            "probs", "seq", "model"
        ]
    );
    assert_eq!(network.tree().len(), 13);
    assert!(network.handle("x").is_some());
    assert!(network.inputs().contains_key("x"));
}

#[test]
fn container_fans_out_its_input() {
    let tree = Tree::new(Node::sequential(
        "seq",
        vec![
            Node::input("x", vec![None, Some(8)]),
            Node::container("branches", vec![Node::dense("left", 4), Node::dense("right", 2)]),
        ],
    ))
    .unwrap();
    let network = Network::build(tree, &BuildConfig::default()).unwrap();
    let graph = network.graph();

    let x = network.handle("x").unwrap();
    let left = network.handle("left").unwrap();
    let right = network.handle("right").unwrap();
    let branches = network.handle("branches").unwrap();

    assert!(graph.contains_edge(x, left));
    assert!(graph.contains_edge(x, right));
    assert!(graph.contains_edge(right, branches));
    assert!(!graph.contains_edge(left, branches));
}

#[test]
fn evaluation_rewrite_then_build() {
    let tree = remove_nodes_with_kind(&convnet(), NodeKind::Dropout).unwrap();
    let network = Network::build(tree, &BuildConfig::default()).unwrap();
    let drop = network.handle("drop").and_then(|h| network.op(h)).unwrap();
    assert_eq!(drop.kind, NodeKind::Identity);
    assert!(drop.hyperparameters.is_empty());
}

#[test]
fn added_hyperparameters_do_not_override() {
    let tree = add_hyperparameters(
        &convnet(),
        "overrides",
        options(&[("num_filters", OptionValue::Int(8)), ("epsilon", OptionValue::Float(0.5))]),
    )
    .unwrap();
    let network = Network::build(tree, &BuildConfig::default()).unwrap();

    // features объявляет num_filters ближе к conv1
    assert_eq!(
        network.find_hyperparameter("conv1", &["num_filters"], None),
        Ok(OptionValue::Int(32))
    );
    // epsilon не объявлен нигде ниже, поэтому новый корень выигрывает у значения по умолчанию
    assert_eq!(
        network.hyperparameters("bn").and_then(|o| o.get("epsilon")),
        Some(&OptionValue::Float(0.5))
    );
}

#[test]
fn missing_input_shape_is_reported() {
    let tree = Tree::new(Node::sequential(
        "seq",
        vec![Node::new(NodeKind::Input, "x"), Node::relu("r")],
    ))
    .unwrap();
    assert!(matches!(
        Network::build(tree, &BuildConfig::default()),
        Err(NetworkError::Resolve(ResolveError::Unresolved { ref node, .. })) if node == "x"
    ));
}

#[test]
fn serialized_architecture_builds_identically() {
    let json = to_json_string(&convnet()).unwrap();
    let loaded = from_json_str(&json).unwrap();
    assert_eq!(loaded, convnet());

    let network = Network::build(loaded, &BuildConfig::default()).unwrap();
    assert_eq!(network.graph().node_count(), 13);
}
