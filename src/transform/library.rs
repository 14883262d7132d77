//! Named tree rewrites.
//!
//! All rewrites locate nodes by name and are built on [`transform_root_node`] and
//! [`transform_root_node_postwalk`].

use super::walk::{postwalk_node, transform_root_node, transform_root_node_postwalk};
use crate::tree::{Node, NodeKind, Options, Tree, TreeError, TreeResult};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

fn name_set<S: AsRef<str>>(names: &[S]) -> HashSet<&str> {
    names.iter().map(AsRef::as_ref).collect()
}

/// Splices out the named nodes.
///
/// A node with one child is replaced by that child, a childless node by an
/// identity node with the same name. A node with several children cannot be
/// spliced out and fails with [`TreeError::AmbiguousReplacement`].
pub fn remove_node<S: AsRef<str>>(tree: &Tree, names: &[S]) -> TreeResult<Tree> {
    let targets = name_set(names);
    debug!(?targets, "remove_node");

    transform_root_node_postwalk(tree, |node| {
        if !targets.contains(node.name()) {
            return Ok(node);
        }
        match node.children().len() {
            0 => Ok(Node::identity(node.name())),
            1 => {
                let (_, mut children) = node.detach_children();
                Ok(children.remove(0))
            }
            n => Err(TreeError::AmbiguousReplacement {
                name: node.name().to_string(),
                children: n,
            }),
        }
    })
}

/// Replaces the whole subtree under each named node with an identity node of the same name.
pub fn remove_subtree<S: AsRef<str>>(tree: &Tree, names: &[S]) -> TreeResult<Tree> {
    let targets = name_set(names);
    debug!(?targets, "remove_subtree");

    transform_root_node_postwalk(tree, |node| {
        if targets.contains(node.name()) {
            Ok(Node::identity(node.name()))
        } else {
            Ok(node)
        }
    })
}

/// Replaces the parent of each named node with the node itself, dropping the
/// parent's other children.
///
/// Each name fires at most once: after a match the spliced child sits where its
/// parent was, and would otherwise match again against the grandparent. Every
/// name must match, or the rewrite fails with [`TreeError::NotFound`].
pub fn remove_parent<S: AsRef<str>>(tree: &Tree, names: &[S]) -> TreeResult<Tree> {
    let mut pending: HashSet<String> = names.iter().map(|name| name.as_ref().to_string()).collect();
    debug!(?pending, "remove_parent");

    let result = transform_root_node_postwalk(tree, |node| {
        let position = node
            .children()
            .iter()
            .position(|child| pending.contains(child.name()));
        match position {
            Some(index) => {
                let (_, mut children) = node.detach_children();
                let child = children.swap_remove(index);
                pending.remove(child.name());
                Ok(child)
            }
            None => Ok(node),
        }
    })?;

    if !pending.is_empty() {
        let missing: BTreeSet<String> = pending.into_iter().collect();
        return Err(TreeError::NotFound(missing.into_iter().collect()));
    }
    Ok(result)
}

/// Inserts a new parent between the named node and its current parent.
///
/// `parent_constructor` receives `parent_name`, the node and `parent_options`;
/// [`Node::hyperparameter`] has exactly this shape.
pub fn add_parent<F>(
    tree: &Tree,
    name: &str,
    parent_constructor: F,
    parent_name: &str,
    parent_options: Options,
) -> TreeResult<Tree>
where
    F: FnOnce(&str, Node, Options) -> Node,
{
    debug!(node = name, parent = parent_name, "add_parent");
    let mut constructor = Some(parent_constructor);
    let mut parent_options = Some(parent_options);

    let result = transform_root_node_postwalk(tree, |node| {
        if node.name() != name {
            return Ok(node);
        }
        match (constructor.take(), parent_options.take()) {
            (Some(construct), Some(options)) => Ok(construct(parent_name, node, options)),
            _ => Err(TreeError::DuplicateName(name.to_string())),
        }
    })?;

    if constructor.is_some() {
        return Err(TreeError::NotFound(vec![name.to_string()]));
    }
    Ok(result)
}

/// Wraps the whole tree in a hyperparameter node carrying `options`.
///
/// The new node is the outermost scope frame, so its values only apply where no
/// node closer to the lookup already declares the same name: they are tree-wide
/// defaults, not overrides.
pub fn add_hyperparameters(tree: &Tree, name: &str, options: Options) -> TreeResult<Tree> {
    debug!(node = name, count = options.len(), "add_hyperparameters");
    transform_root_node(tree, |root| Ok(Node::hyperparameter(name, root, options)))
}

/// Makes the named node the new root, discarding all of its ancestors and their
/// other descendants.
pub fn remove_parents(tree: &Tree, name: &str) -> TreeResult<Tree> {
    debug!(node = name, "remove_parents");
    transform_root_node(tree, |root| {
        let mut found = None;
        postwalk_node(root, |node| {
            if node.name() == name {
                // the rest of the walk only rebuilds ancestors that are thrown away
                found = Some(node);
                return Ok(Node::identity(name));
            }
            Ok(node)
        })?;
        found.ok_or_else(|| TreeError::NotFound(vec![name.to_string()]))
    })
}

/// Splices out every node of the given kind, with [`remove_node`] semantics.
pub fn remove_nodes_with_kind(tree: &Tree, kind: NodeKind) -> TreeResult<Tree> {
    fn collect<'a>(node: &'a Node, kind: NodeKind, out: &mut Vec<&'a str>) {
        if node.kind() == kind {
            out.push(node.name());
        }
        for child in node.children() {
            collect(child, kind, out);
        }
    }

    let mut names = Vec::new();
    collect(tree.root(), kind, &mut names);
    debug!(%kind, count = names.len(), "remove_nodes_with_kind");
    remove_node(tree, &names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::OptionValue;

    fn seq(name: &str, children: Vec<Node>) -> Node {
        Node::sequential(name, children)
    }

    fn leaf(name: &str) -> Node {
        Node::relu(name)
    }

    #[test]
    fn test_remove_node_with_no_children_leaves_identity() {
        let tree = Tree::new(seq("a", vec![leaf("b"), leaf("c")])).unwrap();
        let result = remove_node(&tree, &["b"]).unwrap();
        assert_eq!(result.root().children()[0], Node::identity("b"));
        assert_eq!(result.root().children()[1], leaf("c"));
    }

    #[test]
    fn test_remove_node_nested_targets() {
        let tree = Tree::new(seq("a", vec![seq("b", vec![seq("c", vec![leaf("d")])])])).unwrap();
        let result = remove_node(&tree, &["b", "c"]).unwrap();
        assert_eq!(result, Tree::new(seq("a", vec![leaf("d")])).unwrap());
    }

    #[test]
    fn test_remove_node_root() {
        let tree = Tree::new(seq("a", vec![leaf("b")])).unwrap();
        let result = remove_node(&tree, &["a"]).unwrap();
        assert_eq!(result.root(), &leaf("b"));
    }

    #[test]
    fn test_remove_parent_picks_first_matching_child() {
        let tree = Tree::new(seq("a", vec![leaf("b"), leaf("c"), leaf("d")])).unwrap();
        let result = remove_parent(&tree, &["c", "d"]).unwrap_err();
        // "a" is replaced by "c"; "d" is gone with it and never matches
        assert_eq!(result, TreeError::NotFound(vec!["d".to_string()]));

        let result = remove_parent(&tree, &["c"]).unwrap();
        assert_eq!(result.root(), &leaf("c"));
    }

    #[test]
    fn test_remove_parent_reports_all_missing_names_sorted() {
        let tree = Tree::new(seq("a", vec![leaf("b")])).unwrap();
        assert_eq!(
            remove_parent(&tree, &["z", "y"]),
            Err(TreeError::NotFound(vec!["y".to_string(), "z".to_string()]))
        );
    }

    #[test]
    fn test_add_parent_wraps_node() {
        let tree = Tree::new(seq("a", vec![leaf("b"), leaf("c")])).unwrap();
        let options = Options::from([("p".to_string(), OptionValue::Float(0.1))]);
        let result = add_parent(&tree, "c", Node::hyperparameter, "c_hp", options).unwrap();

        let wrapper = &result.root().children()[1];
        assert_eq!(wrapper.name(), "c_hp");
        assert_eq!(wrapper.kind(), NodeKind::Hyperparameter);
        assert_eq!(wrapper.get_option("p"), Some(&OptionValue::Float(0.1)));
        assert_eq!(wrapper.children(), &[leaf("c")]);
    }

    #[test]
    fn test_add_parent_missing_name() {
        let tree = Tree::new(seq("a", vec![leaf("b")])).unwrap();
        assert_eq!(
            add_parent(&tree, "zz", Node::hyperparameter, "hp", Options::new()),
            Err(TreeError::NotFound(vec!["zz".to_string()]))
        );
    }

    #[test]
    fn test_add_parent_rejects_duplicate_parent_name() {
        let tree = Tree::new(seq("a", vec![leaf("b"), leaf("c")])).unwrap();
        assert_eq!(
            add_parent(&tree, "b", Node::hyperparameter, "c", Options::new()),
            Err(TreeError::DuplicateName("c".to_string()))
        );
    }

    #[test]
    fn test_add_parent_with_custom_constructor() {
        let tree = Tree::new(seq("a", vec![leaf("b")])).unwrap();
        let result = add_parent(
            &tree,
            "b",
            |name, child, _| Node::sequential(name, vec![child, Node::dropout("drop")]),
            "block",
            Options::new(),
        )
        .unwrap();
        assert_eq!(result.names(), vec!["a", "block", "b", "drop"]);
    }

    #[test]
    fn test_remove_parents_missing_name() {
        let tree = Tree::new(seq("a", vec![leaf("b")])).unwrap();
        assert_eq!(
            remove_parents(&tree, "q"),
            Err(TreeError::NotFound(vec!["q".to_string()]))
        );
    }

    #[test]
    fn test_remove_nodes_with_kind() {
        let tree = Tree::new(seq(
            "a",
            vec![Node::dense("fc", 4), Node::dropout("d1"), leaf("r"), Node::dropout("d2")],
        ))
        .unwrap();
        let result = remove_nodes_with_kind(&tree, NodeKind::Dropout).unwrap();
        let kinds: Vec<NodeKind> = result.root().children().iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Dense, NodeKind::Identity, NodeKind::ReLU, NodeKind::Identity]
        );
        assert!(result.contains("d1") && result.contains("d2"));
    }

    #[test]
    fn test_remove_nodes_with_kind_nested_and_absent() {
        let tree = Tree::new(seq(
            "a",
            vec![
                seq("b", vec![Node::dropout("d1"), seq("c", vec![Node::dropout("d2")])]),
                Node::dropout("d3"),
            ],
        ))
        .unwrap();
        let result = remove_nodes_with_kind(&tree, NodeKind::Dropout).unwrap();
        assert_eq!(result.names(), vec!["a", "b", "d1", "c", "d2", "d3"]);
        assert!(["d1", "d2", "d3"]
            .iter()
            .all(|name| result.find(name).map(Node::kind) == Some(NodeKind::Identity)));

        // nothing of that kind: the tree comes back unchanged
        assert_eq!(remove_nodes_with_kind(&tree, NodeKind::Conv2d).unwrap(), tree);
    }
}
