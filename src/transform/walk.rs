//! Traversal primitives the transform library is built on.

use crate::hyperparameters::Scope;
use crate::tree::{Node, Tree, TreeResult};

/// Rebuilds the subtree rooted at `root` in post-order.
///
/// Children are transformed before their parent, so `f` always sees a node whose
/// children already went through `f`. The first error aborts the walk.
pub fn postwalk_node<F>(root: Node, mut f: F) -> TreeResult<Node>
where
    F: FnMut(Node) -> TreeResult<Node>,
{
    postwalk_inner(root, &mut f)
}

fn postwalk_inner<F>(node: Node, f: &mut F) -> TreeResult<Node>
where
    F: FnMut(Node) -> TreeResult<Node>,
{
    let (head, children) = node.detach_children();
    let children = children
        .into_iter()
        .map(|child| postwalk_inner(child, f))
        .collect::<TreeResult<Vec<_>>>()?;
    f(head.rebuild(children))
}

/// Applies `f` once to the root of `tree` and validates the result as a new tree.
pub fn transform_root_node<F>(tree: &Tree, f: F) -> TreeResult<Tree>
where
    F: FnOnce(Node) -> TreeResult<Node>,
{
    let root = f(tree.root().clone())?;
    Tree::new(root)
}

/// `transform_root_node` with a full post-order rebuild as the root rewrite.
pub fn transform_root_node_postwalk<F>(tree: &Tree, f: F) -> TreeResult<Tree>
where
    F: FnMut(Node) -> TreeResult<Node>,
{
    transform_root_node(tree, |root| postwalk_node(root, f))
}

/// Read-only pre-order visit carrying the scope chain.
///
/// When `f` is called the scope's innermost frame is the visited node itself.
pub fn visit_with_scope<'a, E, F>(root: &'a Node, mut f: F) -> Result<(), E>
where
    F: FnMut(&'a Node, &Scope<'a>) -> Result<(), E>,
{
    fn visit<'a, E, F>(node: &'a Node, scope: &mut Scope<'a>, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&'a Node, &Scope<'a>) -> Result<(), E>,
    {
        scope.push(node);
        f(node, scope)?;
        for child in node.children() {
            visit(child, scope, f)?;
        }
        scope.pop();
        Ok(())
    }

    let mut scope = Scope::new();
    visit(root, &mut scope, &mut f)
}
