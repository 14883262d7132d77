//! Hyperparameter resolution through ancestor scopes.
//!
//! A node rarely carries all of its configuration. Instead, a lookup walks the
//! scope chain (the node itself, then its parent, up to the root) and returns the
//! first declaration it finds. Nearest ancestor wins; among candidate names declared
//! on the same node, the caller's order wins.
//!
//! ```text
//! model {num_units=10}        <- outermost frame, acts as a default
//!   seq
//!     fc1 {num_units=128}     <- resolving ["num_units"] at fc1 gives 128
//!     fc2                     <- resolving ["num_units"] at fc2 gives 10
//! ```

use crate::tree::{Node, OptionValue, Options};
use thiserror::Error;
use tracing::trace;

/// Process-wide fallback values, consulted after the scope chain and before the caller's default.
pub type DefaultTable = Options;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Could not resolve hyperparameter {names:?} for node '{node}': no node in its scope declares it and no default was given.")]
    Unresolved { node: String, names: Vec<String> },
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Scans a scope chain (innermost first) for the first node declaring any of `names`.
pub fn find_declared<'a, 'n, I>(chain: I, names: &[&'n str]) -> Option<(&'a Node, &'n str, &'a OptionValue)>
where
    I: IntoIterator<Item = &'a Node>,
{
    chain.into_iter().find_map(|node| {
        names
            .iter()
            .find_map(|&name| node.get_option(name).map(|value| (node, name, value)))
    })
}

/// Resolves `names` against `chain`, falling back to `default`.
///
/// `chain[0]` is the node being configured, followed by its ancestors innermost first.
pub fn resolve(chain: &[&Node], names: &[&str], default: Option<OptionValue>) -> ResolveResult<OptionValue> {
    resolve_with_table(chain, names, default, &DefaultTable::new())
}

/// Like [`resolve`], but consults `table` once the chain is exhausted, before `default`.
pub fn resolve_with_table(
    chain: &[&Node],
    names: &[&str],
    default: Option<OptionValue>,
    table: &DefaultTable,
) -> ResolveResult<OptionValue> {
    resolve_traced(chain.iter().copied(), names, default, table).map(|(value, _)| value)
}

fn resolve_traced<'a, I>(
    chain: I,
    names: &[&str],
    default: Option<OptionValue>,
    table: &DefaultTable,
) -> ResolveResult<(OptionValue, bool)>
where
    I: IntoIterator<Item = &'a Node> + Clone,
{
    let node_name = chain
        .clone()
        .into_iter()
        .next()
        .map(|node| node.name().to_string())
        .unwrap_or_default();

    if let Some((owner, name, value)) = find_declared(chain, names) {
        trace!(node = %node_name, hyperparameter = name, declared_on = owner.name(), "resolved from scope");
        return Ok((value.clone(), true));
    }
    if let Some(value) = names.iter().find_map(|&name| table.get(name)) {
        trace!(node = %node_name, ?names, "resolved from default table");
        return Ok((value.clone(), false));
    }
    if let Some(value) = default {
        trace!(node = %node_name, ?names, "resolved from explicit default");
        return Ok((value, false));
    }
    Err(ResolveError::Unresolved {
        node: node_name,
        names: names.iter().map(|name| name.to_string()).collect(),
    })
}

/// An explicitly threaded scope chain.
///
/// Traversals push a frame when entering a node and pop it when leaving, so the
/// chain is never stored on the nodes themselves.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    // Outermost first; lookups iterate in reverse.
    frames: Vec<&'a Node>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, node: &'a Node) {
        self.frames.push(node);
    }

    pub fn pop(&mut self) -> Option<&'a Node> {
        self.frames.pop()
    }

    /// The innermost frame: the node currently being visited.
    pub fn current(&self) -> Option<&'a Node> {
        self.frames.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The chain innermost first.
    pub fn chain(&self) -> Vec<&'a Node> {
        self.frames.iter().rev().copied().collect()
    }

    /// Ancestors of the current node, innermost first.
    pub fn ancestors(&self) -> Vec<&'a Node> {
        self.frames.iter().rev().skip(1).copied().collect()
    }

    pub fn resolve(&self, names: &[&str], default: Option<OptionValue>, table: &DefaultTable) -> ResolveResult<OptionValue> {
        self.resolve_with_source(names, default, table).map(|(value, _)| value)
    }

    /// Resolves and reports whether the value came from the scope chain itself
    /// (as opposed to a default). Only scope hits are stable enough to memoize.
    pub fn resolve_with_source(
        &self,
        names: &[&str],
        default: Option<OptionValue>,
        table: &DefaultTable,
    ) -> ResolveResult<(OptionValue, bool)> {
        resolve_traced(self.frames.iter().rev().copied(), names, default, table)
    }
}
