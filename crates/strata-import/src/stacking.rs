//! Stacking context discovery for one batch of IR nodes.
//!
//! A node establishes a stacking context when it is positioned with a
//! numeric z-index, has opacity below 1, a transform, filter, perspective or
//! clip-path, `isolation: isolate`, or the extraction agent flagged it
//! explicitly. The document itself is the implicit root context.
//!
//! Contexts are kept in an arena addressed by [`ContextId`]; index 0 is the
//! document root.

use std::collections::HashMap;

use strata_ir::{CssProperty, IrNode, NodeId};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub usize);

impl ContextId {
    pub const ROOT: ContextId = ContextId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackingContext {
    /// Batch index of the establishing node; `None` for the document root.
    pub owner: Option<usize>,
    pub element_id: Option<NodeId>,
    /// Explicit z-index, `None` for `auto`.
    pub z_index: Option<i32>,
    pub parent: Option<ContextId>,
    /// Nested contexts in source order of their owners.
    pub children: Vec<ContextId>,
    /// Nodes painted directly in this context, in source order. A nested
    /// context's owner is a member of the context that encloses it.
    pub members: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct StackingTree {
    contexts: Vec<StackingContext>,
    enclosing: Vec<ContextId>,
    owned: Vec<Option<ContextId>>,
}

impl StackingTree {
    /// Single pass over the batch. Parent links that leave the batch, or
    /// loop back on themselves, end at the document root.
    pub fn analyze(nodes: &[IrNode]) -> Self {
        let positions: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut contexts = vec![StackingContext {
            owner: None,
            element_id: None,
            z_index: None,
            parent: None,
            children: Vec::new(),
            members: Vec::new(),
        }];
        let mut owned = vec![None; nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            if creates_stacking_context(node) {
                owned[i] = Some(ContextId(contexts.len()));
                contexts.push(StackingContext {
                    owner: Some(i),
                    element_id: Some(node.id.clone()),
                    z_index: explicit_z_index(node),
                    parent: None,
                    children: Vec::new(),
                    members: Vec::new(),
                });
            }
        }

        let mut enclosing: Vec<ContextId> = (0..nodes.len())
            .map(|i| nearest_ancestor_context(nodes, &positions, &owned, i))
            .collect();

        // A context whose ancestry never reaches the root sits on a parent
        // cycle; lift it to the root to break the cycle.
        for c in 1..contexts.len() {
            if !reaches_root(&contexts, &enclosing, ContextId(c)) {
                if let Some(owner) = contexts[c].owner {
                    warn!(id = %nodes[owner].id, "parent cycle between stacking contexts, lifted to root");
                    enclosing[owner] = ContextId::ROOT;
                }
            }
        }

        for (i, ctx) in enclosing.iter().enumerate() {
            contexts[ctx.0].members.push(i);
            if let Some(own) = owned[i] {
                contexts[own.0].parent = Some(*ctx);
                contexts[ctx.0].children.push(own);
            }
        }

        Self {
            contexts,
            enclosing,
            owned,
        }
    }

    pub fn root(&self) -> &StackingContext {
        &self.contexts[ContextId::ROOT.0]
    }

    pub fn context(&self, id: ContextId) -> &StackingContext {
        &self.contexts[id.0]
    }

    pub fn contexts(&self) -> &[StackingContext] {
        &self.contexts
    }

    /// Context the node is painted in.
    pub fn enclosing_context(&self, node: usize) -> ContextId {
        self.enclosing[node]
    }

    /// Context the node belongs to: its own when it establishes one,
    /// otherwise the enclosing one.
    pub fn context_of(&self, node: usize) -> ContextId {
        self.owned[node].unwrap_or(self.enclosing[node])
    }

    pub fn owned_context(&self, node: usize) -> Option<ContextId> {
        self.owned[node]
    }

    pub fn node_count(&self) -> usize {
        self.enclosing.len()
    }
}

fn nearest_ancestor_context(
    nodes: &[IrNode],
    positions: &HashMap<&str, usize>,
    owned: &[Option<ContextId>],
    start: usize,
) -> ContextId {
    let mut current = nodes[start].parent.as_deref();
    let mut steps = 0;
    while let Some(parent_id) = current {
        let Some(&p) = positions.get(parent_id) else {
            break;
        };
        if p == start || steps > nodes.len() {
            break;
        }
        if let Some(ctx) = owned[p] {
            return ctx;
        }
        current = nodes[p].parent.as_deref();
        steps += 1;
    }
    ContextId::ROOT
}

fn reaches_root(contexts: &[StackingContext], enclosing: &[ContextId], start: ContextId) -> bool {
    let mut current = start;
    for _ in 0..=contexts.len() {
        if current == ContextId::ROOT {
            return true;
        }
        match contexts[current.0].owner {
            Some(owner) => current = enclosing[owner],
            None => return true,
        }
    }
    false
}

/// Explicit numeric z-index on a positioned node.
pub fn explicit_z_index(node: &IrNode) -> Option<i32> {
    if !is_positioned(node) {
        return None;
    }
    node.styles
        .number(CssProperty::ZIndex)
        .map(|z| z.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

/// Sort value within the enclosing context; non-positioned nodes and
/// `z-index: auto` paint at 0.
pub fn effective_z_index(node: &IrNode) -> i32 {
    explicit_z_index(node).unwrap_or(0)
}

fn is_positioned(node: &IrNode) -> bool {
    matches!(
        node.styles.keyword(CssProperty::Position).as_deref(),
        Some("relative" | "absolute" | "fixed" | "sticky")
    )
}

pub fn creates_stacking_context(node: &IrNode) -> bool {
    if node.compositing.creates_stacking_context {
        return true;
    }
    if explicit_z_index(node).is_some() {
        return true;
    }
    let styles = &node.styles;
    if styles
        .number(CssProperty::Opacity)
        .is_some_and(|opacity| opacity < 1.0)
    {
        return true;
    }
    if styles
        .str(CssProperty::Transform)
        .is_some_and(|t| !is_identity_transform(&t))
    {
        return true;
    }
    let non_default = |prop: CssProperty| {
        styles
            .keyword(prop)
            .is_some_and(|v| v != "none" && v != "normal")
    };
    if non_default(CssProperty::Filter)
        || non_default(CssProperty::Perspective)
        || non_default(CssProperty::ClipPath)
    {
        return true;
    }
    styles.keyword(CssProperty::Isolation).as_deref() == Some("isolate")
}

fn is_identity_transform(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact == "none" || compact == "matrix(1,0,0,1,0,0)"
}
