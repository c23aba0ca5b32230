//! Global paint-order ranks for one batch.
//!
//! Within each stacking context the members are sorted by effective z-index
//! and then by source order. Ranks are handed out depth-first: when a member
//! owns a nested context, that context's whole content is ranked right
//! after it, so every context occupies a contiguous rank range.

use std::ops::Range;

use strata_ir::IrNode;

use crate::stacking::{ContextId, StackingTree, effective_z_index};

/// Sort key inside one context. Field order gives the comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PaintKey {
    z_index: i32,
    tree_order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintOrder {
    ranks: Vec<usize>,
    sequence: Vec<usize>,
    context_ranges: Vec<Range<usize>>,
}

impl PaintOrder {
    pub fn compute(nodes: &[IrNode], tree: &StackingTree) -> Self {
        let n = nodes.len();
        let sorted_members = |ctx: ContextId| -> Vec<usize> {
            let mut members = tree.context(ctx).members.clone();
            members.sort_by_key(|&i| PaintKey {
                z_index: effective_z_index(&nodes[i]),
                tree_order: i,
            });
            members
        };

        let mut ranks = vec![usize::MAX; n];
        let mut sequence = Vec::with_capacity(n);
        let mut context_ranges = vec![0..0; tree.contexts().len()];

        let mut stack: Vec<(ContextId, Vec<usize>, usize)> =
            vec![(ContextId::ROOT, sorted_members(ContextId::ROOT), 0)];
        while let Some(frame) = stack.last_mut() {
            let (ctx, members, cursor) = frame;
            if *cursor == members.len() {
                context_ranges[ctx.0].end = sequence.len();
                stack.pop();
                continue;
            }
            let node = members[*cursor];
            *cursor += 1;

            ranks[node] = sequence.len();
            sequence.push(node);
            if let Some(owned) = tree.owned_context(node) {
                context_ranges[owned.0].start = ranks[node];
                stack.push((owned, sorted_members(owned), 0));
            }
        }

        Self {
            ranks,
            sequence,
            context_ranges,
        }
    }

    /// Convenience for analysis + ranking in one go.
    pub fn for_nodes(nodes: &[IrNode]) -> Self {
        let tree = StackingTree::analyze(nodes);
        Self::compute(nodes, &tree)
    }

    pub fn rank(&self, node: usize) -> usize {
        self.ranks[node]
    }

    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Batch indices, back to front.
    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Ranks taken by a context: its owner's rank through its last
    /// descendant. The root context spans every rank.
    pub fn context_range(&self, ctx: ContextId) -> Range<usize> {
        self.context_ranges[ctx.0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::NodeKind;

    fn frame(id: &str) -> IrNode {
        IrNode::new(id, NodeKind::Frame)
    }

    fn positioned(id: &str, z: i32) -> IrNode {
        frame(id).with_style("position", "relative").with_style("zIndex", z)
    }

    fn ids(nodes: &[IrNode], order: &PaintOrder) -> Vec<String> {
        order.sequence().iter().map(|&i| nodes[i].id.clone()).collect()
    }

    #[test]
    fn z_index_then_source_order() {
        let nodes = vec![
            frame("page"),
            positioned("top", 10).with_parent("page"),
            frame("flow").with_parent("page"),
            positioned("under", -1).with_parent("page"),
            positioned("zero", 0).with_parent("page"),
        ];
        let order = PaintOrder::for_nodes(&nodes);
        assert_eq!(ids(&nodes, &order), vec!["under", "page", "flow", "zero", "top"]);
    }

    #[test]
    fn nested_context_is_contiguous() {
        let nodes = vec![
            frame("page"),
            positioned("modal", 5).with_parent("page"),
            positioned("modal-bg", -3).with_parent("modal"),
            frame("modal-body").with_parent("modal"),
            positioned("header", 2).with_parent("page"),
            positioned("badge", 100).with_parent("header"),
            frame("footer").with_parent("page"),
        ];
        let tree = StackingTree::analyze(&nodes);
        let order = PaintOrder::compute(&nodes, &tree);
        assert_eq!(
            ids(&nodes, &order),
            vec!["page", "footer", "header", "badge", "modal", "modal-bg", "modal-body"]
        );

        // every node falls inside the range of its nearest context ancestor
        for i in 0..nodes.len() {
            let ctx = tree.enclosing_context(i);
            assert!(order.context_range(ctx).contains(&order.rank(i)), "node {i}");
        }
        let modal = tree.owned_context(1).unwrap();
        assert_eq!(order.context_range(modal), 4..7);
        assert_eq!(order.context_range(ContextId::ROOT), 0..7);
    }

    #[test]
    fn deterministic() {
        let nodes: Vec<IrNode> = (0..50)
            .map(|i| {
                let node = positioned(&format!("n{i}"), (i * 7 % 5) - 2);
                if i == 0 { node } else { node.with_parent(format!("n{}", i / 3)) }
            })
            .collect();
        let first = PaintOrder::for_nodes(&nodes);
        let second = PaintOrder::for_nodes(&nodes);
        assert_eq!(first, second);
        let mut ranks = first.ranks().to_vec();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..50).collect::<Vec<_>>());
    }
}
