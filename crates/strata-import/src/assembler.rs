//! Builds the target hierarchy for one batch of IR nodes.
//!
//! Parent structure always follows each node's declared `parent`; the paint
//! order only decides the sequence in which nodes are created, which is the
//! sibling order in the target tool.

use std::collections::HashMap;

use strata_ir::{IrNode, NodeId, NodeKind};
use tracing::{debug, info, warn};

use crate::ImportStats;
use crate::host::TargetId;
use crate::paint_order::PaintOrder;

/// Attachment point for new children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentSlot {
    pub target: TargetId,
    /// Absolute page position of the parent box.
    pub origin_x: f64,
    pub origin_y: f64,
    pub depth: usize,
    pub auto_layout: bool,
}

impl ParentSlot {
    pub fn root(target: TargetId) -> Self {
        Self {
            target,
            origin_x: 0.0,
            origin_y: 0.0,
            depth: 0,
            auto_layout: false,
        }
    }
}

/// What a [`NodeCreator`] reports back for a created node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatedNode {
    pub target: TargetId,
    pub accepts_children: bool,
    pub auto_layout: bool,
    /// The node was substituted by a placeholder.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEntry {
    pub target: TargetId,
    pub origin_x: f64,
    pub origin_y: f64,
    pub depth: usize,
    pub accepts_children: bool,
    pub auto_layout: bool,
    pub attached_to: ParentSlot,
}

impl CreatedEntry {
    fn as_parent(&self) -> ParentSlot {
        ParentSlot {
            target: self.target,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            depth: self.depth,
            auto_layout: self.auto_layout,
        }
    }
}

/// IR id to created target node, across every batch of a session.
#[derive(Debug, Default)]
pub struct CreatedIndex {
    entries: HashMap<NodeId, CreatedEntry>,
}

impl CreatedIndex {
    pub fn get(&self, id: &str) -> Option<&CreatedEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registers a node. An id is only ever registered once; a second
    /// registration is ignored and returns `false`.
    pub fn insert(&mut self, id: NodeId, entry: CreatedEntry) -> bool {
        if self.entries.contains_key(&id) {
            warn!(id = %id, "node already registered");
            return false;
        }
        self.entries.insert(id, entry);
        true
    }

    /// Where children of `id` attach: the node itself when it takes
    /// children, otherwise the container it sits in.
    pub fn parent_slot(&self, id: &str) -> Option<ParentSlot> {
        self.entries.get(id).map(|entry| {
            if entry.accepts_children {
                entry.as_parent()
            } else {
                entry.attached_to
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The node-creation capability the assembler drives.
#[allow(async_fn_in_trait)]
pub trait NodeCreator {
    /// Creates `node` under `parent`. `None` means creation failed and
    /// nothing was added to the target tree.
    async fn create(&mut self, node: &IrNode, parent: &ParentSlot) -> Option<CreatedNode>;
}

enum Resolution {
    Attach(ParentSlot),
    /// Parent is known but cannot hold the node; attach elsewhere.
    Flatten(ParentSlot),
    Orphan,
    Wait(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unvisited,
    Waiting,
    Created,
    Failed,
}

struct Run {
    states: Vec<NodeState>,
    /// Parent batch index to waiting children, in rank order.
    waiting: HashMap<usize, Vec<usize>>,
    stats: ImportStats,
}

pub struct HierarchyAssembler<'a> {
    nodes: &'a [IrNode],
    positions: HashMap<&'a str, usize>,
    paint_order: Option<PaintOrder>,
    defer_missing_parents: bool,
    /// Batch nodes created outside this pass (streamed images), by id, with
    /// their declared parent.
    held: HashMap<&'a str, Option<&'a str>>,
}

impl<'a> HierarchyAssembler<'a> {
    pub fn new(nodes: &'a [IrNode], defer_missing_parents: bool) -> Self {
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();
        Self {
            nodes,
            positions,
            paint_order: None,
            defer_missing_parents,
            held: HashMap::new(),
        }
    }

    /// Nodes of the batch that this pass does not create. They never hold
    /// children, so children declared under them go to their container.
    pub fn holding(mut self, held: &'a [IrNode]) -> Self {
        self.held = held
            .iter()
            .map(|node| (node.id.as_str(), node.parent.as_deref()))
            .collect();
        self
    }

    /// The node's declared parent is held and not created yet.
    fn parent_is_held(&self, node: &IrNode, index: &CreatedIndex) -> bool {
        node.parent
            .as_deref()
            .is_some_and(|p| self.held.contains_key(p) && !index.contains(p))
    }

    /// Stacking analysis and ranking happen on first use.
    pub fn paint_order(&mut self) -> &PaintOrder {
        let nodes = self.nodes;
        self.paint_order
            .get_or_insert_with(|| PaintOrder::for_nodes(nodes))
    }

    /// Creates every node of the batch in paint order.
    ///
    /// A node whose parent is created already attaches to it. A node whose
    /// parent is absent from both the batch and `index` is an orphan and
    /// attaches to `root`. A node whose parent is in the batch but not
    /// created yet either waits for it (`defer_missing_parents`) or is
    /// flattened into `root`. Waiting children are created right after
    /// their parent; children of a failed parent, and waiters whose parent
    /// never appears, attach to `root`.
    pub async fn build<C: NodeCreator>(
        &mut self,
        creator: &mut C,
        index: &mut CreatedIndex,
        root: ParentSlot,
    ) -> ImportStats {
        let order = self.paint_order();
        let sequence = order.sequence().to_vec();
        let ranks = order.ranks().to_vec();

        let mut run = Run {
            states: vec![NodeState::Unvisited; self.nodes.len()],
            waiting: HashMap::new(),
            stats: ImportStats::default(),
        };

        for &i in &sequence {
            if run.states[i] != NodeState::Unvisited {
                continue;
            }
            let node = &self.nodes[i];
            if index.contains(&node.id) {
                debug!(id = %node.id, "node already created, skipped");
                run.states[i] = NodeState::Created;
                continue;
            }
            match self.resolve(i, index, &run.states, root) {
                Resolution::Attach(slot) => self.place(i, slot, creator, index, &mut run, root).await,
                Resolution::Flatten(slot) => {
                    debug!(id = %node.id, "parent cannot hold children, flattened");
                    run.stats.flattened += 1;
                    self.place(i, slot, creator, index, &mut run, root).await;
                }
                Resolution::Orphan => {
                    warn!(
                        id = %node.id,
                        parent = node.parent.as_deref().unwrap_or_default(),
                        "orphan node attached to root"
                    );
                    run.stats.orphans += 1;
                    self.place(i, root, creator, index, &mut run, root).await;
                }
                Resolution::Wait(parent) => {
                    if self.parent_is_held(node, index) {
                        run.stats.flattened += 1;
                    }
                    run.states[i] = NodeState::Waiting;
                    run.waiting.entry(parent).or_default().push(i);
                }
            }
        }

        // Only parent cycles leave waiters behind. Release them front to
        // back so each released node can still adopt its own waiters.
        loop {
            let next = run
                .waiting
                .values()
                .flatten()
                .copied()
                .min_by_key(|&i| ranks[i]);
            let Some(i) = next else {
                break;
            };
            for queue in run.waiting.values_mut() {
                queue.retain(|&w| w != i);
            }
            run.waiting.retain(|_, queue| !queue.is_empty());
            warn!(id = %self.nodes[i].id, "parent never materialized, attached to root");
            run.stats.flattened += 1;
            self.place(i, root, creator, index, &mut run, root).await;
        }

        let stats = run.stats;
        info!(
            nodes = self.nodes.len(),
            created = stats.created,
            failed = stats.failed,
            orphans = stats.orphans,
            flattened = stats.flattened,
            "hierarchy assembled"
        );
        stats
    }

    fn resolve(
        &self,
        i: usize,
        index: &CreatedIndex,
        states: &[NodeState],
        root: ParentSlot,
    ) -> Resolution {
        let Some(mut parent_id) = self.nodes[i].parent.as_deref().filter(|p| !p.is_empty()) else {
            return Resolution::Attach(root);
        };
        let mut through_held = false;
        for _ in 0..=self.held.len() {
            if index.contains(parent_id) {
                break;
            }
            match self.held.get(parent_id) {
                Some(Some(up)) if !up.is_empty() => {
                    parent_id = *up;
                    through_held = true;
                }
                Some(_) => return Resolution::Flatten(root),
                None => break,
            }
        }
        match self.resolve_declared(i, parent_id, index, states, root) {
            Resolution::Attach(slot) if through_held => Resolution::Flatten(slot),
            resolution => resolution,
        }
    }

    fn resolve_declared(
        &self,
        i: usize,
        parent_id: &str,
        index: &CreatedIndex,
        states: &[NodeState],
        root: ParentSlot,
    ) -> Resolution {
        if let Some(entry) = index.get(parent_id) {
            return if entry.accepts_children {
                Resolution::Attach(entry.as_parent())
            } else {
                Resolution::Flatten(entry.attached_to)
            };
        }
        match self.positions.get(parent_id) {
            Some(&p) if p != i => match states[p] {
                NodeState::Failed => Resolution::Flatten(root),
                _ if self.defer_missing_parents => Resolution::Wait(p),
                _ => Resolution::Flatten(root),
            },
            _ => Resolution::Orphan,
        }
    }

    /// Creates `start` and then, depth first, everything waiting on it.
    async fn place<C: NodeCreator>(
        &self,
        start: usize,
        slot: ParentSlot,
        creator: &mut C,
        index: &mut CreatedIndex,
        run: &mut Run,
        root: ParentSlot,
    ) {
        let mut stack = vec![(start, slot)];
        while let Some((i, slot)) = stack.pop() {
            let node = &self.nodes[i];
            let waiters = run.waiting.remove(&i).unwrap_or_default();

            let Some(created) = creator.create(node, &slot).await else {
                warn!(id = %node.id, "node creation failed, skipped");
                run.states[i] = NodeState::Failed;
                run.stats.failed += 1;
                run.stats.flattened += waiters.len();
                stack.extend(waiters.into_iter().rev().map(|w| (w, root)));
                continue;
            };

            run.states[i] = NodeState::Created;
            let entry = CreatedEntry {
                target: created.target,
                origin_x: node.rect.x,
                origin_y: node.rect.y,
                depth: slot.depth + 1,
                accepts_children: created.accepts_children,
                auto_layout: created.auto_layout,
                attached_to: slot,
            };
            let child_slot = if entry.accepts_children {
                entry.as_parent()
            } else {
                run.stats.flattened += waiters.len();
                slot
            };
            record(&mut run.stats, node, &created, entry.depth);
            index.insert(node.id.clone(), entry);
            stack.extend(waiters.into_iter().rev().map(|w| (w, child_slot)));
        }
    }
}

pub(crate) fn record(stats: &mut ImportStats, node: &IrNode, created: &CreatedNode, depth: usize) {
    stats.created += 1;
    stats.max_depth = stats.max_depth.max(depth);
    if created.placeholder {
        stats.placeholders += 1;
    }
    match node.kind {
        NodeKind::Image => stats.images += 1,
        NodeKind::Text => stats.texts += 1,
        _ => {}
    }
}
