//! Message-driven import session.
//!
//! [`Importer`] consumes the inbound messages of one import in order and
//! turns them into host calls. Streamed images are held back until their
//! chunks are complete; on completion the importer waits a bounded time for
//! outstanding transfers before substituting placeholders.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use strata_ir::{
    FontRequest, ImportEvent, ImportMessage, InboundMessage, IrBatch, IrNode, LegacyMessage,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ImportStats;
use crate::assembler::{self, CreatedEntry, CreatedNode, HierarchyAssembler, ParentSlot};
use crate::error::{ImportError, Result};
use crate::fonts::{normalize_family, resolve, weight_value};
use crate::host::Host;
use crate::materialize::Materializer;
use crate::session::{ImportSession, PendingImage};
use crate::settings::ImportSettings;
use crate::tokens::materialize_tokens;

pub struct Importer<H: Host> {
    host: H,
    session: ImportSession,
    settings: ImportSettings,
}

fn is_completion(message: &InboundMessage) -> bool {
    matches!(
        message,
        InboundMessage::Streaming(ImportMessage::Complete { .. })
            | InboundMessage::Legacy(LegacyMessage::Complete {})
    )
}

impl<H: Host> Importer<H> {
    pub fn new(host: H, settings: ImportSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            host,
            session: ImportSession::new(settings.chunk_timeout),
            settings,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn stats(&self) -> ImportStats {
        self.session.stats
    }

    /// Parses and handles one JSON message. Malformed input is reported
    /// to the status sink and otherwise ignored.
    pub async fn handle_json(&mut self, source: &str) {
        match InboundMessage::from_json(source) {
            Ok(message) => self.handle(message).await,
            Err(err) => self.report("message", ImportError::MalformedMessage(err)),
        }
    }

    /// Handles one message. Errors never escape: they are logged and
    /// surfaced as an `ERROR` event, and the session keeps going.
    pub async fn handle(&mut self, message: InboundMessage) {
        let kind = message.kind();
        debug!(kind, "handling message");
        if let Err(err) = self.dispatch(message).await {
            self.report(kind, err);
        }
    }

    /// Drives a whole import from a channel until the sender side closes.
    ///
    /// On completion the importer keeps receiving for up to the drain
    /// timeout while streamed images are still missing bytes, then finishes
    /// with placeholders for whatever did not arrive.
    pub async fn run(&mut self, rx: &mut mpsc::Receiver<InboundMessage>) -> ImportStats {
        while let Some(message) = rx.recv().await {
            if is_completion(&message) {
                self.drain(rx).await;
            }
            self.handle(message).await;
        }
        self.session.stats
    }

    async fn drain(&mut self, rx: &mut mpsc::Receiver<InboundMessage>) {
        if !self.session.has_pending_images() {
            return;
        }
        let deadline = Instant::now() + self.settings.drain_timeout;
        info!(
            pending = self.session.pending_images.len(),
            "waiting for image transfers"
        );
        while self.session.has_pending_images() {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    pending = self.session.pending_images.len(),
                    "image transfers did not finish in time"
                );
                break;
            }
            let wait = self.settings.poll_interval.min(deadline - now);
            match tokio::time::timeout(wait, rx.recv()).await {
                Ok(Some(message)) if is_completion(&message) => {
                    debug!("repeated completion while draining, ignored");
                }
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => break,
                Err(_) => {}
            }
            self.evict_timed_out().await;
        }
    }

    async fn dispatch(&mut self, message: InboundMessage) -> Result<()> {
        match message {
            InboundMessage::Streaming(message) => match message {
                ImportMessage::Tokens { explicit, implicit } => {
                    self.session.reset();
                    self.apply_tokens(&explicit, &implicit);
                }
                ImportMessage::Fonts { fonts, font_faces } => {
                    self.begin();
                    self.load_fonts(fonts.iter().chain(font_faces.iter())).await?;
                }
                ImportMessage::Nodes { nodes } => self.import_nodes(nodes).await,
                ImportMessage::ImageChunk {
                    node_id,
                    chunk_index,
                    data,
                    total_chunks,
                } => {
                    self.accept_chunk(&node_id, chunk_index, data.into_bytes(), total_chunks)
                        .await?
                }
                ImportMessage::Complete { .. } => self.complete().await,
                ImportMessage::Progress { message, percent } => {
                    self.host.emit(ImportEvent::Progress { message, percent });
                }
                ImportMessage::Error { message } => {
                    warn!(message = %message, "extraction reported an error");
                    self.host.emit(ImportEvent::Error { message });
                }
            },
            InboundMessage::Legacy(message) => match message {
                LegacyMessage::FullPage { data } => {
                    self.session.reset();
                    if let Some(tokens) = data.tokens {
                        self.apply_tokens(&tokens.explicit, &tokens.implicit);
                    }
                    // A missing font must not keep the page from importing.
                    if let Err(err) = self.load_fonts(data.fonts.iter()).await {
                        self.report("full_page", err);
                    }
                    self.import_nodes(data.nodes).await;
                    self.complete().await;
                }
                LegacyMessage::Tokens { data } => {
                    self.session.reset();
                    self.apply_tokens(&data.explicit, &data.implicit);
                }
                LegacyMessage::NodeChunk {
                    nodes,
                    chunk_index,
                    total_chunks,
                } => {
                    self.import_nodes(nodes).await;
                    if total_chunks > 0 {
                        let done = (chunk_index + 1).min(total_chunks);
                        self.host.emit(ImportEvent::Progress {
                            message: format!("Received chunk {done} of {total_chunks}"),
                            percent: Some(f64::from(done) * 100.0 / f64::from(total_chunks)),
                        });
                    }
                }
                LegacyMessage::Complete {} => self.complete().await,
                LegacyMessage::Error { message } => {
                    warn!(message = %message, "extraction reported an error");
                    self.host.emit(ImportEvent::Error { message });
                }
            },
        }
        Ok(())
    }

    /// A session that already completed starts over on new content.
    fn begin(&mut self) {
        if self.session.completed {
            debug!("new import after completion, resetting session");
            self.session.reset();
        }
    }

    fn report(&mut self, context: &str, err: ImportError) {
        warn!(context, error = %err, "message handling failed");
        self.host.emit(ImportEvent::Error {
            message: format!("{context}: {err}"),
        });
    }

    fn apply_tokens(&mut self, explicit: &BTreeMap<String, Value>, implicit: &BTreeMap<String, Value>) {
        let created = materialize_tokens(
            &mut self.host,
            &mut self.session.variables,
            explicit,
            implicit,
        );
        info!(created, "design tokens imported");
    }

    /// Loads every requested font. Each request goes through the fallback
    /// chain; the first exhausted chain is returned after the rest loaded.
    async fn load_fonts<'m>(&mut self, requests: impl Iterator<Item = &'m FontRequest>) -> Result<()> {
        let default = self.settings.default_font.clone();
        let mut first_error = None;
        for request in requests {
            let family = normalize_family(&request.family, &default.family);
            let weight = request.weight.as_ref().and_then(weight_value);
            let wanted = resolve(&family, request.style.as_deref(), weight);
            if let Err(err) = self.session.fonts.load(&mut self.host, &wanted, &default).await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn import_nodes(&mut self, nodes: Vec<IrNode>) {
        self.begin();
        let batch = IrBatch::new(nodes, self.settings.flatten_pseudo_elements);
        let (streamed, regular): (Vec<IrNode>, Vec<IrNode>) = batch
            .into_nodes()
            .into_iter()
            .partition(IrNode::is_streamed_image);

        let root = ParentSlot::root(self.host.root());
        let mut assembler = HierarchyAssembler::new(&regular, self.settings.defer_missing_parents)
            .holding(&streamed);
        let mut materializer =
            Materializer::new(&mut self.host, &mut self.session.fonts, &self.settings);
        let mut stats = assembler
            .build(&mut materializer, &mut self.session.created, root)
            .await;
        stats.batches = 1;
        self.session.stats.merge(&stats);

        for node in streamed {
            self.hold_image(node).await;
        }

        self.host.emit(ImportEvent::Progress {
            message: format!("Imported {} nodes", self.session.stats.created),
            percent: None,
        });
    }

    /// Parks a streamed image until its bytes are complete.
    async fn hold_image(&mut self, node: IrNode) {
        let id = node.id.clone();
        if self.session.created.contains(&id) || self.session.pending_images.contains_key(&id) {
            debug!(id = %id, "streamed image already known, skipped");
            return;
        }
        self.session.pending_images.insert(
            id.clone(),
            PendingImage {
                node,
                since: Instant::now(),
            },
        );
        if self.session.chunks.is_complete(&id) {
            self.finish_image(&id).await;
        }
    }

    async fn accept_chunk(&mut self, id: &str, index: u32, bytes: Vec<u8>, total: u32) -> Result<()> {
        if self.session.created.contains(id) {
            debug!(id, "chunk for an image already created, dropped");
            return Ok(());
        }
        let added = self.session.chunks.add_chunk(id, index, bytes, total)?;
        if added && self.session.pending_images.contains_key(id) && self.session.chunks.is_complete(id) {
            self.finish_image(id).await;
        }
        Ok(())
    }

    /// Creates a pending image from its reassembled bytes.
    async fn finish_image(&mut self, id: &str) {
        let Some(pending) = self.session.pending_images.remove(id) else {
            return;
        };
        let Some(bytes) = self.session.chunks.assemble(id) else {
            self.session.pending_images.insert(id.to_string(), pending);
            return;
        };
        let parent = self.slot_for(&pending.node);
        let created = Materializer::new(&mut self.host, &mut self.session.fonts, &self.settings)
            .create_image(&pending.node, &parent, &bytes)
            .await;
        self.register_late(&pending.node, parent, created);
    }

    async fn substitute_placeholder(&mut self, node: IrNode) {
        self.session.chunks.discard(&node.id);
        let parent = self.slot_for(&node);
        let created = Materializer::new(&mut self.host, &mut self.session.fonts, &self.settings)
            .create_placeholder(&node, &parent)
            .await;
        self.register_late(&node, parent, created);
    }

    /// Attachment point for a node created outside the batch pass.
    fn slot_for(&mut self, node: &IrNode) -> ParentSlot {
        let root = ParentSlot::root(self.host.root());
        match node.parent.as_deref().filter(|p| !p.is_empty()) {
            None => root,
            Some(parent) => match self.session.created.parent_slot(parent) {
                Some(slot) => slot,
                None => {
                    warn!(id = %node.id, parent, "orphan image attached to root");
                    self.session.stats.orphans += 1;
                    root
                }
            },
        }
    }

    fn register_late(&mut self, node: &IrNode, parent: ParentSlot, created: Option<CreatedNode>) {
        let Some(created) = created else {
            self.session.stats.failed += 1;
            return;
        };
        let depth = parent.depth + 1;
        assembler::record(&mut self.session.stats, node, &created, depth);
        self.session.created.insert(
            node.id.clone(),
            CreatedEntry {
                target: created.target,
                origin_x: node.rect.x,
                origin_y: node.rect.y,
                depth,
                accepts_children: created.accepts_children,
                auto_layout: created.auto_layout,
                attached_to: parent,
            },
        );
    }

    /// Replaces images whose transfer went stale with placeholders.
    async fn evict_timed_out(&mut self) {
        let mut stale = self.session.chunks.cleanup_timed_out();
        let timeout = self.settings.chunk_timeout;
        stale.extend(
            self.session
                .pending_images
                .iter()
                .filter(|(id, pending)| {
                    !self.session.chunks.contains(id.as_str()) && pending.since.elapsed() >= timeout
                })
                .map(|(id, _)| id.clone()),
        );
        for id in stale {
            if let Some(pending) = self.session.pending_images.remove(&id) {
                warn!(id = %id, "image transfer timed out, using placeholder");
                self.substitute_placeholder(pending.node).await;
            }
        }
    }

    async fn complete(&mut self) {
        self.evict_timed_out().await;
        let remaining: Vec<PendingImage> = std::mem::take(&mut self.session.pending_images)
            .into_values()
            .collect();
        if !remaining.is_empty() {
            warn!(count = remaining.len(), "images incomplete at completion, using placeholders");
        }
        for pending in remaining {
            self.substitute_placeholder(pending.node).await;
        }
        self.session.chunks.clear();
        self.session.completed = true;

        let stats = self.session.stats;
        info!(
            created = stats.created,
            failed = stats.failed,
            orphans = stats.orphans,
            placeholders = stats.placeholders,
            "import complete"
        );
        self.host.emit(ImportEvent::Complete { stats });
        self.host.emit(ImportEvent::Notify {
            message: format!("Imported {} nodes", stats.created),
        });
    }
}
