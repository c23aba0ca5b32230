//! Replays recorded import sessions into an in-memory scene.
//!
//! A session log holds one inbound message per line, exactly as the
//! extraction agent sent them. Blank lines and lines starting with `//` are
//! ignored.

pub mod args;

use std::io::BufRead;

use anyhow::{Context, Result};
use log::{info, warn};
use strata_config::StrataConfig;
use strata_import::{ImportSettings, ImportStats, Importer};
use strata_ir::InboundMessage;
use strata_scene::{FontRegistry, SceneHost};
use tokio::sync::mpsc;

pub use args::Args;

const CHANNEL_CAPACITY: usize = 64;

/// Outcome of one replay.
#[derive(Debug)]
pub struct Replay {
    pub host: SceneHost,
    pub stats: ImportStats,
    /// 1-based numbers of lines that did not parse as a message.
    pub skipped_lines: Vec<usize>,
}

/// Parses a session log. Unparseable lines are logged and reported by
/// number instead of failing the whole replay.
pub fn read_messages<R: BufRead>(reader: R) -> Result<(Vec<InboundMessage>, Vec<usize>)> {
    let mut messages = Vec::new();
    let mut skipped = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        match InboundMessage::from_json(trimmed) {
            Ok(message) => messages.push(message),
            Err(err) => {
                warn!("line {}: not a valid message: {}", index + 1, err);
                skipped.push(index + 1);
            }
        }
    }
    Ok((messages, skipped))
}

/// Font registry for the scene: the given list, or the system fonts.
/// The configured default font is always installed so the fallback chain
/// can terminate.
pub fn font_registry(list: Option<&str>, config: &StrataConfig) -> Result<FontRegistry> {
    let mut fonts = match list {
        Some(list) => FontRegistry::parse_list(list).context("parsing --fonts")?,
        None => FontRegistry::system(),
    };
    fonts.insert(strata_import::FontName::new(
        config.fonts.default_family.clone(),
        config.fonts.default_style.clone(),
    ));
    Ok(fonts)
}

/// Streams `messages` through an importer over `host`, honoring the
/// completion drain.
pub async fn replay(
    messages: Vec<InboundMessage>,
    host: SceneHost,
    settings: ImportSettings,
) -> Result<(SceneHost, ImportStats)> {
    let mut importer = Importer::new(host, settings).context("invalid import settings")?;
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let count = messages.len();

    let producer = async move {
        for message in messages {
            if tx.send(message).await.is_err() {
                break;
            }
        }
    };
    let ((), stats) = tokio::join!(producer, importer.run(&mut rx));
    info!("replayed {} messages, {} nodes created", count, stats.created);
    Ok((importer.into_host(), stats))
}

/// Reads a session log and replays it.
pub async fn replay_reader<R: BufRead>(
    reader: R,
    host: SceneHost,
    settings: ImportSettings,
) -> Result<Replay> {
    let (messages, skipped_lines) = read_messages(reader)?;
    let (host, stats) = replay(messages, host, settings).await?;
    Ok(Replay {
        host,
        stats,
        skipped_lines,
    })
}
