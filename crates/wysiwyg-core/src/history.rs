use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentNode;
use crate::dom::DomError;
use crate::frame::{FrameContext, RootKey};
use crate::options::DEFAULT_HISTORY_DELAY_MS;
use crate::range::Range;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history entry refers to unknown root {0}")]
    UnknownRoot(RootKey),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Undo/redo storage shared by every root of a session.
pub trait History {
    /// Records the root's current content. Returns false when nothing changed.
    fn push(&mut self, frame: &FrameContext, force: bool) -> bool;

    /// Restores the previous state and returns the root it belongs to.
    fn undo(&mut self, roots: &mut IndexMap<RootKey, FrameContext>) -> Option<RootKey>;

    fn redo(&mut self, roots: &mut IndexMap<RootKey, FrameContext>) -> Option<RootKey>;

    /// Drops every entry and records each root's current content as baseline.
    fn reset(&mut self, roots: &IndexMap<RootKey, FrameContext>);

    fn reset_delay_time(&mut self, ms: u64);

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    fn destroy(&mut self);
}

/// Selection endpoint stored as a child-index path from the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPoint {
    pub path: Vec<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: RootKey,
    pub content: Vec<ContentNode>,
    pub selection: Option<(SnapshotPoint, SnapshotPoint)>,
}

impl Snapshot {
    pub fn capture(frame: &FrameContext) -> Self {
        let doc = &frame.doc;
        let point = |node, offset| {
            doc.path_of(frame.wysiwyg, node)
                .map(|path| SnapshotPoint { path, offset })
        };
        let selection = frame.cached_range().and_then(|r| {
            Some((
                point(r.start_container(), r.start_offset())?,
                point(r.end_container(), r.end_offset())?,
            ))
        });
        Self {
            root: frame.key.clone(),
            content: doc.export_children(frame.wysiwyg),
            selection,
        }
    }

    pub fn restore(&self, frame: &mut FrameContext) -> Result<(), HistoryError> {
        frame.doc.replace_children(frame.wysiwyg, &self.content)?;
        frame.selection = Default::default();
        frame.native.remove_all_ranges();

        let Some((start, end)) = &self.selection else {
            return Ok(());
        };
        let doc = &frame.doc;
        let resolved = doc
            .node_at_path(frame.wysiwyg, &start.path)
            .zip(doc.node_at_path(frame.wysiwyg, &end.path));
        if let Some((s, e)) = resolved
            && let Ok(range) = Range::new(doc, s, start.offset, e, end.offset)
        {
            frame.selection.range = Some(range);
            frame.selection.node = Some(range.end_container());
            frame.native.add_range(range);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Entry {
    snapshot: Snapshot,
    recorded_at: Instant,
}

/// Linear stack of per-root snapshots.
///
/// Pushes that are not forced and land within the delay window of the
/// previous push for the same root replace that entry.
#[derive(Debug)]
pub struct SnapshotHistory {
    stack: Vec<Entry>,
    index: usize,
    baselines: usize,
    delay: Duration,
    // Set after undo/redo so the next push starts a new entry.
    sealed: bool,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DELAY_MS)
    }
}

impl SnapshotHistory {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            stack: Vec::new(),
            index: 0,
            baselines: 0,
            delay: Duration::from_millis(delay_ms),
            sealed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn latest_for(&self, root: &RootKey, upto: usize) -> Option<&Entry> {
        self.stack[..=upto.min(self.stack.len().saturating_sub(1))]
            .iter()
            .rev()
            .find(|e| &e.snapshot.root == root)
    }

    fn apply(
        snapshot: &Snapshot,
        roots: &mut IndexMap<RootKey, FrameContext>,
    ) -> Result<RootKey, HistoryError> {
        let frame = roots
            .get_mut(&snapshot.root)
            .ok_or_else(|| HistoryError::UnknownRoot(snapshot.root.clone()))?;
        snapshot.restore(frame)?;
        Ok(snapshot.root.clone())
    }
}

impl History for SnapshotHistory {
    fn push(&mut self, frame: &FrameContext, force: bool) -> bool {
        let snapshot = Snapshot::capture(frame);
        let now = Instant::now();

        if !self.stack.is_empty()
            && let Some(prev) = self.latest_for(&snapshot.root, self.index)
            && prev.snapshot.content == snapshot.content
        {
            return false;
        }

        self.stack.truncate(self.index + 1);
        let coalesce = !force
            && !self.sealed
            && self.index >= self.baselines
            && self.stack.last().is_some_and(|last| {
                last.snapshot.root == snapshot.root
                    && now.duration_since(last.recorded_at) < self.delay
            });

        if coalesce && let Some(last) = self.stack.last_mut() {
            last.snapshot = snapshot;
            last.recorded_at = now;
        } else {
            self.stack.push(Entry {
                snapshot,
                recorded_at: now,
            });
            self.index = self.stack.len() - 1;
        }
        self.sealed = false;
        true
    }

    fn undo(&mut self, roots: &mut IndexMap<RootKey, FrameContext>) -> Option<RootKey> {
        if !self.can_undo() {
            return None;
        }
        let root = self.stack[self.index].snapshot.root.clone();
        let previous = self.latest_for(&root, self.index - 1)?.snapshot.clone();
        self.index -= 1;
        self.sealed = true;
        match Self::apply(&previous, roots) {
            Ok(root) => Some(root),
            Err(err) => {
                tracing::warn!(error = %err, "undo failed");
                None
            }
        }
    }

    fn redo(&mut self, roots: &mut IndexMap<RootKey, FrameContext>) -> Option<RootKey> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.sealed = true;
        let next = self.stack[self.index].snapshot.clone();
        match Self::apply(&next, roots) {
            Ok(root) => Some(root),
            Err(err) => {
                tracing::warn!(error = %err, "redo failed");
                None
            }
        }
    }

    fn reset(&mut self, roots: &IndexMap<RootKey, FrameContext>) {
        let now = Instant::now();
        self.stack = roots
            .values()
            .map(|frame| Entry {
                snapshot: Snapshot::capture(frame),
                recorded_at: now,
            })
            .collect();
        self.baselines = self.stack.len();
        self.index = self.baselines.saturating_sub(1);
        self.sealed = true;
    }

    fn reset_delay_time(&mut self, ms: u64) {
        self.delay = Duration::from_millis(ms);
    }

    fn can_undo(&self) -> bool {
        self.index >= self.baselines.max(1) && self.index < self.stack.len()
    }

    fn can_redo(&self) -> bool {
        self.index + 1 < self.stack.len()
    }

    fn destroy(&mut self) {
        self.stack.clear();
        self.index = 0;
        self.baselines = 0;
        self.sealed = false;
    }
}
