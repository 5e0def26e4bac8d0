use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::gesture::SelectionGesture;
use crate::interval::Interval;
use crate::interval_set::IntervalSet;

/// Files backing one calendar's selection.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub active_path: PathBuf,
    pub gesture_path: PathBuf,
    pub undo_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let active_path = data_dir.join("active.data");
        let gesture_path = data_dir.join("gesture.data");
        let undo_path = data_dir.join("undo.data");

        for path in [&active_path, &gesture_path, &undo_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            active = %active_path.display(),
            gesture = %gesture_path.display(),
            undo = %undo_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            active_path,
            gesture_path,
            undo_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_intervals(&self) -> anyhow::Result<IntervalSet> {
        let intervals: Vec<Interval> =
            load_jsonl(&self.active_path).context("failed to load active.data")?;
        Ok(intervals.into_iter().collect())
    }

    #[tracing::instrument(skip(self, set), fields(count = set.len()))]
    pub fn save_intervals(&self, set: &IntervalSet) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.active_path, set.as_slice())
            .context("failed to save active.data")
    }

    /// The persisted gesture, idle when nothing was stored.
    #[tracing::instrument(skip(self))]
    pub fn load_gesture(&self) -> anyhow::Result<SelectionGesture> {
        let mut entries: Vec<SelectionGesture> =
            load_jsonl(&self.gesture_path).context("failed to load gesture.data")?;
        Ok(entries.pop().unwrap_or_default())
    }

    #[tracing::instrument(skip(self, gesture))]
    pub fn save_gesture(&self, gesture: &SelectionGesture) -> anyhow::Result<()> {
        let entries: &[SelectionGesture] = if gesture.is_idle() {
            &[]
        } else {
            std::slice::from_ref(gesture)
        };
        save_jsonl_atomic(&self.gesture_path, entries).context("failed to save gesture.data")
    }

    #[tracing::instrument(skip(self, before))]
    pub fn push_undo_snapshot(&self, before: &IntervalSet) -> anyhow::Result<()> {
        let mut entries: Vec<IntervalSet> =
            load_jsonl(&self.undo_path).context("failed to load undo.data")?;
        entries.push(before.clone());
        save_jsonl_atomic(&self.undo_path, &entries).context("failed to save undo.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn pop_undo_snapshot(&self) -> anyhow::Result<Option<IntervalSet>> {
        let mut entries: Vec<IntervalSet> =
            load_jsonl(&self.undo_path).context("failed to load undo.data")?;
        let Some(entry) = entries.pop() else {
            return Ok(None);
        };
        save_jsonl_atomic(&self.undo_path, &entries).context("failed to save undo.data")?;
        Ok(Some(entry))
    }

    /// Saves `after` and records `before` for undo. Does nothing when the
    /// two are equal.
    #[tracing::instrument(skip(self, before, after))]
    pub fn commit(&self, before: &IntervalSet, after: &IntervalSet) -> anyhow::Result<bool> {
        if before == after {
            debug!("selection unchanged; nothing to commit");
            return Ok(false);
        }
        self.push_undo_snapshot(before)?;
        self.save_intervals(after)?;
        Ok(true)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(entry);
    }

    debug!(count = out.len(), "loaded entries from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, entries))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, entries: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = entries.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for entry in entries {
        let serialized = serde_json::to_string(entry)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
