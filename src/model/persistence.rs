//! Weight snapshots on disk
//!
//! Each save writes `dqn_model_<YYYYmmdd_HHMMSS>.json` and overwrites
//! `latest_model.json` in the same directory. Only the main network is stored;
//! loading installs it into both networks.

use crate::model::dqn::DoubleDqn;
use crate::model::network::{DenseLayer, QNetwork};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const LATEST_SNAPSHOT: &str = "latest_model.json";

/// Serialized form of the main network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub saved_at: DateTime<Utc>,
    pub train_steps: u64,
    pub layers: Vec<DenseLayer>,
}

impl WeightSnapshot {
    /// Copy the main network's current parameters
    pub fn capture(dqn: &DoubleDqn) -> Self {
        Self {
            saved_at: Utc::now(),
            train_steps: dqn.train_steps(),
            layers: dqn.main_network().layers(),
        }
    }

    pub fn into_network(self) -> anyhow::Result<QNetwork> {
        QNetwork::from_layers(self.layers)
    }
}

/// What happened when looking for saved weights
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(PathBuf),
    /// No snapshot on disk; fresh weights kept
    Missing,
    /// Snapshot present but unusable; fresh weights kept
    Rejected(String),
}

/// Write through a uniquely named sibling and rename it into place, so
/// concurrent writers never leave a torn file behind
fn write_json(path: &Path, snapshot: &WeightSnapshot) -> anyhow::Result<()> {
    let staging = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    let file = File::create(&staging)
        .with_context(|| format!("Failed to create file: {}", staging.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, snapshot)
        .with_context(|| format!("Failed to write JSON to {}", staging.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output to {}", staging.display()))?;
    drop(writer);

    fs::rename(&staging, path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    Ok(())
}

/// Write a captured snapshot, returning the path of the timestamped copy
pub fn write_snapshot(snapshot: &WeightSnapshot, dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let filename = format!(
        "dqn_model_{}.json",
        snapshot.saved_at.format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(filename);
    write_json(&path, snapshot)?;
    write_json(&dir.join(LATEST_SNAPSHOT), snapshot)?;

    info!(
        "Saved model weights after {} training steps to {}",
        snapshot.train_steps,
        path.display()
    );
    Ok(path)
}

/// Save the main network, returning the path of the timestamped snapshot
pub fn save_weights(dqn: &DoubleDqn, dir: &Path) -> anyhow::Result<PathBuf> {
    write_snapshot(&WeightSnapshot::capture(dqn), dir)
}

pub fn read_snapshot(path: &Path) -> anyhow::Result<WeightSnapshot> {
    let file =
        File::open(path).with_context(|| format!("Failed to open snapshot: {}", path.display()))?;
    let reader = BufReader::new(file);
    let snapshot = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Ok(snapshot)
}

/// Load `latest_model.json` from `dir` into both networks.
///
/// Never fails: a missing, malformed or wrongly shaped snapshot leaves the
/// current weights in place and is reported through the returned outcome.
pub fn load_latest(dqn: &mut DoubleDqn, dir: &Path) -> LoadOutcome {
    let path = dir.join(LATEST_SNAPSHOT);
    if !path.exists() {
        info!(
            "No saved weights at {}, starting from fresh weights",
            path.display()
        );
        return LoadOutcome::Missing;
    }

    let result = read_snapshot(&path)
        .and_then(WeightSnapshot::into_network)
        .and_then(|network| dqn.load_network(network));
    match result {
        Ok(()) => {
            info!("Loaded model weights from {}", path.display());
            LoadOutcome::Loaded(path)
        }
        Err(e) => {
            warn!(
                "Ignoring unusable weights at {}: {:#}. Starting from fresh weights",
                path.display(),
                e
            );
            LoadOutcome::Rejected(format!("{:#}", e))
        }
    }
}
