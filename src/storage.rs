use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::body::{Body, Integrator};
use crate::error::{Error, Result};
use crate::lagrange::{LagrangeKind, LagrangePoint};

/// Extension of the streamed record files.
pub const STREAM_EXTENSION: &str = "zst";

/// Classification tag attached to every persisted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyClass {
    BaseBody,
    Alive,
    Dead,
    AttractiveMoving,
    Tracker(LagrangeKind),
}

/// Compact persisted snapshot of one simulated body: enough to replay its
/// trajectory and to reconstruct an equivalent `Body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub class: BodyClass,
    pub mass: f64,
    pub initial_position: Vector3<f64>,
    pub initial_velocity: Vector3<f64>,
    pub fixed: bool,
    pub has_potential: bool,
    pub integrator: Option<Integrator>,
    pub time_survived: f64,
    pub positions: Vec<Vector3<f64>>,
}

impl BodyRecord {
    pub fn from_body(body: &Body, class: BodyClass) -> Self {
        Self {
            class,
            mass: body.mass,
            initial_position: body.initial_position,
            initial_velocity: body.initial_velocity,
            fixed: body.fixed,
            has_potential: body.has_potential,
            integrator: Some(body.integrator),
            time_survived: body.time_survived,
            positions: body.positions.clone(),
        }
    }

    pub fn from_tracker(tracker: &LagrangePoint) -> Self {
        Self {
            class: BodyClass::Tracker(tracker.kind),
            mass: 0.0,
            initial_position: tracker.positions.first().copied().unwrap_or(tracker.position),
            initial_velocity: Vector3::zeros(),
            fixed: false,
            has_potential: false,
            integrator: None,
            // Trackers never die; sort them past any real survivor.
            time_survived: f64::INFINITY,
            positions: tracker.positions.clone(),
        }
    }
}

/// Streams records into a compressed file one object at a time, so a sweep
/// never has to hold every trajectory in one serialized blob.
pub struct RecordWriter {
    encoder: zstd::stream::Encoder<'static, File>,
}

impl RecordWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let encoder = zstd::stream::Encoder::new(file, 0)?;
        Ok(Self { encoder })
    }

    pub fn append(&mut self, record: &BodyRecord) -> Result<()> {
        bincode::serialize_into(&mut self.encoder, record)?;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        let mut file = self.encoder.finish()?;
        file.flush()?;
        Ok(())
    }
}

/// Reads a streamed record file back, tolerating end-of-stream truncation:
/// records are consumed until the stream runs out, not length-prefixed.
pub fn read_records(path: &Path) -> Result<Vec<BodyRecord>> {
    let file = File::open(path)?;
    let mut decoder = zstd::stream::Decoder::new(file)?;
    let mut records = Vec::new();
    loop {
        match bincode::deserialize_from::<_, BodyRecord>(&mut decoder) {
            Ok(record) => records.push(record),
            Err(error) => match *error {
                bincode::ErrorKind::Io(ref io)
                    if io.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                _ => return Err(error.into()),
            },
        }
    }
    Ok(records)
}

pub fn records_path(folder: &Path, stem: &str) -> PathBuf {
    folder.join(format!("{stem}.{STREAM_EXTENSION}"))
}

/// Writes the human-readable `key: value` metadata file.
pub fn write_info(path: &Path, pairs: &[(&str, String)]) -> Result<()> {
    let mut file = File::create(path)?;
    for (key, value) in pairs {
        writeln!(file, "{key}: {value}")?;
    }
    Ok(())
}

/// Parses an `info.txt` back into a key/value map. Values may themselves
/// contain colons; only the first one separates.
pub fn read_info(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path)?;
    let mut info = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some((key, value)) = line.split_once(':') {
            info.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(info)
}

pub fn info_value_f64(info: &HashMap<String, String>, key: &str) -> Result<f64> {
    let value = info
        .get(key)
        .ok_or_else(|| Error::MissingInfoKey(key.to_string()))?;
    value.parse().map_err(|_| Error::MalformedInfoValue {
        key: key.to_string(),
        value: value.clone(),
    })
}

/// Resolves a requested output folder to one that does not exist yet by
/// auto-incrementing a numeric suffix; existing results are never
/// overwritten.
pub fn unique_folder(requested: &str) -> PathBuf {
    let mut candidate = requested.to_string();
    while Path::new(&candidate).exists() {
        candidate = match candidate.rsplit_once('_') {
            Some((stem, suffix)) => match suffix.parse::<u32>() {
                Ok(number) => format!("{stem}_{}", number + 1),
                Err(_) => format!("{candidate}_1"),
            },
            None => format!("{candidate}_1"),
        };
    }
    PathBuf::from(candidate)
}

/// One row of the cross-sweep ledger appended after every dispatch.
#[derive(Debug, Serialize)]
pub struct SweepRecord {
    pub date: String,
    pub folder: String,
    pub simulation_count: usize,
    pub bodies_per_simulation: usize,
    pub integrator: String,
    pub delta_time: f64,
    pub simulation_duration: f64,
    pub positions_saving_frequency: usize,
    pub potential_gradient_limit: f64,
    pub position_limits: String,
    pub velocity_limits: String,
    pub best_time_survived: f64,
    pub failed_work_units: usize,
    pub execution_seconds: f64,
}

/// Appends one record to the sweep ledger, writing the header only when the
/// file is first created.
pub fn append_sweep_record(path: &Path, record: &SweepRecord) -> Result<()> {
    let file_exists = path.exists();
    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
