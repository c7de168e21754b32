//! Offline analytics snapshots
//!
//! A snapshot stores the activities fetched for one company as
//! gzip-compressed bincode, so the analytics can be recomputed later
//! without the backend.

use bincode::{deserialize_from, serialize_into};
use chrono::NaiveDate;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::models::Activity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub company_id: String,
    pub captured_on: NaiveDate,
    pub activities: Vec<Activity>,
}

pub fn save_snapshot(snapshot: &ActivitySnapshot, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, snapshot)?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<ActivitySnapshot> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let snapshot: ActivitySnapshot = deserialize_from(&mut reader)?;
    Ok(snapshot)
}
