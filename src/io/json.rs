// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! JSON mesh interchange

use crate::geometry::Mesh;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write the mesh (vertices with normals and texcoords, tagged polygons) as JSON
pub fn export_json(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create JSON file: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), mesh).context("Failed to write JSON mesh")?;
    Ok(())
}

pub fn import_json(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open JSON file: {:?}", path))?;
    let mesh = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON mesh: {:?}", path))?;
    Ok(mesh)
}
