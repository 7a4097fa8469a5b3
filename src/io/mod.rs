// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - importing, exporting and comparing meshes

mod compare;
mod json;
mod stl;

pub use compare::{compare_meshes, MeshComparison};
pub use json::{export_json, import_json};
pub use stl::{export_stl, export_stl_ascii, import_stl};
