// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL import and export

use crate::geometry::{Mesh, Polygon, Vertex};
use anyhow::{Context, Result};
use nalgebra::{Point3, Vector2, Vector3};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Import an STL file (binary or ASCII).
///
/// Each facet gets its own three vertices carrying the facet normal; shared
/// positions are re-connected by welding when the mesh is evaluated.
pub fn import_stl(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let stl = stl_io::read_stl(&mut file)
        .with_context(|| format!("Failed to parse STL file: {:?}", path))?;

    let mut mesh = Mesh::with_capacity(stl.faces.len() * 3, stl.faces.len());
    for face in &stl.faces {
        let corners = face.vertices.map(|i| {
            let v = &stl.vertices[i];
            Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)
        });
        let normal = (corners[1] - corners[0])
            .cross(&(corners[2] - corners[0]))
            .try_normalize(1e-300)
            .unwrap_or_else(|| Vector3::new(face.normal[0] as f64, face.normal[1] as f64, face.normal[2] as f64));
        let indices = corners
            .iter()
            .map(|p| mesh.add_vertex(Vertex::new(*p, normal, Vector2::zeros())))
            .collect();
        mesh.add_polygon(Polygon::new(indices, 0));
    }

    Ok(mesh)
}

/// Export a mesh as binary STL; polygons are triangulated first
pub fn export_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let path = path.as_ref();
    let triangles: Vec<StlTriangle> = facets(mesh)
        .into_iter()
        .map(|(normal, [v0, v1, v2])| StlTriangle {
            normal: Normal::new(to_f32(&normal)),
            vertices: [
                StlVertex::new(to_f32(&v0.coords)),
                StlVertex::new(to_f32(&v1.coords)),
                StlVertex::new(to_f32(&v2.coords)),
            ],
        })
        .collect();

    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?,
    );
    stl_io::write_stl(&mut file, triangles.iter()).context("Failed to write STL file")?;
    file.flush().context("Failed to write STL file")?;
    Ok(())
}

/// Export a mesh as ASCII STL
pub fn export_stl_ascii(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?,
    );

    writeln!(file, "solid mesh")?;
    for (normal, corners) in facets(mesh) {
        writeln!(file, "  facet normal {} {} {}", normal.x, normal.y, normal.z)?;
        writeln!(file, "    outer loop")?;
        for p in corners {
            writeln!(file, "      vertex {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(file, "    endloop")?;
        writeln!(file, "  endfacet")?;
    }
    writeln!(file, "endsolid mesh")?;
    file.flush()?;

    Ok(())
}

/// Facet normal and corners of every triangle
fn facets(mesh: &Mesh) -> Vec<(Vector3<f64>, [Point3<f64>; 3])> {
    let triangles = mesh.triangulate();
    triangles
        .polygons
        .iter()
        .map(|p| {
            let corners = [
                triangles.vertices[p.indices[0]].position,
                triangles.vertices[p.indices[1]].position,
                triangles.vertices[p.indices[2]].position,
            ];
            let normal = (corners[1] - corners[0])
                .cross(&(corners[2] - corners[0]))
                .try_normalize(1e-300)
                .unwrap_or_else(Vector3::zeros);
            (normal, corners)
        })
        .collect()
}

fn to_f32(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::is_closed;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_binary_round_trip() -> Result<()> {
        let mesh = Primitive::cube(2.0).to_mesh();
        let file = NamedTempFile::new()?;
        export_stl(&mesh, file.path())?;

        let loaded = import_stl(file.path())?;
        assert_eq!(loaded.polygon_count(), 12);
        assert!(is_closed(&loaded, 1e-6));
        assert_relative_eq!(loaded.volume(), 8.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_ascii_round_trip() -> Result<()> {
        let mesh = Primitive::cylinder(1.0, 0.5, 16).to_mesh();
        let file = NamedTempFile::new()?;
        export_stl_ascii(&mesh, file.path())?;

        let loaded = import_stl(file.path())?;
        assert_eq!(loaded.polygon_count(), mesh.triangle_count());
        assert_relative_eq!(loaded.volume(), mesh.volume(), epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = import_stl("/nonexistent/path/mesh.stl").unwrap_err();
        assert!(err.to_string().contains("Failed to open STL file"));
    }
}
