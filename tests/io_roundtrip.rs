// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Export/import of evaluated meshes

use anyhow::Result;
use nalgebra::Vector3;
use polyframe_csg::io::{compare_meshes, export_json, export_stl, export_stl_ascii, import_json, import_stl};
use polyframe_csg::{evaluate, BooleanOp, Primitive};
use tempfile::tempdir;

#[test]
fn test_stl_roundtrip_of_boolean_result() -> Result<()> {
    let a = Primitive::cube(1.0).to_mesh();
    let b = Primitive::cylinder(2.0, 0.3, 24).to_mesh();
    let result = evaluate(&a, &b, BooleanOp::Subtract)?;

    let dir = tempdir()?;
    let binary = dir.path().join("result.stl");
    let ascii = dir.path().join("result_ascii.stl");
    export_stl(&result, &binary)?;
    export_stl_ascii(&result, &ascii)?;

    for path in [&binary, &ascii] {
        let imported = import_stl(path)?;
        assert_eq!(imported.polygon_count(), result.triangle_count());
        let comparison = compare_meshes(&imported, &result, 1e-5);
        assert!(comparison.passed, "{}: {:?}", path.display(), comparison);
    }
    Ok(())
}

#[test]
fn test_imported_stl_can_be_evaluated() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("cube.stl");
    export_stl(&Primitive::cube(2.0).to_mesh(), &path)?;

    // Facets come back unshared and are welded during evaluation
    let cube = import_stl(&path)?;
    let tool = Primitive::cube(2.0).to_mesh().translated(Vector3::new(1.0, 0.5, 0.25));
    let result = evaluate(&cube, &tool, BooleanOp::Intersect)?;
    assert!((result.volume() - 1.0 * 1.5 * 1.75).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_json_roundtrip() -> Result<()> {
    let a = Primitive::sphere(1.0, 12).to_mesh().with_tag(4);
    let b = Primitive::cube(1.0).to_mesh().translated(Vector3::new(0.8, 0.0, 0.0));
    let result = evaluate(&a, &b, BooleanOp::Union)?;

    let dir = tempdir()?;
    let path = dir.path().join("result.json");
    export_json(&result, &path)?;
    let imported = import_json(&path)?;

    assert_eq!(imported.vertex_count(), result.vertex_count());
    assert_eq!(imported.polygons, result.polygons);
    assert!(compare_meshes(&imported, &result, 1e-12).passed);
    Ok(())
}
