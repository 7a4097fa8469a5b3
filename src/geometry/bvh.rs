// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//!
//! Nodes live in a flat arena and reference their children by index. Leaves
//! own a contiguous range of the reordered item list.

use super::BoundingBox;
use nalgebra::{Point3, Vector3};

const MAX_DEPTH: usize = 32;

/// Leaf capacity used when none is configured
pub const DEFAULT_LEAF_SIZE: usize = 4;

/// Children of a BVH node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BVHNodeKind {
    Internal { left: usize, right: usize },
    Leaf { start: usize, count: usize },
}

/// BVH node
#[derive(Debug, Clone)]
pub struct BVHNode {
    pub bbox: BoundingBox,
    pub kind: BVHNodeKind,
}

/// Bounding Volume Hierarchy over arbitrary boxed items
#[derive(Debug, Clone)]
pub struct BVH {
    nodes: Vec<BVHNode>,
    entries: Vec<(usize, BoundingBox)>,
}

impl BVH {
    /// Build with the default leaf size.
    /// items: Vec of (item_index, bbox) pairs
    pub fn build(items: Vec<(usize, BoundingBox)>) -> Self {
        Self::build_with_leaf_size(items, DEFAULT_LEAF_SIZE)
    }

    pub fn build_with_leaf_size(mut items: Vec<(usize, BoundingBox)>, leaf_size: usize) -> Self {
        let mut nodes = Vec::with_capacity(2 * items.len() / leaf_size.max(1) + 1);
        if !items.is_empty() {
            let count = items.len();
            build_node(&mut nodes, &mut items, 0, count, 0, leaf_size.max(1));
        }
        Self {
            nodes,
            entries: items,
        }
    }

    /// Build over triangles given by their corner positions; item ids are
    /// positions in `triangles`
    pub fn from_triangles(triangles: &[[Point3<f64>; 3]], leaf_size: usize) -> Self {
        let items = triangles
            .iter()
            .enumerate()
            .map(|(i, t)| (i, BoundingBox::from_points(t.iter())))
            .collect();
        Self::build_with_leaf_size(items, leaf_size)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Bounds of all items
    pub fn bounds(&self) -> BoundingBox {
        self.nodes.first().map(|n| n.bbox).unwrap_or_else(BoundingBox::empty)
    }

    /// Items whose boxes touch `bbox`, in ascending id order
    pub fn query_box(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut result = Vec::new();
        if self.nodes.is_empty() {
            return result;
        }

        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bbox.intersects(bbox) {
                continue;
            }
            match node.kind {
                BVHNodeKind::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
                BVHNodeKind::Leaf { start, count } => {
                    result.extend(
                        self.entries[start..start + count]
                            .iter()
                            .filter(|(_, b)| b.intersects(bbox))
                            .map(|(id, _)| *id),
                    );
                }
            }
        }

        result.sort_unstable();
        result
    }

    /// All `(self_item, other_item)` pairs whose boxes, grown by `margin`,
    /// overlap. Both trees are descended together; pairs come back sorted.
    pub fn query_overlaps(&self, other: &BVH, margin: f64) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if self.nodes.is_empty() || other.nodes.is_empty() {
            return pairs;
        }

        let mut stack = vec![(0usize, 0usize)];
        while let Some((a, b)) = stack.pop() {
            let node_a = &self.nodes[a];
            let node_b = &other.nodes[b];
            if !node_a.bbox.expanded(margin).intersects(&node_b.bbox) {
                continue;
            }

            match (node_a.kind, node_b.kind) {
                (BVHNodeKind::Leaf { start: sa, count: ca }, BVHNodeKind::Leaf { start: sb, count: cb }) => {
                    for (ia, box_a) in &self.entries[sa..sa + ca] {
                        let grown = box_a.expanded(margin);
                        for (ib, box_b) in &other.entries[sb..sb + cb] {
                            if grown.intersects(box_b) {
                                pairs.push((*ia, *ib));
                            }
                        }
                    }
                }
                (BVHNodeKind::Internal { left, right }, BVHNodeKind::Leaf { .. }) => {
                    stack.push((left, b));
                    stack.push((right, b));
                }
                (BVHNodeKind::Leaf { .. }, BVHNodeKind::Internal { left, right }) => {
                    stack.push((a, left));
                    stack.push((a, right));
                }
                (
                    BVHNodeKind::Internal { left: la, right: ra },
                    BVHNodeKind::Internal { left: lb, right: rb },
                ) => {
                    // Split the larger node first
                    if node_a.bbox.volume() >= node_b.bbox.volume() {
                        stack.push((la, b));
                        stack.push((ra, b));
                    } else {
                        stack.push((a, lb));
                        stack.push((a, rb));
                    }
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    /// Items whose boxes, grown by `margin`, are entered by the ray
    pub fn query_ray(&self, origin: &Point3<f64>, direction: &Vector3<f64>, margin: f64) -> Vec<usize> {
        let mut result = Vec::new();
        if self.nodes.is_empty() {
            return result;
        }

        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.bbox.expanded(margin).ray_entry(origin, direction).is_none() {
                continue;
            }
            match node.kind {
                BVHNodeKind::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
                BVHNodeKind::Leaf { start, count } => {
                    result.extend(
                        self.entries[start..start + count]
                            .iter()
                            .filter(|(_, b)| b.expanded(margin).ray_entry(origin, direction).is_some())
                            .map(|(id, _)| *id),
                    );
                }
            }
        }

        result.sort_unstable();
        result
    }
}

/// Recursively build the node covering `items[start..end]`; returns its index
fn build_node(
    nodes: &mut Vec<BVHNode>,
    items: &mut [(usize, BoundingBox)],
    start: usize,
    end: usize,
    depth: usize,
    leaf_size: usize,
) -> usize {
    let bbox = items[start..end]
        .iter()
        .fold(BoundingBox::empty(), |acc, (_, b)| acc.union(b));

    let index = nodes.len();
    let count = end - start;
    if count <= leaf_size || depth >= MAX_DEPTH {
        nodes.push(BVHNode {
            bbox,
            kind: BVHNodeKind::Leaf { start, count },
        });
        return index;
    }

    // Longest axis of the centroid bounds
    let centroids = BoundingBox::from_points(
        items[start..end]
            .iter()
            .map(|(_, b)| b.center())
            .collect::<Vec<_>>()
            .iter(),
    );
    let axis = centroids.longest_axis();

    items[start..end].sort_by(|(id_a, a), (id_b, b)| {
        a.center()[axis]
            .total_cmp(&b.center()[axis])
            .then(id_a.cmp(id_b))
    });

    // Reserve the slot before the children so the root stays at index 0
    nodes.push(BVHNode {
        bbox,
        kind: BVHNodeKind::Leaf { start, count },
    });

    let mid = start + count / 2;
    let left = build_node(nodes, items, start, mid, depth + 1, leaf_size);
    let right = build_node(nodes, items, mid, end, depth + 1, leaf_size);
    nodes[index].kind = BVHNodeKind::Internal { left, right };
    index
}
