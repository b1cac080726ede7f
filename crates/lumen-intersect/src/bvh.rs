//! Bounding Volume Hierarchy for accelerated closest-hit queries.
//!
//! Uses Surface Area Heuristic (SAH) for construction. The tree stores
//! primitive indices only; the primitives themselves stay in the caller's
//! slice, which must be the one the tree was built from.

use log::debug;
use lumen_math::{component, Aabb3, Point3, Tolerance};

use crate::hit::HitRecord;
use crate::primitive::Intersect;
use crate::scene::select_closest;
use crate::Ray;

/// Number of SAH buckets per axis.
const NUM_BUCKETS: usize = 12;

/// Maximum number of primitives in a leaf.
const MAX_LEAF_SIZE: usize = 4;

/// Relative cost of visiting an interior node.
const TRAVERSAL_COST: f64 = 0.125;

/// A BVH node: either a leaf holding primitive indices or an internal node.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Leaf node.
    Leaf {
        /// Bounds of every primitive in the leaf.
        aabb: Aabb3,
        /// Indices into the primitive slice.
        items: Vec<usize>,
    },
    /// Internal node with two children.
    Internal {
        /// Bounds of both children.
        aabb: Aabb3,
        /// Left child node.
        left: Box<BvhNode>,
        /// Right child node.
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Bounding box of this node.
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }

    fn count(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Internal { left, right, .. } => 1 + left.count() + right.count(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Primitive bounds and centroid used during construction.
#[derive(Debug, Clone, Copy)]
struct BuildItem {
    index: usize,
    aabb: Aabb3,
    centroid: Point3,
}

/// Bounding Volume Hierarchy over a slice of primitives.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    len: usize,
}

impl Bvh {
    /// Build a BVH over `primitives` using SAH construction.
    ///
    /// Every primitive box is grown by `tolerance.linear` so that flat
    /// primitives still pass the slab test.
    pub fn build<P: Intersect>(primitives: &[P], tolerance: &Tolerance) -> Self {
        let pad = tolerance.linear;
        let mut items: Vec<BuildItem> = primitives
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let mut aabb = p.bounds();
                aabb.expand(pad);
                BuildItem {
                    index,
                    aabb,
                    centroid: aabb.centroid(),
                }
            })
            .collect();

        let root = if items.is_empty() {
            None
        } else {
            Some(build_node(&mut items))
        };

        let bvh = Self {
            root,
            len: primitives.len(),
        };
        debug!(
            "built BVH over {} primitives: {} nodes, depth {}",
            bvh.len,
            bvh.node_count(),
            bvh.depth()
        );
        bvh
    }

    /// Get a reference to the root node, if any.
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.as_ref()
    }

    /// Number of primitives the tree was built over.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the tree was built over an empty slice.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::count)
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::depth)
    }

    /// Closest hit of `ray`, with the same result as
    /// [`find_closest_hit`](crate::find_closest_hit) over the whole slice.
    ///
    /// Subtrees whose entry distance exceeds the best `t` found so far plus
    /// `tie_tolerance` are skipped; anything closer may still win a tie.
    pub fn find_closest_hit<P: Intersect>(
        &self,
        ray: &Ray,
        primitives: &[P],
        tie_tolerance: f64,
    ) -> Option<HitRecord> {
        debug_assert_eq!(primitives.len(), self.len, "BVH built for another slice");
        let root = self.root.as_ref()?;
        let mut candidates = Vec::new();
        let mut closest_t = f64::INFINITY;
        trace_node_closest(
            ray,
            root,
            primitives,
            tie_tolerance,
            &mut candidates,
            &mut closest_t,
        );
        select_closest(candidates, tie_tolerance)
    }

    /// True if any primitive is hit with `t < max_distance`.
    pub fn any_hit<P: Intersect>(&self, ray: &Ray, primitives: &[P], max_distance: f64) -> bool {
        debug_assert_eq!(primitives.len(), self.len, "BVH built for another slice");
        self.root
            .as_ref()
            .is_some_and(|root| trace_node_any(ray, root, primitives, max_distance))
    }
}

/// Trace a ray, collecting every hit that can still win.
fn trace_node_closest<P: Intersect>(
    ray: &Ray,
    node: &BvhNode,
    primitives: &[P],
    tie_tolerance: f64,
    candidates: &mut Vec<(usize, HitRecord)>,
    closest_t: &mut f64,
) {
    let Some((t_min, _)) = ray.intersect_aabb(node.aabb()) else {
        return;
    };
    // Early out if the box starts beyond anything that could still tie.
    if t_min > *closest_t + tie_tolerance {
        return;
    }

    match node {
        BvhNode::Leaf { items, .. } => {
            for &index in items {
                if let Some(hit) = primitives[index].intersect(ray) {
                    *closest_t = closest_t.min(hit.t);
                    candidates.push((index, hit));
                }
            }
        }
        BvhNode::Internal { left, right, .. } => {
            // Test children in order of AABB distance
            let left_t = ray.intersect_aabb(left.aabb()).map(|(t, _)| t);
            let right_t = ray.intersect_aabb(right.aabb()).map(|(t, _)| t);

            let (first, second) = match (left_t, right_t) {
                (Some(lt), Some(rt)) if rt < lt => (right, Some(left)),
                (Some(_), Some(_)) => (left, Some(right)),
                (Some(_), None) => (left, None),
                (None, Some(_)) => (right, None),
                (None, None) => return,
            };
            trace_node_closest(ray, first, primitives, tie_tolerance, candidates, closest_t);
            if let Some(second) = second {
                trace_node_closest(ray, second, primitives, tie_tolerance, candidates, closest_t);
            }
        }
    }
}

/// Trace a ray, stopping at the first hit closer than `max_distance`.
fn trace_node_any<P: Intersect>(
    ray: &Ray,
    node: &BvhNode,
    primitives: &[P],
    max_distance: f64,
) -> bool {
    match ray.intersect_aabb(node.aabb()) {
        Some((t_min, _)) if t_min < max_distance => {}
        _ => return false,
    }
    match node {
        BvhNode::Leaf { items, .. } => items.iter().any(|&index| {
            primitives[index]
                .intersect(ray)
                .is_some_and(|hit| hit.t < max_distance)
        }),
        BvhNode::Internal { left, right, .. } => {
            trace_node_any(ray, left, primitives, max_distance)
                || trace_node_any(ray, right, primitives, max_distance)
        }
    }
}

/// Build a BVH node recursively using SAH.
fn build_node(items: &mut [BuildItem]) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for item in items.iter() {
        bounds.include_aabb(&item.aabb);
    }

    // Base case: small number of primitives -> leaf
    if items.len() <= MAX_LEAF_SIZE {
        let mut indices: Vec<usize> = items.iter().map(|item| item.index).collect();
        indices.sort_unstable();
        return BvhNode::Leaf {
            aabb: bounds,
            items: indices,
        };
    }

    let mid = match find_best_split(items, &bounds) {
        Some((axis, pos)) => partition_items(items, axis, pos),
        None => 0,
    };

    // Fallback if partition fails: split in the middle by index.
    let mid = if mid == 0 || mid == items.len() {
        items.sort_unstable_by_key(|item| item.index);
        items.len() / 2
    } else {
        mid
    };

    let (left_items, right_items) = items.split_at_mut(mid);
    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left_items)),
        right: Box::new(build_node(right_items)),
    }
}

/// Find the best split axis and position using SAH.
///
/// Returns `None` when every axis is degenerate or no split separates the items.
fn find_best_split(items: &[BuildItem], bounds: &Aabb3) -> Option<(usize, f64)> {
    let extent = bounds.extent();
    let total_area = bounds.surface_area();

    let mut best: Option<(f64, usize, f64)> = None;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = component(&bounds.min, axis);

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for item in items {
            let c = component(&item.centroid, axis);
            let b = ((c - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_aabb(&item.aabb);
        }

        // Sweep to find best split
        for split in 1..NUM_BUCKETS {
            let (left, right) = bucket_bounds.split_at(split);
            let left_count: usize = bucket_counts[..split].iter().sum();
            let right_count: usize = bucket_counts[split..].iter().sum();
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let mut left_bounds = Aabb3::empty();
            left.iter().for_each(|b| left_bounds.include_aabb(b));
            let mut right_bounds = Aabb3::empty();
            right.iter().for_each(|b| right_bounds.include_aabb(b));

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right
            let cost = TRAVERSAL_COST
                + left_bounds.surface_area() / total_area * left_count as f64
                + right_bounds.surface_area() / total_area * right_count as f64;

            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                let pos = axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent;
                best = Some((cost, axis, pos));
            }
        }
    }

    best.map(|(_, axis, pos)| (axis, pos))
}

/// Partition items by centroid along an axis.
fn partition_items(items: &mut [BuildItem], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = items.len();

    while left < right {
        if component(&items[left].centroid, axis) < pos {
            left += 1;
        } else {
            right -= 1;
            items.swap(left, right);
        }
    }

    left
}
