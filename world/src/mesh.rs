//! Static geometry batching.
//!
//! Every decorative or structural shape the builder emits is a small
//! [`Primitive`] tagged with a [`Material`]. The [`SurfaceBatcher`] merges all
//! primitives that share a material into a single [`BatchedSurface`], so the
//! number of renderable surfaces is bounded by the number of materials no
//! matter how many objects the city contains.

use std::{collections::BTreeMap, f32::consts::TAU};

use glam::Vec3;
use thiserror::Error;

/// Largest number of vertices a single merged surface may hold.
pub const MAX_SURFACE_VERTICES: usize = 1 << 20;

/// Visual material groups, listed in back-to-front top-down draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Material {
    /// Curb strips along both road edges.
    Sidewalk,
    /// Road surface.
    Asphalt,
    /// Dashed lane markings.
    LaneMarking,
    /// Benches and hydrants.
    Furniture,
    /// Tree trunks.
    TreeTrunk,
    /// Building entrances.
    Door,
    /// Concrete facade palette.
    FacadeConcrete,
    /// Brick facade palette.
    FacadeBrick,
    /// Steel and glass facade palette.
    FacadeSteel,
    /// Window bands, one per floor.
    Window,
    /// Roof ledges.
    Ledge,
    /// Rooftop machinery.
    Rooftop,
    /// Street-lamp poles.
    LampPole,
    /// Street-lamp heads.
    LampHead,
    /// Signal poles and housings.
    SignalPole,
    /// Red signal lens.
    SignalRed,
    /// Yellow signal lens.
    SignalYellow,
    /// Green signal lens.
    SignalGreen,
    /// Tree canopies.
    TreeFoliage,
}

impl Material {
    /// Every material in draw order.
    pub const ALL: [Material; 19] = [
        Self::Sidewalk,
        Self::Asphalt,
        Self::LaneMarking,
        Self::Furniture,
        Self::TreeTrunk,
        Self::Door,
        Self::FacadeConcrete,
        Self::FacadeBrick,
        Self::FacadeSteel,
        Self::Window,
        Self::Ledge,
        Self::Rooftop,
        Self::LampPole,
        Self::LampHead,
        Self::SignalPole,
        Self::SignalRed,
        Self::SignalYellow,
        Self::SignalGreen,
        Self::TreeFoliage,
    ];

    /// Materials that glow on their own once night falls.
    #[must_use]
    pub const fn is_emissive(self) -> bool {
        matches!(
            self,
            Self::Window | Self::LampHead | Self::SignalRed | Self::SignalYellow | Self::SignalGreen
        )
    }
}

/// Small static shape emitted by the world builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    /// Axis-aligned box.
    Box {
        /// Center of the box.
        center: Vec3,
        /// Half extents along each axis.
        half_extents: Vec3,
    },
    /// Upright truncated cone standing on `base`; a zero top radius yields a cone.
    Frustum {
        /// Center of the bottom ring.
        base: Vec3,
        /// Radius of the bottom ring.
        bottom_radius: f32,
        /// Radius of the top ring.
        top_radius: f32,
        /// Distance between the rings.
        height: f32,
        /// Number of side facets.
        segments: u32,
    },
}

impl Primitive {
    /// Creates an axis-aligned box primitive.
    #[must_use]
    pub const fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::Box {
            center,
            half_extents,
        }
    }

    /// Creates an upright frustum primitive.
    #[must_use]
    pub const fn frustum(
        base: Vec3,
        bottom_radius: f32,
        top_radius: f32,
        height: f32,
        segments: u32,
    ) -> Self {
        Self::Frustum {
            base,
            bottom_radius,
            top_radius,
            height,
            segments,
        }
    }

    /// Number of vertices the primitive contributes to a merged mesh.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match *self {
            Self::Box { .. } => 24,
            Self::Frustum {
                top_radius,
                segments,
                ..
            } => {
                let ring = segments.max(3) as usize + 1;
                let cap = if top_radius > 0.0 { ring + 1 } else { 0 };
                ring * 2 + cap
            }
        }
    }

    fn append_to(&self, mesh: &mut MeshBuffers) {
        match *self {
            Self::Box {
                center,
                half_extents,
            } => append_box(mesh, center, half_extents),
            Self::Frustum {
                base,
                bottom_radius,
                top_radius,
                height,
                segments,
            } => append_frustum(mesh, base, bottom_radius, top_radius, height, segments.max(3)),
        }
    }
}

/// Indexed triangle mesh with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Vertex normals, parallel to `positions`.
    pub normals: Vec<Vec3>,
    /// Triangle list indices into `positions`.
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    fn with_capacity(vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(vertices * 3 / 2),
        }
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        index
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let first = self.push_vertex(corners[0], normal);
        let _ = self.push_vertex(corners[1], normal);
        let _ = self.push_vertex(corners[2], normal);
        let _ = self.push_vertex(corners[3], normal);
        self.indices
            .extend_from_slice(&[first, first + 1, first + 2, first, first + 2, first + 3]);
    }

    /// Iterator over every triangle as three world-space corners.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |triangle| {
            [
                self.positions[triangle[0] as usize],
                self.positions[triangle[1] as usize],
                self.positions[triangle[2] as usize],
            ]
        })
    }
}

fn append_box(mesh: &mut MeshBuffers, center: Vec3, half: Vec3) {
    let min = center - half;
    let max = center + half;
    let faces = [
        (
            Vec3::Y,
            [
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(max.x, max.y, min.z),
            ],
        ),
        (
            Vec3::NEG_Y,
            [
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(min.x, min.y, max.z),
            ],
        ),
        (
            Vec3::X,
            [
                Vec3::new(max.x, min.y, min.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(max.x, min.y, max.z),
            ],
        ),
        (
            Vec3::NEG_X,
            [
                Vec3::new(min.x, min.y, max.z),
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(min.x, min.y, min.z),
            ],
        ),
        (
            Vec3::Z,
            [
                Vec3::new(max.x, min.y, max.z),
                Vec3::new(max.x, max.y, max.z),
                Vec3::new(min.x, max.y, max.z),
                Vec3::new(min.x, min.y, max.z),
            ],
        ),
        (
            Vec3::NEG_Z,
            [
                Vec3::new(min.x, min.y, min.z),
                Vec3::new(min.x, max.y, min.z),
                Vec3::new(max.x, max.y, min.z),
                Vec3::new(max.x, min.y, min.z),
            ],
        ),
    ];

    for (normal, corners) in faces {
        mesh.push_quad(corners, normal);
    }
}

fn append_frustum(
    mesh: &mut MeshBuffers,
    base: Vec3,
    bottom_radius: f32,
    top_radius: f32,
    height: f32,
    segments: u32,
) {
    let slope = (bottom_radius - top_radius) / height.max(f32::EPSILON);
    let first = mesh.positions.len() as u32;
    for step in 0..=segments {
        let angle = step as f32 / segments as f32 * TAU;
        let (sin, cos) = angle.sin_cos();
        let normal = Vec3::new(cos, slope, sin).normalize_or_zero();
        let _ = mesh.push_vertex(
            base + Vec3::new(cos * bottom_radius, 0.0, sin * bottom_radius),
            normal,
        );
        let _ = mesh.push_vertex(
            base + Vec3::new(cos * top_radius, height, sin * top_radius),
            normal,
        );
    }
    for step in 0..segments {
        let bottom = first + step * 2;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;
        mesh.indices
            .extend_from_slice(&[bottom, top, next_top, bottom, next_top, next_bottom]);
    }

    if top_radius <= 0.0 {
        return;
    }

    let top_center = base + Vec3::new(0.0, height, 0.0);
    let hub = mesh.push_vertex(top_center, Vec3::Y);
    for step in 0..=segments {
        let angle = step as f32 / segments as f32 * TAU;
        let (sin, cos) = angle.sin_cos();
        let _ = mesh.push_vertex(
            top_center + Vec3::new(cos * top_radius, 0.0, sin * top_radius),
            Vec3::Y,
        );
    }
    for step in 0..segments {
        let rim = hub + 1 + step;
        mesh.indices.extend_from_slice(&[hub, rim + 1, rim]);
    }
}

/// Reasons a material group could not be merged into a surface.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The merged surface would exceed the per-surface vertex budget.
    #[error("{material:?} needs {vertices} vertices but a surface holds at most {budget}")]
    VertexBudgetExceeded {
        /// Material whose group overflowed.
        material: Material,
        /// Vertices the group would need.
        vertices: usize,
        /// Configured per-surface limit.
        budget: usize,
    },
}

/// One renderable unit holding every primitive of a single material.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchedSurface {
    material: Material,
    primitive_count: usize,
    mesh: MeshBuffers,
}

impl BatchedSurface {
    /// Material shared by every triangle of the surface.
    #[must_use]
    pub const fn material(&self) -> Material {
        self.material
    }

    /// Number of primitives merged into the surface.
    #[must_use]
    pub const fn primitive_count(&self) -> usize {
        self.primitive_count
    }

    /// Merged mesh buffers.
    #[must_use]
    pub const fn mesh(&self) -> &MeshBuffers {
        &self.mesh
    }

    /// Number of vertices in the merged mesh.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.mesh.positions.len()
    }

    /// Number of triangles in the merged mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.mesh.indices.len() / 3
    }
}

/// Result of merging every material group.
#[derive(Clone, Debug, Default)]
pub struct Batches {
    /// Surfaces that merged successfully, in material order.
    pub surfaces: Vec<BatchedSurface>,
    /// Groups that were skipped together with the reason.
    pub skipped: Vec<BatchError>,
}

/// Collects primitives per material and merges them on [`SurfaceBatcher::finish`].
#[derive(Clone, Debug)]
pub struct SurfaceBatcher {
    vertex_budget: usize,
    groups: BTreeMap<Material, Vec<Primitive>>,
}

impl Default for SurfaceBatcher {
    fn default() -> Self {
        Self::new(MAX_SURFACE_VERTICES)
    }
}

impl SurfaceBatcher {
    /// Creates a batcher enforcing the provided per-surface vertex budget.
    #[must_use]
    pub fn new(vertex_budget: usize) -> Self {
        Self {
            vertex_budget,
            groups: BTreeMap::new(),
        }
    }

    /// Queues a primitive under the provided material.
    pub fn push(&mut self, material: Material, primitive: Primitive) {
        self.groups.entry(material).or_default().push(primitive);
    }

    /// Number of primitives queued so far across all materials.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Merges every group, skipping those that cannot be merged.
    #[must_use]
    pub fn finish(self) -> Batches {
        let mut batches = Batches::default();
        for (material, primitives) in self.groups {
            match merge(material, &primitives, self.vertex_budget) {
                Ok(surface) => batches.surfaces.push(surface),
                Err(error) => {
                    tracing::warn!(%error, "skipping visual category");
                    batches.skipped.push(error);
                }
            }
        }
        batches
    }
}

/// Merges primitives sharing `material` into one surface.
pub fn merge(
    material: Material,
    primitives: &[Primitive],
    vertex_budget: usize,
) -> Result<BatchedSurface, BatchError> {
    let vertices: usize = primitives.iter().map(Primitive::vertex_count).sum();
    if vertices > vertex_budget || vertices > u32::MAX as usize {
        return Err(BatchError::VertexBudgetExceeded {
            material,
            vertices,
            budget: vertex_budget,
        });
    }

    let mut mesh = MeshBuffers::with_capacity(vertices);
    for primitive in primitives {
        primitive.append_to(&mut mesh);
    }
    debug_assert_eq!(mesh.positions.len(), vertices);

    Ok(BatchedSurface {
        material,
        primitive_count: primitives.len(),
        mesh,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_vertex_count_matches_emitted_geometry() {
        let primitive = Primitive::cuboid(Vec3::ZERO, Vec3::ONE);
        let surface = merge(Material::FacadeBrick, &[primitive], MAX_SURFACE_VERTICES)
            .expect("box merges");
        assert_eq!(surface.vertex_count(), primitive.vertex_count());
        assert_eq!(surface.triangle_count(), 12);
    }

    #[test]
    fn frustum_vertex_count_matches_emitted_geometry() {
        let cone = Primitive::frustum(Vec3::ZERO, 2.0, 0.0, 4.0, 8);
        let trunk = Primitive::frustum(Vec3::ZERO, 0.4, 0.3, 2.0, 6);
        let surface =
            merge(Material::TreeFoliage, &[cone, trunk], MAX_SURFACE_VERTICES).expect("merges");
        assert_eq!(
            surface.vertex_count(),
            cone.vertex_count() + trunk.vertex_count()
        );
        assert!(surface
            .mesh()
            .indices
            .iter()
            .all(|index| (*index as usize) < surface.vertex_count()));
    }

    #[test]
    fn box_top_face_points_up() {
        let surface = merge(
            Material::Asphalt,
            &[Primitive::cuboid(Vec3::ZERO, Vec3::new(2.0, 0.1, 3.0))],
            MAX_SURFACE_VERTICES,
        )
        .expect("merges");
        let upward = surface
            .mesh()
            .triangles()
            .filter(|[a, b, c]| (*b - *a).cross(*c - *a).y > 0.0)
            .count();
        assert_eq!(upward, 2);
    }

    #[test]
    fn batcher_emits_one_surface_per_material() {
        let mut batcher = SurfaceBatcher::default();
        for index in 0..500 {
            let center = Vec3::new(index as f32, 0.0, 0.0);
            batcher.push(Material::Window, Primitive::cuboid(center, Vec3::ONE));
            batcher.push(Material::Ledge, Primitive::cuboid(center, Vec3::ONE));
        }
        assert_eq!(batcher.primitive_count(), 1_000);
        let batches = batcher.finish();
        assert_eq!(batches.surfaces.len(), 2);
        assert!(batches.skipped.is_empty());
        assert_eq!(batches.surfaces[0].material(), Material::Window);
        assert_eq!(batches.surfaces[0].primitive_count(), 500);
    }

    #[test]
    fn over_budget_group_is_skipped_without_affecting_others() {
        let mut batcher = SurfaceBatcher::new(48);
        for _ in 0..3 {
            batcher.push(Material::Window, Primitive::cuboid(Vec3::ZERO, Vec3::ONE));
        }
        batcher.push(Material::Door, Primitive::cuboid(Vec3::ZERO, Vec3::ONE));
        let batches = batcher.finish();
        assert_eq!(batches.surfaces.len(), 1);
        assert_eq!(batches.surfaces[0].material(), Material::Door);
        assert_eq!(
            batches.skipped,
            vec![BatchError::VertexBudgetExceeded {
                material: Material::Window,
                vertices: 72,
                budget: 48,
            }]
        );
    }
}
