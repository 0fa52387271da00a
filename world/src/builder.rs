//! Procedural city construction.
//!
//! [`build`] turns a [`WorldConfig`] into an immutable [`WorldGeometry`]: the
//! road network and its intersections, rejection-sampled buildings, lamps,
//! trees and street furniture, the batched render surfaces, and the flat
//! collision records the vehicle simulation queries every frame.

use glam::Vec3;
use midnight_drive_core::{
    Axis, CollisionCircle, CollisionRect, ObstacleView, RoadRect, Vec2,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    mesh::{BatchError, BatchedSurface, Material, Primitive, SurfaceBatcher, MAX_SURFACE_VERTICES},
    placement::{
        self, BuildingPlan, Facade, FurnitureKind, FurniturePlan, TreePlan, FLOOR_HEIGHT,
        LAMP_RADIUS,
    },
    roads::{self, RoadNetwork},
};

/// Seed used when the configuration does not provide one.
pub const DEFAULT_WORLD_SEED: u64 = 0x6d69_646e_6967_6874;

const LANE_DASH_SPACING: f32 = 12.0;
const LANE_DASH_LENGTH: f32 = 4.0;
const CURB_WIDTH: f32 = 2.0;
const CURB_HEIGHT: f32 = 0.15;
const SIGNAL_CORNER_OFFSET: f32 = 2.0;
const SIGNAL_POLE_HEIGHT: f32 = 5.0;
const LAMP_POLE_HEIGHT: f32 = 7.0;

/// Parameters that shape the generated city.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for every random decision taken during construction.
    pub seed: u64,
    /// Number of buildings the sampler tries to place.
    pub building_target: usize,
    /// Number of trees the sampler tries to place.
    pub tree_target: usize,
    /// Number of benches and hydrants the sampler tries to place.
    pub furniture_target: usize,
    /// Proposals allowed per requested object before giving up.
    pub attempts_per_object: u32,
    /// Road rectangles the city is laid out around.
    pub road_network: RoadNetwork,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_WORLD_SEED,
            building_target: 160,
            tree_target: 420,
            furniture_target: 90,
            attempts_per_object: 3,
            road_network: RoadNetwork::city_grid(),
        }
    }
}

/// Fatal problems detected while constructing the world.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorldBuildError {
    /// The road network holds no roads at all.
    #[error("road network is empty")]
    EmptyRoadNetwork,
    /// A road is square, non-positive or non-finite and cannot be classified.
    #[error("road {index} has degenerate extents {width} x {depth}")]
    DegenerateRoad {
        /// Position of the road within the network.
        index: usize,
        /// Extent along the X axis.
        width: f32,
        /// Extent along the Z axis.
        depth: f32,
    },
    /// Not a single building could be placed around the road network.
    #[error("no building could be placed after {attempts} attempts")]
    NoPlacementSites {
        /// Proposals spent before giving up.
        attempts: usize,
    },
}

/// Immutable static city produced by [`build`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorldGeometry {
    roads: Vec<RoadRect>,
    intersections: Vec<Vec2>,
    buildings: Vec<CollisionRect>,
    trees: Vec<CollisionCircle>,
    lamps: Vec<CollisionCircle>,
    signal_posts: Vec<Vec2>,
    surfaces: Vec<BatchedSurface>,
    skipped: Vec<BatchError>,
}

impl WorldGeometry {
    /// Road rectangles in declaration order.
    #[must_use]
    pub fn roads(&self) -> &[RoadRect] {
        &self.roads
    }

    /// Points where roads cross.
    #[must_use]
    pub fn intersections(&self) -> &[Vec2] {
        &self.intersections
    }

    /// Building collision rectangles, footprint plus clearance.
    #[must_use]
    pub fn buildings(&self) -> &[CollisionRect] {
        &self.buildings
    }

    /// Tree collision circles.
    #[must_use]
    pub fn trees(&self) -> &[CollisionCircle] {
        &self.trees
    }

    /// Street-lamp collision circles.
    #[must_use]
    pub fn lamps(&self) -> &[CollisionCircle] {
        &self.lamps
    }

    /// Ground positions of every traffic-signal post.
    #[must_use]
    pub fn signal_posts(&self) -> &[Vec2] {
        &self.signal_posts
    }

    /// Batched render surfaces, at most one per [`Material`].
    #[must_use]
    pub fn surfaces(&self) -> &[BatchedSurface] {
        &self.surfaces
    }

    /// Visual categories that were dropped because batching failed.
    #[must_use]
    pub fn skipped_surfaces(&self) -> &[BatchError] {
        &self.skipped
    }

    /// Read-only collision view for the vehicle simulation.
    #[must_use]
    pub fn obstacles(&self) -> ObstacleView<'_> {
        ObstacleView::new(&self.buildings, &self.trees, &self.lamps)
    }
}

/// Builds the city described by `config` with the default surface budget.
pub fn build(config: &WorldConfig) -> Result<WorldGeometry, WorldBuildError> {
    build_with_budget(config, MAX_SURFACE_VERTICES)
}

/// Builds the city, limiting every batched surface to `vertex_budget` vertices.
pub fn build_with_budget(
    config: &WorldConfig,
    vertex_budget: usize,
) -> Result<WorldGeometry, WorldBuildError> {
    config.road_network.validate()?;
    let roads = config.road_network.roads();
    let intersections = config.road_network.intersections();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let building_plans = placement::sample(
        "buildings",
        config.building_target,
        config.attempts_per_object,
        || BuildingPlan::propose(&mut rng),
        |candidate, accepted| {
            candidate.clear_of_roads(roads) && candidate.clear_of_buildings(accepted)
        },
    );
    if building_plans.is_empty() {
        return Err(WorldBuildError::NoPlacementSites {
            attempts: config
                .building_target
                .saturating_mul(config.attempts_per_object.max(1) as usize),
        });
    }
    let buildings: Vec<CollisionRect> = building_plans
        .iter()
        .map(BuildingPlan::collision_rect)
        .collect();

    let mut lamp_centers: Vec<Vec2> = Vec::new();
    for candidate in placement::lamp_candidates(roads, &mut rng) {
        if placement::lamp_is_clear(candidate, roads, &buildings, &lamp_centers) {
            lamp_centers.push(candidate);
        }
    }
    let lamps: Vec<CollisionCircle> = lamp_centers
        .iter()
        .map(|center| CollisionCircle::new(center.x, center.y, LAMP_RADIUS))
        .collect();

    let tree_plans = placement::sample(
        "trees",
        config.tree_target,
        config.attempts_per_object,
        || TreePlan::propose(&mut rng),
        |candidate, accepted| candidate.is_clear(roads, &buildings, &lamps, accepted),
    );
    let trees: Vec<CollisionCircle> = tree_plans
        .iter()
        .map(TreePlan::collision_circle)
        .collect();

    let furniture = placement::sample(
        "furniture",
        config.furniture_target,
        config.attempts_per_object,
        || FurniturePlan::propose(roads, &mut rng),
        |candidate, _| {
            candidate
                .as_ref()
                .map_or(false, |plan| plan.is_clear(roads, &buildings, &lamps))
        },
    );

    let signal_posts = signal_posts(&intersections);

    let mut batcher = SurfaceBatcher::new(vertex_budget);
    for road in roads {
        emit_road(&mut batcher, road, &intersections);
    }
    for plan in &building_plans {
        emit_building(&mut batcher, plan);
    }
    for center in &lamp_centers {
        emit_lamp(&mut batcher, *center);
    }
    for plan in &tree_plans {
        emit_tree(&mut batcher, plan);
    }
    for plan in furniture.iter().flatten() {
        emit_furniture(&mut batcher, plan);
    }
    for post in &signal_posts {
        emit_signal(&mut batcher, *post);
    }

    let primitive_count = batcher.primitive_count();
    let batches = batcher.finish();

    tracing::info!(
        seed = config.seed,
        roads = roads.len(),
        intersections = intersections.len(),
        buildings = buildings.len(),
        trees = trees.len(),
        lamps = lamps.len(),
        primitives = primitive_count,
        surfaces = batches.surfaces.len(),
        "world built"
    );

    Ok(WorldGeometry {
        roads: roads.to_vec(),
        intersections,
        buildings,
        trees,
        lamps,
        signal_posts,
        surfaces: batches.surfaces,
        skipped: batches.skipped,
    })
}

fn signal_posts(intersections: &[Vec2]) -> Vec<Vec2> {
    let offset = roads::ROAD_WIDTH * 0.5 + SIGNAL_CORNER_OFFSET;
    intersections
        .iter()
        .flat_map(|center| {
            [
                Vec2::new(-offset, -offset),
                Vec2::new(offset, -offset),
                Vec2::new(offset, offset),
                Vec2::new(-offset, offset),
            ]
            .map(|corner| *center + corner)
        })
        .collect()
}

fn ground_box(center: Vec2, base: f32, half_extents: Vec3) -> Primitive {
    Primitive::cuboid(
        Vec3::new(center.x, base + half_extents.y, center.y),
        half_extents,
    )
}

fn emit_road(batcher: &mut SurfaceBatcher, road: &RoadRect, intersections: &[Vec2]) {
    batcher.push(
        Material::Asphalt,
        ground_box(
            road.center(),
            -0.1,
            Vec3::new(road.width * 0.5, 0.05, road.depth * 0.5),
        ),
    );

    let along_half = road.length() * 0.5;
    let across = road.thickness() * 0.5 + CURB_WIDTH * 0.5;
    for side in [-1.0, 1.0] {
        let center = placement::road_point(road, 0.0, side * across);
        let half = match road.axis() {
            Axis::Horizontal => Vec3::new(along_half, CURB_HEIGHT * 0.5, CURB_WIDTH * 0.5),
            Axis::Vertical => Vec3::new(CURB_WIDTH * 0.5, CURB_HEIGHT * 0.5, along_half),
        };
        batcher.push(Material::Sidewalk, ground_box(center, 0.0, half));
    }

    let dash_half = match road.axis() {
        Axis::Horizontal => Vec3::new(LANE_DASH_LENGTH * 0.5, 0.01, 0.15),
        Axis::Vertical => Vec3::new(0.15, 0.01, LANE_DASH_LENGTH * 0.5),
    };
    let dash_count = (road.length() / LANE_DASH_SPACING).floor() as u32;
    for step in 0..dash_count {
        let along = -along_half + LANE_DASH_SPACING * (step as f32 + 0.5);
        let point = placement::road_point(road, along, 0.0);
        if roads::near_intersection(point, intersections, road.thickness()) {
            continue;
        }
        batcher.push(Material::LaneMarking, ground_box(point, 0.0, dash_half));
    }
}

fn emit_building(batcher: &mut SurfaceBatcher, plan: &BuildingPlan) {
    let half = plan.half_extents;
    batcher.push(
        plan.facade,
        ground_box(plan.center, 0.0, Vec3::new(half.x, plan.height * 0.5, half.y)),
    );

    let band_depth = 0.15;
    for floor in 1..plan.floors() {
        let base = floor as f32 * FLOOR_HEIGHT - FLOOR_HEIGHT * 0.6;
        let band = 0.6;
        let bands = [
            (Vec2::new(0.0, half.y), Vec3::new(half.x * 0.85, band, band_depth)),
            (Vec2::new(0.0, -half.y), Vec3::new(half.x * 0.85, band, band_depth)),
            (Vec2::new(half.x, 0.0), Vec3::new(band_depth, band, half.y * 0.85)),
            (Vec2::new(-half.x, 0.0), Vec3::new(band_depth, band, half.y * 0.85)),
        ];
        for (offset, band_half) in bands {
            batcher.push(
                Material::Window,
                ground_box(plan.center + offset, base, band_half),
            );
        }
    }

    batcher.push(
        Material::Ledge,
        ground_box(
            plan.center,
            plan.height,
            Vec3::new(half.x + 0.3, 0.25, half.y + 0.3),
        ),
    );

    let (door_offset, door_half) = match plan.door {
        Facade::North => (Vec2::new(0.0, half.y), Vec3::new(1.1, 1.3, 0.2)),
        Facade::South => (Vec2::new(0.0, -half.y), Vec3::new(1.1, 1.3, 0.2)),
        Facade::East => (Vec2::new(half.x, 0.0), Vec3::new(0.2, 1.3, 1.1)),
        Facade::West => (Vec2::new(-half.x, 0.0), Vec3::new(0.2, 1.3, 1.1)),
    };
    batcher.push(
        Material::Door,
        ground_box(plan.center + door_offset, 0.0, door_half),
    );

    for unit in &plan.rooftop_units {
        batcher.push(
            Material::Rooftop,
            ground_box(plan.center + *unit, plan.height, Vec3::new(1.5, 1.0, 1.5)),
        );
    }
}

fn emit_lamp(batcher: &mut SurfaceBatcher, center: Vec2) {
    let base = Vec3::new(center.x, 0.0, center.y);
    batcher.push(
        Material::LampPole,
        Primitive::frustum(base, 0.18, 0.12, LAMP_POLE_HEIGHT, 6),
    );
    batcher.push(
        Material::LampHead,
        ground_box(center, LAMP_POLE_HEIGHT, Vec3::new(0.5, 0.2, 0.5)),
    );
}

fn emit_tree(batcher: &mut SurfaceBatcher, plan: &TreePlan) {
    let base = Vec3::new(plan.center.x, 0.0, plan.center.y);
    batcher.push(
        Material::TreeTrunk,
        Primitive::frustum(base, 0.35, 0.25, plan.trunk_height, 6),
    );
    batcher.push(
        Material::TreeFoliage,
        Primitive::frustum(
            base + Vec3::new(0.0, plan.trunk_height * 0.8, 0.0),
            plan.canopy_radius,
            0.0,
            plan.canopy_height,
            8,
        ),
    );
}

fn emit_furniture(batcher: &mut SurfaceBatcher, plan: &FurniturePlan) {
    match plan.kind {
        FurnitureKind::Bench => {
            let half = match plan.axis {
                Axis::Horizontal => Vec3::new(1.0, 0.25, 0.35),
                Axis::Vertical => Vec3::new(0.35, 0.25, 1.0),
            };
            batcher.push(Material::Furniture, ground_box(plan.center, 0.2, half));
        }
        FurnitureKind::Hydrant => {
            batcher.push(
                Material::Furniture,
                Primitive::frustum(Vec3::new(plan.center.x, 0.0, plan.center.y), 0.25, 0.2, 0.8, 6),
            );
        }
    }
}

fn emit_signal(batcher: &mut SurfaceBatcher, post: Vec2) {
    batcher.push(
        Material::SignalPole,
        Primitive::frustum(Vec3::new(post.x, 0.0, post.y), 0.15, 0.12, SIGNAL_POLE_HEIGHT, 6),
    );
    batcher.push(
        Material::SignalPole,
        ground_box(post, SIGNAL_POLE_HEIGHT, Vec3::new(0.35, 1.0, 0.35)),
    );
    let lenses = [
        (Material::SignalRed, 1.45),
        (Material::SignalYellow, 0.95),
        (Material::SignalGreen, 0.45),
    ];
    for (material, height) in lenses {
        batcher.push(
            material,
            ground_box(post, SIGNAL_POLE_HEIGHT + height, Vec3::splat(0.22)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(seed: u64) -> WorldConfig {
        WorldConfig {
            seed,
            building_target: 40,
            tree_target: 80,
            furniture_target: 20,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn equal_seeds_build_equal_worlds() {
        let first = build(&small_config(7)).expect("world builds");
        let second = build(&small_config(7)).expect("world builds");
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_build_different_layouts() {
        let first = build(&small_config(1)).expect("world builds");
        let second = build(&small_config(2)).expect("world builds");
        assert_ne!(first.buildings(), second.buildings());
    }

    #[test]
    fn default_city_stays_within_surface_bound() {
        let geometry = build(&WorldConfig::default()).expect("world builds");
        assert!(geometry.surfaces().len() <= Material::ALL.len());
        assert!(geometry.skipped_surfaces().is_empty());
        assert!(geometry.buildings().len() > 40);
        assert!(geometry.trees().len() > 100);
        assert!(!geometry.lamps().is_empty());
        let primitives: usize = geometry
            .surfaces()
            .iter()
            .map(BatchedSurface::primitive_count)
            .sum();
        assert!(primitives > 1_000);
    }

    #[test]
    fn every_intersection_gets_four_signal_posts() {
        let geometry = build(&small_config(3)).expect("world builds");
        assert_eq!(
            geometry.signal_posts().len(),
            geometry.intersections().len() * 4
        );
    }

    #[test]
    fn collision_rects_include_clearance() {
        let geometry = build(&small_config(11)).expect("world builds");
        for building in geometry.buildings() {
            assert!(building.half_width >= 6.0 + placement::BUILDING_CLEARANCE);
            assert!(building.half_depth >= 6.0 + placement::BUILDING_CLEARANCE);
        }
    }

    #[test]
    fn overfull_targets_yield_a_sparser_world() {
        let config = WorldConfig {
            building_target: 5_000,
            attempts_per_object: 1,
            tree_target: 10,
            furniture_target: 0,
            ..WorldConfig::default()
        };
        let geometry = build(&config).expect("shortfall is not an error");
        assert!(!geometry.buildings().is_empty());
        assert!(geometry.buildings().len() < 5_000);
    }

    #[test]
    fn city_covered_by_road_has_no_placement_sites() {
        let config = WorldConfig {
            road_network: RoadNetwork::new(vec![RoadRect::new(0.0, 0.0, 1_000.0, 999.0)]),
            building_target: 10,
            ..WorldConfig::default()
        };
        assert_eq!(
            build(&config),
            Err(WorldBuildError::NoPlacementSites { attempts: 30 })
        );
    }

    #[test]
    fn tight_vertex_budget_skips_categories_but_keeps_collision() {
        let reference = build(&small_config(5)).expect("world builds");
        let starved = build_with_budget(&small_config(5), 2_000).expect("world builds");
        assert!(!starved.skipped_surfaces().is_empty());
        assert!(starved.surfaces().len() < reference.surfaces().len());
        assert_eq!(starved.buildings(), reference.buildings());
        assert_eq!(starved.trees(), reference.trees());
        assert_eq!(starved.lamps(), reference.lamps());
    }

    #[test]
    fn world_config_reads_partial_toml() {
        let config: WorldConfig = toml::from_str("seed = 12\nbuilding_target = 3\n")
            .expect("config parses");
        assert_eq!(config.seed, 12);
        assert_eq!(config.building_target, 3);
        assert_eq!(config.tree_target, WorldConfig::default().tree_target);
        assert_eq!(config.road_network, RoadNetwork::city_grid());
    }
}
