use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::factory::DisplayState;
use crate::types::{Good, KeyToU64};
use crate::world::World;

// ============================================================================
// Serializable State Snapshot for JS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct StateSnapshot {
    pub time: f32,
    pub factories: Vec<FactorySnapshot>,
    pub routes: Vec<RouteSnapshot>,
    pub transporters: Vec<TransporterSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct FactorySnapshot {
    pub id: u64,
    pub name: String,
    pub position: [f32; 3],
    pub resource_type: Option<Good>,
    pub product_type: Good,
    pub resource_count: u32,
    pub product_count: u32,
    pub display: DisplayState,
    /// RGBA of the product way-point visual
    pub product_color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct RouteSnapshot {
    pub id: usize,
    pub start: u64,
    pub end: u64,
    pub good: Good,
    pub distance: f32,
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TransporterSnapshot {
    pub id: u64,
    pub name: String,
    pub position: [f32; 3],
    pub cargo: Option<Good>,
    pub cargo_color: Option<[f32; 4]>,
    pub goal: Option<u64>,
    pub route: Option<usize>,
}

impl StateSnapshot {
    pub fn from_world(world: &World) -> Self {
        let factories = world
            .map
            .factories()
            .map(|(id, f)| FactorySnapshot {
                id: id.to_u64(),
                name: f.name.clone(),
                position: f.position.to_array(),
                resource_type: f.resource_type(),
                product_type: f.product_type(),
                resource_count: f.resource_count(),
                product_count: f.product_count(),
                display: f.display(),
                product_color: f.product_type().color(),
            })
            .collect();

        let routes = world
            .map
            .routes()
            .map(|(id, r)| RouteSnapshot {
                id: id.0,
                start: r.start.to_u64(),
                end: r.end.to_u64(),
                good: r.good,
                distance: r.distance,
                open: r.is_open(),
            })
            .collect();

        let transporters = world
            .transporters
            .iter()
            .map(|(id, t)| TransporterSnapshot {
                id: id.to_u64(),
                name: t.name.clone(),
                position: t.position().to_array(),
                cargo: t.cargo_good(),
                cargo_color: t.cargo_good().map(Good::color),
                goal: t.goal().map(KeyToU64::to_u64),
                route: t.trade_route().map(|r| r.0),
            })
            .collect();

        Self {
            time: world.time,
            factories,
            routes,
            transporters,
        }
    }
}
