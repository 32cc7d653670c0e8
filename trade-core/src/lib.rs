use wasm_bindgen::prelude::*;

mod config;
mod error;
mod factory;
mod geom;
mod nav;
mod route;
mod scenario;
mod schedule;
mod snapshot;
mod transporter;
mod types;
mod world;

pub use config::*;
pub use error::*;
pub use factory::*;
pub use geom::*;
pub use nav::*;
pub use route::*;
pub use scenario::*;
pub use schedule::*;
pub use snapshot::*;
pub use transporter::*;
pub use types::*;
pub use world::*;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Simulation
// ============================================================================

#[wasm_bindgen]
pub struct Simulation {
    engine: Engine,
}

#[wasm_bindgen]
impl Simulation {
    /// An empty world with default tunables
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Simulation, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Ok(Self {
            engine: Engine::new(SimConfig::default())?,
        })
    }

    /// The five-factory demo world
    #[wasm_bindgen]
    pub fn with_reference_world() -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        Ok(Self {
            engine: reference_world(SimConfig::default())?,
        })
    }

    /// The demo world with tunables read from a JSON document
    #[wasm_bindgen]
    pub fn with_config_json(json: &str) -> Result<Simulation, JsError> {
        console_error_panic_hook::set_once();
        let config = SimConfig::from_json(json)?;
        Ok(Self {
            engine: reference_world(config)?,
        })
    }

    /// Advance the simulation by one frame of `dt` time units
    #[wasm_bindgen]
    pub fn advance(&mut self, dt: f32) {
        self.engine.advance(dt);
    }

    #[wasm_bindgen]
    pub fn get_time(&self) -> f32 {
        self.engine.time()
    }

    /// Get a snapshot of the current state for rendering
    #[wasm_bindgen]
    pub fn get_state_snapshot(&self) -> StateSnapshot {
        StateSnapshot::from_world(self.engine.world())
    }

    #[wasm_bindgen]
    pub fn get_snapshot_json(&self) -> Result<String, JsError> {
        Ok(serde_json::to_string(&self.get_state_snapshot())?)
    }

    /// Routes only, for drawing the trade graph overlay
    #[wasm_bindgen]
    pub fn get_routes(&self) -> Result<JsValue, JsError> {
        let routes = self.get_state_snapshot().routes;
        Ok(serde_wasm_bindgen::to_value(&routes)?)
    }
}

impl Simulation {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}
