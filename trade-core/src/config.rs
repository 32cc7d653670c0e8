use serde::{Deserialize, Serialize};

use crate::error::{SetupError, check_interval};
use crate::geom::{Vec3, vec3};

// ============================================================================
// Reference constants
// ============================================================================

/// How often route openness is recomputed. Agents read a view that is at
/// most this stale.
pub const ROUTE_REFRESH_INTERVAL: f32 = 2.0;

/// How often each transporter re-evaluates its errand.
pub const DECISION_INTERVAL: f32 = 0.5;

/// How often each factory tries to turn one resource into one product.
pub const PRODUCTION_INTERVAL: f32 = 5.0;

/// Steering weight passed with every seek command.
pub const SEEK_WEIGHT: f32 = 0.5;

/// Tunables for a simulation run. Every field has a default, so a partial
/// JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub route_refresh_interval: f32,
    pub decision_interval: f32,
    pub production_interval: f32,
    pub seek_weight: f32,

    /// Uniform scale of the factory model. Way-point offsets and radii are
    /// expressed in model space and multiplied by this.
    pub factory_scale: f32,
    pub product_offset: Vec3,
    pub resource_offset: Vec3,
    /// Radius of the cargo visual before any scaling
    pub cargo_model_radius: f32,

    pub transporter_radius: f32,
    /// Units per time unit, used by the built-in navigator
    pub transporter_speed: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            route_refresh_interval: ROUTE_REFRESH_INTERVAL,
            decision_interval: DECISION_INTERVAL,
            production_interval: PRODUCTION_INTERVAL,
            seek_weight: SEEK_WEIGHT,
            factory_scale: 0.2,
            product_offset: vec3(5.0, 0.0, 15.0),
            resource_offset: vec3(-5.0, 0.0, 15.0),
            cargo_model_radius: 1.0,
            transporter_radius: 1.0,
            transporter_speed: 4.0,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        check_interval("route_refresh_interval", self.route_refresh_interval)?;
        check_interval("decision_interval", self.decision_interval)?;
        check_interval("production_interval", self.production_interval)?;
        Ok(())
    }

    /// World-space offset of a factory's product way-point.
    pub fn product_waypoint_offset(&self) -> Vec3 {
        self.product_offset * self.factory_scale
    }

    pub fn resource_waypoint_offset(&self) -> Vec3 {
        self.resource_offset * self.factory_scale
    }
}
