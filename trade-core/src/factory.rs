// Factory - a fixed production node that sells its product and buys its resource

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::SimConfig;
use crate::error::SetupError;
use crate::geom::Vec3;
use crate::types::{Cargo, FactoryId, Good};

/// Alpha of an empty way-point visual.
const EMPTY_ALPHA: f32 = 0.3;

/// How a factory's two way-points should be drawn. Scale also feeds the
/// docking radius, so this is the one piece of display state the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DisplayState {
    pub product_scale: f32,
    pub product_alpha: f32,
    pub resource_scale: f32,
    pub resource_alpha: f32,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            product_scale: 1.0,
            product_alpha: 1.0,
            resource_scale: 1.0,
            resource_alpha: 1.0,
        }
    }
}

impl DisplayState {
    /// Scale grows with √count. An empty way-point keeps its last scale and
    /// fades instead.
    fn refresh(&mut self, product_count: u32, resource_count: Option<u32>) {
        if product_count > 0 {
            self.product_scale = (product_count as f32).sqrt();
            self.product_alpha = 1.0;
        } else {
            self.product_alpha = EMPTY_ALPHA;
        }

        let Some(resource_count) = resource_count else {
            return;
        };
        if resource_count > 0 {
            self.resource_scale = (resource_count as f32).sqrt();
            self.resource_alpha = 1.0;
        } else {
            self.resource_alpha = EMPTY_ALPHA;
        }
    }
}

/// Observer told about every inventory change, for redrawing. Purely
/// observational: nothing it does feeds back into the simulation.
pub trait DisplayHook {
    fn inventory_changed(&mut self, id: FactoryId, factory: &Factory);
}

/// Display hook for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplayHook for NullDisplay {
    fn inventory_changed(&mut self, _id: FactoryId, _factory: &Factory) {}
}

/// A production node. Consumes one unit of `resource_type` (if any) to make
/// one unit of `product_type` on every production cadence.
#[derive(Debug, Clone)]
pub struct Factory {
    pub name: String,
    pub position: Vec3,
    resource_type: Option<Good>,
    product_type: Good,
    resource_count: u32,
    product_count: u32,
    /// Most resource units the factory will hold. `None` is unbounded.
    capacity: Option<u32>,
    pub production_interval: f32,

    product_waypoint: Vec3,
    resource_waypoint: Vec3,
    /// Cargo visual radius in world units at display scale 1
    waypoint_radius: f32,
    display: DisplayState,
}

impl Factory {
    /// Rejects a factory whose resource and product are the same good; such a
    /// factory would be its own supplier.
    pub fn new(
        name: impl Into<String>,
        position: Vec3,
        resource_type: Option<Good>,
        product_type: Good,
        config: &SimConfig,
    ) -> Result<Self, SetupError> {
        let name = name.into();
        if resource_type == Some(product_type) {
            return Err(SetupError::SelfSupplying(name));
        }

        let mut factory = Self {
            name,
            position,
            resource_type,
            product_type,
            resource_count: 0,
            product_count: 0,
            capacity: None,
            production_interval: config.production_interval,
            product_waypoint: position + config.product_waypoint_offset(),
            resource_waypoint: position + config.resource_waypoint_offset(),
            waypoint_radius: config.cargo_model_radius * config.factory_scale,
            display: DisplayState::default(),
        };
        factory.refresh_display();
        Ok(factory)
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self.refresh_display();
        self
    }

    pub fn with_production_interval(mut self, interval: f32) -> Self {
        self.production_interval = interval;
        self
    }

    /// Seed inventory at setup time.
    pub fn with_stock(mut self, resource_count: u32, product_count: u32) -> Self {
        self.resource_count = resource_count;
        self.product_count = product_count;
        self.refresh_display();
        self
    }

    // === Accessors ===

    pub fn resource_type(&self) -> Option<Good> {
        self.resource_type
    }

    pub fn product_type(&self) -> Good {
        self.product_type
    }

    pub fn resource_count(&self) -> u32 {
        self.resource_count
    }

    pub fn product_count(&self) -> u32 {
        self.product_count
    }

    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    pub fn product_waypoint(&self) -> Vec3 {
        self.product_waypoint
    }

    pub fn resource_waypoint(&self) -> Vec3 {
        self.resource_waypoint
    }

    pub fn display(&self) -> DisplayState {
        self.display
    }

    // === Eligibility ===

    pub fn can_sell(&self) -> bool {
        self.product_count > 0
    }

    /// A factory with no resource requirement never takes deliveries.
    pub fn can_buy(&self) -> bool {
        if self.resource_type.is_none() {
            return false;
        }
        match self.capacity {
            Some(capacity) => self.resource_count < capacity,
            None => true,
        }
    }

    /// Whether a delivery of `good` would be accepted right now.
    pub fn accepts(&self, good: Good) -> bool {
        self.can_buy() && self.resource_type == Some(good)
    }

    /// Docking radius around the product way-point.
    pub fn product_radius(&self) -> f32 {
        self.waypoint_radius * self.display.product_scale
    }

    pub fn resource_radius(&self) -> f32 {
        self.waypoint_radius * self.display.resource_scale
    }

    // === Mutation ===

    /// One production step. Returns whether anything was made; a factory
    /// short on resource just waits for the next cadence.
    pub fn produce(&mut self) -> bool {
        if self.resource_type.is_some() {
            if self.resource_count == 0 {
                return false;
            }
            self.resource_count -= 1;
        }
        self.product_count += 1;
        self.refresh_display();
        true
    }

    /// Hand one unit of product to a buyer.
    pub fn sell(&mut self) -> Option<Cargo> {
        if !self.can_sell() {
            return None;
        }
        self.product_count -= 1;
        self.refresh_display();
        Some(Cargo::new(self.product_type))
    }

    /// Take a delivery. A refused cargo is handed back untouched.
    pub fn buy(&mut self, cargo: Cargo) -> Result<(), Cargo> {
        if !self.accepts(cargo.good()) {
            return Err(cargo);
        }
        self.resource_count += 1;
        self.refresh_display();
        Ok(())
    }

    /// Change what the factory consumes. Stock already held is kept but
    /// counts as the new good.
    pub fn retool(&mut self, resource_type: Option<Good>) -> Result<(), SetupError> {
        if resource_type == Some(self.product_type) {
            return Err(SetupError::SelfSupplying(self.name.clone()));
        }
        self.resource_type = resource_type;
        self.refresh_display();
        Ok(())
    }

    fn refresh_display(&mut self) {
        let resource = self.resource_type.map(|_| self.resource_count);
        self.display.refresh(self.product_count, resource);
    }
}
