// World state and the engine that schedules it

use slotmap::SlotMap;

use crate::config::SimConfig;
use crate::error::{SetupError, check_interval};
use crate::factory::{DisplayHook, Factory, NullDisplay};
use crate::geom::Vec3;
use crate::nav::{Body, Navigator, SeekNavigator};
use crate::route::TradeMap;
use crate::schedule::Scheduler;
use crate::transporter::{DecisionContext, Transporter};
use crate::types::{Cargo, Continuation, FactoryId, Good, TransporterId};

/// Everything the scheduled tasks read and write: the trade map, the
/// transporters, and the collaborators they talk to.
pub struct World {
    pub config: SimConfig,
    pub time: f32,
    pub map: TradeMap,
    pub transporters: SlotMap<TransporterId, Transporter>,
    nav: Box<dyn Navigator>,
    display: Box<dyn DisplayHook>,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        let nav = SeekNavigator::new(config.transporter_speed);
        Self {
            config,
            time: 0.0,
            map: TradeMap::new(),
            transporters: SlotMap::with_key(),
            nav: Box::new(nav),
            display: Box::new(NullDisplay),
        }
    }

    // === Scheduled tasks ===

    /// Production cadence of one factory.
    pub fn produce(&mut self, id: FactoryId) -> Continuation {
        let Some(factory) = self.map.factory_mut(id) else {
            return Continuation::Stop;
        };
        let produced = factory.produce();
        if produced {
            self.display.inventory_changed(id, factory);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "production",
            time = self.time as f64,
            factory = factory.name.as_str(),
            produced = produced,
            product_count = factory.product_count() as u64,
            resource_count = factory.resource_count() as u64,
        );

        Continuation::Continue
    }

    /// Route refresh cadence.
    pub fn refresh_routes(&mut self) -> Continuation {
        self.map.refresh_all();
        Continuation::Continue
    }

    /// Decision cadence of one transporter.
    pub fn decide(&mut self, id: TransporterId) -> Continuation {
        let Some(transporter) = self.transporters.get_mut(id) else {
            return Continuation::Stop;
        };
        let mut ctx = DecisionContext {
            map: &mut self.map,
            nav: self.nav.as_mut(),
            display: self.display.as_mut(),
            seek_weight: self.config.seek_weight,
        };
        transporter.update_ai(&mut ctx)
    }

    /// Per-tick steering of one transporter.
    pub fn drive(&mut self, id: TransporterId, dt: f32) -> Continuation {
        let Some(transporter) = self.transporters.get_mut(id) else {
            return Continuation::Stop;
        };
        self.nav.drive(id, &mut transporter.body, dt);
        Continuation::Continue
    }

    // === Queries ===

    pub fn transporter(&self, id: TransporterId) -> Option<&Transporter> {
        self.transporters.get(id)
    }

    pub fn transporter_mut(&mut self, id: TransporterId) -> Option<&mut Transporter> {
        self.transporters.get_mut(id)
    }

    pub fn transporter_by_name(&self, name: &str) -> Option<TransporterId> {
        self.transporters
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    /// Cargo units currently in transit.
    pub fn cargo_in_transit(&self) -> usize {
        self.transporters
            .values()
            .filter(|t| t.cargo().is_some())
            .count()
    }
}

// ============================================================================
// Engine - World plus the scheduler that drives it
// ============================================================================

pub struct Engine {
    world: World,
    scheduler: Scheduler<World>,
}

impl Engine {
    pub fn new(config: SimConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let mut scheduler = Scheduler::new();
        scheduler.every("refresh routes", config.route_refresh_interval, |world: &mut World, _| {
            world.refresh_routes()
        })?;
        Ok(Self {
            world: World::new(config),
            scheduler,
        })
    }

    pub fn with_navigator(mut self, nav: impl Navigator + 'static) -> Self {
        self.world.nav = Box::new(nav);
        self
    }

    pub fn with_display(mut self, display: impl DisplayHook + 'static) -> Self {
        self.world.display = Box::new(display);
        self
    }

    /// Register a factory, create its routes and start its production cadence.
    pub fn add_factory(&mut self, factory: Factory) -> Result<FactoryId, SetupError> {
        let interval = check_interval("production_interval", factory.production_interval)?;
        if self.world.map.factory_by_name(&factory.name).is_some() {
            return Err(SetupError::DuplicateName(factory.name));
        }

        let task_name = format!("produce {}", factory.name);
        let id = self.world.map.add_factory(factory);
        if let Some(factory) = self.world.map.factory(id) {
            self.world.display.inventory_changed(id, factory);
        }
        self.scheduler
            .every(task_name, interval, move |world: &mut World, _| world.produce(id))?;
        Ok(id)
    }

    /// Register a transporter and start its decision and steering tasks.
    pub fn add_transporter(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
    ) -> Result<TransporterId, SetupError> {
        self.add_transporter_with(name, position, None)
    }

    /// Like `add_transporter`, but already carrying one unit of `cargo`.
    pub fn add_transporter_with(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
        cargo: Option<Good>,
    ) -> Result<TransporterId, SetupError> {
        let name = name.into();
        if self.world.transporter_by_name(&name).is_some() {
            return Err(SetupError::DuplicateName(name));
        }

        let body = Body {
            position,
            radius: self.world.config.transporter_radius,
        };
        let task_name = name.clone();
        let id = self.world.transporters.insert_with_key(|id| {
            let transporter = Transporter::new(id, name, body);
            match cargo {
                Some(good) => transporter.with_cargo(Cargo::new(good)),
                None => transporter,
            }
        });

        self.scheduler.every(
            format!("decide {task_name}"),
            self.world.config.decision_interval,
            move |world: &mut World, _| world.decide(id),
        )?;
        self.scheduler
            .every_tick(format!("drive {task_name}"), move |world: &mut World, dt| {
                world.drive(id, dt)
            });
        Ok(id)
    }

    /// Advance simulated time by one tick of length `dt`. A tick that is not
    /// a positive, finite length is ignored.
    pub fn advance(&mut self, dt: f32) {
        if !is_valid_step(dt) {
            return;
        }
        self.world.time += dt;
        self.scheduler.advance(&mut self.world, dt);
    }

    /// Advance in fixed ticks until `duration` has elapsed. Returns the
    /// number of ticks run; a bad `dt` or `duration` runs none.
    pub fn run_for(&mut self, duration: f32, dt: f32) -> u64 {
        if !is_valid_step(dt) || !duration.is_finite() || duration <= 0.0 {
            return 0;
        }
        let ticks = (duration / dt).round() as u64;
        for _ in 0..ticks {
            self.advance(dt);
        }
        ticks
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn time(&self) -> f32 {
        self.world.time
    }

    pub fn scheduler(&self) -> &Scheduler<World> {
        &self.scheduler
    }
}

fn is_valid_step(dt: f32) -> bool {
    dt.is_finite() && dt > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingDisplay(Rc<RefCell<u32>>);

    impl DisplayHook for CountingDisplay {
        fn inventory_changed(&mut self, _id: FactoryId, _factory: &Factory) {
            *self.0.borrow_mut() += 1;
        }
    }

    fn source(config: &SimConfig, name: &str) -> Factory {
        Factory::new(name, Vec3::ZERO, None, Good::Raw, config).unwrap()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        let config = engine.world().config.clone();
        engine.add_factory(source(&config, "mine")).unwrap();
        assert!(matches!(
            engine.add_factory(source(&config, "mine")),
            Err(SetupError::DuplicateName(_))
        ));

        engine.add_transporter("red", Vec3::ZERO).unwrap();
        assert!(engine.add_transporter("red", Vec3::ZERO).is_err());
    }

    #[test]
    fn bad_production_interval_is_rejected() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        let config = engine.world().config.clone();
        let factory = source(&config, "mine").with_production_interval(-1.0);
        assert!(matches!(
            engine.add_factory(factory),
            Err(SetupError::InvalidInterval { .. })
        ));
        assert_eq!(engine.world().map.factories().count(), 0);
    }

    #[test]
    fn production_runs_on_its_cadence() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        let config = engine.world().config.clone();
        let id = engine.add_factory(source(&config, "mine")).unwrap();

        engine.run_for(4.9, 0.1);
        assert_eq!(engine.world().map.factory(id).unwrap().product_count(), 0);
        engine.run_for(0.2, 0.1);
        assert_eq!(engine.world().map.factory(id).unwrap().product_count(), 1);
        engine.run_for(10.0, 0.1);
        assert_eq!(engine.world().map.factory(id).unwrap().product_count(), 3);
    }

    #[test]
    fn display_hook_sees_inventory_changes() {
        let display = CountingDisplay::default();
        let calls = display.0.clone();
        let mut engine = Engine::new(SimConfig::default())
            .unwrap()
            .with_display(display);
        let config = engine.world().config.clone();
        engine.add_factory(source(&config, "mine")).unwrap();
        assert_eq!(*calls.borrow(), 1, "initial draw");

        engine.run_for(10.0, 0.5);
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn transporter_walks_to_pickup_and_loads() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        let config = engine.world().config.clone();
        engine
            .add_factory(source(&config, "mine").with_stock(0, 1))
            .unwrap();
        engine
            .add_factory(
                Factory::new(
                    "smelter",
                    vec3(6.0, 0.0, 0.0),
                    Some(Good::Raw),
                    Good::Intermediate,
                    &config,
                )
                .unwrap(),
            )
            .unwrap();
        let red = engine.add_transporter("red", vec3(-6.0, 0.0, 0.0)).unwrap();

        // ~6 units to the pickup at 2 units per time unit, plus decision latency
        engine.run_for(4.0, 0.1);
        assert_eq!(engine.world().cargo_in_transit(), 1);
        let t = engine.world().transporter(red).unwrap();
        assert_eq!(t.cargo_good(), Some(Good::Raw));

        engine.run_for(4.0, 0.1);
        assert_eq!(engine.world().cargo_in_transit(), 0);
        let smelter = engine.world().map.factory_by_name("smelter").unwrap();
        let smelter = engine.world().map.factory(smelter).unwrap();
        assert_eq!(smelter.resource_count() + smelter.product_count(), 1);
    }

    #[test]
    fn scheduler_tracks_registered_tasks() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        let config = engine.world().config.clone();
        engine.add_factory(source(&config, "mine")).unwrap();
        engine.add_transporter("red", Vec3::ZERO).unwrap();
        let names: Vec<&str> = engine.scheduler().task_names().collect();
        assert_eq!(
            names,
            vec!["refresh routes", "produce mine", "decide red", "drive red"]
        );
    }

    #[test]
    fn bad_time_steps_are_ignored() {
        let mut engine = Engine::new(SimConfig::default()).unwrap();
        assert_eq!(engine.run_for(1.0, 0.0), 0);
        assert_eq!(engine.run_for(1.0, -0.1), 0);
        assert_eq!(engine.run_for(f32::INFINITY, 0.1), 0);
        assert_eq!(engine.run_for(1.0, f32::NAN), 0);

        engine.advance(-1.0);
        engine.advance(f32::NAN);
        assert_eq!(engine.time(), 0.0);
        assert_eq!(engine.scheduler().ticks(), 0);

        assert_eq!(engine.run_for(1.0, 0.1), 10);
        assert!((engine.time() - 1.0).abs() < 1e-4);
    }
}
