// Trade routes and the map that owns them

use std::collections::HashSet;

use slotmap::SlotMap;

use crate::error::SetupError;
use crate::factory::Factory;
use crate::types::{FactoryId, Good, RouteId};

// ============================================================================
// TradeRoute - A directed, type-matched edge between two factories
// ============================================================================

#[derive(Debug, Clone)]
pub struct TradeRoute {
    pub start: FactoryId,
    pub end: FactoryId,
    /// The good carried along this route: start's product, end's resource
    pub good: Good,
    /// Static distance from the start's product way-point to the end's
    /// resource way-point
    pub distance: f32,
    open: bool,
}

impl TradeRoute {
    fn new(start: FactoryId, end: FactoryId, factories: &SlotMap<FactoryId, Factory>) -> Self {
        let from = &factories[start];
        let to = &factories[end];
        let mut route = Self {
            start,
            end,
            good: from.product_type(),
            distance: from.product_waypoint().distance(to.resource_waypoint()),
            open: false,
        };
        route.refresh(factories);
        route
    }

    /// Cached viability as of the last refresh. May be stale.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Recompute openness against current factory state. An end that was
    /// retooled away from `good` closes the route.
    pub fn refresh(&mut self, factories: &SlotMap<FactoryId, Factory>) -> bool {
        self.open = match (factories.get(self.start), factories.get(self.end)) {
            (Some(start), Some(end)) => start.can_sell() && end.accepts(self.good),
            _ => false,
        };
        self.open
    }
}

// ============================================================================
// TradeMap - Owns every factory and every route
// ============================================================================

/// The market graph. Only grows: factories and routes are never removed.
/// Iteration over both is in insertion order, which makes route and buyer
/// search deterministic.
#[derive(Debug, Clone, Default)]
pub struct TradeMap {
    factories: SlotMap<FactoryId, Factory>,
    routes: Vec<TradeRoute>,
    edges: HashSet<(FactoryId, FactoryId)>,
}

impl TradeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory and create every route it takes part in.
    pub fn add_factory(&mut self, factory: Factory) -> FactoryId {
        let id = self.factories.insert(factory);
        self.connect(id);
        id
    }

    /// True if `start`'s product is `end`'s resource.
    pub fn is_trade_route(start: &Factory, end: &Factory) -> bool {
        Some(start.product_type()) == end.resource_type()
    }

    /// Scan for routes leaving `id`, then, if it consumes anything, for
    /// routes arriving at it. Pairs that already have a route are skipped.
    fn connect(&mut self, id: FactoryId) {
        let factory = &self.factories[id];
        let mut pairs: Vec<(FactoryId, FactoryId)> = self
            .factories
            .iter()
            .filter(|(_, other)| Self::is_trade_route(factory, other))
            .map(|(other_id, _)| (id, other_id))
            .collect();

        if factory.resource_type().is_some() {
            pairs.extend(
                self.factories
                    .iter()
                    .filter(|(other_id, other)| {
                        *other_id != id && Self::is_trade_route(other, factory)
                    })
                    .map(|(other_id, _)| (other_id, id)),
            );
        }

        for (start, end) in pairs {
            self.add_trade_route(start, end);
        }
    }

    fn add_trade_route(&mut self, start: FactoryId, end: FactoryId) {
        if !self.edges.insert((start, end)) {
            return;
        }
        let route = TradeRoute::new(start, end, &self.factories);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "route",
            route_id = self.routes.len() as u64,
            start = self.factories[start].name.as_str(),
            end = self.factories[end].name.as_str(),
            good = ?route.good,
            distance = route.distance as f64,
            open = route.is_open(),
        );

        self.routes.push(route);
    }

    /// Refresh openness of every route. Returns how many are open.
    pub fn refresh_all(&mut self) -> usize {
        let factories = &self.factories;
        let open = self
            .routes
            .iter_mut()
            .map(|route| route.refresh(factories))
            .filter(|open| *open)
            .count();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "route_refresh",
            routes = self.routes.len() as u64,
            open = open as u64,
        );

        open
    }

    /// Change what a factory consumes. Routes that no longer match stay in
    /// the map and refresh to whatever the factories now report; newly
    /// matching pairs get a route.
    pub fn retool(&mut self, id: FactoryId, resource: Option<Good>) -> Result<bool, SetupError> {
        let Some(factory) = self.factories.get_mut(id) else {
            return Ok(false);
        };
        factory.retool(resource)?;
        self.connect(id);
        Ok(true)
    }

    // === Queries ===

    pub fn factory(&self, id: FactoryId) -> Option<&Factory> {
        self.factories.get(id)
    }

    pub fn factory_mut(&mut self, id: FactoryId) -> Option<&mut Factory> {
        self.factories.get_mut(id)
    }

    pub fn factories(&self) -> impl Iterator<Item = (FactoryId, &Factory)> {
        self.factories.iter()
    }

    pub fn factory_by_name(&self, name: &str) -> Option<FactoryId> {
        self.factories
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    pub fn route(&self, id: RouteId) -> Option<&TradeRoute> {
        self.routes.get(id.0)
    }

    pub fn routes(&self) -> impl Iterator<Item = (RouteId, &TradeRoute)> {
        self.routes.iter().enumerate().map(|(i, r)| (RouteId(i), r))
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn find_route(&self, start: FactoryId, end: FactoryId) -> Option<RouteId> {
        self.routes()
            .find(|(_, r)| r.start == start && r.end == end)
            .map(|(id, _)| id)
    }
}
