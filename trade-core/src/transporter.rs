// Transporter - a mobile agent running the buy, travel, sell cycle

use crate::factory::{DisplayHook, Factory};
use crate::geom::Vec3;
use crate::nav::{Body, Navigator};
use crate::route::TradeMap;
use crate::types::{Cargo, Continuation, FactoryId, Good, RouteId, TransporterId};

/// Everything a transporter touches while deciding. Borrowed from the
/// world for the duration of one decision.
pub struct DecisionContext<'a> {
    pub map: &'a mut TradeMap,
    pub nav: &'a mut dyn Navigator,
    pub display: &'a mut dyn DisplayHook,
    pub seek_weight: f32,
}

/// Which leg of the errand a transporter is on, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Idle,
    Pickup,
    Delivery,
}

/// A mobile agent that carries at most one unit of cargo at a time.
///
/// Invariant: while a route is committed, an empty transporter only ever
/// targets the route's start and a loaded one only its end. A loaded
/// transporter whose sale was refused drops the route and targets a buyer
/// it found on its own.
#[derive(Debug)]
pub struct Transporter {
    pub id: TransporterId,
    pub name: String,
    pub body: Body,
    cargo: Option<Cargo>,
    trade_route: Option<RouteId>,
    goal: Option<FactoryId>,
}

impl Transporter {
    pub fn new(id: TransporterId, name: impl Into<String>, body: Body) -> Self {
        Self {
            id,
            name: name.into(),
            body,
            cargo: None,
            trade_route: None,
            goal: None,
        }
    }

    /// Start out already holding a unit.
    pub fn with_cargo(mut self, mut cargo: Cargo) -> Self {
        cargo.attach(self.id);
        self.cargo = Some(cargo);
        self
    }

    pub fn cargo(&self) -> Option<&Cargo> {
        self.cargo.as_ref()
    }

    pub fn cargo_good(&self) -> Option<Good> {
        self.cargo.as_ref().map(Cargo::good)
    }

    pub fn trade_route(&self) -> Option<RouteId> {
        self.trade_route
    }

    pub fn goal(&self) -> Option<FactoryId> {
        self.goal
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn leg(&self) -> Leg {
        match (self.goal, &self.cargo) {
            (None, _) => Leg::Idle,
            (Some(_), None) => Leg::Pickup,
            (Some(_), Some(_)) => Leg::Delivery,
        }
    }

    /// Commit to a route from outside the decision loop. Used by setup code
    /// that wants a transporter to start mid-errand.
    pub fn commit(&mut self, route: RouteId, map: &TradeMap) -> bool {
        let Some(r) = map.route(route) else {
            return false;
        };
        let goal = if self.cargo.is_some() { r.end } else { r.start };
        self.trade_route = Some(route);
        self.set_goal(Some(goal), map);
        true
    }

    // === Search ===

    /// Best open route from where we stand: shortest route length plus the
    /// walk to its pickup point. Ties go to the earliest route. A loaded
    /// transporter only considers routes for the good it carries.
    pub fn find_trade_route(&self, map: &TradeMap) -> Option<RouteId> {
        let carrying = self.cargo_good();
        let mut best: Option<(RouteId, f32)> = None;

        for (id, route) in map.routes() {
            if !route.is_open() {
                continue;
            }
            if carrying.is_some_and(|good| good != route.good) {
                continue;
            }
            let Some(start) = map.factory(route.start) else {
                continue;
            };
            let score = route.distance + self.body.position.xy_distance(start.product_waypoint());
            if best.is_none_or(|(_, lowest)| score < lowest) {
                best = Some((id, score));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Closest factory that will take our cargo right now, measured to its
    /// resource way-point. Ignores routes entirely.
    pub fn find_buyer(&self, map: &TradeMap) -> Option<FactoryId> {
        let good = self.cargo_good()?;
        let mut best: Option<(FactoryId, f32)> = None;

        for (id, factory) in map.factories() {
            if !factory.accepts(good) {
                continue;
            }
            let distance = self.body.position.xy_distance(factory.resource_waypoint());
            if best.is_none_or(|(_, lowest)| distance < lowest) {
                best = Some((id, distance));
            }
        }

        best.map(|(id, _)| id)
    }

    // === Decision loop ===

    /// One decision cadence. Always asks to run again: an idle transporter
    /// simply retries next time.
    pub fn update_ai(&mut self, ctx: &mut DecisionContext<'_>) -> Continuation {
        if self.goal.is_none() {
            if self.trade_route.is_none() {
                self.trade_route = self.find_trade_route(ctx.map);
            }
            match self.trade_route.and_then(|id| ctx.map.route(id)) {
                Some(route) => {
                    let goal = if self.cargo.is_some() { route.end } else { route.start };
                    self.set_goal(Some(goal), ctx.map);
                }
                // Loaded with no open route: deliver straight to a buyer
                None => {
                    let Some(buyer) = self.find_buyer(ctx.map) else {
                        return Continuation::Continue;
                    };
                    self.set_goal(Some(buyer), ctx.map);
                }
            }
        }

        let Some(goal_id) = self.goal else {
            return Continuation::Continue;
        };
        let Some(goal) = ctx.map.factory(goal_id) else {
            self.trade_route = None;
            self.set_goal(None, ctx.map);
            return Continuation::Continue;
        };

        if self.cargo.is_some() {
            // Loaded: head for the goal's resource way-point
            let target = goal.resource_waypoint();
            let docking = self.body.radius + goal.resource_radius();
            if self.body.position.xy_distance(target) > docking {
                ctx.nav.seek(self.id, target, ctx.seek_weight);
                return Continuation::Continue;
            }

            self.trade_route = None;
            if self.sell(goal_id, ctx) {
                self.set_goal(None, ctx.map);
            } else {
                let buyer = self.find_buyer(ctx.map);

                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "redirect",
                    agent = self.name.as_str(),
                    refused_by = ctx.map.factory(goal_id).map_or("", |f| f.name.as_str()),
                    found = buyer.is_some(),
                );

                self.set_goal(buyer, ctx.map);
            }
        } else {
            // Empty: head for the goal's product way-point
            let target = goal.product_waypoint();
            let docking = self.body.radius + goal.product_radius();
            if self.body.position.xy_distance(target) > docking {
                ctx.nav.seek(self.id, target, ctx.seek_weight);
                return Continuation::Continue;
            }

            if !self.buy(goal_id, ctx) {
                self.trade_route = None;
            }
            self.set_goal(None, ctx.map);
        }

        Continuation::Continue
    }

    /// Take one unit from `factory`. Nothing changes on failure.
    fn buy(&mut self, factory_id: FactoryId, ctx: &mut DecisionContext<'_>) -> bool {
        let Some(factory) = ctx.map.factory_mut(factory_id) else {
            return false;
        };
        let bought = match factory.sell() {
            Some(mut cargo) => {
                cargo.attach(self.id);
                self.cargo = Some(cargo);
                ctx.display.inventory_changed(factory_id, factory);
                true
            }
            None => false,
        };
        self.log_trade(factory, "buy", factory.product_type(), bought);
        bought
    }

    /// Hand our unit to `factory`. A refused unit stays with us.
    fn sell(&mut self, factory_id: FactoryId, ctx: &mut DecisionContext<'_>) -> bool {
        let Some(mut cargo) = self.cargo.take() else {
            return false;
        };
        let good = cargo.good();
        let Some(factory) = ctx.map.factory_mut(factory_id) else {
            self.cargo = Some(cargo);
            return false;
        };

        cargo.detach();
        let sold = match factory.buy(cargo) {
            Ok(()) => {
                ctx.display.inventory_changed(factory_id, factory);
                true
            }
            Err(mut refused) => {
                refused.attach(self.id);
                self.cargo = Some(refused);
                false
            }
        };
        self.log_trade(factory, "sell", good, sold);
        sold
    }

    fn set_goal(&mut self, goal: Option<FactoryId>, map: &TradeMap) {
        self.goal = goal;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "goal",
            agent = self.name.as_str(),
            goal = goal.and_then(|id| map.factory(id)).map_or("", |f| f.name.as_str()),
        );
        #[cfg(not(feature = "instrument"))]
        let _ = map;
    }

    #[allow(unused_variables)]
    fn log_trade(&self, factory: &Factory, side: &str, good: Good, success: bool) {
        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "trade",
            agent = self.name.as_str(),
            factory = factory.name.as_str(),
            side = side,
            good = ?good,
            success = success,
            product_count = factory.product_count() as u64,
            resource_count = factory.resource_count() as u64,
        );
    }

    /// Whether the goal agrees with the committed route and the cargo.
    pub fn is_consistent(&self, map: &TradeMap) -> bool {
        let Some(goal) = self.goal else {
            return true;
        };
        match (self.trade_route.and_then(|id| map.route(id)), &self.cargo) {
            (Some(route), Some(_)) => goal == route.end,
            (Some(route), None) => goal == route.start,
            // Redirected delivery: the goal must deal in what we carry
            (None, Some(cargo)) => map
                .factory(goal)
                .is_some_and(|f| f.resource_type() == Some(cargo.good())),
            (None, None) => false,
        }
    }
}
