use std::collections::BTreeSet;

use trade_core::{
    Continuation, Engine, Factory, Good, Leg, SimConfig, TradeMap, Vec3, random_world, vec3,
};

fn factory(name: &str, at: Vec3, resource: Option<Good>, product: Good) -> Factory {
    Factory::new(name, at, resource, product, &SimConfig::default()).unwrap()
}

fn route_names(map: &TradeMap) -> BTreeSet<(String, String)> {
    map.routes()
        .map(|(_, r)| {
            let start = map.factory(r.start).unwrap().name.clone();
            let end = map.factory(r.end).unwrap().name.clone();
            (start, end)
        })
        .collect()
}

/// Total units held by factories and transporters.
fn units(engine: &Engine) -> u32 {
    let world = engine.world();
    let stocked: u32 = world
        .map
        .factories()
        .map(|(_, f)| f.resource_count() + f.product_count())
        .sum();
    stocked + world.cargo_in_transit() as u32
}

#[test]
fn invariant_routes_independent_of_registration_order() {
    let specs = [
        ("mine", None, Good::Raw),
        ("smelter", Some(Good::Raw), Good::Intermediate),
        ("mill", Some(Good::Raw), Good::Intermediate),
        ("works", Some(Good::Intermediate), Good::Finished),
        ("scrapper", Some(Good::Finished), Good::Raw),
    ];

    let mut orders: Vec<Vec<usize>> = Vec::new();
    for rotation in 0..specs.len() {
        let order: Vec<usize> = (0..specs.len())
            .map(|i| (i + rotation) % specs.len())
            .collect();
        orders.push(order.iter().rev().copied().collect());
        orders.push(order);
    }

    let mut expected: Option<BTreeSet<(String, String)>> = None;
    for order in orders {
        let mut map = TradeMap::new();
        for i in order {
            let (name, resource, product) = specs[i];
            map.add_factory(factory(name, Vec3::ZERO, resource, product));
        }
        let routes = route_names(&map);
        assert_eq!(routes.len(), map.route_count(), "no duplicate routes");
        match &expected {
            Some(first) => assert_eq!(&routes, first),
            None => expected = Some(routes),
        }
    }

    // mine, scrapper -> smelter, mill; smelter, mill -> works; works -> scrapper
    assert_eq!(expected.unwrap().len(), 7);
}

#[test]
fn invariant_every_route_matches_goods() {
    let engine = random_world(11, 12, 0, 20.0, SimConfig::default()).unwrap();
    let map = &engine.world().map;
    for (_, route) in map.routes() {
        let start = map.factory(route.start).unwrap();
        let end = map.factory(route.end).unwrap();
        assert_ne!(route.start, route.end);
        assert_eq!(start.product_type(), route.good);
        assert_eq!(end.resource_type(), Some(route.good));
    }
    for (a, fa) in map.factories() {
        for (b, fb) in map.factories() {
            if TradeMap::is_trade_route(fa, fb) {
                assert!(map.find_route(a, b).is_some());
            }
        }
    }
}

#[test]
fn invariant_openness_matches_factories_after_refresh() {
    let mut engine = random_world(3, 10, 4, 15.0, SimConfig::default()).unwrap();
    for _ in 0..20 {
        engine.run_for(1.3, 0.1);
        let map = &mut engine.world_mut().map;
        map.refresh_all();
        for (_, route) in map.routes() {
            let start = map.factory(route.start).unwrap();
            let end = map.factory(route.end).unwrap();
            assert_eq!(route.is_open(), start.can_sell() && end.accepts(route.good));
        }
    }
}

#[test]
fn invariant_units_conserved_without_sources() {
    // Raw -> Intermediate -> Finished -> Raw: every factory consumes, so
    // production only converts units.
    let mut engine = Engine::new(SimConfig::default()).unwrap();
    engine
        .add_factory(
            factory("smelter", vec3(0.0, 0.0, 0.0), Some(Good::Raw), Good::Intermediate)
                .with_stock(3, 2),
        )
        .unwrap();
    engine
        .add_factory(factory(
            "works",
            vec3(12.0, 4.0, 0.0),
            Some(Good::Intermediate),
            Good::Finished,
        ))
        .unwrap();
    engine
        .add_factory(factory(
            "scrapper",
            vec3(-6.0, 10.0, 0.0),
            Some(Good::Finished),
            Good::Raw,
        ))
        .unwrap();
    engine.add_transporter("red", vec3(-5.0, -5.0, 0.0)).unwrap();
    engine.add_transporter("blue", vec3(5.0, 5.0, 0.0)).unwrap();

    assert_eq!(units(&engine), 5);
    for _ in 0..600 {
        engine.advance(0.1);
        assert_eq!(units(&engine), 5, "at t={}", engine.time());
    }
}

#[test]
fn invariant_source_production_adds_one_unit_per_cadence() {
    let mut engine = Engine::new(SimConfig::default()).unwrap();
    engine
        .add_factory(factory("mine", Vec3::ZERO, None, Good::Raw))
        .unwrap();
    engine
        .add_factory(factory(
            "smelter",
            vec3(8.0, 0.0, 0.0),
            Some(Good::Raw),
            Good::Intermediate,
        ))
        .unwrap();
    engine.add_transporter("red", vec3(0.0, 4.0, 0.0)).unwrap();

    // Every production cadence the mine adds one unit; the smelter converts
    // without adding. Ten cadences by t=52.
    engine.run_for(52.0, 0.1);
    assert_eq!(units(&engine), 10);
}

#[test]
fn invariant_transporters_stay_consistent() {
    for seed in 0..5 {
        let mut engine = random_world(seed, 9, 4, 15.0, SimConfig::default()).unwrap();
        for _ in 0..400 {
            engine.advance(0.1);
            let world = engine.world();
            for t in world.transporters.values() {
                assert!(
                    t.is_consistent(&world.map),
                    "seed {seed}: {} at t={} goal={:?} route={:?} cargo={:?}",
                    t.name,
                    world.time,
                    t.goal(),
                    t.trade_route(),
                    t.cargo_good(),
                );
                if let Some(cargo) = t.cargo() {
                    assert_eq!(cargo.carried_by(), Some(t.id));
                }
            }
        }
    }
}

#[test]
fn invariant_idle_decision_is_a_no_op() {
    let mut engine = Engine::new(SimConfig::default()).unwrap();
    // A lone source has no routes at all
    engine
        .add_factory(factory("mine", Vec3::ZERO, None, Good::Raw).with_stock(0, 3))
        .unwrap();
    let red = engine.add_transporter("red", vec3(4.0, 4.0, 0.0)).unwrap();

    for _ in 0..3 {
        assert_eq!(engine.world_mut().decide(red), Continuation::Continue);
        let t = engine.world().transporter(red).unwrap();
        assert_eq!(t.leg(), Leg::Idle);
        assert_eq!(t.trade_route(), None);
        assert_eq!(t.position(), vec3(4.0, 4.0, 0.0));
    }
    assert_eq!(units(&engine), 3);
}

#[test]
fn invariant_failed_pickup_changes_nothing() {
    let mut engine = Engine::new(SimConfig::default()).unwrap();
    let mine = engine
        .add_factory(factory("mine", Vec3::ZERO, None, Good::Raw).with_stock(0, 1))
        .unwrap();
    engine
        .add_factory(factory(
            "smelter",
            vec3(8.0, 0.0, 0.0),
            Some(Good::Raw),
            Good::Intermediate,
        ))
        .unwrap();
    let red = engine.add_transporter("red", vec3(0.0, -6.0, 0.0)).unwrap();
    engine.world_mut().decide(red);
    assert_eq!(engine.world().transporter(red).unwrap().goal(), Some(mine));

    // Someone else empties the mine first
    let _taken = engine.world_mut().map.factory_mut(mine).unwrap().sell();
    let pickup = engine.world().map.factory(mine).unwrap().product_waypoint();
    engine.world_mut().transporters[red].body.position = pickup;
    engine.world_mut().decide(red);

    let world = engine.world();
    let t = world.transporter(red).unwrap();
    assert_eq!(t.cargo_good(), None);
    assert_eq!(t.leg(), Leg::Idle);
    assert_eq!(t.trade_route(), None);
    assert_eq!(world.map.factory(mine).unwrap().product_count(), 0);
}

#[test]
fn invariant_same_seed_same_run() {
    let run = |seed| {
        let mut engine = random_world(seed, 8, 3, 15.0, SimConfig::default()).unwrap();
        engine.run_for(30.0, 0.1);
        let world = engine.world();
        world
            .transporters
            .values()
            .map(|t| (t.name.clone(), t.position().to_array(), t.cargo_good()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
}
