// Ready-made worlds: the five-factory demo and seeded random layouts

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;
use crate::error::SetupError;
use crate::factory::Factory;
use crate::geom::{Vec3, vec3};
use crate::types::Good;
use crate::world::Engine;

/// Two raw sources, two refiners and one finisher, worked by three
/// transporters.
pub fn reference_world(config: SimConfig) -> Result<Engine, SetupError> {
    let mut engine = Engine::new(config.clone())?;

    let factories: [(&str, Vec3, Option<Good>, Good); 5] = [
        ("fac1", vec3(0.0, -5.0, 0.0), None, Good::Raw),
        ("fac2", vec3(7.0, 5.0, 0.0), Some(Good::Raw), Good::Intermediate),
        ("fac3", vec3(8.0, -7.0, 0.0), Some(Good::Raw), Good::Intermediate),
        ("fac4", vec3(-3.0, 8.0, 0.0), Some(Good::Intermediate), Good::Finished),
        ("fac5", vec3(-7.0, -6.0, 0.0), None, Good::Raw),
    ];
    for (name, position, resource, product) in factories {
        engine.add_factory(Factory::new(name, position, resource, product, &config)?)?;
    }

    engine.add_transporter("Mr. Red", vec3(-10.0, 0.0, 0.0))?;
    engine.add_transporter("Mr. Green", vec3(3.0, -3.0, 0.0))?;
    engine.add_transporter("Mr. Blue", vec3(10.0, 3.0, 0.0))?;

    Ok(engine)
}

/// Random layout inside a `half_extent` square around the origin. The same
/// seed always gives the same world.
pub fn random_world(
    seed: u64,
    factories: usize,
    transporters: usize,
    half_extent: f32,
    config: SimConfig,
) -> Result<Engine, SetupError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = Engine::new(config.clone())?;
    let goods: Vec<Good> = Good::all().collect();

    for i in 0..factories {
        let product = goods[rng.random_range(0..goods.len())];
        let resource = if rng.random_bool(0.3) {
            None
        } else {
            let others: Vec<Good> = goods.iter().copied().filter(|g| *g != product).collect();
            Some(others[rng.random_range(0..others.len())])
        };
        let position = random_point(&mut rng, half_extent);
        let stock = rng.random_range(0..3);
        let factory = Factory::new(format!("factory_{i}"), position, resource, product, &config)?
            .with_stock(stock, stock);
        engine.add_factory(factory)?;
    }

    for i in 0..transporters {
        let position = random_point(&mut rng, half_extent);
        engine.add_transporter(format!("transporter_{i}"), position)?;
    }

    Ok(engine)
}

fn random_point(rng: &mut StdRng, half_extent: f32) -> Vec3 {
    vec3(
        rng.random_range(-half_extent..=half_extent),
        rng.random_range(-half_extent..=half_extent),
        0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_world_has_expected_routes() {
        let engine = reference_world(SimConfig::default()).unwrap();
        let map = &engine.world().map;
        assert_eq!(map.factories().count(), 5);
        // fac1, fac5 -> fac2, fac3 and fac2, fac3 -> fac4
        assert_eq!(map.route_count(), 6);
        assert_eq!(engine.world().transporters.len(), 3);
    }

    #[test]
    fn random_world_is_reproducible() {
        let a = random_world(7, 8, 3, 15.0, SimConfig::default()).unwrap();
        let b = random_world(7, 8, 3, 15.0, SimConfig::default()).unwrap();
        let names = |e: &Engine| -> Vec<(String, Option<Good>, Good)> {
            e.world()
                .map
                .factories()
                .map(|(_, f)| (f.name.clone(), f.resource_type(), f.product_type()))
                .collect()
        };
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.world().map.route_count(), b.world().map.route_count());
    }
}
