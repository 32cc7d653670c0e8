// Navigation collaborator: moves transporter bodies toward way-points

use slotmap::SecondaryMap;

use crate::geom::Vec3;
use crate::types::TransporterId;

/// Physical body of a transporter. The decision loop only reads it; the
/// navigator is the one thing that moves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub radius: f32,
}

/// Steering backend. `seek` is fire-and-forget and is repeated every
/// decision cadence until the transporter docks; `drive` runs every tick.
pub trait Navigator {
    fn seek(&mut self, agent: TransporterId, target: Vec3, weight: f32);

    fn drive(&mut self, agent: TransporterId, body: &mut Body, dt: f32);
}

/// Straight-line steering on the ground plane. No obstacle avoidance.
#[derive(Debug, Clone)]
pub struct SeekNavigator {
    pub speed: f32,
    targets: SecondaryMap<TransporterId, (Vec3, f32)>,
}

impl SeekNavigator {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            targets: SecondaryMap::new(),
        }
    }

    pub fn target(&self, agent: TransporterId) -> Option<Vec3> {
        self.targets.get(agent).map(|(target, _)| *target)
    }
}

impl Navigator for SeekNavigator {
    fn seek(&mut self, agent: TransporterId, target: Vec3, weight: f32) {
        self.targets.insert(agent, (target, weight));
    }

    fn drive(&mut self, agent: TransporterId, body: &mut Body, dt: f32) {
        let Some(&(target, weight)) = self.targets.get(agent) else {
            return;
        };
        let remaining = body.position.xy_distance(target);
        if remaining <= f32::EPSILON {
            return;
        }
        let step = (self.speed * weight * dt).min(remaining);
        let dir = Vec3 {
            z: 0.0,
            ..(target - body.position)
        } * (1.0 / remaining);
        body.position = body.position + dir * step;
    }
}
