use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct FactoryId;
    pub struct TransporterId;
}

/// Trait for converting SlotMap keys to u64 for WASM boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for FactoryId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for TransporterId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

/// Position of a route in the trade map. Routes are never removed, so the
/// index doubles as creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub usize);

// ============================================================================
// Goods - The cargo types that flow between factories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Good {
    Raw,
    Intermediate,
    Finished,
}

impl Good {
    /// Returns an iterator over all goods
    pub fn all() -> impl Iterator<Item = Good> {
        [Good::Raw, Good::Intermediate, Good::Finished].into_iter()
    }

    /// Display colour of the cargo visual (RGBA).
    pub fn color(self) -> [f32; 4] {
        match self {
            Good::Raw => [1.0, 0.0, 0.0, 1.0],
            Good::Intermediate => [0.0, 1.0, 0.0, 1.0],
            Good::Finished => [0.0, 0.0, 1.0, 1.0],
        }
    }
}

// ============================================================================
// Cargo - A single unit of a good in transit
// ============================================================================

/// One transportable unit. Deliberately not `Clone`: a unit has exactly one
/// owner at a time.
#[derive(Debug, PartialEq, Eq)]
pub struct Cargo {
    good: Good,
    carried_by: Option<TransporterId>,
}

impl Cargo {
    pub fn new(good: Good) -> Self {
        Self {
            good,
            carried_by: None,
        }
    }

    pub fn good(&self) -> Good {
        self.good
    }

    pub fn carried_by(&self) -> Option<TransporterId> {
        self.carried_by
    }

    /// Attach the visual to a transporter's carry point.
    pub fn attach(&mut self, carrier: TransporterId) {
        self.carried_by = Some(carrier);
    }

    pub fn detach(&mut self) {
        self.carried_by = None;
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Returned by every scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Stop,
}
