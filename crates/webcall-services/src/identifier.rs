//! Connection identifier generation.
//!
//! Candidates are drawn uniformly below `ID_CEIL`; anything under `ID_FLOOR`
//! or already live is redrawn. There is no retry bound: the ~9×10^10 space
//! is not expected to fill up.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use webcall_core::id::{ID_CEIL, ID_FLOOR};
use webcall_core::ConnectionId;

/// Random source behind identifier generation.
pub trait IdSource: Send + Sync {
    /// Uniform draw from `0..ceil`.
    fn draw(&mut self, ceil: u64) -> u64;
}

/// Default source: a CSPRNG seeded from the OS.
pub struct RandomIds(StdRng);

impl RandomIds {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IdSource for RandomIds {
    fn draw(&mut self, ceil: u64) -> u64 {
        self.0.gen_range(0..ceil)
    }
}

/// Pick an identifier not present in `live`.
///
/// The caller must hold the lock guarding `live` until the returned id is
/// inserted.
pub fn allocate<V>(source: &mut dyn IdSource, live: &HashMap<ConnectionId, V>) -> ConnectionId {
    loop {
        let Some(candidate) = ConnectionId::new(source.draw(ID_CEIL)) else {
            continue;
        };
        if live.contains_key(&candidate) {
            tracing::debug!(id = %candidate, "connection id collision, redrawing");
            continue;
        }
        return candidate;
    }
}
