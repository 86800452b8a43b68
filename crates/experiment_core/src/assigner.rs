use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::domain::Condition;

/// Draws the experimental condition for each new session.
pub struct ConditionAssigner {
    rng: StdRng,
}

impl ConditionAssigner {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn assign(&mut self) -> Condition {
        if self.rng.gen_bool(0.5) {
            Condition::Warm
        } else {
            Condition::Cold
        }
    }
}

impl Default for ConditionAssigner {
    fn default() -> Self {
        Self::from_entropy()
    }
}
