//! Suffocation deaths when life support runs dry.
//!
//! An empty oxygen reserve kills a small random number of colonists each
//! sol until production recovers or the colony is lost.

use rand::Rng;

/// Fewest colonists lost in one suffocation event.
pub const MIN_SUFFOCATION_DEATHS: u32 = 1;
/// Most colonists lost in one suffocation event.
pub const MAX_SUFFOCATION_DEATHS: u32 = 3;

/// Roll how many colonists suffocate this sol, uniform in
/// `[MIN_SUFFOCATION_DEATHS, MAX_SUFFOCATION_DEATHS]`. The caller bounds the
/// result by the remaining population.
pub fn roll_suffocation_deaths<R: Rng>(rng: &mut R) -> u32 {
    rng.random_range(MIN_SUFFOCATION_DEATHS..=MAX_SUFFOCATION_DEATHS)
}
