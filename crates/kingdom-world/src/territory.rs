//! Territory queries and contiguous hex selection.
//!
//! A hex is eligible to be seized when the kingdom controls it and no
//! kingdom settlement sits on it. Seizure grows a connected block: it starts
//! at a random eligible hex and repeatedly adds a random eligible neighbor
//! of the block until the requested count is reached or the block cannot
//! grow any further.

use std::collections::BTreeSet;

use rand::seq::IndexedRandom;
use tracing::debug;

use kingdom_types::{HexCoord, Kingdom};

/// Coordinates of every hex the kingdom controls, in map order.
pub fn controlled_hexes(kingdom: &Kingdom) -> Vec<HexCoord> {
    kingdom
        .hexes
        .iter()
        .filter(|h| h.controller.is_kingdom())
        .map(|h| h.coord)
        .collect()
}

/// Controlled hexes that do not host a kingdom settlement.
pub fn seizable_hexes(kingdom: &Kingdom) -> Vec<HexCoord> {
    controlled_hexes(kingdom)
        .into_iter()
        .filter(|coord| !kingdom.has_settlement_at(*coord))
        .collect()
}

/// Pick up to `count` connected seizable hexes at random.
///
/// Returns fewer than `count` hexes when the connected eligible region
/// containing the random start is smaller than requested, and an empty
/// list when nothing is eligible.
pub fn select_contiguous(kingdom: &Kingdom, count: u32, rng: &mut impl rand::Rng) -> Vec<HexCoord> {
    if count == 0 {
        return Vec::new();
    }
    let eligible: BTreeSet<HexCoord> = seizable_hexes(kingdom).into_iter().collect();
    let candidates: Vec<HexCoord> = eligible.iter().copied().collect();

    let Some(start) = candidates.choose(rng).copied() else {
        return Vec::new();
    };

    let target = usize::try_from(count).unwrap_or(usize::MAX);
    let mut selected = vec![start];
    let mut chosen: BTreeSet<HexCoord> = BTreeSet::from([start]);

    while selected.len() < target {
        let frontier: Vec<HexCoord> = chosen
            .iter()
            .flat_map(|coord| coord.neighbors())
            .filter(|n| eligible.contains(n) && !chosen.contains(n))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let Some(next) = frontier.choose(rng).copied() else {
            debug!(
                requested = count,
                selected = selected.len(),
                "contiguous selection ran out of eligible neighbors"
            );
            break;
        };
        chosen.insert(next);
        selected.push(next);
    }

    selected
}
