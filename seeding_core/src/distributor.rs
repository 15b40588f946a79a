//! Heat count calculation and serpentine distribution.
//!
//! Seed order is deterministic:
//! 1. Athletes with a seed mark, fastest first
//! 2. Equal marks: ranked athletes before unranked, lower rank first
//! 3. Athletes without a mark last, ranked before unranked
//! 4. Anything still equal keeps roster order
//!
//! Marked athletes are dealt across heats in waves, alternating direction so
//! each heat gets a fair share of the strong seeds. Unmarked athletes fill in
//! afterwards, each going to the currently smallest heat.

use crate::{Error, Result, SeededAthlete};
use std::cmp::Ordering;

/// Athletes split into heats before lanes are drawn
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeatAssignment {
    /// Members of heat `i + 1`, fastest seed first
    heats: Vec<Vec<SeededAthlete>>,
}

impl HeatAssignment {
    pub fn heat_count(&self) -> usize {
        self.heats.len()
    }

    pub fn heats(&self) -> &[Vec<SeededAthlete>] {
        &self.heats
    }

    pub fn into_heats(self) -> Vec<Vec<SeededAthlete>> {
        self.heats
    }

    /// Heat number (1-based) the athlete was placed in
    pub fn heat_of(&self, athlete_id: &str) -> Option<u32> {
        self.heats
            .iter()
            .position(|heat| heat.iter().any(|a| a.id == athlete_id))
            .map(|i| i as u32 + 1)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.heats.iter().map(Vec::len).collect()
    }
}

/// Smallest number of heats that keeps every heat within capacity
///
/// Capacity is the lesser of `lane_count` and `max_per_heat`; for unlaned
/// races callers pass the pack size cap as the lane count. Heats produced
/// from the returned count differ in size by at most one. `min_per_heat` is
/// a floor on configuration, not on the field: a field smaller than it still
/// gets its single heat.
///
/// # Panics
/// If `lane_count` or `max_per_heat` is zero.
pub fn calculate_heat_count(
    entrants: usize,
    lane_count: usize,
    min_per_heat: usize,
    max_per_heat: usize,
) -> Result<usize> {
    assert!(
        lane_count > 0 && max_per_heat > 0,
        "heat capacity must be positive (lanes {}, max {})",
        lane_count,
        max_per_heat
    );

    if min_per_heat > max_per_heat {
        return Err(Error::Infeasible(format!(
            "minimum heat size {} exceeds maximum heat size {}",
            min_per_heat, max_per_heat
        )));
    }
    if lane_count < min_per_heat {
        return Err(Error::Infeasible(format!(
            "{} lanes cannot hold the minimum heat size of {}",
            lane_count, min_per_heat
        )));
    }

    if entrants == 0 {
        return Ok(0);
    }

    let capacity = lane_count.min(max_per_heat);
    let heats = entrants.div_ceil(capacity);
    let smallest = entrants / heats;

    tracing::debug!(
        "{} entrants at capacity {} -> {} heats (smallest {})",
        entrants,
        capacity,
        heats,
        smallest
    );

    Ok(heats)
}

/// Athletes in seed order (see module docs)
pub fn seed_order(athletes: &[SeededAthlete]) -> Vec<SeededAthlete> {
    let mut ordered = athletes.to_vec();
    // Stable sort: full ties keep roster order
    ordered.sort_by(compare_seeds);
    ordered
}

pub(crate) fn compare_seeds(a: &SeededAthlete, b: &SeededAthlete) -> Ordering {
    present_first(a.seed_mark.time(), b.seed_mark.time())
        .then_with(|| present_first(a.seed_rank, b.seed_rank))
}

/// Orders `Some` values ascending ahead of `None`
pub(crate) fn present_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Split athletes into `heat_count` heats by serpentine seeding
///
/// An empty roster gives an empty assignment. When `heat_count` exceeds the
/// number of athletes the trailing heats stay empty.
///
/// # Panics
/// If athletes are given with a `heat_count` of zero.
pub fn distribute_to_heats(athletes: &[SeededAthlete], heat_count: usize) -> HeatAssignment {
    if athletes.is_empty() {
        return HeatAssignment::default();
    }
    assert!(
        heat_count > 0,
        "cannot distribute {} athletes into zero heats",
        athletes.len()
    );

    let (seeded, unseeded): (Vec<_>, Vec<_>) = seed_order(athletes)
        .into_iter()
        .partition(|a| a.seed_mark.is_time());

    let mut heats: Vec<Vec<SeededAthlete>> = vec![Vec::new(); heat_count];

    for (i, athlete) in seeded.into_iter().enumerate() {
        let wave = i / heat_count;
        let position = i % heat_count;
        let heat = if wave % 2 == 0 {
            position
        } else {
            heat_count - 1 - position
        };
        heats[heat].push(athlete);
    }

    for athlete in unseeded {
        // min_by_key keeps the first minimum, so ties go to the lowest heat
        let target = heats
            .iter()
            .enumerate()
            .min_by_key(|(_, heat)| heat.len())
            .map(|(i, _)| i)
            .unwrap_or(0);
        tracing::debug!("Unseeded {} placed in heat {}", athlete.id, target + 1);
        heats[target].push(athlete);
    }

    HeatAssignment { heats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Mark, NoMark};

    fn athlete(id: &str, millis: u64) -> SeededAthlete {
        SeededAthlete::new(id, id.to_uppercase(), Mark::from_millis(millis))
    }

    fn unseeded(id: &str) -> SeededAthlete {
        SeededAthlete::new(id, id.to_uppercase(), Mark::NoMark(NoMark::Blank))
    }

    fn field(n: usize) -> Vec<SeededAthlete> {
        (0..n)
            .map(|i| athlete(&format!("a{:02}", i), 10_000 + i as u64 * 10))
            .collect()
    }

    fn ids(heat: &[SeededAthlete]) -> Vec<&str> {
        heat.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_eighteen_sprinters_make_three_even_heats() {
        let heats = calculate_heat_count(18, 8, 4, 8).unwrap();
        assert_eq!(heats, 3);

        let assignment = distribute_to_heats(&field(18), heats);
        assert_eq!(assignment.sizes(), vec![6, 6, 6]);
        for (i, heat) in assignment.heats().iter().enumerate() {
            assert_eq!(heat[0].id, format!("a{:02}", i));
        }
    }

    #[test]
    fn test_heat_count_is_minimal_and_balanced() {
        for lanes in [4usize, 6, 8] {
            for n in 1..=80 {
                let h = calculate_heat_count(n, lanes, 1, 16).unwrap();
                assert!(n.div_ceil(h) <= lanes, "n={} lanes={} h={}", n, lanes, h);
                if h > 1 {
                    assert!(n.div_ceil(h - 1) > lanes, "n={} lanes={} h={} not minimal", n, lanes, h);
                }

                let sizes = distribute_to_heats(&field(n), h).sizes();
                let max = sizes.iter().max().copied().unwrap_or(0);
                let min = sizes.iter().min().copied().unwrap_or(0);
                assert!(max - min <= 1, "n={} lanes={} sizes={:?}", n, lanes, sizes);
                assert_eq!(sizes.iter().sum::<usize>(), n);
            }
        }
    }

    #[test]
    fn test_max_per_heat_caps_below_lane_count() {
        assert_eq!(calculate_heat_count(16, 8, 1, 6).unwrap(), 3);
    }

    #[test]
    fn test_zero_entrants_is_zero_heats() {
        assert_eq!(calculate_heat_count(0, 8, 4, 8).unwrap(), 0);
        assert_eq!(distribute_to_heats(&[], 3).heat_count(), 0);
    }

    #[test]
    fn test_small_field_still_gets_one_heat() {
        assert_eq!(calculate_heat_count(3, 8, 4, 8).unwrap(), 1);
    }

    #[test]
    fn test_lanes_below_minimum_is_infeasible() {
        let err = calculate_heat_count(10, 4, 5, 8).unwrap_err();
        assert!(matches!(err, Error::Infeasible(_)));

        let err = calculate_heat_count(10, 8, 9, 8).unwrap_err();
        assert!(matches!(err, Error::Infeasible(_)));
    }

    #[test]
    fn test_serpentine_pattern() {
        let assignment = distribute_to_heats(&field(9), 3);
        let heats = assignment.heats();
        assert_eq!(ids(&heats[0]), vec!["a00", "a05", "a06"]);
        assert_eq!(ids(&heats[1]), vec!["a01", "a04", "a07"]);
        assert_eq!(ids(&heats[2]), vec!["a02", "a03", "a08"]);
    }

    #[test]
    fn test_fastest_seeds_one_per_heat() {
        let mut roster = field(23);
        roster.reverse();
        let assignment = distribute_to_heats(&roster, 4);
        for i in 0..4 {
            let id = format!("a{:02}", i);
            let heat = assignment.heat_of(&id).unwrap();
            for j in 0..i {
                assert_ne!(assignment.heat_of(&format!("a{:02}", j)), Some(heat));
            }
        }
    }

    #[test]
    fn test_unseeded_fill_smallest_heats() {
        let mut roster = field(7);
        roster.insert(2, unseeded("u1"));
        roster.push(unseeded("u2"));

        let assignment = distribute_to_heats(&roster, 3);
        // Marked athletes leave sizes [3, 2, 2]
        assert_eq!(assignment.heat_of("u1"), Some(2));
        assert_eq!(assignment.heat_of("u2"), Some(3));
        assert_eq!(assignment.sizes(), vec![3, 3, 3]);
        assert_eq!(assignment.heats()[1].last().unwrap().id, "u1");
    }

    #[test]
    fn test_seed_order_tie_breaks() {
        let mut tied_unranked = athlete("tied_unranked", 10_500);
        tied_unranked.seed_rank = None;
        let mut tied_rank2 = athlete("tied_rank2", 10_500);
        tied_rank2.seed_rank = Some(2);
        let mut tied_rank1 = athlete("tied_rank1", 10_500);
        tied_rank1.seed_rank = Some(1);
        let mut no_mark_ranked = unseeded("no_mark_ranked");
        no_mark_ranked.seed_rank = Some(9);
        let first_blank = unseeded("first_blank");
        let second_blank = SeededAthlete::new("second_blank", "X", Mark::NoMark(NoMark::Invalid));

        let roster = vec![
            first_blank,
            tied_unranked,
            second_blank,
            tied_rank2,
            no_mark_ranked,
            athlete("fast", 10_100),
            tied_rank1,
        ];

        let ordered = seed_order(&roster);
        assert_eq!(
            ids(&ordered),
            vec![
                "fast",
                "tied_rank1",
                "tied_rank2",
                "tied_unranked",
                "no_mark_ranked",
                "first_blank",
                "second_blank",
            ]
        );
    }

    #[test]
    fn test_extra_heats_stay_empty() {
        let assignment = distribute_to_heats(&field(2), 3);
        assert_eq!(assignment.sizes(), vec![1, 1, 0]);
    }

    #[test]
    #[should_panic(expected = "zero heats")]
    fn test_zero_heats_with_athletes_panics() {
        distribute_to_heats(&field(3), 0);
    }
}
