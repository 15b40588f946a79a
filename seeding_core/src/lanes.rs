//! Lane draw within a heat.
//!
//! Lanes are handed out in priority order, fastest seed first. The standard
//! order starts at the centre of the track and zig-zags outwards:
//! 8 lanes draw 4, 5, 3, 6, 2, 7, 1, 8.

use crate::{Error, Heat, HeatEntry, RaceType, Result, SeededAthlete};

/// Standard center-outward lane priority for `lane_count` lanes
///
/// Even counts start with the two middle lanes, lower first. Odd counts start
/// with the middle lane and then alternate above and below it.
pub fn lane_priority(lane_count: u8) -> Vec<u8> {
    let mut order = Vec::with_capacity(lane_count as usize);
    if lane_count == 0 {
        return order;
    }

    if lane_count % 2 == 1 {
        let center = lane_count / 2 + 1;
        order.push(center);
        for step in 1..=lane_count / 2 {
            order.push(center + step);
            order.push(center - step);
        }
    } else {
        let low = lane_count / 2;
        let high = low + 1;
        for step in 0..lane_count / 2 {
            order.push(low - step);
            order.push(high + step);
        }
    }

    order
}

/// Check that `priority` names every lane from 1 to `lane_count` exactly once
pub fn validate_lane_priority(priority: &[u8], lane_count: u8) -> std::result::Result<(), String> {
    if priority.len() != lane_count as usize {
        return Err(format!(
            "lane priority lists {} lanes, expected {}",
            priority.len(),
            lane_count
        ));
    }

    let mut seen = vec![false; lane_count as usize];
    for &lane in priority {
        if lane == 0 || lane > lane_count {
            return Err(format!("lane {} is outside 1..={}", lane, lane_count));
        }
        let slot = &mut seen[lane as usize - 1];
        if *slot {
            return Err(format!("lane {} appears twice in lane priority", lane));
        }
        *slot = true;
    }

    Ok(())
}

/// Lane drawing rules for one event
#[derive(Clone, Debug, PartialEq)]
pub struct LaneDraw {
    lane_count: u8,
    race_type: RaceType,
    priority: Vec<u8>,
}

impl LaneDraw {
    /// Draw with the standard center-outward priority
    ///
    /// # Panics
    /// If `lane_count` is zero.
    pub fn new(lane_count: u8, race_type: RaceType) -> Self {
        assert!(lane_count > 0, "lane count must be positive");
        Self {
            lane_count,
            race_type,
            priority: lane_priority(lane_count),
        }
    }

    /// Draw with a custom priority order
    pub fn with_priority(lane_count: u8, race_type: RaceType, priority: Vec<u8>) -> Result<Self> {
        validate_lane_priority(&priority, lane_count).map_err(Error::Config)?;
        Ok(Self {
            lane_count,
            race_type,
            priority,
        })
    }

    pub fn lane_count(&self) -> u8 {
        self.lane_count
    }

    pub fn priority(&self) -> &[u8] {
        &self.priority
    }

    /// Build a heat from athletes already in seed order
    ///
    /// Laned races get lanes from the priority order and the entries come
    /// back sorted by lane. Unlaned races keep the given order with no lanes.
    pub fn assign_lanes(
        &self,
        round: u32,
        number: u32,
        ordered: Vec<SeededAthlete>,
    ) -> Result<Heat> {
        if !self.race_type.requires_lanes() {
            let entries = ordered
                .into_iter()
                .map(|athlete| HeatEntry { lane: None, athlete })
                .collect();
            return Ok(Heat {
                round,
                number,
                entries,
            });
        }

        if ordered.len() > self.lane_count as usize {
            return Err(Error::HeatOverflow {
                entrants: ordered.len(),
                lane_count: self.lane_count,
            });
        }

        let mut entries: Vec<HeatEntry> = ordered
            .into_iter()
            .zip(self.priority.iter())
            .map(|(athlete, &lane)| HeatEntry {
                lane: Some(lane),
                athlete,
            })
            .collect();
        entries.sort_by_key(|entry| entry.lane);

        Ok(Heat {
            round,
            number,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Mark;

    fn seeds(n: usize) -> Vec<SeededAthlete> {
        (0..n)
            .map(|i| SeededAthlete::new(format!("s{}", i), format!("Seed {}", i), Mark::from_millis(10_000 + i as u64)))
            .collect()
    }

    fn lane_of(heat: &Heat, id: &str) -> Option<u8> {
        heat.entries
            .iter()
            .find(|e| e.athlete.id == id)
            .and_then(|e| e.lane)
    }

    #[test]
    fn test_standard_priorities() {
        assert_eq!(lane_priority(8), vec![4, 5, 3, 6, 2, 7, 1, 8]);
        assert_eq!(lane_priority(6), vec![3, 4, 2, 5, 1, 6]);
        assert_eq!(lane_priority(4), vec![2, 3, 1, 4]);
        assert_eq!(lane_priority(5), vec![3, 4, 2, 5, 1]);
        assert_eq!(lane_priority(9), vec![5, 6, 4, 7, 3, 8, 2, 9, 1]);
        assert_eq!(lane_priority(1), vec![1]);
    }

    #[test]
    fn test_priorities_are_permutations() {
        for lanes in 1..=12u8 {
            assert!(validate_lane_priority(&lane_priority(lanes), lanes).is_ok());
        }
    }

    #[test]
    fn test_full_heat_is_bijection() {
        let draw = LaneDraw::new(8, RaceType::Sprint);
        let heat = draw.assign_lanes(1, 1, seeds(8)).unwrap();

        let lanes: Vec<u8> = heat.entries.iter().filter_map(|e| e.lane).collect();
        assert_eq!(lanes, (1..=8).collect::<Vec<u8>>());
        assert_eq!(lane_of(&heat, "s0"), Some(4));
        assert_eq!(lane_of(&heat, "s1"), Some(5));
        assert_eq!(lane_of(&heat, "s7"), Some(8));
    }

    #[test]
    fn test_partial_heat_uses_center_lanes() {
        let draw = LaneDraw::new(8, RaceType::Relay);
        let heat = draw.assign_lanes(2, 3, seeds(5)).unwrap();

        assert_eq!(heat.round, 2);
        assert_eq!(heat.number, 3);
        let lanes: Vec<u8> = heat.entries.iter().filter_map(|e| e.lane).collect();
        assert_eq!(lanes, vec![2, 3, 4, 5, 6]);
        assert_eq!(lane_of(&heat, "s0"), Some(4));
    }

    #[test]
    fn test_overfull_heat_is_rejected() {
        let draw = LaneDraw::new(6, RaceType::Sprint);
        let err = draw.assign_lanes(1, 1, seeds(7)).unwrap_err();
        assert!(matches!(
            err,
            Error::HeatOverflow {
                entrants: 7,
                lane_count: 6
            }
        ));
    }

    #[test]
    fn test_unlaned_race_passes_through() {
        let draw = LaneDraw::new(8, RaceType::Distance);
        let heat = draw.assign_lanes(1, 1, seeds(14)).unwrap();

        assert_eq!(heat.len(), 14);
        assert!(heat.entries.iter().all(|e| e.lane.is_none()));
        assert_eq!(heat.entries[0].athlete.id, "s0");
        assert_eq!(heat.entries[13].athlete.id, "s13");
    }

    #[test]
    fn test_custom_priority() {
        let draw = LaneDraw::with_priority(4, RaceType::Sprint, vec![3, 2, 4, 1]).unwrap();
        let heat = draw.assign_lanes(1, 1, seeds(2)).unwrap();
        assert_eq!(lane_of(&heat, "s0"), Some(3));
        assert_eq!(lane_of(&heat, "s1"), Some(2));

        assert!(LaneDraw::with_priority(4, RaceType::Sprint, vec![1, 2, 2, 4]).is_err());
        assert!(LaneDraw::with_priority(4, RaceType::Sprint, vec![1, 2, 3]).is_err());
        assert!(LaneDraw::with_priority(4, RaceType::Sprint, vec![1, 2, 3, 5]).is_err());
    }
}
