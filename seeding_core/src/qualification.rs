//! Cross-heat ranking and qualification to the next round.
//!
//! Qualification runs in two passes:
//! 1. Automatic: the top `places_per_heat` finishers of every heat ("Q")
//! 2. Time: the fastest remaining finishers across all heats ("q")
//!
//! Athletes tied on time at the last time-qualifying slot all go through,
//! even past the quota. Non-finishers (DNS, DNF, DQ) never qualify and hold
//! no heat place, so a placed athlete disqualified afterwards moves everyone
//! behind them up.
//!
//! When the next round is reseeded by round time, the seed rank is the
//! overall place. Athletes sharing a dead heat share that rank, and their
//! order in the next round falls back to their order in the qualifier list
//! (automatic by heat and place, then time qualifiers).

use crate::distributor::present_first;
use crate::time::{CanonicalTime, Mark, NoMark};
use crate::{
    Error, Heat, HeatEntry, QualificationMethod, QualificationRule, Qualifier, Result,
    ResultEntry, RoundResult, SeededAthlete, SeedingWarning,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One starter's standing after a round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RankedPerformance {
    pub athlete_id: String,
    pub heat: u32,
    pub lane: Option<u8>,
    /// Place within the heat; `None` for non-finishers
    pub heat_place: Option<u32>,
    /// Place across all heats; `None` for non-finishers
    pub overall_place: Option<u32>,
    pub mark: Mark,
}

impl RankedPerformance {
    pub fn finished(&self) -> bool {
        self.mark.is_time()
    }
}

/// A tie that admitted athletes beyond the quota
#[derive(Clone, Debug, PartialEq)]
pub struct OverflowTie {
    /// Heat of a dead heat on the last automatic place; `None` for a tie at
    /// the last time-qualifying place
    pub heat: Option<u32>,
    pub mark: Mark,
    pub extra: usize,
}

/// Qualifiers chosen from a ranking
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Qualification {
    /// Automatic qualifiers by heat and place, then time qualifiers by time
    pub qualifiers: Vec<Qualifier>,
    /// Admissions beyond the nominal quota caused by ties
    pub tie_overflow: usize,
    /// Each tie behind `tie_overflow`
    pub ties: Vec<OverflowTie>,
    /// Slowest time admitted as a time qualifier
    pub cutoff: Option<Mark>,
}

/// Everything produced by evaluating a finished round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualificationOutcome {
    pub round: u32,
    pub ranking: Vec<RankedPerformance>,
    pub qualifiers: Vec<Qualifier>,
    pub tie_overflow: usize,
    /// Field for the following round, ready to be seeded
    pub next_round: Vec<SeededAthlete>,
    #[serde(default)]
    pub warnings: Vec<SeedingWarning>,
}

/// Options for building the next round's field
#[derive(Clone, Debug, Default)]
pub struct EvaluationOptions {
    /// Seed the next round by this round's times instead of original seed marks
    pub reseed_by_round_time: bool,
}

impl QualificationRule {
    /// Qualifiers the rule yields before any tie overflow
    pub fn nominal_qualifiers(&self, heat_count: usize) -> usize {
        self.places_per_heat * heat_count + self.fastest_losers
    }

    /// Fail unless the rule can fill a next round of `next_field_size`
    pub fn ensure_feasible(&self, heat_count: usize, next_field_size: usize) -> Result<()> {
        let nominal = self.nominal_qualifiers(heat_count);
        if nominal < next_field_size {
            return Err(Error::Infeasible(format!(
                "top {} from each of {} heats plus {} fastest losers gives {} qualifiers, next round needs {}",
                self.places_per_heat, heat_count, self.fastest_losers, nominal, next_field_size
            )));
        }
        Ok(())
    }

    fn admits_time(&self, time: CanonicalTime) -> bool {
        self.time_standard.map_or(true, |standard| time <= standard)
    }
}

/// Rank every starter of a round across heats
///
/// Finishers come first by time; equal times share a place and the next
/// place skips (two athletes on 3rd means the next time is 5th). Equal times
/// are listed by heat, heat place and lane. Non-finishers follow with no
/// place, by heat and lane, then result order.
///
/// Heat places count finishers only. Recorded places order finishers that
/// both have one; otherwise times decide. Equal standing shares a place.
pub fn rank_after_qualification_round(result: &RoundResult) -> Vec<RankedPerformance> {
    let heat_places = heat_places(&result.entries);

    let mut order: Vec<usize> = (0..result.entries.len()).collect();
    order.sort_by(|&ia, &ib| {
        let (a, b) = (&result.entries[ia], &result.entries[ib]);
        present_first(a.mark.time(), b.mark.time())
            .then_with(|| a.heat.cmp(&b.heat))
            .then_with(|| present_first(heat_places[ia], heat_places[ib]))
            .then_with(|| present_first(a.lane, b.lane))
    });

    let mut ranked = Vec::with_capacity(order.len());
    let mut previous: Option<(CanonicalTime, u32)> = None;

    for (position, index) in order.into_iter().enumerate() {
        let entry = &result.entries[index];
        let overall_place = match entry.mark.time() {
            Some(time) => match previous {
                Some((prev_time, prev_place)) if prev_time == time => Some(prev_place),
                _ => {
                    let place = position as u32 + 1;
                    previous = Some((time, place));
                    Some(place)
                }
            },
            None => None,
        };

        ranked.push(RankedPerformance {
            athlete_id: entry.athlete_id.clone(),
            heat: entry.heat,
            lane: entry.lane,
            heat_place: heat_places[index],
            overall_place,
            mark: entry.mark,
        });
    }

    ranked
}

fn heat_places(entries: &[ResultEntry]) -> Vec<Option<u32>> {
    let mut finishers_by_heat: BTreeMap<u32, Vec<(Option<u32>, CanonicalTime)>> = BTreeMap::new();
    for entry in entries {
        if let Some(time) = entry.mark.time() {
            finishers_by_heat
                .entry(entry.heat)
                .or_default()
                .push((entry.place, time));
        }
    }

    let ahead = |other: &(Option<u32>, CanonicalTime), place: Option<u32>, time: CanonicalTime| {
        match (other.0, place) {
            (Some(other_place), Some(place)) => other_place < place,
            _ => other.1 < time,
        }
    };

    entries
        .iter()
        .map(|entry| {
            let time = entry.mark.time()?;
            let ahead_count = finishers_by_heat.get(&entry.heat).map_or(0, |finishers| {
                finishers
                    .iter()
                    .filter(|other| ahead(other, entry.place, time))
                    .count()
            });
            Some(ahead_count as u32 + 1)
        })
        .collect()
}

/// Choose qualifiers from a ranking
///
/// # Panics
/// If `heat_count` is zero.
pub fn determine_qualifiers(
    ranked: &[RankedPerformance],
    rule: &QualificationRule,
    heat_count: usize,
) -> Qualification {
    assert!(heat_count > 0, "qualification rule applied to zero heats");

    let mut qualification = Qualification::default();
    let mut admitted: HashSet<&str> = HashSet::new();

    let mut automatic: Vec<&RankedPerformance> = ranked
        .iter()
        .filter(|p| p.finished())
        .filter(|p| p.heat_place.map_or(false, |place| place as usize <= rule.places_per_heat))
        .collect();
    automatic.sort_by_key(|p| (p.heat, p.heat_place));

    // Admitted count and slowest admitted mark per heat
    let mut per_heat: BTreeMap<u32, (usize, Mark)> = BTreeMap::new();
    for performance in automatic {
        let heat = per_heat
            .entry(performance.heat)
            .or_insert((0, performance.mark));
        heat.0 += 1;
        heat.1 = performance.mark;
        admitted.insert(performance.athlete_id.as_str());
        qualification.qualifiers.push(Qualifier {
            athlete_id: performance.athlete_id.clone(),
            heat: Some(performance.heat),
            mark: performance.mark,
            method: QualificationMethod::Automatic,
        });
    }
    // Dead heats on the last automatic place
    for (&heat, &(count, mark)) in &per_heat {
        if count > rule.places_per_heat {
            qualification.ties.push(OverflowTie {
                heat: Some(heat),
                mark,
                extra: count - rule.places_per_heat,
            });
        }
    }

    let mut candidates: Vec<&RankedPerformance> = ranked
        .iter()
        .filter(|p| !admitted.contains(p.athlete_id.as_str()))
        .filter(|p| p.mark.time().map_or(false, |t| rule.admits_time(t)))
        .collect();
    candidates.sort_by_key(|p| p.mark);

    let mut taken = 0;
    let mut cutoff_extra = 0;
    for performance in candidates {
        if taken < rule.fastest_losers {
            taken += 1;
            qualification.cutoff = Some(performance.mark);
        } else if qualification.cutoff == Some(performance.mark) {
            cutoff_extra += 1;
        } else {
            break;
        }
        qualification.qualifiers.push(Qualifier {
            athlete_id: performance.athlete_id.clone(),
            heat: Some(performance.heat),
            mark: performance.mark,
            method: QualificationMethod::TimeQualifier,
        });
    }

    if let Some(mark) = qualification.cutoff.filter(|_| cutoff_extra > 0) {
        qualification.ties.push(OverflowTie {
            heat: None,
            mark,
            extra: cutoff_extra,
        });
    }
    qualification.tie_overflow = qualification.ties.iter().map(|t| t.extra).sum();

    tracing::debug!(
        "{} qualifiers from {} heats (nominal {}, tie overflow {})",
        qualification.qualifiers.len(),
        heat_count,
        rule.nominal_qualifiers(heat_count),
        qualification.tie_overflow
    );

    qualification
}

/// Evaluate a finished round against its published heats
///
/// Drawn athletes with no result row are ranked as DNS and listed in a
/// `MissingResults` warning. Rows for athletes not in the draw are ignored
/// with a warning. The draw decides an athlete's heat: a row naming another
/// heat is moved back with a `HeatMismatch` warning. Byes go straight into
/// the next round's field.
pub fn evaluate_round(
    heats: &[Heat],
    byes: &[SeededAthlete],
    result: &RoundResult,
    rule: &QualificationRule,
    options: &EvaluationOptions,
) -> QualificationOutcome {
    let mut warnings = Vec::new();

    let drawn: HashMap<&str, (&Heat, &HeatEntry)> = heats
        .iter()
        .flat_map(|heat| heat.entries.iter().map(move |slot| (slot.athlete.id.as_str(), (heat, slot))))
        .collect();

    let mut entries: Vec<ResultEntry> = Vec::with_capacity(drawn.len());
    let mut recorded: HashSet<&str> = HashSet::new();
    for entry in &result.entries {
        let Some((&id, &(heat, slot))) = drawn.get_key_value(entry.athlete_id.as_str()) else {
            tracing::warn!("Ignoring result for {} who was not drawn", entry.athlete_id);
            warnings.push(SeedingWarning::UnknownResultEntry {
                athlete_id: entry.athlete_id.clone(),
            });
            continue;
        };
        if !recorded.insert(id) {
            warnings.push(SeedingWarning::DuplicateAthlete {
                athlete_id: entry.athlete_id.clone(),
            });
            continue;
        }

        let mut entry = entry.clone();
        if entry.heat != heat.number {
            tracing::warn!(
                "Result for {} names heat {}; drawn in heat {}",
                entry.athlete_id,
                entry.heat,
                heat.number
            );
            warnings.push(SeedingWarning::HeatMismatch {
                athlete_id: entry.athlete_id.clone(),
                recorded: entry.heat,
                drawn: heat.number,
            });
            entry.heat = heat.number;
            entry.lane = slot.lane;
        }
        entries.push(entry);
    }

    let mut missing = Vec::new();
    for heat in heats {
        for slot in &heat.entries {
            if recorded.contains(slot.athlete.id.as_str()) {
                continue;
            }
            missing.push(slot.athlete.id.clone());
            entries.push(ResultEntry {
                athlete_id: slot.athlete.id.clone(),
                heat: heat.number,
                lane: slot.lane,
                place: None,
                mark: Mark::NoMark(NoMark::Dns),
            });
        }
    }
    if !missing.is_empty() {
        tracing::warn!("No result for {} starters; ranked as DNS", missing.len());
        warnings.push(SeedingWarning::MissingResults {
            athlete_ids: missing,
        });
    }

    let completed = RoundResult {
        round: result.round,
        entries,
    };
    let ranking = rank_after_qualification_round(&completed);

    let mut qualification = if heats.is_empty() {
        Qualification::default()
    } else {
        determine_qualifiers(&ranking, rule, heats.len())
    };

    for tie in &qualification.ties {
        tracing::info!(
            "Tie at {} admitted {} qualifier(s) beyond the quota",
            tie.mark,
            tie.extra
        );
        warnings.push(SeedingWarning::TieOverflow {
            extra: tie.extra,
            mark: tie.mark,
            heat: tie.heat,
        });
    }

    let overall: HashMap<&str, Option<u32>> = ranking
        .iter()
        .map(|p| (p.athlete_id.as_str(), p.overall_place))
        .collect();

    let mut next_round = Vec::with_capacity(qualification.qualifiers.len() + byes.len());
    for qualifier in &qualification.qualifiers {
        let Some((_, slot)) = drawn.get(qualifier.athlete_id.as_str()) else {
            continue;
        };
        let mut athlete = slot.athlete.clone();
        athlete.bye = false;
        if options.reseed_by_round_time {
            athlete.seed_mark = qualifier.mark;
            athlete.seed_rank = overall.get(athlete.id.as_str()).copied().flatten();
        }
        next_round.push(athlete);
    }

    for bye in byes {
        let mut athlete = bye.clone();
        athlete.bye = false;
        qualification.qualifiers.push(Qualifier {
            athlete_id: athlete.id.clone(),
            heat: None,
            mark: athlete.seed_mark,
            method: QualificationMethod::Bye,
        });
        next_round.push(athlete);
    }

    tracing::info!(
        "Round {}: {} starters ranked, {} advance",
        result.round,
        ranking.len(),
        next_round.len()
    );

    QualificationOutcome {
        round: result.round,
        ranking,
        qualifiers: qualification.qualifiers,
        tie_overflow: qualification.tie_overflow,
        next_round,
        warnings,
    }
}
