//! Round structure planning.
//!
//! An event's rounds are fixed once, from the entry count, before round one
//! is seeded. Progressive presets look the field up in their qualification
//! table; a field below the table's smallest bracket (or a timed-final
//! preset) runs as a single final.

use crate::distributor::calculate_heat_count;
use crate::{
    Advancement, Catalog, Error, QualificationRule, RaceType, Result, RoundPolicy, SeedingPreset,
};
use serde::{Deserialize, Serialize};

/// Where a round sits in the event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Heats,
    Semifinal,
    Final,
    /// Final run over several heats, ranked on time
    TimedFinal,
}

/// One round of a plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedRound {
    pub number: u32,
    pub stage: Stage,
    pub field_size: usize,
    pub heat_count: usize,
    /// Qualification out of this round; `None` for the last round
    pub rule: Option<QualificationRule>,
}

/// Every round of an event, first to last
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundPlan {
    pub preset_id: String,
    pub race_type: RaceType,
    pub entrants: usize,
    pub rounds: Vec<PlannedRound>,
}

impl RoundPlan {
    pub fn round(&self, number: u32) -> Option<&PlannedRound> {
        self.rounds.iter().find(|r| r.number == number)
    }

    /// Qualification out of `number` together with the next round's field
    pub fn advancement(&self, number: u32) -> Option<Advancement> {
        let rule = self.round(number)?.rule.clone()?;
        let next = self.round(number + 1)?;
        Some(Advancement {
            rule,
            next_field_size: next.field_size,
        })
    }

    pub fn is_single_round(&self) -> bool {
        self.rounds.len() <= 1
    }
}

/// Plan the rounds for `entrants` under `preset`
///
/// Fails with `Infeasible` when the field is larger than every bracket of
/// the preset's table, or when a bracket's heats cannot hold its field.
pub fn calculate_round_structure(
    entrants: usize,
    race_type: RaceType,
    preset: &SeedingPreset,
    catalog: &Catalog,
) -> Result<RoundPlan> {
    let mut plan = RoundPlan {
        preset_id: preset.id.clone(),
        race_type,
        entrants,
        rounds: Vec::new(),
    };
    let capacity = preset.heat_capacity(race_type);

    let brackets = match (preset.policy, &preset.qualification_table) {
        (RoundPolicy::TimedFinal, _) | (_, None) => None,
        (RoundPolicy::Progressive, Some(table_id)) => {
            let table = catalog.table(table_id).ok_or_else(|| {
                Error::CatalogValidation(format!(
                    "preset '{}' references non-existent table '{}'",
                    preset.id, table_id
                ))
            })?;
            table
                .sections
                .iter()
                .find(|s| s.race_type == race_type)
                .map(|s| (table, &s.brackets))
        }
    };

    let smallest = brackets
        .and_then(|(_, brackets)| brackets.iter().map(|b| b.min_entrants).min());

    let (table, brackets) = match (brackets, smallest) {
        (Some(found), Some(smallest)) if entrants >= smallest => found,
        _ => {
            let heat_count = calculate_heat_count(entrants, capacity, preset.min_per_heat, capacity)?;
            plan.rounds.push(PlannedRound {
                number: 1,
                stage: if heat_count > 1 {
                    Stage::TimedFinal
                } else {
                    Stage::Final
                },
                field_size: entrants,
                heat_count,
                rule: None,
            });
            tracing::debug!(
                "{} {} entrants under {}: single round of {} heats",
                entrants,
                race_type,
                preset.id,
                heat_count
            );
            return Ok(plan);
        }
    };

    let bracket = brackets
        .iter()
        .find(|b| (b.min_entrants..=b.max_entrants).contains(&entrants))
        .ok_or_else(|| {
            Error::Infeasible(format!(
                "no bracket of table '{}' covers {} {} entrants",
                table.id, entrants, race_type
            ))
        })?;

    let mut field = entrants;
    for (i, round) in bracket.rounds.iter().enumerate() {
        if round.heats == 0 || round.heats > field || field.div_ceil(round.heats) > capacity {
            return Err(Error::Infeasible(format!(
                "round {} cannot seat {} athletes in {} heats of at most {}",
                i + 1,
                field,
                round.heats,
                capacity
            )));
        }

        let rule = QualificationRule::new(round.places_per_heat, round.fastest_losers);
        let next_field = rule.nominal_qualifiers(round.heats);
        let stage = if i + 1 == bracket.rounds.len() && bracket.rounds.len() >= 2 {
            Stage::Semifinal
        } else {
            Stage::Heats
        };

        plan.rounds.push(PlannedRound {
            number: i as u32 + 1,
            stage,
            field_size: field,
            heat_count: round.heats,
            rule: Some(rule),
        });
        field = next_field;
    }

    let final_size = preset.final_size_for(race_type);
    if field != final_size || field > capacity {
        return Err(Error::Infeasible(format!(
            "table '{}' leads to a final of {} but preset '{}' expects {}",
            table.id, field, preset.id, final_size
        )));
    }

    plan.rounds.push(PlannedRound {
        number: bracket.rounds.len() as u32 + 1,
        stage: Stage::Final,
        field_size: field,
        heat_count: 1,
        rule: None,
    });

    tracing::info!(
        "{} {} entrants under {}: {} rounds",
        entrants,
        race_type,
        preset.id,
        plan.rounds.len()
    );

    Ok(plan)
}
