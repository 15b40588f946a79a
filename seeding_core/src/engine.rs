//! Seeding engine tying the components together.
//!
//! One seeding pass:
//! - Drop duplicate entries and set byes aside
//! - Pick the heat count (the planned one when the field still fits it)
//! - Serpentine distribution, then a lane draw per heat
//!
//! One advancement pass:
//! - Take the rule recorded on the draw (or an override)
//! - Check the rule can fill the planned next round
//! - Rank and qualify

use crate::distributor::{calculate_heat_count, distribute_to_heats};
use crate::planner::PlannedRound;
use crate::qualification::{evaluate_round, EvaluationOptions, QualificationOutcome};
use crate::{
    Advancement, DistributionMethod, Error, QualificationRule, RaceType, Result, RoundResult,
    SeededAthlete, SeedingPreset, SeedingResult, SeedingWarning,
};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

/// Everything needed to seed one round
#[derive(Clone, Debug)]
pub struct SeedingRequest<'a> {
    pub event_code: String,
    pub race_type: RaceType,
    pub round: u32,
    pub athletes: Vec<SeededAthlete>,
    pub preset: &'a SeedingPreset,
    /// Venue lane count, replacing the preset's
    pub lane_count: Option<u8>,
    /// This round as planned for the event
    pub planned: Option<&'a PlannedRound>,
    pub advancement: Option<Advancement>,
    /// Warnings raised before seeding (roster parsing, preset fallback)
    pub warnings: Vec<SeedingWarning>,
}

/// Seed one round into heats with lanes
///
/// Fails before producing any heats when the lane count cannot hold the
/// preset's minimum heat size, or when the planned advancement cannot fill
/// the next round from the heats actually drawn.
pub fn seed_round(request: SeedingRequest<'_>) -> Result<SeedingResult> {
    let SeedingRequest {
        event_code,
        race_type,
        round,
        athletes,
        preset,
        lane_count,
        planned,
        advancement,
        mut warnings,
    } = request;

    let lane_count = lane_count.unwrap_or(preset.lane_count);
    if lane_count == 0 {
        return Err(Error::Config("lane count must be at least 1".into()));
    }

    let mut seen = HashSet::new();
    let mut field = Vec::with_capacity(athletes.len());
    let mut byes = Vec::new();
    for athlete in athletes {
        if !seen.insert(athlete.id.clone()) {
            tracing::warn!("Duplicate entry for {} ignored", athlete.id);
            warnings.push(SeedingWarning::DuplicateAthlete {
                athlete_id: athlete.id,
            });
            continue;
        }
        if athlete.bye {
            byes.push(athlete);
        } else {
            field.push(athlete);
        }
    }

    let unmarked = field.iter().filter(|a| !a.seed_mark.is_time()).count();
    if unmarked > 0 {
        tracing::warn!("{} athletes have no seed mark", unmarked);
        warnings.push(SeedingWarning::MissingSeedMarks { count: unmarked });
    }

    let capacity = if race_type.requires_lanes() {
        lane_count as usize
    } else {
        preset.max_unlaned_per_heat
    };
    let computed = calculate_heat_count(field.len(), capacity, preset.min_per_heat, capacity)?;

    let heat_count = match planned {
        Some(plan) if plan.heat_count >= computed && plan.heat_count <= field.len() => {
            plan.heat_count
        }
        Some(plan) => {
            tracing::warn!(
                "{} athletes do not fit {} planned heats; using {}",
                field.len(),
                plan.heat_count,
                computed
            );
            warnings.push(SeedingWarning::HeatCountAdjusted {
                planned: plan.heat_count,
                actual: computed,
            });
            computed
        }
        None => computed,
    };

    if let Some(advancement) = &advancement {
        ensure_fills_next_round(
            &advancement.rule,
            heat_count,
            advancement.next_field_size,
            byes.len(),
        )?;
    }

    if heat_count > 0 && field.len() / heat_count < preset.min_per_heat {
        warnings.push(SeedingWarning::UndersizedHeats {
            smallest: field.len() / heat_count,
            min_per_heat: preset.min_per_heat,
        });
    }

    let draw = preset.lane_draw(race_type, lane_count)?;
    let assignment = distribute_to_heats(&field, heat_count);
    let mut heats = Vec::with_capacity(assignment.heat_count());
    for (i, members) in assignment.into_heats().into_iter().enumerate() {
        heats.push(draw.assign_lanes(round, i as u32 + 1, members)?);
    }

    let method = match heats.len() {
        0 => DistributionMethod::NoEntrants,
        1 => DistributionMethod::SingleHeat,
        _ => DistributionMethod::Serpentine,
    };

    tracing::info!(
        "Seeded {} round {}: {} athletes in {} heats ({} byes, {} warnings)",
        event_code,
        round,
        field.len(),
        heats.len(),
        byes.len(),
        warnings.len()
    );

    Ok(SeedingResult {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        event_code,
        race_type,
        round,
        preset_id: preset.id.clone(),
        lane_count,
        method,
        heats,
        advancement,
        byes,
        warnings,
    })
}

/// Qualify athletes out of a seeded round once its results are in
///
/// Uses `rule_override` when given, else the rule recorded on the draw.
/// Fails when the draw is for a final with no rule, or when the rule cannot
/// fill the next round the draw was planned for.
pub fn advance_round(
    draw: &SeedingResult,
    result: &RoundResult,
    rule_override: Option<&QualificationRule>,
    options: &EvaluationOptions,
) -> Result<QualificationOutcome> {
    if result.round != draw.round {
        return Err(Error::Other(format!(
            "results are for round {} but the draw is round {}",
            result.round, draw.round
        )));
    }

    let planned_field = draw.advancement.as_ref().map(|a| a.next_field_size);
    let rule = match (rule_override, &draw.advancement) {
        (Some(rule), _) => rule.clone(),
        (None, Some(advancement)) => advancement.rule.clone(),
        (None, None) => {
            return Err(Error::Infeasible(format!(
                "round {} of {} has no qualification rule",
                draw.round, draw.event_code
            )))
        }
    };

    if let Some(required) = planned_field {
        ensure_fills_next_round(&rule, draw.heats.len(), required, draw.byes.len())?;
    }

    Ok(evaluate_round(&draw.heats, &draw.byes, result, &rule, options))
}

/// Byes take places in the next round without running
fn ensure_fills_next_round(
    rule: &QualificationRule,
    heat_count: usize,
    next_field_size: usize,
    byes: usize,
) -> Result<()> {
    if heat_count == 0 {
        return Ok(());
    }
    rule.ensure_feasible(heat_count, next_field_size.saturating_sub(byes))
}
