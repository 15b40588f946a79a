//! Preset catalog and qualification tables.
//!
//! The built-in catalog holds three presets:
//! - `timed_final`: one round, heats ranked on time (default for small fields)
//! - `championship`: 8 lanes, heats/semis/final per the `wa_8_lane` table
//! - `club_meet`: 6 lanes, shorter progression per the `club_6_lane` table
//!
//! A catalog is built once at startup and passed to every planning and
//! seeding call. It can be replaced wholesale by a TOML file.

use crate::lanes::{validate_lane_priority, LaneDraw};
use crate::types::*;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// A preset picked for an event, and whether it was the fallback
#[derive(Clone, Debug)]
pub struct PresetRecommendation<'a> {
    pub preset: &'a SeedingPreset,
    /// Set when no eligibility range matched and the default was used
    pub fallback: Option<SeedingWarning>,
}

/// Builds the default catalog with the built-in presets and tables
pub fn build_default_catalog() -> Catalog {
    let presets = vec![
        SeedingPreset {
            id: "timed_final".into(),
            label: "Timed final".into(),
            lane_count: 8,
            min_per_heat: 2,
            max_unlaned_per_heat: 20,
            final_size: 8,
            unlaned_final_size: 20,
            qualification_table: None,
            policy: RoundPolicy::TimedFinal,
            eligibility: vec![
                Eligibility {
                    race_types: vec![RaceType::Sprint, RaceType::Relay],
                    min_entrants: 1,
                    max_entrants: Some(8),
                },
                Eligibility {
                    race_types: vec![RaceType::Distance],
                    min_entrants: 1,
                    max_entrants: Some(20),
                },
            ],
            lane_priority: None,
        },
        SeedingPreset {
            id: "championship".into(),
            label: "Championship (8 lanes)".into(),
            lane_count: 8,
            min_per_heat: 4,
            max_unlaned_per_heat: 16,
            final_size: 8,
            unlaned_final_size: 12,
            qualification_table: Some("wa_8_lane".into()),
            policy: RoundPolicy::Progressive,
            eligibility: vec![
                Eligibility {
                    race_types: vec![RaceType::Sprint],
                    min_entrants: 9,
                    max_entrants: Some(72),
                },
                Eligibility {
                    race_types: vec![RaceType::Relay],
                    min_entrants: 9,
                    max_entrants: Some(40),
                },
                Eligibility {
                    race_types: vec![RaceType::Distance],
                    min_entrants: 21,
                    max_entrants: Some(64),
                },
            ],
            lane_priority: None,
        },
        // Selected explicitly; never recommended
        SeedingPreset {
            id: "club_meet".into(),
            label: "Club meet (6 lanes)".into(),
            lane_count: 6,
            min_per_heat: 3,
            max_unlaned_per_heat: 20,
            final_size: 6,
            unlaned_final_size: 12,
            qualification_table: Some("club_6_lane".into()),
            policy: RoundPolicy::Progressive,
            eligibility: vec![],
            lane_priority: None,
        },
    ];

    let mut tables = HashMap::new();

    // 8-lane championship progression. Each bracket ends in an 8-lane final
    // (12 for unlaned distance races).
    let laned_8 = vec![
        bracket(9, 16, &[(2, 3, 2)]),
        bracket(17, 24, &[(3, 2, 2)]),
        bracket(25, 32, &[(4, 2, 0)]),
        bracket(33, 40, &[(5, 1, 3)]),
        bracket(41, 48, &[(6, 3, 6), (3, 2, 2)]),
        bracket(49, 56, &[(7, 3, 3), (3, 2, 2)]),
        bracket(57, 64, &[(8, 2, 8), (3, 2, 2)]),
        bracket(65, 72, &[(9, 2, 6), (3, 2, 2)]),
    ];
    tables.insert(
        "wa_8_lane".to_string(),
        QualificationTable {
            id: "wa_8_lane".into(),
            label: "Championship, 8 lanes".into(),
            sections: vec![
                TableSection {
                    race_type: RaceType::Sprint,
                    brackets: laned_8.clone(),
                },
                TableSection {
                    race_type: RaceType::Relay,
                    brackets: laned_8[..4].to_vec(),
                },
                TableSection {
                    race_type: RaceType::Distance,
                    brackets: vec![
                        bracket(13, 32, &[(2, 5, 2)]),
                        bracket(33, 48, &[(3, 4, 0)]),
                        bracket(49, 64, &[(4, 2, 4)]),
                    ],
                },
            ],
        },
    );

    let laned_6 = vec![
        bracket(7, 12, &[(2, 2, 2)]),
        bracket(13, 18, &[(3, 1, 3)]),
        bracket(19, 24, &[(4, 1, 2)]),
        bracket(25, 36, &[(6, 2, 6), (3, 1, 3)]),
    ];
    tables.insert(
        "club_6_lane".to_string(),
        QualificationTable {
            id: "club_6_lane".into(),
            label: "Club meet, 6 lanes".into(),
            sections: vec![
                TableSection {
                    race_type: RaceType::Sprint,
                    brackets: laned_6.clone(),
                },
                TableSection {
                    race_type: RaceType::Relay,
                    brackets: laned_6,
                },
                TableSection {
                    race_type: RaceType::Distance,
                    brackets: vec![bracket(13, 40, &[(2, 5, 2)])],
                },
            ],
        },
    );

    Catalog {
        presets,
        tables,
        default_preset: "timed_final".into(),
        relay_codes: vec!["smr".into(), "dmr".into(), "medley".into()],
        sprint_max_distance_m: 400,
        distance_units: HashMap::from([
            ("mile".to_string(), 1609),
            ("mi".to_string(), 1609),
            ("km".to_string(), 1000),
            ("k".to_string(), 1000),
        ]),
    }
}

fn bracket(min_entrants: usize, max_entrants: usize, rounds: &[(usize, usize, usize)]) -> Bracket {
    Bracket {
        min_entrants,
        max_entrants,
        rounds: rounds
            .iter()
            .map(|&(heats, places_per_heat, fastest_losers)| BracketRound {
                heats,
                places_per_heat,
                fastest_losers,
            })
            .collect(),
    }
}

/// Classify an event code
///
/// `4x100m`-style codes and registered relay codes are relays. Otherwise the
/// leading distance decides: up to the catalog's sprint threshold is a
/// sprint, longer is distance. The distance is in metres unless the rest of
/// the code is a registered unit (`mile`, `2mile`, `5km`); a bare unit counts
/// as one. Codes with no distance at all are treated as sprints so lanes stay
/// mandatory.
pub fn get_race_type_from_event(catalog: &Catalog, event_code: &str) -> RaceType {
    let code: String = event_code
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    if catalog.relay_codes.iter().any(|r| r.eq_ignore_ascii_case(&code)) {
        return RaceType::Relay;
    }

    let digits_len = code.bytes().take_while(u8::is_ascii_digit).count();
    let rest = &code[digits_len..];
    if digits_len > 0 && rest.len() > 1 && rest.starts_with('x') {
        return RaceType::Relay;
    }

    let unit = catalog
        .distance_units
        .get(rest)
        .or_else(|| rest.strip_suffix('s').and_then(|r| catalog.distance_units.get(r)));
    let count = match (code[..digits_len].parse::<u32>(), unit) {
        (Ok(count), _) => Some(count),
        (Err(_), Some(_)) => Some(1),
        (Err(_), None) => None,
    };
    let distance = count.map(|count| count.saturating_mul(unit.copied().unwrap_or(1)));

    match distance {
        Some(distance) if distance <= catalog.sprint_max_distance_m => RaceType::Sprint,
        Some(_) => RaceType::Distance,
        None => {
            tracing::debug!("No distance in event code {:?}; treating as sprint", event_code);
            RaceType::Sprint
        }
    }
}

impl SeedingPreset {
    /// Largest heat the preset allows for a race type
    pub fn heat_capacity(&self, race_type: RaceType) -> usize {
        if race_type.requires_lanes() {
            self.lane_count as usize
        } else {
            self.max_unlaned_per_heat
        }
    }

    /// Field size the final is planned for
    pub fn final_size_for(&self, race_type: RaceType) -> usize {
        if race_type.requires_lanes() {
            self.final_size
        } else {
            self.unlaned_final_size
        }
    }

    /// Lane draw for this preset on a venue with `lane_count` lanes
    ///
    /// A custom priority only applies when it was written for that many lanes.
    pub fn lane_draw(&self, race_type: RaceType, lane_count: u8) -> Result<LaneDraw> {
        match &self.lane_priority {
            Some(priority) if priority.len() == lane_count as usize => {
                LaneDraw::with_priority(lane_count, race_type, priority.clone())
            }
            _ => Ok(LaneDraw::new(lane_count, race_type)),
        }
    }

    fn is_eligible(&self, race_type: RaceType, entrants: usize) -> bool {
        self.eligibility.iter().any(|e| {
            e.race_types.contains(&race_type)
                && entrants >= e.min_entrants
                && e.max_entrants.map_or(true, |max| entrants <= max)
        })
    }
}

impl Catalog {
    /// Load a catalog from a TOML file and validate it
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog: Catalog = toml::from_str(&contents)?;

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }

        tracing::info!("Loaded catalog with {} presets from {:?}", catalog.presets.len(), path);
        Ok(catalog)
    }

    pub fn get_preset(&self, id: &str) -> Option<&SeedingPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Look up a preset, failing with `UnknownPreset`
    pub fn require_preset(&self, id: &str) -> Result<&SeedingPreset> {
        self.get_preset(id)
            .ok_or_else(|| Error::UnknownPreset(id.to_string()))
    }

    pub fn get_all_presets(&self) -> &[SeedingPreset] {
        &self.presets
    }

    /// First preset (in catalog order) eligible for the race type and field
    ///
    /// Falls back to the default preset and says so in `fallback`.
    pub fn get_recommended_preset(
        &self,
        race_type: RaceType,
        entrants: usize,
    ) -> Result<PresetRecommendation<'_>> {
        if let Some(preset) = self
            .presets
            .iter()
            .find(|p| p.is_eligible(race_type, entrants))
        {
            tracing::debug!("Recommended preset {} for {} {}", preset.id, entrants, race_type);
            return Ok(PresetRecommendation {
                preset,
                fallback: None,
            });
        }

        let preset = self.require_preset(&self.default_preset)?;
        tracing::warn!(
            "No preset eligible for {} {} entrants; falling back to {}",
            entrants,
            race_type,
            preset.id
        );
        Ok(PresetRecommendation {
            preset,
            fallback: Some(SeedingWarning::PresetFallback {
                preset_id: preset.id.clone(),
                race_type,
                entrants,
            }),
        })
    }

    pub fn table(&self, id: &str) -> Option<&QualificationTable> {
        self.tables.get(id)
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.get_preset(&self.default_preset).is_none() {
            errors.push(format!(
                "Default preset '{}' is not in the catalog",
                self.default_preset
            ));
        }

        for (id, table) in &self.tables {
            if id != &table.id {
                errors.push(format!(
                    "Table key '{}' doesn't match table.id '{}'",
                    id, table.id
                ));
            }
            for section in &table.sections {
                let mut brackets: Vec<&Bracket> = section.brackets.iter().collect();
                brackets.sort_by_key(|b| b.min_entrants);
                for pair in brackets.windows(2) {
                    if pair[1].min_entrants <= pair[0].max_entrants {
                        errors.push(format!(
                            "Table '{}' {}: brackets {}-{} and {}-{} overlap",
                            id,
                            section.race_type,
                            pair[0].min_entrants,
                            pair[0].max_entrants,
                            pair[1].min_entrants,
                            pair[1].max_entrants
                        ));
                    }
                }
                for b in &section.brackets {
                    if b.min_entrants > b.max_entrants {
                        errors.push(format!(
                            "Table '{}' {}: bracket min {} > max {}",
                            id, section.race_type, b.min_entrants, b.max_entrants
                        ));
                    }
                    if b.rounds.is_empty() {
                        errors.push(format!(
                            "Table '{}' {}: bracket {}-{} has no rounds",
                            id, section.race_type, b.min_entrants, b.max_entrants
                        ));
                    }
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for preset in &self.presets {
            let id = &preset.id;
            if id.is_empty() {
                errors.push("Preset has empty ID".to_string());
            }
            if !seen.insert(id.as_str()) {
                errors.push(format!("Preset '{}' is defined twice", id));
            }
            if preset.label.is_empty() {
                errors.push(format!("Preset '{}' has empty label", id));
            }
            if preset.lane_count == 0 || preset.max_unlaned_per_heat == 0 {
                errors.push(format!("Preset '{}' has zero heat capacity", id));
                continue;
            }
            if preset.min_per_heat > preset.lane_count as usize
                || preset.min_per_heat > preset.max_unlaned_per_heat
            {
                errors.push(format!(
                    "Preset '{}': minimum heat size {} exceeds heat capacity",
                    id, preset.min_per_heat
                ));
            }
            if preset.final_size == 0 || preset.final_size > preset.lane_count as usize {
                errors.push(format!(
                    "Preset '{}': final size {} does not fit {} lanes",
                    id, preset.final_size, preset.lane_count
                ));
            }
            if preset.unlaned_final_size == 0
                || preset.unlaned_final_size > preset.max_unlaned_per_heat
            {
                errors.push(format!(
                    "Preset '{}': unlaned final size {} does not fit a heat of {}",
                    id, preset.unlaned_final_size, preset.max_unlaned_per_heat
                ));
            }
            if let Some(priority) = &preset.lane_priority {
                if let Err(e) = validate_lane_priority(priority, preset.lane_count) {
                    errors.push(format!("Preset '{}': {}", id, e));
                }
            }

            match (&preset.policy, &preset.qualification_table) {
                (RoundPolicy::Progressive, None) => {
                    errors.push(format!("Preset '{}' is progressive but has no table", id));
                }
                (_, Some(table_id)) => match self.tables.get(table_id) {
                    Some(table) => validate_table_for_preset(preset, table, &mut errors),
                    None => errors.push(format!(
                        "Preset '{}' references non-existent table '{}'",
                        id, table_id
                    )),
                },
                (RoundPolicy::TimedFinal, None) => {}
            }
        }

        errors
    }
}

/// Walk every bracket at both ends of its range with the preset's limits
fn validate_table_for_preset(
    preset: &SeedingPreset,
    table: &QualificationTable,
    errors: &mut Vec<String>,
) {
    if preset.policy == RoundPolicy::Progressive {
        validate_eligibility_coverage(preset, table, errors);
    }

    for section in &table.sections {
        let capacity = preset.heat_capacity(section.race_type);
        let final_size = preset.final_size_for(section.race_type);

        for b in &section.brackets {
            let Some(first) = b.rounds.first() else {
                continue;
            };
            let label = format!(
                "Preset '{}' table '{}' {} {}-{}",
                preset.id, table.id, section.race_type, b.min_entrants, b.max_entrants
            );

            if first.heats == 0 || b.min_entrants / first.heats < preset.min_per_heat {
                errors.push(format!(
                    "{}: {} heats leave heats below the minimum of {}",
                    label, first.heats, preset.min_per_heat
                ));
            }

            let mut field = b.max_entrants;
            for round in &b.rounds {
                if round.heats == 0 || field.div_ceil(round.heats) > capacity {
                    errors.push(format!(
                        "{}: {} athletes do not fit {} heats of {}",
                        label, field, round.heats, capacity
                    ));
                    break;
                }
                field = round.heats * round.places_per_heat + round.fastest_losers;
            }
            if field != final_size {
                errors.push(format!(
                    "{}: rounds produce a final of {}, expected {}",
                    label, field, final_size
                ));
            }
        }
    }
}

/// Every field a preset is recommended for must have a bracket, apart from
/// fields below the smallest bracket, which run as a single final
fn validate_eligibility_coverage(
    preset: &SeedingPreset,
    table: &QualificationTable,
    errors: &mut Vec<String>,
) {
    for range in &preset.eligibility {
        for race_type in &range.race_types {
            let Some(section) = table.sections.iter().find(|s| s.race_type == *race_type) else {
                continue;
            };
            let Some(smallest) = section.brackets.iter().map(|b| b.min_entrants).min() else {
                continue;
            };
            let Some(max) = range.max_entrants else {
                errors.push(format!(
                    "Preset '{}' is recommended for any number of {} entrants but table '{}' is bounded",
                    preset.id, race_type, table.id
                ));
                continue;
            };

            let uncovered = (range.min_entrants.max(smallest)..=max).find(|n| {
                !section
                    .brackets
                    .iter()
                    .any(|b| (b.min_entrants..=b.max_entrants).contains(n))
            });
            if let Some(n) = uncovered {
                errors.push(format!(
                    "Preset '{}' is recommended for {} {} entrants but table '{}' has no bracket for them",
                    preset.id, n, race_type, table.id
                ));
            }
        }
    }
}
