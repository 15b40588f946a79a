//! Core domain types for the seeding engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Race types and seeded athletes
//! - Heats, round results and qualification rules
//! - Seeding results and the warnings attached to them
//! - Presets and qualification tables (the catalog)

use crate::time::{CanonicalTime, Mark};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Race Types
// ============================================================================

/// Kind of track race, which decides lane discipline and entrant identity
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RaceType {
    /// Individual race run entirely in lanes (up to 400m, hurdles)
    Sprint,
    /// Individual race that may start and run as an unlaned pack
    Distance,
    /// Team-of-four race run in lanes
    Relay,
}

impl RaceType {
    /// Whether every entrant needs a lane of their own
    pub fn requires_lanes(self) -> bool {
        match self {
            RaceType::Sprint | RaceType::Relay => true,
            RaceType::Distance => false,
        }
    }

    /// Whether an entrant is a team rather than an individual
    pub fn is_team(self) -> bool {
        matches!(self, RaceType::Relay)
    }
}

impl fmt::Display for RaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RaceType::Sprint => "sprint",
            RaceType::Distance => "distance",
            RaceType::Relay => "relay",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Athletes and Heats
// ============================================================================

/// An entrant (athlete or relay team) as seeded into a round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SeededAthlete {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub club: Option<String>,
    pub seed_mark: Mark,
    /// Pre-computed ordinal consulted when marks tie or are missing
    #[serde(default)]
    pub seed_rank: Option<u32>,
    /// Exempt from this round and carried straight into the next
    #[serde(default)]
    pub bye: bool,
}

impl SeededAthlete {
    pub fn new(id: impl Into<String>, name: impl Into<String>, seed_mark: Mark) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            club: None,
            seed_mark,
            seed_rank: None,
            bye: false,
        }
    }
}

/// One athlete's slot in a heat
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeatEntry {
    /// `None` for unlaned races
    pub lane: Option<u8>,
    pub athlete: SeededAthlete,
}

/// One race within a round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Heat {
    pub round: u32,
    pub number: u32,
    pub entries: Vec<HeatEntry>,
}

impl Heat {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Qualification and Results
// ============================================================================

/// How athletes advance from one round to the next
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualificationRule {
    /// Automatic qualifiers per heat, by finishing place
    pub places_per_heat: usize,
    /// Further qualifiers taken by time across all heats
    pub fastest_losers: usize,
    /// Time qualifiers must be at or under this time, when set
    #[serde(default)]
    pub time_standard: Option<CanonicalTime>,
}

impl QualificationRule {
    pub fn new(places_per_heat: usize, fastest_losers: usize) -> Self {
        Self {
            places_per_heat,
            fastest_losers,
            time_standard: None,
        }
    }
}

/// One starter's line in a captured round result
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultEntry {
    pub athlete_id: String,
    pub heat: u32,
    #[serde(default)]
    pub lane: Option<u8>,
    /// Finishing place within the heat, as recorded by result capture
    #[serde(default)]
    pub place: Option<u32>,
    pub mark: Mark,
}

/// All captured results of one round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct RoundResult {
    pub round: u32,
    pub entries: Vec<ResultEntry>,
}

/// How a qualifier earned their place in the next round
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualificationMethod {
    /// Top places in their heat ("Q")
    Automatic,
    /// Fastest of the rest across heats ("q")
    TimeQualifier,
    /// Exempt from the round
    Bye,
}

impl QualificationMethod {
    /// Result-sheet annotation
    pub fn code(self) -> &'static str {
        match self {
            QualificationMethod::Automatic => "Q",
            QualificationMethod::TimeQualifier => "q",
            QualificationMethod::Bye => "bye",
        }
    }
}

/// An athlete admitted to the next round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Qualifier {
    pub athlete_id: String,
    /// Heat run in this round; `None` for byes
    pub heat: Option<u32>,
    /// Qualifying time; the seed mark for byes
    pub mark: Mark,
    pub method: QualificationMethod,
}

// ============================================================================
// Seeding Results
// ============================================================================

/// Which distribution path produced the heats
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMethod {
    NoEntrants,
    SingleHeat,
    Serpentine,
}

/// Advancement planned out of a seeded round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Advancement {
    pub rule: QualificationRule,
    /// Field size the next round was planned for
    pub next_field_size: usize,
}

/// Non-fatal issue found while seeding or evaluating a round
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedingWarning {
    MissingSeedMarks { count: usize },
    UnparseableMark { athlete_id: String, raw: String },
    DuplicateAthlete { athlete_id: String },
    UndersizedHeats { smallest: usize, min_per_heat: usize },
    HeatCountAdjusted { planned: usize, actual: usize },
    PresetFallback { preset_id: String, race_type: RaceType, entrants: usize },
    MissingResults { athlete_ids: Vec<String> },
    UnknownResultEntry { athlete_id: String },
    HeatMismatch { athlete_id: String, recorded: u32, drawn: u32 },
    /// `heat` is set for a dead heat on the last automatic place, unset for
    /// a tie at the last time-qualifying place
    TieOverflow {
        extra: usize,
        mark: Mark,
        #[serde(default)]
        heat: Option<u32>,
    },
}

impl fmt::Display for SeedingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedingWarning::MissingSeedMarks { count } => {
                write!(f, "seed marks missing for {} athletes", count)
            }
            SeedingWarning::UnparseableMark { athlete_id, raw } => {
                write!(f, "unreadable seed mark {:?} for {}", raw, athlete_id)
            }
            SeedingWarning::DuplicateAthlete { athlete_id } => {
                write!(f, "athlete {} entered more than once; later entries ignored", athlete_id)
            }
            SeedingWarning::UndersizedHeats {
                smallest,
                min_per_heat,
            } => write!(
                f,
                "smallest heat has {} athletes, below the minimum of {}",
                smallest, min_per_heat
            ),
            SeedingWarning::HeatCountAdjusted { planned, actual } => write!(
                f,
                "field does not fit {} planned heats; seeded into {}",
                planned, actual
            ),
            SeedingWarning::PresetFallback {
                preset_id,
                race_type,
                entrants,
            } => write!(
                f,
                "no preset is eligible for {} {} entrants; using default '{}'",
                entrants, race_type, preset_id
            ),
            SeedingWarning::MissingResults { athlete_ids } => write!(
                f,
                "no result captured for {}; treated as DNS",
                athlete_ids.join(", ")
            ),
            SeedingWarning::UnknownResultEntry { athlete_id } => {
                write!(f, "result for {} who was not in the draw was ignored", athlete_id)
            }
            SeedingWarning::HeatMismatch {
                athlete_id,
                recorded,
                drawn,
            } => write!(
                f,
                "result for {} names heat {} but they were drawn in heat {}",
                athlete_id, recorded, drawn
            ),
            SeedingWarning::TieOverflow {
                extra,
                mark,
                heat: Some(heat),
            } => write!(
                f,
                "dead heat at {} in heat {} admitted {} automatic qualifier(s) beyond the quota",
                mark, heat, extra
            ),
            SeedingWarning::TieOverflow {
                extra,
                mark,
                heat: None,
            } => write!(
                f,
                "tie at {} for the last time-qualifying place admitted {} qualifier(s) beyond the quota",
                mark, extra
            ),
        }
    }
}

/// Full output of one seeding pass
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedingResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub event_code: String,
    pub race_type: RaceType,
    pub round: u32,
    pub preset_id: String,
    pub lane_count: u8,
    pub method: DistributionMethod,
    pub heats: Vec<Heat>,
    /// Qualification planned for this round; `None` for a final
    pub advancement: Option<Advancement>,
    #[serde(default)]
    pub byes: Vec<SeededAthlete>,
    #[serde(default)]
    pub warnings: Vec<SeedingWarning>,
}

impl SeedingResult {
    /// Total athletes drawn into heats
    pub fn entrant_count(&self) -> usize {
        self.heats.iter().map(Heat::len).sum()
    }
}

// ============================================================================
// Catalog Types
// ============================================================================

/// How a preset structures the rounds of an event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundPolicy {
    /// Heats, semifinals and final per the qualification table
    Progressive,
    /// One round; every heat is part of the final and ranked by time
    TimedFinal,
}

/// Entrant range a preset is recommended for
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Eligibility {
    pub race_types: Vec<RaceType>,
    pub min_entrants: usize,
    #[serde(default)]
    pub max_entrants: Option<usize>,
}

/// Named configuration bundle selected per event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SeedingPreset {
    pub id: String,
    pub label: String,
    pub lane_count: u8,
    pub min_per_heat: usize,
    /// Heat-size cap for races that run without lanes
    pub max_unlaned_per_heat: usize,
    pub final_size: usize,
    pub unlaned_final_size: usize,
    #[serde(default)]
    pub qualification_table: Option<String>,
    pub policy: RoundPolicy,
    #[serde(default)]
    pub eligibility: Vec<Eligibility>,
    /// Replaces the standard center-outward lane order
    #[serde(default)]
    pub lane_priority: Option<Vec<u8>>,
}

/// One round of a bracket's structure; the final is implied after the last
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BracketRound {
    pub heats: usize,
    pub places_per_heat: usize,
    pub fastest_losers: usize,
}

/// Round structure for an entrant-count range
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bracket {
    pub min_entrants: usize,
    pub max_entrants: usize,
    pub rounds: Vec<BracketRound>,
}

/// Brackets for one race type
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TableSection {
    pub race_type: RaceType,
    pub brackets: Vec<Bracket>,
}

/// Static reference data mapping entry counts to round structures
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualificationTable {
    pub id: String,
    pub label: String,
    pub sections: Vec<TableSection>,
}

/// The complete catalog of presets and qualification tables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub default_preset: String,
    /// Event codes that are relays without an `NxD` prefix
    pub relay_codes: Vec<String>,
    /// Longest distance still classified as a sprint
    pub sprint_max_distance_m: u32,
    /// Metres per unit for event codes not given in metres (`mile`, `km`)
    #[serde(default)]
    pub distance_units: HashMap<String, u32>,
    /// Recommendation order is catalog order
    pub presets: Vec<SeedingPreset>,
    pub tables: HashMap<String, QualificationTable>,
}
