#![forbid(unsafe_code)]

//! Core domain model and seeding logic for track heats.
//!
//! This crate provides:
//! - Domain types (marks, athletes, heats, results, presets)
//! - Catalog of presets and qualification tables
//! - Heat distribution, lane draw and qualification
//! - Round planning and the seeding engine
//! - Roster, result and start-list CSV files

pub mod types;
pub mod error;
pub mod time;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod distributor;
pub mod lanes;
pub mod qualification;
pub mod planner;
pub mod engine;
pub mod roster;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use time::{format_time, parse_mark, CanonicalTime, Mark, NoMark};
pub use catalog::{build_default_catalog, get_race_type_from_event, PresetRecommendation};
pub use config::Config;
pub use distributor::{calculate_heat_count, distribute_to_heats, HeatAssignment};
pub use lanes::{lane_priority, LaneDraw};
pub use qualification::{
    determine_qualifiers, evaluate_round, rank_after_qualification_round, EvaluationOptions,
    OverflowTie, Qualification, QualificationOutcome, RankedPerformance,
};
pub use planner::{calculate_round_structure, PlannedRound, RoundPlan, Stage};
pub use engine::{advance_round, seed_round, SeedingRequest};
pub use roster::Roster;
