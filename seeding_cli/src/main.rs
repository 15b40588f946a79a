use clap::{Parser, Subcommand, ValueEnum};
use seeding_core::roster::{load_roster, load_round_result, write_roster, write_start_list};
use seeding_core::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "heats")]
#[command(about = "Seed track events into heats and advance qualifiers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the presets in the catalog
    Presets,

    /// Show the round structure for an event
    Plan {
        /// Event code, e.g. 100m, 1500m, 4x400m
        #[arg(long)]
        event: String,

        #[arg(long)]
        entrants: usize,

        /// Preset id (default: recommended for the event)
        #[arg(long)]
        preset: Option<String>,

        #[arg(long, value_enum, default_value = "table")]
        format: Format,
    },

    /// Seed a round from a roster CSV
    Seed {
        /// Roster CSV (id,name,club,seed_mark,seed_rank,bye)
        roster: PathBuf,

        #[arg(long)]
        event: String,

        #[arg(long, default_value_t = 1)]
        round: u32,

        /// Entrants in the whole event, used to plan rounds (default: roster size)
        #[arg(long)]
        event_entrants: Option<usize>,

        #[arg(long)]
        preset: Option<String>,

        /// Lanes available, replacing the preset's lane count
        #[arg(long)]
        lanes: Option<u8>,

        #[arg(long, value_enum, default_value = "table")]
        format: Format,

        /// Write the draw as JSON, for `heats qualify`
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write the start list as CSV
        #[arg(long)]
        start_list: Option<PathBuf>,
    },

    /// Rank a finished round and pick the qualifiers
    Qualify {
        /// Draw JSON written by `heats seed --out`
        #[arg(long)]
        draw: PathBuf,

        /// Results CSV (athlete_id,heat,lane,place,mark)
        #[arg(long)]
        results: PathBuf,

        /// Automatic qualifiers per heat, replacing the planned rule
        #[arg(long, requires = "fastest_losers")]
        places: Option<usize>,

        #[arg(long, requires = "places")]
        fastest_losers: Option<usize>,

        /// Seed the next round by this round's times
        #[arg(long)]
        reseed_by_time: bool,

        #[arg(long, value_enum, default_value = "table")]
        format: Format,

        /// Write the next round's roster as CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show how marks are read and displayed
    Mark {
        #[arg(required = true)]
        marks: Vec<String>,
    },
}

fn main() {
    seeding_core::logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Presets => cmd_presets(&config),
        Commands::Plan {
            event,
            entrants,
            preset,
            format,
        } => cmd_plan(&config, &event, entrants, preset.as_deref(), format),
        Commands::Seed {
            roster,
            event,
            round,
            event_entrants,
            preset,
            lanes,
            format,
            out,
            start_list,
        } => cmd_seed(
            &config,
            SeedArgs {
                roster,
                event,
                round,
                event_entrants,
                preset,
                lanes,
                format,
                out,
                start_list,
            },
        ),
        Commands::Qualify {
            draw,
            results,
            places,
            fastest_losers,
            reseed_by_time,
            format,
            out,
        } => {
            let rule = places
                .zip(fastest_losers)
                .map(|(places, fastest)| QualificationRule::new(places, fastest));
            cmd_qualify(
                &config,
                &draw,
                &results,
                rule,
                reseed_by_time,
                format,
                out.as_deref(),
            )
        }
        Commands::Mark { marks } => {
            cmd_mark(&marks);
            Ok(())
        }
    }
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = config.load_catalog()?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

/// Explicit preset, or the recommendation with its fallback warning
fn select_preset<'a>(
    catalog: &'a Catalog,
    preset: Option<&str>,
    race_type: RaceType,
    entrants: usize,
) -> Result<(&'a SeedingPreset, Option<SeedingWarning>)> {
    match preset {
        Some(id) => Ok((catalog.require_preset(id)?, None)),
        None => {
            let recommendation = catalog.get_recommended_preset(race_type, entrants)?;
            tracing::debug!(
                "Recommended preset {} for {} {} entrants",
                recommendation.preset.id,
                entrants,
                race_type
            );
            Ok((recommendation.preset, recommendation.fallback))
        }
    }
}

fn cmd_presets(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    println!("{:<14} {:>5}  {:<12} {}", "PRESET", "LANES", "POLICY", "LABEL");
    for preset in catalog.get_all_presets() {
        let policy = match preset.policy {
            RoundPolicy::Progressive => "progressive",
            RoundPolicy::TimedFinal => "timed final",
        };
        let marker = if preset.id == catalog.default_preset {
            " (default)"
        } else {
            ""
        };
        println!(
            "{:<14} {:>5}  {:<12} {}{}",
            preset.id, preset.lane_count, policy, preset.label, marker
        );
        for range in &preset.eligibility {
            let kinds: Vec<String> = range.race_types.iter().map(|r| r.to_string()).collect();
            let upper = range
                .max_entrants
                .map(|max| max.to_string())
                .unwrap_or_else(|| "+".into());
            println!(
                "{:<14} {:>5}  {} entrants {}-{}",
                "",
                "",
                kinds.join("/"),
                range.min_entrants,
                upper
            );
        }
    }
    Ok(())
}

fn cmd_plan(
    config: &Config,
    event: &str,
    entrants: usize,
    preset: Option<&str>,
    format: Format,
) -> Result<()> {
    let catalog = load_catalog(config)?;
    let race_type = get_race_type_from_event(&catalog, event);
    let (preset, fallback) = select_preset(&catalog, preset, race_type, entrants)?;
    let plan = calculate_round_structure(entrants, race_type, preset, &catalog)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        Format::Table => {
            println!(
                "{} ({}), {} entrants, preset {}",
                event, race_type, entrants, plan.preset_id
            );
            for round in &plan.rounds {
                let rule = match &round.rule {
                    Some(rule) => format!(
                        "top {} per heat + {} fastest",
                        rule.places_per_heat, rule.fastest_losers
                    ),
                    None => String::new(),
                };
                println!(
                    "  Round {}  {:<11} {:>3} athletes  {:>2} heats  {}",
                    round.number,
                    stage_label(round.stage),
                    round.field_size,
                    round.heat_count,
                    rule
                );
            }
            if let Some(warning) = fallback {
                println!("  ! {}", warning);
            }
        }
    }
    Ok(())
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Heats => "heats",
        Stage::Semifinal => "semifinal",
        Stage::Final => "final",
        Stage::TimedFinal => "timed final",
    }
}

struct SeedArgs {
    roster: PathBuf,
    event: String,
    round: u32,
    event_entrants: Option<usize>,
    preset: Option<String>,
    lanes: Option<u8>,
    format: Format,
    out: Option<PathBuf>,
    start_list: Option<PathBuf>,
}

fn cmd_seed(config: &Config, args: SeedArgs) -> Result<()> {
    let catalog = load_catalog(config)?;
    let roster = load_roster(&args.roster)?;
    let race_type = get_race_type_from_event(&catalog, &args.event);
    let entrants = args.event_entrants.unwrap_or(roster.athletes.len());

    let (preset, fallback) = select_preset(&catalog, args.preset.as_deref(), race_type, entrants)?;
    let plan = calculate_round_structure(entrants, race_type, preset, &catalog)?;
    let planned = plan.round(args.round).ok_or_else(|| {
        Error::Other(format!(
            "{} with {} entrants has {} round(s); no round {}",
            args.event,
            entrants,
            plan.rounds.len(),
            args.round
        ))
    })?;

    let mut warnings = roster.warnings;
    warnings.extend(fallback);

    let draw = seed_round(SeedingRequest {
        event_code: args.event.clone(),
        race_type,
        round: args.round,
        athletes: roster.athletes,
        preset,
        lane_count: args.lanes.or(config.seeding.lane_count),
        planned: Some(planned),
        advancement: plan.advancement(args.round),
        warnings,
    })?;

    if let Some(path) = &args.out {
        let mut file = create(path)?;
        serde_json::to_writer_pretty(&mut file, &draw)?;
        file.flush()?;
        tracing::info!("Wrote draw to {:?}", path);
    }
    if let Some(path) = &args.start_list {
        write_start_list(create(path)?, &draw)?;
        tracing::info!("Wrote start list to {:?}", path);
    }

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&draw)?),
        Format::Table => display_draw(&draw),
    }
    Ok(())
}

fn display_draw(draw: &SeedingResult) {
    println!(
        "{} round {} ({}), preset {}: {} athletes in {} heat(s)",
        draw.event_code,
        draw.round,
        draw.race_type,
        draw.preset_id,
        draw.entrant_count(),
        draw.heats.len()
    );

    for heat in &draw.heats {
        println!();
        println!("Heat {}", heat.number);
        for entry in &heat.entries {
            let lane = entry
                .lane
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "  {:>4}  {:<10} {:<24} {:<16} {}",
                lane,
                entry.athlete.id,
                entry.athlete.name,
                entry.athlete.club.as_deref().unwrap_or(""),
                format_time(entry.athlete.seed_mark)
            );
        }
    }

    if !draw.byes.is_empty() {
        println!();
        println!("Byes");
        for athlete in &draw.byes {
            println!("        {:<10} {}", athlete.id, athlete.name);
        }
    }

    if let Some(advancement) = &draw.advancement {
        println!();
        println!(
            "Advance: top {} per heat + {} fastest to a field of {}",
            advancement.rule.places_per_heat,
            advancement.rule.fastest_losers,
            advancement.next_field_size
        );
    }

    display_warnings(&draw.warnings);
}

fn cmd_qualify(
    config: &Config,
    draw_path: &Path,
    results_path: &Path,
    rule: Option<QualificationRule>,
    reseed_by_time: bool,
    format: Format,
    out: Option<&Path>,
) -> Result<()> {
    let draw: SeedingResult = serde_json::from_reader(File::open(draw_path)?)?;
    let (result, read_warnings) = load_round_result(results_path, draw.round)?;

    let options = EvaluationOptions {
        reseed_by_round_time: reseed_by_time || config.seeding.reseed_by_round_time,
    };
    let mut outcome = advance_round(&draw, &result, rule.as_ref(), &options)?;
    let mut warnings = read_warnings;
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;

    if let Some(path) = out {
        write_roster(create(path)?, &outcome.next_round)?;
        tracing::info!("Wrote next round roster to {:?}", path);
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Format::Table => display_outcome(&draw, &outcome),
    }
    Ok(())
}

fn display_outcome(draw: &SeedingResult, outcome: &QualificationOutcome) {
    println!(
        "{} round {}: {} qualifiers",
        draw.event_code,
        outcome.round,
        outcome.qualifiers.len()
    );
    println!();

    for performance in &outcome.ranking {
        let place = performance
            .overall_place
            .map(|p| p.to_string())
            .unwrap_or_default();
        let code = outcome
            .qualifiers
            .iter()
            .find(|q| q.athlete_id == performance.athlete_id)
            .map(|q| q.method.code())
            .unwrap_or("");
        println!(
            "  {:>4}  {:<10} heat {:<3} {:>10}  {}",
            place,
            performance.athlete_id,
            performance.heat,
            format_time(performance.mark),
            code
        );
    }

    for qualifier in outcome
        .qualifiers
        .iter()
        .filter(|q| q.method == QualificationMethod::Bye)
    {
        println!("  {:>4}  {:<10} bye", "", qualifier.athlete_id);
    }

    if outcome.tie_overflow > 0 {
        println!();
        println!("Ties admitted {} extra qualifier(s)", outcome.tie_overflow);
    }

    display_warnings(&outcome.warnings);
}

fn display_warnings(warnings: &[SeedingWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for warning in warnings {
        println!("  - {}", warning);
    }
}

fn cmd_mark(marks: &[String]) {
    for text in marks {
        let mark = parse_mark(text);
        match mark {
            Mark::Time(time) => println!("{}\t{} ms\t{}", text, time.as_millis(), format_time(mark)),
            Mark::NoMark(NoMark::Invalid) => println!("{}\tinvalid", text),
            Mark::NoMark(NoMark::Blank) => println!("{}\tblank", text),
            Mark::NoMark(no_mark) => println!("{}\t-\t{}", text, no_mark.token()),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}
