//! CSV readers and writers for rosters, round results and start lists.
//!
//! Rows are read with serde through the `csv` crate. Marks arrive as text and
//! are parsed here; a mark that cannot be read is kept as
//! [`NoMark::Invalid`](crate::NoMark::Invalid) and reported as a warning.

use crate::time::{format_time, parse_mark, Mark, NoMark};
use crate::{Result, ResultEntry, RoundResult, SeededAthlete, SeedingResult, SeedingWarning};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Athletes read from a roster file, with any data defects found
#[derive(Clone, Debug, Default)]
pub struct Roster {
    pub athletes: Vec<SeededAthlete>,
    pub warnings: Vec<SeedingWarning>,
}

/// A row of a roster file: `id,name,club,seed_mark,seed_rank,bye`
#[derive(Debug, Serialize, Deserialize)]
struct RosterRow {
    id: String,
    name: String,
    #[serde(default)]
    club: Option<String>,
    #[serde(default)]
    seed_mark: String,
    #[serde(default)]
    seed_rank: Option<u32>,
    #[serde(default)]
    bye: String,
}

/// A row of a result file: `athlete_id,heat,lane,place,mark`
#[derive(Debug, Deserialize)]
struct ResultRow {
    athlete_id: String,
    heat: u32,
    #[serde(default)]
    lane: Option<u8>,
    #[serde(default)]
    place: Option<u32>,
    #[serde(default)]
    mark: String,
}

/// A row of a published start list
#[derive(Debug, Serialize)]
struct StartListRow<'a> {
    round: u32,
    heat: u32,
    lane: Option<u8>,
    athlete_id: &'a str,
    name: &'a str,
    club: Option<&'a str>,
    seed_mark: String,
}

fn read_mark(athlete_id: &str, raw: &str, warnings: &mut Vec<SeedingWarning>) -> Mark {
    let mark = parse_mark(raw);
    if mark == Mark::NoMark(NoMark::Invalid) {
        tracing::warn!("Unreadable mark {:?} for {}", raw, athlete_id);
        warnings.push(SeedingWarning::UnparseableMark {
            athlete_id: athlete_id.to_string(),
            raw: raw.to_string(),
        });
    }
    mark
}

fn read_bye(athlete_id: &str, raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "x" => true,
        "" | "false" | "0" | "no" | "n" => false,
        other => {
            tracing::warn!("Unrecognised bye flag {:?} for {}; treated as no bye", other, athlete_id);
            false
        }
    }
}

/// Read a roster from any CSV source
pub fn read_roster<R: Read>(reader: R) -> Result<Roster> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut roster = Roster::default();
    for row in csv_reader.deserialize() {
        let row: RosterRow = row?;
        let seed_mark = read_mark(&row.id, &row.seed_mark, &mut roster.warnings);
        let bye = read_bye(&row.id, &row.bye);
        roster.athletes.push(SeededAthlete {
            club: row.club.filter(|c| !c.is_empty()),
            seed_rank: row.seed_rank,
            bye,
            seed_mark,
            name: row.name,
            id: row.id,
        });
    }

    tracing::debug!("Read {} roster rows", roster.athletes.len());
    Ok(roster)
}

/// Read a roster file
pub fn load_roster(path: &Path) -> Result<Roster> {
    let file = File::open(path)?;
    let roster = read_roster(file)?;
    tracing::info!("Loaded {} athletes from {:?}", roster.athletes.len(), path);
    Ok(roster)
}

/// Write athletes in the roster format, e.g. the field for the next round
pub fn write_roster<W: Write>(writer: W, athletes: &[SeededAthlete]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for athlete in athletes {
        csv_writer.serialize(RosterRow {
            id: athlete.id.clone(),
            name: athlete.name.clone(),
            club: athlete.club.clone(),
            seed_mark: format_time(athlete.seed_mark),
            seed_rank: athlete.seed_rank,
            bye: if athlete.bye { "true".into() } else { String::new() },
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read the captured results of `round` from any CSV source
///
/// A blank place means the heat place is derived from times when ranking.
pub fn read_round_result<R: Read>(
    reader: R,
    round: u32,
) -> Result<(RoundResult, Vec<SeedingWarning>)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut result = RoundResult {
        round,
        entries: Vec::new(),
    };
    let mut warnings = Vec::new();
    for row in csv_reader.deserialize() {
        let row: ResultRow = row?;
        let mark = read_mark(&row.athlete_id, &row.mark, &mut warnings);
        result.entries.push(ResultEntry {
            athlete_id: row.athlete_id,
            heat: row.heat,
            lane: row.lane,
            place: row.place,
            mark,
        });
    }

    Ok((result, warnings))
}

/// Read a result file for `round`
pub fn load_round_result(path: &Path, round: u32) -> Result<(RoundResult, Vec<SeedingWarning>)> {
    let file = File::open(path)?;
    let loaded = read_round_result(file, round)?;
    tracing::info!(
        "Loaded {} results for round {} from {:?}",
        loaded.0.entries.len(),
        round,
        path
    );
    Ok(loaded)
}

/// Write the start list of a seeded round, one row per heat entry
pub fn write_start_list<W: Write>(writer: W, draw: &SeedingResult) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for heat in &draw.heats {
        for entry in &heat.entries {
            csv_writer.serialize(StartListRow {
                round: heat.round,
                heat: heat.number,
                lane: entry.lane,
                athlete_id: &entry.athlete.id,
                name: &entry.athlete.name,
                club: entry.athlete.club.as_deref(),
                seed_mark: format_time(entry.athlete.seed_mark),
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const ROSTER: &str = "\
id,name,club,seed_mark,seed_rank,bye
a1,Ada Quick,Harriers,10.91,,
a2,Ben Steady,,11.02,3,
a3,Cal Late,Striders,,,yes
a4,Dee Typo,Harriers,11..2,,
";

    #[test]
    fn test_read_roster() {
        let roster = read_roster(Cursor::new(ROSTER)).unwrap();
        assert_eq!(roster.athletes.len(), 4);

        let a1 = &roster.athletes[0];
        assert_eq!(a1.seed_mark, Mark::from_millis(10_910));
        assert_eq!(a1.club.as_deref(), Some("Harriers"));
        assert!(!a1.bye);

        assert_eq!(roster.athletes[1].club, None);
        assert_eq!(roster.athletes[1].seed_rank, Some(3));

        let a3 = &roster.athletes[2];
        assert!(a3.bye);
        assert_eq!(a3.seed_mark, Mark::NoMark(NoMark::Blank));

        assert_eq!(roster.athletes[3].seed_mark, Mark::NoMark(NoMark::Invalid));
        assert_eq!(
            roster.warnings,
            vec![SeedingWarning::UnparseableMark {
                athlete_id: "a4".into(),
                raw: "11..2".into()
            }]
        );
    }

    #[test]
    fn test_roster_with_only_required_columns() {
        let roster = read_roster(Cursor::new("id,name,seed_mark\nx,X Ray,1:58.30\n")).unwrap();
        assert_eq!(roster.athletes[0].seed_mark, Mark::from_millis(118_300));
        assert!(roster.warnings.is_empty());
    }

    #[test]
    fn test_write_roster_reads_back() {
        let roster = read_roster(Cursor::new(ROSTER)).unwrap();
        let mut out = Vec::new();
        write_roster(&mut out, &roster.athletes[..3]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("id,name,club,seed_mark,seed_rank,bye\n"));
        assert!(text.contains("a1,Ada Quick,Harriers,10.91,,\n"));

        let again = read_roster(Cursor::new(text)).unwrap();
        assert_eq!(again.athletes, roster.athletes[..3].to_vec());
    }

    #[test]
    fn test_load_round_result() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("round1.csv");
        std::fs::write(
            &path,
            "athlete_id,heat,lane,place,mark\na1,1,4,1,10.85\na2,1,5,,DNF\na3,2,,,fast\n",
        )
        .unwrap();

        let (result, warnings) = load_round_result(&path, 1).unwrap();
        assert_eq!(result.round, 1);
        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.entries[0].place, Some(1));
        assert_eq!(result.entries[0].lane, Some(4));
        assert_eq!(result.entries[1].mark, Mark::NoMark(NoMark::Dnf));
        assert_eq!(result.entries[2].lane, None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_roster(&temp_dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
