use std::{
    collections::HashMap,
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many records are kept per category.
pub const TOP_SCORES_KEPT: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FIELD_SEPARATOR: char = ';';

#[derive(Debug, Error)]
pub enum ScoreboardError {
    #[error("could not read scoreboard {}: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write scoreboard {}: {}", .path.display(), .source)]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreRecord {
    pub timestamp: String,
    pub category: Option<String>,
    pub score: u32,
}

impl ScoreRecord {
    /// Parses `timestamp;score` or `timestamp;category;score`. Anything else is rejected.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let (timestamp, category, score) = match fields.as_slice() {
            [timestamp, score] => (*timestamp, None, *score),
            [timestamp, category, score] => (*timestamp, Some(category.to_string()), *score),
            _ => return None,
        };

        let score = score.trim().parse().ok()?;
        Some(ScoreRecord { timestamp: timestamp.to_string(), category, score })
    }

    pub fn to_line(&self) -> String {
        match &self.category {
            Some(category) => format!("{}{sep}{}{sep}{}", self.timestamp, category, self.score, sep = FIELD_SEPARATOR),
            None => format!("{}{sep}{}", self.timestamp, self.score, sep = FIELD_SEPARATOR),
        }
    }
}

/// Flat-file score history. Every update rewrites the whole file, so only one
/// process may write to a given path at a time.
pub struct Scoreboard {
    path: PathBuf,
}

impl Scoreboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Scoreboard { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every well-formed record. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<ScoreRecord>, ScoreboardError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => return Err(ScoreboardError::Read { path: self.path.clone(), source }),
        };

        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let record = ScoreRecord::parse(line);
                if record.is_none() {
                    debug!(path = %self.path.display(), line, "skipping malformed scoreboard line");
                }
                record
            })
            .collect();

        Ok(records)
    }

    /// Adds a score stamped with the current local time, then keeps the best
    /// `TOP_SCORES_KEPT` of each category. A zero score leaves the file alone.
    pub fn record_score(&self, score: u32, category: Option<&str>) -> Result<(), ScoreboardError> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.insert(ScoreRecord { timestamp, category: category.map(str::to_string), score })
    }

    pub fn insert(&self, record: ScoreRecord) -> Result<(), ScoreboardError> {
        if record.score == 0 {
            return Ok(());
        }

        let mut records = self.load()?;
        records.push(record);
        let kept = rank(records);

        let content: String = kept.iter().map(|r| r.to_line() + "\n").collect();
        self.write_atomically(&content)?;

        info!(path = %self.path.display(), records = kept.len(), "scoreboard updated");
        Ok(())
    }

    /// Best score stored for `category`, or across all records when `None`.
    /// Anything unreadable counts as no history.
    pub fn highest_score(&self, category: Option<&str>) -> u32 {
        match self.load() {
            Ok(records) => records
                .iter()
                .filter(|r| matches_category(r, category))
                .map(|r| r.score)
                .max()
                .unwrap_or(0),
            Err(err) => {
                warn!(%err, "falling back to a high score of 0");
                0
            }
        }
    }

    /// The best `TOP_SCORES_KEPT` records for `category`, or across every
    /// category when `None`, best first.
    pub fn top_scores(&self, category: Option<&str>) -> Vec<ScoreRecord> {
        let records = self.load().unwrap_or_default();
        let mut top: Vec<ScoreRecord> = rank(records)
            .into_iter()
            .filter(|r| matches_category(r, category))
            .collect();

        // `rank` leaves the categories grouped
        top.sort_by(|a, b| b.score.cmp(&a.score));
        top.truncate(TOP_SCORES_KEPT);
        top
    }

    fn write_atomically(&self, content: &str) -> Result<(), ScoreboardError> {
        let write_err = |source: io::Error| ScoreboardError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            write_err(source)
        })
    }
}

fn matches_category(record: &ScoreRecord, category: Option<&str>) -> bool {
    category.map_or(true, |c| record.category.as_deref() == Some(c))
}

/// Groups by category and orders each group by descending score, keeping the
/// first `TOP_SCORES_KEPT` of each. Equal scores keep their file order.
fn rank(mut records: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
    records.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| b.score.cmp(&a.score))
    });

    let mut seen: HashMap<Option<String>, usize> = HashMap::new();
    records
        .into_iter()
        .filter(|r| {
            let count = seen.entry(r.category.clone()).or_insert(0);
            *count += 1;
            *count <= TOP_SCORES_KEPT
        })
        .collect()
}
