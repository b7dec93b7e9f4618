//! Participant providers
//!
//! Exactly one source feeds a run: a CSV file, the single-record environment
//! source, or the built-in record. Sources are never merged.

use std::env;
use std::path::{Path, PathBuf};

use action_primitives::EventLog;
use slotwatch_core_types::Participant;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_EMAIL: &str = "dummy@example.com";
pub const DEFAULT_PASSWORD: &str = "DummyPass123!";
pub const DEFAULT_PHONE: &str = "+254700000000";
pub const DEFAULT_FIRST_NAME: &str = "Test";
pub const DEFAULT_SURNAME: &str = "User";
pub const DEFAULT_COUNTY: &str = "Nairobi";
pub const DEFAULT_DOB: &str = "2000-01-01";
pub const DEFAULT_PLACE_OF_BIRTH: &str = "Nairobi";
pub const DEFAULT_ZIP: &str = "00100";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("csv read error {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub trait ParticipantSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self) -> Result<Vec<Participant>, SourceError>;
}

/// The built-in record used when nothing else is configured.
pub fn default_participant() -> Participant {
    Participant {
        email: DEFAULT_EMAIL.into(),
        password: DEFAULT_PASSWORD.into(),
        phone: DEFAULT_PHONE.into(),
        first_name: DEFAULT_FIRST_NAME.into(),
        surname: DEFAULT_SURNAME.into(),
        county: DEFAULT_COUNTY.into(),
        dob: DEFAULT_DOB.into(),
        place_of_birth: DEFAULT_PLACE_OF_BIRTH.into(),
        zip_code: DEFAULT_ZIP.into(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSource;

impl ParticipantSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn load(&self) -> Result<Vec<Participant>, SourceError> {
        Ok(vec![default_participant()])
    }
}

/// One row per participant; columns are matched by header name and missing
/// columns become empty strings. A row that cannot be decoded is logged and
/// skipped; the rows around it still load.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParticipantSource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load(&self) -> Result<Vec<Participant>, SourceError> {
        let wrap = |source| SourceError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(wrap)?;
        let log = EventLog::new("");
        let mut participants = Vec::new();
        for (idx, row) in reader.deserialize::<Participant>().enumerate() {
            match row {
                Ok(participant) => participants.push(participant),
                Err(err) => log.error(format!(
                    "csv row {} skipped in {}: {err}",
                    idx + 1,
                    self.path.display()
                )),
            }
        }
        Ok(participants)
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Single record from `SLOTWATCH_*` variables; an unset variable falls back
/// to the built-in value.
pub struct EnvSource {
    lookup: Lookup,
}

impl EnvSource {
    pub fn process() -> Self {
        Self::with_lookup(|key| env::var(key).ok())
    }

    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }
}

impl ParticipantSource for EnvSource {
    fn name(&self) -> &'static str {
        "env"
    }

    fn load(&self) -> Result<Vec<Participant>, SourceError> {
        Ok(vec![Participant {
            email: self.var("SLOTWATCH_EMAIL", DEFAULT_EMAIL),
            password: self.var("SLOTWATCH_PASSWORD", DEFAULT_PASSWORD),
            phone: self.var("SLOTWATCH_PHONE", DEFAULT_PHONE),
            first_name: self.var("SLOTWATCH_FIRST_NAME", DEFAULT_FIRST_NAME),
            surname: self.var("SLOTWATCH_SURNAME", DEFAULT_SURNAME),
            county: self.var("SLOTWATCH_COUNTY", DEFAULT_COUNTY),
            dob: self.var("SLOTWATCH_DOB", DEFAULT_DOB),
            place_of_birth: self.var("SLOTWATCH_PLACE_OF_BIRTH", DEFAULT_PLACE_OF_BIRTH),
            zip_code: self.var("SLOTWATCH_ZIP", DEFAULT_ZIP),
        }])
    }
}

/// `--env-only` picks the environment (or the built-in record with
/// `--ignore-env`); otherwise a given CSV wins over the built-in record.
pub fn select_source(
    csv: Option<&Path>,
    env_only: bool,
    ignore_env: bool,
) -> Box<dyn ParticipantSource> {
    match (env_only, ignore_env, csv) {
        (true, true, _) => Box::new(StaticSource),
        (true, false, _) => Box::new(EnvSource::process()),
        (false, _, Some(path)) => Box::new(CsvSource::new(path)),
        (false, _, None) => Box::new(StaticSource),
    }
}

/// Load from `source`, dropping records without an email. A read error or an
/// empty result falls back to the built-in record.
pub fn load_participants(source: &dyn ParticipantSource) -> Vec<Participant> {
    let log = EventLog::new("");
    let loaded = match source.load() {
        Ok(records) => records,
        Err(err) => {
            log.error(err);
            Vec::new()
        }
    };

    let mut participants = Vec::with_capacity(loaded.len());
    for (idx, participant) in loaded.into_iter().enumerate() {
        match participant.validate() {
            Ok(()) => participants.push(participant),
            Err(err) => log.error(format!("{} record {} skipped: {}", source.name(), idx + 1, err)),
        }
    }

    if participants.is_empty() {
        info!(source = source.name(), "no participants loaded; using built-in record");
        participants.push(default_participant());
    }
    participants
}
