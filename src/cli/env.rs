use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slotwatch", author, version, about, long_about = None)]
pub struct CliArgs {
    /// CSV file with one participant per row
    #[arg(long, visible_alias = "students", value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// .env file to load before reading participant variables
    #[arg(long, value_name = "FILE")]
    pub env: Option<PathBuf>,

    /// Book a single participant from the environment and ignore the CSV
    #[arg(long)]
    pub env_only: bool,

    /// Do not read participant variables; use the built-in record
    #[arg(long)]
    pub ignore_env: bool,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Force a visible browser window (wins over --headless)
    #[arg(long)]
    pub headed: bool,

    /// Log file path (appended to)
    #[arg(long, value_name = "FILE", default_value = "slotwatch.log")]
    pub log: PathBuf,

    /// YAML site profile overriding locators, texts and timings
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,
}

impl CliArgs {
    /// Headed unless `--headless` was given; `--headed` always wins.
    pub fn headless(&self) -> bool {
        self.headless && !self.headed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_headed_browser_and_local_log() {
        let args = CliArgs::parse_from(["slotwatch"]);
        assert!(!args.headless());
        assert_eq!(args.log, PathBuf::from("slotwatch.log"));
        assert_eq!(args.log_level, "info");
        assert!(args.csv.is_none());
    }

    #[test]
    fn headed_overrides_headless() {
        let args = CliArgs::parse_from(["slotwatch", "--headless"]);
        assert!(args.headless());

        let args = CliArgs::parse_from(["slotwatch", "--headless", "--headed"]);
        assert!(!args.headless());
    }

    #[test]
    fn students_is_an_alias_for_csv() {
        let args = CliArgs::parse_from(["slotwatch", "--students", "people.csv"]);
        assert_eq!(args.csv, Some(PathBuf::from("people.csv")));
    }
}
