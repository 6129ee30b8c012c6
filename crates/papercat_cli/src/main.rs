//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `papercat_core` linkage and storage wiring outside any host app.
//! - Print catalog counts in a stable `key=value` form.

use clap::Parser;
use papercat_core::db::open_db_with_options;
use papercat_core::{init_logging, CatalogConfig, PaperCatalog, SqlitePaperRepository};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "papercat",
    about = "Print paper catalog counts for a SQLite database",
    version
)]
struct Cli {
    /// Catalog database file; counts are skipped when no path is given.
    #[arg(env = "PAPERCAT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Also count papers filed under this category.
    category: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match load_and_run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("papercat: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_and_run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = CatalogConfig::from_env()?;
    run(cli, &config, &mut std::io::stdout().lock())
}

fn run(cli: &Cli, config: &CatalogConfig, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    writeln!(out, "papercat_core version={}", papercat_core::core_version())?;

    let Some(db_path) = cli.db_path.as_ref().or(config.db_path.as_ref()) else {
        return Ok(());
    };

    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(&config.log_level, log_dir)?;
    }

    let conn = open_db_with_options(db_path, &config.db_options())?;
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn)?);

    writeln!(
        out,
        "total={} pending={}",
        catalog.count_papers(None)?,
        catalog.papers_needing_completion()?.len()
    )?;
    if let Some(category) = cli.category.as_deref() {
        writeln!(
            out,
            "category={} count={}",
            category,
            catalog.count_papers(Some(category))?
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Cli};
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};
    use papercat_core::CatalogConfig;
    use std::path::PathBuf;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_arguments_fill_path_and_category() {
        let cli = Cli::try_parse_from(["papercat", "/tmp/catalog.db", "biology"]).unwrap();
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/catalog.db")));
        assert_eq!(cli.category.as_deref(), Some("biology"));
    }

    #[test]
    fn help_flag_is_not_taken_as_a_database_path() {
        let err = Cli::try_parse_from(["papercat", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["papercat", "--verbose"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn run_prints_counts_for_a_fresh_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let cli = Cli {
            db_path: Some(db_path.clone()),
            category: Some("physics".to_string()),
        };

        let mut out = Vec::new();
        run(&cli, &CatalogConfig::default(), &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert!(lines[0].starts_with("papercat_core version="));
        assert_eq!(lines[1], "total=0 pending=0");
        assert_eq!(lines[2], "category=physics count=0");
        assert!(db_path.exists());
    }

    #[test]
    fn run_without_a_database_prints_version_only() {
        let cli = Cli {
            db_path: None,
            category: None,
        };

        let mut out = Vec::new();
        run(&cli, &CatalogConfig::default(), &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.lines().count(), 1);
    }
}
