use crate::demo::{run_demo, run_import, run_score, DemoArgs, ImportArgs, ScoreArgs};
use crate::server;
use building_compliance::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Building Compliance",
    about = "Score NYC buildings against their DOB, ECB and HPD records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a property snapshot stored as JSON
    Score(ScoreArgs),
    /// Build a property from Open Data CSV exports and score it
    Import(ImportArgs),
    /// Score a sample building and walk through saving a report
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Import(args) => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_defaults_to_serve() {
        let cli = Cli::try_parse_from(["building-compliance-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn import_accepts_registry_paths_and_date() {
        let cli = Cli::try_parse_from([
            "building-compliance-api",
            "import",
            "--bin",
            "1012345",
            "--borough",
            "MN",
            "--hpd",
            "hpd.csv",
            "--as-of",
            "2025-06-01",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Import(args)) => {
                assert_eq!(args.bin, "1012345");
                assert!(args.dob.is_none());
                assert_eq!(args.hpd.as_deref(), Some(std::path::Path::new("hpd.csv")));
                assert_eq!(args.as_of, chrono::NaiveDate::from_ymd_opt(2025, 6, 1));
            }
            other => panic!("expected import command, got {other:?}"),
        }
    }

    #[test]
    fn score_rejects_malformed_dates() {
        let parsed = Cli::try_parse_from([
            "building-compliance-api",
            "score",
            "--input",
            "building.json",
            "--as-of",
            "06/01/2025",
        ]);
        assert!(parsed.is_err());
    }
}
