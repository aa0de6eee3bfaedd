use clap::{Parser, Subcommand};
use schemagraph::config::EditorConfig;
use schemagraph::ddl::{parse_sql, Dialect};
use schemagraph::roster::SourceModel;
use schemagraph::session::Session;
use schemagraph::view::ViewLevel;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "schemagraph", version, about = "Schema graph editor: DDL generation, snapshots and search")]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Editor config (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "SCHEMAGRAPH_ACTOR", help = "Actor id recorded in the audit log")]
    actor: Option<String>,

    #[arg(long, global = true, help = "View level: table or attribute")]
    view: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate DDL from a roster (.json) or SQL DDL (.sql)
    Ddl {
        input: PathBuf,
        #[arg(short, long, help = "Output dialect: generic, postgresql, mysql")]
        dialect: Option<String>,
        #[arg(long, help = "Do not align column definitions")]
        no_align: bool,
        #[arg(short, long, value_name = "FILE", help = "Output file (default: stdout)")]
        output: Option<PathBuf>,
    },
    /// Print the session snapshot JSON for a model
    Snapshot {
        input: PathBuf,
        #[arg(short, long, value_name = "FILE", help = "Output file (default: stdout)")]
        output: Option<PathBuf>,
    },
    /// List node ids matching a query
    Search { input: PathBuf, query: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path).map_err(|e| e.to_string())?,
        None => EditorConfig::default(),
    };
    if let Some(actor) = cli.actor {
        config.actor_id = actor;
    }
    if let Some(view) = cli.view.as_deref() {
        config.initial_view = ViewLevel::from_str(view).ok_or_else(|| format!("Invalid view: {}", view))?;
    }

    match cli.command {
        Command::Ddl {
            input,
            dialect,
            no_align,
            output,
        } => {
            let (roster, detected) = load_roster(&input)?;
            config.dialect = match dialect.as_deref() {
                Some(d) => Dialect::from_str(d).ok_or_else(|| format!("Invalid dialect: {}", d))?,
                None => detected.unwrap_or(config.dialect),
            };
            if no_align {
                config.align_columns = false;
            }
            let session = Session::new(roster, config);
            write_output(output.as_deref(), &session.generate_ddl())
        }
        Command::Snapshot { input, output } => {
            let (roster, _) = load_roster(&input)?;
            let session = Session::new(roster, config);
            let json = session.snapshot().to_json().map_err(|e| e.to_string())?;
            write_output(output.as_deref(), &json)
        }
        Command::Search { input, query } => {
            let (roster, _) = load_roster(&input)?;
            let session = Session::new(roster, config);
            for id in session.search(&query) {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

/// Roster from JSON, or from SQL for anything that does not look like JSON.
/// SQL input also yields the dialect it was written in.
fn load_roster(path: &Path) -> Result<(SourceModel, Option<Dialect>), String> {
    let input = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json") || input.trim_start().starts_with('{');
    if is_json {
        let roster = SourceModel::from_json(&input).map_err(|e| format!("Invalid roster: {}", e))?;
        return Ok((roster, None));
    }
    let roster = parse_sql(&input, Dialect::Auto).map_err(|e| format!("Parse error: {}", e))?;
    Ok((roster, Some(Dialect::detect(&input))))
}

fn write_output(path: Option<&Path>, content: &str) -> Result<(), String> {
    match path {
        Some(path) => fs::write(path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e)),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
