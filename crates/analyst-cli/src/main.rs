//! Analyst CLI - run a data analysis session against the analyst agent
//!
//! The CLI plays both sides of the client: `submit` stands in for the intake
//! form and writes the request hand-off, `run` drives the session controller
//! and renders the streamed progress.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use analyst_core::config::{Config, ConfigManager};
use analyst_core::{
    AnalysisRequest, Error, HandoffStore, Notice, ReportArtifact, SessionChange, SessionController,
    SessionUpdate, WebSocketConnector,
};

#[derive(Parser)]
#[command(name = "analyst")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Streaming client for the data analyst agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Agent base URL, overrides the config file and ANALYST_API_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis for the saved request and stream its progress
    Run {
        /// Request file to send instead of the saved hand-off
        #[arg(long)]
        form: Option<PathBuf>,

        /// Directory for the downloaded report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Save an analysis request for the next run
    Submit(SubmitArgs),

    /// Show the analysis steps
    Steps,

    /// Show configuration
    Config,
}

#[derive(Args)]
struct SubmitArgs {
    /// The question the analysis should answer
    #[arg(long)]
    question: String,

    /// City the analysis is about
    #[arg(long)]
    city: String,

    /// Why the property is wanted (e.g. Live, Invest)
    #[arg(long, default_value = "Invest")]
    purpose: String,

    /// Number of bedrooms
    #[arg(long, default_value_t = 2)]
    rooms: u32,

    /// Property type (e.g. House, Unit)
    #[arg(long = "type", default_value = "Unit")]
    property_type: String,

    /// Budget range
    #[arg(long, default_value = "")]
    budget: String,

    /// Number of results to return
    #[arg(long, default_value_t = 5)]
    top_n: u32,

    /// Investment timeline in years
    #[arg(long, default_value_t = 5)]
    investment_timeline: u32,

    /// How the analysis should be approached
    #[arg(long, default_value = "")]
    method: String,

    /// Anything else the agent should know
    #[arg(long, default_value = "")]
    additional_info: String,

    /// Skip the objective definition step
    #[arg(long)]
    skip_define_objective_step: bool,

    /// Let the agent ask questions during the analysis
    #[arg(long)]
    human_in_the_loop: bool,

    /// Name of the uploaded data file
    #[arg(long)]
    data_file: Option<String>,

    /// Where to write the request (defaults to the configured hand-off path)
    #[arg(long)]
    form: Option<PathBuf>,
}

impl From<SubmitArgs> for AnalysisRequest {
    fn from(args: SubmitArgs) -> Self {
        Self {
            question: args.question,
            city: args.city,
            purpose: args.purpose,
            rooms: args.rooms,
            property_type: args.property_type,
            budget: args.budget,
            top_n: args.top_n,
            investment_timeline: args.investment_timeline,
            method: args.method,
            additional_info: args.additional_info,
            skip_define_objective_step: args.skip_define_objective_step,
            use_human_in_the_loop: args.human_in_the_loop,
            uploaded_file: args.data_file,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;
    let config_path = config_manager.config_path().to_path_buf();
    let mut config = config_manager.into_config();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, &config.general.log_level))
        .init();

    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
        config.server.base_url_env = None;
    }

    match cli.command {
        Some(Commands::Run { form, output_dir }) => run_session(&config, form, output_dir).await?,
        Some(Commands::Submit(args)) => submit_request(&config, args)?,
        Some(Commands::Steps) => render::steps(),
        Some(Commands::Config) => render::config(&config, &config_path),
        None => run_session(&config, None, None).await?,
    }

    Ok(())
}

/// `--verbose` wins over the configured level
fn log_filter(verbose: bool, log_level: &str) -> String {
    if verbose {
        "info,analyst_core=debug".to_string()
    } else {
        log_level.to_string()
    }
}

fn submit_request(config: &Config, args: SubmitArgs) -> anyhow::Result<()> {
    let path = args
        .form
        .clone()
        .unwrap_or_else(|| config.handoff.resolve_path());
    let store = HandoffStore::new(path);
    store.save(&AnalysisRequest::from(args))?;

    println!(
        "{} {}",
        style("Request saved to").green(),
        style(store.path().display()).dim()
    );
    render::hint("Start the analysis with `analyst run`.");
    Ok(())
}

/// What woke the run loop up
enum Wake {
    Update(Option<SessionUpdate>),
    Line(std::io::Result<Option<String>>),
}

async fn run_session(
    config: &Config,
    form: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = HandoffStore::new(form.unwrap_or_else(|| config.handoff.resolve_path()));
    let form_data = store.load_payload();
    if form_data.is_none() {
        render::warning(&format!(
            "No analysis request at {}, starting without one",
            store.path().display()
        ));
    }
    let output_dir = output_dir.unwrap_or_else(|| config.report.resolve_output_dir());

    let mut controller = SessionController::from_config(config)?;
    println!(
        "{} {}",
        style("Connecting to").dim(),
        style(controller.endpoint()).cyan()
    );
    if let Err(e) = controller
        .start(Arc::new(WebSocketConnector::new()), form_data)
        .await
    {
        render::notice(&Notice::ConnectionFailure {
            reason: e.to_string(),
        });
        anyhow::bail!("The analysis session did not start");
    }
    render::step_banner(controller.session().current_step());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut retained: Option<String> = None;
    let mut report_saved = false;

    loop {
        let wake = tokio::select! {
            update = controller.next_update() => Wake::Update(update),
            line = lines.next_line(), if stdin_open => Wake::Line(line),
        };

        match wake {
            Wake::Update(None) => break,
            Wake::Update(Some(SessionUpdate::Changed(changes))) => {
                render::changes(controller.session(), &changes);
                if should_save_report(&changes, report_saved) {
                    report_saved |= save_report(&controller, &output_dir);
                }
            }
            Wake::Update(Some(SessionUpdate::Notice(notice))) => render::notice(&notice),
            Wake::Update(Some(SessionUpdate::Closed)) => {
                render::hint("Connection closed.");
                break;
            }
            Wake::Line(Ok(Some(line))) => handle_line(&mut controller, line, &mut retained),
            Wake::Line(Ok(None)) => stdin_open = false,
            Wake::Line(Err(e)) => {
                warn!("Failed to read stdin: {}", e);
                stdin_open = false;
            }
        }
    }

    controller.close();
    Ok(())
}

/// Forward a typed line to the agent while it is waiting for one
fn handle_line(controller: &mut SessionController, line: String, retained: &mut Option<String>) {
    let session = controller.session();
    if session.completed() {
        render::hint("The analysis has finished.");
        return;
    }
    if !session.waiting_for_input() {
        render::hint("The agent is working; it will ask when it needs input.");
        return;
    }

    // An empty line resends text that could not be delivered earlier
    let text = if line.trim().is_empty() {
        retained.take().unwrap_or(line)
    } else {
        line
    };

    match controller.submit_input(&text) {
        Ok(()) => {
            *retained = None;
            if matches!(text.trim().to_lowercase().as_str(), "q" | "quit") {
                render::hint("Cancelling the analysis...");
            }
        }
        Err(Error::EmptyInput) => {
            render::hint("Type a response, or q to cancel.");
            render::prompt();
        }
        Err(Error::DispatchRejected { text }) => {
            render::notice(&Notice::DispatchRejected { text: text.clone() });
            render::hint("Press Enter to try sending it again.");
            *retained = Some(text);
        }
        Err(e) => {
            eprintln!("{}", style(format!("Error: {}", e)).red());
        }
    }
}

/// A final report always replaces the file; completion only writes one if
/// nothing was saved yet
fn should_save_report(changes: &[SessionChange], report_saved: bool) -> bool {
    changes.contains(&SessionChange::ReportSet)
        || (changes.contains(&SessionChange::Completed) && !report_saved)
}

fn save_report(controller: &SessionController, output_dir: &Path) -> bool {
    let Some(artifact) = ReportArtifact::today(controller.session()) else {
        return false;
    };
    match artifact.save_to(output_dir) {
        Ok(path) => {
            println!(
                "{} {}",
                style("Report saved to").green(),
                style(path.display()).cyan()
            );
            true
        }
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Failed to save report: {}", e)).red()
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter_uses_configured_level() {
        assert_eq!(log_filter(false, "warn"), "warn");
        assert_eq!(log_filter(false, "debug"), "debug");
        assert_eq!(log_filter(true, "warn"), "info,analyst_core=debug");
    }

    #[test]
    fn test_report_saved_on_report_or_first_completion() {
        assert!(should_save_report(&[SessionChange::ReportSet], true));
        assert!(should_save_report(
            &[SessionChange::MessageAppended(3), SessionChange::Completed],
            false
        ));
        assert!(!should_save_report(&[SessionChange::Completed], true));
        assert!(!should_save_report(&[SessionChange::MessageAppended(0)], false));
    }

    #[test]
    fn test_run_is_default_command() {
        let cli = Cli::parse_from(["analyst", "--base-url", "http://10.0.0.2:8000"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.2:8000"));
    }

    #[test]
    fn test_submit_builds_request() {
        let cli = Cli::parse_from([
            "analyst",
            "submit",
            "--question",
            "Where should I buy?",
            "--city",
            "Melbourne",
            "--type",
            "House",
            "--human-in-the-loop",
            "--data-file",
            "melb_2bed.csv",
        ]);
        let Some(Commands::Submit(args)) = cli.command else {
            panic!("Expected submit");
        };
        let request = AnalysisRequest::from(args);
        assert_eq!(request.city, "Melbourne");
        assert_eq!(request.property_type, "House");
        assert_eq!(request.rooms, 2);
        assert!(request.use_human_in_the_loop);
        assert!(!request.skip_define_objective_step);
        assert_eq!(request.uploaded_file.as_deref(), Some("melb_2bed.csv"));
    }
}
