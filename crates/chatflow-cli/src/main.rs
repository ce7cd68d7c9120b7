mod presenter;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chatflow_engine::{
    Engine, EngineConfig, EngineState, LogSubmitter, Outcome, Submitter, WebhookSubmitter,
};
use chatflow_spec::{Catalog, lint};
use clap::{Args, Parser, Subcommand};
use presenter::{ChatPresenter, RenderMode, Verbosity};
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Branching question-and-answer dialogues in the terminal",
    long_about = "Runs chatflow catalogs interactively, replays scripted answers and checks catalog files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where the catalog comes from and where checkpoint snapshots go.
#[derive(Args)]
struct SourceArgs {
    /// Catalog JSON file. The bundled tour intake catalog is used when omitted.
    #[arg(long, value_name = "CATALOG")]
    catalog: Option<PathBuf>,
    /// Engine config JSON file (catalog_path, webhook_url, timeout_secs).
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Endpoint receiving answer snapshots at every checkpoint.
    #[arg(long, value_name = "URL", env = "CHATFLOW_WEBHOOK_URL")]
    webhook: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Show field keys, progress counters and error codes.
    #[arg(long, alias = "debug")]
    verbose: bool,
    /// Also print the answer record as JSON on completion.
    #[arg(long)]
    answers_json: bool,
    /// Prompt rendering.
    #[arg(long, value_enum, default_value_t = RenderMode::Text)]
    format: RenderMode,
}

#[derive(Subcommand)]
enum Command {
    /// Run a dialogue interactively on stdin.
    Chat {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Feed a JSON array of answers through a dialogue.
    Replay {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// JSON file holding the answers in the order they are asked.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Report every structural problem in a catalog file.
    Check {
        #[arg(long, value_name = "CATALOG")]
        catalog: PathBuf,
    },
    /// Print the JSON schema of the catalog format.
    Schema,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Chat { source, output } => run_chat(source, output),
        Command::Replay {
            source,
            output,
            answers,
        } => run_replay(source, output, answers),
        Command::Check { catalog } => run_check(catalog),
        Command::Schema => run_schema(),
    }
}

fn resolve_config(source: SourceArgs) -> CliResult<EngineConfig> {
    let mut config = match &source.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if source.catalog.is_some() {
        config.catalog_path = source.catalog;
    }
    if source.webhook.is_some() {
        config.webhook_url = source.webhook;
    }
    Ok(config)
}

fn build_engine(config: &EngineConfig, runtime: Handle) -> CliResult<Engine> {
    let catalog = config.load_catalog()?;
    let submitter: Arc<dyn Submitter> = match &config.webhook_url {
        Some(url) => {
            info!(url = %url, "submitting answers to webhook");
            Arc::new(WebhookSubmitter::new(url.clone(), config.timeout(), runtime)?)
        }
        None => Arc::new(LogSubmitter),
    };
    Ok(Engine::new(Arc::new(catalog), submitter)?)
}

fn run_chat(source: SourceArgs, output: OutputArgs) -> CliResult<()> {
    let config = resolve_config(source)?;
    let runtime = Runtime::new()?;
    let engine = build_engine(&config, runtime.handle().clone())?;
    let mut presenter = ChatPresenter::new(
        Verbosity::from_verbose(output.verbose),
        output.format,
        output.answers_json,
    );

    presenter.show_header(engine.catalog());
    let (mut state, mut outcome) = engine.initialize();

    loop {
        presenter.show_outcome(&outcome, engine.progress(&state));
        match &outcome {
            Outcome::Terminal { .. } => presenter.show_completion(state.answers()),
            Outcome::Exhausted { .. } => {
                presenter.show_completion(state.answers());
                break;
            }
            _ => {}
        }

        let Some(line) = read_answer()? else {
            debug!("stdin closed");
            break;
        };
        match line.trim() {
            "exit" => {
                println!("Bye.");
                break;
            }
            "restart" => {
                outcome = engine.reset(&mut state);
                continue;
            }
            _ => {}
        }
        outcome = engine.submit_answer(&mut state, &line);
    }

    runtime.shutdown_timeout(config.timeout());
    Ok(())
}

fn run_replay(source: SourceArgs, output: OutputArgs, answers_path: PathBuf) -> CliResult<()> {
    let answers: Vec<String> = serde_json::from_str(&fs::read_to_string(&answers_path)?)?;
    let config = resolve_config(source)?;
    let runtime = Runtime::new()?;
    let engine = build_engine(&config, runtime.handle().clone())?;
    let mut presenter = ChatPresenter::new(
        Verbosity::from_verbose(output.verbose),
        output.format,
        output.answers_json,
    );

    presenter.show_header(engine.catalog());
    let (mut state, mut outcome) = engine.initialize();
    presenter.show_outcome(&outcome, engine.progress(&state));

    let result = replay_answers(&engine, &mut state, &mut outcome, &mut presenter, &answers);
    runtime.shutdown_timeout(config.timeout());
    result
}

fn replay_answers(
    engine: &Engine,
    state: &mut EngineState,
    outcome: &mut Outcome,
    presenter: &mut ChatPresenter,
    answers: &[String],
) -> CliResult<()> {
    for (index, answer) in answers.iter().enumerate() {
        if matches!(outcome, Outcome::Terminal { .. } | Outcome::Exhausted { .. }) {
            break;
        }
        println!("> {}", answer);
        *outcome = engine.submit_answer(state, answer);
        if let Outcome::Rejected { descriptor, error } = &*outcome {
            return Err(format!(
                "answer {} ({:?}) for {} was rejected: {}",
                index + 1,
                answer,
                descriptor.field,
                error
            )
            .into());
        }
        presenter.show_outcome(outcome, engine.progress(state));
    }

    match outcome {
        Outcome::Terminal { .. } | Outcome::Exhausted { .. } => {
            presenter.show_completion(state.answers());
        }
        _ => {
            let progress = engine.progress(state);
            println!(
                "Replay ended before the dialogue finished ({}/{} answered).",
                progress.answered, progress.total
            );
        }
    }
    Ok(())
}

fn run_check(path: PathBuf) -> CliResult<()> {
    let contents = fs::read_to_string(&path)?;
    let mut catalog: Catalog = serde_json::from_str(&contents)?;
    catalog.steps.sort_by_key(|step| step.id());
    let issues = lint(&catalog);
    if issues.is_empty() {
        println!(
            "Catalog '{}' is valid ({} steps, {} checkpoints)",
            catalog.id,
            catalog.steps.len(),
            catalog.checkpoints.len()
        );
        return Ok(());
    }

    println!("Catalog '{}' has {} issue(s):", catalog.id, issues.len());
    for issue in &issues {
        println!("  {} - {} [{}]", issue.path, issue.message, issue.code);
    }
    Err("catalog check failed".into())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(Catalog);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn read_answer() -> CliResult<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use serde_json::{Value, json};

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../chatflow-spec/tests/fixtures/tour_intake.json"
    );

    fn chatflow() -> Command {
        let mut cmd = Command::cargo_bin("chatflow").expect("binary");
        cmd.env_remove("CHATFLOW_WEBHOOK_URL").env_remove("RUST_LOG");
        cmd
    }

    fn full_walk() -> Vec<&'static str> {
        vec![
            "Let's get going!",
            "Dana",
            "Levi",
            "0521234567",
            "dana@example.org",
            "Haifa",
            "Coordinator",
            "Hikers club",
            "Friends",
            "Keen hikers",
            "20-30",
            "No",
            "Day trip",
            "2026-11-02",
            "No (participants arrive on their own)",
            "08:00",
            "",
            "Hiking trip",
            "History",
            "Moderate",
            "Up to 5 km",
            "Lower Galilee",
            "Premium guiding",
            "",
            "No",
            "Kosher",
            "Room only",
            "No",
            "No",
            "No",
            "No",
            "No",
            "350",
            "",
        ]
    }

    #[test]
    fn check_accepts_bundled_catalog() {
        let output = chatflow()
            .arg("check")
            .arg("--catalog")
            .arg(FIXTURE)
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
        assert!(stdout.contains("Catalog 'tour-intake' is valid (9 steps, 2 checkpoints)"));
    }

    #[test]
    fn check_reports_issues_and_fails() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let catalog = workspace.child("broken.json");
        catalog.write_str(
            &json!({
                "id": "broken",
                "title": "Broken",
                "version": "1.0",
                "steps": [
                    { "kind": "question", "id": 1, "content": "Pick", "field": "pick",
                      "input": { "type": "single_choice" } },
                    { "kind": "question", "id": 2, "content": "Why", "field": "why",
                      "input": { "type": "text" },
                      "condition": { "field": "nope", "value": "x" } }
                ]
            })
            .to_string(),
        )?;

        let output = chatflow()
            .arg("check")
            .arg("--catalog")
            .arg(catalog.path())
            .assert()
            .failure();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
        assert!(stdout.contains("has 2 issue(s)"));
        assert!(stdout.contains("[missing_options]"));
        assert!(stdout.contains("/steps/2/condition"));
        Ok(())
    }

    #[test]
    fn schema_describes_catalog() {
        let output = chatflow().arg("schema").assert().success();
        let schema: Value = serde_json::from_slice(&output.get_output().stdout).expect("json");
        assert!(schema["properties"]["steps"].is_object());
        assert!(schema["properties"]["checkpoints"].is_object());
    }

    #[test]
    fn replay_reaches_completion() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let answers = workspace.child("answers.json");
        answers.write_str(&serde_json::to_string(&full_walk())?)?;

        let output = chatflow()
            .arg("replay")
            .arg("--answers")
            .arg(answers.path())
            .arg("--answers-json")
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
        assert!(stdout.contains("Contact details"));
        assert!(stdout.contains("[ Start over ]"));
        assert!(stdout.contains("Answers (CBOR hex): "));
        assert!(stdout.contains("\"2_4\": \"dana@example.org\""));
        assert!(stdout.contains("\"4_18\": \"08:00\""));
        Ok(())
    }

    #[test]
    fn replay_stops_on_rejected_answer() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let answers = workspace.child("answers.json");
        answers.write_str(r#"["Let's get going!", "Dana", "Levi", "12345"]"#)?;

        let output = chatflow()
            .arg("replay")
            .arg("--answers")
            .arg(answers.path())
            .assert()
            .failure();
        let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
        assert!(stderr.contains("answer 4"));
        assert!(stderr.contains("2_3"));
        Ok(())
    }

    #[test]
    fn chat_reprompts_and_exits() {
        let output = chatflow()
            .arg("chat")
            .write_stdin("Let's get going!\nDana\nLevi\nnot a phone\nexit\n")
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
        assert!(stdout.contains("Dialogue: Group tour intake"));
        assert!(stdout.contains("Contact details"));
        assert!(stdout.contains("Bye."));
        assert!(stderr.contains("Invalid answer: value does not match the expected format"));
    }

    #[test]
    fn chat_restart_returns_to_intro() {
        let output = chatflow()
            .arg("chat")
            .arg("--verbose")
            .write_stdin("Let's get going!\nrestart\n")
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout).to_string();
        assert_eq!(stdout.matches("[ Let's get going! ]").count(), 2);
        assert!(stdout.contains("[2_1]"));
    }
}
