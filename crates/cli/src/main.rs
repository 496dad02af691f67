use anyhow::Context;
use clap::{Parser, Subcommand};
use protocol::{validate, Identifier};
use std::io::BufRead;
use std::path::PathBuf;
use study_core::{
    core_config_from_env_values, AnswerSink, CoreConfig, CoreError, FileProtocolStore,
    JsonAnswerSink, Navigator, ProtocolStore, Step,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "study")]
#[command(about = "Research-study protocol CLI")]
struct Cli {
    /// Directory holding protocol YAML files (overrides STUDY_PROTOCOL_DIR)
    #[arg(long, global = true)]
    protocol_dir: Option<PathBuf>,
    /// Directory receiving answer logs (overrides STUDY_ANSWER_DIR)
    #[arg(long, global = true)]
    answer_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a protocol for broken references and ordering problems
    Validate {
        /// Protocol id
        protocol_id: String,
    },
    /// Show module, question and condition counts
    Overview {
        /// Protocol id
        protocol_id: String,
    },
    /// Walk through a protocol as a participant would
    Simulate {
        /// Protocol id
        protocol_id: String,
        /// Answers in order; when omitted, answers are read one per line from stdin
        #[arg(long = "answer")]
        answers: Vec<String>,
        /// Do not write the answer log when the run completes
        #[arg(long)]
        no_persist: bool,
    },
}

fn resolve_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let env_or_flag = |flag: &Option<PathBuf>, var: &str| {
        flag.as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| std::env::var(var).ok())
    };

    Ok(core_config_from_env_values(
        env_or_flag(&cli.protocol_dir, "STUDY_PROTOCOL_DIR"),
        env_or_flag(&cli.answer_dir, "STUDY_ANSWER_DIR"),
    )?)
}

fn load_protocol(cfg: &CoreConfig, protocol_id: &str) -> anyhow::Result<protocol::Protocol> {
    let id = Identifier::new(protocol_id).context("invalid protocol id")?;
    let protocol = FileProtocolStore::new(cfg)
        .load(&id)
        .with_context(|| format!("failed to load protocol {id}"))?;
    Ok(protocol)
}

fn describe(step: &Step) -> String {
    match step {
        Step::Advanced { to, skipped } if skipped.is_empty() => format!("-> {to}"),
        Step::Advanced { to, skipped } => format!("-> {to} (skipped {})", join(skipped)),
        Step::Jumped {
            condition_id,
            to,
            skipped,
        } if skipped.is_empty() => format!("=> {to} via condition {condition_id}"),
        Step::Jumped {
            condition_id,
            to,
            skipped,
        } => format!(
            "=> {to} via condition {condition_id} (skipped {})",
            join(skipped)
        ),
        Step::Terminated { condition_id } => format!("terminated by condition {condition_id}"),
        Step::Completed {
            condition_id: Some(condition_id),
        } => format!("completed after condition {condition_id}"),
        Step::Completed { condition_id: None } => "completed".to_string(),
    }
}

fn join(ids: &[Identifier]) -> String {
    ids.iter().map(Identifier::as_str).collect::<Vec<_>>().join(", ")
}

fn simulate(
    cfg: &CoreConfig,
    protocol_id: &str,
    answers: Vec<String>,
    no_persist: bool,
) -> anyhow::Result<()> {
    let protocol = load_protocol(cfg, protocol_id)?;
    let overview = protocol.overview();
    println!(
        "{}: {} modules, {} questions, {} conditions",
        protocol.name(),
        overview.modules,
        overview.questions,
        overview.conditions
    );

    let scripted = !answers.is_empty();
    let mut scripted_answers = answers.into_iter();
    let stdin = std::io::stdin();
    let mut stdin_lines = stdin.lock().lines();

    let mut nav = Navigator::new(protocol);
    nav.start();

    while let Some(question) = nav.current_question() {
        let module_name = nav
            .current_position()
            .and_then(|p| nav.protocol().modules().get(p.module_index))
            .map(|m| m.name.as_str())
            .unwrap_or_default();
        let progress = nav.progress();
        println!(
            "[{}/{}] {module_name} / {}: {} ({}, {})",
            progress.answered + 1,
            progress.total,
            question.id,
            question.title,
            question.input_kind.label(),
            question.output_kind.label()
        );
        if let Some(description) = &question.description {
            println!("    {description}");
        }

        let next = if scripted {
            scripted_answers.next()
        } else {
            stdin_lines.next().transpose().context("failed to read stdin")?
        };
        let Some(value) = next else {
            println!("No more answers; run abandoned.");
            return Ok(());
        };

        match nav.submit(value) {
            Ok(step) => println!("  {}", describe(&step)),
            Err(CoreError::AnswerRequired(id)) => println!("  {id} requires an answer"),
            Err(e) => return Err(e.into()),
        }
    }

    println!("Protocol completed.");
    for answer in nav.answer_summary() {
        println!("  {}: {}", answer.title, answer.value);
    }
    for diagnostic in nav.diagnostics() {
        println!("  warning: {diagnostic}");
    }

    if let Some(run) = nav.finish() {
        if no_persist {
            println!("Run {} not persisted.", run.run_id);
        } else {
            let sink = JsonAnswerSink::new(cfg);
            sink.persist(&run)?;
            println!("Answers written to {}", sink.run_path(&run).display());
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("study_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::Validate { protocol_id }) => {
            let protocol = load_protocol(&cfg, &protocol_id)?;
            let issues = validate(&protocol);
            if issues.is_empty() {
                println!("Protocol {} is valid.", protocol.id());
            } else {
                for issue in &issues {
                    println!("{issue}");
                }
                anyhow::bail!("protocol {} has {} issue(s)", protocol.id(), issues.len());
            }
        }
        Some(Commands::Overview { protocol_id }) => {
            let protocol = load_protocol(&cfg, &protocol_id)?;
            let overview = protocol.overview();
            println!("{} ({})", protocol.name(), protocol.id());
            println!("Modules: {}", overview.modules);
            println!("Questions: {}", overview.questions);
            println!("Conditions: {}", overview.conditions);
            for module in protocol.modules() {
                println!(
                    "  {}. {} ({} questions)",
                    module.order,
                    module.name,
                    module.questions.len()
                );
            }
        }
        Some(Commands::Simulate {
            protocol_id,
            answers,
            no_persist,
        }) => simulate(&cfg, &protocol_id, answers, no_persist)?,
        None => {
            println!("Use 'study --help' for commands");
        }
    }

    Ok(())
}
