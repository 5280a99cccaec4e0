//! CLI: validate, plan and run node directories.
//!
//! Usage: `scm [OPTIONS] <COMMAND>`
//! Example: scm agent scm/nodes
//!
//! Traces are written to ./scm_traces unless --trace-dir or SCM_TRACE_DIR say
//! otherwise. Set RUST_LOG=scm_runtime=trace for span enter/exit.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use scm_runtime::models::register_demo_models;
use scm_runtime::node_io::read_node_value;
use scm_runtime::plugins::PluginRegistry;
use scm_runtime::tracer::DEFAULT_TRACE_DIR;
use scm_runtime::{
  AgentController, Composition, GraphComposer, RunOptions, RunOutcome, SchemaValidator, Session,
  Tracer, compose,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Validate, plan and run computation node graphs.
#[derive(Parser, Debug)]
#[command(name = "scm")]
#[command(
  after_help = r#"Environment variables (override --trace-dir and --adaptation-log when set):
  SCM_TRACE_DIR        Directory for trace_<id>.jsonl and summary_<id>.json (default: ./scm_traces).
  SCM_ADAPTATION_LOG   Adaptation log file (default: <trace dir>/adaptation_log.jsonl).

Examples:
  scm validate nodes/forecast_v1.0.0.json
  scm compose nodes
  scm agent --evaluate-only nodes"#
)]
struct Args {
  /// Directory for trace and summary files. Overridden by SCM_TRACE_DIR if set.
  #[arg(long, value_name = "DIR", global = true, default_value = DEFAULT_TRACE_DIR)]
  trace_dir: PathBuf,

  /// Adaptation log file. Overridden by SCM_ADAPTATION_LOG if set.
  #[arg(long, value_name = "FILE", global = true)]
  adaptation_log: Option<PathBuf>,

  /// Author recorded on adapted nodes.
  #[arg(long, value_name = "REF", global = true)]
  agent_ref: Option<String>,

  /// Debug-level logging when RUST_LOG is not set.
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Check one node file against the node schema.
  Validate {
    #[arg(value_name = "node-file")]
    node: PathBuf,
  },
  /// Load a node directory and print its execution plan.
  Compose {
    #[arg(value_name = "nodes-dir")]
    dir: PathBuf,
  },
  /// Run a node directory without agent oversight.
  Simulate {
    #[arg(value_name = "nodes-dir")]
    dir: PathBuf,
  },
  /// Run a node directory under agent control.
  Agent {
    #[arg(value_name = "nodes-dir")]
    dir: PathBuf,
    /// Only evaluate the graph structure.
    #[arg(long)]
    evaluate_only: bool,
  },
}

fn main() {
  let args = Args::parse();
  let default_level = if args.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();
  info!("scm starting");

  let ok = match &args.command {
    Command::Validate { node } => validate(node),
    Command::Compose { dir } => plan(dir),
    Command::Simulate { dir } => simulate(&options(&args, dir)),
    Command::Agent { dir, evaluate_only } => agent(&options(&args, dir), *evaluate_only),
  };
  if !ok {
    process::exit(1);
  }
}

/// Flags, then environment overrides.
fn options(args: &Args, dir: &Path) -> RunOptions {
  let mut options = RunOptions::new(dir);
  options.trace_dir = args.trace_dir.clone();
  options.adaptation_log = args.adaptation_log.clone();
  if let Some(agent_ref) = &args.agent_ref {
    options.agent_ref = agent_ref.clone();
  }
  let options = options.apply_env();
  info!(
    nodes_dir = %options.nodes_dir.display(),
    trace_dir = %options.trace_dir.display(),
    adaptation_log = %options.adaptation_log_path().display(),
    "options (env or flags)"
  );
  options
}

fn schema() -> Option<SchemaValidator> {
  match SchemaValidator::node_schema() {
    Ok(v) => Some(v),
    Err(e) => {
      eprintln!("Error loading node schema: {}", e);
      None
    }
  }
}

fn validate(path: &Path) -> bool {
  let Some(validator) = schema() else {
    return false;
  };
  let value = match read_node_value(path) {
    Ok(v) => v,
    Err(e) => {
      eprintln!("Error: {}", e);
      return false;
    }
  };
  match validator.check(&value) {
    Ok(()) => {
      println!("{}: valid", path.display());
      true
    }
    Err(e) => {
      eprintln!("{}: {}", path.display(), e);
      false
    }
  }
}

fn load(dir: &Path) -> Option<Composition> {
  let validator = schema()?;
  match compose(dir, &validator) {
    Ok(c) => Some(c),
    Err(e) => {
      eprintln!("Composition error: {}", e);
      None
    }
  }
}

fn plan(dir: &Path) -> bool {
  let Some(c) = load(dir) else {
    return false;
  };
  println!("Execution plan ({} nodes):", c.plan.len());
  for (i, id) in c.plan.iter().enumerate() {
    println!("  {}. {}", i + 1, id);
  }
  true
}

fn session(options: &RunOptions) -> Option<Session> {
  let tracer = match Tracer::initialize(&options.trace_dir) {
    Ok(t) => t,
    Err(e) => {
      eprintln!("Error initializing trace directory {}: {}", options.trace_dir.display(), e);
      return None;
    }
  };
  if let Some(id) = tracer.trace_id() {
    info!(trace_id = %id, "trace session started");
  }
  let mut plugins = PluginRegistry::new();
  register_demo_models(&mut plugins);
  match Session::new(tracer) {
    Ok(s) => Some(s.with_plugins(plugins)),
    Err(e) => {
      eprintln!("Error loading node schema: {}", e);
      None
    }
  }
}

fn print_outcome(outcome: &RunOutcome) {
  println!("Run completed.");
  println!("  Status: {}", outcome.status);
  println!("  Nodes run: {}", outcome.results.len());
  match serde_json::to_string_pretty(&outcome.final_results_json()) {
    Ok(s) => println!("  Final results: {}", s),
    Err(e) => eprintln!("Error rendering final results: {}", e),
  }
  for (original, adapted) in &outcome.adaptations {
    println!("  Adapted: {} -> {}", original, adapted);
  }
}

fn simulate(options: &RunOptions) -> bool {
  let Some(c) = load(&options.nodes_dir) else {
    return false;
  };
  let Some(mut session) = session(options) else {
    return false;
  };
  let outcome = GraphComposer::new(c).execute(&mut session);
  print_outcome(&outcome);
  outcome.is_success()
}

fn agent(options: &RunOptions, evaluate_only: bool) -> bool {
  let Some(c) = load(&options.nodes_dir) else {
    return false;
  };
  let Some(mut session) = session(options) else {
    return false;
  };
  let mut controller = AgentController::from_composition(&c, options.adaptation_manager());

  let evaluation = controller.evaluate_structure(&mut session);
  match serde_json::to_string_pretty(&evaluation) {
    Ok(s) => println!("Graph evaluation: {}", s),
    Err(e) => eprintln!("Error rendering evaluation: {}", e),
  }
  if evaluate_only {
    return true;
  }

  let outcome = controller.run(&mut session);
  print_outcome(&outcome);
  println!("Optimization suggestions:");
  for s in controller.suggest_optimizations(&outcome, &mut session) {
    println!("  - {}", s);
  }
  println!("Agent log:");
  for line in controller.agent_log() {
    println!("  {}", line);
  }
  outcome.is_success()
}
