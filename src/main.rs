use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use exprjit::config::JitConfig;
use exprjit::dump;
use exprjit::error::JitError;
use exprjit::Expr;
#[cfg(feature = "jit")]
use exprjit::jit::JitCompiler;

#[derive(Parser)]
#[command(name = "exprjit")]
#[command(about = "Compile arithmetic expression trees to native code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the expression tree comes from.
#[derive(Args)]
struct Input {
    /// JSON file holding the expression tree
    file: Option<PathBuf>,

    /// Expression tree given inline as JSON
    #[arg(short = 'e', long)]
    expr: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression tree and run the native code
    Run {
        #[command(flatten)]
        input: Input,

        /// Config file (defaults to exprjit.toml in the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trace JIT compilation events
        #[arg(long)]
        trace_jit: bool,

        /// Compile trees even if their evaluation fails
        #[arg(long)]
        no_check: bool,

        /// Print the tree to stderr
        #[arg(long)]
        dump_tree: bool,

        /// Print the operation sequence to stderr
        #[arg(long)]
        dump_ops: bool,

        /// Print the machine code to stderr
        #[arg(long)]
        dump_code: bool,
    },
    /// Evaluate an expression tree with the reference evaluator
    Eval {
        #[command(flatten)]
        input: Input,
    },
    /// Run both the evaluator and the compiled code and compare the results
    Check {
        #[command(flatten)]
        input: Input,

        /// Config file (defaults to exprjit.toml in the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(trace_jit: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG wins; otherwise warn, or debug for our own events with --trace-jit
    let default = if trace_jit { "warn,exprjit=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_expr(input: &Input) -> Result<Expr, JitError> {
    let source = match (&input.expr, &input.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            JitError::Config(format!("failed to read {}: {}", path.display(), e))
        })?,
        (None, None) => {
            return Err(JitError::Config(
                "no input: pass a tree file or --expr".to_string(),
            ));
        }
    };
    serde_json::from_str(&source)
        .map_err(|e| JitError::Config(format!("invalid expression tree: {}", e)))
}

fn load_config(path: Option<&Path>) -> Result<JitConfig, JitError> {
    match path {
        Some(path) => JitConfig::load(path),
        None => JitConfig::discover(Path::new(".")),
    }
}

#[cfg(feature = "jit")]
#[allow(clippy::too_many_arguments)]
fn run(
    input: &Input,
    config: Option<&Path>,
    trace_jit: bool,
    no_check: bool,
    dump_tree: bool,
    dump_ops: bool,
    dump_code: bool,
) -> Result<(), JitError> {
    let mut config = load_config(config)?;
    config.trace_jit |= trace_jit;
    if no_check {
        config.check_arithmetic = false;
    }
    init_logging(config.trace_jit);

    let expr = load_expr(input)?;
    if dump_tree {
        eprint!("{}", dump::tree(&expr));
    }

    let compiled = JitCompiler::new(config).compile(&expr)?;
    if dump_ops {
        eprint!("{}", dump::operations(compiled.operations()));
    }
    if dump_code {
        eprint!("{}", dump::hex(compiled.code()));
    }

    println!("{}", compiled.invoke()?);
    Ok(())
}

#[cfg(not(feature = "jit"))]
#[allow(clippy::too_many_arguments)]
fn run(
    _input: &Input,
    _config: Option<&Path>,
    _trace_jit: bool,
    _no_check: bool,
    _dump_tree: bool,
    _dump_ops: bool,
    _dump_code: bool,
) -> Result<(), JitError> {
    Err(JitError::Config(
        "exprjit was built without the `jit` feature".to_string(),
    ))
}

fn eval(input: &Input) -> Result<(), JitError> {
    init_logging(false);
    let expr = load_expr(input)?;
    println!("{}", expr.evaluate()?);
    Ok(())
}

#[cfg(feature = "jit")]
fn check(input: &Input, config: Option<&Path>) -> Result<bool, JitError> {
    let config = load_config(config)?;
    init_logging(config.trace_jit);

    let expr = load_expr(input)?;
    let expected = expr.evaluate()?;
    let actual = JitCompiler::new(config).compile(&expr)?.invoke()?;
    if expected == actual {
        println!("ok: {}", expected);
        Ok(true)
    } else {
        println!("mismatch: evaluator {}, native {}", expected, actual);
        Ok(false)
    }
}

#[cfg(not(feature = "jit"))]
fn check(_input: &Input, _config: Option<&Path>) -> Result<bool, JitError> {
    Err(JitError::Config(
        "exprjit was built without the `jit` feature".to_string(),
    ))
}

/// Top-level error policy: fatal codegen errors abort, everything else exits 1.
fn report(err: JitError) -> ExitCode {
    if err.is_fatal() {
        tracing::error!("fatal: {}", err);
        eprintln!("fatal: {}", err);
        std::process::abort();
    }
    eprintln!("error: {}", err);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            input,
            config,
            trace_jit,
            no_check,
            dump_tree,
            dump_ops,
            dump_code,
        } => run(
            input,
            config.as_deref(),
            *trace_jit,
            *no_check,
            *dump_tree,
            *dump_ops,
            *dump_code,
        )
        .map(|_| true),
        Commands::Eval { input } => eval(input).map(|_| true),
        Commands::Check { input, config } => check(input, config.as_deref()),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => report(err),
    }
}
