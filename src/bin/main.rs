use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use pchor::{
    error::PchorError,
    lexer,
    model::Program,
    parser, projector,
    util::fmt::tree,
    validator::{self, MethodOrder, Options},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Projects a pchor choreography and checks a program against it.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// The choreography (`.cor`) file.
    #[arg(long)]
    cor: PathBuf,

    /// The JSON program model to validate.
    #[arg(long = "impl", required_unless_present = "project_only")]
    implementation: Option<PathBuf>,

    /// Prints the tokens, declarations and local protocols.
    #[arg(long)]
    debug: bool,

    /// Stops after projection, printing the local protocols.
    #[arg(long)]
    project_only: bool,

    /// Maximum number of nested calls inlined while matching a method.
    #[arg(long, default_value_t = validator::DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Tries candidate methods in declaration order instead of last first.
    #[arg(long)]
    declaration_order: bool,

    /// Increases log verbosity. Ignored when `RUST_LOG` is set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            error!("{error}");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every participant conforms.
fn run(cli: &Cli) -> Result<bool, PchorError> {
    let src = read(&cli.cor)?;
    let stdout = &mut io::stdout().lock();

    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let table = parser::parse_choreography(&src, &mut tokens)?;
    if cli.debug {
        writeln!(stdout, "== tokens")?;
        tree::print_tokens(stdout, &src, &tokens)?;
        writeln!(stdout, "== declarations")?;
        tree::print_symbol_table(stdout, &table)?;
    }

    let projection = projector::project(&table)?;
    if cli.debug || cli.project_only {
        if cli.debug {
            writeln!(stdout, "== projections")?;
        }
        tree::print_projection(stdout, &projection)?;
    }
    let Some(path) = cli.implementation.as_deref().filter(|_| !cli.project_only) else {
        return Ok(true);
    };

    let program = Program::from_json(&read(path)?)?;
    let options = Options {
        max_call_depth: cli.max_call_depth,
        method_order: if cli.declaration_order {
            MethodOrder::Declaration
        } else {
            MethodOrder::Reverse
        },
    };
    let Some(root) = table.root() else {
        return Err(projector::ProjectionError::NoGlobalType.into());
    };
    let report = validator::validate(&program, root, &projection, &options)?;
    if cli.debug {
        writeln!(stdout, "== report")?;
    }
    tree::print_report(stdout, &report)?;
    Ok(report.is_conformant())
}

fn read(path: &Path) -> Result<String, PchorError> {
    fs::read_to_string(path).map_err(|source| PchorError::Io {
        path: path.to_owned(),
        source,
    })
}
