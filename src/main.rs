//! rembrandb CLI
//!
//! Interactive prompt over the query engine, plus a one-shot statement mode.
//! Query failures print one line to stderr and never end the session; only
//! startup failures (catalog, JIT host) are fatal.

use anyhow::{Context, Result};
use clap::Parser;
use rembrandb::{Config, Engine, EngineOptions, catalog, output};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "rembrandb")]
#[command(about = "Read-only analytical query engine with JIT-compiled kernels", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "rembrandb.toml")]
    config: PathBuf,

    /// Directory holding table manifests and column files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable kernel optimizations
    #[arg(long = "opt")]
    opt: bool,

    /// Do not print query results
    #[arg(long = "no-print")]
    no_print: bool,

    /// Do not print generated kernel IR
    #[arg(long = "no-ir")]
    no_ir: bool,

    /// Execute one statement and exit
    #[arg(short = 's', long = "statement")]
    statement: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            use clap::error::ErrorKind;
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = if args.config.exists() {
        Config::from_file(&args.config).context("Failed to load configuration")?
    } else {
        Config::default()
    };

    if args.opt {
        println!("Optimizations enabled.");
    }
    if args.no_print {
        println!("Printing output disabled.");
    }
    if args.no_ir {
        println!("Printing IR disabled.");
    }

    let data_dir = args.data_dir.unwrap_or_else(|| config.tables.dir.clone());
    let catalog = catalog::load(&data_dir, &config.tables.names, &config.tables.optional_names)
        .context("Failed to load table catalog")?;

    let options = EngineOptions {
        optimize: args.opt || config.query.optimize,
        dump_ir: config.query.dump_ir && !args.no_ir,
    };
    let print_results = config.query.print_results && !args.no_print;
    let engine = Engine::new(catalog, options).context("Failed to initialize the JIT host")?;

    if let Some(statement) = args.statement {
        run_statement(&engine, &statement, print_results);
        return Ok(());
    }

    banner(&engine);
    repl(&engine, print_results)
}

fn banner(engine: &Engine) {
    let names: Vec<&str> = engine
        .catalog()
        .tables()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    println!("# RembranDB server v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "# Serving tables {}, with no support for multithreading",
        names.join(", ")
    );
    println!("# Not listening to any connection requests.");
    println!("# SQL module loaded");
}

enum Input {
    Quit,
    ListTables,
    Statement(String),
}

fn repl(engine: &Engine, print_results: bool) -> Result<()> {
    let stdin = std::io::stdin();
    loop {
        match read_statement(&stdin)? {
            Input::Quit => return Ok(()),
            Input::ListTables => print!("{}", output::render_table_list(engine.catalog())),
            Input::Statement(statement) => run_statement(engine, &statement, print_results),
        }
    }
}

/// Read one statement from the prompt. Lines accumulate until one contains
/// `;`; a line starting with `\` is a meta-command; `^` and end-of-input
/// both quit.
fn read_statement(stdin: &std::io::Stdin) -> Result<Input> {
    let mut statement = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(Input::Quit);
        }
        let trimmed = line.trim();
        if trimmed.starts_with('^') {
            return Ok(Input::Quit);
        }
        if trimmed.starts_with('\\') {
            match trimmed {
                "\\q" => return Ok(Input::Quit),
                "\\d" => return Ok(Input::ListTables),
                other => {
                    eprintln!("Unrecognized command {other}");
                    continue;
                }
            }
        }
        statement.push_str(&line);
        statement.push(' ');
        if line.contains(';') {
            return Ok(Input::Statement(statement));
        }
    }
}

fn run_statement(engine: &Engine, statement: &str, print_results: bool) {
    let total = Instant::now();
    match engine.execute(statement) {
        Ok(outcome) => {
            println!(
                "Compile: {:.6} seconds",
                outcome.compile_time.as_secs_f64()
            );
            println!("Runtime: {:.6} seconds", outcome.run_time.as_secs_f64());
            println!("Total Runtime: {:.6} seconds", total.elapsed().as_secs_f64());
            if print_results {
                print!("{}", output::render_result(&outcome.table));
            }
        }
        Err(err) => eprintln!("{err}"),
    }
}
