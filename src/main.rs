use cheax::{config, Cheax};
use clap::Parser;
use log::LevelFilter;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};

/// Interpreter for the cheax expression language
#[derive(Parser, Debug)]
#[command(name = "cheax")]
#[command(version = config::VERSION)]
#[command(about = "An embeddable Lisp-family expression interpreter")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Enable a named feature group (can be repeated)
    #[arg(long = "feature", value_name = "NAME", action = clap::ArgAction::Append)]
    features: Vec<String>,

    /// Evaluation stack depth limit
    #[arg(long = "max-stack-depth", value_name = "N")]
    max_stack_depth: Option<u32>,

    /// Prelude file evaluated before the script or REPL
    #[arg(long = "prelude", value_name = "FILE")]
    prelude: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    SimpleLogger::new()
        .with_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init()?;

    let mut cx = Cheax::new();
    if let Some(depth) = args.max_stack_depth {
        cx.set_max_stack_depth(depth)?;
    }

    // The REPL driver always gets the console and control groups; extra
    // groups come from the command line.
    for feature in ["stdio", "exit", "set-max-stack-depth"] {
        cx.load_feature(feature)?;
    }
    for feature in &args.features {
        if cx.load_feature(feature).is_err() {
            log::warn!("cannot enable feature {}", feature);
        }
    }

    if let Some(path) = &args.prelude {
        if load_file(&mut cx, path).is_err() {
            cx.perror(&path.display().to_string());
        }
    }

    if let Some(script) = &args.script {
        // Script mode: execute the file and exit.
        if load_file(&mut cx, script).is_err() {
            cx.perror(&script.display().to_string());
            std::process::exit(1);
        }
        return Ok(());
    }

    repl(&mut cx)
}

fn load_file(cx: &mut Cheax, path: &Path) -> cheax::Result<()> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| cheax::Error::new(cheax::errors::EIO, e.to_string()))?;
    cx.eval_string(&source)?;
    Ok(())
}

fn repl(cx: &mut Cheax) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = DefaultEditor::with_config(config)?;

    let history_file = ".cheax_history";
    let _ = rl.load_history(history_file);

    println!("cheax {}", config::VERSION);
    println!("Use Ctrl-D or (exit) to leave.");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match cx.eval_string(&line) {
                    Ok(value) => println!("{}", cx.format_value(&value)),
                    Err(_) => cx.perror("error"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                log::error!("readline failed: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    Ok(())
}
