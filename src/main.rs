use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Once;

use minischeme::{Limits, Machine};

static TRACING_INIT: Once = Once::new();

/// Install a stderr subscriber filtered by `RUST_LOG`. Does nothing when the
/// variable is unset.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [file]", args[0]);
        return ExitCode::FAILURE;
    }

    let limits = match Limits::from_env() {
        Ok(limits) => limits,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut machine = match Machine::new(&limits) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let status = match args.get(1) {
        Some(path) => run_file(&mut machine, path),
        None => {
            run_repl(&mut machine);
            ExitCode::SUCCESS
        }
    };

    let remaining = machine.shutdown();
    tracing::debug!(remaining = remaining.total(), "exiting");
    status
}

/// Evaluate every form in a file, printing each result. The first fault
/// ends the run.
fn run_file(machine: &mut Machine, path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    match machine.eval_source(&source, print_result) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Interactive loop: accumulate lines until parens are balanced, then
/// evaluate the buffered forms. A fault abandons the rest of the turn.
fn run_repl(machine: &mut Machine) {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    if interactive {
        println!("Simple Scheme REPL (press Ctrl+D to exit)");
    }

    let mut buf = String::new();
    let mut depth: i64 = 0;

    loop {
        if interactive {
            print!("{}", if depth == 0 { "> " } else { "  " });
            let _ = io::stdout().flush();
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }

        depth += paren_balance(&line);
        buf.push_str(&line);

        // An excess ')' goes straight to the reader, which reports it.
        if depth <= 0 {
            depth = 0;
            if !buf.trim().is_empty() {
                if let Err(e) = machine.eval_source(&buf, print_result) {
                    eprintln!("Error: {}", e);
                }
            }
            buf.clear();
        }
    }

    // Input ended inside an open list; let the reader report it.
    if !buf.trim().is_empty() {
        if let Err(e) = machine.eval_source(&buf, print_result) {
            eprintln!("Error: {}", e);
        }
    }

    if interactive {
        println!();
    }
}

fn print_result(machine: &Machine, val: minischeme::Value) {
    println!("{}", machine.print(val));
}

/// Net count of `(` over `)` in a line, ignoring `;` comments.
fn paren_balance(line: &str) -> i64 {
    let code = line.split(';').next().unwrap_or("");
    code.chars().fold(0, |depth, ch| match ch {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}
