//! Shiori CLI - コマンドラインインターフェース
//!
//! スクリプト用ブレークポイントデバッガ shiori のREPLインターフェース

use anyhow::Result;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use shiori_core::errors::{CONFIRM_DELETE_ALL, CONFIRM_UNKNOWN_SOURCE};
use shiori_core::parse::parse_bindings;
use shiori_core::{BreakpointResult, Command, CommandError, Created, Debugger, Settings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Shiori - Breakpoint debugger for scripts
#[derive(Parser)]
#[command(name = "shiori")]
#[command(version = "0.1.0")]
#[command(about = "Breakpoint debugger for Ruby-like scripts", long_about = None)]
struct Cli {
    /// Script to debug
    script: String,

    /// Show file names without their directory
    #[arg(long)]
    basename: bool,

    /// Reload source files when they change on disk
    #[arg(long)]
    autoreload: bool,

    /// Additional source files to load
    #[arg(long = "load", value_name = "FILE")]
    load: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("Shiori - Breakpoint Debugger");
    println!("Version 0.1.0");
    println!();

    let cli = Cli::parse();
    let mut debugger = init_debugger(&cli)?;
    run_repl(&mut debugger)?;

    Ok(())
}

/// デバッガを初期化してスクリプトを読み込む
fn init_debugger(cli: &Cli) -> Result<Debugger> {
    let mut debugger = Debugger::with_settings(Settings {
        basename: cli.basename,
        autoreload: cli.autoreload,
    });

    let id = debugger.load_source(&cli.script)?;
    println!("Loaded {}", id.display_name(cli.basename));

    for path in &cli.load {
        let id = debugger.load_source(path)?;
        println!("Loaded {}", id.display_name(cli.basename));
    }

    if let Some(current) = debugger.current() {
        println!(
            "Stopped at {}:{}",
            current.source.display_name(cli.basename),
            current.line
        );
    }
    println!();

    Ok(debugger)
}

/// REPLループを実行する
fn run_repl(debugger: &mut Debugger) -> Result<()> {
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(shiori) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match handle_command(debugger, &mut rl, line) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// コマンドを処理する（終了する場合は `true`）
fn handle_command(debugger: &mut Debugger, rl: &mut DefaultEditor, line: &str) -> Result<bool> {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(CommandError::Unknown(_)) => {
            println!("Unknown command: {}", line);
            println!("Type 'help' for available commands.");
            return Ok(false);
        }
        Err(e) => {
            println!("*** {}", e);
            return Ok(false);
        }
    };
    debug!("Parsed command: {:?}", command);

    match command {
        Command::Help => print_help(),
        Command::Quit => {
            println!("Goodbye!");
            return Ok(true);
        }
        Command::Break(args) => handle_break(debugger, rl, &args)?,
        Command::Condition { id, expr } => {
            if let Err(e) = debugger.set_condition(id, expr.as_deref()) {
                println!("*** {}", e);
            }
        }
        Command::Enable(ids) => report_each(debugger.enable_breakpoints(&ids)),
        Command::Disable(ids) => report_each(debugger.disable_breakpoints(&ids)),
        Command::Delete(ids) => handle_delete(debugger, rl, &ids)?,
        Command::InfoBreakpoints => print!("{}", debugger.listing()),
        Command::Set(setting, value) => debugger.set(setting, value),
        Command::ShowSettings => println!("{}", debugger.settings()),
        Command::Reach { location, bindings } => handle_reach(debugger, &location, &bindings)?,
        Command::Load(path) => {
            let id = debugger.load_source(&path)?;
            println!("Loaded {}", id.display_name(debugger.settings().basename));
        }
    }

    Ok(false)
}

/// Breakコマンドを処理する
fn handle_break(debugger: &mut Debugger, rl: &mut DefaultEditor, args: &str) -> Result<()> {
    match debugger.create_breakpoint(args) {
        Ok(created) => print_created(debugger, &created),
        Err(e) => {
            println!("*** {}", e);
            if let Some(pending) = e.pending().cloned() {
                if confirm(rl, CONFIRM_UNKNOWN_SOURCE)? {
                    let created = debugger.create_unverified(&pending);
                    print_created(debugger, &created);
                }
            }
        }
    }
    Ok(())
}

fn print_created(debugger: &Debugger, created: &Created) {
    if let Some(e) = &created.condition_error {
        println!("*** {}", e);
    }
    println!("{}", debugger.created_message(&created.breakpoint));
}

/// Deleteコマンドを処理する
fn handle_delete(debugger: &mut Debugger, rl: &mut DefaultEditor, ids: &[usize]) -> Result<()> {
    if !ids.is_empty() {
        report_each(debugger.delete_breakpoints(ids));
        return Ok(());
    }

    if confirm(rl, CONFIRM_DELETE_ALL)? {
        let count = debugger.delete_all();
        println!("Deleted {} breakpoints", count);
    }
    Ok(())
}

/// 到達位置を通知して停止判定の結果を表示する
fn handle_reach(debugger: &mut Debugger, location: &str, bindings: &[String]) -> Result<()> {
    let position = match debugger.locate(location) {
        Ok(position) => position,
        Err(e) => {
            println!("*** {}", e);
            return Ok(());
        }
    };
    let ctx = parse_bindings(bindings)?;

    match debugger.notify_reached(&position.source, position.line, &ctx) {
        Some(bp) => println!("{}", debugger.hit_message(&bp)),
        None => println!(
            "Continuing past {}:{}",
            position.source.display_name(debugger.settings().basename),
            position.line
        ),
    }
    Ok(())
}

/// IDごとの失敗を表示する
fn report_each<T>(results: Vec<BreakpointResult<T>>) {
    for e in results.into_iter().filter_map(|r| r.err()) {
        println!("*** {}", e);
    }
}

/// y/n の確認を求める
fn confirm(rl: &mut DefaultEditor, prompt: &str) -> Result<bool> {
    match rl.readline(prompt) {
        Ok(answer) => Ok(matches!(answer.trim(), "y" | "yes")),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help                   - Show this help message");
    println!("  quit/exit/q            - Exit the debugger");
    println!();
    println!("Breakpoint commands:");
    println!("  break [loc] [if expr]  - Set breakpoint at line, file:line, Class#method or Class.method");
    println!("  condition <n> [expr]   - Set or remove the condition of breakpoint n");
    println!("  enable [n ...]         - Enable breakpoints (all when no numbers are given)");
    println!("  disable [n ...]        - Disable breakpoints (all when no numbers are given)");
    println!("  delete [n ...]         - Delete breakpoints (all when no numbers are given)");
    println!("  info breakpoints       - List breakpoints");
    println!();
    println!("Session commands:");
    println!("  reach <loc> [v=x ...]  - Report reaching loc with the given variables");
    println!("  load <file>            - Load another source file");
    println!("  set [no]basename       - Show only file names in messages");
    println!("  set [no]autoreload     - Reload source files changed on disk");
    println!("  show settings          - Show current settings");
    println!();
    println!("Examples:");
    println!("  break 14 if b == 5");
    println!("  break A#b");
    println!("  reach 14 b=5");
    println!("  disable 1");
}
