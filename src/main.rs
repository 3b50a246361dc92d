use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;

use winter::config::MachineConfig;
use winter::diagnostic::{ansi::AnsiRenderer, json, registry, Diagnostic};
use winter::driver::{Session, SessionError};
use winter::{compiler, lexer, logging, lowering, parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Parsed statements as pretty JSON
    Ast,
    /// Disassembled bytecode after lowering
    Bytecode,
}

#[derive(Debug, Parser)]
#[command(name = "winter", version, about = "Run winter scripts")]
struct Cli {
    /// Script to run. Starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Start the REPL after running FILE (globals stay bound).
    #[arg(long)]
    repl: bool,

    /// Print an intermediate form instead of running.
    #[arg(long, value_enum, value_name = "FORM")]
    emit: Option<Emit>,

    /// Report errors as one JSON object per line on stderr.
    #[arg(long)]
    json: bool,

    /// Disable ANSI colours in error output.
    #[arg(long)]
    no_color: bool,

    /// Collect garbage every N steps (0 = only between statements).
    #[arg(long, value_name = "N", default_value_t = MachineConfig::default().gc_interval)]
    gc_interval: usize,

    /// Maximum call depth before a stack overflow error.
    #[arg(long, value_name = "N", default_value_t = MachineConfig::default().max_call_depth)]
    max_call_depth: usize,

    /// More logging on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explain an error code, e.g. WIN-R003.
    #[arg(long, value_name = "CODE", conflicts_with_all = ["file", "emit", "repl"])]
    explain: Option<String>,
}

impl Cli {
    fn config(&self) -> MachineConfig {
        MachineConfig::default()
            .with_gc_interval(self.gc_interval)
            .with_max_call_depth(self.max_call_depth)
    }

    fn emit_diagnostic(&self, d: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(d));
        } else {
            let renderer = AnsiRenderer { use_color: !self.no_color && io::stderr().is_terminal() };
            eprint!("{}", renderer.render(d));
        }
    }

    fn report(&self, err: &SessionError, source: &str) {
        self.emit_diagnostic(&Diagnostic::from(err).with_source(source));
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Some(code) = &cli.explain {
        return explain(code);
    }

    let Some(path) = &cli.file else {
        return repl(&cli, Session::new(cli.config()));
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            cli.emit_diagnostic(&Diagnostic::error(format!("cannot read {}: {e}", path.display())));
            return ExitCode::from(1);
        }
    };

    if let Some(form) = cli.emit {
        return emit(&cli, form, &source);
    }

    info!("running {}", path.display());
    let mut session = Session::new(cli.config());
    if let Err(e) = session.run_source(&source) {
        cli.report(&e, &source);
        return exit_status(&e);
    }
    if cli.repl {
        return repl(&cli, session);
    }
    ExitCode::SUCCESS
}

fn exit_status(err: &SessionError) -> ExitCode {
    ExitCode::from(err.exit_code() as u8)
}

fn explain(code: &str) -> ExitCode {
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("unknown error code: {code}");
            ExitCode::from(1)
        }
    }
}

/// `--emit`: parse everything (reporting every syntax error), then print
/// the requested form.
fn emit(cli: &Cli, form: Emit, source: &str) -> ExitCode {
    let tokens = match lexer::lex(source) {
        Ok(t) => t,
        Err(e) => {
            cli.report(&SessionError::Lex(e), source);
            return ExitCode::from(1);
        }
    };
    let (statements, errors) = parser::Parser::new(tokens).parse_program();
    if !errors.is_empty() {
        for e in errors {
            cli.report(&SessionError::Parse(e), source);
        }
        return ExitCode::from(1);
    }

    match form {
        Emit::Ast => match serde_json::to_string_pretty(&statements) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                cli.emit_diagnostic(&Diagnostic::internal(format!("cannot serialize AST: {e}")));
                return ExitCode::from(2);
            }
        },
        Emit::Bytecode => match compiler::compile(&lowering::lower_program(statements)) {
            Ok(chunk) => print!("{chunk}"),
            Err(e) => {
                let e = SessionError::Compile(e);
                cli.report(&e, source);
                return exit_status(&e);
            }
        },
    }
    ExitCode::SUCCESS
}

/// Read statements from stdin until EOF. Input is buffered until it
/// parses as complete statements; a failed statement is reported and the
/// machine recovers so later input still sees the globals.
fn repl(cli: &Cli, mut session: Session) -> ExitCode {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut buffer = String::new();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("{}", if buffer.is_empty() { "> " } else { ". " });
            let _ = io::stdout().flush();
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                cli.emit_diagnostic(&Diagnostic::error(format!("cannot read input: {e}")));
                return ExitCode::from(1);
            }
            None => return ExitCode::SUCCESS,
        };
        buffer.push_str(&line);
        buffer.push('\n');

        match parser::parse_str(&buffer) {
            Err(e) if e.code == "WIN-P002" => continue,
            _ => {}
        }

        let source = std::mem::take(&mut buffer);
        if let Err(e) = session.run_source(&source) {
            cli.report(&e, &source);
            if e.is_internal() {
                return exit_status(&e);
            }
            if let Err(e) = session.recover() {
                cli.report(&e, &source);
                return exit_status(&e);
            }
        }
    }
}
