//! CLI wrapper over the `routec` library (`spec.md` §6): a convenience
//! binary for driving the front-end pipeline from a shell, not a build
//! tool. Back-end lowering (`--emit`) is explicitly out of scope for this
//! crate; the flag is still parsed and validated so the binary proves out
//! the documented contract end to end.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use routec::{semantics::ValidationOptions, CompileOptions};

#[derive(Parser, Debug)]
#[command(name = "routec", about = "Front-end for a slash-path systems language")]
struct Args {
    /// Source file to compile.
    input: PathBuf,

    /// Back-end target; accepted for contract compatibility, not implemented here.
    #[arg(long)]
    emit: Option<String>,

    /// Output path; accepted for contract compatibility, not implemented here.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Entry definition path, normalized to a leading `/` (default `/main`).
    #[arg(long, default_value = "/main")]
    entry: String,

    /// When `ast`, dumps the parsed/validated program and exits without
    /// attempting emission.
    #[arg(long)]
    dump_stage: Option<String>,
}

fn normalize_entry_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("io error: could not read {}: {}", args.input.display(), e);
            return ExitCode::from(2);
        }
    };

    let options = CompileOptions {
        validation: ValidationOptions { entry_path: normalize_entry_path(&args.entry) },
        ..CompileOptions::default()
    };

    let program = match routec::compile(&source, &options) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", e.category(), e);
            return ExitCode::from(2);
        }
    };

    if args.dump_stage.as_deref() == Some("ast") {
        print!("{}", program.dump());
        return ExitCode::SUCCESS;
    }

    if args.emit.is_some() || args.output.is_some() {
        eprintln!("post-front-end tool failure: emission is handled by a separate, not-yet-attached back end");
        return ExitCode::from(3);
    }

    ExitCode::SUCCESS
}
