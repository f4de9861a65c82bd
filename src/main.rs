use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use sheenc::{
    BuiltinCatalog, Fatal, Incident, SourceFile, SourceFileOrigin, Target, TranspileOptions,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_files: Vec<PathBuf>,

    /// Write the generated code here instead of stdout. Only valid with a
    /// single source file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Target::Wgsl)]
    target: Target,

    /// Spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Leave out the generated-by comment
    #[arg(long)]
    no_header: bool,

    /// Only validate, without generating code
    #[arg(long)]
    check: bool,

    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if args.source_files.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing source files!")
            .exit();
    }

    if args.output.is_some() && args.source_files.len() > 1 {
        Args::command()
            .error(
                ErrorKind::ArgumentConflict,
                "'--output' can only be used with a single source file!",
            )
            .exit();
    }

    for source_file in &args.source_files {
        if !source_file.exists() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Source file '{}' does not exist!", source_file.display()),
                )
                .exit()
        }

        if !source_file.is_file() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Input path '{}' is not a file!", source_file.display()),
                )
                .exit()
        }
    }

    /* Read in source files */

    let source_files = args
        .source_files
        .iter()
        .map(|path| match std::fs::read_to_string(path) {
            Ok(contents) => SourceFile {
                contents,
                origin: SourceFileOrigin::File(path.clone()),
            },
            Err(error) => Args::command()
                .error(
                    ErrorKind::Io,
                    format!("Failed to read '{}': {error}", path.display()),
                )
                .exit(),
        })
        .collect::<Vec<_>>();

    let options = TranspileOptions {
        indent: " ".repeat(args.indent),
        header: !args.no_header,
    };

    let mut failed = false;

    for source_file in &source_files {
        let outcome = if args.check {
            check(source_file)
        } else {
            sheenc::transpile(source_file, args.target, &options).map(|transpilation| {
                emit(&args, &transpilation.source);
                transpilation.incidents
            })
        };

        match outcome {
            Ok(incidents) => {
                debug!(
                    origin = %source_file.origin,
                    "finished with {} incidents",
                    incidents.len()
                );

                failed |= !incidents.is_empty();
                report(source_file, &incidents);
            }
            Err(fatal) => {
                failed = true;
                eprintln!("{}\n", fatal.render(source_file));
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn check(source_file: &SourceFile) -> Result<Vec<Incident>, Fatal> {
    let document = sheenc::parse_ast(source_file)?;

    Ok(sheenc::validate(&document, &BuiltinCatalog::new())?.incidents)
}

fn emit(args: &Args, generated: &str) {
    let Some(output) = &args.output else {
        print!("{generated}");
        return;
    };

    if let Err(error) = std::fs::write(output, generated) {
        Args::command()
            .error(
                ErrorKind::Io,
                format!("Failed to write '{}': {error}", output.display()),
            )
            .exit()
    }
}

fn report(source_file: &SourceFile, incidents: &[Incident]) {
    for incident in incidents {
        eprintln!("{}\n", incident.render(source_file));
    }
}
