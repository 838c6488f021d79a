//! gsass - compile Sass/SCSS to CSS
//!
//! Usage: gsass [OPTIONS] [INPUT]...
//!
//! With no input the source is read from stdin. Several inputs are
//! concatenated and compiled as one stylesheet. `--watch` recompiles a file
//! or a directory of files whenever they change.

use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{ArgAction, Parser};
use gsass::{
    parse_import_paths, watch, CompileRequest, Compiler, CompilerConfig, Destination, Dispatcher,
    GrassCompiler, OutputStyle, Source, WatchController, WatchTarget, DEFAULT_PRECISION,
};
use tracing::level_filters::LevelFilter;

/// Compile Sass/SCSS files to CSS
#[derive(Parser, Debug)]
#[command(name = "gsass")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source files; read from stdin when omitted
    #[arg(value_name = "INPUT", conflicts_with = "watch")]
    inputs: Vec<PathBuf>,

    /// Write to specified file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output style: nested, expanded, compact or compressed
    #[arg(
        short = 't',
        long,
        value_parser = str::parse::<OutputStyle>,
        default_value_t = OutputStyle::Nested
    )]
    style: OutputStyle,

    /// Emit comments showing original line numbers
    #[arg(short, long)]
    line_numbers: bool,

    /// Emit source map
    #[arg(short = 'g', long)]
    source_map: bool,

    /// Set Sass import path (colon delimited list of paths)
    #[arg(short = 'I', long, value_name = "PATHS")]
    import_path: Option<String>,

    /// Watch a file or directory and recompile on change
    #[arg(short, long, value_name = "IN:OUT")]
    watch: Option<String>,

    /// Print progress to stderr (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Decimal places kept in numbers
    #[arg(short, long, default_value_t = DEFAULT_PRECISION)]
    precision: u32,

    /// Print the version of the compiler library
    #[arg(short = 'L', long)]
    libsass_version: bool,
}

impl Cli {
    fn config(&self) -> CompilerConfig {
        CompilerConfig {
            style: self.style,
            line_comments: self.line_numbers,
            source_map: self.source_map,
            import_paths: self
                .import_path
                .as_deref()
                .map(parse_import_paths)
                .unwrap_or_default(),
            precision: self.precision,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.libsass_version {
        println!("{}", GrassCompiler.version());
        return ExitCode::SUCCESS;
    }

    let config = cli.config();
    let compiler = GrassCompiler::new(&config);
    let dispatcher = Dispatcher::new(compiler, &config);
    match &cli.watch {
        Some(arg) => run_watch(arg, cli.output.as_deref(), dispatcher),
        None => run_once(&cli.inputs, cli.output.as_deref(), &dispatcher),
    }
}

fn run_watch(
    arg: &str,
    output: Option<&Path>,
    dispatcher: Dispatcher<'_, GrassCompiler>,
) -> ExitCode {
    let target = match WatchTarget::parse(arg, output) {
        Ok(target) => target,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let controller = WatchController::new(target, dispatcher);
    match watch(&controller) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_once(
    inputs: &[PathBuf],
    output: Option<&Path>,
    dispatcher: &Dispatcher<'_, GrassCompiler>,
) -> ExitCode {
    let result = read_source(inputs).and_then(|source| {
        dispatcher.dispatch(CompileRequest {
            source,
            destination: Destination::from(output),
        })
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn read_source(inputs: &[PathBuf]) -> Result<Source, gsass::Error> {
    match inputs {
        [] => Ok(Source::text(io::read_to_string(io::stdin())?)),
        [single] => Ok(Source::Path(single.clone())),
        several => {
            let mut contents = String::new();
            let mut load_paths: Vec<PathBuf> = Vec::new();
            for path in several {
                tracing::info!("Reading file: {}", path.display());
                contents.push_str(&gsass::read(path)?);
                contents.push('\n');
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !load_paths.iter().any(|p| p == parent) {
                        load_paths.push(parent.to_path_buf());
                    }
                }
            }
            Ok(Source::Text {
                contents,
                load_paths,
            })
        }
    }
}
