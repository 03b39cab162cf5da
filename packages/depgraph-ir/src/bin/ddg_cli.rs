/*
 * DDG CLI
 *
 * Command-line front end over the analysis driver.
 *
 * Usage:
 *   ddg-cli --type ddg --filePath src/Example.java
 *
 * Prints the def/use JSON document of the unit's methods to stdout.
 */

use std::path::PathBuf;
use std::process::ExitCode;

use depgraph_ir::pipeline::driver::{read_source, AnalysisDriver};
use tracing_subscriber::EnvFilter;

/// CLI arguments
struct Args {
    /// Analysis type; only "ddg" is supported
    analysis_type: String,

    /// The source file (compilation unit) to analyze
    file_path: PathBuf,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();

        let mut analysis_type: Option<String> = None;
        let mut file_path: Option<PathBuf> = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--type" | "-t" => {
                    i += 1;
                    let value = args.get(i).ok_or("--type needs a value")?;
                    analysis_type = Some(value.clone());
                }
                "--filePath" | "-f" => {
                    i += 1;
                    let value = args.get(i).ok_or("--filePath needs a value")?;
                    file_path = Some(PathBuf::from(value));
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                unknown => {
                    return Err(format!("unknown option: {unknown}"));
                }
            }
            i += 1;
        }

        Ok(Self {
            analysis_type: analysis_type.ok_or("--type is required")?,
            file_path: file_path.ok_or("--filePath is required")?,
        })
    }
}

fn print_help() {
    println!(
        r#"ddg-cli - data dependency graphs for Java compilation units

USAGE:
    ddg-cli --type ddg --filePath <PATH>

OPTIONS:
    -t, --type <TYPE>        The analysis type, currently only "ddg"
    -f, --filePath <PATH>    The source file (compilation unit) to analyze
    --help                   Print this help

OUTPUT:
    A pretty-printed JSON document on stdout, one entry per method keyed
    by "<methodName>#<startLine>"."#
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            print_help();
            return ExitCode::FAILURE;
        }
    };

    if args.analysis_type != "ddg" {
        eprintln!("Error: unsupported analysis type: {}", args.analysis_type);
        print_help();
        return ExitCode::FAILURE;
    }

    let source = match read_source(&args.file_path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error reading {}: {error}", args.file_path.display());
            return ExitCode::FAILURE;
        }
    };

    let driver = AnalysisDriver::new();
    let result = match driver.get_ddg(&source) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("Analysis error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let document = result.to_def_use_json();
    match serde_json::to_string_pretty(&document) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Serialization error: {error}");
            ExitCode::FAILURE
        }
    }
}
