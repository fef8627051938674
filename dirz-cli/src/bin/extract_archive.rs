use clap::Parser;
use std::path::PathBuf;

use dirz_cli::{extract::run_extract, logger};
use dirz_core::RestoreOptions;

#[derive(Parser)]
#[command(name="extract-archive", version, about="Extract a dirz archive")]
struct Cli {
    /// Archive produced by `dirz compress`
    archive: PathBuf,
    /// Output directory (default: ./extracted)
    output: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    if let Err(e) = logger::init(&cli.log_level) {
        eprintln!("logging disabled: {e:#}");
    }
    if let Err(e) = run_extract(&cli.archive, cli.output, &RestoreOptions::default()) {
        eprintln!("error extracting archive: {e:#}");
        std::process::exit(1);
    }
}
