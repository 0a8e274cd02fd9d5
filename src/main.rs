use clap::Parser;
use pdf_combiner::{CombineOptions, run};
use std::path::PathBuf;
use std::process::ExitCode;

/// Combine all the PDF files found directly inside a folder into a single PDF file.
/// The files are combined in alphabetical order of their names (plain string order,
/// so `10.pdf` comes before `2.pdf`). Subfolders are ignored and the input folder is
/// never modified.
#[derive(Parser, Debug)]
#[command(name = "PDF Combiner", version = "v1.0", about, long_about = None)]
struct Cli {
    /// Path to the folder containing the PDF files to combine
    input_folder: PathBuf,
    /// Path of the combined PDF file (`.pdf` is appended if missing)
    output_file: String,
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Add an outline entry for every combined file, holding the outline the file already had
    #[arg(short, long)]
    bookmarks: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let options = CombineOptions {
        input_folder: cli.input_folder,
        output_file: cli.output_file,
        verbose: cli.verbose,
        with_outlines: cli.bookmarks,
    };

    match run(&options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
