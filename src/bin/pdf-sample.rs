use anyhow::{Result, anyhow};
use clap::Parser;
use pdf_combiner::utils::get_basic_pdf_doc;
use std::path::Path;

/// Generate a sample PDF document with random content, handy to fill a folder to combine.
/// Every page is titled with the name of the document, followed by its page number.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output path
    #[arg(short = 'o')]
    output_path: String,
    /// Number of pages of the document
    #[arg(short = 'n', default_value_t = 1)]
    num_pages: u8,
    /// Overwrite the output path if a file is already there
    #[arg(short, long)]
    force: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(err) = generate_sample_pdf(cli.output_path, cli.num_pages, cli.force) {
        eprintln!("Error encountered: {}", err);
        std::process::exit(1);
    }
}

fn generate_sample_pdf(output_path: impl AsRef<Path>, num_pages: u8, force: bool) -> Result<()> {
    let output_path = output_path.as_ref();

    if !force && std::fs::exists(output_path)? {
        return Err(anyhow!(
            "A file at location '{}' exists already",
            output_path.display()
        ));
    }

    let doc_name = output_path
        .file_name()
        .ok_or(anyhow!(
            "The output path provided does not present a filename"
        ))?
        .to_string_lossy()
        .to_string();
    let mut sample_doc = get_basic_pdf_doc(&doc_name, num_pages)?;

    sample_doc.save(output_path)?;
    log::info!("Sample document with {num_pages} pages saved as '{}'", output_path.display());

    Ok(())
}
