pub mod discover;
pub mod error;
pub mod merge;
pub mod outline;
pub mod utils;

use discover::{find_pdf_files, normalize_output_path, validate_input_dir};
use error::CombineError;
use log::{info, warn};
use merge::PdfMerger;
use std::path::{Path, PathBuf};

const BANNER_WIDTH: usize = 50;

/// What a single run of the combiner works on.
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    pub input_folder: PathBuf,
    /// Output path as given by the user; `.pdf` is appended when missing.
    pub output_file: String,
    /// Only adds a status line, the run itself is unchanged.
    pub verbose: bool,
    /// Add an outline entry per combined file.
    pub with_outlines: bool,
}

/// Outcome of a successful combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSummary {
    pub output_path: PathBuf,
    pub merged_files: Vec<PathBuf>,
    pub num_pages: usize,
}

/// Validates the input, combines the PDFs and reports the outcome on the console.
///
/// Input errors are reported without the banner; every other failure ends with the
/// failure banner. The returned error is what the binary turns into its exit code.
pub fn run(options: &CombineOptions) -> Result<CombineSummary, CombineError> {
    let output_file = PathBuf::from(normalize_output_path(&options.output_file));

    let outcome = validate_input_dir(&options.input_folder).and_then(|()| {
        print_banner(options, &output_file);
        combine_pdfs(&options.input_folder, &output_file, options)
    });

    match outcome {
        Ok(summary) => {
            println!("\n✅ PDF combination completed successfully!");
            Ok(summary)
        }
        Err(err) if err.is_input_error() => {
            eprintln!("Error: {err}");
            Err(err)
        }
        Err(err) => {
            match &err {
                CombineError::MergeFailed(_) => eprintln!("{err}"),
                _ => println!("{err}"),
            }
            println!("\n❌ PDF combination failed!");
            Err(err)
        }
    }
}

fn print_banner(options: &CombineOptions, output_file: &Path) {
    println!("PDF Combiner");
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("Input folder: {}", options.input_folder.display());
    println!("Output file: {}", output_file.display());
    if options.verbose {
        println!("Verbose mode: enabled");
    }
    println!("{}", "=".repeat(BANNER_WIDTH));
}

/// Combines every `*.pdf` directly inside `input_folder`, in byte-wise path order,
/// into `output_path`.
///
/// Any failure while loading, appending or writing aborts the whole combination and
/// surfaces as [`CombineError::MergeFailed`]; nothing is skipped.
pub fn combine_pdfs(
    input_folder: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &CombineOptions,
) -> Result<CombineSummary, CombineError> {
    let input_folder = input_folder.as_ref();
    let output_path = output_path.as_ref();

    let pdf_files = find_pdf_files(input_folder)?;

    println!("Found {} PDF files:", pdf_files.len());
    for pdf_file in &pdf_files {
        println!("  - {}", display_name(pdf_file));
    }

    if pdf_files.iter().any(|pdf_file| same_file(pdf_file, output_path)) {
        warn!(
            "The output file '{}' is also among the inputs, it will be overwritten",
            output_path.display()
        );
    }

    let num_pages = merge_files(&pdf_files, output_path, options)
        .map_err(|err| CombineError::MergeFailed(format!("{err:#}")))?;

    println!(
        "Successfully combined {} PDF files into '{}'",
        pdf_files.len(),
        output_path.display()
    );

    Ok(CombineSummary {
        output_path: output_path.to_path_buf(),
        merged_files: pdf_files,
        num_pages,
    })
}

fn merge_files(
    pdf_files: &[PathBuf],
    output_path: &Path,
    options: &CombineOptions,
) -> anyhow::Result<usize> {
    info!("Start the merging process");
    let mut merger = PdfMerger::new()?.with_outlines(options.with_outlines);

    for pdf_file in pdf_files {
        println!("Adding: {}", display_name(pdf_file));
        merger.append(pdf_file)?;
    }

    println!("Combining PDFs into: {}", output_path.display());
    let num_pages = merger.page_count();
    merger.write(output_path)?;

    Ok(num_pages)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn options_for(input_folder: &Path, output_file: &str) -> CombineOptions {
        CombineOptions {
            input_folder: input_folder.to_path_buf(),
            output_file: output_file.to_string(),
            ..Default::default()
        }
    }

    fn merged_titles(output_path: &Path, expected_pages: usize) -> Result<Vec<String>> {
        let merged = utils::validate_pdf(output_path, expected_pages)?;
        utils::page_titles(&merged)
    }

    #[test]
    fn run_merges_in_alphabetical_order() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        for (name, pages) in [("c.pdf", 1), ("a.pdf", 2), ("b.pdf", 3)] {
            utils::write_basic_pdf(input.path().join(name), name, pages)?;
        }
        let output_file = output.path().join("combined.pdf");

        let summary = run(&options_for(input.path(), &output_file.to_string_lossy()))?;

        assert_eq!(summary.num_pages, 6);
        assert_eq!(summary.output_path, output_file);
        assert_eq!(
            merged_titles(&output_file, 6)?,
            ["a.pdf", "a.pdf", "b.pdf", "b.pdf", "b.pdf", "c.pdf"]
        );

        Ok(())
    }

    #[test]
    fn numeric_names_merged_lexicographically() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("2.pdf"), "2.pdf", 1)?;
        utils::write_basic_pdf(input.path().join("10.pdf"), "10.pdf", 1)?;
        let output_file = output.path().join("numbers.pdf");

        let summary = run(&options_for(input.path(), &output_file.to_string_lossy()))?;

        assert_eq!(
            summary.merged_files,
            [input.path().join("10.pdf"), input.path().join("2.pdf")]
        );
        assert_eq!(merged_titles(&output_file, 2)?, ["10.pdf", "2.pdf"]);

        Ok(())
    }

    #[test]
    fn run_appends_missing_suffix() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("only.pdf"), "only.pdf", 2)?;
        let output_stem = output.path().join("result");

        let summary = run(&options_for(input.path(), &output_stem.to_string_lossy()))?;

        let expected = output.path().join("result.pdf");
        assert_eq!(summary.output_path, expected);
        assert!(expected.is_file());
        assert!(!output_stem.exists());

        Ok(())
    }

    #[test]
    fn run_keeps_uppercase_suffix() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("only.pdf"), "only.pdf", 1)?;
        let output_file = output.path().join("Result.PDF");

        run(&options_for(input.path(), &output_file.to_string_lossy()))?;

        assert!(output_file.is_file());
        assert!(!output.path().join("Result.PDF.pdf").exists());

        Ok(())
    }

    #[test]
    fn empty_dir_creates_no_output() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        let output_file = output.path().join("nothing.pdf");

        let err = run(&options_for(input.path(), &output_file.to_string_lossy())).unwrap_err();

        assert!(matches!(err, CombineError::NoPdfFiles(_)));
        assert!(!output_file.exists());

        Ok(())
    }

    #[test]
    fn missing_input_dir_writes_nothing() -> Result<()> {
        let output = TempDir::new()?;
        let missing = output.path().join("missing");
        let output_file = output.path().join("out.pdf");

        let err = run(&options_for(&missing, &output_file.to_string_lossy())).unwrap_err();

        assert!(matches!(err, CombineError::InputNotFound(_)));
        assert!(!output_file.exists());
        assert_eq!(std::fs::read_dir(output.path())?.count(), 0);

        Ok(())
    }

    #[test]
    fn corrupt_pdf_aborts_whole_merge() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("a.pdf"), "a.pdf", 2)?;
        std::fs::write(input.path().join("b.pdf"), b"garbage, not a pdf")?;
        utils::write_basic_pdf(input.path().join("c.pdf"), "c.pdf", 2)?;
        let output_file = output.path().join("out.pdf");

        let err = run(&options_for(input.path(), &output_file.to_string_lossy())).unwrap_err();

        match err {
            CombineError::MergeFailed(cause) => assert!(cause.contains("b.pdf")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output_file.exists());

        Ok(())
    }

    #[test]
    fn verbose_and_bookmarks_do_not_change_result() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("x.pdf"), "x.pdf", 2)?;
        utils::write_basic_pdf(input.path().join("y.pdf"), "y.pdf", 1)?;
        let output_file = output.path().join("flags.pdf");

        let options = CombineOptions {
            verbose: true,
            with_outlines: true,
            ..options_for(input.path(), &output_file.to_string_lossy())
        };
        let summary = run(&options)?;

        assert_eq!(summary.num_pages, 3);
        assert_eq!(merged_titles(&output_file, 3)?, ["x.pdf", "x.pdf", "y.pdf"]);

        Ok(())
    }

    #[test]
    fn directory_named_like_pdf_fails_merge() -> Result<()> {
        let input = TempDir::new()?;
        let output = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("a.pdf"), "a.pdf", 1)?;
        std::fs::create_dir(input.path().join("sub.pdf"))?;
        let output_file = output.path().join("out.pdf");

        let err = run(&options_for(input.path(), &output_file.to_string_lossy())).unwrap_err();

        match err {
            CombineError::MergeFailed(cause) => assert!(cause.contains("sub.pdf")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output_file.exists());

        Ok(())
    }

    #[test]
    fn output_inside_input_dir_is_reused_on_rerun() -> Result<()> {
        let input = TempDir::new()?;
        utils::write_basic_pdf(input.path().join("a.pdf"), "a.pdf", 1)?;
        let output_file = input.path().join("z.pdf");
        let options = options_for(input.path(), &output_file.to_string_lossy());

        run(&options)?;
        let summary = run(&options)?;

        assert_eq!(summary.merged_files.len(), 2);
        assert_eq!(merged_titles(&output_file, 2)?, ["a.pdf", "a.pdf"]);

        Ok(())
    }
}
