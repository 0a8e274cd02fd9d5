use crate::error::CombineError;
use log::trace;
use std::path::{Path, PathBuf};

pub const PDF_SUFFIX: &str = ".pdf";

/// Appends `.pdf` to `output_file` unless it already ends with it, ignoring case.
/// The rest of the name is left untouched.
pub fn normalize_output_path(output_file: &str) -> String {
    if output_file.to_lowercase().ends_with(PDF_SUFFIX) {
        output_file.to_string()
    } else {
        format!("{output_file}{PDF_SUFFIX}")
    }
}

pub fn validate_input_dir(input_folder: impl AsRef<Path>) -> Result<(), CombineError> {
    let input_folder = input_folder.as_ref();

    if !input_folder.exists() {
        return Err(CombineError::InputNotFound(input_folder.to_path_buf()));
    }

    if !input_folder.is_dir() {
        return Err(CombineError::NotADirectory(input_folder.to_path_buf()));
    }

    Ok(())
}

/// Lists the entries directly inside `input_folder` matching `*.pdf`, sorted byte-wise
/// on the full path. Subdirectories are not traversed.
///
/// The match is case-sensitive and, like a shell glob, never picks up hidden names.
/// Matching entries are kept whatever their type: a directory named `*.pdf` is
/// listed too and fails later, when it is loaded. An empty result is reported as [`CombineError::NoPdfFiles`].
pub fn find_pdf_files(input_folder: impl AsRef<Path>) -> Result<Vec<PathBuf>, CombineError> {
    let input_folder = input_folder.as_ref();
    let read_dir_err = |source: std::io::Error| CombineError::ReadDir {
        path: input_folder.to_path_buf(),
        source,
    };

    let mut pdf_files = Vec::new();
    for entry in std::fs::read_dir(input_folder).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();

        if !matches_pdf_glob(&path) {
            trace!("Skipping '{}': it does not match *{PDF_SUFFIX}", path.display());
            continue;
        }

        pdf_files.push(path);
    }

    if pdf_files.is_empty() {
        return Err(CombineError::NoPdfFiles(input_folder.to_path_buf()));
    }

    pdf_files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    Ok(pdf_files)
}

fn matches_pdf_glob(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.as_encoded_bytes();
            !name.starts_with(b".") && name.ends_with(PDF_SUFFIX.as_bytes())
        })
        .unwrap_or(false)
}
