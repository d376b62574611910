//! Input expansion and output naming

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Command-line inputs with directories expanded
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inputs {
    /// Dat files, in argument order
    pub files: Vec<PathBuf>,
    /// Directory arguments
    pub dirs: Vec<PathBuf>,
}

/// Expand directory arguments into the `*.dat` files they contain
pub fn expand(args: &[PathBuf]) -> Result<Inputs> {
    let mut inputs = Inputs::default();

    for arg in args {
        if arg.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(arg)
                .with_context(|| format!("Failed to list directory: {}", arg.display()))?
            {
                let path = entry
                    .with_context(|| format!("Failed to list directory: {}", arg.display()))?
                    .path();
                if path.is_file() && path.extension().map_or(false, |ext| ext == "dat") {
                    found.push(path);
                }
            }
            found.sort();
            inputs.files.extend(found);
            inputs.dirs.push(arg.clone());
        } else {
            inputs.files.push(arg.clone());
        }
    }

    Ok(inputs)
}

/// Directory for the combined output file
///
/// An explicit choice wins; then a single directory argument; then the one
/// directory every file lives in; then `$HOME/Desktop`.
pub fn output_dir(explicit: Option<&Path>, inputs: &Inputs) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if inputs.dirs.len() == 1 {
        return inputs.dirs[0].clone();
    }

    if inputs.dirs.is_empty() {
        let parents: BTreeSet<&Path> = inputs
            .files
            .iter()
            .map(|f| f.parent().unwrap_or_else(|| Path::new("")))
            .collect();
        if parents.len() == 1 {
            if let Some(parent) = parents.into_iter().next() {
                return parent.to_path_buf();
            }
        }
    }

    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join("Desktop")
}

/// Per-file CSV path: the input path with a `.csv` extension
pub fn csv_path(input: &Path) -> PathBuf {
    input.with_extension("csv")
}

/// Sidecar element list path: the input path with a `.FIN2` extension
pub fn fin2_path(input: &Path) -> PathBuf {
    input.with_extension("FIN2")
}

/// First free `<stem>combinedNN.csv` in `dir`
pub fn combined_path(dir: &Path, first_input: &Path) -> PathBuf {
    let stem = first_input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut n = 0u32;
    loop {
        let path = dir.join(format!("{}combined{:02}.csv", stem, n));
        if !path.exists() {
            return path;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_expands_to_dat_files() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("b.dat"), b"").unwrap();
        fs::write(td.path().join("a.dat"), b"").unwrap();
        fs::write(td.path().join("a.FIN2"), b"").unwrap();
        fs::write(td.path().join("notes.txt"), b"").unwrap();

        let inputs = expand(&[td.path().to_path_buf()]).unwrap();

        assert_eq!(
            inputs.files,
            vec![td.path().join("a.dat"), td.path().join("b.dat")]
        );
        assert_eq!(inputs.dirs, vec![td.path().to_path_buf()]);
    }

    #[test]
    fn test_output_dir_from_shared_parent() {
        let inputs = Inputs {
            files: vec![PathBuf::from("/data/x/1.dat"), PathBuf::from("/data/x/2.dat")],
            dirs: Vec::new(),
        };
        assert_eq!(output_dir(None, &inputs), PathBuf::from("/data/x"));
        assert_eq!(
            output_dir(Some(Path::new("/out")), &inputs),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn test_output_dir_falls_back_to_desktop() {
        let inputs = Inputs {
            files: vec![PathBuf::from("/a/1.dat"), PathBuf::from("/b/2.dat")],
            dirs: Vec::new(),
        };
        assert!(output_dir(None, &inputs).ends_with("Desktop"));
    }

    #[test]
    fn test_combined_path_skips_taken_numbers() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("runcombined00.csv"), b"").unwrap();
        fs::write(td.path().join("runcombined01.csv"), b"").unwrap();

        let path = combined_path(td.path(), Path::new("/elsewhere/run.dat"));

        assert_eq!(path, td.path().join("runcombined02.csv"));
    }

    #[test]
    fn test_sibling_paths() {
        let input = Path::new("/data/sample.dat");
        assert_eq!(csv_path(input), PathBuf::from("/data/sample.csv"));
        assert_eq!(fin2_path(input), PathBuf::from("/data/sample.FIN2"));
    }
}
