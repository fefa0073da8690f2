//! Byte-exact comparison of an output file against its golden file.

use crate::error::{Artifact, Error, Result};
use std::path::Path;

/// Read both files and fail unless their bytes are identical.
///
/// A missing golden file is reported as [`Error::ReadFailure`]; that is the
/// normal signal for a test whose golden file has not been recorded yet.
pub fn compare_out_to_golden(out_path: &Path, golden_path: &Path) -> Result<()> {
    let out = read_artifact(Artifact::Output, out_path)?;
    let golden = read_artifact(Artifact::Golden, golden_path)?;
    if out != golden {
        let first_line = first_differing_line(&out, &golden);
        tracing::warn!(
            output = %out_path.display(),
            golden = %golden_path.display(),
            first_line,
            "output does not match golden file"
        );
        return Err(Error::Mismatch {
            output: out_path.to_path_buf(),
            golden: golden_path.to_path_buf(),
            first_line,
        });
    }
    Ok(())
}

fn read_artifact(which: Artifact, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::ReadFailure {
        which,
        path: path.to_path_buf(),
        source,
    })
}

/// 1-based line number of the first byte where `a` and `b` disagree.
fn first_differing_line(a: &[u8], b: &[u8]) -> usize {
    let common = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    1 + a[..common].iter().filter(|&&c| c == b'\n').count()
}
