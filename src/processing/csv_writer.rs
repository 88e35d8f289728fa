use glam::DVec3;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn mismatch(what: &str, expected: usize, got: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what}: expected {expected} entries, got {got}"),
    )
}

/// Write equally long columns under a header row.
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], columns: &[&[f64]]) -> io::Result<()> {
    if headers.len() != columns.len() {
        return Err(mismatch("header count", columns.len(), headers.len()));
    }
    let n_rows = columns.first().map_or(0, |c| c.len());
    if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
        return Err(mismatch("column length", n_rows, bad.len()));
    }

    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "{}", headers.join(","))?;
    let mut row = String::new();
    for i in 0..n_rows {
        row.clear();
        for (k, col) in columns.iter().enumerate() {
            if k > 0 {
                row.push(',');
            }
            row.push_str(&format!("{:.15e}", col[i]));
        }
        writeln!(file, "{row}")?;
    }
    file.flush()
}

/// Write a nodal field as `x,y,z,<name>` rows.
pub fn write_nodal_field<P: AsRef<Path>>(
    path: P,
    points: &[DVec3],
    name: &str,
    values: &[f64],
) -> io::Result<()> {
    if points.len() != values.len() {
        return Err(mismatch("nodal values", points.len(), values.len()));
    }
    let x: Vec<f64> = points.iter().map(|p| p.x).collect();
    let y: Vec<f64> = points.iter().map(|p| p.y).collect();
    let z: Vec<f64> = points.iter().map(|p| p.z).collect();
    write_csv(path, &["x", "y", "z", name], &[x.as_slice(), y.as_slice(), z.as_slice(), values])
}
