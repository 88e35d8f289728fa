use crate::processing::csv_writer::write_nodal_field;
use glam::DVec3;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

/// Temperature field at one time level, in kelvin.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: String,
    pub level: usize,
    /// Normalised time of the level.
    pub time: f64,
    pub temperature: Vec<f64>,
}

impl Snapshot {
    /// `prefix` followed by the level zero-padded to ten digits.
    pub fn label(prefix: &str, level: usize) -> String {
        format!("{prefix}{level:010}")
    }
}

#[derive(Debug, Clone)]
pub enum OutputMessage {
    Snapshot(Snapshot),
    /// Sent exactly once, after the last snapshot of a run.
    EndOfStream,
}

/// Drain `rx` on a background thread, writing `<dir>/<label>.csv` for every
/// snapshot. Returns the number of files written once the stream ends.
pub fn spawn_csv_consumer(
    rx: Receiver<OutputMessage>,
    points: Vec<DVec3>,
    dir: PathBuf,
) -> JoinHandle<io::Result<usize>> {
    thread::spawn(move || {
        std::fs::create_dir_all(&dir)?;
        let mut written = 0;
        // a dropped sender without EndOfStream also ends the stream
        while let Ok(message) = rx.recv() {
            match message {
                OutputMessage::Snapshot(s) => {
                    let path = dir.join(format!("{}.csv", s.label));
                    write_nodal_field(&path, &points, "T", &s.temperature)?;
                    written += 1;
                }
                OutputMessage::EndOfStream => break,
            }
        }
        Ok(written)
    })
}
