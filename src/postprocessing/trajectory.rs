use crate::defaults::TRAJECTORY_FILE_NAME;
use crate::error::{EkmcError, Result};
use crate::output::{is_complete_record, TrajectoryRecord};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// All records of one trajectory log, in order of time.
#[derive(Clone, Debug)]
pub struct Trajectory {
    pub path: PathBuf,
    pub records: Vec<TrajectoryRecord>,
}

impl Trajectory {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text: String = fs::read_to_string(path)?;
        let mut records: Vec<TrajectoryRecord> = Vec::new();
        let mut lines = text.lines().enumerate().peekable();
        while let Some((idx, line)) = lines.next() {
            let line: &str = line.trim();
            if line.is_empty() || line.starts_with("Count") {
                continue;
            }
            if !is_complete_record(line) {
                if lines.peek().is_none() {
                    warn!("ignore the incomplete last line of {:?}", path);
                    continue;
                }
                return Err(EkmcError::MalformedRecord {
                    line: idx + 1,
                    reason: format!("incomplete record in the middle of {:?}", path),
                });
            }
            let record: TrajectoryRecord = TrajectoryRecord::from_line(line, idx + 1)?;
            if let Some(previous) = records.last() {
                if record.time < previous.time {
                    return Err(EkmcError::MalformedRecord {
                        line: idx + 1,
                        reason: String::from("time decreases"),
                    });
                }
            }
            records.push(record);
        }
        debug!("{:?}: {} records", path, records.len());
        Ok(Trajectory {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Time in ps up to which the site of the walker is known.
    pub fn end_time(&self) -> f64 {
        self.records.last().map_or(0.0, |record| record.end_time())
    }

    /// Record of the site occupied at `time`: the last record that starts at or before it.
    pub fn record_at(&self, time: f64) -> Option<&TrajectoryRecord> {
        let idx: usize = self.records.partition_point(|record| record.time <= time);
        if idx == 0 {
            None
        } else {
            self.records.get(idx - 1)
        }
    }
}

/// Paths of all trajectory logs below `root`, sorted.
pub fn find_trajectory_files(root: &Path) -> Result<Vec<PathBuf>> {
    find_files(root, TRAJECTORY_FILE_NAME)
}

/// Paths of all files called `file_name` below `root`, sorted.
pub fn find_files(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();
    let mut folders: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(folder) = folders.pop() {
        for entry in fs::read_dir(&folder)? {
            let path: PathBuf = entry?.path();
            if path.is_dir() {
                folders.push(path);
            } else if path.file_name().map_or(false, |name| name == file_name) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::TRAJECTORY_HEADER;
    use tempfile::tempdir;

    fn record(step: u64, time: f64, time_step: f64) -> TrajectoryRecord {
        TrajectoryRecord {
            step,
            molecule: 0,
            cell: [step as i32, 0, 0],
            time,
            time_step,
            hop_distance: 10.0,
            energy: 2.0,
            total_rate: 0.03,
            diffusion: [0.0; 6],
        }
    }

    fn write_log(path: &Path, records: &[TrajectoryRecord], tail: &str) {
        let mut text: String = format!("{}\n", TRAJECTORY_HEADER);
        for record in records.iter() {
            text.push_str(&record.to_line());
            text.push('\n');
        }
        text.push_str(tail);
        fs::write(path, text).unwrap();
    }

    #[test]
    fn piecewise_constant_lookup() {
        let dir = tempdir().unwrap();
        let path: PathBuf = dir.path().join(TRAJECTORY_FILE_NAME);
        write_log(
            &path,
            &[record(0, 0.0, 500.0), record(1, 0.5, 1500.0), record(2, 2.0, 100.0)],
            "         3        0",
        );
        let trajectory: Trajectory = Trajectory::from_file(&path).unwrap();
        assert_eq!(trajectory.records.len(), 3);
        assert_eq!(trajectory.record_at(0.0).unwrap().step, 0);
        assert_eq!(trajectory.record_at(0.49).unwrap().step, 0);
        assert_eq!(trajectory.record_at(0.5).unwrap().step, 1);
        assert_eq!(trajectory.record_at(5.0).unwrap().step, 2);
        assert!(trajectory.record_at(-1.0).is_none());
        assert!((trajectory.end_time() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn logs_are_found_recursively_in_sorted_order() {
        let dir = tempdir().unwrap();
        for name in ["Simulation_1", "Simulation_0", "Simulation_10"].iter() {
            let folder: PathBuf = dir.path().join(name);
            fs::create_dir(&folder).unwrap();
            write_log(&folder.join(TRAJECTORY_FILE_NAME), &[record(0, 0.0, 1.0)], "");
        }
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let found: Vec<PathBuf> = find_trajectory_files(dir.path()).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found[0].ends_with("Simulation_0/kMC_sim.txt"));
        assert!(found[1].ends_with("Simulation_1/kMC_sim.txt"));
        assert!(found[2].ends_with("Simulation_10/kMC_sim.txt"));
    }
}
