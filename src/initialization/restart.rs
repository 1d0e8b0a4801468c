use crate::constants::PS_TO_FS;
use crate::error::Result;
use crate::output::{is_complete_record, TrajectoryRecord};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK_SIZE: u64 = 8192;

/// Last complete record of a trajectory log and the byte offset where its line starts.
#[derive(Clone, Debug, PartialEq)]
pub struct ResumePoint {
    pub record: TrajectoryRecord,
    pub offset: u64,
}

/// Reads the trajectory log from its end until the last complete record is
/// found. Lines that were cut short are skipped. Returns `None` if the header
/// or the beginning of the file is reached first.
pub fn read_last_record(path: &Path) -> Result<Option<ResumePoint>> {
    let mut file: File = File::open(path)?;
    let mut position: u64 = file.metadata()?.len();
    // bytes [position, end of unscanned region)
    let mut tail: Vec<u8> = Vec::new();

    loop {
        let (line_start, line): (u64, Vec<u8>) = match tail.iter().rposition(|&b| b == b'\n') {
            Some(idx) => {
                let line: Vec<u8> = tail[idx + 1..].to_vec();
                tail.truncate(idx);
                (position + idx as u64 + 1, line)
            }
            None if position == 0 => (0, std::mem::take(&mut tail)),
            None => {
                let new_position: u64 = position.saturating_sub(CHUNK_SIZE);
                let mut chunk: Vec<u8> = vec![0; (position - new_position) as usize];
                file.seek(SeekFrom::Start(new_position))?;
                file.read_exact(&mut chunk)?;
                chunk.extend_from_slice(&tail);
                tail = chunk;
                position = new_position;
                continue;
            }
        };

        let text = String::from_utf8_lossy(&line);
        let text: &str = text.trim();
        if text.starts_with("Count") {
            debug!("reached the header of {:?} without a complete record", path);
            return Ok(None);
        }
        if is_complete_record(text) {
            match TrajectoryRecord::from_line(text, 0) {
                Ok(record) => {
                    return Ok(Some(ResumePoint {
                        record,
                        offset: line_start,
                    }))
                }
                Err(err) => warn!("skip unreadable line at byte {}: {}", line_start, err),
            }
        } else if !text.is_empty() {
            warn!("skip incomplete line at byte {} of {:?}", line_start, path);
        }
        if line_start == 0 {
            return Ok(None);
        }
    }
}

/// True if the hop described by `record` already reached one of the limits.
pub fn did_finish(record: &TrajectoryRecord, time_limit: Option<f64>, step_limit: Option<u64>) -> bool {
    let time_after_hop: f64 = record.time + record.time_step / PS_TO_FS;
    let reached_time: bool = time_limit.map_or(false, |limit| time_after_hop >= limit);
    let reached_steps: bool = step_limit.map_or(false, |limit| record.step + 1 >= limit);
    reached_time || reached_steps
}

/// Cuts the log at `offset`, which removes the record starting there and everything after it.
pub fn truncate_log(path: &Path, offset: u64) -> Result<()> {
    let file: File = OpenOptions::new().write(true).open(path)?;
    file.set_len(offset)?;
    file.sync_all()?;
    Ok(())
}

/// Cuts the rate constant log after the last complete line whose step is
/// below `step`. The scan stops at the first line that is cut short, does not
/// start with a step number or belongs to a later step.
pub fn truncate_rate_log(path: &Path, step: u64) -> Result<()> {
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    let mut keep: u64 = 0;
    let mut n_lines: u64 = 0;
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        let n_bytes: usize = reader.read_until(b'\n', &mut line)?;
        if n_bytes == 0 || line.last() != Some(&b'\n') {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let line_step: Option<u64> = text
            .split(':')
            .next()
            .and_then(|token| token.trim().parse().ok());
        match line_step {
            Some(line_step) if line_step < step => {
                keep += n_bytes as u64;
                n_lines += 1;
            }
            _ => break,
        }
    }
    debug!("keep {} lines of {:?} before step {}", n_lines, path, step);
    truncate_log(path, keep)
}
