use crate::error::{EkmcError, Result};
use crate::initialization::{add_cells, CellPoint, MoleculeName, Site};
use crate::neighbours::Neighbour;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const TRAJECTORY_HEADER: &str = "Count Molecule Cell_Point Time(ps) Time_Step(fs) \
Hop_Distance(A) Energy(eV) R_sum(ps^-1) D_xx D_yy D_zz D_xy D_xz D_yz (cm^2/s)";

/// One line of the trajectory log: the site occupied from `time` on for
/// `time_step`, and the hop that leaves it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrajectoryRecord {
    pub step: u64,
    pub molecule: MoleculeName,
    pub cell: CellPoint,
    /// ps
    pub time: f64,
    /// fs
    pub time_step: f64,
    /// Angstrom
    pub hop_distance: f64,
    /// eV
    pub energy: f64,
    /// 1/ps
    pub total_rate: f64,
    /// xx, yy, zz, xy, xz, yz in cm^2/s
    pub diffusion: [f64; 6],
}

impl TrajectoryRecord {
    pub fn site(&self) -> Site {
        Site::new(self.molecule, self.cell)
    }

    /// Time in ps at which the walker leaves the site of this record.
    pub fn end_time(&self) -> f64 {
        self.time + self.time_step / crate::constants::PS_TO_FS
    }

    pub fn to_line(&self) -> String {
        let cell: String = format!("({},{},{})", self.cell[0], self.cell[1], self.cell[2]);
        let energy: String = if self.energy > 0.0 {
            format!("+{:.6}", self.energy)
        } else {
            format!("{:.6}", self.energy)
        };
        let mut line: String = format!(
            "{:>10} {:>8} {:>16} {:>20.8} {:>16.6} {:>10.4} {:>12} {:>14.6e} |",
            self.step, self.molecule, cell, self.time, self.time_step, self.hop_distance, energy,
            self.total_rate
        );
        for component in self.diffusion.iter() {
            line.push_str(&format!(" {:>13.6e}", component));
        }
        line.push_str(" |");
        line
    }

    /// Parses a complete record; `line_number` is only used for error messages.
    pub fn from_line(line: &str, line_number: usize) -> Result<Self> {
        let malformed = |reason: &str| EkmcError::MalformedRecord {
            line: line_number,
            reason: String::from(reason),
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 17 || tokens[8] != "|" || tokens[16] != "|" {
            return Err(malformed("expected 15 columns framed by '|'"));
        }
        let float = |idx: usize| -> Result<f64> {
            tokens[idx]
                .parse::<f64>()
                .map_err(|_| malformed(&format!("column {} is not a number", idx + 1)))
        };
        let cell_token: &str = tokens[2]
            .strip_prefix('(')
            .and_then(|token| token.strip_suffix(')'))
            .ok_or_else(|| malformed("cell point is not of the form (i,j,k)"))?;
        let cell_indices: Vec<i32> = cell_token
            .split(',')
            .map(|index| index.trim().parse::<i32>())
            .collect::<std::result::Result<Vec<i32>, _>>()
            .map_err(|_| malformed("cell point is not of the form (i,j,k)"))?;
        if cell_indices.len() != 3 {
            return Err(malformed("cell point is not of the form (i,j,k)"));
        }
        let mut diffusion: [f64; 6] = [0.0; 6];
        for (idx, component) in diffusion.iter_mut().enumerate() {
            *component = float(9 + idx)?;
        }
        Ok(TrajectoryRecord {
            step: tokens[0]
                .parse()
                .map_err(|_| malformed("step count is not an integer"))?,
            molecule: tokens[1]
                .parse()
                .map_err(|_| malformed("molecule name is not an integer"))?,
            cell: [cell_indices[0], cell_indices[1], cell_indices[2]],
            time: float(3)?,
            time_step: float(4)?,
            hop_distance: float(5)?,
            energy: float(6)?,
            total_rate: float(7)?,
            diffusion,
        })
    }
}

/// Records end with this sentinel, a line without it was cut short.
pub fn is_complete_record(line: &str) -> bool {
    let line: &str = line.trim_end();
    line.ends_with('|') && !line.starts_with("Count")
}

/// Append-only writer of the trajectory log, flushed after every record.
pub struct TrajectoryWriter<W: Write> {
    stream: W,
}

impl<W: Write> TrajectoryWriter<W> {
    pub fn new(stream: W, write_header: bool) -> Result<Self> {
        let mut writer: TrajectoryWriter<W> = TrajectoryWriter { stream };
        if write_header {
            writeln!(writer.stream, "{}", TRAJECTORY_HEADER)?;
            writer.stream.flush()?;
        }
        Ok(writer)
    }

    pub fn write_record(&mut self, record: &TrajectoryRecord) -> Result<()> {
        writeln!(self.stream, "{}", record.to_line())?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl TrajectoryWriter<BufWriter<File>> {
    /// Starts a new log with a header, replacing an existing file.
    pub fn create(path: &Path) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), true)
    }

    /// Continues an existing log.
    pub fn append(path: &Path) -> Result<Self> {
        let file: File = OpenOptions::new().append(true).open(path)?;
        Self::new(BufWriter::new(file), false)
    }
}

/// Writer of the per-step rate constants, only used for analysis.
pub struct RateConstantWriter<W: Write> {
    stream: W,
    /// write only steps below this count
    step_limit: Option<u64>,
}

impl<W: Write> RateConstantWriter<W> {
    pub fn new(stream: W, step_limit: Option<u64>) -> Self {
        RateConstantWriter { stream, step_limit }
    }

    pub fn wants_step(&self, step: u64) -> bool {
        self.step_limit.map_or(true, |limit| step < limit)
    }

    /// `step: donor (i, j, k) [R] --> acceptor (i, j, k): k / ...`, rates are
    /// passed in 1/s and written in 1/ps.
    pub fn write_step(
        &mut self,
        step: u64,
        donor: &Site,
        total_rate: f64,
        neighbours: &[Neighbour],
        rates: &[f64],
    ) -> Result<()> {
        if !self.wants_step(step) {
            return Ok(());
        }
        let format_cell =
            |cell: &CellPoint| -> String { format!("({}, {}, {})", cell[0], cell[1], cell[2]) };
        let mut line: String = format!(
            "{}: {} {} [{:.6e}] -->",
            step,
            donor.molecule,
            format_cell(&donor.cell),
            total_rate * crate::constants::PER_S_TO_PER_PS
        );
        let hops: Vec<String> = neighbours
            .iter()
            .zip(rates.iter())
            .map(|(neighbour, rate)| {
                let cell: CellPoint = add_cells(&donor.cell, &neighbour.cell_offset);
                format!(
                    " {} {}: {:.6e}",
                    neighbour.molecule,
                    format_cell(&cell),
                    rate * crate::constants::PER_S_TO_PER_PS
                )
            })
            .collect();
        line.push_str(&hops.join(" /"));
        writeln!(self.stream, "{}", line)?;
        self.stream.flush()?;
        Ok(())
    }
}

impl RateConstantWriter<BufWriter<File>> {
    /// Starts a new rate constant log, an existing file is emptied.
    pub fn create(path: &Path, step_limit: Option<u64>) -> Result<Self> {
        let file: File = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), step_limit))
    }

    /// Continues a log that was already cut back to the resumed step.
    pub fn append(path: &Path, step_limit: Option<u64>) -> Result<Self> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file), step_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record() -> TrajectoryRecord {
        TrajectoryRecord {
            step: 12,
            molecule: 3,
            cell: [-1, 0, 2],
            time: 1.25,
            time_step: 310.5,
            hop_distance: 10.0,
            energy: 0.0125,
            total_rate: 0.0325,
            diffusion: [1.0e-3, 0.0, 2.5e-4, 0.0, -1.5e-4, 0.0],
        }
    }

    #[test]
    fn record_line_layout() {
        let line: String = record().to_line();
        assert!(line.contains("(-1,0,2)"));
        assert!(line.contains("+0.012500"));
        assert!(is_complete_record(&line));
        assert!(!is_complete_record(TRAJECTORY_HEADER));
        assert!(!is_complete_record(&line[..line.len() - 3]));
    }

    #[test]
    fn record_line_is_parsed_back() {
        let parsed: TrajectoryRecord = TrajectoryRecord::from_line(&record().to_line(), 1).unwrap();
        assert_eq!(parsed.step, 12);
        assert_eq!(parsed.site(), Site::new(3, [-1, 0, 2]));
        assert_relative_eq!(parsed.time, 1.25);
        assert_relative_eq!(parsed.end_time(), 1.5605, epsilon = 1e-9);
        assert_relative_eq!(parsed.diffusion[4], -1.5e-4, max_relative = 1e-6);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(TrajectoryRecord::from_line("1 2 (0,0,0) 0.0 |", 4).is_err());
        let line: String = record().to_line().replace("(-1,0,2)", "(-1,0)");
        assert!(matches!(
            TrajectoryRecord::from_line(&line, 4),
            Err(EkmcError::MalformedRecord { line: 4, .. })
        ));
    }

    #[test]
    fn writer_starts_with_header() {
        let mut writer: TrajectoryWriter<Vec<u8>> = TrajectoryWriter::new(Vec::new(), true).unwrap();
        writer.write_record(&record()).unwrap();
        let text: String = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TRAJECTORY_HEADER);
    }

    #[test]
    fn rate_constant_writer_honours_step_limit() {
        let writer: RateConstantWriter<Vec<u8>> = RateConstantWriter::new(Vec::new(), Some(500));
        assert!(writer.wants_step(499));
        assert!(!writer.wants_step(500));
    }
}
