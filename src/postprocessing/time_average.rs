use crate::error::{EkmcError, Result};
use crate::postprocessing::{DiffusionPoint, TensorComponents};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Mean, population standard deviation and half-width of the two-sided
/// Student-t confidence interval of a series.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct TimeAverage {
    pub mean: f64,
    pub standard_deviation: f64,
    /// undefined for a single value
    pub confidence_interval: Option<f64>,
}

pub fn time_average(values: &[f64], confidence_level: f64) -> Result<TimeAverage> {
    if values.is_empty() {
        return Err(EkmcError::Statistics(String::from(
            "cannot average over an empty time window",
        )));
    }
    let n: f64 = values.len() as f64;
    let mean: f64 = values.iter().sum::<f64>() / n;
    let sum_of_squares: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    let standard_deviation: f64 = (sum_of_squares / n).sqrt();
    let confidence_interval: Option<f64> = if values.len() > 1 {
        let degrees_of_freedom: f64 = n - 1.0;
        let students_t: StudentsT = StudentsT::new(0.0, 1.0, degrees_of_freedom)
            .map_err(|err| EkmcError::Statistics(err.to_string()))?;
        let quantile: f64 = students_t.inverse_cdf(0.5 * (1.0 + confidence_level));
        let sample_deviation: f64 = (sum_of_squares / degrees_of_freedom).sqrt();
        Some(sample_deviation / n.sqrt() * quantile)
    } else {
        None
    };
    Ok(TimeAverage {
        mean,
        standard_deviation,
        confidence_interval,
    })
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct TensorAverage {
    pub xx: TimeAverage,
    pub yy: TimeAverage,
    pub zz: TimeAverage,
    pub xy: TimeAverage,
    pub xz: TimeAverage,
    pub yz: TimeAverage,
}

/// Time averages of the ensemble observables over a window of the time grid.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TimeAveragedSummary {
    pub n_trajectories: usize,
    /// ps
    pub window_start: f64,
    /// ps
    pub window_end: f64,
    pub n_samples: usize,
    pub confidence_level: f64,
    /// cm^2/s
    pub diffusion_coefficient: TimeAverage,
    /// eV
    pub energy: TimeAverage,
    pub diffusion_tensor: TensorAverage,
    /// descending
    pub eigenvalues: Vec<TimeAverage>,
    /// waiting time weighted average of the per-hop tensors
    pub step_weighted_diffusion_tensor: TensorComponents,
}

/// Grid points with `start <= t <= end` and t > 0. A negative `end` means the
/// last grid time.
pub fn window_points(points: &[DiffusionPoint], start: f64, end: f64) -> Vec<&DiffusionPoint> {
    points
        .iter()
        .filter(|point| point.time > 0.0 && point.time >= start && (end < 0.0 || point.time <= end))
        .collect()
}

pub fn time_averaged_summary(
    points: &[DiffusionPoint],
    n_trajectories: usize,
    start: f64,
    end: f64,
    confidence_level: f64,
    step_weighted: TensorComponents,
) -> Result<TimeAveragedSummary> {
    let window: Vec<&DiffusionPoint> = window_points(points, start, end);
    let (first, last): (&DiffusionPoint, &DiffusionPoint) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(EkmcError::Statistics(format!(
                "no sampled time lies in the averaging window [{}, {}] ps",
                start, end
            )))
        }
    };
    let average = |value: &dyn Fn(&DiffusionPoint) -> f64| -> Result<TimeAverage> {
        let values: Vec<f64> = window.iter().map(|point| value(*point)).collect();
        time_average(&values, confidence_level)
    };
    let component = |idx: usize| -> Result<TimeAverage> {
        average(&|point: &DiffusionPoint| TensorComponents::from_tensor(&point.tensor).to_array()[idx])
    };
    Ok(TimeAveragedSummary {
        n_trajectories,
        window_start: first.time,
        window_end: last.time,
        n_samples: window.len(),
        confidence_level,
        diffusion_coefficient: average(&|point: &DiffusionPoint| point.diffusion_coefficient)?,
        energy: average(&|point: &DiffusionPoint| point.energy)?,
        diffusion_tensor: TensorAverage {
            xx: component(0)?,
            yy: component(1)?,
            zz: component(2)?,
            xy: component(3)?,
            xz: component(4)?,
            yz: component(5)?,
        },
        eigenvalues: (0..3)
            .map(|idx| average(&|point: &DiffusionPoint| point.eigenvalues[idx]))
            .collect::<Result<Vec<TimeAverage>>>()?,
        step_weighted_diffusion_tensor: step_weighted,
    })
}
