//! Running-mean centering for raw signals and inputs.
//!
//! Cumulative average, updated incrementally (Welford's mean recurrence), so
//! no history has to be stored. The model updates the statistics only on
//! training updates and centers with the same means everywhere else, so
//! inference never shifts the operating point.

#[derive(Debug, Clone, PartialEq)]
pub struct RunningMean {
    count: u64,
    mean: Vec<f64>,
}

impl RunningMean {
    /// Zero-initialized statistics for vectors of width `len`.
    pub fn new(len: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; len],
        }
    }

    /// Fold one raw vector into the running mean.
    pub fn update(&mut self, raw: &[f64]) {
        debug_assert_eq!(raw.len(), self.mean.len());
        self.count += 1;
        let n = self.count as f64;
        for (m, &x) in self.mean.iter_mut().zip(raw) {
            *m += (x - *m) / n;
        }
    }

    /// Write `raw - mean` into `out`.
    pub fn center_into(&self, raw: &[f64], out: &mut [f64]) {
        for ((o, &x), &m) in out.iter_mut().zip(raw).zip(&self.mean) {
            *o = x - m;
        }
    }

    pub fn center(&self, raw: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; raw.len()];
        self.center_into(raw, &mut out);
        out
    }

    /// Inverse of `center`: `centered + mean`.
    pub fn decenter(&self, centered: &[f64]) -> Vec<f64> {
        centered.iter().zip(&self.mean).map(|(c, m)| c + m).collect()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Number of vectors folded in so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_mean_is_zero() {
        let stats = RunningMean::new(3);
        assert_eq!(stats.mean(), &[0.0, 0.0, 0.0]);
        assert_eq!(stats.center(&[1.0, -2.0, 3.0]), vec![1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_cumulative_average() {
        let mut stats = RunningMean::new(1);
        for i in 0..1000 {
            stats.update(&[f64::from(i)]);
        }
        assert_eq!(stats.count(), 1000);
        assert!((stats.mean()[0] - 499.5).abs() < 1e-9);
    }

    #[test]
    fn test_constant_input_centers_to_zero() {
        let mut stats = RunningMean::new(2);
        for _ in 0..50 {
            stats.update(&[4.0, -1.5]);
            let c = stats.center(&[4.0, -1.5]);
            assert!(c.iter().all(|v| v.abs() < 1e-12));
        }
    }

    #[test]
    fn test_decenter_inverts_center() {
        let mut stats = RunningMean::new(2);
        stats.update(&[1.0, 2.0]);
        stats.update(&[3.0, 6.0]);
        let raw = [0.25, -7.0];
        let back = stats.decenter(&stats.center(&raw));
        assert!((back[0] - raw[0]).abs() < 1e-12);
        assert!((back[1] - raw[1]).abs() < 1e-12);
    }
}
