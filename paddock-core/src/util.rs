//! Utilities.

/// Running mean and variance of vectors, updated with batches.
///
/// Uses the parallel algorithm of Chan et al. The count starts at `epsilon` so the
/// first update is well defined.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningMeanStd {
    mean: Vec<f64>,
    var: Vec<f64>,
    count: f64,
}

impl RunningMeanStd {
    /// Statistics of vectors with `dim` elements, starting at mean 0 and variance 1.
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            var: vec![1.0; dim],
            count: 1e-4,
        }
    }

    /// Running mean.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Running variance.
    pub fn var(&self) -> &[f64] {
        &self.var
    }

    /// Updates the statistics with one vector.
    pub fn update(&mut self, x: &[f32]) {
        self.update_from_moments(
            &x.iter().map(|v| *v as f64).collect::<Vec<_>>(),
            &vec![0.0; x.len()],
            1.0,
        );
    }

    fn update_from_moments(&mut self, batch_mean: &[f64], batch_var: &[f64], batch_count: f64) {
        let tot_count = self.count + batch_count;
        for i in 0..self.mean.len() {
            let delta = batch_mean[i] - self.mean[i];
            let m_a = self.var[i] * self.count;
            let m_b = batch_var[i] * batch_count;
            let m2 = m_a + m_b + delta * delta * self.count * batch_count / tot_count;
            self.mean[i] += delta * batch_count / tot_count;
            self.var[i] = m2 / tot_count;
        }
        self.count = tot_count;
    }

    /// `(x - mean) / sqrt(var + epsilon)`, finite even for zero variance.
    pub fn normalize(&self, x: &[f32], epsilon: f64) -> Vec<f32> {
        x.iter()
            .zip(self.mean.iter().zip(self.var.iter()))
            .map(|(v, (m, s))| ((*v as f64 - m) / (s + epsilon).sqrt()) as f32)
            .collect()
    }
}
