//! NARMA-10 reference plant.
//!
//! ```text
//! y(t+1) = 0.3 y(t) + 0.05 y(t) * sum_{i=0..9} y(t-i) + 1.5 u(t-9) u(t) + 0.1
//! ```
//!
//! Stable for inputs drawn from `[0, 0.5]`. Used by the CLI as the system to
//! identify and by tests as a nonlinear benchmark with a known lag structure.

/// Plant memory depth.
pub const NARMA_ORDER: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Narma10 {
    /// Past outputs, newest first.
    ys: [f64; NARMA_ORDER],
    /// Past inputs, newest first.
    us: [f64; NARMA_ORDER],
}

impl Narma10 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the plant with input `u(t)` and return `y(t+1)`.
    pub fn step(&mut self, u: f64) -> f64 {
        let y = self.ys[0];
        let y_sum: f64 = self.ys.iter().sum();
        // us[0] is u(t-1), so u(t-9) is us[8]
        let u_lag = self.us[NARMA_ORDER - 2];

        let next = 0.3 * y + 0.05 * y * y_sum + 1.5 * u_lag * u + 0.1;

        self.ys.rotate_right(1);
        self.us.rotate_right(1);
        self.ys[0] = next;
        self.us[0] = u;
        next
    }

    /// Most recent output.
    pub fn output(&self) -> f64 {
        self.ys[0]
    }
}
