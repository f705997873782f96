// ---------------------------------------------------------------------------
// PID Controller (single axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    integral_limit: f64,
    integral: f64,
    prev_error: Option<f64>,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd, integral_limit: 1.0, integral: 0.0, prev_error: None }
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit.abs();
        self
    }

    /// A non-positive or non-finite `dt` contributes only the proportional
    /// term and leaves the integrator and derivative history untouched.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if !error.is_finite() {
            return 0.0;
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return self.kp * error;
        }
        self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);
        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_proportional() {
        let mut pid = Pid::new(1.0, 0.0, 0.0);
        let out = pid.update(0.5, 0.01);
        assert!((out - 0.5).abs() < 1e-10);
    }

    #[test]
    fn pid_integral_accumulates() {
        let mut pid = Pid::new(0.0, 1.0, 0.0);
        pid.update(1.0, 0.1);
        let out = pid.update(1.0, 0.1);
        assert!((out - 0.2).abs() < 1e-10);
    }

    #[test]
    fn first_sample_has_no_derivative_kick() {
        let mut pid = Pid::new(0.0, 0.0, 1.0);
        assert_eq!(pid.update(5.0, 0.02), 0.0);
        assert!((pid.update(6.0, 0.5) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn zero_dt_stays_finite() {
        let mut pid = Pid::new(1.0, 1.0, 1.0);
        pid.update(1.0, 0.1);
        let out = pid.update(2.0, 0.0);
        assert!(out.is_finite());
        assert!((out - 2.0).abs() < 1e-10);
        assert!(pid.update(1.0, -0.5).is_finite());
    }
}
