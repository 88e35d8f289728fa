/// `nt` equal steps from `t0` to `t1`.
#[derive(Debug, Clone)]
pub struct UniformTimeLine {
    pub t0: f64,
    pub t1: f64,
    pub nt: usize,
    pub dt: f64,
    /// Index of the current time level, `0..=nt`.
    pub current: usize,
}

impl UniformTimeLine {
    pub fn new(t0: f64, t1: f64, nt: usize) -> Self {
        let nt = nt.max(1);
        Self {
            t0,
            t1,
            nt,
            dt: (t1 - t0) / nt as f64,
            current: 0,
        }
    }

    pub fn current_time_level(&self) -> f64 {
        self.t0 + self.current as f64 * self.dt
    }

    pub fn next_time_level(&self) -> f64 {
        self.t0 + (self.current + 1) as f64 * self.dt
    }

    pub fn current_time_step_length(&self) -> f64 {
        self.dt
    }

    pub fn advance(&mut self) {
        if self.current < self.nt {
            self.current += 1;
        }
    }

    pub fn stopped(&self) -> bool {
        self.current >= self.nt
    }
}
