//! Stopwatch around the Picard building blocks, compiled in with the
//! `timing` feature and reduced to plain calls otherwise.
#[cfg(feature = "timing")]
use std::cell::RefCell;
use std::time::Duration;

#[derive(Default, Clone, Debug)]
pub struct TimingStats {
    pub assembly_times: Vec<Duration>,
    pub linear_solve_times: Vec<Duration>,
    pub steps: usize,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg_attr(not(feature = "timing"), allow(dead_code))]
    fn millis(d: Duration) -> f64 {
        d.as_secs_f64() * 1000.0
    }

    #[cfg(feature = "timing")]
    pub fn print_summary(&self) {
        if self.linear_solve_times.is_empty() {
            return;
        }

        let assembly: Duration = self.assembly_times.iter().sum();
        let solve: Duration = self.linear_solve_times.iter().sum();
        let overhead = self.total_time.saturating_sub(assembly + solve);
        let per = |total: Duration, n: usize| Self::millis(total) / n.max(1) as f64;

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "TIME MARCHING SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Wall time:                     {:.3}s over {} steps",
            self.total_time.as_secs_f64(),
            self.steps
        );
        println!("{}", "-".repeat(60));
        println!(
            "  Boundary assembly:         {:>9.3}ms  (avg: {:>9.3}ms)",
            Self::millis(assembly),
            per(assembly, self.assembly_times.len())
        );
        println!(
            "  Linear solve:              {:>9.3}ms  (avg: {:>9.3}ms)",
            Self::millis(solve),
            per(solve, self.linear_solve_times.len())
        );
        println!(
            "  Other:                     {:>9.3}ms",
            Self::millis(overhead)
        );
        println!("{}", "=".repeat(60));
        println!(
            "Picard iterations: {} ({:.2} per step)\n",
            self.linear_solve_times.len(),
            self.linear_solve_times.len() as f64 / self.steps.max(1) as f64
        );
    }

    #[cfg(not(feature = "timing"))]
    pub fn print_summary(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
fn with_stats<R>(f: impl FnOnce(&mut TimingStats) -> R) -> R {
    TIMING_STATS.with(|stats| f(&mut stats.borrow_mut()))
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    with_stats(|s| *s = TimingStats::new());
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_step() {
    with_stats(|s| s.steps += 1);
}

#[cfg(not(feature = "timing"))]
pub fn record_step() {}

#[cfg(feature = "timing")]
pub fn record_assembly<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    with_stats(|s| s.assembly_times.push(elapsed));
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_assembly<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    with_stats(|s| s.linear_solve_times.push(elapsed));
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    with_stats(|s| {
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

pub fn finalize_and_print(total_time: Duration) {
    finalize_timing(total_time).print_summary();
}
