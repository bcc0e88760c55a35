use serde::{Deserialize, Serialize};

/// Iteration counts applied by [`Task::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkProfile {
    /// Refinement steps for a light task.
    pub light_iterations: usize,
    /// Refinement steps for a heavy task.
    pub heavy_iterations: usize,
}

impl WorkProfile {
    pub fn new(light_iterations: usize, heavy_iterations: usize) -> Self {
        Self {
            light_iterations,
            heavy_iterations,
        }
    }

    /// Number of refinement steps for a task of the given weight.
    pub fn iterations_for(&self, is_heavy: bool) -> usize {
        if is_heavy {
            self.heavy_iterations
        } else {
            self.light_iterations
        }
    }
}

impl Default for WorkProfile {
    fn default() -> Self {
        Self::new(100, 1_000)
    }
}

/// A single unit of synthetic CPU-bound work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub value: f64,
    pub is_heavy: bool,
}

impl Task {
    pub fn light(value: f64) -> Self {
        Self {
            value,
            is_heavy: false,
        }
    }

    pub fn heavy(value: f64) -> Self {
        Self {
            value,
            is_heavy: true,
        }
    }

    /// Run the trigonometric refinement loop and return its integer result.
    ///
    /// Pure and deterministic: the same `(value, is_heavy, profile)` always
    /// yields the same number, so it is safe to call from any thread.
    #[must_use]
    pub fn process(&self, profile: &WorkProfile) -> u32 {
        let iterations = profile.iterations_for(self.is_heavy);
        let mut intermediate = 2.0 * (self.value / f64::from(u32::MAX)) - 1.0;
        for _ in 0..iterations {
            let digits = ((intermediate.cos().sin().abs() * 10_000_000.0) as u32) % 100_000;
            intermediate = f64::from(digits) / 10_000.0;
        }
        intermediate.exp() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_is_deterministic() {
        let profile = WorkProfile::default();
        for value in [0.0, 0.5, 1.0, 2.75, std::f64::consts::PI] {
            for task in [Task::light(value), Task::heavy(value)] {
                let first = task.process(&profile);
                for _ in 0..5 {
                    assert_eq!(task.process(&profile), first, "task {task:?}");
                }
            }
        }
    }

    #[test]
    fn zero_iterations_is_exp_of_normalized_value() {
        let profile = WorkProfile::new(0, 0);
        // value 0 normalizes to -1, exp(-1) truncates to 0
        assert_eq!(Task::light(0.0).process(&profile), 0);
        // value u32::MAX normalizes to 1, exp(1) truncates to 2
        assert_eq!(Task::heavy(f64::from(u32::MAX)).process(&profile), 2);
    }

    #[test]
    fn result_is_bounded_by_digit_range() {
        // digits < 100_000 so the refined value stays below 10 and exp(10) < 22_027
        let profile = WorkProfile::new(3, 7);
        for i in 0..200 {
            let value = f64::from(i) * 0.0157;
            assert!(Task::light(value).process(&profile) < 22_027);
            assert!(Task::heavy(value).process(&profile) < 22_027);
        }
    }

    #[test]
    fn iterations_follow_weight() {
        let profile = WorkProfile::new(10, 90);
        assert_eq!(profile.iterations_for(false), 10);
        assert_eq!(profile.iterations_for(true), 90);
    }
}
