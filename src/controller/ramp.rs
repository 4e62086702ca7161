//! # Acceleration Ramp
//!
//! Limits how fast a shaped stick value may change, so the car does not jump
//! from standstill to full throttle in one frame.

/// Steps an output toward its target at a fixed rate.
///
/// When the target moves away from the current output, a step timer starts.
/// Each time more than `interval_us` has passed since the last step, the
/// output moves `step` toward the target, landing exactly on it rather than
/// overshooting.
///
/// # Examples
///
/// ```
/// use rc433_link::controller::ramp::Ramp;
///
/// let mut ramp = Ramp::new(80, 100);
/// assert_eq!(ramp.update(1000, 0), 0);    // timer starts
/// assert_eq!(ramp.update(1000, 101), 80);
/// assert_eq!(ramp.update(1000, 202), 160);
/// ```
#[derive(Debug, Clone)]
pub struct Ramp {
    step: i32,
    interval_us: u64,
    current: i32,
    last_step_us: Option<u64>,
}

impl Ramp {
    /// Create a ramp starting at zero
    ///
    /// # Arguments
    ///
    /// * `step` - Change per step (0 is treated as 1)
    /// * `interval_us` - Minimum time between steps
    pub fn new(step: u16, interval_us: u64) -> Self {
        Self {
            step: i32::from(step.max(1)),
            interval_us,
            current: 0,
            last_step_us: None,
        }
    }

    /// Move toward `target` if a step is due at `now_us` and return the output
    pub fn update(&mut self, target: i32, now_us: u64) -> i32 {
        if self.current == target {
            self.last_step_us = None;
            return self.current;
        }

        match self.last_step_us {
            None => self.last_step_us = Some(now_us),
            Some(since) if now_us.wrapping_sub(since) > self.interval_us => {
                self.current = if target > self.current {
                    (self.current + self.step).min(target)
                } else {
                    (self.current - self.step).max(target)
                };
                self.last_step_us = Some(now_us);
            }
            Some(_) => {}
        }

        self.current
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    /// Whether the output has reached the last target
    pub fn is_settled(&self) -> bool {
        self.last_step_us.is_none()
    }
}
