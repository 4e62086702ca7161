//! # Input Smoothing
//!
//! Windowed moving average over raw joystick samples.

/// Largest supported averaging window
pub const MAX_WINDOW: usize = 100;

/// Integer moving average over the last `window` samples.
///
/// Until the window has filled once, the average is taken over the samples
/// seen so far, so the first output equals the first input.
///
/// # Examples
///
/// ```
/// use rc433_link::controller::smoothing::MovingAverage;
///
/// let mut avg = MovingAverage::new(4);
/// assert_eq!(avg.push(100), 100);
/// assert_eq!(avg.push(200), 150);
/// ```
#[derive(Debug, Clone)]
pub struct MovingAverage {
    samples: Vec<u16>,
    window: usize,
    next: usize,
    sum: u32,
    filled: bool,
}

impl MovingAverage {
    /// Create an average over `window` samples, clamped to 1..=100
    pub fn new(window: usize) -> Self {
        let window = window.clamp(1, MAX_WINDOW);
        Self {
            samples: vec![0; window],
            window,
            next: 0,
            sum: 0,
            filled: false,
        }
    }

    /// Add a sample and return the new average (truncated)
    pub fn push(&mut self, sample: u16) -> u16 {
        if self.next >= self.window {
            self.next = 0;
            self.filled = true;
        }

        self.sum = self.sum - u32::from(self.samples[self.next]) + u32::from(sample);
        self.samples[self.next] = sample;
        self.next += 1;

        let count = if self.filled { self.window } else { self.next };
        // count <= 100 and every sample fits in u16, so the quotient does too
        (self.sum / count as u32) as u16
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Forget all samples
    pub fn reset(&mut self) {
        self.samples.fill(0);
        self.next = 0;
        self.sum = 0;
        self.filled = false;
    }
}
