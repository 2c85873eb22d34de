//! Geometry debouncing
//!
//! Layout passes can report the same frame many times per frame. The
//! debouncer collapses each burst into a single sample:
//!
//! - a sample equal to the previously received value is ignored outright and
//!   does not restart the quiet interval
//! - otherwise it replaces the held sample, which is emitted once the quiet
//!   interval passes without a newer value
//! - a sample equal to the last emitted value is never emitted again
//!
//! Time comes from the samples themselves, so the same logic serves both the
//! live [`crate::stream::GeometryStream`] and the [`DebounceExt`] iterator
//! adaptor used for recorded traces.

use pagelist_core::geometry::{GeometrySample, Rect};
use pagelist_core::scheduler::Timestamp;
use serde::{Deserialize, Serialize};

/// Default quiet interval in milliseconds
pub const DEFAULT_QUIET_MS: u64 = 10;

/// Debounce configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// How long a value must stay unchanged before it is emitted
    #[serde(default = "default_quiet_ms")]
    pub quiet_ms: u64,
}

fn default_quiet_ms() -> u64 {
    DEFAULT_QUIET_MS
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_ms: DEFAULT_QUIET_MS,
        }
    }
}

/// Burst collapser for one observed element
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    config: DebounceConfig,
    pending: Option<GeometrySample>,
    last_received: Option<Rect>,
    last_emitted: Option<Rect>,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    /// Offer a new sample
    ///
    /// Returns the held sample if its quiet interval had already elapsed when
    /// this one arrived.
    pub fn push(&mut self, sample: GeometrySample) -> Option<GeometrySample> {
        let flushed = self.poll(sample.observed_at);

        if self.last_received == Some(sample.rect) {
            return flushed;
        }
        self.last_received = Some(sample.rect);
        self.pending = Some(sample);

        flushed
    }

    /// Emit the held sample if its quiet interval has elapsed at `now`
    pub fn poll(&mut self, now: Timestamp) -> Option<GeometrySample> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.take_pending(),
            _ => None,
        }
    }

    /// Emit the held sample regardless of time (end of a finite stream)
    pub fn flush(&mut self) -> Option<GeometrySample> {
        self.take_pending()
    }

    /// When the held sample becomes due
    pub fn deadline(&self) -> Option<Timestamp> {
        self.pending
            .map(|sample| sample.observed_at.saturating_add(self.config.quiet_ms))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The last value emitted downstream
    pub fn last_emitted(&self) -> Option<Rect> {
        self.last_emitted
    }

    fn take_pending(&mut self) -> Option<GeometrySample> {
        let sample = self.pending.take()?;
        if self.last_emitted == Some(sample.rect) {
            return None;
        }
        self.last_emitted = Some(sample.rect);
        Some(sample)
    }
}

/// Iterator adaptor produced by [`DebounceExt::debounced`]
pub struct Debounced<I> {
    inner: I,
    debouncer: Debouncer,
    exhausted: bool,
}

impl<I> Iterator for Debounced<I>
where
    I: Iterator<Item = GeometrySample>,
{
    type Item = GeometrySample;

    fn next(&mut self) -> Option<GeometrySample> {
        while !self.exhausted {
            match self.inner.next() {
                Some(sample) => {
                    if let Some(emitted) = self.debouncer.push(sample) {
                        return Some(emitted);
                    }
                }
                None => {
                    self.exhausted = true;
                    return self.debouncer.flush();
                }
            }
        }
        None
    }
}

/// Debounce any sequence of timestamped samples
pub trait DebounceExt: Iterator<Item = GeometrySample> + Sized {
    fn debounced(self, config: DebounceConfig) -> Debounced<Self> {
        Debounced {
            inner: self,
            debouncer: Debouncer::new(config),
            exhausted: false,
        }
    }
}

impl<I: Iterator<Item = GeometrySample>> DebounceExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: f32, t: Timestamp) -> GeometrySample {
        GeometrySample::new(Rect::new(0.0, y, 320.0, 44.0), t)
    }

    fn ys(samples: impl Iterator<Item = GeometrySample>) -> Vec<f32> {
        samples.map(|s| s.rect.y()).collect()
    }

    #[test]
    fn test_burst_within_one_interval_emits_last_value() {
        // A, A, B, B, B, C all within 10ms
        let input = vec![
            at(1.0, 0),
            at(1.0, 1),
            at(2.0, 2),
            at(2.0, 3),
            at(2.0, 4),
            at(3.0, 5),
        ];
        let out = ys(input.into_iter().debounced(DebounceConfig::default()));
        assert_eq!(out, vec![3.0]);
    }

    #[test]
    fn test_gaps_emit_each_value() {
        let input = vec![
            at(1.0, 0),
            at(1.0, 2),
            at(2.0, 20),
            at(2.0, 22),
            at(2.0, 24),
            at(3.0, 40),
        ];
        let out = ys(input.into_iter().debounced(DebounceConfig::default()));
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_never_emits_consecutive_duplicates() {
        // A settles, B flickers back to A before settling
        let input = vec![at(1.0, 0), at(2.0, 20), at(1.0, 25), at(1.0, 50)];
        let out = ys(input.into_iter().debounced(DebounceConfig::default()));
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_duplicate_does_not_restart_quiet_interval() {
        let mut debouncer = Debouncer::new(DebounceConfig { quiet_ms: 10 });
        assert_eq!(debouncer.push(at(5.0, 0)), None);
        assert_eq!(debouncer.push(at(5.0, 8)), None);
        assert_eq!(debouncer.deadline(), Some(10));

        let emitted = debouncer.poll(10).unwrap();
        assert_eq!(emitted.observed_at, 0);
        assert!(!debouncer.has_pending());
        assert_eq!(debouncer.last_emitted(), Some(Rect::new(0.0, 5.0, 320.0, 44.0)));
    }

    #[test]
    fn test_poll_before_deadline_holds() {
        let mut debouncer = Debouncer::new(DebounceConfig { quiet_ms: 10 });
        debouncer.push(at(5.0, 0));
        assert_eq!(debouncer.poll(9), None);
        assert!(debouncer.has_pending());
        assert!(debouncer.poll(10).is_some());
    }
}
