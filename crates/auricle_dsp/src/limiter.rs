//! Soft-Knee Dynamics Limiter
//!
//! Prevents clipping while being less audible than a hard clamp. Below the
//! knee the signal passes through; above it the output is pinned to the
//! threshold; inside the knee a quadratic gain-reduction curve blends the
//! two regions. Decisions are driven by the limiter's own envelope
//! follower, independent of the noise gate's.

/// Envelope attack coefficient (rising input). Must outpace the release so
/// the limiter engages before a transient gets through.
const ATTACK_ALPHA: f32 = 0.1;

/// Envelope release coefficient (falling input).
const RELEASE_ALPHA: f32 = 0.01;

/// Below this the envelope is treated as silence and the knee math is
/// skipped entirely.
const MIN_ENVELOPE: f32 = 1e-6;

/// Per-sample limiter state. Owned by the audio thread.
pub struct SoftKneeLimiter {
    envelope: f32,
}

impl SoftKneeLimiter {
    /// Output ceiling (linear).
    pub const THRESHOLD: f32 = 0.8;

    /// Width of the soft-knee region centered on the threshold.
    pub const KNEE: f32 = 0.2;

    pub fn new() -> Self {
        Self { envelope: 0.0 }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    /// Current envelope estimate.
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        let alpha = if magnitude > self.envelope {
            ATTACK_ALPHA
        } else {
            RELEASE_ALPHA
        };
        self.envelope += alpha * (magnitude - self.envelope);

        let knee_start = Self::THRESHOLD - Self::KNEE * 0.5;
        let knee_end = Self::THRESHOLD + Self::KNEE * 0.5;

        if self.envelope < knee_start {
            input
        } else if self.envelope > knee_end {
            Self::THRESHOLD.copysign(input)
        } else {
            // Unreachable with THRESHOLD = 0.8 (the knee starts at 0.7),
            // but the division below must never see a near-zero envelope.
            if self.envelope < MIN_ENVELOPE {
                return input;
            }
            let diff = self.envelope - knee_start;
            let reduction = diff * diff / (2.0 * Self::KNEE);
            input * (1.0 - reduction / self.envelope)
        }
    }
}

impl Default for SoftKneeLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNEE_START: f32 = SoftKneeLimiter::THRESHOLD - SoftKneeLimiter::KNEE * 0.5;
    const KNEE_END: f32 = SoftKneeLimiter::THRESHOLD + SoftKneeLimiter::KNEE * 0.5;

    #[test]
    fn below_knee_passes_through_exactly() {
        let mut limiter = SoftKneeLimiter::new();
        // Constant input below the knee start: the envelope can never
        // exceed the input magnitude, so every sample passes unchanged.
        for _ in 0..5000 {
            assert_eq!(limiter.process(0.5), 0.5);
            assert_eq!(limiter.process(-0.5), -0.5);
        }
    }

    #[test]
    fn above_knee_clamps_to_threshold() {
        let mut limiter = SoftKneeLimiter::new();
        let mut out = 0.0;
        for _ in 0..2000 {
            out = limiter.process(0.95);
        }
        assert!(limiter.envelope() > KNEE_END);
        assert_eq!(out, SoftKneeLimiter::THRESHOLD);

        let mut negative = SoftKneeLimiter::new();
        let mut out = 0.0;
        for _ in 0..2000 {
            out = negative.process(-0.95);
        }
        assert_eq!(out, -SoftKneeLimiter::THRESHOLD);
    }

    #[test]
    fn knee_region_reduces_gain_smoothly() {
        let mut limiter = SoftKneeLimiter::new();
        let input = 0.8; // settles exactly mid-knee
        let mut out = input;
        for _ in 0..2000 {
            out = limiter.process(input);
        }
        let envelope = limiter.envelope();
        assert!(envelope > KNEE_START && envelope < KNEE_END);

        // Expected quadratic reduction at the settled envelope.
        let diff = envelope - KNEE_START;
        let expected = input * (1.0 - diff * diff / (2.0 * SoftKneeLimiter::KNEE) / envelope);
        assert!((out - expected).abs() < 1e-4);
        assert!(out < input);
        assert!(out > KNEE_START);
    }

    #[test]
    fn knee_curve_is_continuous_at_boundaries() {
        // Steady-state outputs just inside and outside the knee edges
        // should differ only marginally.
        let steady = |input: f32| {
            let mut limiter = SoftKneeLimiter::new();
            let mut out = 0.0;
            for _ in 0..5000 {
                out = limiter.process(input);
            }
            out
        };

        let lower_out = steady(KNEE_START - 0.005);
        let lower_in = steady(KNEE_START + 0.005);
        assert!((lower_out - lower_in).abs() < 0.02);

        let upper_in = steady(KNEE_END - 0.005);
        let upper_out = steady(KNEE_END + 0.005);
        assert!((upper_in - upper_out).abs() < 0.02);
    }

    #[test]
    fn attack_engages_quickly_on_transients() {
        let mut limiter = SoftKneeLimiter::new();
        // A sudden full-scale burst: the envelope must climb into the
        // limiting region within a few dozen samples.
        let mut engaged_at = None;
        for i in 0..200 {
            limiter.process(1.0);
            if limiter.envelope() > KNEE_END {
                engaged_at = Some(i);
                break;
            }
        }
        assert!(
            engaged_at.is_some() && engaged_at.unwrap() < 50,
            "limiter too slow to engage: {:?}",
            engaged_at
        );
    }

    #[test]
    fn reset_clears_envelope() {
        let mut limiter = SoftKneeLimiter::new();
        for _ in 0..100 {
            limiter.process(1.0);
        }
        limiter.reset();
        assert_eq!(limiter.envelope(), 0.0);
    }
}
