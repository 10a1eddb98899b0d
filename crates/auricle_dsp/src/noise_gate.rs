//! Adaptive Noise Gate / Downward Expander
//!
//! Attenuates signal believed to be noise (input below an adaptively
//! estimated floor) while leaving speech untouched. The envelope follows
//! the input magnitude with asymmetric attack/release smoothing; the noise
//! floor tracks the envelope with a much slower, also asymmetric pair of
//! coefficients so it can settle on the quiet noise bed without being
//! dragged up by speech.

/// Envelope attack coefficient (rising input).
const ATTACK_ALPHA: f32 = 0.1;

/// Envelope release coefficient (falling input).
const RELEASE_ALPHA: f32 = 0.001;

/// Noise-floor coefficient while the envelope is below the floor.
const FLOOR_FALL_ALPHA: f32 = 0.0001;

/// The floor rises 10x slower than it falls.
const FLOOR_RISE_SCALE: f32 = 0.1;

/// Downward expansion ratio. Fixed.
const EXPANDER_RATIO: f32 = 2.0;

/// Gate threshold as a multiple of the noise-floor estimate.
const THRESHOLD_RATIO: f32 = 3.0;

/// The gate never attenuates below this multiplier (never fully mutes).
const MIN_GAIN: f32 = 0.1;

/// Noise-floor estimate after a reset.
const INITIAL_NOISE_FLOOR: f32 = 0.01;

/// Per-sample noise gate state. Owned by the audio thread.
pub struct NoiseGate {
    envelope: f32,
    noise_floor: f32,
}

impl NoiseGate {
    pub fn new() -> Self {
        Self {
            envelope: 0.0,
            noise_floor: INITIAL_NOISE_FLOOR,
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.noise_floor = INITIAL_NOISE_FLOOR;
    }

    /// Current envelope estimate.
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Current noise-floor estimate.
    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    /// Process one sample. Envelope and floor are updated strictly from
    /// their previous values and the current input magnitude (no lookahead).
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();

        let envelope_alpha = if magnitude > self.envelope {
            ATTACK_ALPHA
        } else {
            RELEASE_ALPHA
        };
        self.envelope += envelope_alpha * (magnitude - self.envelope);

        let floor_alpha = if self.envelope < self.noise_floor {
            FLOOR_FALL_ALPHA
        } else {
            FLOOR_FALL_ALPHA * FLOOR_RISE_SCALE
        };
        self.noise_floor += floor_alpha * (self.envelope - self.noise_floor);

        let threshold = self.noise_floor * THRESHOLD_RATIO;
        if self.envelope < threshold {
            let attenuation = (self.envelope / (threshold + 1e-6)).powf(EXPANDER_RATIO - 1.0);
            input * attenuation.max(MIN_GAIN)
        } else {
            input
        }
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}
