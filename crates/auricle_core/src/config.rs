//! Engine Configuration
//!
//! Two kinds of configuration live here: [`EngineSettings`], the immutable
//! stream parameters fixed at engine construction, and [`SharedControls`],
//! the runtime-mutable state shared between the control path and the audio
//! callbacks. Every `SharedControls` field is independently atomic; no
//! cross-field consistency is guaranteed or required, since each is
//! consumed on its own inside the per-sample chain.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use auricle_dsp::EQ_BAND_COUNT;

/// Microphone gain ceiling (linear, ~ +30 dB).
pub const MAX_MICROPHONE_GAIN: f32 = 32.0;

/// Per-band EQ gain limits in dB.
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Stream parameters negotiated with the platform at engine construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Sample rate in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,

    /// Frames the provider delivers per callback invocation. Determines
    /// the real-time deadline.
    pub frames_per_burst: u32,

    /// Ring buffer capacity as a multiple of one burst.
    pub ring_bursts: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frames_per_burst: 256,
            ring_bursts: 8,
        }
    }
}

impl EngineSettings {
    /// Config optimized for minimum end-to-end delay.
    pub fn low_latency() -> Self {
        Self {
            sample_rate: 48_000,
            frames_per_burst: 96, // ~2ms per burst
            ring_bursts: 8,
        }
    }

    /// Config optimized for stability on busy devices.
    pub fn stable() -> Self {
        Self {
            sample_rate: 48_000,
            frames_per_burst: 512,
            ring_bursts: 8,
        }
    }

    /// Delay contributed by one burst, in milliseconds.
    pub fn burst_latency_ms(&self) -> f32 {
        (self.frames_per_burst as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Ring buffer capacity in samples.
    pub fn ring_capacity(&self) -> usize {
        self.frames_per_burst as usize * self.ring_bursts
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8_000 || self.sample_rate > 192_000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.frames_per_burst < 16 || self.frames_per_burst > 8192 {
            return Err(format!("Invalid burst size: {}", self.frames_per_burst));
        }
        if self.ring_bursts < 2 {
            return Err(format!("Ring too small: {} bursts", self.ring_bursts));
        }
        Ok(())
    }
}

/// Runtime controls shared between the control path and the audio callbacks.
///
/// f32 values are stored as bit-patterns in `AtomicU32` (AtomicF32 doesn't
/// exist); Relaxed ordering is fine for single-value updates that don't
/// need to synchronize other memory.
pub struct SharedControls {
    gain_bits: AtomicU32,
    noise_suppression: AtomicBool,
    dynamics: AtomicBool,
    test_mode: AtomicBool,
    band_gain_bits: [AtomicU32; EQ_BAND_COUNT],
}

impl SharedControls {
    pub fn new() -> Self {
        Self {
            gain_bits: AtomicU32::new(1.0_f32.to_bits()),
            noise_suppression: AtomicBool::new(false),
            dynamics: AtomicBool::new(false),
            test_mode: AtomicBool::new(false),
            band_gain_bits: core::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
        }
    }

    pub fn set_microphone_gain(&self, gain: f32) {
        let clamped = gain.clamp(0.0, MAX_MICROPHONE_GAIN);
        self.gain_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn microphone_gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    pub fn set_noise_suppression_enabled(&self, enabled: bool) {
        self.noise_suppression.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn noise_suppression_enabled(&self) -> bool {
        self.noise_suppression.load(Ordering::Relaxed)
    }

    pub fn set_dynamics_enabled(&self, enabled: bool) {
        self.dynamics.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn dynamics_enabled(&self) -> bool {
        self.dynamics.load(Ordering::Relaxed)
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.test_mode.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn test_mode(&self) -> bool {
        self.test_mode.load(Ordering::Relaxed)
    }

    pub fn set_band_gain_db(&self, band: usize, gain_db: f32) {
        if band < EQ_BAND_COUNT {
            let clamped = gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
            self.band_gain_bits[band].store(clamped.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn band_gain_db(&self, band: usize) -> f32 {
        f32::from_bits(self.band_gain_bits[band].load(Ordering::Relaxed))
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new()
    }
}
