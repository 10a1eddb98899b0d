//! Auricle DSP - Digital Signal Processing Module
//!
//! This crate provides the per-sample processing components for Auricle:
//! - BiQuad filter sections with double-buffered, lock-free coefficient updates
//! - 5-band parametric equalizer (RBJ peaking filters)
//! - Adaptive noise gate / downward expander
//! - Soft-knee dynamics limiter
//! - Pink-noise self-test source
//!
//! # Architecture
//!
//! Everything here follows a strict "no allocation, no locks in the audio
//! path" rule. Mutable filter state is owned by the audio thread; the only
//! cross-thread state is the pending coefficient slot, adopted atomically
//! between buffers.

mod biquad;
mod eq;
mod limiter;
mod noise_gate;
mod pink;

pub use biquad::{BiquadSection, CoefficientSlot, Coefficients};
pub use eq::{
    peaking_coefficients, EqualizerBank, DEFAULT_Q, EQ_BAND_COUNT, EQ_BAND_FREQUENCIES,
};
pub use limiter::SoftKneeLimiter;
pub use noise_gate::NoiseGate;
pub use pink::PinkNoise;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let _bank = EqualizerBank::new();
        let _gate = NoiseGate::new();
        let _limiter = SoftKneeLimiter::new();
        let _pink = PinkNoise::new();
        let _ = peaking_coefficients(EQ_BAND_FREQUENCIES[0], 48_000.0, 0.0, DEFAULT_Q);
    }
}
