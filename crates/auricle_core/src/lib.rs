//! Auricle Core - Audio Engine
//!
//! Real-time microphone conditioning: capture and playback streams run on
//! their own real-time schedules, bridged by a lock-free ring buffer, with
//! the DSP chain applied in the playback callback.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Control Thread(s)                       │
//! │   set_* ──atomic stores──▶ SharedControls / pending coeffs  │
//! │   start/stop ──lifecycle mutex──▶ StreamProvider            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Real-Time Callbacks                       │
//! │   Capture ──SampleRing──▶ gain ▶ EQ ▶ gate? ▶ limiter?      │
//! │              (zero allocation, no locks on this path)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod engine;
mod error;
mod message;
mod provider;
mod ring;

pub use config::{EngineSettings, SharedControls, MAX_BAND_GAIN_DB, MAX_MICROPHONE_GAIN};
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult, ProviderError};
pub use message::Event;
pub use provider::{
    CaptureCallback, CpalProvider, ErrorCallback, PlaybackCallback, StreamId, StreamProvider,
    StreamSpec,
};
pub use ring::{Consumer, Producer, SampleRing};

// Re-export DSP types for convenience
pub use auricle_dsp::{
    peaking_coefficients, BiquadSection, CoefficientSlot, Coefficients, EqualizerBank, NoiseGate,
    PinkNoise, SoftKneeLimiter, DEFAULT_Q, EQ_BAND_COUNT, EQ_BAND_FREQUENCIES,
};
