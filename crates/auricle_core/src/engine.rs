//! Audio Engine - Main Entry Point
//!
//! Owns the full capture-process-playback pipeline:
//!
//! ```text
//! capture callback ──push──▶ SampleRing ──pop──▶ playback callback
//!                                                   │
//!                              gain ▶ 5-band EQ ▶ gate? ▶ limiter?
//! ```
//!
//! Two independent real-time contexts deliver buffers on their own cadence;
//! the ring buffer is their only coupling. A single lifecycle mutex guards
//! stream open/close transitions (`start`/`stop`); the data-path callbacks
//! own their DSP state outright and never take that lock. The control
//! surface mutates only atomics and pending coefficient slots, so it never
//! blocks the audio threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use auricle_dsp::{
    peaking_coefficients, CoefficientSlot, EqualizerBank, NoiseGate, PinkNoise, SoftKneeLimiter,
    DEFAULT_Q, EQ_BAND_COUNT, EQ_BAND_FREQUENCIES,
};

use crate::config::{EngineSettings, SharedControls};
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::provider::{StreamId, StreamProvider, StreamSpec};
use crate::ring::SampleRing;

/// The per-sample processing chain, owned by the playback callback.
struct DspChain {
    eq: EqualizerBank,
    gate: NoiseGate,
    limiter: SoftKneeLimiter,
    pink: PinkNoise,
}

impl DspChain {
    fn new(slots: &[Arc<CoefficientSlot>; EQ_BAND_COUNT]) -> Self {
        Self {
            eq: EqualizerBank::from_slots(slots),
            gate: NoiseGate::new(),
            limiter: SoftKneeLimiter::new(),
            pink: PinkNoise::new(),
        }
    }

    /// Flags and gain are re-read per sample so control changes apply on
    /// the very next sample; a disabled stage keeps its state.
    #[inline]
    fn process_sample(&mut self, input: f32, controls: &SharedControls) -> f32 {
        let mut sample = input * controls.microphone_gain();
        sample = self.eq.process(sample);
        if controls.noise_suppression_enabled() {
            sample = self.gate.process(sample);
        }
        if controls.dynamics_enabled() {
            sample = self.limiter.process(sample);
        }
        sample
    }
}

/// Stream handles and the provider, guarded by the lifecycle mutex.
struct Lifecycle<P> {
    provider: P,
    capture: Option<StreamId>,
    playback: Option<StreamId>,
}

/// The engine. One instance per audio session; independently constructible
/// and destructible, no global state.
pub struct AudioEngine<P: StreamProvider> {
    settings: EngineSettings,
    controls: Arc<SharedControls>,
    band_slots: [Arc<CoefficientSlot>; EQ_BAND_COUNT],
    lifecycle: Mutex<Lifecycle<P>>,
    running: AtomicBool,
    event_tx: Sender<Event>,
    event_rx: Receiver<Event>,
}

impl<P: StreamProvider> AudioEngine<P> {
    /// Create a stopped engine around a stream provider.
    pub fn new(settings: EngineSettings, provider: P) -> EngineResult<Self> {
        settings.validate().map_err(EngineError::ConfigError)?;
        let (event_tx, event_rx) = unbounded();

        info!(
            sample_rate = settings.sample_rate,
            frames_per_burst = settings.frames_per_burst,
            "audio engine created"
        );

        Ok(Self {
            settings,
            controls: Arc::new(SharedControls::new()),
            band_slots: core::array::from_fn(|_| Arc::new(CoefficientSlot::default())),
            lifecycle: Mutex::new(Lifecycle {
                provider,
                capture: None,
                playback: None,
            }),
            running: AtomicBool::new(false),
            event_tx,
            event_rx,
        })
    }

    /// Start (or restart) the engine. Idempotent: any existing streams are
    /// closed first, all DSP state is rebuilt, and the equalizer
    /// coefficients are recomputed from the last-known gains. On failure
    /// every stream that was opened is closed again and the engine stays
    /// stopped.
    pub fn start(&self) -> EngineResult<()> {
        let mut lifecycle = self.lock_lifecycle();
        Self::close_streams(&mut lifecycle);
        self.running.store(false, Ordering::SeqCst);

        self.recompute_all_bands();

        let spec = StreamSpec {
            sample_rate: self.settings.sample_rate,
            buffer_frames: self.settings.frames_per_burst,
        };
        let (mut producer, mut consumer) = SampleRing::with_capacity(self.settings.ring_capacity());
        let test_mode = self.controls.test_mode();

        // Capture is skipped entirely in test mode; the playback callback
        // generates its own signal.
        let capture = if test_mode {
            None
        } else {
            let events = self.event_tx.clone();
            let id = lifecycle.provider.open_capture(
                &spec,
                Box::new(move |data| {
                    producer.push(data);
                }),
                Box::new(move |err| {
                    let _ = events.send(Event::error(err));
                }),
            )?;
            Some(id)
        };

        let mut chain = DspChain::new(&self.band_slots);
        let controls = Arc::clone(&self.controls);
        let events = self.event_tx.clone();
        let playback = lifecycle.provider.open_playback(
            &spec,
            Box::new(move |out: &mut [f32]| {
                chain.eq.adopt_pending();
                if controls.test_mode() {
                    chain.pink.fill(out);
                } else {
                    let read = consumer.pop(out);
                    out[read..].fill(0.0);
                }
                for sample in out.iter_mut() {
                    *sample = chain.process_sample(*sample, &controls);
                }
            }),
            Box::new(move |err| {
                let _ = events.send(Event::error(err));
            }),
        );
        let playback = match playback {
            Ok(id) => id,
            Err(err) => {
                if let Some(id) = capture {
                    lifecycle.provider.close(id);
                }
                warn!(%err, "failed to open playback stream");
                return Err(err.into());
            }
        };

        // Two bursts balances stability against latency on the output side.
        if let Err(err) = lifecycle
            .provider
            .set_buffer_size(playback, self.settings.frames_per_burst * 2)
        {
            debug!(%err, "provider kept its own playback buffer size");
        }

        let mut started = Ok(());
        if let Some(id) = capture {
            started = lifecycle.provider.start(id);
        }
        if started.is_ok() {
            started = lifecycle.provider.start(playback);
        }
        if let Err(err) = started {
            if let Some(id) = capture {
                lifecycle.provider.stop(id);
                lifecycle.provider.close(id);
            }
            lifecycle.provider.stop(playback);
            lifecycle.provider.close(playback);
            warn!(%err, "failed to start streams");
            return Err(err.into());
        }

        lifecycle.capture = capture;
        lifecycle.playback = Some(playback);
        self.running.store(true, Ordering::SeqCst);
        let _ = self.event_tx.send(Event::Started);
        info!(test_mode, "audio engine started");
        Ok(())
    }

    /// Stop the engine and release both streams and the ring buffer.
    /// Idempotent; safe to call even if never started, and safe to call
    /// concurrently with an in-flight callback (the provider owns callback
    /// teardown).
    pub fn stop(&self) {
        let mut lifecycle = self.lock_lifecycle();
        let was_running = self.running.swap(false, Ordering::SeqCst);
        Self::close_streams(&mut lifecycle);
        if was_running {
            let _ = self.event_tx.send(Event::Stopped);
            info!("audio engine stopped");
        }
    }

    /// Whether streams are currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Set input gain (linear). Clamped to a sane range; effective on the
    /// next processed sample.
    pub fn set_microphone_gain(&self, gain: f32) {
        self.controls.set_microphone_gain(gain);
    }

    pub fn set_noise_suppression_enabled(&self, enabled: bool) {
        self.controls.set_noise_suppression_enabled(enabled);
    }

    pub fn set_dynamics_enabled(&self, enabled: bool) {
        self.controls.set_dynamics_enabled(enabled);
    }

    /// Switch between live capture and the pink-noise self-test signal.
    /// The playback callback re-reads the flag each buffer; whether a
    /// capture stream exists is decided at `start()`.
    pub fn set_test_mode(&self, enabled: bool) {
        self.controls.set_test_mode(enabled);
    }

    /// Store up to `min(gains.len(), EQ_BAND_COUNT)` band gains (dB,
    /// clamped) and recompute the affected pending coefficients. The audio
    /// thread adopts them at its next buffer.
    pub fn set_equalizer_bands(&self, gains: &[f32]) {
        for (band, &gain_db) in gains.iter().take(EQ_BAND_COUNT).enumerate() {
            self.controls.set_band_gain_db(band, gain_db);
            self.recompute_band(band);
        }
    }

    /// Next pending engine event, if any (non-blocking).
    pub fn poll_event(&self) -> Option<Event> {
        self.event_rx.try_recv().ok()
    }

    /// Next engine event (blocking).
    pub fn wait_event(&self) -> Option<Event> {
        self.event_rx.recv().ok()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn recompute_band(&self, band: usize) {
        let gain_db = self.controls.band_gain_db(band);
        self.band_slots[band].store(peaking_coefficients(
            EQ_BAND_FREQUENCIES[band],
            self.settings.sample_rate as f32,
            gain_db,
            DEFAULT_Q,
        ));
    }

    fn recompute_all_bands(&self) {
        for band in 0..EQ_BAND_COUNT {
            self.recompute_band(band);
        }
    }

    fn close_streams(lifecycle: &mut Lifecycle<P>) {
        if let Some(id) = lifecycle.capture.take() {
            lifecycle.provider.stop(id);
            lifecycle.provider.close(id);
        }
        if let Some(id) = lifecycle.playback.take() {
            lifecycle.provider.stop(id);
            lifecycle.provider.close(id);
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle<P>> {
        // Recover the guard if a previous holder panicked; the guarded
        // handles are still structurally valid.
        match self.lifecycle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<P: StreamProvider> Drop for AudioEngine<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
