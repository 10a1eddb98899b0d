//! Auricle Bridge - Host Boundary Layer
//!
//! Exposes the engine's control surface to a host that calls in from a
//! managed language. Platform streams are not `Send`, so each engine lives
//! on its own dedicated thread; an [`EngineController`] forwards commands
//! to it over a channel, and an [`EngineRegistry`] maps opaque ids to
//! controllers so foreign callers never hold Rust objects directly. The
//! core itself has no global state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{error, info};

use auricle_core::{AudioEngine, CpalProvider, EngineError, EngineResult, EngineSettings};

/// Install the process-wide tracing subscriber. Call once from the host
/// before creating engines; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("auricle=debug")
        .try_init();
}

enum Command {
    Start { reply: Sender<bool> },
    Stop { reply: Sender<()> },
    SetMicrophoneGain(f32),
    SetNoiseSuppressionEnabled(bool),
    SetDynamicsEnabled(bool),
    SetTestMode(bool),
    SetEqualizerBands(Vec<f32>),
    Shutdown,
}

/// Owns one engine on a dedicated thread and forwards the control surface
/// to it. `start`/`stop` are synchronous via reply channels; the setters
/// are fire-and-forget.
pub struct EngineController {
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl EngineController {
    /// Spawn the engine thread. Fails if the settings are invalid or the
    /// thread cannot be created; stream errors surface later, from
    /// `start()`.
    pub fn spawn(settings: EngineSettings) -> EngineResult<Self> {
        let (commands, receiver) = bounded::<Command>(32);
        let (ready_tx, ready_rx) = bounded::<EngineResult<()>>(1);

        let thread = thread::Builder::new()
            .name("auricle-engine".into())
            .spawn(move || {
                let engine = match AudioEngine::new(settings, CpalProvider::new()) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                Self::run(engine, receiver);
            })
            .map_err(|e| EngineError::Thread(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                thread: Some(thread),
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => Err(EngineError::Thread(
                "engine thread exited during startup".into(),
            )),
        }
    }

    fn run(engine: AudioEngine<CpalProvider>, commands: Receiver<Command>) {
        info!("engine thread started");
        for command in commands {
            match command {
                Command::Start { reply } => {
                    let ok = match engine.start() {
                        Ok(()) => true,
                        Err(err) => {
                            error!(%err, "engine start failed");
                            false
                        }
                    };
                    let _ = reply.send(ok);
                }
                Command::Stop { reply } => {
                    engine.stop();
                    let _ = reply.send(());
                }
                Command::SetMicrophoneGain(gain) => engine.set_microphone_gain(gain),
                Command::SetNoiseSuppressionEnabled(enabled) => {
                    engine.set_noise_suppression_enabled(enabled)
                }
                Command::SetDynamicsEnabled(enabled) => engine.set_dynamics_enabled(enabled),
                Command::SetTestMode(enabled) => engine.set_test_mode(enabled),
                Command::SetEqualizerBands(gains) => engine.set_equalizer_bands(&gains),
                Command::Shutdown => break,
            }
        }
        engine.stop();
        info!("engine thread exited");
    }

    /// Start the engine; `false` if the streams could not be opened or
    /// started. The caller may retry.
    pub fn start(&self) -> bool {
        let (reply, response) = bounded(1);
        if self.commands.send(Command::Start { reply }).is_err() {
            return false;
        }
        response.recv().unwrap_or(false)
    }

    /// Stop the engine; returns once the streams are released.
    pub fn stop(&self) {
        let (reply, response) = bounded(1);
        if self.commands.send(Command::Stop { reply }).is_ok() {
            let _ = response.recv();
        }
    }

    pub fn set_microphone_gain(&self, gain: f32) {
        let _ = self.commands.send(Command::SetMicrophoneGain(gain));
    }

    pub fn set_noise_suppression_enabled(&self, enabled: bool) {
        let _ = self
            .commands
            .send(Command::SetNoiseSuppressionEnabled(enabled));
    }

    pub fn set_dynamics_enabled(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetDynamicsEnabled(enabled));
    }

    pub fn set_test_mode(&self, enabled: bool) {
        let _ = self.commands.send(Command::SetTestMode(enabled));
    }

    pub fn set_equalizer_bands(&self, gains: &[f32]) {
        let _ = self
            .commands
            .send(Command::SetEqualizerBands(gains.to_vec()));
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Opaque engine handle handed across the language boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

struct RegistryState {
    engines: HashMap<u64, EngineController>,
    next_id: u64,
}

/// Explicit id -> engine map owned by the boundary layer. The host keeps
/// only `EngineId` values; everything else stays on this side.
pub struct EngineRegistry {
    state: Mutex<RegistryState>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                engines: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Create an engine and return its handle.
    pub fn create(&self, settings: EngineSettings) -> EngineResult<EngineId> {
        let controller = EngineController::spawn(settings)?;
        let mut state = self.lock_state();
        state.next_id += 1;
        let id = state.next_id;
        state.engines.insert(id, controller);
        info!(id, "engine registered");
        Ok(EngineId(id))
    }

    /// Destroy an engine, stopping it first. Returns whether the handle
    /// was known.
    pub fn destroy(&self, id: EngineId) -> bool {
        let removed = self.lock_state().engines.remove(&id.0);
        if removed.is_some() {
            info!(id = id.0, "engine destroyed");
        }
        // Dropping the controller shuts the engine thread down.
        removed.is_some()
    }

    pub fn start(&self, id: EngineId) -> bool {
        self.with_engine(id, |engine| engine.start()).unwrap_or(false)
    }

    pub fn stop(&self, id: EngineId) {
        self.with_engine(id, |engine| engine.stop());
    }

    pub fn set_microphone_gain(&self, id: EngineId, gain: f32) {
        self.with_engine(id, |engine| engine.set_microphone_gain(gain));
    }

    pub fn set_noise_suppression_enabled(&self, id: EngineId, enabled: bool) {
        self.with_engine(id, |engine| engine.set_noise_suppression_enabled(enabled));
    }

    pub fn set_dynamics_enabled(&self, id: EngineId, enabled: bool) {
        self.with_engine(id, |engine| engine.set_dynamics_enabled(enabled));
    }

    pub fn set_test_mode(&self, id: EngineId, enabled: bool) {
        self.with_engine(id, |engine| engine.set_test_mode(enabled));
    }

    pub fn set_equalizer_bands(&self, id: EngineId, gains: &[f32]) {
        self.with_engine(id, |engine| engine.set_equalizer_bands(gains));
    }

    fn with_engine<R>(&self, id: EngineId, f: impl FnOnce(&EngineController) -> R) -> Option<R> {
        let state = self.lock_state();
        state.engines.get(&id.0).map(f)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
