//! Stream Provider Interface
//!
//! The engine never talks to audio hardware directly; it consumes the
//! [`StreamProvider`] trait, which opens capture/playback streams that
//! deliver fixed-size f32 frame buffers on their own real-time schedule
//! and report terminal errors through a callback. [`CpalProvider`] is the
//! production implementation; tests drive the engine with a simulated one.

use std::collections::HashMap;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::warn;

use crate::error::ProviderError;

/// Opaque handle to an open provider stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub(crate) u64);

/// Parameters for opening a stream. The engine is single-channel; every
/// stream carries mono f32 frames.
#[derive(Debug, Clone, Copy)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub buffer_frames: u32,
}

/// Invoked with each captured buffer. Must not block.
pub type CaptureCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Invoked with each playback buffer to fill. Must not block.
pub type PlaybackCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Invoked when a stream hits a terminal error.
pub type ErrorCallback = Box<dyn FnMut(ProviderError) + Send + 'static>;

/// Platform audio transport as consumed by the engine.
///
/// Opening a stream registers its callbacks but does not start delivery;
/// `start` requests the stream to run, `stop` pauses it, `close` releases
/// it. Implementations own callback teardown: after `close` returns, the
/// callbacks will not be invoked again, but an invocation already in
/// flight is allowed to finish.
pub trait StreamProvider {
    fn open_capture(
        &mut self,
        spec: &StreamSpec,
        on_audio: CaptureCallback,
        on_error: ErrorCallback,
    ) -> Result<StreamId, ProviderError>;

    fn open_playback(
        &mut self,
        spec: &StreamSpec,
        on_audio: PlaybackCallback,
        on_error: ErrorCallback,
    ) -> Result<StreamId, ProviderError>;

    /// Request a different device-side buffer size for an open stream.
    /// Best-effort; providers that fix the size at open time return
    /// [`ProviderError::Unsupported`].
    fn set_buffer_size(&mut self, stream: StreamId, frames: u32) -> Result<(), ProviderError>;

    fn start(&mut self, stream: StreamId) -> Result<(), ProviderError>;

    fn stop(&mut self, stream: StreamId);

    fn close(&mut self, stream: StreamId);
}

/// CPAL-backed stream provider (default host, default devices).
pub struct CpalProvider {
    host: cpal::Host,
    streams: HashMap<StreamId, cpal::Stream>,
    next_id: u64,
}

impl CpalProvider {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            streams: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> StreamId {
        self.next_id += 1;
        StreamId(self.next_id)
    }

    fn cpal_config(spec: &StreamSpec) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(spec.buffer_frames),
        }
    }
}

impl Default for CpalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamProvider for CpalProvider {
    fn open_capture(
        &mut self,
        spec: &StreamSpec,
        mut on_audio: CaptureCallback,
        mut on_error: ErrorCallback,
    ) -> Result<StreamId, ProviderError> {
        let device = self
            .host
            .default_input_device()
            .ok_or(ProviderError::NoDevice)?;
        let config = Self::cpal_config(spec);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| on_audio(data),
                move |err| on_error(ProviderError::Stream(err.to_string())),
                None,
            )
            .map_err(|e| ProviderError::OpenFailed(e.to_string()))?;

        let id = self.next_id();
        self.streams.insert(id, stream);
        Ok(id)
    }

    fn open_playback(
        &mut self,
        spec: &StreamSpec,
        mut on_audio: PlaybackCallback,
        mut on_error: ErrorCallback,
    ) -> Result<StreamId, ProviderError> {
        let device = self
            .host
            .default_output_device()
            .ok_or(ProviderError::NoDevice)?;
        let config = Self::cpal_config(spec);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| on_audio(data),
                move |err| on_error(ProviderError::Stream(err.to_string())),
                None,
            )
            .map_err(|e| ProviderError::OpenFailed(e.to_string()))?;

        let id = self.next_id();
        self.streams.insert(id, stream);
        Ok(id)
    }

    fn set_buffer_size(&mut self, stream: StreamId, _frames: u32) -> Result<(), ProviderError> {
        if !self.streams.contains_key(&stream) {
            return Err(ProviderError::UnknownStream);
        }
        // CPAL fixes the buffer size when the stream is built.
        Err(ProviderError::Unsupported)
    }

    fn start(&mut self, stream: StreamId) -> Result<(), ProviderError> {
        self.streams
            .get(&stream)
            .ok_or(ProviderError::UnknownStream)?
            .play()
            .map_err(|e| ProviderError::StartFailed(e.to_string()))
    }

    fn stop(&mut self, stream: StreamId) {
        if let Some(s) = self.streams.get(&stream) {
            if let Err(err) = s.pause() {
                warn!(%err, "failed to pause stream");
            }
        }
    }

    fn close(&mut self, stream: StreamId) {
        self.streams.remove(&stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_construction() {
        let provider = CpalProvider::new();
        assert!(provider.streams.is_empty());
    }

    #[test]
    fn test_unknown_stream_operations() {
        let mut provider = CpalProvider::new();
        let bogus = StreamId(99);

        assert!(matches!(
            provider.start(bogus),
            Err(ProviderError::UnknownStream)
        ));
        assert!(matches!(
            provider.set_buffer_size(bogus, 512),
            Err(ProviderError::UnknownStream)
        ));
        // stop/close on unknown handles are no-ops.
        provider.stop(bogus);
        provider.close(bogus);
    }

    // Hardware-dependent test
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_playback_on_default_device() {
        let mut provider = CpalProvider::new();
        let spec = StreamSpec {
            sample_rate: 48_000,
            buffer_frames: 256,
        };

        let result = provider.open_playback(
            &spec,
            Box::new(|data| data.fill(0.0)),
            Box::new(|_| {}),
        );
        if let Ok(id) = result {
            assert!(provider.start(id).is_ok());
            provider.stop(id);
            provider.close(id);
        }
    }
}
