//! Biquad Filter Section
//!
//! Single second-order IIR filter (transposed direct-form II) with
//! double-buffered coefficients. The control thread writes new coefficients
//! into a shared *pending* slot; the audio thread copies pending into its
//! privately-owned *active* set at a buffer boundary via [`BiquadSection::adopt`].
//! Adoption never touches the delay registers, so a coefficient change
//! produces a continuous transition instead of a click.

use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::sync::Arc;

/// How many times a reader retries a torn slot read before giving up and
/// keeping its current active coefficients.
const MAX_READ_ATTEMPTS: usize = 8;

/// Coefficient set for one second-order section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Coefficients {
    /// Unity passthrough (`y = x`).
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn to_words(self) -> [u32; 5] {
        [
            self.b0.to_bits(),
            self.b1.to_bits(),
            self.b2.to_bits(),
            self.a1.to_bits(),
            self.a2.to_bits(),
        ]
    }

    fn from_words(words: [u32; 5]) -> Self {
        Self {
            b0: f32::from_bits(words[0]),
            b1: f32::from_bits(words[1]),
            b2: f32::from_bits(words[2]),
            a1: f32::from_bits(words[3]),
            a2: f32::from_bits(words[4]),
        }
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Shared *pending* coefficient slot.
///
/// Coefficients are stored as f32 bit-patterns in `AtomicU32` words guarded
/// by a sequence counter, so a five-float set can be read back whole or not
/// at all. [`CoefficientSlot::store`] is callable from any thread; writers
/// serialize on the sequence word and may briefly spin (the control path is
/// allowed to). [`CoefficientSlot::load`] never blocks: a read that races a
/// writer is detected and retried a bounded number of times.
pub struct CoefficientSlot {
    seq: AtomicU32,
    words: [AtomicU32; 5],
}

impl CoefficientSlot {
    pub fn new(initial: Coefficients) -> Self {
        let words = initial.to_words();
        Self {
            seq: AtomicU32::new(0),
            words: words.map(AtomicU32::new),
        }
    }

    /// Store a new pending coefficient set.
    pub fn store(&self, coefficients: Coefficients) {
        let mut seq = self.seq.load(Ordering::Relaxed);
        loop {
            if seq % 2 == 0 {
                // Claim the slot by making the sequence odd.
                match self.seq.compare_exchange_weak(
                    seq,
                    seq.wrapping_add(1),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(observed) => seq = observed,
                }
            } else {
                // Another control-path writer is mid-store.
                std::hint::spin_loop();
                seq = self.seq.load(Ordering::Relaxed);
            }
        }

        for (word, value) in self.words.iter().zip(coefficients.to_words()) {
            word.store(value, Ordering::Relaxed);
        }
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Torn-free read of the pending set, or `None` if a writer was
    /// mid-store on every attempt.
    pub fn load(&self) -> Option<Coefficients> {
        for _ in 0..MAX_READ_ATTEMPTS {
            let before = self.seq.load(Ordering::Acquire);
            if before % 2 != 0 {
                std::hint::spin_loop();
                continue;
            }

            let mut words = [0u32; 5];
            for (value, word) in words.iter_mut().zip(&self.words) {
                *value = word.load(Ordering::Relaxed);
            }

            // The word loads must complete before the sequence is re-checked.
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return Some(Coefficients::from_words(words));
            }
        }
        None
    }
}

impl Default for CoefficientSlot {
    fn default() -> Self {
        Self::new(Coefficients::IDENTITY)
    }
}

/// One second-order section as seen by the audio thread.
///
/// Owns the active coefficients and the z1/z2 delay registers; only
/// [`BiquadSection::process`] mutates the registers, and only
/// [`BiquadSection::adopt`] changes the active coefficients.
pub struct BiquadSection {
    pending: Arc<CoefficientSlot>,
    active: Coefficients,
    z1: f32,
    z2: f32,
}

impl BiquadSection {
    pub fn new() -> Self {
        Self::with_slot(Arc::new(CoefficientSlot::default()))
    }

    /// Build a section around an existing pending slot, adopting whatever
    /// the slot currently holds.
    pub fn with_slot(pending: Arc<CoefficientSlot>) -> Self {
        let active = pending.load().unwrap_or_default();
        Self {
            pending,
            active,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Handle for the control side to write pending coefficients through.
    pub fn pending_slot(&self) -> Arc<CoefficientSlot> {
        Arc::clone(&self.pending)
    }

    /// Copy pending into active. Audio thread only, between buffers.
    /// Leaves the delay registers untouched.
    pub fn adopt(&mut self) {
        if let Some(coefficients) = self.pending.load() {
            self.active = coefficients;
        }
    }

    /// Zero the delay registers. Audio thread only, engine stopped.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Run one sample through the section (transposed direct-form II).
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input * self.active.b0 + self.z1;
        self.z1 = input * self.active.b1 + self.z2 - self.active.a1 * output;
        self.z2 = input * self.active.b2 - self.active.a2 * output;
        output
    }
}

impl Default for BiquadSection {
    fn default() -> Self {
        Self::new()
    }
}
