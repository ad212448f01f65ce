//! Constant-tempo transport clock.
//!
//! The engine never advances musical time itself; a host clock produces one
//! [`TransportState`] per block. [`SteadyTransport`] is the simplest such
//! clock and is what the demo binary and the tests drive the engine with.

use crate::dsp::{BlockContext, TransportState};

/// A transport running at a fixed tempo and time signature.
#[derive(Clone, Debug)]
pub struct SteadyTransport {
    sample_rate: f32,
    tempo_bpm: f64,
    beats_per_bar: u8,
    beat_unit: u8,
    playing: bool,
    sample_position: u64,
    /// Song position in beats at the next block's first frame.
    beats: f64,
    /// Set by a seek, reported with the next block.
    jumped: bool,
}

impl SteadyTransport {
    /// Creates a stopped transport at the origin in 4/4.
    pub fn new(sample_rate: f32, tempo_bpm: f64) -> Self {
        Self {
            sample_rate,
            tempo_bpm,
            beats_per_bar: 4,
            beat_unit: 4,
            playing: false,
            sample_position: 0,
            beats: 0.0,
            jumped: false,
        }
    }

    /// Sets the time signature. A zero numerator is treated as one.
    pub fn with_time_signature(mut self, beats_per_bar: u8, beat_unit: u8) -> Self {
        self.beats_per_bar = beats_per_bar.max(1);
        self.beat_unit = beat_unit;
        self
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    /// Changes the tempo from the next block on. The song position is kept.
    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        self.tempo_bpm = tempo_bpm;
    }

    /// Song position in beats at the start of the next block.
    pub fn position_beats(&self) -> f64 {
        self.beats
    }

    /// Moves to a new song position. The next block reports a jump.
    pub fn seek_to_beat(&mut self, beat: f64) {
        self.beats = beat.max(0.0);
        self.sample_position = self
            .current_state()
            .samples_per_beat(self.sample_rate)
            .map_or(0, |spb| (self.beats * spb).round() as u64);
        self.jumped = true;
    }

    fn current_state(&self) -> TransportState {
        let beats_per_bar = self.beats_per_bar.max(1) as f64;
        let bar = (self.beats / beats_per_bar).floor();
        TransportState {
            playing: self.playing,
            sample_position: self.sample_position,
            bar: bar as u32,
            beat: self.beats - bar * beats_per_bar,
            tempo_bpm: self.tempo_bpm,
            beats_per_bar: self.beats_per_bar,
            beat_unit: self.beat_unit,
            jumped: self.jumped,
        }
    }

    /// Returns the context for the next block of `frames` and advances past it.
    pub fn next_block(&mut self, frames: usize) -> BlockContext {
        let transport = self.current_state();
        self.jumped = false;
        if self.playing {
            if let Some(spb) = transport.samples_per_beat(self.sample_rate) {
                self.beats += frames as f64 / spb;
            }
            self.sample_position += frames as u64;
        }
        BlockContext::with_transport(frames, self.sample_rate, transport)
    }
}
