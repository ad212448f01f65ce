//! Per-block processing context.
//!
//! The host fills a [`BlockContext`] for every render call. Transport fields
//! come from the external tempo clock and are forwarded untouched; nodes read
//! them but the engine never advances them.

/// Musical transport position for the current block.
///
/// Provides tempo and playback state for nodes that quantize to the beat
/// grid (tempo-synced LFOs, beat triggers).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransportState {
    /// Whether playback is currently active.
    pub playing: bool,
    /// Position of the block's first frame, in samples from the start.
    pub sample_position: u64,
    /// Zero-based bar index at the block's first frame.
    pub bar: u32,
    /// Zero-based beat position within the bar, fractional.
    pub beat: f64,
    /// Current tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Time signature numerator (beats per bar).
    pub beats_per_bar: u8,
    /// Time signature denominator (beat unit).
    pub beat_unit: u8,
    /// Set when the position jumped (seek, loop) since the previous block.
    pub jumped: bool,
}

impl TransportState {
    /// Creates a stopped transport at the origin, 120 BPM in 4/4.
    pub fn new() -> Self {
        Self {
            playing: false,
            sample_position: 0,
            bar: 0,
            beat: 0.0,
            tempo_bpm: 120.0,
            beats_per_bar: 4,
            beat_unit: 4,
            jumped: false,
        }
    }

    /// Creates a transport that is playing from the origin at the given tempo.
    pub fn playing_at(tempo_bpm: f64) -> Self {
        Self {
            playing: true,
            tempo_bpm,
            ..Self::new()
        }
    }

    /// Absolute position in beats since the start of the timeline.
    pub fn song_beat(&self) -> f64 {
        self.bar as f64 * self.beats_per_bar as f64 + self.beat
    }

    /// Duration of one beat in samples, `None` when the tempo is unusable.
    pub fn samples_per_beat(&self, sample_rate: f32) -> Option<f64> {
        if self.tempo_bpm > 0.0 && self.tempo_bpm.is_finite() && sample_rate > 0.0 {
            Some(sample_rate as f64 * 60.0 / self.tempo_bpm)
        } else {
            None
        }
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}

/// A beat-grid boundary that falls inside the current block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBoundary {
    /// Frame offset within the block.
    pub offset: usize,
    /// Absolute index of the grid step since the start of the timeline.
    pub index: u64,
}

/// Context provided to nodes during processing.
///
/// Read-only to every node for the duration of one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockContext {
    /// Number of valid frames in this block.
    pub frames: usize,
    /// The audio sample rate in Hz.
    pub sample_rate: f32,
    /// Transport position at the block's first frame.
    pub transport: TransportState,
}

impl BlockContext {
    /// Creates a context with a stopped transport.
    pub fn new(frames: usize, sample_rate: f32) -> Self {
        Self {
            frames,
            sample_rate,
            transport: TransportState::new(),
        }
    }

    /// Creates a context with transport information.
    pub fn with_transport(frames: usize, sample_rate: f32, transport: TransportState) -> Self {
        Self {
            frames,
            sample_rate,
            transport,
        }
    }

    /// Duration of the block in seconds.
    pub fn block_duration(&self) -> f32 {
        self.frames as f32 / self.sample_rate
    }

    /// Duration of one beat in samples, if the transport has a usable tempo.
    pub fn samples_per_beat(&self) -> Option<f64> {
        self.transport.samples_per_beat(self.sample_rate)
    }

    /// Converts a frequency in Hz to a phase increment in cycles per sample.
    pub fn cycles_per_sample(&self, frequency: f32) -> f32 {
        frequency / self.sample_rate
    }

    /// Finds the first boundary of a `division`-per-beat grid inside this block.
    ///
    /// Only the current block's transport is consulted. A boundary belongs to
    /// the block containing its nearest frame, so consecutive blocks never both
    /// report it. Returns `None` while stopped or if the next boundary lies
    /// beyond the block.
    pub fn next_grid_boundary(&self, division: u32) -> Option<GridBoundary> {
        if !self.transport.playing || division == 0 {
            return None;
        }
        let samples_per_step = self.samples_per_beat()? / division as f64;
        let position = self.transport.song_beat() * division as f64;
        let half_frame = 0.5 / samples_per_step;
        let next = (position - half_frame).ceil();
        let offset = ((next - position) * samples_per_step).round().max(0.0) as usize;
        (offset < self.frames).then_some(GridBoundary {
            offset,
            index: next.max(0.0) as u64,
        })
    }
}

impl Default for BlockContext {
    fn default() -> Self {
        Self::new(128, 48000.0)
    }
}
