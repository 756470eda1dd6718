//! Self-scheduling sound voices
//!
//! A [`Voice`] is one complete signal chain: source -> optional filter ->
//! gain envelope -> bus. Once handed to the
//! [`DeviceSession`](crate::engine::DeviceSession) it belongs to the render
//! thread, which drops it after its stop time or when a one-shot buffer
//! runs out.

use std::fmt;
use std::sync::Arc;

use crate::dsp::{Biquad, Envelope, FilterKind, Oscillator, Waveform};

/// Identifier assigned to a voice when it is scheduled
pub type VoiceId = u64;

/// Mix bus; every bus feeds the single master volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    /// Procedural background layers
    Ambient,
    /// Pre-recorded tracks
    Media,
    /// One-shot UI cues
    Effects,
}

impl Bus {
    pub const ALL: [Bus; 3] = [Bus::Ambient, Bus::Media, Bus::Effects];

    pub fn index(self) -> usize {
        match self {
            Bus::Ambient => 0,
            Bus::Media => 1,
            Bus::Effects => 2,
        }
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::Ambient => write!(f, "ambient"),
            Bus::Media => write!(f, "media"),
            Bus::Effects => write!(f, "effects"),
        }
    }
}

/// Where a voice's raw signal comes from
#[derive(Debug, Clone)]
pub enum Source {
    Oscillator {
        osc: Oscillator,
        /// Frequency in Hz, relative to voice start
        frequency: Envelope,
    },
    Buffer {
        samples: Arc<[f32]>,
        position: usize,
        looping: bool,
    },
}

/// Slow oscillator added to an oscillator source's frequency
#[derive(Debug, Clone)]
pub struct Lfo {
    osc: Oscillator,
    /// Modulation rate in Hz
    pub rate: f64,
    /// Peak frequency deviation in Hz
    pub depth: f64,
    /// Absolute device time at which modulation begins
    pub start: f64,
}

impl Lfo {
    pub fn new(rate: f64, depth: f64, start: f64) -> Self {
        Self {
            osc: Oscillator::new(Waveform::Sine),
            rate,
            depth,
            start,
        }
    }
}

#[derive(Debug, Clone)]
struct FilterStage {
    biquad: Biquad,
    cutoff: Envelope,
}

/// One scheduled sound
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    bus: Bus,
    source: Source,
    filter: Option<FilterStage>,
    gain: Envelope,
    start: f64,
    stop: Option<f64>,
    lfo: Option<Lfo>,
}

impl Voice {
    fn with_source(source: Source) -> Self {
        Self {
            id: 0,
            bus: Bus::Effects,
            source,
            filter: None,
            gain: Envelope::constant(1.0),
            start: 0.0,
            stop: None,
            lfo: None,
        }
    }

    /// Oscillator voice whose frequency follows `frequency`
    pub fn oscillator(waveform: Waveform, frequency: Envelope) -> Self {
        Self::with_source(Source::Oscillator {
            osc: Oscillator::new(waveform),
            frequency,
        })
    }

    /// Sample-buffer voice; one-shot buffers end themselves when exhausted
    pub fn buffer(samples: Arc<[f32]>, looping: bool) -> Self {
        Self::buffer_from(samples, looping, 0)
    }

    /// Sample-buffer voice that begins reading at frame `position`
    pub fn buffer_from(samples: Arc<[f32]>, looping: bool, position: usize) -> Self {
        Self::with_source(Source::Buffer {
            samples,
            position,
            looping,
        })
    }

    pub fn on_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_filter(mut self, kind: FilterKind, q: f64, cutoff: Envelope) -> Self {
        self.filter = Some(FilterStage {
            biquad: Biquad::new(kind, q),
            cutoff,
        });
        self
    }

    pub fn with_gain(mut self, gain: Envelope) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_lfo(mut self, lfo: Lfo) -> Self {
        self.lfo = Some(lfo);
        self
    }

    /// Absolute device time at which the voice begins
    pub fn starting_at(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    /// Absolute device time at which the voice ends
    pub fn stopping_at(mut self, stop: f64) -> Self {
        self.stop = Some(stop);
        self
    }

    pub(crate) fn assign_id(&mut self, id: VoiceId) {
        self.id = id;
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn bus(&self) -> Bus {
        self.bus
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn gain(&self) -> &Envelope {
        &self.gain
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> Option<f64> {
        self.stop
    }

    pub fn lfo(&self) -> Option<&Lfo> {
        self.lfo.as_ref()
    }

    pub fn filter_kind(&self) -> Option<FilterKind> {
        self.filter.as_ref().map(|f| f.biquad.kind())
    }

    /// Bring the stop time forward to `at` (never pushes it later)
    pub(crate) fn stop_at(&mut self, at: f64) {
        self.stop = Some(self.stop.map_or(at, |s| s.min(at)));
    }

    /// Render one sample at absolute device time `time`
    ///
    /// Returns `None` once the voice is finished and can be released.
    pub(crate) fn next_sample(&mut self, time: f64, sample_rate: f64) -> Option<f32> {
        if let Some(stop) = self.stop {
            if time >= stop {
                return None;
            }
        }
        if time < self.start {
            return Some(0.0);
        }
        let local = time - self.start;

        let raw = match &mut self.source {
            Source::Oscillator { osc, frequency } => {
                let mut hz = frequency.value_at(local) as f64;
                if let Some(lfo) = self.lfo.as_mut() {
                    if time >= lfo.start {
                        hz += lfo.osc.next_sample(lfo.rate, sample_rate) as f64 * lfo.depth;
                    }
                }
                osc.next_sample(hz.max(0.0), sample_rate)
            }
            Source::Buffer {
                samples,
                position,
                looping,
            } => {
                if *position >= samples.len() {
                    if *looping && !samples.is_empty() {
                        *position = 0;
                    } else {
                        return None;
                    }
                }
                let s = samples[*position];
                *position += 1;
                s
            }
        };

        let filtered = match self.filter.as_mut() {
            Some(stage) => {
                let cutoff = stage.cutoff.value_at(local) as f64;
                stage.biquad.process(raw, cutoff, sample_rate)
            }
            None => raw,
        };

        Some(filtered * self.gain.value_at(local))
    }
}
