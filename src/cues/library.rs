//! Catalog of one-shot UI cues
//!
//! Each [`Cue`] has a fixed recipe: a list of [`SoundEvent`]s with their
//! offsets from the trigger time and base peak levels. [`CueLibrary::plan`]
//! resolves a recipe to concrete events at the levels that will actually
//! play (ducked while background music is on); [`CueLibrary::play`] hands
//! them to the device. A fired cue always plays to completion.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::debug;

use crate::config::{clamp_unit, AudioConfig};
use crate::dsp::Waveform;
use crate::engine::{DeviceSession, VoiceId};
use crate::error::{MindclearError, Result};
use crate::rng::Rng;
use crate::synth::tone::SweepSpec;
use crate::synth::{NoiseSynthesizer, ToneSpec, ToneSynthesizer};

use super::throttle::TypingThrottle;

/// Pitches the typing tick picks from
pub const TYPE_FREQUENCIES: [f64; 6] = [380.0, 420.0, 450.0, 400.0, 390.0, 440.0];

/// Length of the burn cue in seconds
pub const BURN_SECS: f64 = 1.5;

// ============================================================================
// Emotions
// ============================================================================

/// Moods the journal can detect, each with its own short motif
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Sad,
    Anxious,
    Stressed,
    Angry,
    Confused,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Anxious,
        Emotion::Stressed,
        Emotion::Angry,
        Emotion::Confused,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Anxious => "anxious",
            Emotion::Stressed => "stressed",
            Emotion::Angry => "angry",
            Emotion::Confused => "confused",
        }
    }

    /// Indonesian label used by the journal's classifier
    pub fn indonesian(&self) -> &'static str {
        match self {
            Emotion::Happy => "bahagia",
            Emotion::Sad => "sedih",
            Emotion::Anxious => "cemas",
            Emotion::Stressed => "stres",
            Emotion::Angry => "marah",
            Emotion::Confused => "bingung",
        }
    }

    fn recipe(&self) -> Vec<SoundEvent> {
        use Waveform::*;
        match self {
            // Bright major triad, all at once
            Emotion::Happy => vec![
                SoundEvent::tone(0.0, 523.25, 0.5, Sine, 0.08),
                SoundEvent::tone(0.0, 659.25, 0.5, Sine, 0.06),
                SoundEvent::tone(0.0, 783.99, 0.5, Sine, 0.04),
            ],
            Emotion::Sad => vec![
                SoundEvent::tone(0.0, 440.0, 0.8, Sine, 0.06),
                SoundEvent::tone(0.2, 523.25, 0.6, Sine, 0.04),
            ],
            // Two triangles 9 Hz apart beat against each other
            Emotion::Anxious => vec![
                SoundEvent::tone(0.0, 660.0, 0.3, Triangle, 0.05),
                SoundEvent::tone(0.1, 669.0, 0.3, Triangle, 0.05),
            ],
            Emotion::Stressed => (0..3)
                .map(|i| SoundEvent::tone(i as f64 * 0.15, 800.0, 0.1, Square, 0.06))
                .collect(),
            Emotion::Angry => vec![
                SoundEvent::tone(0.0, 220.0, 0.4, Sawtooth, 0.08),
                SoundEvent::tone(0.2, 440.0, 0.2, Square, 0.06),
            ],
            Emotion::Confused => [330.0, 370.0, 440.0, 392.0]
                .iter()
                .enumerate()
                .map(|(i, &hz)| SoundEvent::tone(i as f64 * 0.2, hz, 0.2, Sine, 0.04))
                .collect(),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Emotion {
    type Err = MindclearError;

    /// Accepts English or Indonesian names, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.name() == needle || e.indonesian() == needle)
            .ok_or_else(|| MindclearError::UnknownCue {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Cues
// ============================================================================

/// Every cue the library can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Click,
    Success,
    Whoosh,
    Burn,
    Notification,
    Type,
    Emotion(Emotion),
}

impl Cue {
    pub const ALL: [Cue; 12] = [
        Cue::Click,
        Cue::Success,
        Cue::Whoosh,
        Cue::Burn,
        Cue::Notification,
        Cue::Type,
        Cue::Emotion(Emotion::Happy),
        Cue::Emotion(Emotion::Sad),
        Cue::Emotion(Emotion::Anxious),
        Cue::Emotion(Emotion::Stressed),
        Cue::Emotion(Emotion::Angry),
        Cue::Emotion(Emotion::Confused),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Cue::Click => "click",
            Cue::Success => "success",
            Cue::Whoosh => "whoosh",
            Cue::Burn => "burn",
            Cue::Notification => "notification",
            Cue::Type => "type",
            Cue::Emotion(emotion) => emotion.name(),
        }
    }

    /// Events at base level, before ducking
    pub fn recipe(&self, rng: &mut Rng) -> Vec<SoundEvent> {
        use Waveform::*;
        match self {
            // Square body with a sine harmonic on top
            Cue::Click => vec![
                SoundEvent::tone(0.0, 800.0, 0.08, Square, 0.15),
                SoundEvent::tone(0.03, 1200.0, 0.04, Sine, 0.1),
            ],
            // C major arpeggio up to the octave
            Cue::Success => vec![
                SoundEvent::tone(0.0, 523.25, 0.2, Sine, 0.12),
                SoundEvent::tone(0.1, 659.25, 0.2, Sine, 0.1),
                SoundEvent::tone(0.2, 783.99, 0.3, Sine, 0.08),
                SoundEvent::tone(0.35, 1046.5, 0.2, Sine, 0.06),
            ],
            Cue::Whoosh => vec![SoundEvent::Sweep {
                delay: 0.0,
                spec: SweepSpec {
                    waveform: Sawtooth,
                    from_hz: 1200.0,
                    to_hz: 80.0,
                    cutoff_from: 1500.0,
                    cutoff_to: 100.0,
                    filter_q: 5.0,
                    duration: 0.6,
                    peak_volume: 0.15,
                },
            }],
            Cue::Burn => vec![SoundEvent::Burn {
                delay: 0.0,
                duration: BURN_SECS,
                peak_volume: 0.1,
            }],
            Cue::Notification => vec![
                SoundEvent::tone(0.0, 800.0, 0.15, Sine, 0.1),
                SoundEvent::tone(0.1, 1000.0, 0.2, Sine, 0.08),
                SoundEvent::tone(0.2, 1200.0, 0.1, Sine, 0.05),
            ],
            Cue::Type => {
                let hz = rng.choose(&TYPE_FREQUENCIES).copied().unwrap_or(400.0);
                vec![SoundEvent::tone(0.0, hz, 0.04, Square, 0.08)]
            }
            Cue::Emotion(emotion) => emotion.recipe(),
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cue {
    type Err = MindclearError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        if let Some(cue) = Cue::ALL.into_iter().find(|c| c.name() == needle) {
            return Ok(cue);
        }
        needle.parse::<Emotion>().map(Cue::Emotion)
    }
}

// ============================================================================
// Sound events
// ============================================================================

/// One sound within a cue, offset `delay` seconds from the trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundEvent {
    Tone { delay: f64, spec: ToneSpec },
    Sweep { delay: f64, spec: SweepSpec },
    Burn {
        delay: f64,
        duration: f64,
        peak_volume: f32,
    },
}

impl SoundEvent {
    fn tone(delay: f64, frequency: f64, duration: f64, waveform: Waveform, peak: f32) -> Self {
        SoundEvent::Tone {
            delay,
            spec: ToneSpec::new(frequency, duration, waveform, peak),
        }
    }

    pub fn delay(&self) -> f64 {
        match self {
            SoundEvent::Tone { delay, .. }
            | SoundEvent::Sweep { delay, .. }
            | SoundEvent::Burn { delay, .. } => *delay,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            SoundEvent::Tone { spec, .. } => spec.duration,
            SoundEvent::Sweep { spec, .. } => spec.duration,
            SoundEvent::Burn { duration, .. } => *duration,
        }
    }

    pub fn peak_volume(&self) -> f32 {
        match self {
            SoundEvent::Tone { spec, .. } => spec.peak_volume,
            SoundEvent::Sweep { spec, .. } => spec.peak_volume,
            SoundEvent::Burn { peak_volume, .. } => *peak_volume,
        }
    }

    /// The same event at a different peak level
    pub fn with_peak(self, peak: f32) -> Self {
        match self {
            SoundEvent::Tone { delay, spec } => SoundEvent::Tone {
                delay,
                spec: spec.with_peak(peak),
            },
            SoundEvent::Sweep { delay, spec } => SoundEvent::Sweep {
                delay,
                spec: SweepSpec {
                    peak_volume: peak,
                    ..spec
                },
            },
            SoundEvent::Burn {
                delay, duration, ..
            } => SoundEvent::Burn {
                delay,
                duration,
                peak_volume: peak,
            },
        }
    }

    /// Seconds from trigger until this event is silent
    pub fn end_time(&self) -> f64 {
        self.delay() + self.duration()
    }
}

// ============================================================================
// Library
// ============================================================================

/// Plays cues, ducking them under background music
#[derive(Debug)]
pub struct CueLibrary {
    enabled: bool,
    ducking_factor: f32,
    throttle: TypingThrottle,
    rng: Rng,
    noise: NoiseSynthesizer,
}

impl CueLibrary {
    pub fn new(config: &AudioConfig) -> Self {
        Self::with_rng(config, Rng::default())
    }

    pub fn with_rng(config: &AudioConfig, mut rng: Rng) -> Self {
        let noise = NoiseSynthesizer::new(rng.fork());
        Self {
            enabled: true,
            ducking_factor: clamp_unit(config.ducking_factor),
            throttle: TypingThrottle::new(Duration::from_millis(config.typing_interval_ms)),
            rng,
            noise,
        }
    }

    /// Level a cue of base level `base` plays at
    pub fn adjusted_volume(&self, base: f32, music_playing: bool) -> f32 {
        if music_playing {
            base * self.ducking_factor
        } else {
            base
        }
    }

    /// Resolve `cue` to the events that would play right now
    pub fn plan(&mut self, cue: Cue, music_playing: bool) -> Vec<SoundEvent> {
        cue.recipe(&mut self.rng)
            .into_iter()
            .map(|event| {
                let peak = self.adjusted_volume(event.peak_volume(), music_playing);
                event.with_peak(peak)
            })
            .collect()
    }

    /// Fire `cue`; returns the number of voices scheduled
    ///
    /// Nothing plays while cues are disabled or the device is unavailable.
    pub fn play(&mut self, device: &mut DeviceSession, cue: Cue, music_playing: bool) -> usize {
        if !self.enabled {
            debug!("Cue {} skipped: sounds disabled", cue);
            return 0;
        }
        if !device.ensure_ready() {
            return 0;
        }

        let events = self.plan(cue, music_playing);
        let scheduled = events
            .iter()
            .filter_map(|event| self.schedule(device, event))
            .count();
        debug!("Cue {}: {} voices", cue, scheduled);
        scheduled
    }

    fn schedule(&mut self, device: &mut DeviceSession, event: &SoundEvent) -> Option<VoiceId> {
        match *event {
            SoundEvent::Tone { delay, spec } => ToneSynthesizer::play_after(device, spec, delay),
            SoundEvent::Sweep { delay, spec } => {
                let start = device.now() + delay;
                device.schedule(ToneSynthesizer::sweep_voice(&spec, start))
            }
            SoundEvent::Burn {
                delay,
                duration,
                peak_volume,
            } => {
                let start = device.now() + delay;
                let voice =
                    self.noise
                        .burn_voice(duration, peak_volume, device.sample_rate(), start);
                device.schedule(voice)
            }
        }
    }

    /// Typing tick, dropped if another got through within the interval
    ///
    /// Returns whether the tick fired.
    pub fn play_type_throttled(
        &mut self,
        device: &mut DeviceSession,
        music_playing: bool,
        now: Instant,
    ) -> bool {
        // The window advances even while cues are muted
        if !self.throttle.try_fire(now) || !self.enabled {
            return false;
        }
        self.play(device, Cue::Type, music_playing) > 0
    }

    /// Flip cues on or off; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        debug!("Sound cues {}", if self.enabled { "enabled" } else { "disabled" });
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ducking_factor(&self) -> f32 {
        self.ducking_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NullBackend, OfflineBackend, OfflineHandle};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn library() -> CueLibrary {
        CueLibrary::with_rng(&AudioConfig::default(), Rng::new_with_seed(9))
    }

    fn device() -> (DeviceSession, OfflineHandle) {
        let backend = OfflineBackend::new(48000);
        let handle = backend.handle();
        let mut device = DeviceSession::with_backend(AudioConfig::default(), Box::new(backend));
        device.resume();
        (device, handle)
    }

    #[test_case(Cue::Click, 2)]
    #[test_case(Cue::Success, 4)]
    #[test_case(Cue::Whoosh, 1)]
    #[test_case(Cue::Burn, 1)]
    #[test_case(Cue::Notification, 3)]
    #[test_case(Cue::Type, 1)]
    #[test_case(Cue::Emotion(Emotion::Happy), 3)]
    #[test_case(Cue::Emotion(Emotion::Stressed), 3)]
    #[test_case(Cue::Emotion(Emotion::Confused), 4)]
    fn test_recipe_sizes(cue: Cue, events: usize) {
        let mut lib = library();
        assert_eq!(lib.plan(cue, false).len(), events);
    }

    #[test]
    fn test_every_cue_is_ducked_by_exactly_the_factor() {
        for cue in Cue::ALL {
            let mut quiet = library();
            let mut ducked = library();
            let base = quiet.plan(cue, false);
            let under_music = ducked.plan(cue, true);

            assert_eq!(base.len(), under_music.len(), "{}", cue);
            for (b, d) in base.iter().zip(under_music.iter()) {
                assert_eq!(d.peak_volume(), b.peak_volume() * 0.7, "{}", cue);
                assert_eq!(d.delay(), b.delay());
            }
        }
    }

    #[test]
    fn test_click_timing() {
        let plan = library().plan(Cue::Click, false);
        assert_eq!(plan[0].delay(), 0.0);
        assert_eq!(plan[1].delay(), 0.03);
        assert_eq!(plan[0].peak_volume(), 0.15);
    }

    #[test]
    fn test_type_pitch_comes_from_the_set() {
        let mut lib = library();
        for _ in 0..20 {
            let plan = lib.plan(Cue::Type, false);
            let SoundEvent::Tone { spec, .. } = plan[0] else {
                panic!("typing tick must be a tone");
            };
            assert!(TYPE_FREQUENCIES.contains(&spec.frequency));
            assert_eq!(spec.waveform, Waveform::Square);
        }
    }

    #[test_case("happy", Emotion::Happy)]
    #[test_case("bahagia", Emotion::Happy)]
    #[test_case("SEDIH", Emotion::Sad)]
    #[test_case("cemas", Emotion::Anxious)]
    #[test_case("stres", Emotion::Stressed)]
    #[test_case("angry", Emotion::Angry)]
    #[test_case(" bingung ", Emotion::Confused)]
    fn test_emotion_names(name: &str, expected: Emotion) {
        assert_eq!(name.parse::<Emotion>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert!("ecstatic".parse::<Emotion>().is_err());
        let err = "boom".parse::<Cue>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CUE");
    }

    #[test]
    fn test_cue_names_round_trip() {
        for cue in Cue::ALL {
            assert_eq!(cue.name().parse::<Cue>().unwrap(), cue);
        }
        assert_eq!("marah".parse::<Cue>().unwrap(), Cue::Emotion(Emotion::Angry));
    }

    #[test]
    fn test_play_schedules_every_event() {
        let (mut device, handle) = device();
        let mut lib = library();
        assert_eq!(lib.play(&mut device, Cue::Success, false), 4);
        assert_eq!(lib.play(&mut device, Cue::Burn, true), 1);

        let out = handle.render(4800);
        assert!(out.iter().any(|s| s.abs() > 1e-4));
    }

    #[test]
    fn test_disabled_cues_are_silent() {
        let (mut device, _handle) = device();
        let mut lib = library();
        assert!(!lib.toggle());
        assert_eq!(lib.play(&mut device, Cue::Click, false), 0);
        assert_eq!(device.voices_scheduled(), 0);
        assert!(lib.toggle());
        assert_eq!(lib.play(&mut device, Cue::Click, false), 2);
    }

    #[test]
    fn test_no_device_means_no_voices() {
        let mut device =
            DeviceSession::with_backend(AudioConfig::default(), Box::new(NullBackend::new(48000)));
        let mut lib = library();
        assert_eq!(lib.play(&mut device, Cue::Whoosh, false), 0);
    }

    #[test]
    fn test_throttled_typing() {
        let (mut device, _handle) = device();
        let mut lib = library();
        let start = Instant::now();

        let burst = (0..6_u64)
            .filter(|&i| {
                lib.play_type_throttled(&mut device, false, start + Duration::from_millis(i * 10))
            })
            .count();
        assert_eq!(burst, 1);

        let later = start + Duration::from_millis(1000);
        let spaced = (0..5_u64)
            .filter(|&i| {
                lib.play_type_throttled(&mut device, false, later + Duration::from_millis(i * 150))
            })
            .count();
        assert_eq!(spaced, 5);
        assert_eq!(device.voices_scheduled(), 6);
    }

    #[test]
    fn test_muted_typing_still_advances_window() {
        let (mut device, _handle) = device();
        let mut lib = library();
        let start = Instant::now();

        lib.set_enabled(false);
        assert!(!lib.play_type_throttled(&mut device, false, start));
        lib.set_enabled(true);
        assert!(!lib.play_type_throttled(&mut device, false, start + Duration::from_millis(50)));
        assert!(lib.play_type_throttled(&mut device, false, start + Duration::from_millis(120)));
        assert_eq!(device.voices_scheduled(), 1);
    }
}
