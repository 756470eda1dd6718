//! Real-time renderer
//!
//! The renderer lives on the audio device's thread. The control side never
//! touches it directly: it pushes [`RenderCommand`]s through a channel and
//! reads the clock, running flag and voice count from [`SharedState`]
//! atomics. Nothing here blocks.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::engine::voice::{Bus, Voice, VoiceId};

/// Requests from the control thread
#[derive(Debug)]
pub enum RenderCommand {
    /// Take ownership of a voice
    Spawn(Box<Voice>),
    /// End a voice at absolute device time `at`
    Stop { id: VoiceId, at: f64 },
    /// Change one bus level
    SetBusGain { bus: Bus, gain: f32 },
}

/// State readable from both sides of the channel
#[derive(Debug)]
pub struct SharedState {
    sample_rate: u32,
    frames: AtomicU64,
    running: AtomicBool,
    master_gain: AtomicU32,
    active_voices: AtomicUsize,
}

impl SharedState {
    pub fn new(sample_rate: u32, master_gain: f32, running: bool) -> Self {
        Self {
            sample_rate,
            frames: AtomicU64::new(0),
            running: AtomicBool::new(running),
            master_gain: AtomicU32::new(master_gain.to_bits()),
            active_voices: AtomicUsize::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device clock in seconds; frozen while suspended
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn master_gain(&self) -> f32 {
        f32::from_bits(self.master_gain.load(Ordering::Relaxed))
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.master_gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Voices the renderer held after its last block
    pub fn active_voices(&self) -> usize {
        self.active_voices.load(Ordering::Relaxed)
    }
}

/// Mixes every live voice into the output buffer
#[derive(Debug)]
pub struct Renderer {
    shared: Arc<SharedState>,
    commands: Receiver<RenderCommand>,
    voices: Vec<Voice>,
    bus_gains: [f32; 3],
}

impl Renderer {
    pub fn new(
        shared: Arc<SharedState>,
        commands: Receiver<RenderCommand>,
        bus_gains: [f32; 3],
    ) -> Self {
        Self {
            shared,
            commands,
            voices: Vec::with_capacity(64),
            bus_gains,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate()
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                RenderCommand::Spawn(voice) => self.voices.push(*voice),
                RenderCommand::Stop { id, at } => {
                    if let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) {
                        voice.stop_at(at);
                    }
                }
                RenderCommand::SetBusGain { bus, gain } => {
                    self.bus_gains[bus.index()] = gain;
                }
            }
        }
    }

    /// Fill an interleaved buffer of `channels` channels
    ///
    /// While suspended the output is silent and the clock does not advance,
    /// so voices scheduled in the meantime keep their relative timing.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        self.drain_commands();

        if !self.shared.is_running() || channels == 0 {
            out.fill(0.0);
            return;
        }

        let sample_rate = self.shared.sample_rate() as f64;
        let master = self.shared.master_gain();
        let bus_gains = self.bus_gains;
        let mut frame = self.shared.frames.load(Ordering::Acquire);

        for chunk in out.chunks_mut(channels) {
            let time = frame as f64 / sample_rate;
            let mut buses = [0.0_f32; 3];

            self.voices.retain_mut(|voice| match voice.next_sample(time, sample_rate) {
                Some(sample) => {
                    buses[voice.bus().index()] += sample;
                    true
                }
                None => false,
            });

            let mix: f32 = buses
                .iter()
                .zip(bus_gains.iter())
                .map(|(sample, gain)| sample * gain)
                .sum::<f32>()
                * master;

            chunk.fill(mix);
            frame += 1;
        }

        self.shared.frames.store(frame, Ordering::Release);
        self.shared
            .active_voices
            .store(self.voices.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Envelope, Waveform};
    use crossbeam_channel::unbounded;

    fn renderer(running: bool) -> (Renderer, crossbeam_channel::Sender<RenderCommand>, Arc<SharedState>) {
        let shared = Arc::new(SharedState::new(1000, 1.0, running));
        let (tx, rx) = unbounded();
        (Renderer::new(Arc::clone(&shared), rx, [1.0; 3]), tx, shared)
    }

    fn dc_voice(level: f32, bus: Bus) -> Voice {
        Voice::buffer(Arc::from(vec![level; 10_000]), false).on_bus(bus)
    }

    #[test]
    fn test_suspended_renders_silence_and_freezes_clock() {
        let (mut r, tx, shared) = renderer(false);
        tx.send(RenderCommand::Spawn(Box::new(dc_voice(0.5, Bus::Effects))))
            .unwrap();
        let mut out = vec![1.0; 64];
        r.render(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(shared.now(), 0.0);
    }

    #[test]
    fn test_running_advances_clock() {
        let (mut r, _tx, shared) = renderer(true);
        let mut out = vec![0.0; 500];
        r.render(&mut out, 1);
        assert!((shared.now() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bus_and_master_gains_multiply() {
        let (mut r, tx, shared) = renderer(true);
        shared.set_master_gain(0.5);
        tx.send(RenderCommand::SetBusGain {
            bus: Bus::Ambient,
            gain: 0.1,
        })
        .unwrap();
        tx.send(RenderCommand::Spawn(Box::new(dc_voice(1.0, Bus::Ambient))))
            .unwrap();
        tx.send(RenderCommand::Spawn(Box::new(dc_voice(1.0, Bus::Effects))))
            .unwrap();

        let mut out = vec![0.0; 4];
        r.render(&mut out, 2);
        for s in out {
            assert!((s - (0.1 + 1.0) * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_finished_voices_are_released() {
        let (mut r, tx, shared) = renderer(true);
        let voice = Voice::oscillator(Waveform::Sine, Envelope::constant(10.0)).stopping_at(0.01);
        tx.send(RenderCommand::Spawn(Box::new(voice))).unwrap();

        let mut out = vec![0.0; 5];
        r.render(&mut out, 1);
        assert_eq!(shared.active_voices(), 1);

        let mut out = vec![0.0; 20];
        r.render(&mut out, 1);
        assert_eq!(shared.active_voices(), 0);
    }

    #[test]
    fn test_stop_command_ends_voice() {
        let (mut r, tx, shared) = renderer(true);
        let mut voice = dc_voice(1.0, Bus::Media);
        voice.assign_id(7);
        tx.send(RenderCommand::Spawn(Box::new(voice))).unwrap();
        let mut out = vec![0.0; 10];
        r.render(&mut out, 1);
        assert_eq!(shared.active_voices(), 1);

        tx.send(RenderCommand::Stop { id: 7, at: shared.now() }).unwrap();
        r.render(&mut out, 1);
        assert_eq!(shared.active_voices(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
