use crate::dsp::spectrum::SpectrumAnalyzer;
use crate::dsp::{AnalyzerError, RunOutcome};
use crate::util::audio::select_window_size;
use anyhow::{Context, Result};
use async_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// A chunk of mono audio together with the rate it was captured at.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub samples: Vec<f32>,
    pub sample_rate: f64,
}

/// Immutable copy of a freshly computed power spectrum.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub sequence: u64,
    pub sample_rate: f64,
    pub window_size: usize,
    pub power: Arc<[f32]>,
}

impl SpectrumFrame {
    pub fn bin_count(&self) -> usize {
        self.power.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TapConfig {
    /// Requested analysis window; `None` derives it from the sample rate.
    pub window_size: Option<usize>,
    pub target_fps: f64,
}

/// Reports an oversized packet once per tap instead of once per block.
#[derive(Debug, Default)]
pub struct CapacityWarning {
    reported: bool,
}

impl CapacityWarning {
    /// Returns `true` the first time an oversized packet is seen.
    pub fn note(&mut self, len: usize, capacity: usize) -> bool {
        if len <= capacity || self.reported {
            return false;
        }
        self.reported = true;
        true
    }

    pub fn reset(&mut self) {
        self.reported = false;
    }
}

/// Shared switch telling the tap whether anyone is displaying its frames.
#[derive(Debug, Clone, Default)]
pub struct DisplayGate(Arc<AtomicBool>);

impl DisplayGate {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn set_active(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives one analyzer from incoming packets.
#[derive(Debug)]
pub struct SpectrumTap {
    config: TapConfig,
    analyzer: SpectrumAnalyzer,
    capacity_warning: CapacityWarning,
    sequence: u64,
}

impl SpectrumTap {
    pub fn new(config: TapConfig, sample_rate: f64) -> Result<Self, AnalyzerError> {
        Ok(Self {
            analyzer: build_analyzer(config, sample_rate)?,
            config,
            capacity_warning: CapacityWarning::default(),
            sequence: 0,
        })
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    /// Feeds `packet`, returning how many spectra it completed.
    ///
    /// With `publish` set, `emit` receives a copy of every completed spectrum;
    /// otherwise the history still advances but no frame is built. Packets
    /// longer than the analysis window are split. A change of sample rate
    /// replaces the analyzer before the packet is processed.
    pub fn process<F>(
        &mut self,
        packet: &AudioPacket,
        publish: bool,
        mut emit: F,
    ) -> Result<usize, AnalyzerError>
    where
        F: FnMut(SpectrumFrame),
    {
        if packet.sample_rate != self.analyzer.sample_rate() {
            self.reconfigure(packet.sample_rate)?;
        }

        let capacity = self.analyzer.window_size();
        if self.capacity_warning.note(packet.samples.len(), capacity) {
            warn!(
                "[tap] packet of {} samples exceeds the {capacity}-sample window; splitting",
                packet.samples.len()
            );
        }

        let mut emitted = 0;
        for chunk in packet.samples.chunks(capacity) {
            if self.analyzer.run(chunk)? == RunOutcome::Updated {
                self.sequence += 1;
                emitted += 1;
                if !publish {
                    continue;
                }
                emit(SpectrumFrame {
                    sequence: self.sequence,
                    sample_rate: self.analyzer.sample_rate(),
                    window_size: capacity,
                    power: Arc::from(self.analyzer.power()),
                });
            }
        }
        Ok(emitted)
    }

    fn reconfigure(&mut self, sample_rate: f64) -> Result<(), AnalyzerError> {
        let analyzer = build_analyzer(self.config, sample_rate)?;
        info!(
            "[tap] sample rate {} -> {sample_rate} Hz; window {} samples",
            self.analyzer.sample_rate(),
            analyzer.window_size()
        );
        self.analyzer = analyzer;
        self.capacity_warning.reset();
        Ok(())
    }
}

fn build_analyzer(config: TapConfig, sample_rate: f64) -> Result<SpectrumAnalyzer, AnalyzerError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(AnalyzerError::InvalidSampleRate(sample_rate));
    }
    let window_size = select_window_size(sample_rate, config.window_size);
    SpectrumAnalyzer::new(window_size, sample_rate, config.target_fps)
}

/// Runs `tap` on its own thread until `packets` closes or nobody listens for frames.
pub fn spawn(
    tap: SpectrumTap,
    packets: Receiver<AudioPacket>,
    frames: Sender<SpectrumFrame>,
    gate: DisplayGate,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("spectra-analysis".into())
        .spawn(move || forward_loop(tap, packets, frames, gate))
        .context("failed to spawn analysis thread")
}

fn forward_loop(
    mut tap: SpectrumTap,
    packets: Receiver<AudioPacket>,
    frames: Sender<SpectrumFrame>,
    gate: DisplayGate,
) {
    let mut forwarded = 0u64;
    let mut dropped = 0u64;
    let mut closed = false;

    while let Ok(packet) = packets.recv_blocking() {
        let publish = gate.is_active() && !closed;
        let result = tap.process(&packet, publish, |frame| {
            if closed {
                return;
            }
            match frames.try_send(frame) {
                Ok(()) => forwarded += 1,
                Err(TrySendError::Full(_)) => dropped += 1,
                Err(TrySendError::Closed(_)) => closed = true,
            }
        });

        if let Err(err) = result {
            error!("[tap] dropping packet of {} samples: {err}", packet.samples.len());
        }
        if closed {
            break;
        }
    }

    info!("[tap] analysis stopped; {forwarded} frames forwarded, {dropped} dropped");
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: TapConfig = TapConfig {
        window_size: Some(1_024),
        target_fps: 15.0,
    };

    fn packet(len: usize, sample_rate: f64) -> AudioPacket {
        AudioPacket {
            samples: vec![0.25; len],
            sample_rate,
        }
    }

    #[test]
    fn capacity_warning_fires_once() {
        let mut warning = CapacityWarning::default();
        assert!(!warning.note(512, 1024));
        assert!(warning.note(2048, 1024));
        assert!(!warning.note(4096, 1024));
        warning.reset();
        assert!(warning.note(2048, 1024));
    }

    #[test]
    fn oversized_packets_are_split() {
        let mut tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        let mut frames = Vec::new();
        let emitted = tap
            .process(&packet(7_000, 48_000.0), true, |f| frames.push(f))
            .expect("process");

        // 3200-sample threshold, counted per 1024-sample chunk.
        assert_eq!(emitted, 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence, 1);
        assert_eq!(frames[0].window_size, 1_024);
        assert_eq!(frames[0].bin_count(), 512);
        assert!(tap.capacity_warning.reported);
    }

    #[test]
    fn sample_rate_change_replaces_analyzer() {
        let mut tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        tap.process(&packet(2_000, 48_000.0), true, |_| {}).expect("process");
        assert_eq!(tap.analyzer().pending_samples(), 2_000);

        tap.process(&packet(100, 96_000.0), true, |_| {}).expect("process");
        assert_eq!(tap.analyzer().sample_rate(), 96_000.0);
        assert_eq!(tap.analyzer().threshold(), 6_400.0);
        assert_eq!(tap.analyzer().pending_samples(), 100);

        assert!(matches!(
            tap.process(&packet(10, 0.0), true, |_| {}),
            Err(AnalyzerError::InvalidSampleRate(_))
        ));
        assert_eq!(tap.analyzer().sample_rate(), 96_000.0);
    }

    #[test]
    fn unpublished_packets_still_feed_history() {
        let mut tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        let mut frames = Vec::new();

        let emitted = tap
            .process(&packet(2_000, 48_000.0), false, |f| frames.push(f))
            .expect("process");
        assert_eq!(emitted, 0);
        assert_eq!(tap.analyzer().pending_samples(), 2_000);

        // 1_200 more samples reach the 3_200-sample threshold only because
        // the gated-off packet was counted.
        tap.process(&packet(1_200, 48_000.0), true, |f| frames.push(f))
            .expect("process");
        assert_eq!(frames.len(), 1);
        assert_eq!(tap.analyzer().pending_samples(), 0);
        assert!(frames[0].power[0] > 0.0);
    }

    #[test]
    fn unpublished_updates_build_no_frames() {
        let mut tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        let mut calls = 0;
        let emitted = tap
            .process(&packet(7_000, 48_000.0), false, |_| calls += 1)
            .expect("process");
        assert_eq!(emitted, 1);
        assert_eq!(calls, 0);

        let mut frames = Vec::new();
        tap.process(&packet(4_000, 48_000.0), true, |f| frames.push(f))
            .expect("process");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence, 2);
    }

    fn run_to_completion(gate: DisplayGate, packets: Vec<AudioPacket>) -> Vec<SpectrumFrame> {
        let (packet_tx, packet_rx) = async_channel::bounded(packets.len().max(1));
        let (frame_tx, frame_rx) = async_channel::bounded(8);
        let tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        let handle = spawn(tap, packet_rx, frame_tx, gate).expect("spawn");

        for packet in packets {
            packet_tx.send_blocking(packet).expect("send");
        }
        drop(packet_tx);
        handle.join().expect("join");

        std::iter::from_fn(|| frame_rx.try_recv().ok()).collect()
    }

    #[test]
    fn inactive_display_receives_nothing() {
        let frames = run_to_completion(
            DisplayGate::new(false),
            vec![packet(4_000, 48_000.0), packet(4_000, 48_000.0)],
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn active_display_receives_every_update() {
        let frames = run_to_completion(
            DisplayGate::new(true),
            vec![packet(4_000, 48_000.0), packet(4_000, 48_000.0)],
        );
        let sequences: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn full_display_queue_drops_instead_of_blocking() {
        let (packet_tx, packet_rx) = async_channel::bounded(4);
        let (frame_tx, frame_rx) = async_channel::bounded(1);
        let tap = SpectrumTap::new(CONFIG, 48_000.0).expect("tap");
        let handle = spawn(tap, packet_rx, frame_tx, DisplayGate::new(true)).expect("spawn");

        for _ in 0..3 {
            packet_tx.send_blocking(packet(4_000, 48_000.0)).expect("send");
        }
        drop(packet_tx);
        handle.join().expect("join");

        let first = frame_rx.try_recv().expect("one frame queued");
        assert_eq!(first.sequence, 1);
        assert!(frame_rx.try_recv().is_err());
    }
}
