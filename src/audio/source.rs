//! Sample producers feeding the analysis thread.

use super::spectrum_tap::AudioPacket;
use anyhow::{Context, Result};
use async_channel::Sender;
use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chunk lengths cycled through by [`ToneSource`], deliberately unaligned
/// with any power-of-two window.
const TONE_CHUNK_PATTERN: &[usize] = &[64, 480, 128, 1_000, 256, 2_048, 333, 512];

const RAW_READ_BYTES: usize = 4 * 1_024;

pub trait SampleSource: Send {
    fn sample_rate(&self) -> f64;

    /// Next chunk of mono samples, `None` once the source is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>>;
}

/// Sine generator emitting irregularly sized chunks.
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequency: f64,
    sample_rate: f64,
    amplitude: f32,
    position: u64,
    remaining: Option<u64>,
    pattern_index: usize,
}

impl ToneSource {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Self {
            frequency,
            sample_rate,
            amplitude: 0.5,
            position: 0,
            remaining: None,
            pattern_index: 0,
        }
    }

    /// Stops after `samples` samples instead of running forever.
    pub fn limited(mut self, samples: u64) -> Self {
        self.remaining = Some(samples);
        self
    }
}

impl SampleSource for ToneSource {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        let mut len = TONE_CHUNK_PATTERN[self.pattern_index] as u64;
        self.pattern_index = (self.pattern_index + 1) % TONE_CHUNK_PATTERN.len();

        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            len = len.min(*remaining);
            *remaining -= len;
        }

        let step = core::f64::consts::TAU * self.frequency / self.sample_rate;
        let start = self.position;
        self.position += len;
        Ok(Some(
            (start..start + len)
                .map(|n| self.amplitude * (step * n as f64).sin() as f32)
                .collect(),
        ))
    }
}

/// Little-endian `f32` mono samples read from any byte stream.
pub struct RawSource<R> {
    reader: R,
    sample_rate: f64,
    bytes: Vec<u8>,
    carry: usize,
}

impl<R: Read> RawSource<R> {
    pub fn new(reader: R, sample_rate: f64) -> Self {
        Self {
            reader,
            sample_rate,
            bytes: vec![0; RAW_READ_BYTES],
            carry: 0,
        }
    }
}

impl<R: Read + Send> SampleSource for RawSource<R> {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let read = self
                .reader
                .read(&mut self.bytes[self.carry..])
                .context("reading raw samples")?;
            if read == 0 {
                if self.carry > 0 {
                    warn!("[source] discarding {} trailing bytes", self.carry);
                    self.carry = 0;
                }
                return Ok(None);
            }

            let filled = self.carry + read;
            let whole = filled - filled % 4;
            if whole == 0 {
                self.carry = filled;
                continue;
            }

            let samples = self.bytes[..whole]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            self.bytes.copy_within(whole..filled, 0);
            self.carry = filled - whole;
            return Ok(Some(samples));
        }
    }
}

/// Pulls chunks from `source` on a dedicated thread and sends them as packets.
///
/// With `realtime` set, each chunk is followed by a sleep matching its
/// duration so downstream sees audio at roughly the rate a device would
/// deliver it.
pub fn spawn<S>(
    mut source: S,
    packets: Sender<AudioPacket>,
    realtime: bool,
) -> Result<JoinHandle<()>>
where
    S: SampleSource + 'static,
{
    thread::Builder::new()
        .name("spectra-source".into())
        .spawn(move || {
            let sample_rate = source.sample_rate();
            let mut total = 0u64;
            loop {
                let samples = match source.next_chunk() {
                    Ok(Some(samples)) => samples,
                    Ok(None) => break,
                    Err(err) => {
                        warn!("[source] stopping: {err:#}");
                        break;
                    }
                };
                let len = samples.len();
                total += len as u64;
                if packets
                    .send_blocking(AudioPacket {
                        samples,
                        sample_rate,
                    })
                    .is_err()
                {
                    debug!("[source] analysis side closed");
                    break;
                }
                if realtime && len > 0 {
                    thread::sleep(Duration::from_secs_f64(len as f64 / sample_rate));
                }
            }
            info!("[source] finished after {total} samples");
        })
        .context("failed to spawn source thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields its bytes a few at a time to exercise partial reads.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn drain<S: SampleSource>(source: &mut S) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(chunk) = source.next_chunk().expect("chunk") {
            out.extend(chunk);
        }
        out
    }

    #[test]
    fn tone_is_continuous_across_chunks() {
        let mut source = ToneSource::new(440.0, 48_000.0).limited(5_000);
        let samples = drain(&mut source);
        assert_eq!(samples.len(), 5_000);

        let step = core::f64::consts::TAU * 440.0 / 48_000.0;
        for (n, sample) in samples.iter().enumerate() {
            let expected = 0.5 * (step * n as f64).sin() as f32;
            assert!((sample - expected).abs() < 1e-6, "sample {n}");
        }
    }

    #[test]
    fn tone_chunks_are_irregular() {
        let mut source = ToneSource::new(1_000.0, 44_100.0);
        let lens: Vec<usize> = (0..4)
            .map(|_| source.next_chunk().expect("chunk").expect("some").len())
            .collect();
        assert_eq!(lens, vec![64, 480, 128, 1_000]);
    }

    #[test]
    fn raw_source_decodes_little_endian_floats() {
        let values = [0.5f32, -1.0, 0.25, 3.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut source = RawSource::new(Cursor::new(bytes), 48_000.0);
        assert_eq!(drain(&mut source), values.to_vec());
    }

    #[test]
    fn raw_source_reassembles_split_samples() {
        let values: Vec<f32> = (0..37).map(|n| n as f32 * 0.5).collect();
        let mut bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        bytes.push(0xff);
        let mut source = RawSource::new(
            Trickle {
                data: bytes,
                pos: 0,
                step: 3,
            },
            48_000.0,
        );
        assert_eq!(drain(&mut source), values);
    }

    #[test]
    fn spawned_source_delivers_everything() {
        let (tx, rx) = async_channel::unbounded();
        let source = ToneSource::new(100.0, 8_000.0).limited(3_000);
        let handle = spawn(source, tx, false).expect("spawn");
        handle.join().expect("join");

        let mut total = 0;
        while let Ok(packet) = rx.try_recv() {
            assert_eq!(packet.sample_rate, 8_000.0);
            total += packet.samples.len();
        }
        assert_eq!(total, 3_000);
    }
}
