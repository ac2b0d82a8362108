//! Fixed-capacity circular sample history.

/// Holds the most recent `capacity` samples regardless of how they arrived.
///
/// Slots that were never written read back as silence.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    data: Box<[f32]>,
    write: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)].into_boxed_slice(),
            write: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Appends a chunk. Chunks longer than the capacity keep only their tail.
    pub fn ingest(&mut self, chunk: &[f32]) {
        let capacity = self.data.len();
        if chunk.is_empty() {
            return;
        }

        let (start, tail) = if chunk.len() > capacity {
            let skipped = chunk.len() - capacity;
            ((self.write + skipped) % capacity, &chunk[skipped..])
        } else {
            (self.write, chunk)
        };

        self.write_wrapped(start, tail);
        self.write = (self.write + chunk.len()) % capacity;
    }

    /// Copies the buffered samples into `target`, oldest first.
    pub fn linearize(&self, target: &mut [f32]) {
        debug_assert_eq!(target.len(), self.data.len());
        let (newer, older) = self.data.split_at(self.write);
        let split = older.len();
        target[..split].copy_from_slice(older);
        target[split..].copy_from_slice(newer);
    }

    fn write_wrapped(&mut self, start: usize, samples: &[f32]) {
        debug_assert!(samples.len() <= self.data.len());
        let first = samples.len().min(self.data.len() - start);
        self.data[start..start + first].copy_from_slice(&samples[..first]);
        let rest = samples.len() - first;
        if rest > 0 {
            self.data[..rest].copy_from_slice(&samples[first..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|n| n as f32).collect()
    }

    fn linearized(buffer: &HistoryBuffer) -> Vec<f32> {
        let mut out = vec![f32::NAN; buffer.capacity()];
        buffer.linearize(&mut out);
        out
    }

    #[test]
    fn unwritten_slots_read_as_silence() {
        let mut buffer = HistoryBuffer::new(6);
        buffer.ingest(&[1.0, 2.0]);
        assert_eq!(linearized(&buffer), vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn chunking_does_not_change_history() {
        let len = 64;
        let samples = ramp(len * 3 + 5);
        let expected = samples[samples.len() - len..].to_vec();

        let mut whole = HistoryBuffer::new(len);
        for chunk in samples.chunks(len) {
            whole.ingest(chunk);
        }

        let mut singles = HistoryBuffer::new(len);
        for sample in &samples {
            singles.ingest(std::slice::from_ref(sample));
        }

        let mut irregular = HistoryBuffer::new(len);
        let mut rest = samples.as_slice();
        let mut step = 1;
        while !rest.is_empty() {
            let take = step.min(rest.len());
            irregular.ingest(&rest[..take]);
            rest = &rest[take..];
            step = step % 37 + 7;
        }

        assert_eq!(linearized(&whole), expected);
        assert_eq!(linearized(&singles), expected);
        assert_eq!(linearized(&irregular), expected);
    }

    #[test]
    fn oversized_chunk_keeps_trailing_samples() {
        let mut buffer = HistoryBuffer::new(8);
        buffer.ingest(&[100.0, 101.0, 102.0]);
        let samples = ramp(21);
        buffer.ingest(&samples);
        assert_eq!(linearized(&buffer), samples[13..].to_vec());

        buffer.ingest(&[-1.0]);
        let mut expected = samples[14..].to_vec();
        expected.push(-1.0);
        assert_eq!(linearized(&buffer), expected);
    }

    #[test]
    fn linearize_leaves_history_untouched() {
        let mut buffer = HistoryBuffer::new(5);
        buffer.ingest(&ramp(7));
        let first = linearized(&buffer);
        let second = linearized(&buffer);
        assert_eq!(first, second);
        buffer.ingest(&[9.0]);
        assert_eq!(linearized(&buffer), vec![3.0, 4.0, 5.0, 6.0, 9.0]);
    }
}
