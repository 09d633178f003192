use std::f32::consts::PI;

/// Interleaved 16-bit stereo samples the game writes each frame.
#[derive(Debug, Default)]
pub struct SoundOutputBuffer {
    pub samples_per_second: u32,
    pub sample_count: usize,
    samples: Vec<i16>,
}

impl SoundOutputBuffer {
    pub fn new(samples_per_second: u32) -> Self {
        Self {
            samples_per_second,
            sample_count: 0,
            samples: Vec::new(),
        }
    }

    /// Makes room for `sample_count` stereo samples. Reuses the allocation.
    pub fn prepare(&mut self, sample_count: usize) {
        self.sample_count = sample_count;
        self.samples.clear();
        self.samples.resize(sample_count * 2, 0);
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples[..self.sample_count * 2]
    }

    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples[..self.sample_count * 2]
    }
}

/// Where finished samples go. Devices that failed to open are replaced by
/// `SilentAudio`.
pub trait AudioSink {
    /// How many stereo samples the device wants this frame.
    fn samples_wanted(&mut self) -> usize;

    fn submit(&mut self, samples: &[i16]);
}

#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn samples_wanted(&mut self) -> usize {
        0
    }

    fn submit(&mut self, _samples: &[i16]) {}
}

/// Phase of the running sine tone, kept between frames so the wave has no
/// seams.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToneGenerator {
    t_sine: f32,
}

impl ToneGenerator {
    const VOLUME: f32 = 3_000.0;

    pub fn output(&mut self, sound_buffer: &mut SoundOutputBuffer, tone_hz: u32) {
        if tone_hz == 0 || sound_buffer.samples_per_second == 0 {
            for sample in sound_buffer.samples_mut() {
                *sample = 0;
            }
            return;
        }

        let wave_period = sound_buffer.samples_per_second as f32 / tone_hz as f32;
        let tau = 2.0 * PI;

        for frame in sound_buffer.samples_mut().chunks_exact_mut(2) {
            let sample_value = (self.t_sine.sin() * Self::VOLUME) as i16;
            frame[0] = sample_value;
            frame[1] = sample_value;

            self.t_sine += tau / wave_period;
            if self.t_sine > tau {
                self.t_sine -= tau;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_is_stereo_and_bounded() {
        let mut buffer = SoundOutputBuffer::new(48_000);
        buffer.prepare(1_600);
        let mut tone = ToneGenerator::default();
        tone.output(&mut buffer, 256);

        assert_eq!(buffer.samples().len(), 3_200);
        for frame in buffer.samples().chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 3_000);
        }
        assert!(buffer.samples().iter().any(|&s| s > 2_900));
        assert!(buffer.samples().iter().any(|&s| s < -2_900));
    }

    #[test]
    fn zero_hz_is_silence() {
        let mut buffer = SoundOutputBuffer::new(48_000);
        buffer.prepare(10);
        buffer.samples_mut()[0] = 7;
        ToneGenerator::default().output(&mut buffer, 0);
        assert!(buffer.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn phase_continues_across_frames() {
        let mut tone = ToneGenerator::default();
        let mut buffer = SoundOutputBuffer::new(48_000);
        buffer.prepare(1);
        tone.output(&mut buffer, 256);
        assert_eq!(buffer.samples()[0], 0);

        tone.output(&mut buffer, 256);
        assert_ne!(buffer.samples()[0], 0);
    }
}
