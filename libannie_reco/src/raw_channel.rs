use super::error::RawChannelError;

/// The full raw waveform recorded by a single channel of a VME card during one readout.
///
/// The waveform is one flat buffer spanning every minibuffer of the readout. The owning
/// RawCard guarantees that the buffer divides evenly into `num_minibuffers` pieces, so
/// minibuffer slices are all the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChannel {
    channel_number: u32,
    rate: u32,
    data: Vec<i16>,
    num_minibuffers: usize,
}

impl RawChannel {
    /// Create a new RawChannel by copying a range of de-interleaved card samples.
    ///
    /// Fails if a sample does not fit in a signed 16-bit ADC count.
    pub fn new(
        channel_number: u32,
        samples: &[u16],
        rate: u32,
        num_minibuffers: usize,
    ) -> Result<Self, RawChannelError> {
        let data = samples
            .iter()
            .map(|s| i16::try_from(*s).map_err(|_| RawChannelError::SampleOutOfRange(*s)))
            .collect::<Result<Vec<i16>, RawChannelError>>()?;
        Ok(Self {
            channel_number,
            rate,
            data,
            num_minibuffers,
        })
    }

    pub fn channel_number(&self) -> u32 {
        self.channel_number
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Raw ADC counts for the full readout of this channel
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    pub fn num_minibuffers(&self) -> usize {
        self.num_minibuffers
    }

    /// Number of samples in each minibuffer
    pub fn minibuffer_size(&self) -> usize {
        if self.num_minibuffers == 0 {
            0
        } else {
            self.data.len() / self.num_minibuffers
        }
    }

    /// Get the samples belonging to a single minibuffer
    pub fn minibuffer(&self, index: usize) -> Result<&[i16], RawChannelError> {
        if index >= self.num_minibuffers {
            return Err(RawChannelError::MinibufferOutOfRange(
                index,
                self.num_minibuffers,
            ));
        }
        let size = self.minibuffer_size();
        Ok(&self.data[index * size..(index + 1) * size])
    }

    /// Iterate over all of the minibuffers in order
    pub fn minibuffers(&self) -> impl Iterator<Item = &[i16]> {
        let size = self.minibuffer_size().max(1);
        self.data.chunks(size).take(self.num_minibuffers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minibuffer_slicing() {
        let samples: Vec<u16> = (0..12).collect();
        let channel = match RawChannel::new(2, &samples, 500, 3) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        assert_eq!(channel.channel_number(), 2);
        assert_eq!(channel.rate(), 500);
        assert_eq!(channel.minibuffer_size(), 4);
        for mb in 0..3 {
            let data = match channel.minibuffer(mb) {
                Ok(d) => d,
                Err(_) => panic!(),
            };
            assert_eq!(data.len(), 4);
            assert_eq!(data[0], (mb * 4) as i16);
        }
        assert_eq!(channel.minibuffers().count(), 3);
    }

    #[test]
    fn test_minibuffer_out_of_range() {
        let samples: Vec<u16> = vec![1, 2, 3, 4];
        let channel = match RawChannel::new(0, &samples, 0, 2) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        assert_eq!(
            channel.minibuffer(2),
            Err(RawChannelError::MinibufferOutOfRange(2, 2))
        );
    }

    #[test]
    fn test_owns_copied_samples() {
        let mut samples: Vec<u16> = vec![10, 20, 30, 40];
        let channel = match RawChannel::new(0, &samples, 0, 1) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        samples[0] = 99;
        assert_eq!(channel.data(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_sample_out_of_range() {
        let samples: Vec<u16> = vec![300, 32767, 40000, 301];
        assert_eq!(
            RawChannel::new(0, &samples, 0, 2),
            Err(RawChannelError::SampleOutOfRange(40000))
        );
    }
}
