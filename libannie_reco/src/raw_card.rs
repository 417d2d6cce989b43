use std::collections::BTreeMap;
use time::OffsetDateTime;

use super::constants::{CARD_CLOCK_PERIOD_NS, NS_PER_SECOND};
use super::error::RawCardError;
use super::pmt_data::PmtDataEntry;
use super::raw_channel::RawChannel;

/// The full readout of raw data from all channels monitored by a single VME card.
///
/// The card firmware writes each channel into a fixed size slot of the shared card buffer.
/// RawCard undoes that layout when it is constructed, so every RawChannel owns a
/// time-ordered copy of its samples and nothing aliases the card buffer afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCard {
    card_id: u32,
    last_sync: u64,
    start_time_sec: i32,
    start_time_nsec: i32,
    start_count: u64,
    trigger_counts: Vec<u64>,
    channels: BTreeMap<u32, RawChannel>,
}

impl RawCard {
    /// Decode a PMTData row into a RawCard.
    ///
    /// Fails if the buffer length is inconsistent with the declared channel count and
    /// channel buffer size, or if the number of minibuffers implied by the buffer and
    /// minibuffer sizes does not match the number of trigger counts.
    pub fn new(entry: &PmtDataEntry) -> Result<Self, RawCardError> {
        if entry.buffer_size <= 0 {
            return Err(RawCardError::BadBufferSize(entry.buffer_size));
        }
        let minibuffer_size = match entry.minibuffer_size() {
            Some(size) => size,
            None => return Err(RawCardError::BadEventSize(entry.event_size)),
        };
        if minibuffer_size <= 0 {
            return Err(RawCardError::BadMinibufferSize(minibuffer_size));
        }

        let buffer_size = entry.buffer_size as usize;
        if entry.channels < 0 || entry.channels as usize * buffer_size != entry.data.len() {
            return Err(RawCardError::ChannelCountMismatch {
                channels: entry.channels,
                buffer_size: entry.buffer_size,
                data_length: entry.data.len(),
            });
        }

        let num_minibuffers = buffer_size / minibuffer_size as usize;
        if entry.trigger_counts.len() != num_minibuffers {
            return Err(RawCardError::MinibufferCountMismatch(
                num_minibuffers,
                entry.trigger_counts.len(),
            ));
        }
        if num_minibuffers == 0 {
            return Err(RawCardError::BadMinibufferSize(minibuffer_size));
        }

        let mut card = Self {
            card_id: entry.card_id,
            last_sync: entry.last_sync,
            start_time_sec: entry.start_time_sec,
            start_time_nsec: entry.start_time_nsec,
            start_count: entry.start_count,
            trigger_counts: entry.trigger_counts.clone(),
            channels: BTreeMap::new(),
        };

        for channel in 0..entry.channels as u32 {
            let rate = match entry.rates.get(channel as usize) {
                Some(r) => *r,
                None => return Err(RawCardError::MissingRate(channel)),
            };
            card.add_channel(channel, &entry.data, buffer_size, rate, false)?;
        }

        Ok(card)
    }

    /// Decode one channel from the full card buffer and store it.
    ///
    /// Channel `c` occupies the slot `[c * channel_buffer_size, (c + 1) * channel_buffer_size)`
    /// of the card buffer. The waveform is read from the slot's begin/midpoint pair,
    /// `[c * channel_buffer_size, c * channel_buffer_size + channel_buffer_size / 2)`.
    pub fn add_channel(
        &mut self,
        channel_number: u32,
        full_buffer_data: &[u16],
        channel_buffer_size: usize,
        rate: u32,
        overwrite_ok: bool,
    ) -> Result<(), RawCardError> {
        if self.channels.contains_key(&channel_number) && !overwrite_ok {
            return Err(RawCardError::ChannelOverwrite(channel_number));
        }

        let start_index = channel_number as usize * channel_buffer_size;
        let end_index = (channel_number as usize + 1) * channel_buffer_size;
        if full_buffer_data.len() < end_index {
            return Err(RawCardError::MissingData(channel_number));
        }

        let num_minibuffers = self.num_minibuffers();
        let halfway_index = start_index + channel_buffer_size / 2;
        let waveform_length = halfway_index - start_index;
        if waveform_length == 0 || num_minibuffers == 0 || waveform_length % num_minibuffers != 0
        {
            return Err(RawCardError::UnevenMinibuffers(
                waveform_length,
                num_minibuffers,
            ));
        }

        let channel = RawChannel::new(
            channel_number,
            &full_buffer_data[start_index..halfway_index],
            rate,
            num_minibuffers,
        )?;
        self.channels.insert(channel_number, channel);
        Ok(())
    }

    pub fn card_id(&self) -> u32 {
        self.card_id
    }

    pub fn last_sync(&self) -> u64 {
        self.last_sync
    }

    pub fn start_time_sec(&self) -> i32 {
        self.start_time_sec
    }

    pub fn start_time_nsec(&self) -> i32 {
        self.start_time_nsec
    }

    pub fn start_count(&self) -> u64 {
        self.start_count
    }

    pub fn trigger_counts(&self) -> &[u64] {
        &self.trigger_counts
    }

    pub fn num_minibuffers(&self) -> usize {
        self.trigger_counts.len()
    }

    pub fn channels(&self) -> &BTreeMap<u32, RawChannel> {
        &self.channels
    }

    pub fn channel(&self, index: u32) -> Result<&RawChannel, RawCardError> {
        self.channels
            .get(&index)
            .ok_or(RawCardError::BadChannel(index))
    }

    /// Start time of the readout in ns since the Unix epoch
    pub fn start_time(&self) -> i64 {
        self.start_time_sec as i64 * NS_PER_SECOND + self.start_time_nsec as i64
    }

    /// Start time of the readout as a calendar date
    pub fn start_datetime(&self) -> Result<OffsetDateTime, RawCardError> {
        Ok(OffsetDateTime::from_unix_timestamp_nanos(
            self.start_time() as i128,
        )?)
    }

    /// Time of the trigger which opened a minibuffer, in ns since the Unix epoch
    pub fn trigger_time(&self, minibuffer: usize) -> Result<i64, RawCardError> {
        let count = match self.trigger_counts.get(minibuffer) {
            Some(c) => *c,
            None => return Err(RawCardError::BadMinibuffer(minibuffer)),
        };
        let elapsed_ticks = count as i64 - self.start_count as i64;
        Ok(self.start_time() + elapsed_ticks * CARD_CLOCK_PERIOD_NS as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RawChannelError;

    fn make_entry(channels: i32, buffer_size: i32, event_size: i32) -> PmtDataEntry {
        let n_minibuffers = (buffer_size / (event_size * 4)) as usize;
        PmtDataEntry {
            sequence_id: 7,
            card_id: 4,
            last_sync: 0,
            start_time_sec: 10,
            start_time_nsec: 500,
            start_count: 100,
            channels,
            buffer_size,
            event_size,
            data: (0..(channels * buffer_size) as u16).collect(),
            trigger_counts: (0..n_minibuffers as u64).map(|i| 100 + 10 * i).collect(),
            rates: vec![0; channels as usize],
        }
    }

    #[test]
    fn test_end_to_end_layout() {
        // 2 channels, buffer size 8, minibuffer size 4 (Eventsize 1)
        let entry = make_entry(2, 8, 1);
        let card = match RawCard::new(&entry) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(card.channels().len(), 2);
        assert_eq!(card.num_minibuffers(), 2);

        // Channel c reads samples [8c, 8c + 4) from the card buffer
        let expected: [[[i16; 2]; 2]; 2] = [[[0, 1], [2, 3]], [[8, 9], [10, 11]]];
        for (c, channel_expected) in expected.iter().enumerate() {
            let channel = match card.channel(c as u32) {
                Ok(ch) => ch,
                Err(_) => panic!(),
            };
            assert_eq!(channel.num_minibuffers(), 2);
            for (mb, mb_expected) in channel_expected.iter().enumerate() {
                assert_eq!(channel.minibuffer(mb), Ok(&mb_expected[..]));
            }
        }
    }

    #[test]
    fn test_halves_concatenate_to_waveform() {
        // Each slot holds the waveform in its lower half, split across two minibuffers
        let mut entry = make_entry(3, 16, 2);
        for c in 0..3usize {
            for i in 0..8usize {
                entry.data[c * 16 + i] = (1000 * c + i) as u16;
            }
        }
        let card = match RawCard::new(&entry) {
            Ok(c) => c,
            Err(e) => panic!("{e}"),
        };
        for c in 0..3u32 {
            let channel = match card.channel(c) {
                Ok(ch) => ch,
                Err(_) => panic!(),
            };
            let mut joined: Vec<i16> = Vec::new();
            for mb in channel.minibuffers() {
                joined.extend_from_slice(mb);
            }
            let expected: Vec<i16> = (0..8).map(|i| (1000 * c + i) as i16).collect();
            assert_eq!(joined, expected);
            assert_eq!(channel.data(), &expected[..]);
        }
    }

    #[test]
    fn test_channel_count_mismatch() {
        let mut entry = make_entry(2, 8, 1);
        entry.channels = 3;
        entry.rates.push(0);
        match RawCard::new(&entry) {
            Err(RawCardError::ChannelCountMismatch { .. }) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn test_trigger_count_mismatch() {
        let mut entry = make_entry(2, 8, 1);
        entry.trigger_counts.push(0);
        assert_eq!(
            RawCard::new(&entry),
            Err(RawCardError::MinibufferCountMismatch(2, 3))
        );
    }

    #[test]
    fn test_bad_event_size() {
        let mut entry = make_entry(2, 8, 1);
        entry.event_size = 0x4000_0000;
        assert_eq!(
            RawCard::new(&entry),
            Err(RawCardError::BadEventSize(0x4000_0000))
        );
        entry.event_size = 0;
        assert_eq!(RawCard::new(&entry), Err(RawCardError::BadMinibufferSize(0)));
    }

    #[test]
    fn test_sample_out_of_range() {
        let mut entry = make_entry(2, 8, 1);
        entry.data[9] = 0x8000;
        assert_eq!(
            RawCard::new(&entry),
            Err(RawCardError::ChannelError(RawChannelError::SampleOutOfRange(0x8000)))
        );
    }

    #[test]
    fn test_missing_rate() {
        let mut entry = make_entry(2, 8, 1);
        entry.rates.pop();
        assert_eq!(RawCard::new(&entry), Err(RawCardError::MissingRate(1)));
    }

    #[test]
    fn test_add_channel_rules() {
        let entry = make_entry(2, 8, 1);
        let mut card = match RawCard::new(&entry) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        assert_eq!(
            card.add_channel(1, &entry.data, 8, 0, false),
            Err(RawCardError::ChannelOverwrite(1))
        );
        assert_eq!(card.add_channel(1, &entry.data, 8, 42, true), Ok(()));
        assert_eq!(card.channel(1).map(|c| c.rate()), Ok(42));
        assert_eq!(
            card.add_channel(2, &entry.data, 8, 0, false),
            Err(RawCardError::MissingData(2))
        );
        assert_eq!(card.channel(5), Err(RawCardError::BadChannel(5)));
    }

    #[test]
    fn test_trigger_time() {
        let entry = make_entry(1, 8, 1);
        let card = match RawCard::new(&entry) {
            Ok(c) => c,
            Err(_) => panic!(),
        };
        assert_eq!(card.trigger_time(0), Ok(10 * NS_PER_SECOND + 500));
        assert_eq!(card.trigger_time(1), Ok(10 * NS_PER_SECOND + 500 + 80));
        assert_eq!(card.trigger_time(2), Err(RawCardError::BadMinibuffer(2)));
        match card.start_datetime() {
            Ok(date) => assert_eq!(date.unix_timestamp(), 10),
            Err(_) => panic!(),
        }
    }
}
