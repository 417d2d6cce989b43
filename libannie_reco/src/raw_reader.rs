use super::error::RawReaderError;
use super::pmt_data::PmtDataTable;
use super::raw_readout::RawReadout;

/// A source which hands out RawReadouts one at a time.
///
/// End of data is not an error: both methods return `Ok(None)` when there is nothing
/// further in the requested direction.
pub trait ReadoutSource {
    type Error;

    /// Get the readout following the current one
    fn next_readout(&mut self) -> Result<Option<RawReadout>, Self::Error>;

    /// Get the readout preceeding the current one
    fn previous_readout(&mut self) -> Result<Option<RawReadout>, Self::Error>;
}

/// RawReader takes rows of a PMTData table and composes them into RawReadouts.
///
/// Each row of the table holds the data of a single VME card. Consecutive rows which share
/// a SequenceID are merged into one RawReadout. If the table runs out of rows in the
/// middle of a sequence, the partially filled readout is still returned.
#[derive(Debug)]
pub struct RawReader<T: PmtDataTable> {
    table: T,
    current_start: usize, // first row of the readout last handed out
    current_end: usize,   // one past the last row of the readout last handed out
    expected_cards: Option<usize>,
}

impl<T: PmtDataTable> RawReader<T> {
    /// Create a new RawReader positioned before the first row of the table
    pub fn new(table: T) -> Self {
        Self {
            table,
            current_start: 0,
            current_end: 0,
            expected_cards: None,
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn n_entries(&self) -> usize {
        self.table.n_entries()
    }

    /// Index of the next row that [next_readout](ReadoutSource::next_readout) will visit
    pub fn current_entry(&self) -> usize {
        self.current_end
    }

    /// Build a readout from the rows `[first, last)`, which must share a SequenceID
    fn load_readout(
        &mut self,
        first: usize,
        last: usize,
        sequence_id: i32,
    ) -> Result<RawReadout, RawReaderError> {
        let mut readout = RawReadout::new(sequence_id);
        for entry in first..last {
            let row = self.table.read_entry(entry)?;
            readout.add_card(&row, false)?;
        }

        if let Some(trig_data) = self.table.trig_data(sequence_id)? {
            readout.set_trig_data(trig_data);
        }

        match self.expected_cards {
            Some(n_cards) if readout.cards().len() < n_cards => {
                log::warn!(
                    "Readout with SequenceID {} has {} cards; expected {}. The readout may be truncated.",
                    sequence_id,
                    readout.cards().len(),
                    n_cards
                );
            }
            Some(_) => (),
            None => self.expected_cards = Some(readout.cards().len()),
        }

        Ok(readout)
    }
}

impl<T: PmtDataTable> ReadoutSource for RawReader<T> {
    type Error = RawReaderError;

    fn next_readout(&mut self) -> Result<Option<RawReadout>, RawReaderError> {
        let n_entries = self.table.n_entries();
        let first = self.current_end;
        if first >= n_entries {
            return Ok(None);
        }

        let sequence_id = self.table.sequence_id(first)?;
        let mut last = first + 1;
        while last < n_entries && self.table.sequence_id(last)? == sequence_id {
            last += 1;
        }

        // Move past the rows even if they fail to decode
        self.current_start = first;
        self.current_end = last;
        let readout = self.load_readout(first, last, sequence_id)?;
        Ok(Some(readout))
    }

    fn previous_readout(&mut self) -> Result<Option<RawReadout>, RawReaderError> {
        let last = self.current_start;
        if last == 0 {
            return Ok(None);
        }

        let sequence_id = self.table.sequence_id(last - 1)?;
        let mut first = last - 1;
        while first > 0 && self.table.sequence_id(first - 1)? == sequence_id {
            first -= 1;
        }

        // Move past the rows even if they fail to decode
        self.current_start = first;
        self.current_end = last;
        let readout = self.load_readout(first, last, sequence_id)?;
        Ok(Some(readout))
    }
}

impl<T: PmtDataTable> Iterator for RawReader<T> {
    type Item = Result<RawReadout, RawReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_readout().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RawReadoutError;
    use crate::pmt_data::PmtDataEntry;
    use crate::raw_trig_data::RawTrigData;

    fn make_entry(sequence_id: i32, card_id: u32) -> PmtDataEntry {
        PmtDataEntry {
            sequence_id,
            card_id,
            channels: 2,
            buffer_size: 8,
            event_size: 1,
            data: vec![card_id as u16; 16],
            trigger_counts: vec![0, 1],
            rates: vec![0, 0],
            ..Default::default()
        }
    }

    fn make_table() -> Vec<PmtDataEntry> {
        vec![
            make_entry(0, 3),
            make_entry(0, 4),
            make_entry(1, 3),
            make_entry(1, 4),
            make_entry(5, 3),
        ]
    }

    #[test]
    fn test_forward_merges_sequences() {
        let mut reader = RawReader::new(make_table());
        let mut ids = Vec::new();
        let mut n_cards = Vec::new();
        while let Some(readout) = match reader.next_readout() {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        } {
            ids.push(readout.sequence_id());
            n_cards.push(readout.cards().len());
        }
        assert_eq!(ids, vec![0, 1, 5]);
        // The last sequence ran out of rows after a single card
        assert_eq!(n_cards, vec![2, 2, 1]);
        assert_eq!(reader.current_entry(), 5);
        // Exhausted sources keep reporting the end of data
        assert!(matches!(reader.next_readout(), Ok(None)));
    }

    #[test]
    fn test_backward_cursor() {
        let mut reader = RawReader::new(make_table());
        assert!(matches!(reader.previous_readout(), Ok(None)));
        let ids: Vec<i32> = (0..3)
            .map(|_| match reader.next_readout() {
                Ok(Some(r)) => r.sequence_id(),
                _ => panic!(),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 5]);
        match reader.previous_readout() {
            Ok(Some(r)) => {
                assert_eq!(r.sequence_id(), 1);
                assert_eq!(r.cards().len(), 2);
            }
            _ => panic!(),
        }
        match reader.previous_readout() {
            Ok(Some(r)) => assert_eq!(r.sequence_id(), 0),
            _ => panic!(),
        }
        assert!(matches!(reader.previous_readout(), Ok(None)));
        match reader.next_readout() {
            Ok(Some(r)) => assert_eq!(r.sequence_id(), 1),
            _ => panic!(),
        }
    }

    #[test]
    fn test_iterator() {
        let reader = RawReader::new(make_table());
        let ids: Vec<i32> = reader
            .map(|r| match r {
                Ok(readout) => readout.sequence_id(),
                Err(_) => panic!(),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 5]);
    }

    #[test]
    fn test_duplicate_card_is_an_error() {
        let table = vec![make_entry(2, 3), make_entry(2, 3)];
        let mut reader = RawReader::new(table);
        match reader.next_readout() {
            Err(RawReaderError::ReadoutError(RawReadoutError::CardOverwrite(3))) => (),
            _ => panic!(),
        }
    }

    #[test]
    fn test_bad_readout_is_skipped() {
        let mut table = make_table();
        table[2].trigger_counts.clear();
        let reader = RawReader::new(table);
        let results: Vec<Result<i32, RawReaderError>> =
            reader.take(6).map(|r| r.map(|ro| ro.sequence_id())).collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Ok(0)));
        assert!(results[1].is_err());
        assert!(matches!(results[2], Ok(5)));
    }

    #[test]
    fn test_bad_readout_backward() {
        let mut table = make_table();
        table[2].trigger_counts.clear();
        let mut reader = RawReader::new(table);
        assert!(matches!(reader.next_readout(), Ok(Some(_))));
        assert!(reader.next_readout().is_err());
        assert!(matches!(reader.next_readout(), Ok(Some(_))));
        assert!(reader.previous_readout().is_err());
        match reader.previous_readout() {
            Ok(Some(r)) => assert_eq!(r.sequence_id(), 0),
            _ => panic!(),
        }
    }

    struct TrigTable {
        rows: Vec<PmtDataEntry>,
    }

    impl PmtDataTable for TrigTable {
        fn n_entries(&self) -> usize {
            self.rows.n_entries()
        }

        fn sequence_id(&self, entry: usize) -> Result<i32, RawReaderError> {
            self.rows.sequence_id(entry)
        }

        fn read_entry(&self, entry: usize) -> Result<PmtDataEntry, RawReaderError> {
            self.rows.read_entry(entry)
        }

        fn trig_data(&self, sequence_id: i32) -> Result<Option<RawTrigData>, RawReaderError> {
            if sequence_id == 1 {
                Ok(Some(RawTrigData {
                    sequence_id,
                    event_ids: vec![1, 2],
                    ..Default::default()
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn test_trig_data_attached() {
        let mut reader = RawReader::new(TrigTable { rows: make_table() });
        match reader.next_readout() {
            Ok(Some(r)) => assert!(r.trig_data().is_none()),
            _ => panic!(),
        }
        match reader.next_readout() {
            Ok(Some(r)) => match r.trig_data() {
                Some(td) => assert_eq!(td.event_size(), 2),
                None => panic!(),
            },
            _ => panic!(),
        }
    }
}
