use std::collections::BTreeMap;

use super::error::RawReadoutError;
use super::pmt_data::PmtDataEntry;
use super::raw_card::RawCard;
use super::raw_channel::RawChannel;
use super::raw_trig_data::RawTrigData;

/// A full readout from all of the DAQ VME cards.
///
/// Includes data for a single trigger in non-Hefty mode or multiple triggers (one per
/// minibuffer) in Hefty mode. The SequenceID is unique within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReadout {
    sequence_id: i32,
    cards: BTreeMap<u32, RawCard>,
    trig_data: Option<RawTrigData>,
}

impl RawReadout {
    pub fn new(sequence_id: i32) -> Self {
        Self {
            sequence_id,
            cards: BTreeMap::new(),
            trig_data: None,
        }
    }

    pub fn sequence_id(&self) -> i32 {
        self.sequence_id
    }

    /// Decode a PMTData row and add the resulting card to the readout.
    ///
    /// Fails if the row belongs to another sequence, if a card with the same index is
    /// already present (unless `overwrite_ok`), or if the row cannot be decoded.
    pub fn add_card(
        &mut self,
        entry: &PmtDataEntry,
        overwrite_ok: bool,
    ) -> Result<(), RawReadoutError> {
        if entry.sequence_id != self.sequence_id {
            return Err(RawReadoutError::MismatchedSequenceID(
                entry.sequence_id,
                self.sequence_id,
            ));
        }
        if self.cards.contains_key(&entry.card_id) && !overwrite_ok {
            return Err(RawReadoutError::CardOverwrite(entry.card_id));
        }
        let card = RawCard::new(entry)?;
        self.cards.insert(entry.card_id, card);
        Ok(())
    }

    pub fn cards(&self) -> &BTreeMap<u32, RawCard> {
        &self.cards
    }

    pub fn card(&self, index: u32) -> Result<&RawCard, RawReadoutError> {
        self.cards.get(&index).ok_or(RawReadoutError::BadCard(index))
    }

    pub fn channel(
        &self,
        card_index: u32,
        channel_index: u32,
    ) -> Result<&RawChannel, RawReadoutError> {
        Ok(self.card(card_index)?.channel(channel_index)?)
    }

    pub fn trig_data(&self) -> Option<&RawTrigData> {
        self.trig_data.as_ref()
    }

    pub fn set_trig_data(&mut self, trig_data: RawTrigData) {
        self.trig_data = Some(trig_data);
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
