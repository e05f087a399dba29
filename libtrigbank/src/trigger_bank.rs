use super::bank::decode_cluster;
use super::constants::*;
use super::error::BankError;
use super::primitives::{
    CalibrationKind, CalibrationTrigger, DecodedPrimitive, PairsTrigger, SinglesTrigger,
};

/// Fetch the continuation word of a two-word record.
///
/// A defining word in the continuation slot means the hardware dropped the
/// trailing word; scanning on from there would corrupt every later record in
/// the bank, so this is fatal for the whole bank.
pub(crate) fn continuation_word(words: &[u32], index: usize, tag: u32) -> Result<u32, BankError> {
    match words.get(index + 1) {
        Some(&word) if word & DEFINING_WORD_BIT == 0 => Ok(word),
        _ => Err(BankError::TruncatedRecord { tag, index }),
    }
}

/// Decode the first-generation trigger processor bank.
///
/// The bank is a word-by-word scan: defining words select a record type, and
/// trigger time, cluster and trigger records each consume one continuation
/// word. Block headers and trailers delimit readout blocks and carry nothing
/// the consumers need.
pub fn decode_trigger_bank(words: &[u32]) -> Result<Vec<DecodedPrimitive>, BankError> {
    let mut primitives = Vec::new();
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        if word & DEFINING_WORD_BIT == 0 {
            spdlog::warn!(
                "Trigger bank has stray continuation word 0x{:08X} at index {}",
                word,
                index
            );
            index += 1;
            continue;
        }

        match (word >> RECORD_TYPE_SHIFT) & RECORD_TYPE_MASK {
            RECORD_BLOCK_HEADER | RECORD_BLOCK_TRAILER => {}
            RECORD_EVENT_HEADER => {
                spdlog::trace!("Trigger bank event number {}", word & EVENT_NUMBER_MASK);
            }
            RECORD_TRIGGER_TIME => {
                let high = continuation_word(words, index, TRIGGER_BANK_TAG)?;
                let ticks = ((high & TRIGGER_TIME_MASK) as u64) << TRIGGER_TIME_HIGH_SHIFT
                    | (word & TRIGGER_TIME_MASK) as u64;
                spdlog::trace!("Trigger bank window anchor at {} ns", ticks * CLOCK_NS_PER_TICK);
                index += 1;
            }
            RECORD_CLUSTER => {
                let word1 = continuation_word(words, index, TRIGGER_BANK_TAG)?;
                primitives.push(DecodedPrimitive::Cluster(decode_cluster(word, word1)));
                index += 1;
            }
            RECORD_TRIGGER => {
                let word1 = continuation_word(words, index, TRIGGER_BANK_TAG)?;
                if let Some(primitive) = decode_trigger_record(word, word1) {
                    primitives.push(primitive);
                }
                index += 1;
            }
            other => {
                spdlog::warn!("Trigger bank has unknown record type {} at index {}", other, index);
            }
        }
        index += 1;
    }
    Ok(primitives)
}

/// Decode one two-word trigger record. Returns None for kinds this
/// generation of hardware never emits.
fn decode_trigger_record(word0: u32, word1: u32) -> Option<DecodedPrimitive> {
    let instance = u8::from(word0 & TRIGGER_INSTANCE_BIT != 0);
    let is_top = word0 & TRIGGER_TOP_BIT != 0;
    let pass_bits = ((word0 >> TRIGGER_PASS_SHIFT) & TRIGGER_PASS_MASK) as u16;
    let time_ns = (word1 & REPORT_TIME_MASK) as u64 * CLOCK_NS_PER_TICK;

    match (word0 >> TRIGGER_KIND_SHIFT) & TRIGGER_KIND_MASK {
        TRIGGER_KIND_SINGLES => Some(DecodedPrimitive::Singles(SinglesTrigger {
            instance,
            pass_bits,
            is_top,
            time_ns,
        })),
        TRIGGER_KIND_PAIRS => Some(DecodedPrimitive::Pairs(PairsTrigger {
            instance,
            pass_bits,
            time_ns,
        })),
        TRIGGER_KIND_COSMIC => Some(DecodedPrimitive::Calibration(CalibrationTrigger {
            kind: CalibrationKind::Cosmic,
            time_ns,
        })),
        other => {
            spdlog::warn!("Trigger record has unknown kind {}", other);
            None
        }
    }
}
