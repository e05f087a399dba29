use super::constants::*;
use super::error::BankError;
use super::primitives::TimingSummary;

// Fixed word positions within the timing-summary bank.
const WORD_FLAGS: usize = 0;
const WORD_TRIGGER_NUMBER: usize = 1;
const WORD_CLOCK_LOW: usize = 2;
const WORD_CLOCK_HIGH: usize = 3;

/// Decode the fixed five-word timing-summary bank.
///
/// Word 0 packs the per-path trigger flags, word 1 is the trigger number and
/// words 2-3 hold the 48-bit monotonic clock, low word first.
pub fn decode_timing_bank(words: &[u32]) -> Result<TimingSummary, BankError> {
    if words.len() != TIMING_BANK_SIZE {
        return Err(BankError::LengthMismatch {
            tag: TIMING_BANK_TAG,
            expected: TIMING_BANK_SIZE,
            found: words.len(),
        });
    }

    let flags = words[WORD_FLAGS];
    let low = words[WORD_CLOCK_LOW] as u64;
    let high_word = words[WORD_CLOCK_HIGH];
    if high_word & !TIMING_CLOCK_HIGH_MASK != 0 {
        spdlog::warn!(
            "Timing bank clock high word 0x{:X} has bits set above the 16-bit field",
            high_word
        );
    }
    let high = (high_word & TIMING_CLOCK_HIGH_MASK) as u64;
    let ticks = low + (high << 32);

    Ok(TimingSummary {
        singles: [
            flags & TIMING_SINGLES_0_BIT != 0,
            flags & TIMING_SINGLES_1_BIT != 0,
        ],
        pairs: [
            flags & TIMING_PAIRS_0_BIT != 0,
            flags & TIMING_PAIRS_1_BIT != 0,
        ],
        calibration: flags & TIMING_CALIBRATION_BIT != 0,
        pulser: flags & TIMING_PULSER_BIT != 0,
        trigger_number: words[WORD_TRIGGER_NUMBER],
        time_ns: ticks * CLOCK_NS_PER_TICK,
    })
}
