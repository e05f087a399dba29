use super::constants::{CLOCK_NS_PER_TICK, TEST_RUN_BANK_SIZE, TEST_RUN_BANK_TAG};
use super::error::BankError;
use super::primitives::LegacyTriggerCounts;

// Fixed word positions. Words 6-7 are reserved and were never populated by
// the test-run firmware.
const WORD_TIME: usize = 0;
const WORD_AND: usize = 1;
const WORD_OR: usize = 2;
const WORD_TOP: usize = 3;
const WORD_BOTTOM: usize = 4;
const WORD_PAIR: usize = 5;

/// Decode the fixed eight-word trigger bank written during the test run.
pub fn decode_test_run_bank(words: &[u32]) -> Result<LegacyTriggerCounts, BankError> {
    if words.len() != TEST_RUN_BANK_SIZE {
        return Err(BankError::LengthMismatch {
            tag: TEST_RUN_BANK_TAG,
            expected: TEST_RUN_BANK_SIZE,
            found: words.len(),
        });
    }

    Ok(LegacyTriggerCounts {
        time_ns: words[WORD_TIME] as u64 * CLOCK_NS_PER_TICK,
        and_count: words[WORD_AND],
        or_count: words[WORD_OR],
        top_count: words[WORD_TOP],
        bottom_count: words[WORD_BOTTOM],
        pair_count: words[WORD_PAIR],
    })
}
