use super::bank::decode_cluster;
use super::constants::*;
use super::error::BankError;
use super::primitives::{
    CalibrationKind, CalibrationTrigger, DecodedPrimitive, FeeTrigger, MultiplicityTrigger,
    PairsTrigger, SinglesTrigger,
};
use super::trigger_bank::continuation_word;

/// Decode the second-generation trigger processor bank.
///
/// Same defining-word scan as the first generation, but trigger reports are
/// single words carrying their own 10-bit report time, and the report set
/// grows multiplicity and FEE types. Only trigger time and cluster records
/// consume a continuation word.
pub fn decode_vtp_bank(words: &[u32]) -> Result<Vec<DecodedPrimitive>, BankError> {
    let mut primitives = Vec::new();
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        if word & DEFINING_WORD_BIT == 0 {
            spdlog::warn!(
                "VTP bank has stray continuation word 0x{:08X} at index {}",
                word,
                index
            );
            index += 1;
            continue;
        }

        let time_ns = (word & REPORT_TIME_MASK) as u64 * CLOCK_NS_PER_TICK;
        match (word >> RECORD_TYPE_SHIFT) & RECORD_TYPE_MASK {
            RECORD_BLOCK_HEADER | RECORD_BLOCK_TRAILER => {}
            RECORD_EVENT_HEADER => {
                spdlog::trace!("VTP bank event number {}", word & EVENT_NUMBER_MASK);
            }
            RECORD_TRIGGER_TIME => {
                let high = continuation_word(words, index, VTP_BANK_TAG)?;
                let ticks = ((high & TRIGGER_TIME_MASK) as u64) << TRIGGER_TIME_HIGH_SHIFT
                    | (word & TRIGGER_TIME_MASK) as u64;
                spdlog::trace!("VTP bank window anchor at {} ns", ticks * CLOCK_NS_PER_TICK);
                index += 1;
            }
            RECORD_CLUSTER => {
                let word1 = continuation_word(words, index, VTP_BANK_TAG)?;
                primitives.push(DecodedPrimitive::Cluster(decode_cluster(word, word1)));
                index += 1;
            }
            RECORD_SINGLES => {
                primitives.push(DecodedPrimitive::Singles(SinglesTrigger {
                    instance: u8::from(word & SINGLES_INSTANCE_BIT != 0),
                    pass_bits: ((word >> SINGLES_PASS_SHIFT) & SINGLES_PASS_MASK) as u16,
                    is_top: word & SINGLES_TOP_BIT != 0,
                    time_ns,
                }));
            }
            RECORD_PAIRS => {
                primitives.push(DecodedPrimitive::Pairs(PairsTrigger {
                    instance: u8::from(word & PAIRS_INSTANCE_BIT != 0),
                    pass_bits: ((word >> PAIRS_PASS_SHIFT) & PAIRS_PASS_MASK) as u16,
                    time_ns,
                }));
            }
            RECORD_CALIBRATION => {
                // One report word can flag several calibration sources at
                // once; each becomes its own primitive.
                let kinds = [
                    (CALIB_COSMIC_BIT, CalibrationKind::Cosmic),
                    (CALIB_LED_BIT, CalibrationKind::Led),
                    (CALIB_HODOSCOPE_BIT, CalibrationKind::Hodoscope),
                    (CALIB_PULSER_BIT, CalibrationKind::Pulser),
                ];
                let mut any = false;
                for (bit, kind) in kinds {
                    if word & bit != 0 {
                        any = true;
                        primitives.push(DecodedPrimitive::Calibration(CalibrationTrigger {
                            kind,
                            time_ns,
                        }));
                    }
                }
                if !any {
                    spdlog::warn!("VTP calibration report at index {} flags no source", index);
                }
            }
            RECORD_MULTIPLICITY => {
                primitives.push(DecodedPrimitive::Multiplicity(MultiplicityTrigger {
                    top_count: ((word >> MULT_TOP_SHIFT) & MULT_TOP_MASK) as u8,
                    bot_count: ((word >> MULT_BOT_SHIFT) & MULT_BOT_MASK) as u8,
                    total_count: ((word >> MULT_TOTAL_SHIFT) & MULT_TOTAL_MASK) as u8,
                    instance: u8::from(word & MULT_INSTANCE_BIT != 0),
                    time_ns,
                }));
            }
            RECORD_FEE => {
                primitives.push(DecodedPrimitive::Fee(FeeTrigger {
                    region_bits: ((word >> FEE_REGION_SHIFT) & FEE_REGION_MASK) as u8,
                    time_ns,
                }));
            }
            other => {
                spdlog::warn!("VTP bank has unknown record type {} at index {}", other, index);
            }
        }
        index += 1;
    }
    Ok(primitives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defining(record_type: u32, payload: u32) -> u32 {
        DEFINING_WORD_BIT | (record_type << RECORD_TYPE_SHIFT) | payload
    }

    #[test]
    fn test_singles_report_fields() {
        let word = defining(
            RECORD_SINGLES,
            SINGLES_INSTANCE_BIT | SINGLES_TOP_BIT | (0x1AB << SINGLES_PASS_SHIFT) | 50,
        );
        let primitives = decode_vtp_bank(&[word]).unwrap();
        assert_eq!(
            primitives,
            vec![DecodedPrimitive::Singles(SinglesTrigger {
                instance: 1,
                pass_bits: 0x1AB,
                is_top: true,
                time_ns: 200,
            })]
        );
    }

    #[test]
    fn test_multiplicity_report_counts() {
        let word = defining(
            RECORD_MULTIPLICITY,
            (3 << MULT_TOP_SHIFT) | (2 << MULT_BOT_SHIFT) | (5 << MULT_TOTAL_SHIFT) | 12,
        );
        let primitives = decode_vtp_bank(&[word]).unwrap();
        assert_eq!(
            primitives,
            vec![DecodedPrimitive::Multiplicity(MultiplicityTrigger {
                top_count: 3,
                bot_count: 2,
                total_count: 5,
                instance: 0,
                time_ns: 48,
            })]
        );
    }

    #[test]
    fn test_fee_report_region_bits() {
        let word = defining(RECORD_FEE, (0b0101_001 << FEE_REGION_SHIFT) | 7);
        let primitives = decode_vtp_bank(&[word]).unwrap();
        assert_eq!(
            primitives,
            vec![DecodedPrimitive::Fee(FeeTrigger {
                region_bits: 0b0101_001,
                time_ns: 28,
            })]
        );
    }

    #[test]
    fn test_calibration_report_fans_out_per_source() {
        let word = defining(RECORD_CALIBRATION, CALIB_LED_BIT | CALIB_PULSER_BIT | 1);
        let primitives = decode_vtp_bank(&[word]).unwrap();
        assert_eq!(primitives.len(), 2);
        assert_eq!(
            primitives[0],
            DecodedPrimitive::Calibration(CalibrationTrigger {
                kind: CalibrationKind::Led,
                time_ns: 4,
            })
        );
        assert_eq!(
            primitives[1],
            DecodedPrimitive::Calibration(CalibrationTrigger {
                kind: CalibrationKind::Pulser,
                time_ns: 4,
            })
        );
    }

    #[test]
    fn test_single_word_reports_do_not_consume_following_records() {
        let singles = defining(RECORD_SINGLES, 5);
        let fee = defining(RECORD_FEE, (1 << FEE_REGION_SHIFT) | 9);
        let primitives = decode_vtp_bank(&[singles, fee]).unwrap();
        assert_eq!(primitives.len(), 2);
        assert!(matches!(primitives[1], DecodedPrimitive::Fee(_)));
    }
}
