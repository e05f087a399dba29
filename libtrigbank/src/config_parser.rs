use bit_set::BitSet;
use fxhash::FxHashMap;

use super::channel_registry::pack_address;
use super::constants::FADC_CHANNELS_PER_SLOT;

/// The source crates that must each contribute a table before a
/// configuration cycle is complete.
pub const REQUIRED_CRATES: [u8; 4] = [37, 39, 46, 58];

// Hardware trigger-identification codes carried by the trigger I/O source
// entries, one per trigger instance.
const SINGLES_IO_SRC: [u32; 2] = [20, 21];
const PAIRS_IO_SRC: [u32; 2] = [22, 23];

// While fewer than this many banks have been ingested a missing key is
// expected; afterwards it means the configuration dump is incomplete.
// Newer front-end generations ship a different number of source tables, so
// this count may need to become format-dependent.
const RAMP_UP_BANKS: usize = 3;

// Runs in this window recorded no clustering entries at all; see
// patch_bad_run below.
const BAD_RUN_FIRST: u32 = 3100;
const BAD_RUN_LAST: u32 = 3470;

const DEFAULT_VALUE: &str = "0";

/// Accumulates raw configuration parameters from the per-crate text tables.
///
/// Each table row is `KEY value value ...`. Most rows land in a key/value
/// map with minimal interpretation; the per-channel FADC blocks and the
/// trigger I/O source rows get special routing. One parser instance owns one
/// configuration-gathering session and is not safe for concurrent mutation.
#[derive(Debug, Clone, Default)]
pub struct ConfigTableParser {
    params: FxHashMap<String, Vec<String>>,
    crates_seen: BitSet,
    banks_seen: usize,
    // The FADC slot arrives on its own row ahead of the channel-parameter
    // rows, which makes this table order-dependent.
    last_slot: u8,
    gains: FxHashMap<u32, f32>,
    pedestals: FxHashMap<u32, f32>,
    thresholds: FxHashMap<u32, u32>,
    singles_enabled: [bool; 2],
    pairs_enabled: [bool; 2],
}

impl ConfigTableParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest the configuration tables reported by one crate.
    pub fn ingest(&mut self, crate_id: u8, run_number: u32, tables: &[&str]) {
        self.banks_seen += 1;
        self.crates_seen.insert(crate_id as usize);
        for table in tables {
            self.load_table(crate_id, table);
        }
        self.patch_bad_run(run_number);
    }

    fn load_table(&mut self, crate_id: u8, table: &str) {
        for line in table.trim().lines() {
            let mut tokens = line.split_whitespace();
            let key = match tokens.next() {
                Some(k) => k,
                None => continue,
            };
            let mut vals: Vec<String> = tokens.map(String::from).collect();
            if vals.is_empty() {
                continue;
            }

            if key.starts_with("FADC250") {
                self.route_fadc(crate_id, key, &vals);
            } else if key.starts_with("SSP_HPS_SET_IO_SRC") {
                // The second value is a hardware code identifying which
                // trigger this I/O line carries.
                self.route_io_src(&vals);
            }

            // Rows sharing a nominal key are disambiguated by splicing the
            // first value into the key itself.
            let mut key = String::from(key);
            if vals.len() > 1 && key.starts_with("SSP") {
                key.push('_');
                key.push_str(&vals.remove(0));
            }

            self.params.insert(key, vals);
        }
    }

    fn route_io_src(&mut self, vals: &[String]) {
        let code = match vals.get(1).and_then(|v| v.parse::<u32>().ok()) {
            Some(c) => c,
            None => {
                spdlog::warn!("Trigger I/O source row carries no parseable hardware code");
                return;
            }
        };
        for ii in 0..PAIRS_IO_SRC.len() {
            if code == SINGLES_IO_SRC[ii] {
                self.singles_enabled[ii] = true;
            } else if code == PAIRS_IO_SRC[ii] {
                self.pairs_enabled[ii] = true;
            }
        }
    }

    fn route_fadc(&mut self, crate_id: u8, key: &str, vals: &[String]) {
        match key {
            "FADC250_SLOT" => {
                if let Ok(slot) = vals[0].parse::<u8>() {
                    self.last_slot = slot;
                } else {
                    spdlog::warn!("FADC250_SLOT row carries unparseable slot {:?}", vals[0]);
                }
            }
            "FADC250_ALLCH_TET" => {
                let slot = self.last_slot;
                Self::store_channel_values(crate_id, slot, &mut self.thresholds, vals);
            }
            "FADC250_ALLCH_PED" => {
                let slot = self.last_slot;
                Self::store_channel_values(crate_id, slot, &mut self.pedestals, vals);
            }
            "FADC250_ALLCH_GAIN" => {
                let slot = self.last_slot;
                Self::store_channel_values(crate_id, slot, &mut self.gains, vals);
            }
            _ => {}
        }
    }

    /// Map sixteen per-channel values onto the front-end addresses of the
    /// most recently seen slot.
    fn store_channel_values<T: std::str::FromStr>(
        crate_id: u8,
        slot: u8,
        map: &mut FxHashMap<u32, T>,
        vals: &[String],
    ) {
        if vals.len() < FADC_CHANNELS_PER_SLOT {
            spdlog::warn!(
                "FADC channel block for crate {} slot {} has only {} values",
                crate_id,
                slot,
                vals.len()
            );
        }
        for (channel, val) in vals.iter().take(FADC_CHANNELS_PER_SLOT).enumerate() {
            match val.parse::<T>() {
                Ok(parsed) => {
                    map.insert(pack_address(crate_id, slot, channel as u8), parsed);
                }
                Err(_) => {
                    spdlog::warn!(
                        "FADC channel block for crate {} slot {} channel {} carries unparseable value {:?}",
                        crate_id,
                        slot,
                        channel,
                        val
                    );
                }
            }
        }
    }

    /// Runs 3100-3470 recorded no clustering entries; force the two affected
    /// keys to an all-zero default so downstream extraction does not treat
    /// the run as invalid. This workaround is deliberately narrow; do not
    /// widen it without confirmation from the run logs.
    fn patch_bad_run(&mut self, run_number: u32) {
        if !(BAD_RUN_FIRST..=BAD_RUN_LAST).contains(&run_number) {
            return;
        }
        for key in ["GTP_CLUSTER_THRESH", "GTP_TIMEDIFF"] {
            self.params
                .entry(String::from(key))
                .or_insert_with(|| vec![String::from("0"); 4]);
        }
    }

    /// Get one parameter value.
    ///
    /// An absent key resolves to "0". Early in a cycle that is expected and
    /// logged quietly; once enough banks have arrived it is an error. An
    /// index past the end of an existing value list is always an error.
    pub fn get(&self, key: &str, index: usize) -> &str {
        match self.params.get(key) {
            Some(vals) => match vals.get(index) {
                Some(val) => val,
                None => {
                    spdlog::error!(
                        "Parameter {} has no value at index {} (only {} present)",
                        key,
                        index,
                        vals.len()
                    );
                    DEFAULT_VALUE
                }
            },
            None => {
                if self.banks_seen < RAMP_UP_BANKS {
                    spdlog::info!("Parameter {} not present yet; still waiting on banks", key);
                } else {
                    spdlog::error!(
                        "Parameter {} missing after {} banks",
                        key,
                        self.banks_seen
                    );
                }
                DEFAULT_VALUE
            }
        }
    }

    /// Get a trigger parameter through the generated key scheme
    /// `SSP_HPS_<STUB>_<TRIGGER>`.
    pub fn get_trigger(&self, trigger: usize, stub: &str, index: usize) -> &str {
        self.get(&format!("SSP_HPS_{stub}_{trigger}"), index)
    }

    pub fn get_int(&self, key: &str, index: usize) -> u32 {
        parse_or_zero(self.get(key, index), key)
    }

    pub fn get_trigger_int(&self, trigger: usize, stub: &str, index: usize) -> u32 {
        let key = format!("SSP_HPS_{stub}_{trigger}");
        parse_or_zero(self.get(&key, index), &key)
    }

    pub fn get_trigger_float(&self, trigger: usize, stub: &str, index: usize) -> f64 {
        let key = format!("SSP_HPS_{stub}_{trigger}");
        let val = self.get(&key, index);
        match val.parse::<f64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                spdlog::warn!("Parameter {} value {:?} is not a number", key, val);
                0.0
            }
        }
    }

    pub fn get_trigger_bool(&self, trigger: usize, stub: &str, index: usize) -> bool {
        self.get_trigger(trigger, stub, index) == "1"
    }

    /// Number of configuration banks ingested this session.
    pub fn banks_seen(&self) -> usize {
        self.banks_seen
    }

    /// True once every required source crate has contributed.
    pub fn has_required_crates(&self) -> bool {
        REQUIRED_CRATES
            .iter()
            .all(|c| self.crates_seen.contains(*c as usize))
    }

    pub fn crates_seen(&self) -> usize {
        self.crates_seen.len()
    }

    pub fn singles_enabled(&self) -> [bool; 2] {
        self.singles_enabled
    }

    pub fn pairs_enabled(&self) -> [bool; 2] {
        self.pairs_enabled
    }

    pub fn gain(&self, crate_id: u8, slot: u8, channel: u8) -> Option<f32> {
        self.gains.get(&pack_address(crate_id, slot, channel)).copied()
    }

    pub fn pedestal(&self, crate_id: u8, slot: u8, channel: u8) -> Option<f32> {
        self.pedestals
            .get(&pack_address(crate_id, slot, channel))
            .copied()
    }

    pub fn threshold(&self, crate_id: u8, slot: u8, channel: u8) -> Option<u32> {
        self.thresholds
            .get(&pack_address(crate_id, slot, channel))
            .copied()
    }
}

fn parse_or_zero(val: &str, key: &str) -> u32 {
    match val.parse::<u32>() {
        Ok(parsed) => parsed,
        Err(_) => {
            spdlog::warn!("Parameter {} value {:?} is not an integer", key, val);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_writer_wins_per_key() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(37, 5772, &["FOO 1 2 3"]);
        parser.ingest(39, 5772, &["FOO 4 5 6"]);
        assert_eq!(parser.get("FOO", 0), "4");
        assert_eq!(parser.get("FOO", 2), "6");
    }

    #[test]
    fn test_short_lines_skipped() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(37, 5772, &["LONELY\n\nBAR 7"]);
        assert_eq!(parser.get("LONELY", 0), "0");
        assert_eq!(parser.get("BAR", 0), "7");
    }

    #[test]
    fn test_missing_key_and_index_default_to_zero() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(37, 5772, &["BAR 7"]);
        assert_eq!(parser.get("NOPE", 0), "0");
        assert_eq!(parser.get("BAR", 5), "0");
    }

    #[test]
    fn test_trigger_key_splice() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(46, 5772, &["SSP_HPS_SINGLES_EMIN 1 500 1"]);
        assert_eq!(parser.get_trigger(1, "SINGLES_EMIN", 0), "500");
        assert!(parser.get_trigger_bool(1, "SINGLES_EMIN", 1));
        // The unspliced key must not exist.
        assert_eq!(parser.get("SSP_HPS_SINGLES_EMIN", 0), "0");
    }

    #[test]
    fn test_io_src_codes_set_enable_flags() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(46, 5772, &["SSP_HPS_SET_IO_SRC 1 21\nSSP_HPS_SET_IO_SRC 2 22"]);
        assert_eq!(parser.singles_enabled(), [false, true]);
        assert_eq!(parser.pairs_enabled(), [true, false]);
    }

    #[test]
    fn test_fadc_block_uses_most_recent_slot() {
        let mut parser = ConfigTableParser::new();
        let table = "FADC250_SLOT 5\n\
                     FADC250_ALLCH_GAIN 0.1 0.2 0.3 0.4 0.5 0.6 0.7 0.8 0.9 1.0 1.1 1.2 1.3 1.4 1.5 1.6\n\
                     FADC250_SLOT 6\n\
                     FADC250_ALLCH_TET 12 12 12 12 12 12 12 12 12 12 12 12 12 12 12 12";
        parser.ingest(37, 5772, &[table]);
        assert_eq!(parser.gain(37, 5, 0), Some(0.1));
        assert_eq!(parser.gain(37, 5, 15), Some(1.6));
        assert_eq!(parser.gain(37, 6, 0), None);
        assert_eq!(parser.threshold(37, 6, 3), Some(12));
        assert_eq!(parser.threshold(37, 5, 3), None);
    }

    #[test]
    fn test_bad_run_patch_fills_absent_keys_only() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(37, 3200, &["GTP_TIMEDIFF 10 20"]);
        // Present key untouched, absent key force-populated.
        assert_eq!(parser.get("GTP_TIMEDIFF", 0), "10");
        assert_eq!(parser.get("GTP_CLUSTER_THRESH", 3), "0");
        assert_eq!(parser.get_int("GTP_CLUSTER_THRESH", 0), 0);
    }

    #[test]
    fn test_good_run_not_patched() {
        let mut parser = ConfigTableParser::new();
        parser.ingest(37, 5772, &["BAR 7"]);
        assert!(parser.params.get("GTP_CLUSTER_THRESH").is_none());
    }

    #[test]
    fn test_required_crate_tracking() {
        let mut parser = ConfigTableParser::new();
        for crate_id in [37, 39, 46] {
            parser.ingest(crate_id, 5772, &["BAR 7"]);
            assert!(!parser.has_required_crates());
        }
        parser.ingest(58, 5772, &["BAR 7"]);
        assert!(parser.has_required_crates());
        assert_eq!(parser.banks_seen(), 4);
    }
}
