//! # trigbank
//!
//! trigbank decodes the raw data banks produced by the calorimeter trigger
//! and readout electronics, and assembles the trigger/DAQ configuration
//! reported alongside them into a single queryable tree.
//!
//! Two kinds of input are handled:
//!
//! - Per-event binary banks: the event header bank, the timing-summary bank,
//!   both generations of trigger processor banks (clusters and
//!   singles/pairs/calibration/multiplicity/FEE reports), the legacy
//!   test-run trigger bank and the TDC bank. Each decoder reproduces the
//!   bit-exact hardware encoding, including two's-complement cluster
//!   indices and multi-word clock fields.
//! - Per-crate plain-text configuration tables: accumulated by
//!   [`config_parser::ConfigTableParser`], joined with a
//!   [`channel_registry::ChannelRegistry`] snapshot by the assembler, and
//!   published through [`config_manager::ConfigurationManager`] once all
//!   required crates have contributed.
//!
//! ## Decoding banks
//!
//! ```no_run
//! use libtrigbank::bank::{EventDecoder, RawBank};
//! use libtrigbank::constants::TIMING_BANK_TAG;
//!
//! let mut decoder = EventDecoder::new();
//! let bank = RawBank::new(TIMING_BANK_TAG, 37, vec![0x3, 1, 100, 0, 0]);
//! let primitives = decoder.decode(&bank).unwrap();
//! for primitive in primitives {
//!     println!("{}", primitive.kind_name());
//! }
//! ```
//!
//! ## Assembling a configuration
//!
//! ```no_run
//! use libtrigbank::channel_registry::ChannelRegistry;
//! use libtrigbank::config_manager::ConfigurationManager;
//! use libtrigbank::config_parser::ConfigTableParser;
//!
//! let registry = ChannelRegistry::new(None).unwrap();
//! let manager = ConfigurationManager::new();
//! let mut parser = ConfigTableParser::new();
//! for (crate_id, table) in [(37, "..."), (39, "..."), (46, "..."), (58, "...")] {
//!     parser.ingest(crate_id, 5772, &[table]);
//!     manager.update(&parser, &registry);
//! }
//! if let Some(config) = manager.get() {
//!     println!("gain for channel 1: {:?}", config.fadc.gain(1));
//! }
//! ```
//!
//! The manager only swaps in a configuration assembled from a complete
//! cycle; until then `get` keeps returning the previous one (or nothing).
//!
//! ## Channel map format
//!
//! The channel registry is a CSV file with *no* whitespaces. The columns are
//! as follows:
//!
//! ```csv
//! crate,slot,channel,x,y,id
//! ```
//!
//! The crate, slot and channel columns denote the front-end address; x and y
//! are the geometric column/row indices (negative values below/left of the
//! beam plane, index zero unused) and id is the stable channel identity in
//! 1..=442. A default map is bundled with the library.
pub mod bank;
pub mod channel_registry;
pub mod config_builder;
pub mod config_manager;
pub mod config_parser;
pub mod constants;
pub mod daq_config;
pub mod dump_file;
pub mod error;
pub mod head_bank;
pub mod job;
pub mod primitives;
pub mod process;
pub mod tdc_bank;
pub mod test_run_bank;
pub mod ti_bank;
pub mod trigger_bank;
pub mod vtp_bank;
