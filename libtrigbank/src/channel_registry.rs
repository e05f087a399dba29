use std::fs::File;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;

use super::constants::CHANNEL_COUNT;
use super::error::RegistryError;

const ENTRIES_PER_LINE: usize = 6; // crate, slot, channel, x, y, id

/// Load the default map for windows
#[cfg(target_family = "windows")]
fn load_default_map() -> String {
    String::from(include_str!("data\\default_channel_map.csv"))
}

/// Load the default map for macos and linux
#[cfg(target_family = "unix")]
fn load_default_map() -> String {
    String::from(include_str!("data/default_channel_map.csv"))
}

/// Front-end address of one calorimeter channel: the readout crate, the FADC
/// slot within it, and the FADC channel within the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAddress {
    pub crate_id: u8,
    pub slot: u8,
    pub channel: u8,
}

/// One channel of the calorimeter: its front-end address, its geometric
/// column/row indices, and its stable identity in 1..=442.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub address: ChannelAddress,
    pub x: i16,
    pub y: i16,
    pub id: u16,
}

/// Pack a front-end address into a single lookup key.
pub fn pack_address(crate_id: u8, slot: u8, channel: u8) -> u32 {
    (channel as u32) + (slot as u32) * 100 + (crate_id as u32) * 10_000
}

/// Read-only snapshot of the channel registry supplied by the conditions
/// system.
///
/// The cabling changes between run periods, so the snapshot is read from a
/// CSV file where each row is `crate,slot,channel,x,y,id` with no
/// whitespace. A default map is bundled with the library.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    by_address: FxHashMap<u32, RegistryEntry>,
    by_id: Vec<Option<RegistryEntry>>,
}

impl ChannelRegistry {
    /// Create a new ChannelRegistry
    /// If the path is None, we load the default that is bundled with the library
    pub fn new(path: Option<&Path>) -> Result<Self, RegistryError> {
        let mut contents = String::new();
        if let Some(p) = path {
            let mut file = File::open(p)?;
            file.read_to_string(&mut contents)?;
        } else {
            contents = load_default_map();
        }

        let mut registry = ChannelRegistry {
            by_address: FxHashMap::default(),
            by_id: vec![None; CHANNEL_COUNT as usize + 1],
        };

        let mut lines = contents.lines();
        lines.next(); // Skip the header
        for line in lines {
            let entries: Vec<&str> = line.split_terminator(',').collect();
            if entries.len() != ENTRIES_PER_LINE {
                return Err(RegistryError::BadFileFormat);
            }

            let address = ChannelAddress {
                crate_id: entries[0].parse()?,
                slot: entries[1].parse()?,
                channel: entries[2].parse()?,
            };
            let entry = RegistryEntry {
                address,
                x: entries[3].parse()?,
                y: entries[4].parse()?,
                id: entries[5].parse()?,
            };

            if entry.id < 1 || entry.id > CHANNEL_COUNT {
                return Err(RegistryError::BadChannelId(entry.id));
            }

            let key = pack_address(address.crate_id, address.slot, address.channel);
            registry.by_id[entry.id as usize] = Some(entry.clone());
            registry.by_address.insert(key, entry);
        }

        Ok(registry)
    }

    /// Look up the channel wired to a front-end address.
    ///
    /// Returns None if nothing is cabled there.
    pub fn entry_for_address(&self, crate_id: u8, slot: u8, channel: u8) -> Option<&RegistryEntry> {
        self.by_address.get(&pack_address(crate_id, slot, channel))
    }

    /// Look up a channel by its stable identity. Returns None for identities
    /// the snapshot does not cover.
    pub fn entry_for_id(&self, id: u16) -> Option<&RegistryEntry> {
        self.by_id.get(id as usize).and_then(|e| e.as_ref())
    }

    /// All channels in the snapshot, in identity order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.by_id.iter().filter_map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
