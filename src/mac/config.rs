

use crate::error::ConfigError;
use crate::PeerId;

use super::slot::{Slot, MAX_SLOTS};

/// MAC scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacType {
    /// Centralized polling: this node invites every peer in the configured
    /// cycle to transmit on its turn
    Polled,
    /// Decentralized TDMA over a fixed, pre-agreed cycle
    FixedDecentralized,
    /// Decentralized TDMA with peer autodiscovery and silent-peer expiry
    AutoDecentralized,
}

/// Configuration for the MAC manager
#[derive(Debug, Clone, PartialEq)]
pub struct MacConfig {
    pub mac_type: MacType,

    /// Identity of this node on the acoustic channel
    pub modem_id: PeerId,

    /// Default slot duration in seconds.
    ///
    /// Used for every slot in auto mode (uniform slot length is what keeps
    /// discovered cycles aligned), and for any configured slot that omits
    /// its own duration.
    pub slot_seconds: u32,

    /// Default modulation rate index, forwarded to the driver
    pub rate: i32,

    /// Evict a peer after this many whole cycles of silence (auto mode)
    pub expire_cycles: u32,

    /// Pre-declared cycle for the polled and fixed schemes; ignored in
    /// auto mode
    pub cycle: heapless::Vec<Slot, MAX_SLOTS>,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            mac_type: MacType::FixedDecentralized,
            modem_id: 1,
            slot_seconds: 10,
            rate: 0,
            expire_cycles: 5,
            cycle: heapless::Vec::new(),
        }
    }
}

impl MacConfig {
    /// Check the fields a broken deployment most often gets wrong
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_seconds == 0 {
            return Err(ConfigError::ZeroSlotSeconds);
        }
        if self.expire_cycles == 0 {
            return Err(ConfigError::ZeroExpireCycles);
        }
        if self.modem_id < 0 {
            return Err(ConfigError::InvalidModemId(self.modem_id));
        }
        Ok(())
    }

    /// Fill a configured slot's omitted fields from the defaults
    pub(crate) fn normalize(&self, mut slot: Slot) -> Slot {
        if slot.slot_seconds == 0 {
            slot.slot_seconds = self.slot_seconds;
        }
        if slot.rate == 0 {
            slot.rate = self.rate;
        }
        slot
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(MacConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_slot_seconds() {
        let cfg = MacConfig {
            slot_seconds: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSlotSeconds));
    }

    #[test]
    fn rejects_zero_expire_cycles() {
        let cfg = MacConfig {
            expire_cycles: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroExpireCycles));
    }

    #[test]
    fn rejects_negative_modem_id() {
        let cfg = MacConfig {
            modem_id: -3,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidModemId(-3)));
    }

    #[test]
    fn normalize_fills_slot_seconds() {
        let cfg = MacConfig {
            slot_seconds: 15,
            ..Default::default()
        };

        let slot = cfg.normalize(Slot::data(1, 2, 0, 0, 0));
        assert_eq!(slot.slot_seconds, 15);

        let slot = cfg.normalize(Slot::data(1, 2, 0, 20, 0));
        assert_eq!(slot.slot_seconds, 20);
    }

    #[test]
    fn normalize_fills_rate() {
        let cfg = MacConfig {
            rate: 2,
            ..Default::default()
        };

        let slot = cfg.normalize(Slot::data(1, 2, 0, 10, 0));
        assert_eq!(slot.rate, 2);

        let slot = cfg.normalize(Slot::data(1, 2, 5, 10, 0));
        assert_eq!(slot.rate, 5);
    }
}
