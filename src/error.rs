
use crate::PeerId;

/// Configuration faults detected at startup.
///
/// None of these raise to the caller: `startup` logs the fault and leaves
/// the manager idle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A slot of zero length can never be scheduled
    ZeroSlotSeconds,

    /// Peers must survive at least one silent cycle
    ZeroExpireCycles,

    /// Modem ids are non-negative (0 is reserved for broadcast)
    InvalidModemId(PeerId),
}
