

use crate::PeerId;

/// Addressing header shared with the modem driver.
///
/// Outbound, this is the payload of an initiate-transmission request; the
/// driver fills in the body. Inbound, the driver reports every received
/// frame with one of these so the MAC can track which peers are alive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemMsgBase {
    /// Transmitting peer
    pub src: PeerId,
    /// Receiving peer, or `QUERY_DESTINATION_ID`
    pub dest: PeerId,
    /// Modulation rate index, opaque to the MAC
    pub rate: i32,
}

/// Flavour of acoustic ranging to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangingType {
    /// Round-trip ping to a single peer
    TwoWayPing,
    /// Interrogate REMUS-class long-baseline transponders
    RemusLbl,
}

/// Request for the driver to perform a ranging measurement instead of a
/// data transmission
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemRangingRequest {
    pub base: ModemMsgBase,
    pub kind: RangingType,
}
