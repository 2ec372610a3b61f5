//! Acoustic Medium Access Control (MAC) library.
//! Coordinates half-duplex transmission among peers sharing a single
//! low-bandwidth acoustic channel using a slotted TDMA cycle.
//
// https://github.com/rust-acomms/amac

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod error;

pub mod timer;

pub mod message;

pub mod mac;

pub mod prelude;

/// Timestamps are 64-bit milliseconds since the UTC epoch
pub type Ts = u64;

/// Identity of a modem on the acoustic channel
pub type PeerId = i32;

/// Source id of the blank slot; nobody transmits as this id
pub const BROADCAST_ID: PeerId = 0;

/// Destination sentinel meaning "the driver picks the destination at
/// transmission time"
pub const QUERY_DESTINATION_ID: PeerId = -1;

// Wrap log macros to support switching between defmt and standard logging

#[cfg(feature = "defmt")]
mod log {
    pub use defmt::{trace, debug, info, warn, error};
}
#[cfg(not(feature = "defmt"))]
mod log {
    pub use ::log::{trace, debug, info, warn, error};
}
