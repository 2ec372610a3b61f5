//! Crate prelude
//
// https://github.com/rust-acomms/amac

pub use crate::{PeerId, Ts, BROADCAST_ID, QUERY_DESTINATION_ID};

pub use crate::error::ConfigError;

pub use crate::mac::{MacConfig, MacEvent, MacManager, MacType};

pub use crate::mac::slot::{Slot, SlotHandle, SlotTable, SlotType, MAX_SLOTS};

pub use crate::message::{ModemMsgBase, ModemRangingRequest, RangingType};

pub use crate::timer::{Clock, SlotTimer};

#[cfg(feature = "std")]
pub use crate::timer::SystemClock;

#[cfg(any(test, feature = "mocks"))]
pub use crate::timer::mock::MockClock;
