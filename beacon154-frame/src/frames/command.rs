//! MAC command payload readers and writers.

use beacon154_macros::frame;

use crate::{Error, Result};

/// MAC command identifier.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum CommandId {
    /// Association request.
    AssociationRequest = 0x01,
    /// Association response.
    AssociationResponse = 0x02,
    /// Disassociation notification.
    DisassociationNotification = 0x03,
    /// Data request.
    DataRequest = 0x04,
    /// PAN ID conflict notification.
    PanIdConflictNotification = 0x05,
    /// Orphan notification.
    OrphanNotification = 0x06,
    /// Beacon request.
    BeaconRequest = 0x07,
    /// Coordinator realignment.
    CoordinatorRealignment = 0x08,
    /// GTS request.
    GtsRequest = 0x09,
    /// Enhanced beacon request.
    EnhancedBeaconRequest = 0x0a,
    /// Reserved identifier.
    Unknown,
}

impl From<u8> for CommandId {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::AssociationRequest,
            0x02 => Self::AssociationResponse,
            0x03 => Self::DisassociationNotification,
            0x04 => Self::DataRequest,
            0x05 => Self::PanIdConflictNotification,
            0x06 => Self::OrphanNotification,
            0x07 => Self::BeaconRequest,
            0x08 => Self::CoordinatorRealignment,
            0x09 => Self::GtsRequest,
            0x0a => Self::EnhancedBeaconRequest,
            _ => Self::Unknown,
        }
    }
}

/// A reader for the MAC payload of a command frame: the command identifier
/// followed by the command content.
#[derive(Debug)]
pub struct MacCommand<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> MacCommand<T> {
    /// Create a new [`MacCommand`] reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or too short for the fixed
    /// content of the command.
    pub fn new(buffer: T) -> Result<Self> {
        let cmd = Self::new_unchecked(buffer);
        let Some(&id) = cmd.buffer.as_ref().first() else {
            return Err(Error);
        };
        let min = match CommandId::from(id) {
            CommandId::AssociationRequest => CapabilityInformation::<&[u8]>::size(),
            CommandId::AssociationResponse => AssociationResponse::<&[u8]>::size(),
            CommandId::DisassociationNotification => 1,
            CommandId::CoordinatorRealignment => CoordinatorRealignment::<&[u8]>::size(),
            _ => 0,
        };
        if cmd.content().len() < min {
            return Err(Error);
        }
        Ok(cmd)
    }

    /// Create a new [`MacCommand`] reader without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the [`CommandId`].
    pub fn command_id(&self) -> CommandId {
        CommandId::from(self.buffer.as_ref()[0])
    }

    /// Return the content behind the identifier.
    pub fn content(&self) -> &[u8] {
        &self.buffer.as_ref()[1..]
    }
}

#[frame]
#[derive(Debug)]
/// The capability information field of an association request.
pub struct CapabilityInformation {
    #[bits(1)]
    /// The device can become a PAN coordinator.
    alternate_pan_coordinator: bool,
    #[bits(1)]
    /// The device is a full function device.
    device_type: bool,
    #[bits(1)]
    /// The device is mains powered.
    power_source: bool,
    #[bits(1)]
    /// The receiver is on when idle.
    receiver_on_when_idle: bool,
    #[bits(2)]
    _reserved: u8,
    #[bits(1)]
    /// The device can secure frames.
    security_capability: bool,
    #[bits(1)]
    /// The device asks for a short address.
    allocate_address: bool,
}

#[frame]
#[derive(Debug)]
/// The content of an association response command.
pub struct AssociationResponse {
    /// The allocated short address.
    short_address: u16,
    /// The association status.
    status: u8,
}

#[frame]
#[derive(Debug)]
/// The content of a coordinator realignment command.
pub struct CoordinatorRealignment {
    /// The PAN ID the coordinator will use.
    pan_id: u16,
    /// The short address of the coordinator.
    coordinator_short_address: u16,
    /// The channel the coordinator will use.
    channel: u8,
    /// The short address of the recipient, `0xffff` for a broadcast.
    short_address: u16,
}

impl<T: AsRef<[u8]>> CoordinatorRealignment<T> {
    /// Return the channel page, present in 2006 and later frames.
    pub fn channel_page(&self) -> Option<u8> {
        self.buffer.as_ref().get(Self::size()).copied()
    }
}

/// Association status values carried in an association response.
pub mod association_status {
    /// Association successful.
    pub const SUCCESS: u8 = 0x00;
    /// PAN at capacity.
    pub const PAN_AT_CAPACITY: u8 = 0x01;
    /// PAN access denied.
    pub const PAN_ACCESS_DENIED: u8 = 0x02;
}

/// A high-level representation of a MAC command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum CommandRepr {
    /// Association request with the raw capability information.
    AssociationRequest {
        /// Capability information octet.
        capability: u8,
    },
    /// Association response.
    AssociationResponse {
        /// Allocated short address.
        short_address: u16,
        /// Association status.
        status: u8,
    },
    /// Disassociation notification.
    DisassociationNotification {
        /// Disassociation reason.
        reason: u8,
    },
    /// Data request.
    DataRequest,
    /// Orphan notification.
    OrphanNotification,
    /// Beacon request.
    BeaconRequest,
    /// Coordinator realignment.
    CoordinatorRealignment {
        /// New PAN ID.
        pan_id: u16,
        /// Coordinator short address.
        coordinator_short_address: u16,
        /// New channel.
        channel: u8,
        /// Recipient short address.
        short_address: u16,
        /// New channel page.
        channel_page: Option<u8>,
    },
}

impl CommandRepr {
    /// Parse a [`MacCommand`]. Returns `None` for commands without a
    /// representation.
    pub fn parse<T: AsRef<[u8]>>(cmd: &MacCommand<T>) -> Option<Self> {
        let content = cmd.content();
        Some(match cmd.command_id() {
            CommandId::AssociationRequest => Self::AssociationRequest {
                capability: *content.first()?,
            },
            CommandId::AssociationResponse => {
                let rsp = AssociationResponse::new(content).ok()?;
                Self::AssociationResponse {
                    short_address: rsp.short_address(),
                    status: rsp.status(),
                }
            }
            CommandId::DisassociationNotification => Self::DisassociationNotification {
                reason: *content.first()?,
            },
            CommandId::DataRequest => Self::DataRequest,
            CommandId::OrphanNotification => Self::OrphanNotification,
            CommandId::BeaconRequest => Self::BeaconRequest,
            CommandId::CoordinatorRealignment => {
                let realign = CoordinatorRealignment::new(content).ok()?;
                Self::CoordinatorRealignment {
                    pan_id: realign.pan_id(),
                    coordinator_short_address: realign.coordinator_short_address(),
                    channel: realign.channel(),
                    short_address: realign.short_address(),
                    channel_page: realign.channel_page(),
                }
            }
            _ => return None,
        })
    }

    /// Return the [`CommandId`].
    pub fn command_id(&self) -> CommandId {
        match self {
            Self::AssociationRequest { .. } => CommandId::AssociationRequest,
            Self::AssociationResponse { .. } => CommandId::AssociationResponse,
            Self::DisassociationNotification { .. } => CommandId::DisassociationNotification,
            Self::DataRequest => CommandId::DataRequest,
            Self::OrphanNotification => CommandId::OrphanNotification,
            Self::BeaconRequest => CommandId::BeaconRequest,
            Self::CoordinatorRealignment { .. } => CommandId::CoordinatorRealignment,
        }
    }

    /// Return the length of the emitted command, identifier included.
    pub fn buffer_len(&self) -> usize {
        1 + match self {
            Self::AssociationRequest { .. } | Self::DisassociationNotification { .. } => 1,
            Self::AssociationResponse { .. } => AssociationResponse::<&[u8]>::size(),
            Self::CoordinatorRealignment { channel_page, .. } => {
                CoordinatorRealignment::<&[u8]>::size() + channel_page.is_some() as usize
            }
            _ => 0,
        }
    }

    /// Emit the command into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than [`Self::buffer_len`].
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < self.buffer_len() {
            return Err(Error);
        }
        buffer[0] = self.command_id() as u8;
        let content = &mut buffer[1..self.buffer_len()];
        match *self {
            Self::AssociationRequest { capability } => content[0] = capability,
            Self::DisassociationNotification { reason } => content[0] = reason,
            Self::AssociationResponse {
                short_address,
                status,
            } => {
                let mut rsp = AssociationResponse::new_unchecked(content);
                rsp.set_short_address(short_address);
                rsp.set_status(status);
            }
            Self::CoordinatorRealignment {
                pan_id,
                coordinator_short_address,
                channel,
                short_address,
                channel_page,
            } => {
                if let Some(page) = channel_page {
                    content[CoordinatorRealignment::<&[u8]>::size()] = page;
                }
                let mut realign = CoordinatorRealignment::new_unchecked(content);
                realign.set_pan_id(pan_id);
                realign.set_coordinator_short_address(coordinator_short_address);
                realign.set_channel(channel);
                realign.set_short_address(short_address);
            }
            Self::DataRequest | Self::OrphanNotification | Self::BeaconRequest => {}
        }
        Ok(())
    }
}
