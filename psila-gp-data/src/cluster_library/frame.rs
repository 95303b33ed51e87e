use core::convert::TryFrom;

use crate::error::Error;
use crate::pack::{Pack, PackFixed, Reader, Writer};

// ZCL, 2.4.1.1.1 Frame Type Sub-field
/// Frame type field
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FrameType {
    /// The command is global for all clusters
    Global = 0b00,
    /// Command is specific or local to a cluster
    Local = 0b01,
}

impl TryFrom<u8> for FrameType {
    type Error = Error;
    /// Get `FrameType` from a `u8`
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0b11 {
            0b00 => Ok(FrameType::Global),
            0b01 => Ok(FrameType::Local),
            _ => Err(Error::UnknownFrameType),
        }
    }
}

/// Direction of the command
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Direction {
    /// Sent from the client side to the server side
    ClientToServer,
    /// Sent from the server side to the client side
    ServerToClient,
}

impl From<u8> for Direction {
    /// Get `Direction` from the frame control octet
    fn from(value: u8) -> Self {
        if value & 0b0000_1000 == 0b0000_1000 {
            Direction::ServerToClient
        } else {
            Direction::ClientToServer
        }
    }
}

impl From<Direction> for u8 {
    /// Get the frame control bit for `Direction`
    fn from(value: Direction) -> u8 {
        match value {
            Direction::ClientToServer => 0b0000_0000,
            Direction::ServerToClient => 0b0000_1000,
        }
    }
}

// ZCL, 2.4.1.1 Frame Control Field
/// Cluster library frame control field
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameControl {
    /// Frame type, see `FrameType`
    pub frame_type: FrameType,
    /// Manufacturer specific command
    pub manufacturer_specific: bool,
    /// Command direction, see `Direction`
    pub direction: Direction,
    /// Disable default response mechanism
    pub disable_default_response: bool,
}

impl PackFixed<FrameControl, Error> for FrameControl {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        data[0] = self.frame_type as u8
            | ((self.manufacturer_specific as u8) << 2)
            | u8::from(self.direction)
            | ((self.disable_default_response as u8) << 4);
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        Ok(Self {
            frame_type: FrameType::try_from(data[0])?,
            manufacturer_specific: (data[0] & 0b0000_0100) == 0b0000_0100,
            direction: Direction::from(data[0]),
            disable_default_response: (data[0] & 0b0001_0000) == 0b0001_0000,
        })
    }
}

// ZCL, 2.4.1 General ZCL Frame Format
/// Cluster library frame header
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClusterLibraryHeader {
    /// Frame control, see `FrameControl`
    pub control: FrameControl,
    /// Optional manufacturer code for manufacturer specific commands
    pub manufacturer: Option<u16>,
    /// Transaction sequence code
    pub transaction_sequence: u8,
    /// Command identifier
    pub command: u8,
}

impl ClusterLibraryHeader {
    /// Header for a cluster specific command
    ///
    /// Green Power cluster commands are sent without default response
    pub fn cluster_specific(direction: Direction, transaction_sequence: u8, command: u8) -> Self {
        Self {
            control: FrameControl {
                frame_type: FrameType::Local,
                manufacturer_specific: false,
                direction,
                disable_default_response: true,
            },
            manufacturer: None,
            transaction_sequence,
            command,
        }
    }

    /// Header for a global command
    pub fn global(
        direction: Direction,
        manufacturer: Option<u16>,
        transaction_sequence: u8,
        command: u8,
    ) -> Self {
        Self {
            control: FrameControl {
                frame_type: FrameType::Global,
                manufacturer_specific: manufacturer.is_some(),
                direction,
                disable_default_response: true,
            },
            manufacturer,
            transaction_sequence,
            command,
        }
    }
}

impl Pack<ClusterLibraryHeader, Error> for ClusterLibraryHeader {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let length = if self.manufacturer.is_some() { 5 } else { 3 };
        if data.len() < length {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut control = self.control;
        control.manufacturer_specific = self.manufacturer.is_some();
        control.pack(&mut data[0..1])?;
        let mut writer = Writer::new(&mut data[1..length]);
        if let Some(manufacturer) = self.manufacturer {
            writer.write_u16(manufacturer)?;
        }
        writer.write_u8(self.transaction_sequence)?;
        writer.write_u8(self.command)?;
        Ok(length)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 3 {
            return Err(Error::WrongNumberOfBytes);
        }
        let control = FrameControl::unpack(&data[0..1])?;
        let mut reader = Reader::new(&data[1..]);
        let manufacturer = if control.manufacturer_specific {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let transaction_sequence = reader.read_u8()?;
        let command = reader.read_u8()?;
        Ok((
            ClusterLibraryHeader {
                control,
                manufacturer,
                transaction_sequence,
                command,
            },
            1 + reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_green_power_notification_header() {
        let data = [0x11, 0x2a, 0x00];
        let (header, used) = ClusterLibraryHeader::unpack(&data[..]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(header.control.frame_type, FrameType::Local);
        assert_eq!(header.control.manufacturer_specific, false);
        assert_eq!(header.control.direction, Direction::ClientToServer);
        assert_eq!(header.control.disable_default_response, true);
        assert_eq!(header.manufacturer, None);
        assert_eq!(header.transaction_sequence, 0x2a);
        assert_eq!(header.command, 0x00);
    }

    #[test]
    fn pack_server_to_client() {
        let header = ClusterLibraryHeader::cluster_specific(Direction::ServerToClient, 7, 0x01);
        let mut data = [0u8; 3];
        assert_eq!(header.pack(&mut data).unwrap(), 3);
        assert_eq!(data, [0x19, 0x07, 0x01]);
    }

    #[test]
    fn manufacturer_specific_report() {
        let header = ClusterLibraryHeader::global(Direction::ClientToServer, Some(0x1037), 3, 0x0a);
        let mut data = [0u8; 5];
        assert_eq!(header.pack(&mut data).unwrap(), 5);
        assert_eq!(data, [0x14, 0x37, 0x10, 0x03, 0x0a]);
        let (unpacked, used) = ClusterLibraryHeader::unpack(&data).unwrap();
        assert_eq!(used, 5);
        assert_eq!(unpacked, header);
        assert_eq!(
            ClusterLibraryHeader::unpack(&data[..4]),
            Err(Error::WrongNumberOfBytes)
        );
    }
}
