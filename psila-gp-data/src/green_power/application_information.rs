//! Application information advertised by a GPD when commissioning and
//! relayed by commissioning tools in GP Pairing Configuration.

use crate::pack::{Reader, Writer};
use crate::utils::flag;
use crate::Error;

use super::{MAX_CLUSTERS, MAX_COMMANDS};

const MANUFACTURER_ID_PRESENT: u32 = 0x01;
const MODEL_ID_PRESENT: u32 = 0x02;
const COMMANDS_PRESENT: u32 = 0x04;
const CLUSTERS_PRESENT: u32 = 0x08;
const SWITCH_INFORMATION_PRESENT: u32 = 0x10;
const APPLICATION_DESCRIPTION_FOLLOWS: u32 = 0x20;

/// GPD command identifiers
pub type CommandList = heapless::Vec<u8, MAX_COMMANDS>;
/// Cluster identifiers
pub type ClusterList = heapless::Vec<u16, MAX_CLUSTERS>;

/// Clusters implemented by the GPD
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterLists {
    /// Server clusters
    pub server: ClusterList,
    /// Client clusters
    pub client: ClusterList,
}

/// Generic switch information
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SwitchInformation {
    /// Number of contacts and switch type
    pub configuration: u8,
    /// Current contact status bitmap
    pub current_contact_status: u8,
}

impl SwitchInformation {
    /// Number of contacts
    pub fn number_of_contacts(&self) -> u8 {
        self.configuration & 0x0f
    }

    /// Switch type, 0 button, 1 rocker
    pub fn switch_type(&self) -> u8 {
        (self.configuration >> 4) & 0x03
    }
}

/// Application information
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplicationInformation {
    /// Manufacturer identifier
    pub manufacturer_id: Option<u16>,
    /// Model identifier
    pub model_id: Option<u16>,
    /// GPD commands
    pub commands: Option<CommandList>,
    /// GPD clusters
    pub clusters: Option<ClusterLists>,
    /// Generic switch information
    pub switch_information: Option<SwitchInformation>,
    /// Application description frames follow the commissioning frame
    pub application_description: bool,
}

fn read_clusters(reader: &mut Reader, count: u8) -> Result<ClusterList, Error> {
    let mut clusters = ClusterList::new();
    for _ in 0..count {
        clusters
            .push(reader.read_u16()?)
            .map_err(|_| Error::TooManyItems)?;
    }
    Ok(clusters)
}

impl ApplicationInformation {
    /// Presence bitmap
    pub fn bitmap(&self) -> u8 {
        let mut value = 0;
        for (set, bit) in [
            (self.manufacturer_id.is_some(), MANUFACTURER_ID_PRESENT),
            (self.model_id.is_some(), MODEL_ID_PRESENT),
            (self.commands.is_some(), COMMANDS_PRESENT),
            (self.clusters.is_some(), CLUSTERS_PRESENT),
            (self.switch_information.is_some(), SWITCH_INFORMATION_PRESENT),
            (self.application_description, APPLICATION_DESCRIPTION_FOLLOWS),
        ] {
            if set {
                value |= bit;
            }
        }
        value as u8
    }

    /// True if no field is present
    pub fn is_empty(&self) -> bool {
        self.bitmap() == 0
    }

    /// Read the bitmap and the fields it declares
    pub fn read(reader: &mut Reader) -> Result<Self, Error> {
        let bitmap = reader.read_u8()? as u32;
        let manufacturer_id = if flag(bitmap, MANUFACTURER_ID_PRESENT) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let model_id = if flag(bitmap, MODEL_ID_PRESENT) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let commands = if flag(bitmap, COMMANDS_PRESENT) {
            let count = reader.read_u8()? as usize;
            Some(CommandList::from_slice(reader.read_slice(count)?).map_err(|_| Error::TooManyItems)?)
        } else {
            None
        };
        let clusters = if flag(bitmap, CLUSTERS_PRESENT) {
            let counts = reader.read_u8()?;
            let server = read_clusters(reader, counts & 0x0f)?;
            let client = read_clusters(reader, counts >> 4)?;
            Some(ClusterLists { server, client })
        } else {
            None
        };
        let switch_information = if flag(bitmap, SWITCH_INFORMATION_PRESENT) {
            let length = reader.read_u8()? as usize;
            let data = reader.read_slice(length)?;
            if data.is_empty() {
                return Err(Error::WrongNumberOfBytes);
            }
            Some(SwitchInformation {
                configuration: data[0],
                current_contact_status: data.get(1).copied().unwrap_or_default(),
            })
        } else {
            None
        };
        Ok(Self {
            manufacturer_id,
            model_id,
            commands,
            clusters,
            switch_information,
            application_description: flag(bitmap, APPLICATION_DESCRIPTION_FOLLOWS),
        })
    }

    /// Write the bitmap and the present fields
    pub fn write(&self, writer: &mut Writer) -> Result<(), Error> {
        writer.write_u8(self.bitmap())?;
        if let Some(manufacturer_id) = self.manufacturer_id {
            writer.write_u16(manufacturer_id)?;
        }
        if let Some(model_id) = self.model_id {
            writer.write_u16(model_id)?;
        }
        if let Some(commands) = &self.commands {
            writer.write_octet_string(commands)?;
        }
        if let Some(clusters) = &self.clusters {
            writer.write_u8(clusters.server.len() as u8 | ((clusters.client.len() as u8) << 4))?;
            for cluster in clusters.server.iter().chain(clusters.client.iter()) {
                writer.write_u16(*cluster)?;
            }
        }
        if let Some(switch) = self.switch_information {
            writer.write_u8(2)?;
            writer.write_u8(switch.configuration)?;
            writer.write_u8(switch.current_contact_status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_application_information() {
        let data = [
            0x1f, 0x10, 0x10, 0x01, 0x00, 0x02, 0x20, 0x21, 0x21, 0x06, 0x00, 0x02, 0x04, 0x08,
            0x00, 0x02, 0x12, 0x01,
        ];
        let mut reader = Reader::new(&data);
        let info = ApplicationInformation::read(&mut reader).unwrap();
        assert!(reader.is_empty());
        assert_eq!(info.manufacturer_id, Some(0x1010));
        assert_eq!(info.model_id, Some(0x0001));
        assert_eq!(info.commands.as_ref().unwrap()[..], [0x20, 0x21]);
        let clusters = info.clusters.as_ref().unwrap();
        assert_eq!(clusters.server[..], [0x0006]);
        assert_eq!(clusters.client[..], [0x0402, 0x0008]);
        let switch = info.switch_information.unwrap();
        assert_eq!(switch.number_of_contacts(), 2);
        assert_eq!(switch.switch_type(), 1);
        assert_eq!(switch.current_contact_status, 0x01);
        assert!(!info.application_description);

        let mut buffer = [0u8; 32];
        let mut writer = Writer::new(&mut buffer);
        info.write(&mut writer).unwrap();
        let used = writer.offset();
        assert_eq!(buffer[..used], data);
    }

    #[test]
    fn truncated_application_information() {
        let data = [0x04, 0x03, 0x20, 0x21];
        let mut reader = Reader::new(&data);
        assert_eq!(
            ApplicationInformation::read(&mut reader),
            Err(Error::WrongNumberOfBytes)
        );
        let data = [0x20];
        let mut reader = Reader::new(&data);
        let info = ApplicationInformation::read(&mut reader).unwrap();
        assert!(info.application_description);
        assert!(!info.is_empty());
    }
}
