use crate::pack::{Pack, PackFixed};
use crate::Error;
use crate::{ExtendedAddress, ShortAddress};

// 2.4.3.1.11 Device_annce
/// Device Announce
///
/// For a GPD alias the extended address is all ones and the capability
/// octet is zero.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceAnnounce {
    /// Transaction sequence number
    pub sequence: u8,
    /// Network address of the device
    pub network_address: ShortAddress,
    /// Extended (IEEE) address of the device
    pub extended_address: ExtendedAddress,
    /// Device capabilities
    pub capability: u8,
}

impl DeviceAnnounce {
    /// Announcement of a GPD alias
    pub fn for_alias(sequence: u8, alias: ShortAddress) -> Self {
        Self {
            sequence,
            network_address: alias,
            extended_address: ExtendedAddress::broadcast(),
            capability: 0,
        }
    }
}

impl Pack<DeviceAnnounce, Error> for DeviceAnnounce {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 12 {
            Err(Error::WrongNumberOfBytes)
        } else {
            data[0] = self.sequence;
            self.network_address.pack(&mut data[1..3])?;
            self.extended_address.pack(&mut data[3..11])?;
            data[11] = self.capability;
            Ok(12)
        }
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() != 12 {
            Err(Error::WrongNumberOfBytes)
        } else {
            let network_address = ShortAddress::unpack(&data[1..3])?;
            let extended_address = ExtendedAddress::unpack(&data[3..11])?;
            Ok((
                Self {
                    sequence: data[0],
                    network_address,
                    extended_address,
                    capability: data[11],
                },
                12,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_alias_announce() {
        let announce = DeviceAnnounce::for_alias(0x21, ShortAddress::new(0x5678));
        let mut data = [0u8; 16];
        let used = announce.pack(&mut data).unwrap();
        assert_eq!(used, 12);
        assert_eq!(
            data[..used],
            [0x21, 0x78, 0x56, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]
        );
        let (unpacked, used) = DeviceAnnounce::unpack(&data[..12]).unwrap();
        assert_eq!(used, 12);
        assert_eq!(unpacked, announce);
    }

    #[test]
    fn unpack_device_announce() {
        let data = [
            0x01, 0x7b, 0xc0, 0x85, 0xae, 0x21, 0xfe, 0xff, 0x6f, 0x0d, 0x00, 0x80,
        ];
        let (da, used) = DeviceAnnounce::unpack(&data[..]).unwrap();
        assert_eq!(used, 12);
        assert_eq!(da.network_address, 0xc07b);
        assert_eq!(da.extended_address, 0x000d_6fff_fe21_ae85);
        assert_eq!(da.capability, 0x80);
        assert_eq!(
            DeviceAnnounce::unpack(&data[..11]),
            Err(Error::WrongNumberOfBytes)
        );
    }
}
