//! # Traits for handling packing and unpacking
//!
//! These traits handles packing and unpacking of data into byte slices. The
//! `Reader` and `Writer` cursors do the bounds checking for the variable
//! length frames, a read past the end of the input is reported as
//! `Error::WrongNumberOfBytes` and a write past the end of the output as
//! `Error::NotEnoughSpace`.

use byteorder::{ByteOrder, LittleEndian};

use crate::Error;

/// Packing of data of fixed size
pub trait PackFixed<T, E> {
    /// Serialise into buffer, returning if there was an error
    fn pack(&self, data: &mut [u8]) -> Result<(), E>;
    /// De-serialise from buffer, returning object or error
    fn unpack(data: &[u8]) -> Result<T, E>;
}

/// Packing of data with variable size
pub trait Pack<T, E> {
    /// Serialise into buffer, returning number of bytes written or error
    fn pack(&self, data: &mut [u8]) -> Result<usize, E>;
    /// De-serialise from buffer, returning object and number of bytes used
    /// or error
    fn unpack(data: &[u8]) -> Result<(T, usize), E>;
}

/// Bounds checked little endian reader
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes consumed
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True if all bytes have been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a slice of `length` bytes
    pub fn read_slice(&mut self, length: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < length {
            return Err(Error::WrongNumberOfBytes);
        }
        let slice = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(slice)
    }

    /// Read all the remaining bytes
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.offset..];
        self.offset = self.data.len();
        slice
    }

    /// Read a octet
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_slice(1)?[0])
    }

    /// Read a 16-bit value
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.read_slice(2)?))
    }

    /// Read a 24-bit value
    pub fn read_u24(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u24(self.read_slice(3)?))
    }

    /// Read a 32-bit value
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.read_slice(4)?))
    }

    /// Read a 64-bit value
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(LittleEndian::read_u64(self.read_slice(8)?))
    }

    /// Read a length prefixed octet string
    pub fn read_octet_string(&mut self) -> Result<&'a [u8], Error> {
        let length = self.read_u8()?;
        self.read_slice(length as usize)
    }
}

/// Bounds checked little endian writer
#[derive(Debug)]
pub struct Writer<'a> {
    data: &'a mut [u8],
    offset: usize,
}

impl<'a> Writer<'a> {
    /// Create a writer into `data`
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes written
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn reserve(&mut self, length: usize) -> Result<&mut [u8], Error> {
        if self.data.len() - self.offset < length {
            return Err(Error::NotEnoughSpace);
        }
        let start = self.offset;
        self.offset += length;
        Ok(&mut self.data[start..start + length])
    }

    /// Write a slice
    pub fn write_slice(&mut self, value: &[u8]) -> Result<(), Error> {
        self.reserve(value.len())?.copy_from_slice(value);
        Ok(())
    }

    /// Write a octet
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    /// Write a 16-bit value
    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        LittleEndian::write_u16(self.reserve(2)?, value);
        Ok(())
    }

    /// Write a 24-bit value
    pub fn write_u24(&mut self, value: u32) -> Result<(), Error> {
        LittleEndian::write_u24(self.reserve(3)?, value);
        Ok(())
    }

    /// Write a 32-bit value
    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        LittleEndian::write_u32(self.reserve(4)?, value);
        Ok(())
    }

    /// Write a 64-bit value
    pub fn write_u64(&mut self, value: u64) -> Result<(), Error> {
        LittleEndian::write_u64(self.reserve(8)?, value);
        Ok(())
    }

    /// Write a length prefixed octet string
    pub fn write_octet_string(&mut self, value: &[u8]) -> Result<(), Error> {
        if value.len() > u8::MAX as usize {
            return Err(Error::TooManyItems);
        }
        self.write_u8(value.len() as u8)?;
        self.write_slice(value)
    }

    /// Write a packable item
    pub fn write<T: Pack<T, Error>>(&mut self, value: &T) -> Result<(), Error> {
        let used = value.pack(&mut self.data[self.offset..])?;
        self.offset += used;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_bounds() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_u8(), Ok(0x01));
        assert_eq!(reader.read_u16(), Ok(0x1234));
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.read_u64(), Err(Error::WrongNumberOfBytes));
        // A failed read does not consume
        assert_eq!(reader.read_u32(), Ok(0x1234_5678));
        assert!(reader.is_empty());
        assert_eq!(reader.read_u8(), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn reader_octet_string() {
        let data = [0x03, 0xaa, 0xbb, 0xcc, 0x05, 0x01];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_octet_string(), Ok(&data[1..4]));
        assert_eq!(reader.read_octet_string(), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn writer_bounds() {
        let mut buffer = [0u8; 5];
        let mut writer = Writer::new(&mut buffer);
        writer.write_u16(0xabcd).unwrap();
        writer.write_u8(0x11).unwrap();
        assert_eq!(writer.write_u32(0), Err(Error::NotEnoughSpace));
        writer.write_octet_string(&[0x22]).unwrap();
        assert_eq!(writer.offset(), 5);
        assert_eq!(buffer, [0xcd, 0xab, 0x11, 0x01, 0x22]);
    }
}
