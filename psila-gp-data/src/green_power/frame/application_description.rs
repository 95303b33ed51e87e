//! Application description, the report descriptors a GPD sends before it
//! uses compact attribute reporting.

use crate::pack::Reader;
use crate::utils::flag;
use crate::Error;

const TIMEOUT_PRESENT: u32 = 0x01;

const ATTRIBUTE_COUNT_MASK: u8 = 0x07;
const SERVER_CLUSTER: u32 = 0x08;
const MANUFACTURER_PRESENT: u32 = 0x10;

const REMAINING_LENGTH_MASK: u8 = 0x0f;
const ATTRIBUTE_REPORTED: u32 = 0x10;
const VALUE_PRESENT: u32 = 0x20;

/// Shortest valid report descriptor, a report with one data point holding
/// one attribute record
pub const MIN_REPORT_LENGTH: usize = 10;

/// Total length of the report descriptor starting at `report[0]`
pub fn report_length(report: &[u8]) -> Result<usize, Error> {
    let mut reader = Reader::new(report);
    let _report_id = reader.read_u8()?;
    let options = reader.read_u8()? as u32;
    if flag(options, TIMEOUT_PRESENT) {
        let _timeout = reader.read_u16()?;
    }
    let remaining = reader.read_u8()? as usize;
    Ok(reader.offset() + remaining)
}

/// GPD Application Description command payload
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationDescription<'a> {
    /// Total number of reports of the GPD
    pub total: u8,
    /// Number of reports in this frame
    pub count: u8,
    /// Report descriptors
    pub reports: &'a [u8],
}

impl<'a> ApplicationDescription<'a> {
    /// Parse the payload
    pub fn parse(payload: &'a [u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(payload);
        let total = reader.read_u8()?;
        let count = reader.read_u8()?;
        Ok(Self {
            total,
            count,
            reports: reader.read_rest(),
        })
    }

    /// Iterate over the report descriptors in this frame
    pub fn descriptors(&self) -> ReportDescriptors<'a> {
        ReportDescriptors::new(self.reports)
    }
}

/// Report descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct ReportDescriptor<'a> {
    /// Report identifier
    pub id: u8,
    /// Timeout period
    pub timeout: Option<u16>,
    /// Complete descriptor, identifier included
    pub raw: &'a [u8],
    data_points: &'a [u8],
}

impl<'a> ReportDescriptor<'a> {
    /// Parse the report descriptor at the start of `data`
    pub fn parse(data: &'a [u8]) -> Result<Self, Error> {
        let length = report_length(data)?;
        if length > data.len() {
            return Err(Error::PayloadLengthMismatch);
        }
        let mut reader = Reader::new(&data[..length]);
        let id = reader.read_u8()?;
        let options = reader.read_u8()? as u32;
        let timeout = if flag(options, TIMEOUT_PRESENT) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let _remaining = reader.read_u8()?;
        Ok(Self {
            id,
            timeout,
            raw: &data[..length],
            data_points: reader.read_rest(),
        })
    }

    /// Iterate over the data point descriptors
    pub fn data_points(&self) -> DataPoints<'a> {
        DataPoints {
            reader: Reader::new(self.data_points),
        }
    }
}

/// Iterator over consecutive report descriptors
#[derive(Clone, Debug)]
pub struct ReportDescriptors<'a> {
    data: &'a [u8],
}

impl<'a> ReportDescriptors<'a> {
    /// Iterate over the report descriptors stored in `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for ReportDescriptors<'a> {
    type Item = Result<ReportDescriptor<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        match ReportDescriptor::parse(self.data) {
            Ok(report) => {
                self.data = &self.data[report.raw.len()..];
                Some(Ok(report))
            }
            Err(error) => {
                self.data = &[];
                Some(Err(error))
            }
        }
    }
}

/// Data point descriptor, a cluster with attribute records
#[derive(Clone, Debug, PartialEq)]
pub struct DataPointDescriptor<'a> {
    /// The attributes are server attributes
    pub server: bool,
    /// Cluster identifier
    pub cluster: u16,
    /// Manufacturer code
    pub manufacturer: Option<u16>,
    attribute_count: u8,
    records: &'a [u8],
}

impl<'a> DataPointDescriptor<'a> {
    fn read(reader: &mut Reader<'a>) -> Result<Self, Error> {
        let options = reader.read_u8()?;
        let cluster = reader.read_u16()?;
        let manufacturer = if flag(options as u32, MANUFACTURER_PRESENT) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let attribute_count = (options & ATTRIBUTE_COUNT_MASK) + 1;
        let start = reader.clone();
        for _ in 0..attribute_count {
            AttributeRecord::read(reader)?;
        }
        let length = reader.offset() - start.offset();
        let records = start.clone().read_slice(length)?;
        Ok(Self {
            server: flag(options as u32, SERVER_CLUSTER),
            cluster,
            manufacturer,
            attribute_count,
            records,
        })
    }

    /// Iterate over the attribute records
    pub fn attributes(&self) -> AttributeRecords<'a> {
        AttributeRecords {
            reader: Reader::new(self.records),
            remaining: self.attribute_count,
        }
    }
}

/// Iterator over data point descriptors
#[derive(Clone, Debug)]
pub struct DataPoints<'a> {
    reader: Reader<'a>,
}

impl<'a> Iterator for DataPoints<'a> {
    type Item = Result<DataPointDescriptor<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_empty() {
            return None;
        }
        let result = DataPointDescriptor::read(&mut self.reader);
        if result.is_err() {
            self.reader.read_rest();
        }
        Some(result)
    }
}

/// Attribute record of a data point descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRecord<'a> {
    /// Attribute identifier
    pub attribute: u16,
    /// ZCL data type
    pub data_type: u8,
    /// Offset of the value in the compact attribute report
    pub offset: Option<u8>,
    /// Fixed attribute value
    pub value: Option<&'a [u8]>,
}

impl<'a> AttributeRecord<'a> {
    fn read(reader: &mut Reader<'a>) -> Result<Self, Error> {
        let attribute = reader.read_u16()?;
        let data_type = reader.read_u8()?;
        let options = reader.read_u8()?;
        let mut remaining = Reader::new(
            reader.read_slice(((options & REMAINING_LENGTH_MASK) + 1) as usize)?,
        );
        let offset = if flag(options as u32, ATTRIBUTE_REPORTED) {
            Some(remaining.read_u8()?)
        } else {
            None
        };
        let value = if flag(options as u32, VALUE_PRESENT) {
            Some(remaining.read_rest())
        } else {
            None
        };
        Ok(Self {
            attribute,
            data_type,
            offset,
            value,
        })
    }
}

/// Iterator over attribute records
#[derive(Clone, Debug)]
pub struct AttributeRecords<'a> {
    reader: Reader<'a>,
    remaining: u8,
}

impl<'a> Iterator for AttributeRecords<'a> {
    type Item = AttributeRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // The records were validated when the data point was read
        AttributeRecord::read(&mut self.reader).ok()
    }
}
