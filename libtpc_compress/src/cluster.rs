use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fmt::Display;
use std::io::Write;

use super::constants::*;

/// A single reconstructed TPC cluster as stored in the raw cluster array.
///
/// This is the owned form, used to build cluster buffers and to print clusters. Clusters read
/// from a RecordArray are handed out as [`ClusterRef`]s which borrow the array's bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterRecord {
    pub pad_row: u16,
    pub flags: u16,
    pub pad: f32,
    pub time: f32,
    pub sigma_pad2: f32,
    pub sigma_time2: f32,
    pub charge: u16,
    pub qmax: u16,
}

impl ClusterRecord {
    /// Write the binary representation of this cluster
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u16::<LittleEndian>(self.pad_row)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_f32::<LittleEndian>(self.pad)?;
        writer.write_f32::<LittleEndian>(self.time)?;
        writer.write_f32::<LittleEndian>(self.sigma_pad2)?;
        writer.write_f32::<LittleEndian>(self.sigma_time2)?;
        writer.write_u16::<LittleEndian>(self.charge)?;
        writer.write_u16::<LittleEndian>(self.qmax)?;
        Ok(())
    }

    /// Build a complete raw cluster array (header included) from a set of clusters
    pub fn to_array_bytes(clusters: &[ClusterRecord]) -> std::io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE + clusters.len() * RECORD_SIZE);
        buffer.write_u32::<LittleEndian>(clusters.len() as u32)?;
        for cluster in clusters {
            cluster.write_to(&mut buffer)?;
        }
        Ok(buffer)
    }
}

impl Display for ClusterRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TPCRawCluster: {} {} {} {} {} {} {}",
            self.pad_row,
            self.pad,
            self.time,
            self.sigma_pad2,
            self.sigma_time2,
            self.charge,
            self.qmax
        )
    }
}

/// A read-only view of one cluster inside a RecordArray.
///
/// Fields are decoded on access directly from the borrowed bytes, so a ClusterRef can never
/// outlive the buffer it points into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterRef<'a> {
    bytes: &'a [u8; RECORD_SIZE],
}

impl<'a> ClusterRef<'a> {
    pub fn new(bytes: &'a [u8; RECORD_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn pad_row(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[OFFSET_PAD_ROW..])
    }

    pub fn flags(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[OFFSET_FLAGS..])
    }

    pub fn pad(&self) -> f32 {
        LittleEndian::read_f32(&self.bytes[OFFSET_PAD..])
    }

    pub fn time(&self) -> f32 {
        LittleEndian::read_f32(&self.bytes[OFFSET_TIME..])
    }

    pub fn sigma_pad2(&self) -> f32 {
        LittleEndian::read_f32(&self.bytes[OFFSET_SIGMA_PAD2..])
    }

    pub fn sigma_time2(&self) -> f32 {
        LittleEndian::read_f32(&self.bytes[OFFSET_SIGMA_TIME2..])
    }

    pub fn charge(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[OFFSET_CHARGE..])
    }

    pub fn qmax(&self) -> u16 {
        LittleEndian::read_u16(&self.bytes[OFFSET_QMAX..])
    }

    /// Copy the cluster out of the buffer
    pub fn to_record(&self) -> ClusterRecord {
        ClusterRecord {
            pad_row: self.pad_row(),
            flags: self.flags(),
            pad: self.pad(),
            time: self.time(),
            sigma_pad2: self.sigma_pad2(),
            sigma_time2: self.sigma_time2(),
            charge: self.charge(),
            qmax: self.qmax(),
        }
    }
}

impl Display for ClusterRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_record().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let cluster = ClusterRecord {
            pad_row: 12,
            flags: 0x3,
            pad: 45.5,
            time: 310.25,
            sigma_pad2: 0.4,
            sigma_time2: 1.2,
            charge: 820,
            qmax: 97,
        };
        let mut buffer = Vec::new();
        cluster.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), RECORD_SIZE);

        let bytes: &[u8; RECORD_SIZE] = match buffer.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => panic!(),
        };
        let view = ClusterRef::new(bytes);
        assert_eq!(view.pad_row(), 12);
        assert_eq!(view.flags(), 0x3);
        assert_eq!(view.pad(), 45.5);
        assert_eq!(view.time(), 310.25);
        assert_eq!(view.charge(), 820);
        assert_eq!(view.qmax(), 97);
        assert_eq!(view.to_record(), cluster);
    }

    #[test]
    fn test_array_bytes_header() {
        let clusters = vec![ClusterRecord::default(); 3];
        let buffer = ClusterRecord::to_array_bytes(&clusters).unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE + 3 * RECORD_SIZE);
        assert_eq!(LittleEndian::read_u32(&buffer), 3);
    }
}
