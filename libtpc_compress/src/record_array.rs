use byteorder::{ByteOrder, LittleEndian};
use std::fmt::Display;
use std::path::Path;

use super::cluster::ClusterRef;
use super::constants::{HEADER_SIZE, RECORD_SIZE};
use super::error::RecordArrayError;

/// RecordArray owns the bytes of a raw cluster array and exposes the clusters inside.
///
/// The buffer is a `u32` cluster count followed by that many fixed size cluster records. The
/// declared size is validated before any cluster is exposed. An empty buffer is a valid array with
/// no clusters; any other inconsistency is a format error and leaves the array empty.
#[derive(Debug, Clone, Default)]
pub struct RecordArray {
    buffer: Vec<u8>,
    n_clusters: usize,
}

impl RecordArray {
    /// Create a RecordArray which takes ownership of a buffer
    pub fn new(buffer: Vec<u8>) -> Result<Self, RecordArrayError> {
        let mut array = Self::default();
        array.load(buffer)?;
        Ok(array)
    }

    /// Create a RecordArray from a copy of an in-memory blob
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordArrayError> {
        Self::new(bytes.to_vec())
    }

    /// Create a RecordArray from the full contents of a file
    pub fn from_file(path: &Path) -> Result<Self, RecordArrayError> {
        let mut array = Self::default();
        array.load_file(path)?;
        Ok(array)
    }

    /// Replace the contents of the array with a new buffer.
    ///
    /// Any previously exposed state is discarded. Returns the number of clusters found. On error
    /// the array is left empty.
    pub fn load(&mut self, buffer: Vec<u8>) -> Result<usize, RecordArrayError> {
        self.clear();
        let n_clusters = Self::validate(&buffer)?;
        self.buffer = buffer;
        self.n_clusters = n_clusters;
        Ok(n_clusters)
    }

    /// Replace the contents of the array with the contents of a file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, RecordArrayError> {
        self.clear();
        if !path.exists() {
            return Err(RecordArrayError::BadFilePath(path.to_path_buf()));
        }
        let buffer = std::fs::read(path)?;
        self.load(buffer)
    }

    /// Check the header against the buffer size, returning the cluster count
    fn validate(buffer: &[u8]) -> Result<usize, RecordArrayError> {
        if buffer.is_empty() {
            return Ok(0);
        }
        if buffer.len() < HEADER_SIZE {
            return Err(RecordArrayError::TooShortForHeader(buffer.len()));
        }

        let count = LittleEndian::read_u32(&buffer[..HEADER_SIZE]);
        let required = (count as usize)
            .checked_mul(RECORD_SIZE)
            .and_then(|body| body.checked_add(HEADER_SIZE));
        match required {
            Some(required) if required <= buffer.len() => {
                if required < buffer.len() {
                    log::debug!(
                        "Cluster array has {} trailing byte(s) after {} cluster(s)",
                        buffer.len() - required,
                        count
                    );
                }
                Ok(count as usize)
            }
            _ => Err(RecordArrayError::InsufficientSize {
                count,
                required: (count as usize)
                    .saturating_mul(RECORD_SIZE)
                    .saturating_add(HEADER_SIZE),
                available: buffer.len(),
            }),
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.n_clusters = 0;
    }

    pub fn len(&self) -> usize {
        self.n_clusters
    }

    pub fn is_empty(&self) -> bool {
        self.n_clusters == 0
    }

    /// The bytes spanned by the clusters, from the first cluster to one past the last
    pub fn body(&self) -> &[u8] {
        if self.n_clusters == 0 {
            return &[];
        }
        &self.buffer[HEADER_SIZE..(HEADER_SIZE + self.n_clusters * RECORD_SIZE)]
    }

    /// Get a cluster by index. Returns None if the index is past the last cluster
    pub fn get(&self, index: usize) -> Option<ClusterRef<'_>> {
        if index >= self.n_clusters {
            return None;
        }
        let start = index * RECORD_SIZE;
        self.body()
            .get(start..(start + RECORD_SIZE))
            .and_then(|bytes| bytes.try_into().ok())
            .map(ClusterRef::new)
    }

    /// Iterate over the clusters in storage order
    pub fn iter(&self) -> RecordIter<'_> {
        RecordIter {
            array: self,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a RecordArray {
    type Item = ClusterRef<'a>;
    type IntoIter = RecordIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for RecordArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RecordArray: {} cluster(s)", self.n_clusters)?;
        for cluster in self.iter() {
            writeln!(f, "  {cluster}")?;
        }
        Ok(())
    }
}

/// Iterator over the clusters of a RecordArray
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    array: &'a RecordArray,
    index: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = ClusterRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let cluster = self.array.get(self.index)?;
        self.index += 1;
        Some(cluster)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterRecord;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn make_clusters(n: usize) -> Vec<ClusterRecord> {
        (0..n)
            .map(|i| ClusterRecord {
                pad_row: i as u16,
                pad: i as f32 * 1.5,
                time: 100.0 + i as f32,
                charge: 200 + i as u16,
                qmax: 20,
                ..Default::default()
            })
            .collect()
    }

    fn array_bytes(n: usize) -> Vec<u8> {
        ClusterRecord::to_array_bytes(&make_clusters(n)).unwrap()
    }

    #[test]
    fn test_iteration_visits_every_cluster() {
        let clusters = make_clusters(5);
        let buffer = ClusterRecord::to_array_bytes(&clusters).unwrap();
        let array = match RecordArray::new(buffer) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 5);
        assert_eq!(array.iter().count(), 5);
        assert_eq!(array.body().len(), 5 * RECORD_SIZE);
        for (given, expected) in array.iter().zip(clusters.iter()) {
            assert_eq!(given.to_record(), *expected);
        }
        // restartable
        assert_eq!(array.iter().map(|c| c.charge() as u32).sum::<u32>(), 1010);
        assert!(array.get(5).is_none());
        assert_eq!(array.get(4).map(|c| c.pad_row()), Some(4));
    }

    #[test]
    fn test_empty_buffer_is_valid() {
        let array = match RecordArray::new(Vec::new()) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert!(array.is_empty());
        assert_eq!(array.iter().count(), 0);
        assert!(array.body().is_empty());
    }

    #[test]
    fn test_zero_count_header() {
        let array = match RecordArray::new(vec![0, 0, 0, 0]) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 0);
    }

    #[test]
    fn test_short_header_is_format_error() {
        assert!(matches!(
            RecordArray::new(vec![1, 0]),
            Err(RecordArrayError::TooShortForHeader(2))
        ));
    }

    #[test]
    fn test_undersized_buffer_is_format_error() {
        let mut buffer = array_bytes(2);
        buffer.truncate(buffer.len() - 1);
        match RecordArray::new(buffer) {
            Err(RecordArrayError::InsufficientSize {
                count,
                required,
                available,
            }) => {
                assert_eq!(count, 2);
                assert_eq!(required, HEADER_SIZE + 2 * RECORD_SIZE);
                assert_eq!(available, required - 1);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_huge_count_does_not_overflow() {
        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(u32::MAX).unwrap();
        buffer.extend_from_slice(&[0u8; RECORD_SIZE]);
        assert!(RecordArray::new(buffer).is_err());
    }

    #[test]
    fn test_failed_reload_clears_previous_state() {
        let mut array = match RecordArray::new(array_bytes(3)) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 3);
        let mut bad = array_bytes(4);
        bad.truncate(HEADER_SIZE + RECORD_SIZE);
        assert!(array.load(bad).is_err());
        assert_eq!(array.len(), 0);
        assert!(array.get(0).is_none());
        assert!(array.body().is_empty());
    }

    #[test]
    fn test_trailing_bytes_are_tolerated() {
        let mut buffer = array_bytes(1);
        buffer.extend_from_slice(&[0xff; 7]);
        let array = match RecordArray::new(buffer) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 1);
        assert_eq!(array.body().len(), RECORD_SIZE);
    }

    #[test]
    fn test_from_slice_copies_the_blob() {
        let bytes = array_bytes(3);
        assert!(matches!(
            RecordArray::from_slice(&bytes[..bytes.len() - 1]),
            Err(RecordArrayError::InsufficientSize { count: 3, .. })
        ));
        let array = match RecordArray::from_slice(&bytes) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 3);
        assert_eq!(array.body(), &bytes[HEADER_SIZE..]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does_not_exist.bin");
        assert!(matches!(
            RecordArray::from_file(&path),
            Err(RecordArrayError::BadFilePath(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&array_bytes(2)).unwrap();
        let mut array = match RecordArray::from_file(file.path()) {
            Ok(a) => a,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(array.len(), 2);

        // reload from an emptied file
        file.as_file().set_len(0).unwrap();
        assert_eq!(array.load_file(file.path()).ok(), Some(0));
        assert!(array.is_empty());
    }
}
