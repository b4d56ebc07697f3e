use bitvec::prelude::*;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};

use super::bit_output::BitReader;
use super::constants::{CODE_TABLE_NAME, MAX_BIT_WIDTH};
use super::error::CodeTableError;

/// Serialized form of one code: a value and its code written as a string of '0' and '1'
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub value: u64,
    pub code: String,
}

/// Serialized form of the codes of one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterTableConfig {
    pub name: String,
    pub codes: Vec<CodeEntry>,
}

/// The code table configuration object as persisted on disk (YAML)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTableConfig {
    pub name: String,
    pub parameters: Vec<ParameterTableConfig>,
}

impl CodeTableConfig {
    /// Read a code table configuration object directly from a file
    pub fn read_file(path: &Path) -> Result<Self, CodeTableError> {
        if !path.exists() {
            return Err(CodeTableError::BadFilePath(path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), CodeTableError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml_str)?;
        Ok(())
    }
}

/// Symbol counts of one parameter, gathered by a training run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterStatistics {
    pub name: String,
    pub counts: FxHashMap<u64, u64>,
}

impl ParameterStatistics {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counts: FxHashMap::default(),
        }
    }

    pub fn record(&mut self, value: u64) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// The variable length codes of a single parameter
#[derive(Debug, Clone, Default)]
pub struct ParameterCodeTable {
    name: String,
    codes: FxHashMap<u64, BitVec<u8, Msb0>>,
    decoder: FxHashMap<(usize, u64), u64>,
    max_code_length: usize,
}

impl ParameterCodeTable {
    /// Build and validate the table from its serialized form. Codes must be non-empty, at most
    /// 64 bits, unique per value, and prefix free.
    pub fn from_config(config: &ParameterTableConfig) -> Result<Self, CodeTableError> {
        let mut table = Self {
            name: config.name.clone(),
            ..Default::default()
        };

        for entry in &config.codes {
            let code = parse_code(&config.name, entry)?;
            let code_value = code_to_u64(&code);
            let length = code.len();
            if table.codes.insert(entry.value, code).is_some() {
                return Err(CodeTableError::DuplicateValue {
                    parameter: config.name.clone(),
                    value: entry.value,
                });
            }
            table.decoder.insert((length, code_value), entry.value);
            table.max_code_length = table.max_code_length.max(length);
        }

        // A code which is the prefix of another sorts directly in front of one of its extensions
        let mut sorted: Vec<&str> = config.codes.iter().map(|e| e.code.as_str()).collect();
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            if pair[1].starts_with(pair[0]) {
                return Err(CodeTableError::NotPrefixFree {
                    parameter: config.name.clone(),
                    code: pair[0].to_string(),
                });
            }
        }

        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self, value: u64) -> Option<&BitSlice<u8, Msb0>> {
        self.codes.get(&value).map(|c| c.as_bitslice())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Decode the next value from a reader. Returns None if the bits do not form a code of this
    /// table or run out first.
    pub fn decode(&self, reader: &mut BitReader) -> Option<u64> {
        let mut code = 0u64;
        for length in 1..=self.max_code_length {
            code = (code << 1) | reader.read_bit()? as u64;
            if let Some(value) = self.decoder.get(&(length, code)) {
                return Some(*value);
            }
        }
        None
    }

    pub fn to_config(&self) -> ParameterTableConfig {
        let mut codes: Vec<CodeEntry> = self
            .codes
            .iter()
            .map(|(value, code)| CodeEntry {
                value: *value,
                code: code.iter().by_vals().map(|b| if b { '1' } else { '0' }).collect(),
            })
            .collect();
        codes.sort_by_key(|e| e.value);
        ParameterTableConfig {
            name: self.name.clone(),
            codes,
        }
    }

    /// Build a Huffman code from symbol statistics. Codes are assigned canonically (shorter
    /// codes first, ties broken by value) so the result does not depend on map iteration order.
    pub fn from_statistics(stats: &ParameterStatistics) -> Result<Self, CodeTableError> {
        if stats.counts.is_empty() {
            return Err(CodeTableError::EmptyStatistics(stats.name.clone()));
        }

        let mut lengths = huffman_code_lengths(&stats.counts);
        for (length, value) in &lengths {
            if *length > MAX_BIT_WIDTH as usize {
                return Err(CodeTableError::CodeTooLong {
                    parameter: stats.name.clone(),
                    value: *value,
                    length: *length,
                });
            }
        }
        lengths.sort_unstable();

        let mut codes = Vec::with_capacity(lengths.len());
        let mut code = 0u64;
        let mut previous_length = lengths[0].0;
        for (idx, (length, value)) in lengths.iter().enumerate() {
            if idx > 0 {
                code = (code + 1) << (length - previous_length);
            }
            previous_length = *length;
            codes.push(CodeEntry {
                value: *value,
                code: format!("{code:0>width$b}", width = *length),
            });
        }

        Self::from_config(&ParameterTableConfig {
            name: stats.name.clone(),
            codes,
        })
    }
}

fn parse_code(parameter: &str, entry: &CodeEntry) -> Result<BitVec<u8, Msb0>, CodeTableError> {
    if entry.code.is_empty() || entry.code.chars().any(|c| c != '0' && c != '1') {
        return Err(CodeTableError::InvalidCode {
            parameter: parameter.to_string(),
            value: entry.value,
            code: entry.code.clone(),
        });
    }
    if entry.code.len() > MAX_BIT_WIDTH as usize {
        return Err(CodeTableError::CodeTooLong {
            parameter: parameter.to_string(),
            value: entry.value,
            length: entry.code.len(),
        });
    }
    Ok(entry.code.chars().map(|c| c == '1').collect())
}

fn code_to_u64(code: &BitSlice<u8, Msb0>) -> u64 {
    code.iter()
        .by_vals()
        .fold(0u64, |acc, bit| (acc << 1) | bit as u64)
}

/// Huffman code length of every symbol, as (length, value) pairs
fn huffman_code_lengths(counts: &FxHashMap<u64, u64>) -> Vec<(usize, u64)> {
    enum Node {
        Leaf(u64),
        Internal(usize, usize),
    }

    let mut symbols: Vec<(u64, u64)> = counts.iter().map(|(v, c)| (*v, *c)).collect();
    symbols.sort_unstable();
    if symbols.len() == 1 {
        return vec![(1, symbols[0].0)];
    }

    let mut nodes: Vec<Node> = Vec::with_capacity(symbols.len() * 2);
    let mut heap = BinaryHeap::new();
    for (value, count) in symbols {
        heap.push(Reverse((count, nodes.len())));
        nodes.push(Node::Leaf(value));
    }
    while heap.len() > 1 {
        let (Some(Reverse((w0, n0))), Some(Reverse((w1, n1)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(Reverse((w0 + w1, nodes.len())));
        nodes.push(Node::Internal(n0, n1));
    }

    let mut lengths = Vec::with_capacity(counts.len());
    let mut stack = vec![(nodes.len() - 1, 0usize)];
    while let Some((idx, depth)) = stack.pop() {
        match nodes[idx] {
            Node::Leaf(value) => lengths.push((depth, value)),
            Node::Internal(left, right) => {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
    }
    lengths
}

/// CodeTable holds the codes of every parameter, looked up by parameter name.
///
/// It is loaded once, either from a file or from a calibration database entry, and is not
/// modified while encoding.
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    name: String,
    parameters: Vec<ParameterCodeTable>,
}

impl CodeTable {
    pub fn from_config(config: &CodeTableConfig) -> Result<Self, CodeTableError> {
        let mut parameters: Vec<ParameterCodeTable> = Vec::with_capacity(config.parameters.len());
        for param in &config.parameters {
            if parameters.iter().any(|p| p.name == param.name) {
                return Err(CodeTableError::DuplicateParameter(param.name.clone()));
            }
            parameters.push(ParameterCodeTable::from_config(param)?);
        }
        Ok(Self {
            name: config.name.clone(),
            parameters,
        })
    }

    /// Load a table directly from a file
    pub fn read_file(path: &Path) -> Result<Self, CodeTableError> {
        let config = CodeTableConfig::read_file(path)?;
        log::info!(
            "Reading code table configuration object {} from file {}",
            config.name,
            path.to_string_lossy()
        );
        Self::from_config(&config)
    }

    /// Load a table from a calibration database
    pub fn read_cdb(cdb_path: &Path, entry: &str, run_number: u32) -> Result<Self, CodeTableError> {
        let path = find_cdb_file(cdb_path, entry, run_number)?;
        Self::read_file(&path)
    }

    /// Build a table from the statistics of a training run
    pub fn from_statistics(statistics: &[ParameterStatistics]) -> Result<Self, CodeTableError> {
        let mut parameters = Vec::with_capacity(statistics.len());
        for stats in statistics {
            parameters.push(ParameterCodeTable::from_statistics(stats)?);
        }
        Ok(Self {
            name: String::from(CODE_TABLE_NAME),
            parameters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, parameter: &str) -> Option<&ParameterCodeTable> {
        self.parameters.iter().find(|p| p.name == parameter)
    }

    pub fn to_config(&self) -> CodeTableConfig {
        CodeTableConfig {
            name: self.name.clone(),
            parameters: self.parameters.iter().map(|p| p.to_config()).collect(),
        }
    }

    pub fn write_file(&self, path: &Path) -> Result<(), CodeTableError> {
        self.to_config().write_file(path)
    }
}

/// Calibration database file name: Run<first>_<last>_v<version>_s<subversion>.yml
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CdbFileId {
    first_run: u32,
    last_run: u32,
    version: u32,
    subversion: u32,
}

impl CdbFileId {
    fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_prefix("Run")?.strip_suffix(".yml")?;
        let fields: Vec<&str> = stem.split('_').collect();
        if fields.len() != 4 {
            return None;
        }
        Some(Self {
            first_run: fields[0].parse().ok()?,
            last_run: fields[1].parse().ok()?,
            version: fields[2].strip_prefix('v')?.parse().ok()?,
            subversion: fields[3].strip_prefix('s')?.parse().ok()?,
        })
    }

    fn covers(&self, run_number: u32) -> bool {
        self.first_run <= run_number && run_number <= self.last_run
    }
}

/// Find the newest file of a calibration database entry which is valid for a run
pub fn find_cdb_file(
    cdb_path: &Path,
    entry: &str,
    run_number: u32,
) -> Result<PathBuf, CodeTableError> {
    let entry_dir = cdb_path.join(entry);
    if !entry_dir.exists() {
        return Err(CodeTableError::BadFilePath(entry_dir));
    }

    let mut best: Option<(CdbFileId, PathBuf)> = None;
    for item in entry_dir.read_dir()? {
        let item_path = item?.path();
        let Some(id) = item_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(CdbFileId::parse)
        else {
            continue;
        };
        if !id.covers(run_number) {
            continue;
        }
        let is_newer = match &best {
            Some((best_id, _)) => {
                (id.version, id.subversion) > (best_id.version, best_id.subversion)
            }
            None => true,
        };
        if is_newer {
            best = Some((id, item_path));
        }
    }

    best.map(|(_, path)| path)
        .ok_or(CodeTableError::NoMatchingEntry(entry_dir, run_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_output::BitOutputStream;
    use std::io::Write;

    fn entry(value: u64, code: &str) -> CodeEntry {
        CodeEntry {
            value,
            code: code.to_string(),
        }
    }

    fn small_table() -> ParameterTableConfig {
        ParameterTableConfig {
            name: String::from("padrow"),
            codes: vec![entry(0, "0"), entry(1, "10"), entry(2, "110"), entry(61, "111")],
        }
    }

    #[test]
    fn test_round_trip() {
        let table = match ParameterCodeTable::from_config(&small_table()) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        };
        let values = [0u64, 61, 2, 1, 0, 61];
        let mut stream = BitOutputStream::new(4);
        for value in values {
            let code = match table.code(value) {
                Some(c) => c,
                None => panic!(),
            };
            assert!(stream.write_code(code).is_ok());
        }
        assert_eq!(stream.bits_written(), 1 + 3 + 3 + 2 + 1 + 3);
        let mut reader = BitReader::new(stream.as_bitslice());
        for value in values {
            assert_eq!(table.decode(&mut reader), Some(value));
        }
        assert_eq!(table.decode(&mut reader), None);
    }

    #[test]
    fn test_prefix_violation() {
        let mut config = small_table();
        config.codes.push(entry(7, "1101"));
        assert!(matches!(
            ParameterCodeTable::from_config(&config),
            Err(CodeTableError::NotPrefixFree { .. })
        ));
    }

    #[test]
    fn test_invalid_codes() {
        let mut config = small_table();
        config.codes.push(entry(9, "10a"));
        assert!(matches!(
            ParameterCodeTable::from_config(&config),
            Err(CodeTableError::InvalidCode { .. })
        ));

        let mut config = small_table();
        config.codes.push(entry(9, ""));
        assert!(ParameterCodeTable::from_config(&config).is_err());

        let mut config = small_table();
        config.codes.push(entry(1, "1110"));
        assert!(matches!(
            ParameterCodeTable::from_config(&config),
            Err(CodeTableError::DuplicateValue { value: 1, .. })
        ));

        let config = ParameterTableConfig {
            name: String::from("wide"),
            codes: vec![entry(0, &"1".repeat(65))],
        };
        assert!(matches!(
            ParameterCodeTable::from_config(&config),
            Err(CodeTableError::CodeTooLong { length: 65, .. })
        ));
    }

    #[test]
    fn test_from_statistics() {
        let mut stats = ParameterStatistics::new("charge");
        for (value, count) in [(100u64, 50u64), (101, 20), (102, 20), (400, 5), (900, 5)] {
            for _ in 0..count {
                stats.record(value);
            }
        }
        assert_eq!(stats.total(), 100);
        let table = match ParameterCodeTable::from_statistics(&stats) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(table.len(), 5);
        let len_of = |v: u64| table.code(v).map(|c| c.len()).unwrap_or(0);
        assert_eq!(len_of(100), 1);
        assert!(len_of(101) <= len_of(400));
        assert!(len_of(102) <= len_of(900));
        // Canonical assignment is deterministic
        let again = match ParameterCodeTable::from_statistics(&stats) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(table.to_config(), again.to_config());
    }

    #[test]
    fn test_single_symbol_statistics() {
        let mut stats = ParameterStatistics::new("qmax");
        stats.record(7);
        stats.record(7);
        let table = match ParameterCodeTable::from_statistics(&stats) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(table.code(7).map(|c| c.len()), Some(1));
        assert!(ParameterCodeTable::from_statistics(&ParameterStatistics::new("x")).is_err());
    }

    #[test]
    fn test_duplicate_parameter() {
        let config = CodeTableConfig {
            name: String::from(CODE_TABLE_NAME),
            parameters: vec![small_table(), small_table()],
        };
        assert!(matches!(
            CodeTable::from_config(&config),
            Err(CodeTableError::DuplicateParameter(_))
        ));
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let config = CodeTableConfig {
            name: String::from(CODE_TABLE_NAME),
            parameters: vec![small_table()],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huffmanConfiguration.yml");
        assert!(config.write_file(&path).is_ok());
        let table = match CodeTable::read_file(&path) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(table.name(), CODE_TABLE_NAME);
        assert_eq!(table.get("padrow").map(|p| p.len()), Some(4));
        assert!(table.get("pad").is_none());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"- just\n- a\n- list\n").unwrap();
        assert!(matches!(
            CodeTable::read_file(file.path()),
            Err(CodeTableError::ParsingError(_))
        ));
    }

    #[test]
    fn test_cdb_file_id() {
        let id = CdbFileId::parse("Run0_999999999_v2_s1.yml");
        assert_eq!(
            id,
            Some(CdbFileId {
                first_run: 0,
                last_run: 999999999,
                version: 2,
                subversion: 1
            })
        );
        assert!(CdbFileId::parse("Run0_10_v2.yml").is_none());
        assert!(CdbFileId::parse("table.yml").is_none());
    }

    #[test]
    fn test_find_cdb_file() {
        let cdb_dir = tempfile::tempdir().unwrap();
        let cdb = cdb_dir.path();
        let entry = "HLT/ConfigTPC/TPCDataCompressionHuffmanTables";
        let dir = cdb.join(entry);
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "Run0_999999999_v1_s0.yml",
            "Run0_999999999_v2_s0.yml",
            "Run100_200_v5_s0.yml",
        ] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        let found = find_cdb_file(cdb, entry, 50);
        let found_in_range = find_cdb_file(cdb, entry, 150);
        let missing = find_cdb_file(cdb, "HLT/Nothing", 0);

        assert_eq!(
            found.ok().and_then(|p| p.file_name().map(|n| n.to_os_string())),
            Some("Run0_999999999_v2_s0.yml".into())
        );
        assert_eq!(
            found_in_range
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_os_string())),
            Some("Run100_200_v5_s0.yml".into())
        );
        assert!(matches!(missing, Err(CodeTableError::BadFilePath(_))));
    }
}
