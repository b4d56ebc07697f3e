// Raw cluster array layout (all little endian)
// [count: u32]
// [pad_row: u16][flags: u16][pad: f32][time: f32][sigma_pad2: f32][sigma_time2: f32][charge: u16][qmax: u16] * count
pub const HEADER_SIZE: usize = 4;
pub const RECORD_SIZE: usize = 24;

pub const OFFSET_PAD_ROW: usize = 0;
pub const OFFSET_FLAGS: usize = 2;
pub const OFFSET_PAD: usize = 4;
pub const OFFSET_TIME: usize = 8;
pub const OFFSET_SIGMA_PAD2: usize = 12;
pub const OFFSET_SIGMA_TIME2: usize = 16;
pub const OFFSET_CHARGE: usize = 20;
pub const OFFSET_QMAX: usize = 22;

/// Cost of one uncompressed cluster in bits, the denominator of every ratio
pub const BASELINE_BITS_PER_CLUSTER: u64 = 77;

// Quantization scale factors
pub const PAD_SCALE: f32 = 60.0;
pub const TIME_SCALE: f32 = 25.0;
pub const SIGMA_PAD2_SCALE: f32 = 25.0;
pub const SIGMA_TIME2_SCALE: f32 = 10.0;

/// The number of cluster parameters produced by the quantizer
pub const NUMBER_OF_PARAMETERS: usize = 7;

/// Standard parameter dictionary: name and bit width, in serialization order
pub const STANDARD_PARAMETERS: [(&str, u8); NUMBER_OF_PARAMETERS] = [
    ("padrow", 6),
    ("pad", 14),
    ("time", 15),
    ("sigmaY2", 8),
    ("sigmaZ2", 8),
    ("charge", 16),
    ("qmax", 10),
];

/// Widest single value (and longest code) the bit output supports
pub const MAX_BIT_WIDTH: u8 = 64;

/// Default per-record scratch space, 32 64-bit words
pub const DEFAULT_SCRATCH_BYTES: usize = 256;
/// Largest accepted scratch space. A cluster needs at most 7 * 64 bits.
pub const MAX_SCRATCH_BYTES: usize = 4096;

/// Default calibration database entry holding the Huffman tables
pub const DEFAULT_CDB_ENTRY: &str = "HLT/ConfigTPC/TPCDataCompressionHuffmanTables";
pub const CODE_TABLE_NAME: &str = "TPCDataCompressionHuffmanTables";

/// Publish a progress message every this many records
pub const STATUS_INTERVAL: u64 = 1000;
