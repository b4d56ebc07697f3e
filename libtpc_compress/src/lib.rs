//! # tpc_compress
//!
//! tpc_compress is a benchmark for the compression of TPC cluster data, written in Rust. It
//! takes raw cluster arrays as produced by the TPC cluster finder, maps each cluster onto a fixed
//! set of integer parameters, encodes those parameters with either fixed width packing or
//! Huffman codes, and reports the compressed size relative to the 77 bit per cluster baseline.
//!
//! ## Building & Install
//!
//! To build and install the CLI use `cargo install --path ./tpc_compress_cli` from the top
//! level repository. See the `tpc_compress_cli` documentation for its use.
//!
//! ## Configuration
//!
//! The benchmark is configured by a YAML file. A template can be made with
//! `tpc_compress_cli new -p config.yml`. The format is as follows:
//!
//! ```yml
//! deflater: fixed_width
//! code_table_path: null
//! cdb_path: null
//! cdb_entry: HLT/ConfigTPC/TPCDataCompressionHuffmanTables
//! run_number: 0
//! scratch_buffer_size: 256
//! training_output_path: null
//! parameters:
//! - name: padrow
//!   bit_width: 6
//! - name: pad
//!   bit_width: 14
//! - name: time
//!   bit_width: 15
//! - name: sigmaY2
//!   bit_width: 8
//! - name: sigmaZ2
//!   bit_width: 8
//! - name: charge
//!   bit_width: 16
//! - name: qmax
//!   bit_width: 10
//! ```
//!
//! - `deflater`: one of `fixed_width`, `huffman` or `training`
//! - `code_table_path`: Huffman table file. Takes precedence over the calibration database.
//! - `cdb_path`, `cdb_entry`, `run_number`: Huffman table from a calibration database. The entry
//! directory holds files named `Run<first>_<last>_v<version>_s<subversion>.yml`; the newest file
//! valid for the run number is used.
//! - `scratch_buffer_size`: bytes of scratch output available to encode a single cluster
//! - `training_output_path`: in training mode, where to write the code table built from the
//! gathered statistics
//! - `parameters`: the parameter dictionary. It must have one entry per cluster field, in the
//! order above.
//!
//! ### Code Table Format
//!
//! ```yml
//! name: TPCDataCompressionHuffmanTables
//! parameters:
//! - name: padrow
//!   codes:
//!   - value: 0
//!     code: '0'
//!   - value: 1
//!     code: '10'
//! ```
//!
//! Every parameter in the dictionary needs a table, and the codes of a table must be prefix free.
//! A value without a code cannot be encoded and fails the input it occurs in.
//!
//! ## Cluster Array Format
//!
//! ```text
//! count: u32
//! cluster * count:
//!     pad_row: u16, flags: u16, pad: f32, time: f32, sigma_pad2: f32, sigma_time2: f32,
//!     charge: u16, qmax: u16
//! ```
//!
//! All values are little endian. Files shorter than the size the count requires are rejected.
//!
//! ## Quantization
//!
//! | parameter | bits | value                                    |
//! |-----------|------|------------------------------------------|
//! | padrow    | 6    | pad row - previous pad row, modulo 2^6   |
//! | pad       | 14   | pad * 60                                 |
//! | time      | 15   | time * 25                                |
//! | sigmaY2   | 8    | sigma_pad2 * 25, at most 255             |
//! | sigmaZ2   | 8    | sigma_time2 * 10, at most 255            |
//! | charge    | 16   | charge                                   |
//! | qmax      | 10   | qmax                                     |
pub mod benchmark;
pub mod bit_output;
pub mod cluster;
pub mod code_table;
pub mod config;
pub mod constants;
pub mod deflater;
pub mod error;
pub mod parameter;
pub mod process;
pub mod quantizer;
pub mod record_array;
pub mod worker_status;
