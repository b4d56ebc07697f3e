/// Progress message published by the benchmark while it works through a batch.
///
/// `records_processed` only ever grows within one input; `input_index` grows across the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkStatus {
    pub input_index: usize,
    pub records_processed: u64,
    pub records_total: u64,
}

impl BenchmarkStatus {
    pub fn new(input_index: usize, records_processed: u64, records_total: u64) -> Self {
        Self {
            input_index,
            records_processed,
            records_total,
        }
    }

    /// Fraction of the current input which has been benchmarked
    pub fn progress(&self) -> f32 {
        if self.records_total == 0 {
            1.0
        } else {
            self.records_processed as f32 / self.records_total as f32
        }
    }
}
