//! Measurement Samples

/// One timed batch of iterations.
///
/// Totals are kept raw; per-iteration values are derived on demand so that
/// sub-nanosecond iterations (a stack-built `Small`) are not truncated to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Iterations executed in this batch
    pub iterations: u64,
    /// Wall-clock duration of the whole batch in nanoseconds
    pub total_nanos: u64,
    /// CPU cycles for the whole batch (0 without a cycle counter)
    pub total_cycles: u64,
    /// Bytes allocated during the batch
    pub alloc_bytes: u64,
    /// Number of allocations during the batch
    pub alloc_count: u64,
}

impl Sample {
    /// Create a new sample with the given batch totals
    #[inline]
    pub fn new(
        iterations: u64,
        total_nanos: u64,
        total_cycles: u64,
        alloc_bytes: u64,
        alloc_count: u64,
    ) -> Self {
        Self {
            iterations,
            total_nanos,
            total_cycles,
            alloc_bytes,
            alloc_count,
        }
    }

    /// Mean nanoseconds per iteration
    pub fn nanos_per_iter(&self) -> f64 {
        per_iter(self.total_nanos, self.iterations)
    }

    /// Mean cycles per iteration
    pub fn cycles_per_iter(&self) -> f64 {
        per_iter(self.total_cycles, self.iterations)
    }

    /// Mean allocations per iteration
    pub fn allocs_per_iter(&self) -> f64 {
        per_iter(self.alloc_count, self.iterations)
    }

    /// Mean allocated bytes per iteration
    pub fn bytes_per_iter(&self) -> f64 {
        per_iter(self.alloc_bytes, self.iterations)
    }
}

fn per_iter(total: u64, iterations: u64) -> f64 {
    if iterations == 0 {
        0.0
    } else {
        total as f64 / iterations as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_nanosecond_iterations_survive() {
        let sample = Sample::new(1000, 300, 900, 0, 0);
        assert!((sample.nanos_per_iter() - 0.3).abs() < f64::EPSILON);
        assert!((sample.cycles_per_iter() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_batch() {
        let sample = Sample::new(0, 0, 0, 0, 0);
        assert_eq!(sample.nanos_per_iter(), 0.0);
        assert_eq!(sample.allocs_per_iter(), 0.0);
    }

    #[test]
    fn test_allocation_rates() {
        let sample = Sample::new(100, 5000, 0, 800, 100);
        assert_eq!(sample.allocs_per_iter(), 1.0);
        assert_eq!(sample.bytes_per_iter(), 8.0);
    }
}
