use std::fmt;

use super::SIZE_CLASSES;

/// Per-class numbers from [`NodePool::report`](super::NodePool::report).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassReport {
    pub block_size: usize,
    /// blocks sitting in the free list right now
    pub retained: usize,
    /// blocks ever obtained from the system for this class
    pub minted: usize,
    /// allocations served from the free list
    pub reused: usize,
    /// frees pushed back onto the free list
    pub recycled: usize,
    /// blocks given back to the system (purged, or unpackable addresses)
    pub spilled: usize,
}

impl ClassReport {
    /// Blocks currently handed out to callers.
    pub fn outstanding(&self) -> usize {
        self.minted.saturating_sub(self.retained + self.spilled)
    }
}

/// A point-in-time picture of a pool.
///
/// The free list walk is only meaningful if the pool was quiescent while it
/// was taken; the counters are summed across threads without synchronization
/// and can lag behind in-flight operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub classes: [ClassReport; SIZE_CLASSES],
    pub oversized_allocs: usize,
    pub oversized_frees: usize,
}

impl PoolReport {
    pub fn total_retained(&self) -> usize {
        self.classes.iter().map(|c| c.retained).sum()
    }

    pub fn total_outstanding(&self) -> usize {
        self.classes.iter().map(ClassReport::outstanding).sum::<usize>()
            + self.oversized_allocs.saturating_sub(self.oversized_frees)
    }

    /// Writes the report to the `info` log, one line per class.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{line}");
        }
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "node pool report")?;
        writeln!(f, "index  block size    retained      minted  outstanding")?;
        for (index, class) in self.classes.iter().enumerate() {
            writeln!(
                f,
                "{index:5}  {:5} byte  {:10}  {:10}  {:11}",
                class.block_size, class.retained, class.minted, class.outstanding()
            )?;
        }
        write!(f, "oversized: {} allocated, {} freed", self.oversized_allocs, self.oversized_frees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_accounts_for_spills() {
        let class = ClassReport { block_size: 32, retained: 3, minted: 10, reused: 4, recycled: 9, spilled: 2 };
        assert_eq!(class.outstanding(), 5);
    }

    #[test]
    fn display_has_a_row_per_class() {
        let mut report = PoolReport::default();
        report.classes[2] = ClassReport { block_size: 24, retained: 7, minted: 7, ..Default::default() };
        let text = report.to_string();
        assert_eq!(text.lines().count(), 2 + SIZE_CLASSES + 1);
        assert!(text.contains("    2     24 byte           7           7            0"));
    }
}
