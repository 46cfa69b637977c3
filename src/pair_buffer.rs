use rust_htslib::bam::Record;
use std::collections::HashMap;

/// Left mates waiting for their right mate within one reference sequence.
///
/// Memory grows with the number of reads whose mate has not been seen yet,
/// so inputs with many missing mates (truncated or region filtered) can hold
/// a large share of a reference sequence until [`PairBuffer::flush`].
#[derive(Debug, Default)]
pub struct PairBuffer {
    tid: Option<i32>,
    pending: HashMap<Vec<u8>, Record>,
}

impl PairBuffer {
    pub fn new() -> PairBuffer {
        PairBuffer::default()
    }

    /// Reference sequence the buffered reads belong to.
    pub fn tid(&self) -> Option<i32> {
        self.tid
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hold a left mate until its partner arrives; a second left mate with the
    /// same name replaces the first and the replaced read is returned.
    pub fn insert(&mut self, rec: Record) -> Option<Record> {
        self.tid = Some(rec.tid());
        self.pending.insert(rec.qname().to_vec(), rec)
    }

    /// Remove and return the left mate buffered under `name`.
    pub fn take(&mut self, name: &[u8]) -> Option<Record> {
        self.pending.remove(name)
    }

    /// Drop every buffered read at the end of a reference sequence,
    /// returning how many orphans were discarded.
    pub fn flush(&mut self) -> u64 {
        let orphans = self.pending.len() as u64;
        if orphans > 0 {
            log::debug!(
                "Discarding {} left mates without a right mate on tid {:?}",
                orphans,
                self.tid
            );
        }
        self.pending.clear();
        self.tid = None;
        orphans
    }
}
