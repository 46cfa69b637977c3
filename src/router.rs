use super::errors::Result;
use super::record::{FragmentExt, RecordSink};
use super::size_range::SizeRange;
use rust_htslib::bam::Record;

/// One output sink per configured size range.
pub struct Bucket<S> {
    pub range: SizeRange,
    pub sink: S,
    pub pairs_written: u64,
}

/// Fans accepted fragments out to every bucket whose range contains them.
/// Ranges may overlap, so a fragment can land in several buckets.
pub struct SizeBucketRouter<S> {
    buckets: Vec<Bucket<S>>,
}

impl<S: RecordSink> SizeBucketRouter<S> {
    pub fn new(buckets: Vec<(SizeRange, S)>) -> SizeBucketRouter<S> {
        SizeBucketRouter {
            buckets: buckets
                .into_iter()
                .map(|(range, sink)| Bucket {
                    range,
                    sink,
                    pairs_written: 0,
                })
                .collect(),
        }
    }

    /// Write both mates to each matching bucket, counting the pair once per bucket.
    /// Returns the number of buckets written to.
    pub fn route_pair(&mut self, left: &Record, right: &Record) -> Result<usize> {
        let len = left.fragment_len();
        let mut hits = 0;
        for bucket in self.buckets.iter_mut().filter(|b| b.range.contains(len)) {
            bucket.sink.write_record(left)?;
            bucket.sink.write_record(right)?;
            bucket.pairs_written += 1;
            hits += 1;
        }
        if hits == 0 {
            log::trace!(
                "No size range holds fragment of length {} ({})",
                len,
                String::from_utf8_lossy(left.qname())
            );
        }
        Ok(hits)
    }

    /// Write a lone read to each matching bucket; only forward reads count
    /// towards `pairs_written` so a pair is never counted twice.
    pub fn route_read(&mut self, rec: &Record) -> Result<usize> {
        let len = rec.fragment_len();
        let mut hits = 0;
        for bucket in self.buckets.iter_mut().filter(|b| b.range.contains(len)) {
            bucket.sink.write_record(rec)?;
            if !rec.is_reverse() {
                bucket.pairs_written += 1;
            }
            hits += 1;
        }
        Ok(hits)
    }

    /// Accepted pair counts in configuration order.
    pub fn counts(&self) -> Vec<(SizeRange, u64)> {
        self.buckets
            .iter()
            .map(|b| (b.range, b.pairs_written))
            .collect()
    }

    pub fn into_buckets(self) -> Vec<Bucket<S>> {
        self.buckets
    }
}
