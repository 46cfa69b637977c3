use super::errors::Result;
use rust_htslib::bam::{self, Record};

/// Fragment level helpers on top of a single alignment record.
pub trait FragmentExt {
    /// Absolute template length.
    fn fragment_len(&self) -> i64;
    /// The base at the 5' end of the original read.
    fn five_prime_base(&self) -> Option<u8>;
    /// True when the 5' base is A or T (either case).
    fn is_at_end(&self) -> bool {
        matches!(
            self.five_prime_base(),
            Some(b'A') | Some(b'a') | Some(b'T') | Some(b't')
        )
    }
    /// A proper pair flag that disagrees with the mate fields.
    fn has_inconsistent_mate(&self) -> bool;
}

impl FragmentExt for Record {
    fn fragment_len(&self) -> i64 {
        self.insert_size().abs()
    }

    fn five_prime_base(&self) -> Option<u8> {
        let seq = self.seq();
        let len = seq.len();
        if len == 0 {
            return None;
        }
        // reversed reads are stored reverse complemented; A/T survives complementing
        if self.is_reverse() {
            Some(seq[len - 1])
        } else {
            Some(seq[0])
        }
    }

    fn has_inconsistent_mate(&self) -> bool {
        self.is_proper_pair()
            && (self.is_mate_unmapped() || self.mtid() < 0 || self.mtid() != self.tid())
    }
}

/// Anything that can accept alignment records, e.g. a bam writer.
pub trait RecordSink {
    fn write_record(&mut self, rec: &Record) -> Result<()>;
}

impl RecordSink for bam::Writer {
    fn write_record(&mut self, rec: &Record) -> Result<()> {
        self.write(rec)?;
        Ok(())
    }
}

/// In memory sink, mostly for tests.
impl RecordSink for Vec<Record> {
    fn write_record(&mut self, rec: &Record) -> Result<()> {
        self.push(rec.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rust_htslib::bam::record::{Cigar, CigarString, Record};

    pub const PAIRED: u16 = 0x1;
    pub const PROPER: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const SECONDARY: u16 = 0x100;
    pub const SUPPLEMENTARY: u16 = 0x800;

    /// Build a mapped record with mapq 60 and a full length match cigar.
    #[allow(clippy::too_many_arguments)]
    pub fn make_rec(
        name: &str,
        tid: i32,
        pos: i64,
        mtid: i32,
        mpos: i64,
        flags: u16,
        isize: i64,
        seq: &[u8],
    ) -> Record {
        let mut rec = Record::new();
        let cigar = CigarString(vec![Cigar::Match(seq.len() as u32)]);
        let qual = vec![30u8; seq.len()];
        rec.set(name.as_bytes(), Some(&cigar), seq, &qual);
        rec.set_tid(tid);
        rec.set_pos(pos);
        rec.set_mtid(mtid);
        rec.set_mpos(mpos);
        rec.set_flags(flags);
        rec.set_insert_size(isize);
        rec.set_mapq(60);
        rec
    }

    /// A proper pair `(left, right)` on tid 0 with template length `len`.
    pub fn make_pair(
        name: &str,
        pos: i64,
        len: i64,
        left_seq: &[u8],
        right_seq: &[u8],
    ) -> (Record, Record) {
        let mpos = pos + len - right_seq.len() as i64;
        let left = make_rec(
            name,
            0,
            pos,
            0,
            mpos,
            PAIRED | PROPER | MATE_REVERSE,
            len,
            left_seq,
        );
        let right = make_rec(
            name,
            0,
            mpos,
            0,
            pos,
            PAIRED | PROPER | REVERSE,
            -len,
            right_seq,
        );
        (left, right)
    }
}
