use crate::structure::AlignedRead;
use crate::types::{AMBIGUOUS, GAP};
use anyhow::{Context, Result};
use rust_htslib::bam::record::Cigar;
use rust_htslib::{bam, bam::Read};
use std::collections::HashMap;
use std::path::Path;

macro_rules! progress {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

/// Reads of one contig projected onto reference coordinates.
pub struct LoadedSample {
    pub contig: String,
    pub reference_length: usize,
    pub reads: Vec<AlignedRead>,
    /// At least one pair of mates was merged.
    pub paired: bool,
    pub filtered: FilterStats,
}

/// Statistics from record filtering
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub other_contig: u64,
    pub unmapped: u64,
    pub secondary: u64,
    pub qc_fail: u64,
    pub duplicate: u64,
}

impl FilterStats {
    pub fn total(&self) -> u64 {
        self.other_contig + self.unmapped + self.secondary + self.qc_fail + self.duplicate
    }
}

/// Lay a record's bases out on the reference using its CIGAR.
///
/// Matches copy bases, deletions become gaps, reference skips become `N`;
/// insertions and clips have no reference position and are dropped.
pub fn project_record(record: &bam::Record) -> AlignedRead {
    let seq = record.seq().as_bytes();
    let mut calls = Vec::with_capacity(seq.len());
    let mut qpos = 0usize;

    for op in record.cigar().iter() {
        match *op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                let end = (qpos + len as usize).min(seq.len());
                calls.extend_from_slice(&seq[qpos.min(end)..end]);
                qpos += len as usize;
            }
            Cigar::Del(len) => calls.extend(std::iter::repeat(GAP).take(len as usize)),
            Cigar::RefSkip(len) => calls.extend(std::iter::repeat(AMBIGUOUS).take(len as usize)),
            Cigar::Ins(len) | Cigar::SoftClip(len) => qpos += len as usize,
            Cigar::HardClip(_) | Cigar::Pad(_) => {}
        }
    }

    AlignedRead::new(record.pos().max(0) as usize, &calls)
}

/// Merge two mates into one reference-space read.
///
/// The stretch between non-overlapping mates is `N`; where the mates overlap
/// and disagree the call becomes `N`.
pub fn merge_mates(a: &AlignedRead, b: &AlignedRead) -> AlignedRead {
    let start = a.start.min(b.start);
    let end = a.end().max(b.end());
    let mut calls = vec![AMBIGUOUS; end - start];

    calls[a.start - start..a.end() - start].copy_from_slice(&a.calls);
    for (offset, &base) in b.calls.iter().enumerate() {
        let slot = &mut calls[b.start - start + offset];
        if *slot == AMBIGUOUS {
            *slot = base;
        } else if *slot != base {
            *slot = AMBIGUOUS;
        }
    }

    AlignedRead { start, calls }
}

/// Load every primary, mapped read of one contig.
///
/// `contig` picks the reference by name; without it the first reference in
/// the header is used.
pub fn load_reads(path: &Path, contig: Option<&str>, quiet: bool) -> Result<LoadedSample> {
    let mut reader = bam::Reader::from_path(path)
        .with_context(|| format!("Failed to open alignment file: {}", path.display()))?;

    let header = reader.header().clone();
    if header.target_count() == 0 {
        anyhow::bail!("Alignment file has no reference sequences: {}", path.display());
    }
    let tid = match contig {
        Some(name) => header.tid(name.as_bytes()).with_context(|| {
            format!("Contig '{}' not found in alignment header", name)
        })?,
        None => 0,
    };
    let contig_name = String::from_utf8_lossy(header.tid2name(tid)).to_string();
    let reference_length = header
        .target_len(tid)
        .with_context(|| format!("No length for contig '{}'", contig_name))? as usize;

    progress!(quiet, "Contig: {} ({} bp)", contig_name, reference_length);

    let mut reads = Vec::new();
    let mut pending: HashMap<Vec<u8>, AlignedRead> = HashMap::new();
    let mut stats = FilterStats::default();
    let mut total_count: u64 = 0;
    let mut merged_pairs: u64 = 0;

    for result in reader.records() {
        total_count += 1;
        if total_count % 1_000_000 == 0 {
            progress!(quiet, "Processed {} records...", total_count);
        }

        let record = result.context("Failed to read alignment record")?;

        if record.is_unmapped() {
            stats.unmapped += 1;
            continue;
        }
        if record.tid() != tid as i32 {
            stats.other_contig += 1;
            continue;
        }
        if record.is_secondary() || record.is_supplementary() {
            stats.secondary += 1;
            continue;
        }
        if record.is_quality_check_failed() {
            stats.qc_fail += 1;
            continue;
        }
        if record.is_duplicate() {
            stats.duplicate += 1;
            continue;
        }

        let read = project_record(&record);
        let has_mate = record.is_paired() && !record.is_mate_unmapped() && record.mtid() == record.tid();
        if !has_mate {
            reads.push(read);
            continue;
        }

        match pending.remove(record.qname()) {
            Some(mate) => {
                reads.push(merge_mates(&mate, &read));
                merged_pairs += 1;
            }
            None => {
                pending.insert(record.qname().to_vec(), read);
            }
        }
    }

    // Mates whose partner was filtered out stay single
    let mut orphans: Vec<(Vec<u8>, AlignedRead)> = pending.into_iter().collect();
    orphans.sort_by(|a, b| a.1.start.cmp(&b.1.start).then_with(|| a.0.cmp(&b.0)));
    let orphan_count = orphans.len();
    reads.extend(orphans.into_iter().map(|(_, read)| read));

    progress!(quiet, "Total records: {}", total_count);
    progress!(quiet, "Filtered records: {}", stats.total());
    progress!(quiet, "  Other contig: {}", stats.other_contig);
    progress!(quiet, "  Unmapped: {}", stats.unmapped);
    progress!(quiet, "  Secondary/supplementary: {}", stats.secondary);
    progress!(quiet, "  QC fail: {}", stats.qc_fail);
    progress!(quiet, "  Duplicate: {}", stats.duplicate);
    progress!(quiet, "Merged mate pairs: {}", merged_pairs);
    progress!(quiet, "Unpaired mates: {}", orphan_count);
    progress!(quiet, "Retained reads: {}", reads.len());

    Ok(LoadedSample {
        contig: contig_name,
        reference_length,
        reads,
        paired: merged_pairs > 0,
        filtered: stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::CigarString;
    use std::io::Write;

    fn record(pos: i64, cigar: Vec<Cigar>, seq: &[u8]) -> bam::Record {
        let mut rec = bam::Record::new();
        let qual = vec![30u8; seq.len()];
        rec.set(b"read1", Some(&CigarString(cigar)), seq, &qual);
        rec.set_pos(pos);
        rec
    }

    #[test]
    fn test_project_match_only() {
        let rec = record(10, vec![Cigar::Match(4)], b"ACGT");
        assert_eq!(project_record(&rec), AlignedRead::new(10, b"ACGT"));
    }

    #[test]
    fn test_project_indels_and_clips() {
        // 2S 3M 1I 2D 2M: clipped and inserted bases have no reference slot
        let rec = record(
            5,
            vec![Cigar::SoftClip(2), Cigar::Match(3), Cigar::Ins(1), Cigar::Del(2), Cigar::Match(2)],
            b"TTACGGCA",
        );
        let read = project_record(&rec);
        assert_eq!(read.start, 5);
        assert_eq!(read.calls, b"ACG--CA".to_vec());
    }

    #[test]
    fn test_project_ref_skip() {
        let rec = record(0, vec![Cigar::Match(2), Cigar::RefSkip(3), Cigar::Match(1)], b"ACG");
        assert_eq!(project_record(&rec).calls, b"ACNNNG".to_vec());
    }

    #[test]
    fn test_merge_disjoint_mates() {
        let a = AlignedRead::new(0, b"ACG");
        let b = AlignedRead::new(5, b"TT");
        let merged = merge_mates(&a, &b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.calls, b"ACGNNTT".to_vec());
    }

    #[test]
    fn test_merge_overlapping_mates() {
        let a = AlignedRead::new(2, b"ACGT");
        let b = AlignedRead::new(0, b"GGACCT");
        let merged = merge_mates(&a, &b);
        assert_eq!(merged.start, 0);
        // overlap at 2..6: A=A, C=C, G/C disagree, T=T
        assert_eq!(merged.calls, b"GGACNT".to_vec());
    }

    const HEADER: &str = "@HD\tVN:1.6\tSO:unsorted\n@SQ\tSN:chr1\tLN:20\n@SQ\tSN:chr2\tLN:30\n";

    fn write_sam(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".sam").tempfile().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        for line in lines {
            writeln!(file, "{}", line.replace(' ', "\t")).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn mixed_sample() -> tempfile::NamedTempFile {
        write_sam(&[
            "pair1 99 chr1 1 60 4M = 7 10 ACGT *",
            "pair1 147 chr1 7 60 4M = 1 -10 TTGA *",
            "single 0 chr1 3 60 3M * 0 0 GGG *",
            "unmapped 4 * 0 0 * * 0 0 ACGT *",
            "dup 1024 chr1 1 60 4M * 0 0 ACGT *",
            "secondary 256 chr1 1 60 4M * 0 0 ACGT *",
            "elsewhere 0 chr2 1 60 4M * 0 0 ACGT *",
            "pair2 65 chr1 11 60 4M = 15 8 CCCC *",
            "pair2 641 chr1 15 60 4M = 11 -8 GGGG *",
        ])
    }

    #[test]
    fn test_load_reads_filters_and_merges() {
        let file = mixed_sample();
        let sample = load_reads(file.path(), None, true).unwrap();

        assert_eq!(sample.contig, "chr1");
        assert_eq!(sample.reference_length, 20);
        assert!(sample.paired);
        assert_eq!(
            sample.reads,
            vec![
                AlignedRead::new(0, b"ACGTNNTTGA"),
                AlignedRead::new(2, b"GGG"),
                // mate failed QC, so its partner is kept alone
                AlignedRead::new(10, b"CCCC"),
            ]
        );
        assert_eq!(
            sample.filtered,
            FilterStats { other_contig: 1, unmapped: 1, secondary: 1, qc_fail: 1, duplicate: 1 }
        );
        assert_eq!(sample.filtered.total(), 5);
    }

    #[test]
    fn test_load_named_contig_single_end() {
        let file = mixed_sample();
        let sample = load_reads(file.path(), Some("chr2"), true).unwrap();
        assert_eq!(sample.contig, "chr2");
        assert_eq!(sample.reference_length, 30);
        assert!(!sample.paired);
        assert_eq!(sample.reads, vec![AlignedRead::new(0, b"ACGT")]);
        // The contig check runs before the flag checks, so all mapped chr1 records land here
        assert_eq!(sample.filtered.other_contig, 7);
        assert_eq!(sample.filtered.unmapped, 1);
    }

    #[test]
    fn test_unknown_contig_is_an_error() {
        let file = mixed_sample();
        assert!(load_reads(file.path(), Some("chrX"), true).is_err());
    }
}
