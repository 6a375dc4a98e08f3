use anyhow::{Context, Result};
use noodles::fasta;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Known haplotypes, used only to flag whether an emitted edge is real.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    haplotypes: Vec<Vec<u8>>,
}

impl GroundTruth {
    pub fn new(haplotypes: Vec<Vec<u8>>) -> Self {
        Self {
            haplotypes: haplotypes
                .into_iter()
                .map(|h| h.iter().map(u8::to_ascii_uppercase).collect())
                .collect(),
        }
    }

    /// Load reference-length haplotype sequences from a FASTA file.
    pub fn from_fasta(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open ground truth FASTA: {}", path.display()))?;
        let mut reader = fasta::io::Reader::new(BufReader::new(file));

        let mut haplotypes = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record =
                result.with_context(|| format!("Failed to read FASTA record {}", i + 1))?;
            haplotypes.push(record.sequence().as_ref().to_vec());
        }
        Ok(Self::new(haplotypes))
    }

    pub fn len(&self) -> usize {
        self.haplotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.haplotypes.is_empty()
    }

    /// Whether any haplotype carries `first_symbol` at `first` and
    /// `second_symbol` at `second`.
    pub fn supports(&self, first: usize, first_symbol: u8, second: usize, second_symbol: u8) -> bool {
        self.haplotypes.iter().any(|h| {
            h.get(first) == Some(&first_symbol) && h.get(second) == Some(&second_symbol)
        })
    }
}
