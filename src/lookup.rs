//! Gene and transcript lookup tables.
//!
//! Both files are headerless, tab-separated, and may be gzipped. Lines
//! starting with `#` are comments.
//!
//! Gene regions (`chrom, start, end, exon, gene-info`) are typically one row
//! per exon; rows are aggregated per gene to the span from the smallest start
//! to the largest end. The gene symbol is the first token of `gene-info`
//! before any `;`, `|` or `,`. Coordinates are 1-based and inclusive.
//!
//! Transcripts (`gene, transcript-id, refseq-id`) map a gene symbol to the
//! transcript used for annotation requests. The first row for a gene wins.

use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::VepError;
use crate::table::open_input;
use crate::variant::normalize_chrom;

/// A gene's aggregated span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSpan {
    pub gene: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl GeneSpan {
    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos <= self.end
    }
}

#[derive(Debug, Deserialize)]
struct GeneRegionRow {
    chrom: String,
    start: u64,
    end: u64,
    #[allow(dead_code)]
    exon: String,
    gene_info: String,
}

/// Gene spans by chromosome, for locating the gene of a position
#[derive(Debug, Clone, Default)]
pub struct GeneRegions {
    by_chrom: HashMap<String, Vec<GeneSpan>>,
}

impl GeneRegions {
    /// Load a gene-region file.
    pub fn from_file(path: &Path) -> Result<Self, VepError> {
        let regions = Self::from_reader(open_input(path)?).map_err(|e| VepError::Table {
            msg: format!("{}: {}", path.display(), e),
        })?;
        info!(
            "Loaded {} gene regions from {}",
            regions.len(),
            path.display()
        );
        Ok(regions)
    }

    /// Parse gene-region rows from a reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, VepError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);

        let mut spans: HashMap<(String, String), GeneSpan> = HashMap::new();
        for row in csv_reader.deserialize() {
            let row: GeneRegionRow = row?;
            let gene = gene_symbol(&row.gene_info);
            if gene.is_empty() {
                continue;
            }
            let chrom = normalize_chrom(&row.chrom);
            let (start, end) = (row.start.min(row.end), row.start.max(row.end));

            spans
                .entry((chrom.clone(), gene.to_string()))
                .and_modify(|span| {
                    span.start = span.start.min(start);
                    span.end = span.end.max(end);
                })
                .or_insert_with(|| GeneSpan {
                    gene: gene.to_string(),
                    chrom,
                    start,
                    end,
                });
        }

        Ok(Self::from_spans(spans.into_values()))
    }

    /// Build from already-aggregated spans.
    pub fn from_spans(spans: impl IntoIterator<Item = GeneSpan>) -> Self {
        let mut by_chrom: HashMap<String, Vec<GeneSpan>> = HashMap::new();
        for mut span in spans {
            span.chrom = normalize_chrom(&span.chrom);
            by_chrom.entry(span.chrom.clone()).or_default().push(span);
        }
        for spans in by_chrom.values_mut() {
            spans.sort_by(|a, b| (a.start, a.end, &a.gene).cmp(&(b.start, b.end, &b.gene)));
        }
        Self { by_chrom }
    }

    /// Gene containing `chrom:pos`.
    ///
    /// When gene spans overlap, the one starting first wins. `chrom` may
    /// carry a `chr` prefix.
    pub fn locate(&self, chrom: &str, pos: u64) -> Option<&GeneSpan> {
        self.by_chrom
            .get(&normalize_chrom(chrom))?
            .iter()
            .take_while(|span| span.start <= pos)
            .find(|span| span.contains(pos))
    }

    /// Number of gene spans
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Gene symbol from a gene-info column.
fn gene_symbol(info: &str) -> &str {
    info.split([';', '|', ','])
        .next()
        .unwrap_or("")
        .trim()
}

/// Transcript identifiers for a gene
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranscriptEntry {
    pub gene: String,
    pub transcript_id: String,
    #[serde(default)]
    pub refseq_id: Option<String>,
}

/// Gene symbol to annotation transcript
#[derive(Debug, Clone, Default)]
pub struct TranscriptIds {
    by_gene: HashMap<String, TranscriptEntry>,
}

impl TranscriptIds {
    /// Load a transcript file.
    pub fn from_file(path: &Path) -> Result<Self, VepError> {
        let ids = Self::from_reader(open_input(path)?).map_err(|e| VepError::Table {
            msg: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded {} gene transcripts from {}", ids.len(), path.display());
        Ok(ids)
    }

    /// Parse transcript rows from a reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, VepError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(reader);

        let mut ids = Self::default();
        for row in csv_reader.deserialize() {
            let mut entry: TranscriptEntry = row?;
            entry.gene = entry.gene.trim().to_string();
            entry.transcript_id = entry.transcript_id.trim().to_string();
            entry.refseq_id = entry
                .refseq_id
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            if entry.gene.is_empty() || entry.transcript_id.is_empty() {
                continue;
            }
            ids.insert(entry);
        }
        Ok(ids)
    }

    /// Add a mapping unless the gene already has one.
    pub fn insert(&mut self, entry: TranscriptEntry) {
        if self.by_gene.contains_key(&entry.gene) {
            debug!("Ignoring extra transcript {} for {}", entry.transcript_id, entry.gene);
            return;
        }
        self.by_gene.insert(entry.gene.clone(), entry);
    }

    /// Transcript for `gene`.
    pub fn resolve(&self, gene: &str) -> Option<&TranscriptEntry> {
        self.by_gene.get(gene)
    }

    pub fn len(&self) -> usize {
        self.by_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gene.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENES: &str = "# chrom\tstart\tend\texon\tgene\n\
                         17\t41196312\t41197819\t24\tBRCA1;NM_007294\n\
                         17\t41276034\t41277500\t1\tBRCA1;NM_007294\n\
                         chr17\t7571720\t7573008\t11\tTP53|NM_000546\n\
                         13\t32889617\t32890664\t1\tBRCA2\n";

    const TRANSCRIPTS: &str = "BRCA1\tENST00000357654\tNM_007294.4\n\
                               BRCA1\tENST00000471181\tNM_007300.4\n\
                               TP53\tENST00000269305\t\n";

    #[test]
    fn test_gene_regions_aggregate() {
        let regions = GeneRegions::from_reader(GENES.as_bytes()).unwrap();
        assert_eq!(regions.len(), 3);

        let brca1 = regions.locate("17", 41244936).unwrap();
        assert_eq!(brca1.gene, "BRCA1");
        assert_eq!((brca1.start, brca1.end), (41196312, 41277500));
    }

    #[test]
    fn test_locate_boundaries_and_prefix() {
        let regions = GeneRegions::from_reader(GENES.as_bytes()).unwrap();
        assert_eq!(regions.locate("chr17", 7571720).unwrap().gene, "TP53");
        assert_eq!(regions.locate("17", 7573008).unwrap().gene, "TP53");
        assert!(regions.locate("17", 7573009).is_none());
        assert!(regions.locate("17", 7571719).is_none());
        assert!(regions.locate("X", 100).is_none());
    }

    #[test]
    fn test_overlapping_genes_first_start_wins() {
        let regions = GeneRegions::from_spans(vec![
            GeneSpan {
                gene: "B".to_string(),
                chrom: "1".to_string(),
                start: 150,
                end: 300,
            },
            GeneSpan {
                gene: "A".to_string(),
                chrom: "1".to_string(),
                start: 100,
                end: 200,
            },
        ]);
        assert_eq!(regions.locate("1", 175).unwrap().gene, "A");
        assert_eq!(regions.locate("1", 250).unwrap().gene, "B");
    }

    #[test]
    fn test_bad_gene_region_row() {
        let result = GeneRegions::from_reader("1\tabc\t200\t1\tX\n".as_bytes());
        assert!(matches!(result, Err(VepError::Table { .. })));
    }

    #[test]
    fn test_transcripts_first_wins() {
        let ids = TranscriptIds::from_reader(TRANSCRIPTS.as_bytes()).unwrap();
        assert_eq!(ids.len(), 2);

        let brca1 = ids.resolve("BRCA1").unwrap();
        assert_eq!(brca1.transcript_id, "ENST00000357654");
        assert_eq!(brca1.refseq_id.as_deref(), Some("NM_007294.4"));

        let tp53 = ids.resolve("TP53").unwrap();
        assert_eq!(tp53.refseq_id, None);
        assert!(ids.resolve("BRCA2").is_none());
    }

    #[test]
    fn test_gene_symbol() {
        assert_eq!(gene_symbol("BRCA1;NM_007294"), "BRCA1");
        assert_eq!(gene_symbol(" TP53 |x"), "TP53");
        assert_eq!(gene_symbol("BRCA2"), "BRCA2");
    }
}
