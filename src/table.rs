//! Delimited variant tables.
//!
//! The input is a table produced by VCF ingestion with at least the columns
//! `CHROM`, `POS`, `REF` and `ALT` (a leading `#` on `CHROM` is accepted).
//! Symbolic structural alleles take their END from an `END` column, else
//! from `END=` in an `INFO` column.
//!
//! Rows keep their original order. Annotation records are merged per row
//! and written back as extra columns after the input columns. Input cells
//! are never replaced: an annotation column whose name is already taken is
//! written under [`COLLISION_PREFIX`].

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::error::VepError;
use crate::extract::{cell_text, AnnotationRecord};
use crate::variant::{info_end, VariantKey};

/// Columns every input table must carry
pub const REQUIRED_COLUMNS: [&str; 4] = ["CHROM", "POS", "REF", "ALT"];

/// Prepended to annotation column names that clash with existing columns
pub const COLLISION_PREFIX: &str = "VEP_";

/// Open a file for reading, decompressing `.gz` transparently.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, VepError> {
    let file = File::open(path).map_err(|e| VepError::Io {
        msg: format!("Failed to open {}: {}", path.display(), e),
    })?;

    let reader: Box<dyn BufRead> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Delimiter implied by a file name: tab for `.tsv`/`.txt`/`.vcf`, else comma.
pub fn delimiter_for_path(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") || name.ends_with(".txt") || name.ends_with(".vcf") {
        b'\t'
    } else {
        b','
    }
}

/// How annotation columns are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub delimiter: u8,
    /// Uppercase annotation column names
    pub uppercase_columns: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            uppercase_columns: true,
        }
    }
}

/// An input table with per-row annotations
#[derive(Debug, Clone)]
pub struct VariantTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    chrom_idx: usize,
    pos_idx: usize,
    ref_idx: usize,
    alt_idx: usize,
    end_idx: Option<usize>,
    info_idx: Option<usize>,
    annotation_columns: Vec<String>,
    annotations: Vec<Option<AnnotationRecord>>,
}

impl VariantTable {
    /// Read a table from a file.
    pub fn read(path: &Path, delimiter: u8) -> Result<Self, VepError> {
        let reader = open_input(path)?;
        Self::from_reader(reader, delimiter).map_err(|e| match e {
            VepError::Table { msg } => VepError::Table {
                msg: format!("{}: {}", path.display(), msg),
            },
            other => other,
        })
    }

    /// Read a table from any reader; the first row is the header.
    pub fn from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Self, VepError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('#').eq_ignore_ascii_case(name))
        };
        let column = |name: &str| -> Result<usize, VepError> {
            find(name).ok_or_else(|| VepError::Table {
                msg: format!("Missing required column {}", name),
            })
        };
        let chrom_idx = column(REQUIRED_COLUMNS[0])?;
        let pos_idx = column(REQUIRED_COLUMNS[1])?;
        let ref_idx = column(REQUIRED_COLUMNS[2])?;
        let alt_idx = column(REQUIRED_COLUMNS[3])?;
        let end_idx = find("END");
        let info_idx = find("INFO");

        let rows = csv_reader
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()?;
        let annotations = vec![None; rows.len()];

        Ok(Self {
            headers,
            rows,
            chrom_idx,
            pos_idx,
            ref_idx,
            alt_idx,
            end_idx,
            info_idx,
            annotation_columns: Vec::new(),
            annotations,
        })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Input column names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw cell text.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Variant key for a row.
    ///
    /// A row with a non-integer `POS` is unparseable; this is a per-variant
    /// failure, not a table error.
    pub fn key(&self, row: usize) -> Result<VariantKey, VepError> {
        let record = self.rows.get(row).ok_or_else(|| VepError::Table {
            msg: format!("Row {} out of range ({} rows)", row, self.rows.len()),
        })?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let chrom = field(self.chrom_idx);
        let pos_text = field(self.pos_idx);
        let reference = field(self.ref_idx);
        let alternate = field(self.alt_idx);

        let pos = pos_text.parse::<u64>().map_err(|_| {
            VepError::unparseable(
                format!("{} {} . {} {} . . .", chrom, pos_text, reference, alternate),
                format!("invalid position '{}'", pos_text),
            )
        })?;

        let end = self
            .end_idx
            .and_then(|idx| field(idx).parse::<u64>().ok())
            .or_else(|| self.info_idx.and_then(|idx| info_end(field(idx))));
        Ok(VariantKey::new(chrom, pos, reference, alternate).with_end(end))
    }

    /// Set the annotation fields written for every row, in order.
    pub fn set_annotation_columns(&mut self, columns: Vec<String>) {
        self.annotation_columns = columns;
    }

    pub fn annotation_columns(&self) -> &[String] {
        &self.annotation_columns
    }

    /// Attach an annotation record to a row.
    ///
    /// Fields not yet listed in the annotation columns are appended to them.
    pub fn merge(&mut self, row: usize, record: AnnotationRecord) {
        if row >= self.annotations.len() {
            return;
        }
        for column in record.columns() {
            if !self.annotation_columns.iter().any(|c| c == column) {
                self.annotation_columns.push(column.to_string());
            }
        }
        self.annotations[row] = Some(record);
    }

    pub fn annotation(&self, row: usize) -> Option<&AnnotationRecord> {
        self.annotations.get(row)?.as_ref()
    }

    /// Number of rows carrying an annotation
    pub fn annotated(&self) -> usize {
        self.annotations.iter().filter(|a| a.is_some()).count()
    }

    /// Output header row: input headers, then annotation columns.
    ///
    /// Annotation columns are always appended. A name already in use gets
    /// [`COLLISION_PREFIX`] until it is unique.
    pub fn output_headers(&self, options: &WriteOptions) -> Vec<String> {
        let mut headers = self.headers.clone();
        for column in &self.annotation_columns {
            let mut name = if options.uppercase_columns {
                column.to_uppercase()
            } else {
                column.clone()
            };
            while headers.iter().any(|h| h.trim_start_matches('#') == name) {
                name = format!("{}{}", COLLISION_PREFIX, name);
            }
            headers.push(name);
        }
        headers
    }

    /// Write the first `limit` rows (all rows if `None`) to `writer`.
    pub fn write_to<W: Write>(
        &self,
        writer: W,
        options: &WriteOptions,
        limit: Option<usize>,
    ) -> Result<(), VepError> {
        let headers = self.output_headers(options);
        let mut csv_writer = WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);
        csv_writer.write_record(&headers)?;

        let count = limit.unwrap_or(self.rows.len()).min(self.rows.len());
        for (record, annotation) in self.rows.iter().zip(&self.annotations).take(count) {
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(self.headers.len(), String::new());

            cells.extend(self.annotation_columns.iter().map(|column| {
                annotation
                    .as_ref()
                    .and_then(|a| a.get(column))
                    .map(cell_text)
                    .unwrap_or_default()
            }));
            csv_writer.write_record(&cells)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write the first `limit` rows to `path`, replacing it atomically.
    pub fn write(
        &self,
        path: &Path,
        options: &WriteOptions,
        limit: Option<usize>,
    ) -> Result<(), VepError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        self.write_to(temp.as_file_mut(), options, limit)?;
        temp.persist(path).map_err(|e| VepError::Io {
            msg: format!("Failed to write {}: {}", path.display(), e),
        })?;
        Ok(())
    }
}
