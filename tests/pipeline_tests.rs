//! End-to-end tests for the annotation pipeline against a scripted transport

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use ferro_vep::cache::AnnotationCache;
use ferro_vep::config::VepConfig;
use ferro_vep::gateway::{MockReply, MockTransport};
use ferro_vep::lookup::{GeneRegions, TranscriptIds};
use ferro_vep::pipeline::{run_batch, AnnotationPipeline, BatchOptions, RunOutcome, VariantOutcome};
use ferro_vep::table::{VariantTable, WriteOptions};
use ferro_vep::variant::VariantKey;
use ferro_vep::VepError;
use serde_json::{json, Value};
use tempfile::TempDir;

const TABLE: &str = "CHROM\tPOS\tREF\tALT\n\
                     17\t41244936\tG\tA\n\
                     1\t182712\tA\tC\n";

const GENES_GRCH38: &str = "17\t43044295\t43125483\t1\tBRCA1;NM_007294\n";
const TRANSCRIPTS: &str = "BRCA1\tENST00000357654\tNM_007294.4\n";

fn config() -> VepConfig {
    let mut config = VepConfig::default();
    config.endpoints.liftover_url = "http://mock".to_string();
    config.endpoints.vep_url = "http://mock".to_string();
    config.retry.max_attempts = 3;
    config.retry.backoff_base_ms = 0;
    config.retry.jitter = false;
    config
}

fn cached_key() -> VariantKey {
    VariantKey::new("1", 182712, "A", "C")
}

fn cached_payload() -> Value {
    json!([{
        "variant_class": "SNV",
        "seq_region_name": "1",
        "transcript_consequences": [{"gene_symbol": "CACNA1E", "impact": "LOW"}]
    }])
}

fn brca1_payload() -> Value {
    json!([{
        "variant_class": "SNV",
        "seq_region_name": "17",
        "transcript_consequences": [{
            "gene_symbol": "BRCA1",
            "impact": "MODERATE",
            "consequence_terms": ["missense_variant", "splice_region_variant"],
            "domains": [{"db": "Pfam"}, {"db": "PROSITE"}]
        }],
        "colocated_variants": [
            {"id": "COSV58787127", "somatic": 1},
            {"id": "rs80357034", "clin_sig_allele": "A:pathogenic;G:benign", "pubmed": [1, 2, 3]}
        ]
    }])
}

fn mapping(start: u64) -> MockReply {
    MockReply::json(&json!({
        "mappings": [{
            "original": {"seq_region_name": "17", "start": 41244936, "end": 41244936, "assembly": "GRCh37"},
            "mapped": {"seq_region_name": "17", "start": start, "end": start, "assembly": "GRCh38", "strand": 1}
        }]
    }))
}

fn scripted() -> MockTransport {
    let mock = MockTransport::new();
    mock.respond("/map/", mapping(43092919));
    mock.respond("/vep/", MockReply::json(&brca1_payload()));
    mock
}

fn seeded_cache(dir: &Path) -> AnnotationCache {
    let mut cache = AnnotationCache::load(dir.join("cache.json")).unwrap();
    cache.put(&cached_key(), cached_payload()).unwrap();
    cache
}

fn options(output: &Path) -> BatchOptions {
    BatchOptions {
        checkpoint_interval: 1000,
        output: Some(output.to_path_buf()),
        write_options: WriteOptions::default(),
    }
}

fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

fn column(headers: &[String], name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {}", name))
}

#[test]
fn test_batch_fetches_only_uncached_variants() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let mut cache = seeded_cache(dir.path());
    let cache_file = dir.path().join("cache.json");
    assert_eq!(AnnotationCache::load(&cache_file).unwrap().len(), 1);
    let mut table = VariantTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
    let mock = scripted();
    let config = config();

    let summary = {
        let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config)
            .with_gene_regions(GeneRegions::from_reader(GENES_GRCH38.as_bytes()).unwrap())
            .with_transcripts(TranscriptIds::from_reader(TRANSCRIPTS.as_bytes()).unwrap());
        run_batch(
            &mut pipeline,
            &mut table,
            &options(&output),
            &AtomicBool::new(false),
            |_| {},
        )
    };

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.cache_hits, 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.skipped_total(), 0);

    assert_eq!(mock.call_count("/map/"), 1);
    assert_eq!(mock.call_count("/vep/"), 1);
    let vep_url = mock
        .calls()
        .into_iter()
        .find(|url| url.contains("/vep/"))
        .unwrap();
    assert_eq!(
        vep_url,
        "http://mock/vep/human/region/17%3A43092919-43092919%3A1/A\
         ?canonical=1&domains=1&numbers=1&pubmed=1&variant_class=1\
         &transcript_id=ENST00000357654"
    );

    // Keyed by the input (GRCh37) coordinates
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&VariantKey::new("17", 41244936, "G", "A")));
    let on_disk = AnnotationCache::load(&cache_file).unwrap();
    assert_eq!(on_disk.len(), 2);
    assert!(on_disk.contains(&VariantKey::new("17", 41244936, "G", "A")));

    let (headers, rows) = read_output(&output);
    assert_eq!(&headers[..4], &["CHROM", "POS", "REF", "ALT"]);
    assert_eq!(rows.len(), 2);

    let brca1 = &rows[0];
    assert_eq!(brca1[column(&headers, "GENE_SYMBOL")], "BRCA1");
    assert_eq!(
        brca1[column(&headers, "CONSEQUENCE_TERMS")],
        "missense_variant,splice_region_variant"
    );
    assert_eq!(brca1[column(&headers, "DOMAINS_COUNT")], "2");
    assert_eq!(brca1[column(&headers, "ID")], "rs80357034");
    assert_eq!(brca1[column(&headers, "PUBMED_COUNT")], "3");
    assert_eq!(brca1[column(&headers, "CLIN_SIG_CLASS")], "POS");

    let cached = &rows[1];
    assert_eq!(cached[column(&headers, "GENE_SYMBOL")], "CACNA1E");
    assert_eq!(cached[column(&headers, "ID")], "");
    assert_eq!(cached[column(&headers, "CLIN_SIG_CLASS")], "");
}

#[test]
fn test_rerun_is_served_from_cache_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    {
        let mut cache = seeded_cache(dir.path());
        let mock = scripted();
        let config = config();
        let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
        let mut table = VariantTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
        let summary = run_batch(
            &mut pipeline,
            &mut table,
            &options(&output),
            &AtomicBool::new(false),
            |_| {},
        );
        assert_eq!(summary.fetched, 1);
    }

    let mut cache = AnnotationCache::load(dir.path().join("cache.json")).unwrap();
    assert_eq!(cache.len(), 2);

    let mock = MockTransport::new();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
    let mut table = VariantTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();
    let summary = run_batch(
        &mut pipeline,
        &mut table,
        &options(&output),
        &AtomicBool::new(false),
        |_| {},
    );

    assert_eq!(summary.cache_hits, 2);
    assert_eq!(summary.fetched, 0);
    assert!(mock.calls().is_empty());
}

#[test]
fn test_gene_not_found_skips_before_request() {
    let mut cache = AnnotationCache::new();
    let mock = scripted();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config).with_gene_regions(
        GeneRegions::from_reader("17\t1\t1000\t1\tOTHER\n".as_bytes()).unwrap(),
    );

    let outcome = pipeline
        .annotate(&VariantKey::new("17", 41244936, "G", "A"))
        .unwrap();
    assert!(matches!(
        outcome,
        VariantOutcome::Skipped(VepError::GeneNotFound { pos: 43092919, .. })
    ));
    assert_eq!(mock.call_count("/map/"), 1);
    assert_eq!(mock.call_count("/vep/"), 0);
    assert!(pipeline.cache().is_empty());
}

#[test]
fn test_missing_transcript_skips_quietly() {
    let mut cache = AnnotationCache::new();
    let mock = scripted();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config)
        .with_gene_regions(GeneRegions::from_reader(GENES_GRCH38.as_bytes()).unwrap())
        .with_transcripts(TranscriptIds::from_reader("TP53\tENST00000269305\t\n".as_bytes()).unwrap());

    let outcome = pipeline
        .annotate(&VariantKey::new("17", 41244936, "G", "A"))
        .unwrap();
    match outcome {
        VariantOutcome::Skipped(e) => {
            assert!(matches!(e, VepError::TranscriptNotFound { ref gene } if gene == "BRCA1"));
            assert!(!e.is_loud());
        }
        other => panic!("expected skip, got {:?}", other),
    }
    assert_eq!(mock.call_count("/vep/"), 0);
}

#[test]
fn test_without_lookups_requests_without_transcript() {
    let mut cache = AnnotationCache::new();
    let mock = scripted();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);

    let outcome = pipeline
        .annotate(&VariantKey::new("17", 41244936, "G", "A"))
        .unwrap();
    assert!(matches!(outcome, VariantOutcome::Fetched(_)));
    assert!(!mock.calls()[1].contains("transcript_id"));
}

#[test]
fn test_terminal_and_exhausted_requests_are_not_cached() {
    let mut cache = AnnotationCache::new();
    let mock = MockTransport::new();
    mock.respond("/map/", mapping(43092919));
    mock.respond("/vep/", MockReply::status(400));
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);

    let key = VariantKey::new("17", 41244936, "G", "A");
    let outcome = pipeline.annotate(&key).unwrap();
    assert!(matches!(
        outcome,
        VariantOutcome::Skipped(VepError::TerminalRequest { status: 400, .. })
    ));
    assert_eq!(mock.call_count("/vep/"), 1);
    assert!(!pipeline.cache().contains(&key));

    let mock = MockTransport::new();
    mock.respond("/map/", MockReply::network("connection reset"));
    let mut cache = AnnotationCache::new();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
    let outcome = pipeline.annotate(&key).unwrap();
    assert!(matches!(
        outcome,
        VariantOutcome::Skipped(VepError::TransientNetwork { attempts: 3, .. })
    ));
    assert_eq!(mock.call_count("/map/"), 3);
    assert_eq!(mock.call_count("/vep/"), 0);
}

#[test]
fn test_unparseable_rows_are_counted_and_skipped() {
    let table_text = "#CHROM\tPOS\tREF\tALT\n\
                      1\t100\tN\t<DEL>\n\
                      1\tabc\tA\tC\n\
                      1\t182712\tA\tC\n";
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.tsv");
    let mut cache = seeded_cache(dir.path());
    let mock = MockTransport::new();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
    let mut table = VariantTable::from_reader(table_text.as_bytes(), b'\t').unwrap();

    let summary = run_batch(
        &mut pipeline,
        &mut table,
        &options(&output),
        &AtomicBool::new(false),
        |_| {},
    );

    assert!(summary.is_complete());
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.cache_hits, 1);
    assert_eq!(summary.skipped.get("E1001"), Some(&2));
    assert!(mock.calls().is_empty());

    let (_, rows) = read_output(&output);
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_structural_row_is_lifted_and_annotated() {
    let table_text = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
                      7\t100318422\tsv1\tN\t<DUP>\t.\tPASS\tSVTYPE=DUP;END=100321323\n";
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let mut cache = AnnotationCache::new();
    let mock = MockTransport::new();
    mock.respond(
        "/map/",
        MockReply::json(&json!({
            "mappings": [{"mapped": {"seq_region_name": "7", "start": 100721240, "end": 100724140}}]
        })),
    );
    mock.respond(
        "/vep/",
        MockReply::json(&json!([{"variant_class": "duplication", "seq_region_name": "7"}])),
    );
    let config = config();
    let mut table = VariantTable::from_reader(table_text.as_bytes(), b'\t').unwrap();

    let summary = {
        let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
        run_batch(
            &mut pipeline,
            &mut table,
            &options(&output),
            &AtomicBool::new(false),
            |_| {},
        )
    };

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.skipped_total(), 0);
    assert_eq!(
        mock.calls(),
        vec![
            "http://mock/map/human/GRCh37/7:100318423-100321323:1/GRCh38".to_string(),
            "http://mock/vep/human/region/7%3A100721240-100724140%3A1/DUP\
             ?canonical=1&domains=1&numbers=1&pubmed=1&variant_class=1"
                .to_string(),
        ]
    );
    assert!(cache.contains(
        &VariantKey::new("7", 100318422, "N", "<DUP>").with_end(Some(100321323))
    ));

    let (headers, rows) = read_output(&output);
    assert_eq!(rows[0][column(&headers, "ID")], "sv1");
    assert_eq!(rows[0][column(&headers, "VARIANT_CLASS")], "duplication");
}

#[test]
fn test_interrupt_writes_processed_rows_only() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let mut cache = seeded_cache(dir.path());
    let mock = scripted();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
    let mut table = VariantTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();

    let interrupt = AtomicBool::new(false);
    let summary = run_batch(
        &mut pipeline,
        &mut table,
        &options(&output),
        &interrupt,
        |progress| {
            if progress.processed == 1 {
                interrupt.store(true, Ordering::SeqCst);
            }
        },
    );

    assert_eq!(summary.outcome, RunOutcome::Interrupted);
    assert_eq!(summary.processed, 1);
    assert_eq!(mock.call_count("/vep/"), 1);

    let (headers, rows) = read_output(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column(&headers, "POS")], "41244936");
}

#[test]
fn test_checkpoint_snapshot_holds_prefix() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");
    let mut cache = seeded_cache(dir.path());
    let mock = scripted();
    let config = config();
    let mut pipeline = AnnotationPipeline::new(&mut cache, &mock, &config);
    let mut table = VariantTable::from_reader(TABLE.as_bytes(), b'\t').unwrap();

    let mut snapshots = Vec::new();
    let options = BatchOptions {
        checkpoint_interval: 1,
        ..options(&output)
    };
    run_batch(
        &mut pipeline,
        &mut table,
        &options,
        &AtomicBool::new(false),
        |progress| {
            // Checkpoints are written after the callback for the same row
            if progress.processed == 2 {
                snapshots.push(read_output(&output).1.len());
            }
        },
    );

    assert_eq!(snapshots, vec![1]);
    assert_eq!(read_output(&output).1.len(), 2);
}
