//! Performance benchmarks for ferro-vep
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- classify

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferro_vep::cache::AnnotationCache;
use ferro_vep::clinsig::score;
use ferro_vep::extract::AnnotationExtractor;
use ferro_vep::region::{classify, classify_query};
use ferro_vep::variant::VariantKey;
use serde_json::json;

// =============================================================================
// Classification benchmarks
// =============================================================================

fn bench_classify(c: &mut Criterion) {
    let variants = vec![
        ("snv", ("17", 41244936, "G", "A")),
        ("deletion", ("3", 319780, "GAAT", "G")),
        ("insertion", ("19", 110747, "G", "GTTTT")),
        ("chr_prefix", ("chrX", 153296777, "C", "T")),
    ];

    let mut group = c.benchmark_group("classify");
    for (name, (chrom, pos, reference, alternate)) in &variants {
        group.bench_with_input(BenchmarkId::from_parameter(name), name, |b, _| {
            b.iter(|| {
                classify(
                    black_box(chrom),
                    black_box(*pos),
                    black_box(reference),
                    black_box(alternate),
                )
            })
        });
    }
    group.finish();

    let queries = vec![
        ("pseudo_vcf", "1 182712 . A C . . ."),
        ("structural", "1 1000 . N <DUP> . . END=2000"),
        ("rsid", "rs699"),
        ("hgvs", "NM_000088.3:c.459A>G"),
    ];
    let mut group = c.benchmark_group("classify_query");
    for (name, query) in &queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, q| {
            b.iter(|| classify_query(black_box(q)))
        });
    }
    group.finish();
}

// =============================================================================
// Extraction benchmarks
// =============================================================================

fn bench_extract(c: &mut Criterion) {
    let payload = json!([{
        "variant_class": "SNV",
        "seq_region_name": "17",
        "transcript_consequences": [{
            "gene_symbol": "BRCA1",
            "gene_id": "ENSG00000012048",
            "transcript_id": "ENST00000357654",
            "impact": "MODERATE",
            "strand": -1,
            "consequence_terms": ["missense_variant"],
            "exon": "10/23",
            "domains": [{"db": "Pfam"}, {"db": "PANTHER"}, {"db": "MobiDB-lite"}],
            "hgvsc": "ENST00000357654.9:c.3113A>G",
            "hgvsp": "ENSP00000350283.3:p.Glu1038Gly"
        }],
        "colocated_variants": [
            {"id": "COSV58787127", "somatic": 1},
            {"id": "rs16941", "clin_sig_allele": "G:benign;G:likely_benign", "pubmed": [1, 2]}
        ]
    }]);
    let extractor = AnnotationExtractor::default();

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Elements(1));
    group.bench_function("annotate", |b| {
        b.iter(|| extractor.annotate(black_box(&payload), black_box("G")))
    });
    group.bench_function("score", |b| {
        b.iter(|| score(black_box("A:benign;G:pathogenic;G:likely_pathogenic"), black_box("G")))
    });
    group.finish();
}

// =============================================================================
// Cache benchmarks
// =============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut cache = AnnotationCache::new();
    let keys: Vec<VariantKey> = (0..10_000u64)
        .map(|i| VariantKey::new("1", 100_000 + i, "A", "C"))
        .collect();
    for key in &keys {
        if cache.put(key, json!([{"variant_class": "SNV"}])).is_err() {
            return;
        }
    }

    let mut group = c.benchmark_group("cache");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("lookup_10k", |b| {
        b.iter(|| keys.iter().filter(|k| cache.get(black_box(k)).is_some()).count())
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_extract, bench_cache);
criterion_main!(benches);
