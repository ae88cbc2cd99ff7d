//! Liftover of input coordinates from GRCh37 to GRCh38.
//!
//! Input tables are on GRCh37 while the annotation service is queried on
//! GRCh38. Mapping is delegated to the remote `/map` endpoint:
//!
//! ```text
//! GET {base}/map/{species}/GRCh37/{chrom}:{start}-{end}:1/GRCh38
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ferro_vep::gateway::{ReqwestTransport, RetryPolicy, RetryingGateway};
//! use ferro_vep::liftover::LiftoverClient;
//! use ferro_vep::region::classify;
//!
//! let transport = ReqwestTransport::new(Duration::from_secs(30), "ferro-vep").unwrap();
//! let gateway = RetryingGateway::new(transport, RetryPolicy::default());
//! let client = LiftoverClient::new(gateway, "https://rest.ensembl.org", "human");
//!
//! let grch37 = classify("17", 41244936, "G", "A").unwrap();
//! if let Some(grch38) = client.lift(&grch37, "G", "A", "17") {
//!     println!("Lifted to {}", grch38.value);
//! }
//! ```

mod client;

pub use client::{
    LiftedVariant, LiftoverClient, MapResponse, MappedRegion, Mapping, SOURCE_ASSEMBLY,
    TARGET_ASSEMBLY,
};
