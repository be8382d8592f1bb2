//! `normalize <in.jsonl> <out.jsonl> [--place-alias FILE]` (spec.md §6.2,
//! module N). `bib_core::normalizer` exposes only pure per-field functions
//! (spec.md §4.1) — this is the orchestration that assembles a whole
//! [`EnrichedRecord`]'s `m2` object from them, one imprint at a time,
//! index-aligned with `record.imprints` per spec.md §3.1.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use bib_core::model::{EnrichedRecord, ImprintNorm, M2};
use bib_core::normalizer::{normalize_date, normalize_place, normalize_publisher, AliasMap};

use super::{CliError, CliResult};

pub fn run(in_jsonl: &str, out_jsonl: &str, place_alias: Option<&str>) -> CliResult {
    let aliases = match place_alias {
        Some(path) => {
            AliasMap::load_from_file(Path::new(path)).map_err(|e| CliError::Validation(e.to_string()))?
        }
        None => AliasMap::empty(),
    };

    let input = BufReader::new(File::open(in_jsonl)?);
    let mut out = BufWriter::new(File::create(out_jsonl)?);
    let mut count = 0usize;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: bib_core::model::CanonicalRecord =
            serde_json::from_str(&line).map_err(|e| CliError::Validation(e.to_string()))?;

        let imprints_norm = record
            .imprints
            .iter()
            .map(|imprint| ImprintNorm {
                date_norm: normalize_date(Some(&imprint.date.value), vec![imprint.date.source_path.clone()]),
                place_norm: normalize_place(
                    Some(&imprint.place.value),
                    &aliases,
                    vec![imprint.place.source_path.clone()],
                ),
                publisher_norm: normalize_publisher(
                    Some(&imprint.publisher.value),
                    &aliases,
                    vec![imprint.publisher.source_path.clone()],
                ),
            })
            .collect();

        let enriched = EnrichedRecord { record, m2: M2 { imprints_norm } };
        let line = serde_json::to_string(&enriched).map_err(|e| CliError::Other(e.into()))?;
        writeln!(out, "{line}")?;
        count += 1;
    }
    out.flush()?;

    println!("normalized {count} record(s) to {out_jsonl}");
    Ok(())
}
