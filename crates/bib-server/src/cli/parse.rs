//! `parse <marc-xml> <out.jsonl>` (spec.md §6.2) — walks MARC XML into
//! canonical JSONL via [`bib_index::marc::read_records`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use super::{CliError, CliResult};

pub fn run(marc_xml: &str, out_jsonl: &str) -> CliResult {
    let source = BufReader::new(File::open(marc_xml)?);
    let records = bib_index::marc::read_records(source, marc_xml)
        .map_err(|e| CliError::Validation(e.to_string()))?;

    let mut out = BufWriter::new(File::create(out_jsonl)?);
    for record in &records {
        let line = serde_json::to_string(record).map_err(|e| CliError::Other(e.into()))?;
        writeln!(out, "{line}")?;
    }
    out.flush()?;

    println!("wrote {} record(s) to {out_jsonl}", records.len());
    Ok(())
}
