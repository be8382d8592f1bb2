//! Thin MARC XML field walker (spec.md treats MARC parsing as an external
//! collaborator; this is the minimal linear walker the rest of the pipeline
//! assumes exists). Walks `<record>` elements with `quick-xml`, preserving
//! subfield occurrence order, and wraps every leaf in a
//! [`bib_core::model::SourcedValue`]. No normalization, no validation — a
//! record with no title or no mms_id is simply skipped with a `tracing::warn`,
//! since that's a data-quality problem for the normalizer to surface, not a
//! parse error.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use bib_core::model::{Agent, CanonicalRecord, Imprint, Language, Note, Subject};
use bib_core::model::SourcedValue;

use crate::error::{IndexError, Result};

const TAG_CONTROL_MMS: &str = "001";
const TAG_CONTROL_FIXED: &str = "008";
const TAG_TITLE: &str = "245";
const TAG_IMPRINT_OLD: &str = "260";
const TAG_IMPRINT_NEW: &str = "264";
const TAG_AGENT_PERSONAL: &str = "100";
const TAG_AGENT_ADDED: &str = "700";
const TAG_SUBJECT: &str = "650";
const TAG_LANGUAGE: &str = "041";
const TAG_NOTE: &str = "500";

/// One raw `<datafield>`/`<controlfield>` as collected off the wire, before
/// it's routed to the right `CanonicalRecord` field by tag.
#[derive(Default, Debug)]
struct RawField {
    tag: String,
    control_value: Option<String>,
    subfields: Vec<(char, String)>,
}

impl RawField {
    fn subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, v)| v.as_str())
    }
}

/// Reads every `<record>` in `source` and returns one [`CanonicalRecord`]
/// per record, in document order. `source_file` and the JSONL line number
/// that will eventually hold each record are caller-supplied; this walker
/// only knows about the MARC XML, not the downstream JSONL serialization.
pub fn read_records<R: BufRead>(source: R, source_file: &str) -> Result<Vec<CanonicalRecord>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut buf = Vec::new();
    let mut records = Vec::new();

    let mut in_record = false;
    let mut fields: Vec<RawField> = Vec::new();
    let mut current: Option<RawField> = None;
    let mut current_subfield_code: Option<char> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_str() {
                    "record" => {
                        in_record = true;
                        fields.clear();
                    }
                    "controlfield" if in_record => {
                        let tag = attr(&e, b"tag").unwrap_or_default();
                        current = Some(RawField {
                            tag,
                            ..Default::default()
                        });
                        text_buf.clear();
                    }
                    "datafield" if in_record => {
                        let tag = attr(&e, b"tag").unwrap_or_default();
                        current = Some(RawField {
                            tag,
                            ..Default::default()
                        });
                    }
                    "subfield" if in_record => {
                        current_subfield_code = attr(&e, b"code").and_then(|s| s.chars().next());
                        text_buf.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                text_buf.push_str(&t.unescape()?);
            }
            Event::End(e) => {
                let local = local_name(e.name().as_ref());
                match local.as_str() {
                    "controlfield" => {
                        if let Some(mut f) = current.take() {
                            f.control_value = Some(std::mem::take(&mut text_buf));
                            fields.push(f);
                        }
                    }
                    "subfield" => {
                        if let (Some(code), Some(f)) = (current_subfield_code.take(), current.as_mut()) {
                            f.subfields.push((code, std::mem::take(&mut text_buf)));
                        }
                    }
                    "datafield" => {
                        if let Some(f) = current.take() {
                            fields.push(f);
                        }
                    }
                    "record" => {
                        in_record = false;
                        match build_record(&fields, source_file) {
                            Some(r) => records.push(r),
                            None => tracing::warn!(
                                source_file,
                                "skipping MARC record with no mms_id/title"
                            ),
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

fn local_name(qname: &[u8]) -> String {
    let s = std::str::from_utf8(qname).unwrap_or("");
    s.rsplit(':').next().unwrap_or(s).to_string()
}

fn attr(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == key {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn build_record(fields: &[RawField], source_file: &str) -> Option<CanonicalRecord> {
    let mut occurrence: HashMap<&str, u32> = HashMap::new();

    let mms_id = fields
        .iter()
        .find(|f| f.tag == TAG_CONTROL_MMS)
        .and_then(|f| f.control_value.clone())?;

    let title_field = fields.iter().find(|f| f.tag == TAG_TITLE)?;
    let n = bump(&mut occurrence, TAG_TITLE);
    let title = SourcedValue::new(
        title_field.subfield('a').unwrap_or("").to_string(),
        format!("{TAG_TITLE}[{n}]$a"),
    );

    let mut imprints = Vec::new();
    for tag in [TAG_IMPRINT_OLD, TAG_IMPRINT_NEW] {
        for f in fields.iter().filter(|f| f.tag == tag) {
            let n = bump(&mut occurrence, tag);
            imprints.push(Imprint {
                place: SourcedValue::new(
                    f.subfield('a').unwrap_or("").to_string(),
                    format!("{tag}[{n}]$a"),
                ),
                publisher: SourcedValue::new(
                    f.subfield('b').unwrap_or("").to_string(),
                    format!("{tag}[{n}]$b"),
                ),
                date: SourcedValue::new(
                    f.subfield('c').unwrap_or("").to_string(),
                    format!("{tag}[{n}]$c"),
                ),
            });
        }
    }

    let mut agents = Vec::new();
    for tag in [TAG_AGENT_PERSONAL, TAG_AGENT_ADDED] {
        for f in fields.iter().filter(|f| f.tag == tag) {
            let n = bump(&mut occurrence, tag);
            if let Some(name) = f.subfield('a') {
                agents.push(Agent {
                    name: SourcedValue::new(name.to_string(), format!("{tag}[{n}]$a")),
                    role: f
                        .subfield('e')
                        .map(|r| SourcedValue::new(r.to_string(), format!("{tag}[{n}]$e"))),
                });
            }
        }
    }

    let mut subjects = Vec::new();
    for f in fields.iter().filter(|f| f.tag == TAG_SUBJECT) {
        let n = bump(&mut occurrence, TAG_SUBJECT);
        if let Some(heading) = f.subfield('a') {
            subjects.push(Subject {
                heading: SourcedValue::new(heading.to_string(), format!("{TAG_SUBJECT}[{n}]$a")),
            });
        }
    }

    let mut languages = Vec::new();
    for f in fields.iter().filter(|f| f.tag == TAG_LANGUAGE) {
        let n = bump(&mut occurrence, TAG_LANGUAGE);
        if let Some(code) = f.subfield('a') {
            languages.push(Language {
                code: SourcedValue::new(code.to_string(), format!("{TAG_LANGUAGE}[{n}]$a")),
            });
        }
    }
    if languages.is_empty() {
        if let Some(f) = fields.iter().find(|f| f.tag == TAG_CONTROL_FIXED) {
            if let Some(fixed) = &f.control_value {
                if fixed.len() >= 38 {
                    let code = fixed[35..38].to_string();
                    let n = bump(&mut occurrence, TAG_CONTROL_FIXED);
                    languages.push(Language {
                        code: SourcedValue::new(code, format!("{TAG_CONTROL_FIXED}[{n}]")),
                    });
                }
            }
        }
    }

    let mut notes = Vec::new();
    for f in fields.iter().filter(|f| f.tag == TAG_NOTE) {
        let n = bump(&mut occurrence, TAG_NOTE);
        if let Some(text) = f.subfield('a') {
            notes.push(Note {
                text: SourcedValue::new(text.to_string(), format!("{TAG_NOTE}[{n}]$a")),
            });
        }
    }

    Some(CanonicalRecord {
        mms_id,
        source_file: source_file.to_string(),
        jsonl_line_number: 0,
        title,
        imprints,
        agents,
        subjects,
        languages,
        notes,
    })
}

fn bump<'a>(occurrence: &mut HashMap<&'a str, u32>, tag: &'a str) -> u32 {
    let e = occurrence.entry(tag).or_insert(0);
    *e += 1;
    *e
}

impl From<quick_xml::Error> for IndexError {
    fn from(e: quick_xml::Error) -> Self {
        IndexError::MarcParse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for IndexError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        IndexError::MarcParse(e.to_string())
    }
}
