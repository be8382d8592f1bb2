//! DDL for the relational index. Every table/column name here must match a
//! constant in `bib_core::schema` exactly — `assert_contract_matches_live_schema`
//! is the mandatory startup check that this file doesn't silently drift.

pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    record_id       TEXT PRIMARY KEY,
    mms_id          TEXT NOT NULL UNIQUE,
    source_file     TEXT NOT NULL,
    schema_version  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS titles (
    record_id          TEXT NOT NULL REFERENCES records(record_id),
    title              TEXT NOT NULL,
    title_raw          TEXT NOT NULL,
    title_source_path  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_titles_record_id ON titles(record_id);

CREATE TABLE IF NOT EXISTS imprints (
    record_id               TEXT NOT NULL REFERENCES records(record_id),
    occurrence              INTEGER NOT NULL,
    date_raw                TEXT NOT NULL,
    date_start              INTEGER,
    date_end                INTEGER,
    date_confidence         REAL NOT NULL,
    date_method             TEXT NOT NULL,
    date_source_path        TEXT NOT NULL,
    place_raw               TEXT NOT NULL,
    place_norm              TEXT,
    place_confidence        REAL NOT NULL,
    place_method            TEXT NOT NULL,
    place_source_path       TEXT NOT NULL,
    publisher_raw           TEXT NOT NULL,
    publisher_norm          TEXT,
    publisher_confidence    REAL NOT NULL,
    publisher_method        TEXT NOT NULL,
    publisher_source_path   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_imprints_record_id ON imprints(record_id);
CREATE INDEX IF NOT EXISTS idx_imprints_date_range ON imprints(date_start, date_end);
CREATE INDEX IF NOT EXISTS idx_imprints_place_norm ON imprints(place_norm);
CREATE INDEX IF NOT EXISTS idx_imprints_publisher_norm ON imprints(publisher_norm);

CREATE TABLE IF NOT EXISTS agents (
    record_id          TEXT NOT NULL REFERENCES records(record_id),
    occurrence         INTEGER NOT NULL,
    agent_raw          TEXT NOT NULL,
    agent_norm         TEXT,
    agent_source_path  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agents_record_id ON agents(record_id);
CREATE INDEX IF NOT EXISTS idx_agents_agent_norm ON agents(agent_norm);

CREATE TABLE IF NOT EXISTS subjects (
    record_id            TEXT NOT NULL REFERENCES records(record_id),
    occurrence           INTEGER NOT NULL,
    subject_raw          TEXT NOT NULL,
    subject_norm         TEXT,
    subject_source_path  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_subjects_record_id ON subjects(record_id);
CREATE INDEX IF NOT EXISTS idx_subjects_subject_norm ON subjects(subject_norm);

CREATE TABLE IF NOT EXISTS languages (
    record_id             TEXT NOT NULL REFERENCES records(record_id),
    occurrence            INTEGER NOT NULL,
    language_code         TEXT NOT NULL,
    language_source_path  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_languages_record_id ON languages(record_id);

CREATE TABLE IF NOT EXISTS notes (
    record_id          TEXT NOT NULL REFERENCES records(record_id),
    occurrence         INTEGER NOT NULL,
    note_text          TEXT NOT NULL,
    note_source_path   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_record_id ON notes(record_id);

CREATE VIRTUAL TABLE IF NOT EXISTS titles_fts USING fts5(
    title, record_id UNINDEXED, content=''
);

CREATE VIRTUAL TABLE IF NOT EXISTS subjects_fts USING fts5(
    subject, record_id UNINDEXED, content=''
);
"#;
