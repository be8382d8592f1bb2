pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment_cache (
    entity_type TEXT NOT NULL,
    normalized_key TEXT NOT NULL,
    result TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    PRIMARY KEY (entity_type, normalized_key)
);

CREATE INDEX IF NOT EXISTS idx_enrichment_cache_expires_at ON enrichment_cache (expires_at);

CREATE TABLE IF NOT EXISTS enrichment_jobs (
    job_id TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    entity_value TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    claimed_at TEXT,
    completed_at TEXT,
    last_error TEXT
);

CREATE INDEX IF NOT EXISTS idx_enrichment_jobs_status ON enrichment_jobs (status);
"#;
