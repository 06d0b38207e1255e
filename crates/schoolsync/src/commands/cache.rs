//! Cache command handlers.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use schoolsync_core::{FileCache, LocalCache};

use crate::cli::{CacheArgs, CacheCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const FIELDS_WIDTH: usize = 72;

// ── Cached collection summary ───────────────────────────────────────

/// One cached snapshot, as listed by `cache list`.
#[derive(Debug, Serialize)]
struct CacheEntry {
    collection: String,
    key: String,
    /// `None` when the stored value is not a JSON array.
    records: Option<usize>,
}

#[derive(Tabled)]
struct CacheEntryRow {
    #[tabled(rename = "Collection")]
    collection: String,
    #[tabled(rename = "Records")]
    records: String,
    #[tabled(rename = "Key")]
    key: String,
}

impl From<&CacheEntry> for CacheEntryRow {
    fn from(e: &CacheEntry) -> Self {
        Self {
            collection: e.collection.clone(),
            records: e.records.map_or_else(|| "?".into(), |n| n.to_string()),
            key: e.key.clone(),
        }
    }
}

// ── Cached record ───────────────────────────────────────────────────

#[derive(Tabled)]
struct CachedRecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Fields")]
    fields: String,
}

impl From<&Value> for CachedRecordRow {
    fn from(v: &Value) -> Self {
        let fields = match v {
            Value::Object(map) => {
                let mut rest = map.clone();
                rest.remove("id");
                output::render_json_compact(&rest)
            }
            other => output::render_json_compact(other),
        };
        Self {
            id: record_id(v),
            fields: truncate(&fields, FIELDS_WIDTH),
        }
    }
}

fn record_id(v: &Value) -> String {
    match v.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: CacheArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let dir = config::resolve_cache_dir(global, cfg);
    let cache = FileCache::open(&dir).await?;
    let prefix = cfg.sync.cache_key_prefix.as_str();
    tracing::debug!(dir = %dir.display(), prefix, "using cache directory");

    match args.command {
        CacheCommand::List => {
            let mut entries = Vec::new();
            for key in cache.keys().await? {
                let Some(collection) = key.strip_prefix(prefix) else {
                    continue;
                };
                let records = cache
                    .get(&key)
                    .await?
                    .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
                    .map(|items| items.len());
                entries.push(CacheEntry {
                    collection: collection.to_owned(),
                    key: key.clone(),
                    records,
                });
            }

            let out = output::render_list(
                &global.output,
                &entries,
                |e| CacheEntryRow::from(e),
                |e| e.collection.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CacheCommand::Show { collection } => {
            let key = format!("{prefix}{collection}");
            let raw = cache.get(&key).await?.ok_or_else(|| not_cached(&collection))?;
            let records: Vec<Value> = serde_json::from_str(&raw)?;

            let out = output::render_list(
                &global.output,
                &records,
                |r| CachedRecordRow::from(r),
                record_id,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CacheCommand::Clear { collection } => {
            let keys: Vec<String> = match collection {
                Some(collection) => {
                    let key = format!("{prefix}{collection}");
                    if cache.get(&key).await?.is_none() {
                        return Err(not_cached(&collection));
                    }
                    vec![key]
                }
                None => cache
                    .keys()
                    .await?
                    .into_iter()
                    .filter(|k| k.starts_with(prefix))
                    .collect(),
            };

            for key in &keys {
                cache.remove(key).await?;
            }
            tracing::info!(removed = keys.len(), "cleared cache entries");
            if !global.quiet {
                eprintln!("✓ Cleared {} cached collection(s)", keys.len());
            }
            Ok(())
        }
    }
}

fn not_cached(collection: &str) -> CliError {
    CliError::NotFound {
        resource_type: "cached collection".into(),
        identifier: collection.into(),
        list_command: "cache list".into(),
    }
}
