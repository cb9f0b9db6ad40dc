//! Time-based response cache keyed by (ticker, period), mirrored to a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Context, Result};

use super::bars::{Bar, InfoMap, PriceSeries};
use super::clock::seconds_between;
use super::period::Period;

/// Entries younger than this are served without touching the network.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub series: PriceSeries,
    pub info: InfoMap,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.created_at, now)
    }
}

/// Validity rule: strictly younger than the TTL. The boundary itself is stale.
pub fn is_fresh(now: DateTime<Utc>, created_at: DateTime<Utc>, ttl: Duration) -> bool {
    seconds_between(created_at, now) < ttl.as_secs_f64()
}

pub fn cache_key(ticker: &str, period: Period) -> String {
    format!("{}_{}", normalize_ticker(ticker), period.code())
}

pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Durable per-key record.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    data: Vec<Bar>,
    #[serde(default)]
    info: InfoMap,
    timestamp: f64,
}

impl CacheRecord {
    fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            data: entry.series.bars().to_vec(),
            info: entry.info.clone(),
            timestamp: entry.created_at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }

    fn into_entry(self) -> Option<CacheEntry> {
        let micros = (self.timestamp * 1_000_000.0).round() as i64;
        let created_at = DateTime::from_timestamp(
            micros.div_euclid(1_000_000),
            (micros.rem_euclid(1_000_000) * 1_000) as u32,
        )?;
        Some(CacheEntry {
            series: PriceSeries::new(self.data),
            info: self.info,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub key: String,
    pub bars: usize,
    pub age_secs: f64,
    pub fresh: bool,
}

/// At most one entry per key; stale entries stay until the next successful
/// fetch replaces them.
#[derive(Debug)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    ttl: Duration,
    entries: BTreeMap<String, CacheEntry>,
}

impl ResponseCache {
    /// Cache without a durable copy.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ttl: CACHE_TTL,
            entries: BTreeMap::new(),
        }
    }

    /// Read the durable copy once. A missing file starts empty; unreadable
    /// records are skipped.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => parse_records(&contents, &path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read cache file {}", path.display()))?
            }
        };

        log::debug!(
            "Loaded {} cache entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path),
            ttl: CACHE_TTL,
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh entry for the key, if any. Never blocks and never fails.
    pub fn lookup(&self, ticker: &str, period: Period, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries
            .get(&cache_key(ticker, period))
            .filter(|entry| is_fresh(now, entry.created_at, self.ttl))
    }

    /// Overwrite the key with a new entry stamped `now` and persist synchronously.
    /// The in-memory entry is kept even if persisting fails.
    pub fn store(
        &mut self,
        ticker: &str,
        period: Period,
        series: PriceSeries,
        info: InfoMap,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = CacheEntry {
            series,
            info,
            created_at: now,
        };
        self.entries.insert(cache_key(ticker, period), entry);
        self.persist()
    }

    pub fn status(&self, now: DateTime<Utc>) -> Vec<CacheStatus> {
        self.entries
            .iter()
            .map(|(key, entry)| CacheStatus {
                key: key.clone(),
                bars: entry.series.len(),
                age_secs: entry.age_secs(now),
                fresh: is_fresh(now, entry.created_at, self.ttl),
            })
            .collect()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let records: BTreeMap<&str, CacheRecord> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), CacheRecord::from_entry(entry)))
            .collect();

        let json = serde_json::to_string_pretty(&records).context("Failed to serialize cache")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory {}", parent.display())
            })?;
        }

        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create cache file {}", path.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }
}

fn parse_records(contents: &str, path: &Path) -> BTreeMap<String, CacheEntry> {
    let raw: BTreeMap<String, Value> = match serde_json::from_str(contents) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!(
                "Ignoring unreadable cache file {}: {}",
                path.display(),
                err
            );
            return BTreeMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(key, value)| {
            let entry = serde_json::from_value::<CacheRecord>(value)
                .ok()
                .and_then(CacheRecord::into_entry);
            if entry.is_none() {
                log::warn!("Skipping malformed cache record `{}`", key);
            }
            entry.map(|entry| (key, entry))
        })
        .collect()
}
