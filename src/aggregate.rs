//! Parallel fetch-retry aggregator.
//!
//! Many small inputs are fetched concurrently on a [`WorkerPool`]. Failed or
//! timed-out fetches are resubmitted as a subset until they succeed or the
//! attempt budget is spent; whatever still fails is reported in one
//! [`Error::Fetch`] naming every locator.
//!
//! ```
//! use recordshift::{Data, FetchConfig, fetch_all};
//! use serde_json::json;
//!
//! let inputs = vec!["a".to_string(), "b".to_string()];
//! let fetched = fetch_all(
//!     &inputs,
//!     |loc: &str| Ok(Data::Records(vec![json!({"from": loc})])),
//!     &FetchConfig::default(),
//! )?;
//! assert_eq!(fetched.into_data()?.len(), 2);
//! # Ok::<(), recordshift::Error>(())
//! ```

use crate::data::Data;
use crate::deserialize::{DeserializeOptions, deserialize};
use crate::error::{Error, Result};
use crate::io::Locator;
use crate::io::cloud::QueryService;
use crate::pool::WorkerPool;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default wait per fetch task.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default attempt budget of every input.
pub const DEFAULT_INPUT_RETRIES: usize = 3;

/// How fetched results are handed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// In (filtered, limited) input order.
    #[default]
    List,
    /// Keyed by locator.
    Map,
}

/// Settings of [`fetch_all`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Regex an input locator must match to be fetched.
    pub filter: Option<String>,
    /// Maximum inputs fetched, counted after filtering.
    pub limit: Option<usize>,
    /// Total attempts per input; zero behaves like one.
    pub input_retries: usize,
    /// Worker threads; `None` means [`crate::pool::default_threads`].
    pub threads: Option<usize>,
    /// Wait per fetch task, in milliseconds.
    pub timeout_ms: u64,
    pub output: OutputShape,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            filter: None,
            limit: None,
            input_retries: DEFAULT_INPUT_RETRIES,
            threads: None,
            timeout_ms: u64::try_from(DEFAULT_FETCH_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            output: OutputShape::List,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_input_retries(mut self, attempts: usize) -> Self {
        self.input_retries = attempts;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputShape) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Inputs that will be fetched, in order.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an invalid filter pattern.
    pub fn select(&self, locators: &[String]) -> Result<Vec<String>> {
        let re = self
            .filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::config(format!("invalid input filter: {e}")))?;
        Ok(locators
            .iter()
            .filter(|l| re.as_ref().is_none_or(|re| re.is_match(l)))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Results of [`fetch_all`] in the requested [`OutputShape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    List(Vec<Data>),
    Map(BTreeMap<String, Data>),
}

impl Fetched {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Fetched::List(items) => items.len(),
            Fetched::Map(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of every result as one record sequence. Documents contribute one
    /// row each. Map results are joined in key order.
    ///
    /// # Errors
    /// Returns [`Error::Type`] if a table cannot be converted to records.
    pub fn into_data(self) -> Result<Data> {
        let parts: Vec<Data> = match self {
            Fetched::List(items) => items,
            Fetched::Map(items) => items.into_values().collect(),
        };
        let mut rows = Vec::new();
        for part in parts {
            match part {
                Data::Document(doc) => rows.push(doc),
                other => rows.extend(other.into_records()?),
            }
        }
        Ok(Data::Records(rows))
    }
}

/// Fetch every selected locator concurrently, retrying failures.
///
/// # Errors
/// Returns [`Error::Config`] for an invalid filter or pool size, and
/// [`Error::Fetch`] naming every locator that failed its last attempt.
pub fn fetch_all<F>(locators: &[String], fetch: F, config: &FetchConfig) -> Result<Fetched>
where
    F: Fn(&str) -> Result<Data> + Send + Sync + 'static,
{
    let selected = config.select(locators)?;
    if selected.is_empty() {
        return Ok(shape(config.output, Vec::new()));
    }

    let pool = WorkerPool::new(config.threads)?;
    let fetch = Arc::new(fetch);
    let timeout = config.timeout();
    let attempts = config.input_retries.max(1);
    let mut results: Vec<Option<Data>> = vec![None; selected.len()];
    let mut pending: Vec<usize> = (0..selected.len()).collect();

    for attempt in 1..=attempts {
        log::info!(
            "fetch attempt {attempt}/{attempts}: {} input(s)",
            pending.len()
        );
        let handles: Vec<_> = pending
            .iter()
            .map(|&i| {
                let fetch = Arc::clone(&fetch);
                let locator = selected[i].clone();
                (i, pool.submit(selected[i].clone(), move || fetch(&locator)))
            })
            .collect();

        let mut failed = Vec::new();
        for (i, handle) in handles {
            match handle.wait(timeout) {
                Ok(data) => results[i] = Some(data),
                Err(e) => {
                    log::warn!("fetch of {} failed on attempt {attempt}: {e}", selected[i]);
                    failed.push(i);
                }
            }
        }
        pending = failed;
        if pending.is_empty() {
            break;
        }
    }

    if !pending.is_empty() {
        return Err(Error::Fetch {
            failed: pending.iter().map(|&i| selected[i].clone()).collect(),
        });
    }
    let fetched = selected
        .into_iter()
        .zip(results)
        .filter_map(|(loc, data)| data.map(|d| (loc, d)))
        .collect();
    Ok(shape(config.output, fetched))
}

fn shape(output: OutputShape, fetched: Vec<(String, Data)>) -> Fetched {
    match output {
        OutputShape::List => Fetched::List(fetched.into_iter().map(|(_, d)| d).collect()),
        OutputShape::Map => Fetched::Map(fetched.into_iter().collect()),
    }
}

/// [`fetch_all`] through the deserializer, every input read with `options`.
///
/// # Errors
/// Returns [`Error::Config`] if a locator cannot be parsed (before anything
/// is fetched), otherwise the same errors as [`fetch_all`].
pub fn deserialize_all(
    locators: &[String],
    options: &DeserializeOptions,
    config: &FetchConfig,
) -> Result<Fetched> {
    for l in locators {
        Locator::parse(l)?;
    }
    let options = options.clone();
    fetch_all(
        locators,
        move |l: &str| deserialize(&Locator::parse(l)?, &options),
        config,
    )
}

/// Run a query on the managed query service; the result bypasses the
/// deserializer.
///
/// # Errors
/// Returns whatever error the service reports.
pub fn run_query(service: &dyn QueryService, query: &str, workgroup: &str) -> Result<Data> {
    log::info!("running query in workgroup {workgroup}");
    service.execute(query, workgroup).map(Data::Table)
}
