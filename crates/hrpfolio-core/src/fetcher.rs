//! Cache-aware, rate-limited acquisition of aligned close series.
//!
//! The fetcher resolves a requested symbol set to an inner-joined close
//! matrix. Per symbol it consults the cache, collapses concurrent refreshes
//! of the same key into a single upstream call whose outcome (success or
//! failure) every waiter adopts, paces network egress through the shared
//! [`CallPacer`], and falls back to a stale cached entry when a refresh
//! fails. Per-symbol failures become [`Exclusion`] records; the request as a
//! whole fails only when fewer than two symbols survive.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheLookup, CacheStore};
use crate::config::AnalyticsConfig;
use crate::data_source::{MarketDataSource, SeriesRequest, SourceError, SourceErrorKind};
use crate::throttling::CallPacer;
use crate::{
    AnalyticsError, ErrorKind, Exclusion, Interval, Symbol, TimeSeries, UtcDateTime,
};

/// One successfully resolved series, possibly served stale from cache.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub symbol: Symbol,
    pub series: TimeSeries,
    pub stale: bool,
}

/// Close matrix over the timestamps present in every surviving series.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    pub interval: Interval,
    pub symbols: Vec<Symbol>,
    /// Parallel to `symbols`: whether the series was served from a stale
    /// cache entry after a failed refresh.
    pub stale: Vec<bool>,
    pub timestamps: Vec<UtcDateTime>,
    /// Row per symbol, parallel to `symbols`; each row parallels `timestamps`.
    pub closes: Vec<Vec<f64>>,
}

impl AlignedSeries {
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn observations(&self) -> usize {
        self.timestamps.len()
    }
}

/// Shared, cheaply-cloneable fetch service.
#[derive(Clone)]
pub struct DataFetcher {
    source: Arc<dyn MarketDataSource>,
    cache: CacheStore<TimeSeries>,
    pacer: CallPacer,
    /// Most recent failed refresh per key, so waiters on the single-flight
    /// guard adopt the outcome instead of repeating the retry schedule.
    failures: Arc<Mutex<HashMap<CacheKey, (Instant, SourceError)>>>,
    config: AnalyticsConfig,
}

impl DataFetcher {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        config: AnalyticsConfig,
    ) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let cache = CacheStore::new(config.cache_ttls);
        let pacer = CallPacer::new(config.min_call_spacing);
        Ok(Self {
            source,
            cache,
            pacer,
            failures: Arc::new(Mutex::new(HashMap::new())),
            config,
        })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore<TimeSeries> {
        &self.cache
    }

    /// Resolve `symbols` to an aligned close matrix.
    ///
    /// Invalid symbols, upstream failures without a cached fallback, and
    /// symbols with too few observations are excluded rather than failing the
    /// batch. Fewer than 2 survivors fails the request with
    /// `insufficient_data`.
    pub async fn fetch_aligned(
        &self,
        symbols: &[String],
        interval: Interval,
        lookback: u32,
    ) -> Result<(AlignedSeries, Vec<Exclusion>), AnalyticsError> {
        // A lookback below 2 can never yield a usable return series, so the
        // request is rejected up front as a data problem, not a config one.
        if lookback < 2 {
            return Err(AnalyticsError::insufficient_data(format!(
                "lookback of {lookback} cannot produce any returns"
            )));
        }

        let mut exclusions = Vec::new();
        let mut requests = Vec::new();
        let mut seen = HashSet::new();

        for raw in symbols {
            match Symbol::parse(raw) {
                Ok(symbol) => {
                    if seen.insert(symbol.clone()) {
                        requests.push(
                            SeriesRequest::new(symbol, interval, lookback)
                                .map_err(|err| AnalyticsError::insufficient_data(err.to_string()))?,
                        );
                    }
                }
                Err(err) => {
                    warn!(input = raw.as_str(), %err, "rejecting invalid symbol");
                    exclusions.push(Exclusion::new(
                        raw.clone(),
                        ErrorKind::InvalidSymbol,
                        err.to_string(),
                    ));
                }
            }
        }

        let order: Vec<Symbol> = requests.iter().map(|r| r.symbol.clone()).collect();
        let mut pending: HashSet<Symbol> = order.iter().cloned().collect();

        let mut join_set = JoinSet::new();
        for request in requests {
            let fetcher = self.clone();
            join_set.spawn(async move {
                let symbol = request.symbol.clone();
                let outcome = fetcher.fetch_series(request).await;
                (symbol, outcome)
            });
        }

        let deadline = Instant::now() + self.config.request_deadline;
        let mut fetched: HashMap<Symbol, FetchedSeries> = HashMap::new();
        let mut timed_out = false;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, join_set.join_next()).await {
                Ok(Some(Ok((symbol, outcome)))) => {
                    pending.remove(&symbol);
                    match outcome {
                        Ok(series) => {
                            fetched.insert(symbol, series);
                        }
                        Err(exclusion) => exclusions.push(exclusion),
                    }
                }
                Ok(Some(Err(join_err))) => {
                    warn!(%join_err, "fetch task failed");
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    join_set.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        // Symbols still pending either hit the deadline or lost their task.
        let pending_detail = if timed_out {
            "fetch did not complete before the request deadline"
        } else {
            "fetch task terminated without producing a result"
        };
        for symbol in order.iter().filter(|s| pending.contains(*s)) {
            if !fetched.contains_key(symbol) {
                exclusions.push(Exclusion::new(
                    symbol.clone(),
                    ErrorKind::UpstreamUnavailable,
                    pending_detail,
                ));
            }
        }

        let resolved: Vec<FetchedSeries> = order
            .into_iter()
            .filter_map(|symbol| fetched.remove(&symbol))
            .collect();

        let aligned = self.align(resolved, interval, &mut exclusions);

        if aligned.symbol_count() < 2 {
            return Err(AnalyticsError::insufficient_data(format!(
                "fewer than 2 symbols survived exclusion ({} remaining)",
                aligned.symbol_count()
            )));
        }

        Ok((aligned, exclusions))
    }

    /// Resolve one series, going through cache, single-flight, pacer, retry,
    /// and stale fallback in that order.
    ///
    /// Waiters on the single-flight guard adopt whatever the holder's fetch
    /// produced: a success through the refreshed cache entry, a failure
    /// through the per-key failure record. Neither path issues a second
    /// upstream call.
    async fn fetch_series(&self, request: SeriesRequest) -> Result<FetchedSeries, Exclusion> {
        let symbol = request.symbol.clone();
        let key = CacheKey::historical(symbol.clone(), request.interval, request.lookback);

        if let CacheLookup::Fresh(entry) = self.cache.get(&key).await {
            debug!(%key, "cache hit");
            return Ok(FetchedSeries {
                symbol,
                series: entry.payload,
                stale: false,
            });
        }

        let waiting_since = Instant::now();
        let _flight = self.cache.flight_guard(&key).await;

        // Another caller may have refreshed the entry while we waited.
        if let CacheLookup::Fresh(entry) = self.cache.get(&key).await {
            debug!(%key, "cache filled by in-flight fetch");
            return Ok(FetchedSeries {
                symbol,
                series: entry.payload,
                stale: false,
            });
        }

        let outcome = match self.shared_failure(&key, waiting_since).await {
            Some(err) => {
                debug!(%key, %err, "adopting failed refresh from in-flight fetch");
                Err(err)
            }
            None => {
                let result = self.call_upstream(request).await;
                self.record_outcome(&key, &result).await;
                result
            }
        };

        match outcome {
            Ok(series) => {
                self.cache.put_now(key, series.clone()).await;
                Ok(FetchedSeries {
                    symbol,
                    series,
                    stale: false,
                })
            }
            Err(err) if err.kind() == SourceErrorKind::InvalidSymbol => Err(Exclusion::new(
                symbol,
                ErrorKind::InvalidSymbol,
                err.message().to_owned(),
            )),
            Err(err) => {
                if let CacheLookup::Stale(entry) = self.cache.get(&key).await {
                    warn!(%key, %err, "refresh failed, serving stale cache entry");
                    return Ok(FetchedSeries {
                        symbol,
                        series: entry.payload,
                        stale: true,
                    });
                }
                Err(Exclusion::new(
                    symbol,
                    ErrorKind::UpstreamUnavailable,
                    err.message().to_owned(),
                ))
            }
        }
    }

    /// The failure recorded for `key` while this caller was waiting on the
    /// single-flight guard, if any. Failures older than the wait are ignored
    /// so a fresh request still triggers its own refresh.
    async fn shared_failure(&self, key: &CacheKey, waiting_since: Instant) -> Option<SourceError> {
        let failures = self.failures.lock().await;
        failures
            .get(key)
            .filter(|(recorded_at, _)| *recorded_at >= waiting_since)
            .map(|(_, err)| err.clone())
    }

    /// Record a failed refresh for waiters to adopt; a success clears any
    /// earlier record for the key.
    async fn record_outcome(&self, key: &CacheKey, result: &Result<TimeSeries, SourceError>) {
        let mut failures = self.failures.lock().await;
        match result {
            Ok(_) => {
                failures.remove(key);
            }
            Err(err) => {
                failures.insert(key.clone(), (Instant::now(), err.clone()));
            }
        }
    }

    /// Issue the upstream call through the pacer, retrying retryable failures
    /// with backoff.
    async fn call_upstream(&self, request: SeriesRequest) -> Result<TimeSeries, SourceError> {
        let mut attempt = 0u32;
        loop {
            self.pacer.until_ready().await;
            match self.source.time_series(request.clone()).await {
                Ok(series) => return Ok(series),
                Err(err)
                    if self.config.retry.enabled
                        && err.is_retryable()
                        && attempt < self.config.retry.max_retries =>
                {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    debug!(symbol = %request.symbol, attempt, ?delay, "retrying upstream call");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Inner-join the fetched series on timestamps present in every one of
    /// them, excluding symbols below the observation threshold.
    fn align(
        &self,
        fetched: Vec<FetchedSeries>,
        interval: Interval,
        exclusions: &mut Vec<Exclusion>,
    ) -> AlignedSeries {
        let min_observations = self.config.min_observations;

        // Series too short on their own can never survive the join.
        let (mut usable, short): (Vec<_>, Vec<_>) = fetched
            .into_iter()
            .partition(|f| f.series.len() >= min_observations);
        for f in short {
            exclusions.push(Exclusion::new(
                f.symbol.clone(),
                ErrorKind::InsufficientData,
                format!(
                    "{} observations available, {} required",
                    f.series.len(),
                    min_observations
                ),
            ));
        }

        let mut timestamps: Vec<UtcDateTime> = match usable.first() {
            Some(first) => first.series.points().iter().map(|p| p.ts).collect(),
            None => Vec::new(),
        };
        for f in usable.iter().skip(1) {
            let present: HashSet<UtcDateTime> =
                f.series.points().iter().map(|p| p.ts).collect();
            timestamps.retain(|ts| present.contains(ts));
        }

        if timestamps.len() < min_observations {
            for f in usable.drain(..) {
                exclusions.push(Exclusion::new(
                    f.symbol,
                    ErrorKind::InsufficientData,
                    format!(
                        "{} aligned observations, {} required",
                        timestamps.len(),
                        min_observations
                    ),
                ));
            }
            timestamps.clear();
        }

        let mut symbols = Vec::with_capacity(usable.len());
        let mut stale = Vec::with_capacity(usable.len());
        let mut closes = Vec::with_capacity(usable.len());
        for f in usable {
            let row: Vec<f64> = timestamps
                .iter()
                .filter_map(|ts| f.series.close_at(*ts))
                .collect();
            debug_assert_eq!(row.len(), timestamps.len());
            symbols.push(f.symbol);
            stale.push(f.stale);
            closes.push(row);
        }

        AlignedSeries {
            interval,
            symbols,
            stale,
            timestamps,
            closes,
        }
    }
}
