mod common;

use std::time::Duration;

use serde_json::json;
use stock_watch::fetch::{
    AttemptOutcome, ErrorClass, FailureKind, FastInfo, InfoMap, Period, ResponseCache,
    RetryPolicy, SeriesFetcher, Strategy,
};

use common::{fail, harness, series, Op, REQUEST_DELAY};

fn fetcher() -> SeriesFetcher {
    SeriesFetcher::new(RetryPolicy::new(3, REQUEST_DELAY))
}

fn full_info() -> InfoMap {
    [
        ("longName", json!("Petróleo Brasileiro S.A.")),
        ("sector", json!("Energy")),
        ("industry", json!("Oil & Gas Integrated")),
        ("currency", json!("BRL")),
        ("exchange", json!("SAO")),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

#[test]
fn cached_series_is_served_until_the_ttl_elapses() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script.history(Ok(series(&[10.0, 11.0])));
    h.script.history(Ok(series(&[10.0, 11.0, 12.0])));

    let first = fetcher()
        .fetch(&mut h.upstream, &mut cache, "petr4.sa", Period::OneMonth)
        .unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.ticker, "PETR4.SA");

    h.clock.advance(Duration::from_secs(299));
    let cached = fetcher()
        .fetch(&mut h.upstream, &mut cache, "PETR4.SA", Period::OneMonth)
        .unwrap();
    assert!(cached.from_cache);
    assert!(cached.attempts.is_empty());
    assert_eq!(cached.series, first.series);
    assert_eq!(h.script.count(Op::History), 1);

    h.clock.advance(Duration::from_secs(1));
    let refreshed = fetcher()
        .fetch(&mut h.upstream, &mut cache, "PETR4.SA", Period::OneMonth)
        .unwrap();
    assert!(!refreshed.from_cache, "an entry exactly 300s old is stale");
    assert_eq!(refreshed.series.len(), 3);
    assert_eq!(h.script.count(Op::History), 2);
}

#[test]
fn cache_keys_separate_periods() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script.history(Ok(series(&[1.0, 2.0])));
    h.script.history(Ok(series(&[1.0, 2.0, 3.0])));

    fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneMonth)
        .unwrap();
    let yearly = fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneYear)
        .unwrap();

    assert!(!yearly.from_cache);
    assert_eq!(cache.len(), 2);
}

#[test]
fn transient_failures_back_off_exponentially() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    for _ in 0..3 {
        h.script.history(fail("connection reset by peer"));
    }

    let failure = fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneYear)
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Exhausted);
    assert_eq!(failure.attempts, 3);
    assert_eq!(
        failure.message,
        "Failed after 3 attempts: connection reset by peer"
    );
    assert_eq!(h.script.ops(), vec![Op::History, Op::History, Op::History]);

    let backoffs: Vec<Duration> = failure.trace.iter().map(|a| a.backoff).collect();
    assert_eq!(
        backoffs,
        vec![Duration::ZERO, Duration::from_secs(4), Duration::from_secs(8)]
    );
    // Backoff alone already satisfies the spacing, so the limiter never waits.
    assert_eq!(
        h.clock.sleeps(),
        vec![Duration::from_secs(4), Duration::from_secs(8)]
    );
    assert!(cache.is_empty());
}

#[test]
fn throttled_failure_waits_longer_before_retrying() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script
        .history(fail("429 Too Many Requests"))
        .history(Ok(series(&[5.0, 6.0])));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "MSFT", Period::OneMonth)
        .unwrap();

    assert_eq!(fetched.attempts.len(), 2);
    assert_eq!(
        fetched.attempts[0].outcome,
        AttemptOutcome::Failed {
            class: ErrorClass::RateLimited,
            message: "429 Too Many Requests".to_string(),
        }
    );
    assert_eq!(fetched.attempts[1].backoff, Duration::from_secs(8));
    assert_eq!(h.clock.sleeps()[0], Duration::from_secs(8));
}

#[test]
fn auth_expiry_switches_to_secondary_before_any_backoff() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script
        .history(fail("401 Unauthorized: Invalid Crumb"))
        .download(Ok(series(&[20.0, 21.0, 22.0])));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "VALE3.SA", Period::OneMonth)
        .unwrap();

    assert_eq!(fetched.series.len(), 3);
    assert_eq!(&h.script.ops()[..2], &[Op::History, Op::Download]);

    let secondary = &fetched.attempts[1];
    assert_eq!(secondary.strategy, Strategy::Secondary);
    assert_eq!(secondary.attempt_index, 0);
    assert_eq!(secondary.backoff, Duration::ZERO);
    assert_eq!(secondary.throttle, REQUEST_DELAY);
    assert!(
        h.clock.sleeps().iter().all(|wait| *wait <= REQUEST_DELAY),
        "no retry backoff expected: {:?}",
        h.clock.sleeps()
    );

    let calls = h.script.calls();
    let (start, end) = calls[1].window.unwrap();
    assert!(end <= calls[1].at);
    assert_eq!(end - start, chrono::Duration::days(30));
}

#[test]
fn failing_secondary_after_auth_expiry_backs_off_and_reports_its_error() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    for attempt in 0..3 {
        h.script
            .history(fail("401 Unauthorized: Invalid Crumb"))
            .download(fail(&format!("download broke {attempt}")));
    }

    let failure = fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneMonth)
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Exhausted);
    assert_eq!(failure.message, "Failed after 3 attempts: download broke 2");
    assert_eq!(
        h.script.ops(),
        vec![
            Op::History,
            Op::Download,
            Op::History,
            Op::Download,
            Op::History,
            Op::Download
        ]
    );

    let primary: Vec<Duration> = failure
        .trace
        .iter()
        .filter(|attempt| attempt.strategy == Strategy::Primary)
        .map(|attempt| attempt.backoff)
        .collect();
    assert_eq!(
        primary,
        vec![Duration::ZERO, Duration::from_secs(4), Duration::from_secs(8)]
    );
    assert!(failure
        .trace
        .iter()
        .filter(|attempt| attempt.strategy == Strategy::Secondary)
        .all(|attempt| attempt.backoff == Duration::ZERO));

    // Each download waits out the limiter; backoffs precede the retried primary.
    assert_eq!(
        h.clock.sleeps(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(2),
            Duration::from_secs(8),
            Duration::from_secs(2)
        ]
    );
    assert!(cache.is_empty());
}

#[test]
fn empty_responses_try_secondary_on_first_and_last_attempts_only() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();

    let failure = fetcher()
        .fetch(&mut h.upstream, &mut cache, "XPTO3.SA", Period::OneWeek)
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Empty);
    assert_eq!(
        h.script.ops(),
        vec![
            Op::History,
            Op::Download,
            Op::History,
            Op::History,
            Op::Download
        ]
    );
    assert_eq!(h.script.count(Op::Info), 0);
    assert!(failure.message.contains("No data for XPTO3.SA"));
    assert!(cache.is_empty());

    let calls = h.script.calls();
    for pair in calls.windows(2) {
        let gap = (pair[1].at - pair[0].at).to_std().unwrap();
        assert!(gap >= REQUEST_DELAY, "calls only {gap:?} apart");
    }
}

#[test]
fn failed_refresh_keeps_the_stale_entry() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script.history(Ok(series(&[1.0, 2.0, 3.0])));
    fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneMonth)
        .unwrap();

    h.clock.advance(Duration::from_secs(600));
    for _ in 0..3 {
        h.script.history(fail("503 Service Unavailable"));
    }
    fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneMonth)
        .unwrap_err();

    let status = cache.status(h.upstream.now());
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].key, "AAPL_1mo");
    assert_eq!(status[0].bars, 3);
    assert!(!status[0].fresh);
}

#[test]
fn cache_survives_a_reload_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stocks_cache.json");
    let mut h = harness();
    let mut cache = ResponseCache::load(&path).unwrap();
    h.script
        .history(Ok(series(&[30.5, 31.25, 29.75])))
        .info(Ok(full_info()));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "PETR4.SA", Period::YearToDate)
        .unwrap();
    assert_eq!(fetched.info, full_info());

    let reloaded = ResponseCache::load(&path).unwrap();
    let entry = reloaded
        .lookup("PETR4.SA", Period::YearToDate, h.upstream.now())
        .expect("fresh entry after reload");
    assert_eq!(entry.series, fetched.series);
    assert_eq!(entry.info, full_info());
}

#[test]
fn sparse_info_is_topped_up_from_fast_info() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    let mut sparse = InfoMap::new();
    sparse.insert("longName".to_string(), json!("Vale S.A."));
    h.script
        .history(Ok(series(&[60.0, 61.0])))
        .info(Ok(sparse))
        .fast_info(Ok(FastInfo {
            currency: Some("BRL".to_string()),
            ..FastInfo::default()
        }));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "VALE3.SA", Period::OneMonth)
        .unwrap();

    assert_eq!(fetched.info["longName"], "Vale S.A.");
    assert_eq!(fetched.info["currency"], "BRL");
    assert_eq!(fetched.info["exchange"], "N/A");
    assert_eq!(fetched.info["timezone"], "N/A");
}

#[test]
fn auth_failure_on_info_returns_empty_mapping() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script
        .history(Ok(series(&[60.0, 61.0])))
        .info(fail("401 Unauthorized"));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "VALE3.SA", Period::OneMonth)
        .unwrap();

    assert!(fetched.info.is_empty());
    assert_eq!(h.script.count(Op::Info), 1);
    assert_eq!(h.script.count(Op::FastInfo), 0);
}

#[test]
fn transient_info_failure_is_retried_after_double_delay() {
    let mut h = harness();
    let mut cache = ResponseCache::in_memory();
    h.script
        .history(Ok(series(&[1.0, 2.0])))
        .info(fail("read timed out"))
        .info(Ok(full_info()));

    let fetched = fetcher()
        .fetch(&mut h.upstream, &mut cache, "AAPL", Period::OneMonth)
        .unwrap();

    assert_eq!(fetched.info, full_info());
    assert_eq!(h.script.count(Op::Info), 2);
    assert!(h.clock.sleeps().contains(&Duration::from_secs(4)));
}
