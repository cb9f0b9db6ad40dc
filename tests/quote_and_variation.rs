mod common;

use chrono::Duration as ChronoDuration;
use stock_watch::fetch::{
    FastInfo, QuoteFetcher, QuoteSource, VariationCalculator, VariationError, QUOTE_DELAY_LABEL,
};
use stock_watch::utils::Currency;

use common::{fail, harness, series, Op};

#[test]
fn fast_path_quote_fills_missing_fields() {
    let mut h = harness();
    h.script.fast_info(Ok(FastInfo {
        last_price: Some(38.4),
        previous_close: Some(37.9),
        ..FastInfo::default()
    }));

    let quote = QuoteFetcher::new()
        .get_current_quote(&mut h.upstream, "petr4.sa")
        .expect("quote from fast info");

    assert_eq!(quote.ticker, "PETR4.SA");
    assert_eq!(quote.source, QuoteSource::FastInfo);
    assert_eq!(quote.price, 38.4);
    assert_eq!(quote.previous_close, 37.9);
    assert_eq!(quote.open, 38.4);
    assert_eq!(quote.day_high, 38.4);
    assert_eq!(quote.volume, 0.0);
    assert_eq!(quote.currency, Currency::Brl);
    assert_eq!(quote.delay_label, QUOTE_DELAY_LABEL);
    assert_eq!(quote.as_of, h.upstream.now() - ChronoDuration::minutes(10));
    assert_eq!(h.script.ops(), vec![Op::FastInfo]);
}

#[test]
fn quote_falls_back_to_intraday_bars() {
    let mut h = harness();
    h.script
        .fast_info(Ok(FastInfo::default()))
        .intraday(Ok(series(&[10.0, 12.0, 11.0])));

    let quote = QuoteFetcher::new()
        .get_current_quote(&mut h.upstream, "AAPL")
        .expect("quote from intraday bars");

    assert_eq!(quote.source, QuoteSource::Intraday);
    assert_eq!(quote.price, 11.0);
    assert_eq!(quote.open, 10.0);
    assert_eq!(quote.previous_close, 10.0);
    assert_eq!(quote.day_high, 13.0);
    assert_eq!(quote.day_low, 9.0);
    assert_eq!(quote.volume, 3_000.0);
    assert_eq!(quote.currency, Currency::Usd);
    assert_eq!(h.script.ops(), vec![Op::FastInfo, Op::Intraday]);
}

#[test]
fn quote_is_absent_when_both_paths_fail() {
    let mut h = harness();
    h.script
        .fast_info(fail("401 Unauthorized"))
        .intraday(Ok(series(&[])));

    assert!(QuoteFetcher::new()
        .get_current_quote(&mut h.upstream, "AAPL")
        .is_none());
    assert_eq!(h.script.count(Op::FastInfo), 1, "quotes are never retried");
}

#[test]
fn variation_over_two_bars() {
    let mut h = harness();
    h.script.history_range(Ok(series(&[100.0, 104.0, 110.0])));

    let (percent, latest) = VariationCalculator::new().percent_change(&mut h.upstream, "AAPL", 30);

    assert!((percent.unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(latest, Some(110.0));

    let call = &h.script.calls()[0];
    let (start, end) = call.window.unwrap();
    assert_eq!(end, call.at);
    assert_eq!(end - start, ChronoDuration::days(35));
}

#[test]
fn variation_needs_two_bars() {
    let mut h = harness();
    h.script.history_range(Ok(series(&[100.0])));

    assert_eq!(
        VariationCalculator::new().percent_change(&mut h.upstream, "AAPL", 1),
        (None, None)
    );
}

#[test]
fn detailed_variation_reports_the_reason() {
    let mut h = harness();
    h.script
        .history_range(Ok(series(&[42.0])))
        .history_range(fail("429 Too Many Requests"))
        .history_range(Ok(series(&[0.0, 5.0])));
    let calculator = VariationCalculator::new();

    assert_eq!(
        calculator.percent_change_detailed(&mut h.upstream, "AAPL", 7),
        Err(VariationError::InsufficientHistory { bars: 1 })
    );
    assert_eq!(
        calculator.percent_change_detailed(&mut h.upstream, "AAPL", 7),
        Err(VariationError::Provider("429 Too Many Requests".to_string()))
    );
    assert_eq!(
        calculator.percent_change_detailed(&mut h.upstream, "AAPL", 7),
        Err(VariationError::ZeroBasePrice)
    );
    assert_eq!(h.script.count(Op::HistoryRange), 3, "no retries for variations");
}

#[test]
fn oversized_lookback_is_rejected_without_a_call() {
    let mut h = harness();
    let calculator = VariationCalculator::new();

    assert_eq!(
        calculator.percent_change(&mut h.upstream, "AAPL", u32::MAX),
        (None, None)
    );
    assert_eq!(
        calculator.percent_change_detailed(&mut h.upstream, "AAPL", u32::MAX),
        Err(VariationError::InvalidWindow { days: u32::MAX })
    );
    assert!(h.script.calls().is_empty());
}
