// tests/scanner_properties.rs
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use feed_hook::feed::scripted::{Entry, ScriptedFeed};
use feed_hook::notify::CountingNotifier;
use feed_hook::{Post, ScanError, ScanQuery, Shutdown, Watermark, WatermarkScanner};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn mark(secs: i64) -> Watermark {
    Watermark::at(at(secs))
}

fn post(secs: i64, text: &str) -> Entry {
    Entry::Post(Post::new(text, at(secs)))
}

fn pinned(secs: i64, text: &str) -> Entry {
    Entry::Post(Post::new(text, at(secs)).pinned())
}

struct Harness {
    feed: Arc<ScriptedFeed>,
    notifier: Arc<CountingNotifier>,
    scanner: WatermarkScanner,
    query: ScanQuery,
}

fn harness(entries: Vec<Entry>, notifier: CountingNotifier) -> Harness {
    let feed = Arc::new(ScriptedFeed::new(entries));
    let notifier = Arc::new(notifier);
    let scanner = WatermarkScanner::new(feed.clone(), notifier.clone());
    Harness {
        feed,
        notifier,
        scanner,
        query: ScanQuery::new("someone", "Rust"),
    }
}

fn texts(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.text.as_str()).collect()
}

#[tokio::test]
async fn stops_at_first_seen_post() {
    let h = harness(
        vec![post(10, "rust p1"), post(5, "rust p2"), post(20, "rust p3")],
        CountingNotifier::new(),
    );

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(texts(&report.notified), vec!["rust p1"]);
    assert!(report.stopped_on_seen);
    assert_eq!(report.examined, 2, "p3 must not be examined");
    // p3 is past the stop point, so its timestamp never reaches the watermark
    assert_eq!(report.top, mark(10));
    assert_eq!(h.notifier.sent(), 1);
}

#[tokio::test]
async fn stale_pinned_post_is_skipped_not_a_boundary() {
    let h = harness(
        vec![post(10, "rust p1"), pinned(3, "rust p2"), post(8, "rust p3")],
        CountingNotifier::new(),
    );

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(texts(&report.notified), vec!["rust p1", "rust p3"]);
    assert_eq!(report.skipped, 1);
    assert!(!report.stopped_on_seen);
    assert_eq!(report.top, mark(10));
}

#[tokio::test]
async fn pinned_post_on_top_of_feed_does_not_hide_new_posts() {
    // Pinned entry first, then the real newest-first timeline.
    let h = harness(
        vec![
            pinned(1, "rust pinned intro"),
            post(30, "rust new"),
            post(20, "rust seen"),
        ],
        CountingNotifier::new(),
    );

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(25))
        .await
        .unwrap();

    assert_eq!(texts(&report.notified), vec!["rust new"]);
    assert!(report.stopped_on_seen);
    assert_eq!(report.top, mark(30));
}

#[tokio::test]
async fn fresh_pinned_post_is_notified() {
    let h = harness(vec![pinned(50, "RUST pinned news")], CountingNotifier::new());

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(texts(&report.notified), vec!["RUST pinned news"]);
    assert_eq!(report.top, mark(50));
}

#[tokio::test]
async fn keyword_filter_is_case_insensitive_and_skips_but_advances() {
    let h = harness(
        vec![
            post(12, "nothing to see"),
            post(11, "Learning RuSt today"),
            post(9, "golang"),
        ],
        CountingNotifier::new(),
    );

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(texts(&report.notified), vec!["Learning RuSt today"]);
    assert_eq!(report.skipped, 2);
    // Filtered posts still move the watermark.
    assert_eq!(report.top, mark(12));
    assert_eq!(h.notifier.sent(), 1);
}

#[tokio::test]
async fn empty_feed_keeps_watermark() {
    let h = harness(vec![], CountingNotifier::new());

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(report.top, mark(7));
    assert_eq!(report.examined, 0);
    assert!(report.notified.is_empty());
}

#[tokio::test]
async fn all_seen_stops_on_first_post() {
    let h = harness(
        vec![post(7, "rust a"), post(6, "rust b"), post(5, "rust c")],
        CountingNotifier::new(),
    );

    let report = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap();

    assert_eq!(report.examined, 1);
    assert!(report.stopped_on_seen);
    assert_eq!(report.top, mark(7));
    assert_eq!(h.notifier.sent(), 0);
}

#[tokio::test]
async fn fetch_error_aborts_with_watermark_so_far() {
    let h = harness(
        vec![
            post(10, "rust p1"),
            post(12, "other"),
            Entry::Fail("feed went away".into()),
            post(30, "rust p3"),
        ],
        CountingNotifier::new(),
    );

    let failure = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, ScanError::Fetch(_)));
    assert_eq!(failure.top, mark(12));
    assert_eq!(h.notifier.sent(), 1);
}

#[tokio::test]
async fn notify_error_aborts_after_advancing() {
    let h = harness(
        vec![post(10, "rust a"), post(9, "rust b"), post(8, "rust c")],
        CountingNotifier::failing_after(1),
    );

    let failure = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, ScanError::Notify(_)));
    assert_eq!(failure.top, mark(10));
    assert_eq!(h.notifier.sent(), 1);
}

#[tokio::test]
async fn notify_error_keeps_advance_from_failing_post() {
    // The failing post is the newest on the page; its timestamp is kept.
    let h = harness(
        vec![pinned(2, "rust old pin"), post(9, "rust b"), post(15, "rust c")],
        CountingNotifier::failing_after(1),
    );

    let failure = h
        .scanner
        .scan(&Shutdown::never(), &h.query, mark(7))
        .await
        .unwrap_err();

    assert_eq!(failure.top, mark(15));
}

#[tokio::test]
async fn rescan_with_returned_watermark_sends_nothing() {
    let h = harness(
        vec![post(10, "rust a"), pinned(2, "rust pin"), post(9, "rust b"), post(3, "rust c")],
        CountingNotifier::new(),
    );
    let ctx = Shutdown::never();

    let first = h.scanner.scan(&ctx, &h.query, mark(7)).await.unwrap();
    assert_eq!(first.notified.len(), 2);

    let second = h.scanner.scan(&ctx, &h.query, first.top).await.unwrap();
    assert!(second.notified.is_empty());
    assert_eq!(second.top, first.top);
    assert_eq!(h.notifier.sent(), 2);
    assert_eq!(h.feed.calls(), 2);
}

#[tokio::test]
async fn new_posts_on_later_scan_are_picked_up_once() {
    let h = harness(vec![post(10, "rust a"), post(5, "rust old")], CountingNotifier::new());
    let ctx = Shutdown::never();

    let first = h.scanner.scan(&ctx, &h.query, mark(7)).await.unwrap();
    assert_eq!(texts(&first.notified), vec!["rust a"]);

    h.feed
        .set_page(vec![post(14, "rust c"), post(12, "rust b"), post(10, "rust a")]);
    let second = h.scanner.scan(&ctx, &h.query, first.top).await.unwrap();
    assert_eq!(texts(&second.notified), vec!["rust c", "rust b"]);
    assert_eq!(second.top, mark(14));

    let third = h.scanner.scan(&ctx, &h.query, second.top).await.unwrap();
    assert!(third.notified.is_empty());
    assert_eq!(h.notifier.sent(), 3);
}

#[tokio::test]
async fn filtered_post_moves_watermark_past_late_arrivals() {
    // A non-matching post at t=12 advances the watermark, so a matching post
    // that only shows up later with t=11 is treated as already seen.
    let h = harness(vec![post(12, "unrelated")], CountingNotifier::new());
    let ctx = Shutdown::never();

    let first = h.scanner.scan(&ctx, &h.query, mark(7)).await.unwrap();
    assert_eq!(first.top, mark(12));

    h.feed.set_page(vec![post(12, "unrelated"), post(11, "rust late")]);
    let second = h.scanner.scan(&ctx, &h.query, first.top).await.unwrap();
    assert!(second.notified.is_empty());
    assert_eq!(h.notifier.sent(), 0);
}

#[tokio::test]
async fn watermark_never_moves_backwards() {
    let pages: Vec<Vec<Entry>> = vec![
        vec![],
        vec![post(1, "rust")],
        vec![pinned(2, "rust"), post(1, "x")],
        vec![post(100, "x"), post(50, "rust"), post(20, "rust")],
        vec![pinned(300, "rust"), post(40, "rust")],
        vec![post(60, "rust"), Entry::Fail("err".into())],
    ];
    let starts = [0, 10, 45, 99, 500];

    for page in pages {
        for start in starts {
            let h = harness(page.clone(), CountingNotifier::new());
            let top = match h.scanner.scan(&Shutdown::never(), &h.query, mark(start)).await {
                Ok(report) => report.top,
                Err(failure) => failure.top,
            };
            assert!(top >= mark(start), "start={start} top={top}");
        }
    }
}

#[tokio::test]
async fn page_size_bounds_the_scan() {
    let entries: Vec<Entry> = (0..10).map(|i| post(100 - i, "rust")).collect();
    let feed = Arc::new(ScriptedFeed::new(entries));
    let notifier = Arc::new(CountingNotifier::new());
    let scanner = WatermarkScanner::new(feed.clone(), notifier.clone()).with_page_size(3);

    let report = scanner
        .scan(&Shutdown::never(), &ScanQuery::new("someone", "rust"), mark(0))
        .await
        .unwrap();

    assert_eq!(report.examined, 3);
    assert_eq!(notifier.sent(), 3);
    assert_eq!(report.top, mark(100));
}
