// tests/postback_cascade.rs
mod common;

use std::fs;

use common::*;
use raingauge_scrape::config::consts::*;
use raingauge_scrape::config::options::PostbackOptions;
use raingauge_scrape::core::net::Method;
use raingauge_scrape::core::HttpResponse;
use raingauge_scrape::postback::{DayQuery, PostbackEngine};

const Q: DayQuery<'static> = DayQuery { station: "G1001", date: "05/11/2025", time: "23:59" };

fn is_data_post(r: &Seen) -> bool {
    r.method == Method::Post && r.url.ends_with(DATA_PATH)
}

fn is_search(r: &Seen, ajax: bool) -> bool {
    is_data_post(r) && r.is_ajax() == ajax && r.field(SEARCH_BUTTON).is_some()
}

fn is_show_all(r: &Seen, ajax: bool) -> bool {
    is_data_post(r) && r.is_ajax() == ajax && r.field(EVENT_TARGET) == Some("ctl00$ContentPlaceHolder1$btShowAll")
}

/// Logged-in portal whose data page GET always serves view state `vs-get`.
fn portal() -> FakePortal {
    let portal = FakePortal::new();
    with_login(&portal);
    portal.page(DATA_PATH, data_page("vs-get", &[("G1001", "Rayong")], ""));
    portal
}

fn stages(trace: &[raingauge_scrape::postback::engine::StageReport]) -> Vec<&'static str> {
    trace.iter().map(|s| s.stage).collect()
}

#[test]
fn full_table_from_ajax_search_ends_the_cascade() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 250)))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B"]);
    assert_eq!(cascade.rows.len(), 250);
    assert_eq!(cascade.trace[0].table.as_deref(), Some("ctl00_ContentPlaceHolder1_gvWOR"));

    let post = portal.posts().pop().unwrap();
    assert_eq!(post.field(VIEWSTATE), Some("vs-get"));
    assert_eq!(post.field(VIEWSTATE_GENERATOR), Some("GEN1"));
    assert_eq!(post.field(EVENT_VALIDATION), Some("EV1"));
    assert_eq!(post.field(STATION_DROPDOWN), Some("G1001"));
    assert_eq!(post.field(DATE_BOX), Some("05/11/2025"));
    assert_eq!(post.field(TIME_BOX), Some("23:59"));
    assert_eq!(post.field(SCRIPT_MANAGER), Some("ctl00$UpdatePanel1|ctl00$ContentPlaceHolder1$btSearch"));
    assert_eq!(post.header("X-MicrosoftAjax"), Some("Delta=true"));
    assert_eq!(post.header("X-Requested-With"), Some("XMLHttpRequest"));
    assert_eq!(post.header("Origin"), Some(BASE_URL));
    assert_eq!(post.header("Referer").map(String::from), Some(url(DATA_PATH)));

    let get = portal.requests().into_iter().find(|r| r.method == Method::Get && r.url.ends_with(DATA_PATH)).unwrap();
    assert_eq!(get.header("Referer").map(String::from), Some(format!("{BASE_URL}/")));
}

#[test]
fn latest_reading_is_the_greatest_timestamp() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 250)))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let reading = engine.fetch_daily(&Q, "Rayong").unwrap().expect("a reading");
    assert_eq!(reading.station_code, "G1001");
    assert_eq!(reading.station_name, "Rayong");
    assert_eq!(reading.date, "05/11/2025");
    assert_eq!(reading.time_utc, "05/11/2025 23:50:00");
    assert_eq!(reading.rain_mm, Some(3.0));
    assert_eq!(reading.temp_c, Some(27.5));
    assert_eq!(reading.humidity, Some(80.0));
    assert_eq!(reading.battery_v, Some(12.6));
    assert_eq!(reading.solar_v, None);
}

#[test]
fn partial_ajax_table_escalates_to_ajax_show_all() {
    let portal = portal();
    portal.on(|r| {
        is_search(r, true).then(|| ok(&r.url, &delta(&format!("{}{SHOW_ALL}", grid("G1001", "05/11/2025", 5)))))
    });
    portal.on(|r| is_show_all(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 210)))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B", "C_ajax"]);
    assert_eq!(cascade.trace[0].rows, 5);
    assert_eq!(cascade.rows.len(), 210);

    let show_all = portal.posts().pop().unwrap();
    assert_eq!(show_all.field(SCRIPT_MANAGER), Some("ctl00$UpdatePanel1|ctl00$ContentPlaceHolder1$btShowAll"));
    assert_eq!(show_all.field(EVENT_ARGUMENT), Some(""));
    assert_eq!(show_all.field(SEARCH_BUTTON), None);
    // fresh view state before every postback
    assert_eq!(portal.requests().iter().filter(|r| r.method == Method::Get && r.url.ends_with(DATA_PATH)).count(), 2);
}

#[test]
fn full_postback_show_all_reuses_the_search_page_state() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| ok(&r.url, &delta("<div>Loading...</div>"))));
    portal.on(|r| {
        is_search(r, false).then(|| {
            let extra = format!("{}{SHOW_ALL}", grid("G1001", "05/11/2025", 3));
            ok(&r.url, &data_page("vs-full", &[], &extra))
        })
    });
    portal.on(|r| {
        is_show_all(r, false).then(|| ok(&r.url, &data_page("vs-all", &[], &grid("G1001", "05/11/2025", 220))))
    });
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B", "N_search", "N_showall"]);
    assert_eq!(cascade.trace[0].table, None);
    assert_eq!(cascade.trace[1].rows, 3);
    assert_eq!(cascade.rows.len(), 220);

    let posts = portal.posts();
    let full_search = &posts[posts.len() - 2];
    assert_eq!(full_search.field(VIEWSTATE), Some("vs-get"));
    assert_eq!(full_search.field(ASYNC_POST), None);
    assert_eq!(full_search.header("X-MicrosoftAjax"), None);
    let full_show_all = &posts[posts.len() - 1];
    assert_eq!(full_show_all.field(VIEWSTATE), Some("vs-full"));
    assert_eq!(full_show_all.field(SCRIPT_MANAGER), None);
}

#[test]
fn stage_without_table_keeps_earlier_rows() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 4)))));
    portal.on(|r| is_search(r, false).then(|| ok(&r.url, &data_page("vs-full", &[], "<p>Session expired</p>"))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B", "N_search"]);
    assert_eq!(cascade.rows.len(), 4);
}

#[test]
fn nothing_anywhere_is_empty_not_an_error() {
    let portal = portal();
    portal.on(|r| is_data_post(r).then(|| ok(&r.url, "<html><body>No data</body></html>")));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B", "N_search"]);
    assert!(cascade.rows.is_empty());
    assert_eq!(engine.fetch_daily(&Q, "Rayong").unwrap(), None);
}

#[test]
fn failed_stage_is_logged_and_the_cascade_moves_on() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| HttpResponse { status: 502, url: r.url.clone(), body: String::new() }));
    portal.on(|r| is_search(r, false).then(|| ok(&r.url, &data_page("vs-full", &[], &grid("G1001", "05/11/2025", 2)))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let cascade = engine.run_cascade(&Q).unwrap();
    assert_eq!(stages(&cascade.trace), vec!["B", "N_search"]);
    assert!(cascade.trace[0].error.is_some());
    assert_eq!(cascade.rows.len(), 2);
}

#[test]
fn every_stage_failing_surfaces_the_last_error() {
    let portal = portal();
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let err = engine.run_cascade(&Q).unwrap_err();
    assert!(matches!(err, raingauge_scrape::ScrapeError::Http { status: 404, .. }), "{err:?}");
}

#[test]
fn rows_are_filtered_to_station_and_day() {
    let table = r#"<table id="GridView1">
        <tr><th>CODE</th><th>LATEST DATA (UTC)</th><th>24HR (mm)</th></tr>
        <tr><td>G1001</td><td>05/11/2025 10:00:00</td><td>1.5</td></tr>
        <tr><td>G2002</td><td>05/11/2025 11:00:00</td><td>9.0</td></tr>
        <tr><td>g1001</td><td>05/11/2025 08:00:00</td><td>0.5</td></tr>
        <tr><td>G1001</td><td>04/11/2025 23:00:00</td><td>7.0</td></tr>
        <tr><td colspan="3">1 2 3</td></tr>
    </table>"#;
    let portal = portal();
    portal.on(move |r| is_search(r, true).then(|| ok(&r.url, &delta(table))));
    portal.on(|r| is_search(r, false).then(|| ok(&r.url, "<html></html>")));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    let all = engine.fetch_daily_all(&Q, "").unwrap();
    let times: Vec<&str> = all.iter().map(|r| r.time_utc.as_str()).collect();
    assert_eq!(times, vec!["05/11/2025 08:00:00", "05/11/2025 10:00:00"]);
    assert_eq!(all[1].rain_mm, Some(1.5));
}

#[test]
fn station_priming_posts_the_dropdown_change() {
    let portal = portal();
    portal.on(|r| is_data_post(r).then(|| ok(&r.url, &delta("<div/>"))));
    let session = portal.login().unwrap();
    let engine = PostbackEngine::new(&session, PostbackOptions::default());

    engine.select_station("G1001").unwrap();
    let post = portal.posts().pop().unwrap();
    assert_eq!(post.field(EVENT_TARGET), Some(STATION_DROPDOWN));
    assert_eq!(post.field(STATION_DROPDOWN), Some("G1001"));
    assert_eq!(post.field(DATE_BOX), Some(""));
    assert_eq!(post.field(SCRIPT_MANAGER), Some("ctl00$UpdatePanel1|ctl00$ContentPlaceHolder1$dl_RAINGAUGE"));
    assert_eq!(post.field(ASYNC_POST), Some("true"));
}

#[test]
fn stage_bodies_are_saved_when_asked() {
    let dir = tmp_dir("snapshots");
    let portal = portal();
    portal.on(|r| {
        is_search(r, true).then(|| ok(&r.url, &delta(&format!("{}{SHOW_ALL}", grid("G1001", "05/11/2025", 5)))))
    });
    portal.on(|r| is_show_all(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 200)))));
    let session = portal.login().unwrap();
    let opts = PostbackOptions { snapshot_dir: Some(dir.clone()), ..PostbackOptions::default() };
    let engine = PostbackEngine::new(&session, opts);

    engine.run_cascade(&Q).unwrap();
    let mut names: Vec<String> =
        fs::read_dir(&dir).unwrap().map(|e| e.unwrap().file_name().to_string_lossy().into_owned()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "G1001_05-11-2025_B.html",
            "G1001_05-11-2025_B_raw.txt",
            "G1001_05-11-2025_C_ajax.html",
            "G1001_05-11-2025_C_ajax_raw.txt",
        ]
    );
    let raw = fs::read_to_string(dir.join("G1001_05-11-2025_B_raw.txt")).unwrap();
    assert!(raw.contains("updatePanel|ctl00_UpdatePanel1|"));
    let html = fs::read_to_string(dir.join("G1001_05-11-2025_B.html")).unwrap();
    assert!(html.starts_with("<table"));
}

#[test]
fn diagnosis_reports_one_ajax_round_trip() {
    let portal = portal();
    portal.on(|r| is_search(r, true).then(|| ok(&r.url, &delta(&grid("G1001", "05/11/2025", 7)))));
    let session = portal.login().unwrap();

    let report = raingauge_scrape::postback::diag::diagnose(&session, &Q).unwrap();
    assert_eq!(report.status, 200);
    assert_eq!(report.fragments, 1);
    assert!(report.hidden_present.iter().all(|(_, present)| *present));
    assert!(!report.script_manager_input);
    assert_eq!(report.table.as_deref(), Some("ctl00_ContentPlaceHolder1_gvWOR"));
    let vs = report.masked_payload.iter().find(|(k, _)| k == VIEWSTATE).unwrap();
    assert_eq!(vs.1, "<__VIEWSTATE:6 bytes>");
    assert!(report.head.starts_with("<table"));
    assert!(report.to_string().contains("table: ctl00_ContentPlaceHolder1_gvWOR"));
}
