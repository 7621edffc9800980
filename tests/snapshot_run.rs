// tests/snapshot_run.rs
mod common;

use std::fs;

use chrono::{DateTime, NaiveDate, Utc};
use common::*;
use raingauge_scrape::config::consts::*;
use raingauge_scrape::config::options::{SnapshotOptions, StatusPolicy};
use raingauge_scrape::core::net::Method;
use raingauge_scrape::data::StationRecord;
use raingauge_scrape::scrape::run_snapshot_at;
use raingauge_scrape::status::Status;

fn now() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(12, 0, 0).unwrap().and_utc()
}

const MAP: &str = r#"<html><head><script>
function SetMap(lat, lon, icon, mtype, img, name, info, iconfile, code) { /* ... */ }
SetMap(13.5, 101.2, {w: 32, h: 32}, 1, 'images/st.png', 'Rayong', 'Code: G1001<br>Rain: 2.5 mm<br>Temp: 31.2 C<br>Date: 01/05/2025 10:00 UTC', 'raingauge_online_1.png', 'G1001', 0, 13.6, 101.3, '', '', '');
SetMap(14.0, 100.0, '', 1, '', 'Nowhere', 'Rain: 0 mm', 'raingauge_3.png', 'G2002');
SetMap(13.5, 101.2, '', 1, '', 'Rayong', 'Code: G1001<br>Rain: 9.0 mm<br>Date: 01/05/2025 09:00 UTC', 'raingauge_online_1.png', 'G1001');
SetMap(12.0, 99.0, '', 1, '', 'Ghost', 'Rain: 1 mm', 'marker_red.png');
</script></head><body></body></html>"#;

const LIST: &str = r#"<div class="panel-body"><table>
<tr><th>No</th><th>Code</th><th>Name</th><th>Status</th></tr>
<tr><td>1</td><td>G1001</td><td>Rayong</td><td><img id="ctl00_ContentPlaceHolder1_Img_Status_0" src="images/status_offline.png" alt="" /></td></tr>
<tr><td>2</td><td>G3003</td><td>Chanthaburi</td><td><img id="ctl00_ContentPlaceHolder1_Img_Status_1" src="images/green.png" alt="Online" /></td></tr>
</table></div>"#;

fn portal(with_list: bool) -> FakePortal {
    let portal = FakePortal::new();
    with_login(&portal);
    portal.page(MAP_PATH, MAP);
    if with_list {
        portal.page(ALL_LATEST_PATH, LIST);
    }
    portal.on(|r| {
        (r.method == Method::Get && r.url.contains(SUMMARY_PATH)).then(|| {
            if r.url.contains("id=G2002") {
                ok(&r.url, r#"{"status": "Timeout"}"#)
            } else {
                ok(&r.url, "<html><body>Station is online</body></html>")
            }
        })
    });
    portal
}

fn by_code<'a>(records: &'a [StationRecord], code: &str) -> &'a StationRecord {
    records.iter().find(|r| r.station_code == code).unwrap()
}

#[test]
fn list_status_overrides_map_icon_and_duplicates_collapse() {
    let dir = tmp_dir("snapshot_list");
    let portal = portal(true);
    let session = portal.login().unwrap();
    let opts = SnapshotOptions { out_dir: dir.clone(), ..SnapshotOptions::default() };

    let report = run_snapshot_at(&session, &opts, &StatusPolicy::default(), now(), None).unwrap();
    assert_eq!(report.listed, 2);
    assert_eq!(report.probed, 0);

    let codes: Vec<&str> = report.records.iter().map(|r| r.station_code.as_str()).collect();
    assert_eq!(codes, vec!["G1001", "G2002"]);

    let g1 = by_code(&report.records, "G1001");
    assert_eq!(g1.status_from_icon, Status::Online);
    assert_eq!(g1.status, Status::Offline);
    assert_eq!(g1.rain_mm, Some(2.5));
    assert_eq!(g1.temperature_c, Some(31.2));
    assert_eq!(g1.date_iso.as_deref(), Some("2025-05-01T10:00:00+00:00"));
    assert_eq!(g1.lat, Some(13.5));

    let g2 = by_code(&report.records, "G2002");
    assert_eq!(g2.status, Status::Disconnect);
    assert_eq!(g2.rain_mm, Some(0.0));

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.counts, vec![(Status::Offline, 1), (Status::Disconnect, 1)]);
    assert_eq!(report.files_written, vec![dir.join(STATIONS_CSV), dir.join(STATIONS_JSON)]);

    let csv = fs::read_to_string(dir.join(STATIONS_CSV)).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(StationRecord::CSV_HEADERS.join(",").as_str()));
    assert!(lines.next().unwrap().starts_with("G1001,Rayong,13.5,101.2,OFFLINE,2.5 mm,2.5,"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(dir.join(STATIONS_JSON)).unwrap()).unwrap();
    assert_eq!(json[0]["station_code"], "G1001");
    assert_eq!(json[0]["status"], "OFFLINE");
    assert_eq!(json[1]["status"], "DISCONNECT");
}

#[test]
fn missing_list_falls_back_to_the_icon() {
    let dir = tmp_dir("snapshot_nolist");
    let portal = portal(false);
    let session = portal.login().unwrap();
    let opts = SnapshotOptions { out_dir: dir, write_csv: false, write_json: false, ..SnapshotOptions::default() };

    let report = run_snapshot_at(&session, &opts, &StatusPolicy::default(), now(), None).unwrap();
    assert_eq!(report.listed, 0);
    assert!(report.files_written.is_empty());
    assert_eq!(by_code(&report.records, "G1001").status, Status::Online);
}

#[test]
fn summary_probe_is_recorded_but_never_changes_status() {
    let dir = tmp_dir("snapshot_probe");
    let portal = portal(true);
    let session = portal.login().unwrap();
    let opts = SnapshotOptions { out_dir: dir.clone(), write_json: false, api_probe: 2, ..SnapshotOptions::default() };

    let report = run_snapshot_at(&session, &opts, &StatusPolicy::default(), now(), None).unwrap();
    assert_eq!(report.probed, 2);

    let g1 = by_code(&report.records, "G1001");
    assert_eq!(g1.status_from_api, Some(Status::Online));
    assert_eq!(g1.status, Status::Offline);

    // the probe says TIMEOUT, recency still decides
    let g2 = by_code(&report.records, "G2002");
    assert_eq!(g2.status_from_api, Some(Status::Timeout));
    assert_eq!(g2.status, Status::Disconnect);

    let csv = fs::read_to_string(dir.join(STATIONS_CSV)).unwrap();
    assert!(csv.lines().nth(1).unwrap().ends_with(",ONLINE"));

    let probes: Vec<String> = portal
        .requests()
        .into_iter()
        .filter(|r| r.url.contains(SUMMARY_PATH))
        .map(|r| r.url)
        .collect();
    assert_eq!(probes.len(), 2);
    assert!(probes[0].ends_with("?id=G1001&d=01/05/2025&t=12:00"));
}

#[test]
fn map_outage_is_an_error() {
    let portal = FakePortal::new();
    with_login(&portal);
    let session = portal.login().unwrap();
    let opts = SnapshotOptions { out_dir: tmp_dir("snapshot_outage"), ..SnapshotOptions::default() };
    let err = run_snapshot_at(&session, &opts, &StatusPolicy::default(), now(), None).err().unwrap();
    assert!(matches!(err, raingauge_scrape::ScrapeError::Http { status: 404, .. }));
}
