// src/config/consts.rs

// Portal
pub const BASE: &str = "http://eecmobile1.fortiddns.com";
pub const LOGIN_PATH: &str = "/eec/Login.aspx";
pub const MAP_PATH: &str = "/eec/Raingauge_Monitor_Map.aspx";
pub const SUMMARY_PATH: &str = "/eec/Raingauge_Summary_Station.aspx";
pub const ALL_LATEST_PATH: &str = "/eec/Raingauge_All_Lastest.aspx"; // sic
pub const DATA_PATH: &str = "/eec/Raingauge_Data.aspx";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// Login form
pub const LOGIN_USER_FIELD: &str = "tb_user";
pub const LOGIN_PASSWORD_FIELD: &str = "tb_password";
pub const LOGIN_OK_URL_MARKER: &str = "Default.aspx";
pub const LOGIN_OK_BODY_MARKER: &str = "logout";

// WebForms hidden state
pub const VIEWSTATE: &str = "__VIEWSTATE";
pub const VIEWSTATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
pub const EVENT_TARGET: &str = "__EVENTTARGET";
pub const EVENT_ARGUMENT: &str = "__EVENTARGUMENT";
pub const ASYNC_POST: &str = "__ASYNCPOST";

// Data page controls
pub const SCRIPT_MANAGER: &str = "ctl00$ScriptManager1";
pub const UPDATE_PANEL: &str = "ctl00$UpdatePanel1";
pub const STATION_DROPDOWN: &str = "ctl00$ContentPlaceHolder1$dl_RAINGAUGE";
pub const STATION_DROPDOWN_ID: &str = "ctl00_ContentPlaceHolder1_dl_RAINGAUGE";
pub const DATE_BOX: &str = "ctl00$ContentPlaceHolder1$tbDate";
pub const TIME_BOX: &str = "ctl00$ContentPlaceHolder1$tbTime";
pub const SEARCH_BUTTON: &str = "ctl00$ContentPlaceHolder1$btSearch";
pub const SEARCH_VALUE: &str = "Search";

// Result grid discovery, in order of preference
pub const KNOWN_TABLE_IDS: &[&str] = &[
    "ctl00_ContentPlaceHolder1_gvWOR",
    "GridView1",
    "gvData",
    "ctl00_ContentPlaceHolder1_GridView1",
];
pub const ROW_STYLE_MARKERS: &[&str] = &["rowstyle_itc", "altrowstyle_itc"];
pub const GRID_TARGET_HINT: &str = "gvWOR";

// Retry
pub const MAX_ATTEMPTS: u32 = 7;
pub const BACKOFF_BASE_SECS: f64 = 0.8;
pub const RETRY_STATUSES: &[u16] = &[500, 502, 503, 504];
pub const GET_TIMEOUT_SECS: u64 = 60;
pub const POST_TIMEOUT_SECS: u64 = 90;

// Postback
pub const FULL_TABLE_ROWS: usize = 200; // fewer means paged or partial
pub const DEFAULT_QUERY_TIME: &str = "23:59";

// Status
pub const RECENT_ONLINE_MINUTES: i64 = 30;
pub const RECENT_TIMEOUT_HOURS: i64 = 6;
pub const LONG_BODY_ONLINE_CHARS: usize = 500;

// Output
pub const DEFAULT_OUT_DIR: &str = "weather_data";
pub const SNAPSHOT_SUBDIR: &str = "_html";
pub const STATIONS_CSV: &str = "stations.csv";
pub const STATIONS_JSON: &str = "stations.json";
pub const LOG_DIR: &str = ".store/logs";

// Credentials
pub const ENV_USER: &str = "RAINGAUGE_USER";
pub const ENV_PASSWORD: &str = "RAINGAUGE_PASSWORD";

// Concurrency
pub const WORKERS: usize = 1; // one session each
pub const MAX_WORKERS: usize = 8;
pub const REQUEST_PAUSE_MS: u64 = 250;
pub const JITTER_MS: u64 = 150;
