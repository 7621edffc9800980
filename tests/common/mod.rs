// tests/common/mod.rs
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use raingauge_scrape::config::consts::*;
use raingauge_scrape::config::options::{Credentials, RetryPolicy};
use raingauge_scrape::core::net::{Method, Request};
use raingauge_scrape::core::{Executor, HttpResponse, Transport};
use raingauge_scrape::{Result, Session};

pub const BASE_URL: &str = "http://portal.test";

pub fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("raingauge_it_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

/// A request as the portal saw it.
#[derive(Clone, Debug)]
pub struct Seen {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl Seen {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn is_ajax(&self) -> bool {
        self.field(ASYNC_POST) == Some("true")
    }
}

type Reply = Box<dyn Fn(&Seen) -> Option<HttpResponse> + Send + Sync>;

/// In-memory portal: the first handler that answers wins. Unanswered requests get a 404.
#[derive(Clone, Default)]
pub struct FakePortal {
    handlers: Arc<Mutex<Vec<Reply>>>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, f: F) -> &Self
    where
        F: Fn(&Seen) -> Option<HttpResponse> + Send + Sync + 'static,
    {
        self.handlers.lock().unwrap().push(Box::new(f));
        self
    }

    /// GET on a path, fixed body.
    pub fn page(&self, path: &'static str, body: impl Into<String>) -> &Self {
        let body = body.into();
        self.on(move |r| (r.method == Method::Get && r.url.ends_with(path)).then(|| ok(&r.url, &body)))
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Seen> {
        self.requests().into_iter().filter(|r| r.method == Method::Post).collect()
    }

    pub fn executor(&self) -> Executor {
        Executor::new(Box::new(self.clone()), RetryPolicy::default()).with_sleeper(Box::new(|_| {}))
    }

    pub fn login(&self) -> Result<Session> {
        Session::login(self.executor(), BASE_URL, &Credentials::new("alice", "secret"))
    }
}

impl Transport for FakePortal {
    fn send(&self, req: &Request<'_>) -> Result<HttpResponse> {
        let seen = Seen {
            method: req.method,
            url: req.url.to_string(),
            headers: req.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            form: req.form.map(|f| f.to_vec()).unwrap_or_default(),
        };
        self.seen.lock().unwrap().push(seen.clone());
        let handlers = self.handlers.lock().unwrap();
        let reply = handlers.iter().find_map(|h| h(&seen));
        Ok(reply.unwrap_or_else(|| HttpResponse { status: 404, url: seen.url.clone(), body: String::new() }))
    }
}

pub fn ok(url: &str, body: &str) -> HttpResponse {
    HttpResponse { status: 200, url: url.to_string(), body: body.to_string() }
}

pub fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

/// Login page plus a credential check that redirects to the home page.
pub fn with_login(portal: &FakePortal) {
    portal.page(
        LOGIN_PATH,
        r#"<form id="form1"><input type="hidden" name="__VIEWSTATE" value="login-vs" />
           <input name="tb_user" value="" /><input name="tb_password" type="password" />
           <input type="submit" name="bt_login" value="Login" /></form>"#,
    );
    portal.on(|r| {
        (r.method == Method::Post && r.url.ends_with(LOGIN_PATH)).then(|| {
            if r.field(LOGIN_USER_FIELD) == Some("alice") && r.field(LOGIN_PASSWORD_FIELD) == Some("secret") {
                ok(&url("/eec/Default.aspx"), "<a href='Logout.aspx'>Logout</a>")
            } else {
                ok(&url(LOGIN_PATH), "Invalid user or password")
            }
        })
    });
}

/// The data page as served on GET: a form with view state and the station dropdown.
pub fn data_page(viewstate: &str, stations: &[(&str, &str)], extra: &str) -> String {
    let options: String = stations
        .iter()
        .map(|(code, name)| format!(r#"<option value="{code}">{code} - {name}</option>"#))
        .collect();
    format!(
        r#"<html><body><form method="post" id="form1">
        <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="{viewstate}" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" value="GEN1" />
        <input type="hidden" name="__EVENTVALIDATION" value="EV1" />
        <select name="ctl00$ContentPlaceHolder1$dl_RAINGAUGE" id="ctl00_ContentPlaceHolder1_dl_RAINGAUGE">
          <option value="">-- select --</option>{options}
        </select>
        {extra}
        </form></body></html>"#
    )
}

/// A results grid with `n` rows for one station and day, every ten minutes from midnight.
pub fn grid(station: &str, date: &str, n: usize) -> String {
    let mut h = String::from(
        r#"<table id="ctl00_ContentPlaceHolder1_gvWOR"><tr><th>CODE</th><th>NAME</th><th>LATEST DATA (UTC)</th><th>24HR (mm)</th><th>Temp (C)</th><th>Humidity (%)</th><th>Battery (V)</th></tr>"#,
    );
    for i in 0..n {
        let (hh, mm) = ((i * 10) / 60 % 24, (i * 10) % 60);
        h.push_str(&format!(
            "<tr><td>{station}</td><td>Rayong</td><td>{date} {hh:02}:{mm:02}:00</td><td>{}.0</td><td>27.5</td><td>80</td><td>12.6</td></tr>",
            i % 5
        ));
    }
    h.push_str("</table>");
    h
}

pub const SHOW_ALL: &str =
    r#"<button type="button" onclick="__doPostBack('ctl00$ContentPlaceHolder1$btShowAll','')">Show All Records</button>"#;

/// Partial-postback body carrying one panel.
pub fn delta(html: &str) -> String {
    format!("1|#||4|updatePanel|ctl00_UpdatePanel1|{}|{}|", html.len(), html)
}
