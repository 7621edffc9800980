// src/core/net.rs
//! HTTP transport seam.
//!
//! Everything network-touching goes through [`Transport`], so the protocol code can
//! be driven by a scripted transport in tests. [`ReqwestTransport`] is the real one:
//! a blocking client whose cookie store *is* the authenticated session.

use std::time::Duration;

use tracing::trace;

use crate::config::consts::USER_AGENT;
use crate::error::{Result, ScrapeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing request. Form fields are sent urlencoded, in order.
#[derive(Clone, Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub form: Option<&'a [(String, String)]>,
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self) -> Result<Self> {
        if self.status >= 400 {
            Err(ScrapeError::Http { status: self.status, url: self.url })
        } else {
            Ok(self)
        }
    }
}

pub trait Transport: Send + Sync {
    /// Perform one request. No retries here; see `core::retry`.
    fn send(&self, req: &Request<'_>) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, req: &Request<'_>) -> Result<HttpResponse> {
        (**self).send(req)
    }
}

/// Blocking reqwest client with a cookie jar and redirects followed.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, req: &Request<'_>) -> Result<HttpResponse> {
        let mut builder = match req.method {
            Method::Get => self.client.get(req.url),
            Method::Post => self.client.post(req.url),
        };
        builder = builder.timeout(req.timeout);
        for (k, v) in req.headers {
            builder = builder.header(*k, *v);
        }
        if let Some(form) = req.form {
            builder = builder.form(form);
        }

        let resp = builder.send()?;
        let status = resp.status().as_u16();
        let url = resp.url().to_string();
        let body = resp.text()?;
        trace!(status, %url, bytes = body.len(), "response");
        Ok(HttpResponse { status, url, body })
    }
}
