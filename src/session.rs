// src/session.rs
use tracing::{debug, info};

use crate::config::consts::*;
use crate::config::options::{Credentials, RetryPolicy};
use crate::core::{Executor, ReqwestTransport};
use crate::error::{Result, ScrapeError};
use crate::postback::form::named_inputs;

/// An authenticated portal session.
///
/// The cookie jar lives in the transport behind the executor. There is no known
/// expiry; the session is used until a request says otherwise. Not shared between
/// threads: each worker logs in on its own.
pub struct Session {
    exec: Executor,
    base: String,
}

impl Session {
    /// Log in against the live portal with a fresh cookie jar.
    pub fn connect(creds: &Credentials, policy: RetryPolicy) -> Result<Self> {
        let exec = Executor::new(Box::new(ReqwestTransport::new()?), policy);
        Self::login(exec, BASE, creds)
    }

    /// GET the login form, replay every named input with the credentials
    /// injected, POST it back and look for an authenticated marker.
    pub fn login(exec: Executor, base: &str, creds: &Credentials) -> Result<Self> {
        let login_url = join!(base, LOGIN_PATH);

        debug!(url = %login_url, "fetching login form");
        let page = exec.get(&login_url, &[])?.error_for_status()?;

        let mut payload: Vec<(String, String)> = named_inputs(&page.body)
            .into_iter()
            .filter(|(k, _)| k != LOGIN_USER_FIELD && k != LOGIN_PASSWORD_FIELD)
            .collect();
        payload.push((s!(LOGIN_USER_FIELD), creds.user.clone()));
        payload.push((s!(LOGIN_PASSWORD_FIELD), creds.password.clone()));

        debug!(url = %login_url, fields = payload.len(), "posting credentials");
        let resp = exec.post_form(&login_url, &payload, &[])?;

        if is_authenticated(&resp.url, &resp.body) {
            info!(user = %creds.user, "logged in");
            Ok(Self { exec, base: s!(base) })
        } else {
            Err(ScrapeError::Authentication(format!(
                "no authenticated marker after login as {} (landed on {})",
                creds.user, resp.url
            )))
        }
    }

    pub fn url(&self, path: &str) -> String {
        join!(&self.base, path)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn exec(&self) -> &Executor {
        &self.exec
    }
}

/// Success is a redirect to the home page or a logout affordance in the page,
/// never the status code.
pub fn is_authenticated(final_url: &str, body: &str) -> bool {
    final_url.contains(LOGIN_OK_URL_MARKER) || body.to_ascii_lowercase().contains(LOGIN_OK_BODY_MARKER)
}
