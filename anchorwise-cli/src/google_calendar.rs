use anchorwise_core::{CalendarEvent, CalendarSource, EventTime, SourceError};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use google_calendar3::CalendarHub;
use google_calendar3::api::{Event, EventDateTime};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::state::ensure_anchorwise_home;

// Same oauth2 version google-calendar3 was built against.
use google_calendar3::oauth2;

type Hub = CalendarHub<HttpsConnector<HttpConnector>>;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const LOOPBACK_REDIRECT: &str = "http://localhost";
const MAX_RESULTS: i32 = 50;

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

fn default_redirect_uris() -> Vec<String> {
    vec![LOOPBACK_REDIRECT.to_string()]
}

/// Desktop-app OAuth client, stored at `~/.anchorwise/google_oauth.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleOAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_redirect_uris")]
    pub redirect_uris: Vec<String>,
}

impl GoogleOAuthClient {
    /// Google's endpoints with a loopback redirect. Rejects input that is
    /// obviously not a client id/secret pair.
    pub fn desktop(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = client_secret.into().trim().to_string();
        if !client_id.ends_with(".apps.googleusercontent.com") {
            bail!("client_id should end with .apps.googleusercontent.com");
        }
        if client_secret.len() < 10 {
            bail!("client_secret looks truncated");
        }
        Ok(Self {
            client_id,
            client_secret,
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: default_redirect_uris(),
        })
    }

    fn path() -> Result<PathBuf> {
        Ok(ensure_anchorwise_home()?.join("google_oauth.json"))
    }

    /// `None` until `anchorwise calendar connect` has run.
    pub fn load() -> Result<Option<Self>> {
        let p = Self::path()?;
        if !p.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        let client = serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
        Ok(Some(client))
    }

    pub fn save(&self) -> Result<()> {
        let p = Self::path()?;
        fs::write(&p, serde_json::to_string_pretty(self)?).with_context(|| format!("write {}", p.display()))
    }

    fn application_secret(&self) -> oauth2::ApplicationSecret {
        oauth2::ApplicationSecret {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_uri: self.auth_uri.clone(),
            token_uri: self.token_uri.clone(),
            redirect_uris: self.redirect_uris.clone(),
            ..Default::default()
        }
    }

    /// Authorized hub; runs the browser flow when no cached token exists.
    async fn hub(&self) -> Result<Hub> {
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            self.application_secret(),
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(token_cache_path()?)
        .build()
        .await
        .context("building oauth authenticator")?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Ok(CalendarHub::new(hyper::Client::builder().build(connector), auth))
    }
}

fn token_cache_path() -> Result<PathBuf> {
    Ok(ensure_anchorwise_home()?.join("google_token_cache.json"))
}

fn read_field(label: &str) -> Result<String> {
    print!("{label}: ");
    std::io::stdout().flush().ok();
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s)
}

/// `calendar connect`: store a Desktop-app OAuth client and cache a token.
pub async fn connect_interactive() -> Result<()> {
    println!("Paste a Google \"Desktop app\" OAuth client (console.cloud.google.com/apis/credentials).");
    let client = GoogleOAuthClient::desktop(read_field("client_id")?, read_field("client_secret")?)?;
    client.save()?;
    client.hub().await?;
    println!("Connected. Token cached at {}", token_cache_path()?.display());
    Ok(())
}

/// Timed events carry an instant; all-day events only a date (floating midnight).
fn event_time(dt: &EventDateTime) -> Option<EventTime> {
    if let Some(at) = dt.date_time {
        return Some(EventTime::from(at));
    }
    dt.date.map(|d| EventTime::Floating(d.and_time(NaiveTime::MIN)))
}

fn to_calendar_event(ev: &Event) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        start: event_time(ev.start.as_ref()?)?,
        end: event_time(ev.end.as_ref()?)?,
        summary: ev.summary.clone().unwrap_or_else(|| "Untitled".to_string()),
    })
}

/// Busy events from the user's Google calendar.
#[derive(Debug, Clone)]
pub struct GoogleCalendarSource {
    calendar_id: String,
}

impl GoogleCalendarSource {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
        }
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarSource {
    async fn fetch_busy_events(&self, _user_id: &str, days_ahead: u32) -> Result<Vec<CalendarEvent>, SourceError> {
        let client = GoogleOAuthClient::load()
            .map_err(|e| SourceError::unavailable(format!("{e:#}")))?
            .ok_or(SourceError::NotConnected)?;
        let hub = client
            .hub()
            .await
            .map_err(|e| SourceError::unavailable(format!("{e:#}")))?;

        let now = Utc::now();
        let mut call = hub
            .events()
            .list(&self.calendar_id)
            .time_min(now)
            .single_events(true)
            .order_by("startTime")
            .max_results(MAX_RESULTS);
        if let Some(until) = Duration::try_days(i64::from(days_ahead)).and_then(|d| now.checked_add_signed(d)) {
            call = call.time_max(until);
        }
        let (_, events) = call
            .doit()
            .await
            .map_err(|e| SourceError::unavailable(format!("listing {}: {e}", self.calendar_id)))?;

        let items = events.items.unwrap_or_default();
        let converted: Vec<CalendarEvent> = items.iter().filter_map(to_calendar_event).collect();
        if converted.len() < items.len() {
            tracing::warn!(skipped = items.len() - converted.len(), "google events without start/end");
        }
        Ok(converted)
    }
}
