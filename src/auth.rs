use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{STATUS_PATH, VERIFY_PATH};
use crate::error::AppError;
use crate::task::BackgroundTask;

pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str) -> bool;
}

#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    api_base: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    password: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Text(DateTime<Utc>),
    Millis(i64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    next_change: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthStatus {
    pub next_change: DateTime<Utc>,
}

impl AuthClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    pub fn status(&self) -> Result<AuthStatus, AppError> {
        let url = format!("{}{STATUS_PATH}", self.api_base);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("Failed requesting {url}"))
            .map_err(|err| AppError::Network(format!("{err:#}")))?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Status request returned HTTP {}",
                response.status()
            )));
        }
        let payload: StatusResponse = response
            .json()
            .context("Failed decoding status response")
            .map_err(|err| AppError::Network(format!("{err:#}")))?;
        payload.into_status()
    }
}

impl PasswordVerifier for AuthClient {
    /// Any 2xx means the password is accepted; transport errors count as a
    /// rejection.
    fn verify(&self, password: &str) -> bool {
        let url = format!("{}{VERIFY_PATH}", self.api_base);
        match self.http.post(&url).json(&VerifyRequest { password }).send() {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    log::warn!("Password rejected with HTTP {}", response.status());
                }
                ok
            }
            Err(err) => {
                log::error!("Authentication error: {err}");
                false
            }
        }
    }
}

impl StatusResponse {
    fn into_status(self) -> Result<AuthStatus, AppError> {
        let next_change = match self.next_change {
            Timestamp::Text(at) => at,
            Timestamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| AppError::Network(format!("Invalid timestamp {ms}")))?,
        };
        Ok(AuthStatus { next_change })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining { hours: i64, minutes: i64 },
    /// The rotation instant has passed.
    Updating,
}

impl Countdown {
    pub fn until(next_change: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = next_change - now;
        if left <= chrono::Duration::zero() {
            return Countdown::Updating;
        }
        Countdown::Remaining {
            hours: left.num_hours(),
            minutes: left.num_minutes() % 60,
        }
    }

    pub fn label(&self) -> Option<String> {
        match self {
            Countdown::Remaining { hours, minutes } => Some(format!("{hours}h{minutes}m")),
            Countdown::Updating => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Verifying,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Unlocked,
    Rejected,
}

/// Password gate in front of the main view. The accepted password is kept for
/// the lifetime of the process only.
pub struct AuthGate {
    verifier: Arc<dyn PasswordVerifier>,
    state: GateState,
    remembered: Option<String>,
    error_visible: bool,
    pending: Option<(String, BackgroundTask<bool>)>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn PasswordVerifier>, remembered: Option<String>) -> Self {
        Self {
            verifier,
            state: GateState::Locked,
            remembered: remembered.filter(|p| !p.trim().is_empty()),
            error_visible: false,
            pending: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub fn error_visible(&self) -> bool {
        self.error_visible
    }

    /// Re-verifies the remembered password, if there is one.
    pub fn resume(&mut self) {
        if let Some(password) = self.remembered.clone() {
            self.submit(&password);
        }
    }

    pub fn submit(&mut self, password: &str) {
        if password.is_empty() || self.state == GateState::Verifying {
            return;
        }
        let verifier = self.verifier.clone();
        let candidate = password.to_string();
        let task = BackgroundTask::spawn(move || Ok(verifier.verify(&candidate)));
        self.pending = Some((password.to_string(), task));
        self.state = GateState::Verifying;
    }

    pub fn poll(&mut self) -> Option<AuthEvent> {
        let (_, task) = self.pending.as_mut()?;
        let result = task.try_take()?;
        let (password, _) = self.pending.take()?;
        let accepted = matches!(result, Ok(true));
        if accepted {
            log::info!("Password accepted");
            self.remembered = Some(password);
            self.state = GateState::Unlocked;
            self.error_visible = false;
            Some(AuthEvent::Unlocked)
        } else {
            self.remembered = None;
            self.state = GateState::Locked;
            self.error_visible = true;
            Some(AuthEvent::Rejected)
        }
    }
}

#[cfg(test)]
impl AuthGate {
    fn remembered(&self) -> Option<&str> {
        self.remembered.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct FixedPassword(&'static str);

    impl PasswordVerifier for FixedPassword {
        fn verify(&self, password: &str) -> bool {
            password == self.0
        }
    }

    fn settle(gate: &mut AuthGate) -> Option<AuthEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(event) = gate.poll() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn correct_password_unlocks_and_is_remembered() {
        let mut gate = AuthGate::new(Arc::new(FixedPassword("secret")), None);
        gate.submit("secret");
        assert_eq!(gate.state(), GateState::Verifying);
        assert_eq!(settle(&mut gate), Some(AuthEvent::Unlocked));
        assert!(gate.is_unlocked());
        assert_eq!(gate.remembered(), Some("secret"));
    }

    #[test]
    fn wrong_password_clears_remembered_credential() {
        let mut gate = AuthGate::new(Arc::new(FixedPassword("secret")), Some("stale".into()));
        gate.resume();
        assert_eq!(settle(&mut gate), Some(AuthEvent::Rejected));
        assert_eq!(gate.state(), GateState::Locked);
        assert!(gate.error_visible());
        assert_eq!(gate.remembered(), None);
    }

    #[test]
    fn empty_password_is_ignored() {
        let mut gate = AuthGate::new(Arc::new(FixedPassword("secret")), Some("  ".into()));
        gate.resume();
        gate.submit("");
        assert_eq!(gate.state(), GateState::Locked);
        assert!(gate.poll().is_none());
    }

    #[test]
    fn countdown_splits_hours_and_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2026, 1, 1, 13, 25, 30).unwrap();
        let countdown = Countdown::until(next, now);
        assert_eq!(countdown, Countdown::Remaining { hours: 3, minutes: 25 });
        assert_eq!(countdown.label().as_deref(), Some("3h25m"));
        assert_eq!(Countdown::until(now, next), Countdown::Updating);
        assert_eq!(Countdown::until(now, now), Countdown::Updating);
    }

    #[test]
    fn status_accepts_text_and_millis() {
        let text: StatusResponse =
            serde_json::from_str(r#"{ "nextChange": "2026-01-01T00:00:00Z" }"#).unwrap();
        let millis: StatusResponse =
            serde_json::from_str(r#"{ "nextChange": 1767225600000 }"#).unwrap();
        assert_eq!(
            text.into_status().unwrap(),
            millis.into_status().unwrap()
        );
    }
}
