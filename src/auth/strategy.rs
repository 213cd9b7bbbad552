use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::credential::{Credential, rank_credentials};
use crate::auth::rules::{
    ERROR_SELECTORS, IDENTITY_SELECTORS, LOGIN_ERROR_TEXT, LOGIN_LINK_TEXTS, LOGIN_PATHS,
    LOGIN_URL_MARKERS, PASSWORD_SELECTORS, REGISTER_FIELD_SELECTOR, REGISTER_LINK_TEXTS,
    REGISTER_PATHS, REGISTER_SUCCESS_TEXTS, REGISTER_URL_MARKERS, RegistrationField,
    SUBMIT_SELECTORS, classify_registration_field, is_consent_checkbox, text_matches,
};
use crate::browser::page::{BrowserPage, ElementHandle, LoadState};
use crate::crawler::url_utils::{same_page, url_contains_any};
use crate::error::BrowserError;
use crate::interact::classifier::{EXAMPLE_NAME, EXAMPLE_PHONE, is_unsafe_text, synthetic_value};
use crate::interact::outcome::{ActionKind, InteractionLog, InteractionOutcome};
use crate::page::snapshot::{describe_input, is_fillable};

/// Progress of authentication within one cycle.
///
/// `NoAuthAttempted -> LoginAttempted -> LoginSucceeded | LoginFailed`,
/// `LoginFailed -> LoginAttempted` (next credential) or
/// `LoginFailed -> RegistrationAttempted -> RegistrationSucceeded | RegistrationFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    NoAuthAttempted,
    LoginAttempted,
    LoginSucceeded,
    LoginFailed,
    RegistrationAttempted,
    RegistrationSucceeded,
    RegistrationFailed,
}

impl AuthState {
    pub fn can_transition_to(self, next: AuthState) -> bool {
        use AuthState::*;
        matches!(
            (self, next),
            (NoAuthAttempted, LoginAttempted)
                | (LoginFailed, LoginAttempted)
                | (LoginAttempted, LoginSucceeded)
                | (LoginAttempted, LoginFailed)
                | (LoginFailed, RegistrationAttempted)
                | (RegistrationAttempted, RegistrationSucceeded)
                | (RegistrationAttempted, RegistrationFailed)
        )
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, AuthState::LoginSucceeded | AuthState::RegistrationSucceeded)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub nav_timeout: Duration,
    pub click_timeout: Duration,
    /// Best-effort network-idle wait after submitting
    pub idle_timeout: Duration,
    /// Best credential plus this many minus one alternates
    pub max_login_attempts: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            nav_timeout: Duration::from_secs(8),
            click_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(5),
            max_login_attempts: 4,
        }
    }
}

/// Result of a single login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Succeeded,
    Failed,
    /// No login page could be located; nothing was filled or submitted
    NoSurface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub state: AuthState,
    /// Credential that logged in or was registered
    pub credential: Option<Credential>,
    pub login_attempts: usize,
}

enum Attempt {
    NoSurface,
    IncompleteForm,
    Submitted { success: bool },
}

/// Tries discovered credentials against the app's login form, then falls
/// back to registering a fresh account.
///
/// Success checks are heuristics: a single-page app that keeps its URL after
/// a rejected login and shows no "invalid" text reads as a success.
pub struct AuthStrategy {
    base: Url,
    config: AuthConfig,
    state: AuthState,
    tried: HashSet<(String, String)>,
}

impl AuthStrategy {
    pub fn new(base: Url, config: AuthConfig) -> Self {
        Self {
            base,
            config,
            state: AuthState::NoAuthAttempted,
            tried: HashSet::new(),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    fn transition(&mut self, next: AuthState) {
        if !self.state.can_transition_to(next) {
            warn!("unexpected auth transition {:?} -> {:?}", self.state, next);
        }
        info!("auth: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Log in with the best credentials, retrying alternates, then register.
    pub fn authenticate(
        &mut self,
        page: &mut dyn BrowserPage,
        credentials: &[Credential],
        log: &mut InteractionLog,
    ) -> Result<AuthOutcome, BrowserError> {
        let mut attempts = 0;

        for credential in rank_credentials(credentials) {
            if attempts >= self.config.max_login_attempts {
                break;
            }
            if !self
                .tried
                .insert((credential.email.clone(), credential.password.clone()))
            {
                continue;
            }
            attempts += 1;

            match self.attempt_login(page, &credential, log)? {
                LoginResult::Succeeded => {
                    return Ok(AuthOutcome {
                        state: self.state,
                        credential: Some(credential),
                        login_attempts: attempts,
                    });
                }
                // Another credential will not make a login page appear
                LoginResult::NoSurface => break,
                LoginResult::Failed => {}
            }
        }

        if attempts == 0 {
            self.transition(AuthState::LoginAttempted);
            log.push(InteractionOutcome::failure(
                ActionKind::Login,
                None,
                "no credentials available",
            ));
            self.transition(AuthState::LoginFailed);
        }

        let fresh = Credential::synthesize();
        let registered = self.register(page, &fresh, log)?;

        Ok(AuthOutcome {
            state: self.state,
            credential: registered.then_some(fresh),
            login_attempts: attempts,
        })
    }

    // ------------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------------

    pub fn attempt_login(
        &mut self,
        page: &mut dyn BrowserPage,
        credential: &Credential,
        log: &mut InteractionLog,
    ) -> Result<LoginResult, BrowserError> {
        self.transition(AuthState::LoginAttempted);

        let (result, outcome) = match self.try_login(page, credential) {
            Ok(Attempt::Submitted { success: true }) => (
                LoginResult::Succeeded,
                InteractionOutcome::success(ActionKind::Login, Some(&credential.email)),
            ),
            Ok(Attempt::Submitted { success: false }) => (
                LoginResult::Failed,
                InteractionOutcome::failure(
                    ActionKind::Login,
                    Some(&credential.email),
                    "login rejected",
                ),
            ),
            Ok(Attempt::IncompleteForm) => (
                LoginResult::Failed,
                InteractionOutcome::failure(
                    ActionKind::Login,
                    Some(&credential.email),
                    "login form has no identity or password field",
                ),
            ),
            Ok(Attempt::NoSurface) => (
                LoginResult::NoSurface,
                InteractionOutcome::failure(ActionKind::Login, None, "no login page found"),
            ),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => (
                LoginResult::Failed,
                InteractionOutcome::failure(ActionKind::Login, Some(&credential.email), e),
            ),
        };

        log.push(outcome);
        self.transition(if result == LoginResult::Succeeded {
            AuthState::LoginSucceeded
        } else {
            AuthState::LoginFailed
        });
        Ok(result)
    }

    fn try_login(
        &mut self,
        page: &mut dyn BrowserPage,
        credential: &Credential,
    ) -> Result<Attempt, BrowserError> {
        if self.find_login_surface(page)?.is_none() {
            return Ok(Attempt::NoSurface);
        }

        let identity = first_visible(page, IDENTITY_SELECTORS)?;
        let password = first_visible(page, PASSWORD_SELECTORS)?;
        let (Some(identity), Some(password)) = (identity, password) else {
            return Ok(Attempt::IncompleteForm);
        };

        page.fill(&identity, &credential.email)?;
        page.fill(&password, &credential.password)?;
        self.submit(page, &password)?;

        Ok(Attempt::Submitted {
            success: self.login_succeeded(page)?,
        })
    }

    /// Locate a login page: the current URL, conventional paths, then a
    /// login link on the current page. Leaves the browser on the surface.
    pub fn find_login_surface(
        &mut self,
        page: &mut dyn BrowserPage,
    ) -> Result<Option<String>, BrowserError> {
        self.find_surface(page, LOGIN_URL_MARKERS, LOGIN_PATHS, LOGIN_LINK_TEXTS)
    }

    /// Not on a login URL, and no visible error mentions invalid input.
    pub fn login_succeeded(&self, page: &mut dyn BrowserPage) -> Result<bool, BrowserError> {
        let url = page.current_url()?;
        if url_contains_any(&url, LOGIN_URL_MARKERS) {
            debug!("still on login URL {}", url);
            return Ok(false);
        }
        for selector in ERROR_SELECTORS {
            for element in page.query_all(selector)? {
                if element.text.to_lowercase().contains(LOGIN_ERROR_TEXT) {
                    debug!("login error shown: {}", element.text.trim());
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register `credential` as a new account.
    pub fn register(
        &mut self,
        page: &mut dyn BrowserPage,
        credential: &Credential,
        log: &mut InteractionLog,
    ) -> Result<bool, BrowserError> {
        self.transition(AuthState::RegistrationAttempted);

        let outcome = match self.try_register(page, credential) {
            Ok(Attempt::Submitted { success: true }) => {
                InteractionOutcome::success(ActionKind::Register, Some(&credential.email))
            }
            Ok(Attempt::Submitted { success: false }) => InteractionOutcome::failure(
                ActionKind::Register,
                Some(&credential.email),
                "registration not confirmed",
            ),
            Ok(Attempt::IncompleteForm) => InteractionOutcome::failure(
                ActionKind::Register,
                Some(&credential.email),
                "registration form has no fillable fields",
            ),
            Ok(Attempt::NoSurface) => {
                InteractionOutcome::failure(ActionKind::Register, None, "no registration page found")
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => InteractionOutcome::failure(ActionKind::Register, Some(&credential.email), e),
        };

        let success = outcome.success;
        log.push(outcome);
        self.transition(if success {
            AuthState::RegistrationSucceeded
        } else {
            AuthState::RegistrationFailed
        });
        Ok(success)
    }

    fn try_register(
        &mut self,
        page: &mut dyn BrowserPage,
        credential: &Credential,
    ) -> Result<Attempt, BrowserError> {
        let Some(surface) = self.find_registration_surface(page)? else {
            return Ok(Attempt::NoSurface);
        };

        let mut last_filled: Option<ElementHandle> = None;
        for field in page.query_all(REGISTER_FIELD_SELECTOR)? {
            if !is_fillable(&field) || !field.is_visible() {
                continue;
            }
            let identifier = format!(
                "{} {} {}",
                field.attribute("name").unwrap_or_default(),
                field.attribute("placeholder").unwrap_or_default(),
                field.attribute("id").unwrap_or_default()
            );
            let input_type = field.input_type();

            match input_type.as_str() {
                "checkbox" => {
                    if is_consent_checkbox(&identifier) && !field.checked {
                        recoverable(page.check(&field))?;
                    }
                    continue;
                }
                "radio" | "file" | "range" | "color" => continue,
                _ => {}
            }

            let value = match classify_registration_field(&identifier, &input_type) {
                Some(RegistrationField::Password | RegistrationField::ConfirmPassword) => {
                    credential.password.clone()
                }
                Some(RegistrationField::Email) => credential.email.clone(),
                Some(RegistrationField::FirstName) => "Test".into(),
                Some(RegistrationField::LastName) => "User".into(),
                Some(RegistrationField::Username) => credential.username(),
                Some(RegistrationField::Phone) => EXAMPLE_PHONE.into(),
                Some(RegistrationField::FullName) => EXAMPLE_NAME.into(),
                None => synthetic_value(&describe_input(&field)),
            };

            if recoverable(page.fill(&field, &value))?.is_some() {
                last_filled = Some(field);
            }
        }

        let Some(last_filled) = last_filled else {
            return Ok(Attempt::IncompleteForm);
        };

        self.submit(page, &last_filled)?;

        Ok(Attempt::Submitted {
            success: self.registration_succeeded(page, &surface)?,
        })
    }

    pub fn find_registration_surface(
        &mut self,
        page: &mut dyn BrowserPage,
    ) -> Result<Option<String>, BrowserError> {
        self.find_surface(page, REGISTER_URL_MARKERS, REGISTER_PATHS, REGISTER_LINK_TEXTS)
    }

    /// Success text on the page, or the browser left the registration URL.
    pub fn registration_succeeded(
        &self,
        page: &mut dyn BrowserPage,
        surface: &str,
    ) -> Result<bool, BrowserError> {
        let url = page.current_url()?;
        if !same_page(&url, surface) {
            return Ok(true);
        }
        let body = page
            .query("body")?
            .map(|b| b.text.to_lowercase())
            .unwrap_or_default();
        Ok(REGISTER_SUCCESS_TEXTS.iter().any(|t| body.contains(t)))
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    /// Three tiers: current URL, conventional paths, a matching link or
    /// button on the page the browser was on.
    fn find_surface(
        &mut self,
        page: &mut dyn BrowserPage,
        markers: &[&str],
        paths: &[&str],
        link_texts: &[&str],
    ) -> Result<Option<String>, BrowserError> {
        let current = page.current_url()?;
        if url_contains_any(&current, markers) {
            return Ok(Some(current));
        }

        for path in paths {
            let Ok(target) = self.base.join(path) else {
                continue;
            };
            match page.goto(target.as_str(), self.config.nav_timeout) {
                Ok(()) => {
                    if has_password_field(page)? {
                        debug!("found auth surface at {}", target);
                        return Ok(Some(page.current_url()?));
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("{} unreachable: {}", target, e),
            }
        }

        recoverable(page.goto(&current, self.config.nav_timeout))?;
        let candidates = page.query_all("a, button")?;
        let link = candidates.into_iter().find(|el| {
            let text = el.visible_text();
            el.is_interactable()
                && !is_unsafe_text(&text)
                && (text_matches(&text, link_texts)
                    || el
                        .attribute("href")
                        .is_some_and(|href| url_contains_any(href, markers)))
        });

        let Some(link) = link else {
            return Ok(None);
        };
        recoverable(page.click(&link, self.config.click_timeout))?;
        let _ = page.wait_for_load_state(LoadState::Load, self.config.nav_timeout);
        if has_password_field(page)? {
            return Ok(Some(page.current_url()?));
        }
        Ok(None)
    }

    /// Click the first visible submit control, else press Enter in `field`.
    fn submit(&self, page: &mut dyn BrowserPage, field: &ElementHandle) -> Result<(), BrowserError> {
        let clicked = match first_visible(page, SUBMIT_SELECTORS)? {
            Some(button) => recoverable(page.click(&button, self.config.click_timeout))?.is_some(),
            None => false,
        };
        if !clicked {
            page.press(Some(field), "Enter")?;
        }
        let _ = page.wait_for_load_state(LoadState::NetworkIdle, self.config.idle_timeout);
        Ok(())
    }
}

/// First visible element across an ordered selector list.
fn first_visible(
    page: &mut dyn BrowserPage,
    selectors: &[&str],
) -> Result<Option<ElementHandle>, BrowserError> {
    for selector in selectors {
        if let Some(el) = page.query_all(selector)?.into_iter().find(|e| e.is_visible()) {
            return Ok(Some(el));
        }
    }
    Ok(None)
}

fn has_password_field(page: &mut dyn BrowserPage) -> Result<bool, BrowserError> {
    Ok(first_visible(page, PASSWORD_SELECTORS)?.is_some())
}

/// Propagate fatal errors, turn the rest into `None`.
fn recoverable<T>(result: Result<T, BrowserError>) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("ignoring recoverable browser error: {}", e);
            Ok(None)
        }
    }
}
