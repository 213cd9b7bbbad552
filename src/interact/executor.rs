use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};
use url::Url;

use crate::browser::page::{BrowserPage, ElementHandle, LoadState};
use crate::crawler::url_utils::same_page;
use crate::error::BrowserError;
use crate::interact::classifier::{is_external_link, is_unsafe_text, synthetic_value};
use crate::interact::outcome::{ActionKind, InteractionOutcome};
use crate::page::page_model::{FormDescriptor, PageSnapshot};
use crate::page::selector::resolve_selector;
use crate::page::snapshot::{describe_input, snapshot_page};

/// Close buttons tried, in order, after every click.
pub const MODAL_CLOSE_SELECTORS: &[&str] = &[
    "[aria-label=\"Close\"]",
    "[aria-label=\"close\"]",
    "button.close",
    "button.btn-close",
    ".modal-close",
    "[data-dismiss=\"modal\"]",
    "[data-bs-dismiss=\"modal\"]",
    ".dialog-close",
];

pub const CLICKABLE_SELECTOR: &str =
    "button, a[href], [role=\"button\"], input[type=\"submit\"], input[type=\"button\"]";

/// Value given to `<input type="range">`.
pub const RANGE_VALUE: &str = "50";

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub click_timeout: Duration,
    pub nav_timeout: Duration,
    /// Wait after a click for a possible navigation to settle
    pub settle_timeout: Duration,
    /// Upper bound on clicks in one `click_all_elements` sweep
    pub max_clicks_per_page: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            click_timeout: Duration::from_secs(3),
            nav_timeout: Duration::from_secs(8),
            settle_timeout: Duration::from_secs(2),
            max_clicks_per_page: 50,
        }
    }
}

/// A single action addressed by selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate { url: String },
    Click { selector: String },
    Fill { selector: String },
    SubmitForm { selector: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Destructive or session-ending text
    Unsafe,
    /// Already acted upon in this sweep
    Duplicate,
    ExternalLink,
    NotVisible,
    /// Uploads are never synthesized
    FileInput,
    /// Select without a non-placeholder option
    NoOptions,
    AlreadyChecked,
}

/// Result of one action: an outcome for the log, or a deliberate skip that
/// never reaches the log.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Done(InteractionOutcome),
    Skipped(SkipReason),
}

impl Execution {
    pub fn outcome(&self) -> Option<&InteractionOutcome> {
        match self {
            Execution::Done(o) => Some(o),
            Execution::Skipped(_) => None,
        }
    }

    pub fn into_outcome(self) -> Option<InteractionOutcome> {
        match self {
            Execution::Done(o) => Some(o),
            Execution::Skipped(_) => None,
        }
    }
}

/// Identity of a clickable element for duplicate suppression: first class
/// token, visible text, href and id.
pub fn action_fingerprint(element: &ElementHandle) -> String {
    let class = element
        .attribute("class")
        .and_then(|c| c.split_whitespace().next())
        .unwrap_or_default();
    let mut hasher = Sha1::new();
    for part in [
        class,
        element.visible_text().as_str(),
        element.attribute("href").unwrap_or_default(),
        element.attribute("id").unwrap_or_default(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Performs clicks, fills and submits against one page. All failures end up
/// in the returned outcome; only a dead browser is surfaced as an error, and
/// only from the bulk sweeps.
pub struct InteractionExecutor {
    config: ExecutorConfig,
    base: Url,
    rng: StdRng,
    acted: HashSet<String>,
    discovered: Vec<PageSnapshot>,
}

impl InteractionExecutor {
    pub fn new(base: Url, config: ExecutorConfig) -> Self {
        Self::with_rng(base, config, StdRng::from_entropy())
    }

    /// Deterministic option choice, for tests.
    pub fn with_seed(base: Url, config: ExecutorConfig, seed: u64) -> Self {
        Self::with_rng(base, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(base: Url, config: ExecutorConfig, rng: StdRng) -> Self {
        Self {
            config,
            base,
            rng,
            acted: HashSet::new(),
            discovered: Vec::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Forget which elements were acted upon. Called at the start of each
    /// full-page sweep.
    pub fn begin_sweep(&mut self) {
        self.acted.clear();
    }

    /// Pages reached as a side effect of clicks since the last call.
    pub fn take_discovered(&mut self) -> Vec<PageSnapshot> {
        std::mem::take(&mut self.discovered)
    }

    // ------------------------------------------------------------------------
    // Single actions
    // ------------------------------------------------------------------------

    pub fn execute(&mut self, page: &mut dyn BrowserPage, action: &Action) -> Execution {
        match action {
            Action::Navigate { url } => match page.goto(url, self.config.nav_timeout) {
                Ok(()) => Execution::Done(InteractionOutcome::success(ActionKind::Navigate, Some(url))),
                Err(e) => Execution::Done(InteractionOutcome::failure(ActionKind::Navigate, Some(url), e)),
            },
            Action::Click { selector } => match locate(page, selector) {
                Ok(element) => self.click_element(page, &element),
                Err(e) => Execution::Done(InteractionOutcome::failure(ActionKind::Click, Some(selector), e)),
            },
            Action::Fill { selector } => match locate(page, selector) {
                Ok(element) => self.fill_element(page, &element),
                Err(e) => Execution::Done(InteractionOutcome::failure(ActionKind::Fill, Some(selector), e)),
            },
            Action::SubmitForm { selector } => match locate(page, selector) {
                Ok(form) => self.submit_form_element(page, &form),
                Err(e) => Execution::Done(InteractionOutcome::failure(
                    ActionKind::SubmitForm,
                    Some(selector),
                    e,
                )),
            },
        }
    }

    /// Click an element unless its text marks it destructive.
    pub fn click_element(&mut self, page: &mut dyn BrowserPage, element: &ElementHandle) -> Execution {
        self.click_as(page, element, ActionKind::Click)
    }

    fn click_as(&mut self, page: &mut dyn BrowserPage, element: &ElementHandle, kind: ActionKind) -> Execution {
        let selector = resolve_selector(element);
        let text = element.visible_text();

        if is_unsafe_text(&text) {
            debug!("skipping unsafe element {} ('{}')", selector, text);
            return Execution::Skipped(SkipReason::Unsafe);
        }
        if !element.is_interactable() {
            return Execution::Done(InteractionOutcome::failure(
                kind,
                Some(&selector),
                "element is not visible",
            ));
        }

        let origin = match page.current_url() {
            Ok(url) => url,
            Err(e) => return Execution::Done(InteractionOutcome::failure(kind, Some(&selector), e)),
        };

        if let Err(e) = page.click(element, self.config.click_timeout) {
            self.dismiss_modals(page);
            return Execution::Done(InteractionOutcome::failure(kind, Some(&selector), e));
        }

        let _ = page.wait_for_load_state(LoadState::Load, self.config.settle_timeout);

        let outcome = self.follow_navigation(
            page,
            &origin,
            InteractionOutcome::success(kind, Some(&selector)),
        );
        self.dismiss_modals(page);
        Execution::Done(outcome)
    }

    /// If the page left `origin`, snapshot the destination, go back and
    /// record where the action led.
    fn follow_navigation(
        &mut self,
        page: &mut dyn BrowserPage,
        origin: &str,
        outcome: InteractionOutcome,
    ) -> InteractionOutcome {
        match page.current_url() {
            Ok(after) if !same_page(origin, &after) => {
                debug!(
                    "{} navigated to {}",
                    outcome.element.as_deref().unwrap_or("action"),
                    after
                );
                match snapshot_page(page, &self.base) {
                    Ok(snapshot) => self.discovered.push(snapshot),
                    Err(e) => warn!("could not snapshot {}: {}", after, e),
                }
                self.restore(page, origin);
                outcome.with_navigation(after)
            }
            Ok(_) => outcome,
            Err(e) => {
                warn!("could not read URL after action: {}", e);
                outcome
            }
        }
    }

    /// Fill one field with a synthetic value, picking options, checking
    /// boxes and skipping uploads as appropriate.
    pub fn fill_element(&mut self, page: &mut dyn BrowserPage, element: &ElementHandle) -> Execution {
        let descriptor = describe_input(element);
        let selector = descriptor.selector.clone();

        if !element.is_visible() {
            return Execution::Skipped(SkipReason::NotVisible);
        }

        match descriptor.input_type.as_str() {
            "file" => {
                debug!("skipping file input {}", selector);
                Execution::Skipped(SkipReason::FileInput)
            }
            "select" => {
                if element.option_count <= 1 {
                    return Execution::Skipped(SkipReason::NoOptions);
                }
                // Index 0 is usually the placeholder option
                let index = self.rng.gen_range(1..element.option_count);
                to_execution(ActionKind::Select, &selector, page.select_option(element, index))
            }
            "checkbox" | "radio" => {
                if element.checked {
                    return Execution::Skipped(SkipReason::AlreadyChecked);
                }
                to_execution(ActionKind::Check, &selector, page.check(element))
            }
            "range" => to_execution(ActionKind::Fill, &selector, page.fill(element, RANGE_VALUE)),
            _ => {
                let value = synthetic_value(&descriptor);
                to_execution(ActionKind::Fill, &selector, page.fill(element, &value))
            }
        }
    }

    /// Submit a form described in a snapshot.
    pub fn submit_form(&mut self, page: &mut dyn BrowserPage, form: &FormDescriptor) -> Execution {
        self.execute(
            page,
            &Action::SubmitForm {
                selector: form.selector.clone(),
            },
        )
    }

    fn submit_form_element(&mut self, page: &mut dyn BrowserPage, form: &ElementHandle) -> Execution {
        let selector = resolve_selector(form);
        let submit = page
            .query_within(form, crate::page::snapshot::FORM_SUBMIT_SELECTOR)
            .map(|buttons| {
                buttons.into_iter().find(|b| {
                    let t = b.attribute("type").map(|t| t.to_lowercase());
                    t.as_deref() == Some("submit") || (t.is_none() && b.tag_name() == "button")
                })
            });

        match submit {
            Ok(Some(button)) => self.click_as(page, &button, ActionKind::SubmitForm),
            Ok(None) => {
                // No submit control: press Enter in the last fillable field
                let last_field = page
                    .query_within(form, crate::page::snapshot::FIELD_SELECTOR)
                    .ok()
                    .and_then(|fields| {
                        fields
                            .into_iter()
                            .filter(crate::page::snapshot::is_fillable)
                            .last()
                    });
                match last_field {
                    Some(field) => self.press_enter(page, &field, &selector),
                    None => Execution::Done(InteractionOutcome::failure(
                        ActionKind::SubmitForm,
                        Some(&selector),
                        "form has no submit control",
                    )),
                }
            }
            Err(e) => Execution::Done(InteractionOutcome::failure(ActionKind::SubmitForm, Some(&selector), e)),
        }
    }

    fn press_enter(&mut self, page: &mut dyn BrowserPage, field: &ElementHandle, selector: &str) -> Execution {
        let origin = match page.current_url() {
            Ok(url) => url,
            Err(e) => return Execution::Done(InteractionOutcome::failure(ActionKind::SubmitForm, Some(selector), e)),
        };
        if let Err(e) = page.press(Some(field), "Enter") {
            return Execution::Done(InteractionOutcome::failure(ActionKind::SubmitForm, Some(selector), e));
        }
        let _ = page.wait_for_load_state(LoadState::Load, self.config.settle_timeout);

        Execution::Done(self.follow_navigation(
            page,
            &origin,
            InteractionOutcome::success(ActionKind::SubmitForm, Some(selector)),
        ))
    }

    // ------------------------------------------------------------------------
    // Sweeps
    // ------------------------------------------------------------------------

    /// Fill every field of every form on the snapshot, optionally submitting
    /// each form afterwards.
    pub fn fill_forms(
        &mut self,
        page: &mut dyn BrowserPage,
        snapshot: &PageSnapshot,
        submit: bool,
    ) -> Result<Vec<InteractionOutcome>, BrowserError> {
        let mut outcomes = Vec::new();

        for form in &snapshot.forms {
            for field in &form.fields {
                let element = match page.query(&field.selector) {
                    Ok(Some(el)) => el,
                    Ok(None) => {
                        debug!("field {} disappeared", field.selector);
                        continue;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        outcomes.push(InteractionOutcome::failure(ActionKind::Fill, Some(&field.selector), e));
                        continue;
                    }
                };
                outcomes.extend(self.fill_element(page, &element).into_outcome());
            }

            if submit && !form.fields.is_empty() {
                outcomes.extend(self.submit_form(page, form).into_outcome());
            }
        }

        Ok(outcomes)
    }

    /// Click every safe, visible, same-origin clickable on the current page
    /// once. Handles go stale when a click navigates, so the page is
    /// re-queried after each navigation; already-acted elements are skipped.
    pub fn click_all_elements(
        &mut self,
        page: &mut dyn BrowserPage,
    ) -> Result<Vec<InteractionOutcome>, BrowserError> {
        self.begin_sweep();
        let mut outcomes = Vec::new();
        let mut clicks = 0;

        'sweep: loop {
            let elements = page.query_all(CLICKABLE_SELECTOR)?;
            let mut navigated = false;

            for element in elements {
                if clicks >= self.config.max_clicks_per_page {
                    break 'sweep;
                }
                if let Some(reason) = self.ineligible(&element) {
                    debug!(
                        "skipping {} ('{}'): {:?}",
                        resolve_selector(&element),
                        element.visible_text(),
                        reason
                    );
                    continue;
                }

                clicks += 1;
                if let Execution::Done(outcome) = self.click_element(page, &element) {
                    navigated = outcome.navigated_to.is_some();
                    outcomes.push(outcome);
                }
                if navigated {
                    continue 'sweep;
                }
            }

            break;
        }

        Ok(outcomes)
    }

    /// Marks the element as acted upon for this sweep as a side effect.
    fn ineligible(&mut self, element: &ElementHandle) -> Option<SkipReason> {
        if !self.acted.insert(action_fingerprint(element)) {
            return Some(SkipReason::Duplicate);
        }
        if is_unsafe_text(&element.visible_text()) {
            return Some(SkipReason::Unsafe);
        }
        if !element.is_interactable() {
            return Some(SkipReason::NotVisible);
        }
        if let Some(href) = element.attribute("href") {
            if is_external_link(&self.base, href) {
                return Some(SkipReason::ExternalLink);
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Recovery helpers
    // ------------------------------------------------------------------------

    /// Best-effort dialog dismissal: known close buttons, then Escape.
    pub fn dismiss_modals(&mut self, page: &mut dyn BrowserPage) {
        for selector in MODAL_CLOSE_SELECTORS {
            if let Ok(Some(close)) = page.query(selector) {
                if close.is_interactable() && page.click(&close, self.config.click_timeout).is_ok() {
                    debug!("dismissed dialog via {}", selector);
                    return;
                }
            }
        }
        let _ = page.press(None, "Escape");
    }

    /// Return to `origin` after a click navigated away: history first,
    /// direct navigation if that fails.
    fn restore(&mut self, page: &mut dyn BrowserPage, origin: &str) {
        let back = page.go_back(self.config.nav_timeout);
        let at_origin = back.is_ok() && page.current_url().is_ok_and(|u| same_page(&u, origin));
        if at_origin {
            return;
        }
        if let Err(e) = page.goto(origin, self.config.nav_timeout) {
            warn!("could not return to {}: {}", origin, e);
        }
    }
}

fn locate(page: &mut dyn BrowserPage, selector: &str) -> Result<ElementHandle, BrowserError> {
    page.query(selector)?.ok_or_else(|| BrowserError::ElementNotFound {
        selector: selector.to_string(),
    })
}

fn to_execution(kind: ActionKind, selector: &str, outcome: Result<(), BrowserError>) -> Execution {
    Execution::Done(match outcome {
        Ok(()) => InteractionOutcome::success(kind, Some(selector)),
        Err(e) => InteractionOutcome::failure(kind, Some(selector), e),
    })
}
