#![allow(dead_code)]

//! In-memory web app implementing `BrowserPage`, with a small CSS selector
//! matcher, form submission rules and a call journal for assertions.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use testfox::browser::launcher::BrowserLauncher;
use testfox::browser::page::{BoundingBox, BrowserPage, ElementHandle, LoadState};
use testfox::error::BrowserError;
use testfox::page::selector::resolve_selector;
use url::Url;

// ============================================================================
// DOM builder
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ClickEffect {
    Navigate(String),
    /// The click throws in the browser
    Fail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitEffect {
    Login,
    Register,
    Navigate(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    label: Option<String>,
    visible: bool,
    zero_size: bool,
    checked: bool,
    option_count: usize,
    on_click: Option<ClickEffect>,
    on_submit: Option<SubmitEffect>,
    children: Vec<Node>,
}

pub fn el(tag: &str) -> Node {
    Node {
        tag: tag.to_string(),
        attrs: BTreeMap::new(),
        text: String::new(),
        label: None,
        visible: true,
        zero_size: false,
        checked: false,
        option_count: 0,
        on_click: None,
        on_submit: None,
        children: Vec::new(),
    }
}

pub fn link(href: &str, text: &str) -> Node {
    el("a").attr("href", href).text(text)
}

pub fn button(text: &str) -> Node {
    el("button").attr("type", "button").text(text)
}

pub fn submit_button(text: &str) -> Node {
    el("button").attr("type", "submit").text(text)
}

pub fn input(input_type: &str, name: &str) -> Node {
    el("input").attr("type", input_type).attr("name", name)
}

impl Node {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Rendered but collapsed to a zero-area box.
    pub fn zero_size(mut self) -> Self {
        self.zero_size = true;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn options(mut self, count: usize) -> Self {
        self.option_count = count;
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    pub fn on_submit(mut self, effect: SubmitEffect) -> Self {
        self.on_submit = Some(effect);
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }
}

// ============================================================================
// Selector matching
// ============================================================================

#[derive(Debug, Clone)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(s: &str) -> Compound {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let mut compound = Compound::default();

    let start = i;
    while i < chars.len() && (is_ident(chars[i]) || chars[i] == '*') {
        i += 1;
    }
    if i > start {
        let tag: String = chars[start..i].iter().collect();
        if tag != "*" {
            compound.tag = Some(tag.to_lowercase());
        }
    }

    while i < chars.len() {
        match chars[i] {
            '#' | '.' => {
                let kind = chars[i];
                i += 1;
                let start = i;
                while i < chars.len() && is_ident(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if kind == '#' {
                    compound.id = Some(ident);
                } else {
                    compound.classes.push(ident);
                }
            }
            '[' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                let inner: String = chars[start..i].iter().collect();
                i += 1;
                compound.attrs.push(parse_attr(&inner));
            }
            _ => i += 1,
        }
    }
    compound
}

fn parse_attr(inner: &str) -> (String, AttrOp) {
    let unquote = |v: &str| v.trim().trim_matches('"').trim_matches('\'').to_string();
    if let Some((name, value)) = inner.split_once("*=") {
        return (name.trim().to_string(), AttrOp::Contains(unquote(value)));
    }
    if let Some((name, value)) = inner.split_once("^=") {
        return (name.trim().to_string(), AttrOp::Prefix(unquote(value)));
    }
    if let Some((name, value)) = inner.split_once('=') {
        return (name.trim().to_string(), AttrOp::Equals(unquote(value)));
    }
    (inner.trim().to_string(), AttrOp::Exists)
}

/// Split on whitespace outside brackets and quotes.
fn split_descendants(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut quoted = false;
    for c in selector.chars() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth -= 1,
            _ => {}
        }
        if c.is_whitespace() && depth == 0 && !quoted {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_selector_list(selector: &str) -> Vec<Vec<Compound>> {
    selector
        .split(',')
        .map(|complex| {
            split_descendants(complex)
                .iter()
                .map(|c| parse_compound(c))
                .collect()
        })
        .filter(|c: &Vec<Compound>| !c.is_empty())
        .collect()
}

// ============================================================================
// Live document
// ============================================================================

#[derive(Debug, Clone)]
struct LiveNode {
    node: Node,
    parent: Option<usize>,
    /// Own text plus all descendant text, like innerText
    text: String,
    visible: bool,
    checked: bool,
}

fn flatten(node: &Node, parent: Option<usize>, parent_visible: bool, out: &mut Vec<LiveNode>) -> String {
    let index = out.len();
    let visible = parent_visible && node.visible;
    out.push(LiveNode {
        node: Node {
            children: Vec::new(),
            ..node.clone()
        },
        parent,
        text: String::new(),
        visible,
        checked: node.checked,
    });
    let mut texts = vec![node.text.clone()];
    for child in &node.children {
        texts.push(flatten(child, Some(index), visible, out));
    }
    let text = texts
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    out[index].text = text.clone();
    text
}

fn compound_matches(compound: &Compound, live: &LiveNode) -> bool {
    let node = &live.node;
    if compound.tag.as_ref().is_some_and(|t| *t != node.tag.to_lowercase()) {
        return false;
    }
    if let Some(id) = &compound.id {
        if node.attrs.get("id") != Some(id) {
            return false;
        }
    }
    let classes: Vec<&str> = node
        .attrs
        .get("class")
        .map(|c| c.split_whitespace().collect())
        .unwrap_or_default();
    if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
        return false;
    }
    compound.attrs.iter().all(|(name, op)| {
        let value = node.attrs.get(name);
        match op {
            AttrOp::Exists => value.is_some(),
            AttrOp::Equals(v) => value == Some(v),
            AttrOp::Contains(v) => value.is_some_and(|x| x.contains(v.as_str())),
            AttrOp::Prefix(v) => value.is_some_and(|x| x.starts_with(v.as_str())),
        }
    })
}

#[derive(Debug, Clone)]
struct PageDef {
    title: String,
    body: Vec<Node>,
}

// ============================================================================
// Call journal
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Goto(String),
    Click { selector: String, text: String },
    Fill { selector: String, value: String },
    Check(String),
    Select { selector: String, index: usize },
    Press(String),
    Back,
    Screenshot(PathBuf),
    Close,
}

#[derive(Debug, Clone)]
pub struct LoginRule {
    pub email: String,
    pub password: String,
    pub success_path: String,
}

// ============================================================================
// Fake site
// ============================================================================

#[derive(Debug)]
struct SiteState {
    origin: Url,
    pages: HashMap<String, PageDef>,
    redirects: HashMap<String, String>,
    failing: HashSet<String>,
    crash_on: HashSet<String>,
    login: Option<LoginRule>,
    registration_success: Option<String>,
    registered: Vec<String>,
    /// Text of the `.error` banner shown after a rejected login
    banner: Option<String>,

    url: String,
    history: Vec<String>,
    generation: u64,
    dom: Vec<LiveNode>,
    values: HashMap<usize, String>,
    calls: Vec<Call>,
    closed: bool,
}

/// Shared handle so tests can inspect the journal after the code under
/// test has taken ownership of a clone.
#[derive(Debug, Clone)]
pub struct FakeSite {
    state: Rc<RefCell<SiteState>>,
}

impl FakeSite {
    pub fn new(origin: &str) -> Self {
        let origin = Url::parse(origin).expect("valid origin");
        Self {
            state: Rc::new(RefCell::new(SiteState {
                url: "about:blank".into(),
                origin,
                pages: HashMap::new(),
                redirects: HashMap::new(),
                failing: HashSet::new(),
                crash_on: HashSet::new(),
                login: None,
                registration_success: None,
                registered: Vec::new(),
                banner: None,
                history: Vec::new(),
                generation: 0,
                dom: Vec::new(),
                values: HashMap::new(),
                calls: Vec::new(),
                closed: false,
            })),
        }
    }

    pub fn page(self, path: &str, title: &str, body: Vec<Node>) -> Self {
        self.state.borrow_mut().pages.insert(
            path.to_string(),
            PageDef {
                title: title.to_string(),
                body,
            },
        );
        self
    }

    pub fn redirect(self, from: &str, to: &str) -> Self {
        self.state
            .borrow_mut()
            .redirects
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Navigation to `path` fails with a recoverable error.
    pub fn failing(self, path: &str) -> Self {
        self.state.borrow_mut().failing.insert(path.to_string());
        self
    }

    /// Navigation to `path` kills the browser.
    pub fn crash_on(self, path: &str) -> Self {
        self.state.borrow_mut().crash_on.insert(path.to_string());
        self
    }

    pub fn login_rule(self, email: &str, password: &str, success_path: &str) -> Self {
        self.state.borrow_mut().login = Some(LoginRule {
            email: email.to_string(),
            password: password.to_string(),
            success_path: success_path.to_string(),
        });
        self
    }

    pub fn registration_success(self, path: &str) -> Self {
        self.state.borrow_mut().registration_success = Some(path.to_string());
        self
    }

    pub fn base(&self) -> Url {
        self.state.borrow().origin.clone()
    }

    pub fn url(&self, path: &str) -> String {
        self.base().join(path).expect("valid path").to_string()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn gotos(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Goto(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn clicked_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Click { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Fill { selector, value } => Some((selector, value)),
                _ => None,
            })
            .collect()
    }

    pub fn selects(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Select { selector, index } => Some((selector, index)),
                _ => None,
            })
            .collect()
    }

    pub fn checks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Check(selector) => Some(selector),
                _ => None,
            })
            .collect()
    }

    pub fn registered(&self) -> Vec<String> {
        self.state.borrow().registered.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    pub fn current_path(&self) -> String {
        Url::parse(&self.state.borrow().url)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }
}

impl SiteState {
    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }

    fn render(&mut self) {
        let url = Url::parse(&self.url).ok();
        let def = url
            .as_ref()
            .filter(|u| u.origin() == self.origin.origin())
            .and_then(|u| self.pages.get(u.path()))
            .cloned()
            .unwrap_or_else(|| PageDef {
                title: "Not Found".into(),
                body: vec![el("h1").text("Not Found")],
            });

        let mut body = el("body").children(def.body);
        if let Some(banner) = &self.banner {
            body = body.child(el("div").class("error").text(banner));
        }
        let title = el("title").text(&def.title).hidden();

        self.generation += 1;
        self.values.clear();
        self.dom.clear();
        let mut dom = Vec::new();
        flatten(&el("html").child(title).child(body), None, true, &mut dom);
        self.dom = dom;
    }

    fn navigate(&mut self, target: &str, push_history: bool) -> Result<(), BrowserError> {
        let mut url = Url::parse(target).map_err(|e| BrowserError::InvalidUrl {
            url: target.to_string(),
            source: e,
        })?;
        if url.origin() == self.origin.origin() {
            let path = url.path().to_string();
            if self.crash_on.contains(&path) {
                self.closed = true;
                return Err(BrowserError::SessionIO("driver process exited".into()));
            }
            if self.failing.contains(&path) {
                return Err(BrowserError::SessionProtocol {
                    command: "navigate".into(),
                    error: format!("net::ERR_CONNECTION_RESET at {}", target),
                });
            }
            if let Some(to) = self.redirects.get(&path) {
                url = self.origin.join(to).map_err(|e| BrowserError::InvalidUrl {
                    url: to.clone(),
                    source: e,
                })?;
            }
        }
        self.banner = None;
        self.url = url.to_string();
        if push_history {
            self.history.push(self.url.clone());
        }
        self.render();
        Ok(())
    }

    fn index_of(&self, element: &ElementHandle) -> Result<usize, BrowserError> {
        let generation = element.handle >> 16;
        let index = (element.handle & 0xffff) as usize;
        if generation != self.generation || index >= self.dom.len() {
            return Err(BrowserError::StaleElement {
                handle: element.handle,
            });
        }
        Ok(index)
    }

    fn handle_for(&self, index: usize) -> ElementHandle {
        let live = &self.dom[index];
        let bounding_box = (live.visible && !live.node.zero_size).then_some(BoundingBox {
            x: 10.0,
            y: 10.0 + index as f64 * 20.0,
            width: 120.0,
            height: 18.0,
        });
        ElementHandle {
            handle: (self.generation << 16) | index as u64,
            tag: live.node.tag.clone(),
            attributes: live.node.attrs.clone(),
            text: live.text.clone(),
            label: live.node.label.clone(),
            visible: live.visible,
            bounding_box,
            checked: live.checked,
            option_count: live.node.option_count,
        }
    }

    fn is_descendant(&self, mut index: usize, ancestor: usize) -> bool {
        while let Some(parent) = self.dom[index].parent {
            if parent == ancestor {
                return true;
            }
            index = parent;
        }
        false
    }

    fn matches(&self, index: usize, complex: &[Compound]) -> bool {
        let Some((last, rest)) = complex.split_last() else {
            return false;
        };
        if !compound_matches(last, &self.dom[index]) {
            return false;
        }
        let mut cursor = self.dom[index].parent;
        for compound in rest.iter().rev() {
            loop {
                let Some(ancestor) = cursor else {
                    return false;
                };
                cursor = self.dom[ancestor].parent;
                if compound_matches(compound, &self.dom[ancestor]) {
                    break;
                }
            }
        }
        true
    }

    fn select(&self, selector: &str, scope: Option<usize>) -> Vec<ElementHandle> {
        let list = parse_selector_list(selector);
        (0..self.dom.len())
            .filter(|&i| scope.is_none_or(|s| self.is_descendant(i, s)))
            .filter(|&i| list.iter().any(|complex| self.matches(i, complex)))
            .map(|i| self.handle_for(i))
            .collect()
    }

    fn enclosing_form(&self, mut index: usize) -> Option<usize> {
        while let Some(parent) = self.dom[index].parent {
            if self.dom[parent].node.tag == "form" {
                return Some(parent);
            }
            index = parent;
        }
        None
    }

    fn submit(&mut self, form: usize) -> Result<(), BrowserError> {
        let node = &self.dom[form].node;
        let effect = node.on_submit.clone().or_else(|| {
            node.attrs
                .get("action")
                .map(|a| SubmitEffect::Navigate(a.clone()))
        });
        let values: Vec<String> = self.values.values().cloned().collect();

        match effect {
            Some(SubmitEffect::Navigate(path)) => {
                let target = self.resolve(&path)?;
                self.navigate(&target, true)
            }
            Some(SubmitEffect::Login) => {
                let accepted = self.login.as_ref().is_some_and(|rule| {
                    values.contains(&rule.email) && values.contains(&rule.password)
                });
                match (accepted, self.login.clone()) {
                    (true, Some(rule)) => {
                        let target = self.resolve(&rule.success_path)?;
                        self.navigate(&target, true)
                    }
                    _ => {
                        self.banner = Some("Invalid email or password".into());
                        self.render();
                        Ok(())
                    }
                }
            }
            Some(SubmitEffect::Register) => {
                let email = values.iter().find(|v| v.contains('@')).cloned();
                match (email, self.registration_success.clone()) {
                    (Some(email), Some(path)) => {
                        self.registered.push(email);
                        let target = self.resolve(&path)?;
                        self.navigate(&target, true)
                    }
                    _ => Ok(()),
                }
            }
            None => Ok(()),
        }
    }

    fn resolve(&self, href: &str) -> Result<String, BrowserError> {
        Url::parse(&self.url)
            .and_then(|u| u.join(href))
            .map(|u| u.to_string())
            .map_err(|e| BrowserError::InvalidUrl {
                url: href.to_string(),
                source: e,
            })
    }
}

impl BrowserPage for FakeSite {
    fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.calls.push(Call::Goto(url.to_string()));
        state.navigate(url, true)
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        let state = self.state.borrow();
        state.ensure_open()?;
        Ok(state.url.clone())
    }

    fn title(&mut self) -> Result<String, BrowserError> {
        let state = self.state.borrow();
        state.ensure_open()?;
        Ok(state
            .dom
            .iter()
            .find(|n| n.node.tag == "title")
            .map(|n| n.text.clone())
            .unwrap_or_default())
    }

    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.state.borrow();
        state.ensure_open()?;
        Ok(state.select(selector, None))
    }

    fn query_within(
        &mut self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.state.borrow();
        state.ensure_open()?;
        let scope = state.index_of(scope)?;
        Ok(state.select(selector, Some(scope)))
    }

    fn click(&mut self, element: &ElementHandle, timeout: Duration) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let index = state.index_of(element)?;
        state.calls.push(Call::Click {
            selector: resolve_selector(element),
            text: element.visible_text(),
        });

        let live = state.dom[index].clone();
        if !live.visible || live.node.zero_size {
            return Err(BrowserError::Timeout {
                operation: "click".into(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        match live.node.on_click {
            Some(ClickEffect::Navigate(path)) => {
                let target = state.resolve(&path)?;
                return state.navigate(&target, true);
            }
            Some(ClickEffect::Fail(message)) => {
                return Err(BrowserError::SessionProtocol {
                    command: "click".into(),
                    error: message,
                });
            }
            None => {}
        }

        let tag = live.node.tag.as_str();
        let kind = live.node.attrs.get("type").map(|t| t.to_lowercase());
        if tag == "a" {
            if let Some(href) = live.node.attrs.get("href") {
                let lower = href.to_lowercase();
                if !href.starts_with('#') && !lower.starts_with("javascript:") && !lower.starts_with("mailto:") {
                    let target = state.resolve(href)?;
                    return state.navigate(&target, true);
                }
            }
            return Ok(());
        }

        let submits = match tag {
            "button" => kind.is_none() || kind.as_deref() == Some("submit"),
            "input" => kind.as_deref() == Some("submit"),
            _ => false,
        };
        if submits {
            if let Some(form) = state.enclosing_form(index) {
                return state.submit(form);
            }
        }
        Ok(())
    }

    fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let index = state.index_of(element)?;
        state.calls.push(Call::Fill {
            selector: resolve_selector(element),
            value: value.to_string(),
        });
        state.values.insert(index, value.to_string());
        Ok(())
    }

    fn check(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let index = state.index_of(element)?;
        state.calls.push(Call::Check(resolve_selector(element)));
        state.dom[index].checked = true;
        Ok(())
    }

    fn select_option(&mut self, element: &ElementHandle, index: usize) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        let node = state.index_of(element)?;
        state.calls.push(Call::Select {
            selector: resolve_selector(element),
            index,
        });
        if index >= state.dom[node].node.option_count {
            return Err(BrowserError::SessionProtocol {
                command: "select".into(),
                error: format!("option index {} out of range", index),
            });
        }
        Ok(())
    }

    fn press(&mut self, element: Option<&ElementHandle>, key: &str) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.calls.push(Call::Press(key.to_string()));
        if key != "Enter" {
            return Ok(());
        }
        let Some(element) = element else {
            return Ok(());
        };
        let index = state.index_of(element)?;
        match state.enclosing_form(index) {
            Some(form) => state.submit(form),
            None => Ok(()),
        }
    }

    fn wait_for_load_state(
        &mut self,
        _state: LoadState,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.state.borrow().ensure_open()
    }

    fn go_back(&mut self, _timeout: Duration) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.calls.push(Call::Back);
        if state.history.len() < 2 {
            return Err(BrowserError::SessionProtocol {
                command: "back".into(),
                error: "no history entry".into(),
            });
        }
        state.history.pop();
        let previous = state.history.last().cloned().unwrap_or_default();
        state.navigate(&previous, false)
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        state.ensure_open()?;
        state.calls.push(Call::Screenshot(path.to_path_buf()));
        std::fs::write(path, b"\x89PNG fake").map_err(|e| BrowserError::SessionProtocol {
            command: "screenshot".into(),
            error: e.to_string(),
        })
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(BrowserError::Closed);
        }
        state.calls.push(Call::Close);
        state.closed = true;
        Ok(())
    }
}

/// Hands out clones of one `FakeSite`.
pub struct FakeLauncher {
    pub site: FakeSite,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new(site: &FakeSite) -> Self {
        Self {
            site: site.clone(),
            fail: false,
        }
    }
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        if self.fail {
            return Err(BrowserError::SubprocessSpawn {
                script: "driver/browser_server.js".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "node not found"),
            });
        }
        Ok(Box::new(self.site.clone()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Login page with an email field, a password field and a submit button.
pub fn login_form() -> Vec<Node> {
    vec![el("form").id("login-form").on_submit(SubmitEffect::Login).children([
        input("text", "email").label("Email"),
        input("password", "password").label("Password"),
        submit_button("Log in"),
    ])]
}

pub fn registration_form() -> Vec<Node> {
    vec![el("form").id("signup").on_submit(SubmitEffect::Register).children([
        input("text", "first_name"),
        input("text", "last_name"),
        input("email", "email"),
        input("password", "password"),
        input("password", "password_confirmation"),
        input("checkbox", "terms"),
        submit_button("Create account"),
    ])]
}
