//! Messaging journey against an in-memory portal
//!
//! The portal mimics the patient frontend: a login form, a dashboard with a
//! link to messaging, and a messages view with conversations and a composer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use journey::common::config::Config;
use journey::driver::{Driver, ElementState, Selector};
use journey::report::FailureKind;
use journey::scenario::{self, Runner, Session};
use journey::{Error, Result, ScenarioStatus, StepStatus};

const BASE: &str = "http://localhost:3000";
const EMAIL: &str = "john.smith@email.com";
const PASSWORD: &str = "password123";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Page {
    Blank,
    Login,
    Dashboard,
    Messages,
}

struct Portal {
    page: Page,
    location: String,
    email: String,
    password: String,
    conversations: usize,
    selected: bool,
    composer: String,
    sent: Vec<String>,
    /// Location reads left before a successful login lands on the dashboard
    redirect_delay: usize,
    pending_login: bool,
    /// How long the conversation list shows its loading placeholder
    list_delay: Duration,
    messages_opened: Option<Instant>,
}

impl Portal {
    fn list_loaded(&self) -> bool {
        self.messages_opened
            .is_some_and(|opened| opened.elapsed() >= self.list_delay)
    }
}

struct MockPortal {
    state: Mutex<Portal>,
}

impl MockPortal {
    fn new(conversations: usize) -> Self {
        Self {
            state: Mutex::new(Portal {
                page: Page::Blank,
                location: "about:blank".to_string(),
                email: String::new(),
                password: String::new(),
                conversations,
                selected: false,
                composer: String::new(),
                sent: Vec::new(),
                redirect_delay: 0,
                pending_login: false,
                list_delay: Duration::ZERO,
                messages_opened: None,
            }),
        }
    }

    fn with_redirect_delay(self, reads: usize) -> Self {
        self.state.lock().unwrap().redirect_delay = reads;
        self
    }

    fn with_list_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().list_delay = delay;
        self
    }

    fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn shown(text: &str) -> ElementState {
    ElementState {
        visible: true,
        interactable: true,
        text: text.to_string(),
    }
}

#[async_trait]
impl Driver for MockPortal {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut p = self.state.lock().unwrap();
        p.location = url.to_string();
        p.page = if url.ends_with("/login") {
            Page::Login
        } else {
            Page::Blank
        };
        Ok(())
    }

    async fn current_location(&self) -> Result<String> {
        let mut p = self.state.lock().unwrap();
        if p.pending_login {
            if p.redirect_delay == 0 {
                p.pending_login = false;
                p.page = Page::Dashboard;
                p.location = format!("{}/dashboard", BASE);
            } else {
                p.redirect_delay -= 1;
            }
        }
        Ok(p.location.clone())
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementState>> {
        let p = self.state.lock().unwrap();
        let sel = selector.to_string();
        let found = match (p.page, sel.as_str()) {
            (Page::Login, "#email") => vec![shown(&p.email)],
            (Page::Login, "#password") => vec![shown("")],
            (Page::Login, "button[type='submit']") => vec![shown("Sign In")],
            (Page::Dashboard, "a[href='/messages']") => vec![shown("Messages")],
            (Page::Dashboard, "h1") => vec![shown("Good morning, John!")],
            (Page::Messages, "h2") => vec![shown("Messages")],
            (Page::Messages, s) if s.starts_with("xpath://div") && p.list_loaded() => {
                (0..p.conversations).map(|i| shown(&format!("Dr. {}", i))).collect()
            }
            (Page::Messages, s)
                if s.starts_with("xpath://p") && p.list_loaded() && p.conversations == 0 =>
            {
                vec![shown("No conversations yet")]
            }
            (Page::Messages, "input[placeholder='Type your message...']") if p.selected => {
                vec![shown(&p.composer)]
            }
            _ => Vec::new(),
        };
        Ok(found)
    }

    async fn activate(&self, selector: &Selector, index: usize) -> Result<()> {
        let mut p = self.state.lock().unwrap();
        let sel = selector.to_string();
        match (p.page, sel.as_str()) {
            (Page::Login, "button[type='submit']") => {
                if p.email == EMAIL && p.password == PASSWORD {
                    p.pending_login = true;
                }
                Ok(())
            }
            (Page::Dashboard, "a[href='/messages']") => {
                p.page = Page::Messages;
                p.location = format!("{}/messages", BASE);
                p.messages_opened = Some(Instant::now());
                Ok(())
            }
            (Page::Messages, s)
                if s.starts_with("xpath://div") && p.list_loaded() && index < p.conversations =>
            {
                p.selected = true;
                Ok(())
            }
            _ => Err(Error::element_not_found(selector, index)),
        }
    }

    async fn set_text(&self, selector: &Selector, index: usize, text: &str) -> Result<()> {
        let mut p = self.state.lock().unwrap();
        match selector.to_string().as_str() {
            "#email" if p.page == Page::Login => p.email = text.to_string(),
            "#password" if p.page == Page::Login => p.password = text.to_string(),
            "input[placeholder='Type your message...']" if p.selected => {
                p.composer = text.to_string()
            }
            _ => return Err(Error::element_not_found(selector, index)),
        }
        Ok(())
    }

    async fn submit(&self, selector: &Selector, index: usize) -> Result<()> {
        let mut p = self.state.lock().unwrap();
        if p.selected && selector.to_string() == "input[placeholder='Type your message...']" {
            let text = std::mem::take(&mut p.composer);
            p.sent.push(text);
            return Ok(());
        }
        Err(Error::element_not_found(selector, index))
    }
}

struct PortalSession {
    portal: Arc<MockPortal>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for PortalSession {
    type Target = dyn Driver;

    fn target(&self) -> &Self::Target {
        self.portal.as_ref()
    }

    async fn evidence(&self) -> Vec<String> {
        match self.portal.current_location().await {
            Ok(location) => vec![format!("location: {}", location)],
            Err(_) => Vec::new(),
        }
    }

    async fn release(self) -> Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config(password: &str) -> Config {
    let mut config = Config::from_toml(
        "[timeouts]\ndefault_timeout_ms = 2000\npoll_interval_ms = 100\n",
    )
    .unwrap();
    config.credentials.email = Some(EMAIL.to_string());
    config.credentials.password = Some(password.to_string());
    config
}

fn session(portal: &Arc<MockPortal>, released: &Arc<AtomicUsize>) -> PortalSession {
    PortalSession {
        portal: Arc::clone(portal),
        released: Arc::clone(released),
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_journey_passes() {
    let portal = Arc::new(MockPortal::new(2).with_redirect_delay(3));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config(PASSWORD)).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Passed);
    assert_eq!(result.steps().len(), 8);
    assert!(result.steps().iter().all(|s| s.status() == StepStatus::Passed));
    assert_eq!(portal.sent(), ["Hello! This is an automated test message."]);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_password_stops_at_authenticated_area() {
    let portal = Arc::new(MockPortal::new(2));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config("wrong-password")).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 4);

    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Wait-for: authenticated area");
    assert_eq!(failed.status(), StepStatus::TimedOut);
    assert!(failed.elapsed().as_millis() >= 2000);

    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::TimedOut);
    assert!(diagnostic
        .message
        .starts_with("authentication did not complete"));
    assert_eq!(
        diagnostic.evidence,
        ["location: http://localhost:3000/login"]
    );

    assert!(portal.sent().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_conversations_still_passes() {
    let portal = Arc::new(MockPortal::new(0));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config(PASSWORD)).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Passed);
    assert_eq!(result.steps().len(), 8);
    assert!(portal.sent().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_conversations_loading_late_still_get_the_message() {
    let portal = Arc::new(MockPortal::new(2).with_list_delay(Duration::from_millis(300)));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config(PASSWORD)).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Passed);
    assert_eq!(result.steps().len(), 8);
    let select = &result.steps()[6];
    assert_eq!(select.name(), "Action: select first conversation");
    assert!(select.elapsed() >= Duration::from_millis(300));
    assert_eq!(portal.sent(), ["Hello! This is an automated test message."]);
}

#[tokio::test(start_paused = true)]
async fn test_conversation_list_that_never_loads_times_out() {
    let portal = Arc::new(MockPortal::new(2).with_list_delay(Duration::from_secs(3600)));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config(PASSWORD)).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 7);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.status(), StepStatus::TimedOut);
    assert!(failed
        .diagnostic()
        .unwrap()
        .message
        .starts_with("conversation list did not load"));
    assert!(portal.sent().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_composer_times_out() {
    let portal = Arc::new(MockPortal::new(1));
    let released = Arc::new(AtomicUsize::new(0));

    let mut config = config(PASSWORD);
    config.selectors.message_input = Selector::Css("textarea.composer".to_string());
    let scenario = scenario::messaging(&config).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 8);

    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: send message");
    assert_eq!(failed.status(), StepStatus::TimedOut);

    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::TimedOut);
    assert!(diagnostic.message.starts_with("message composer did not open"));
    assert_eq!(
        diagnostic.evidence,
        ["location: http://localhost:3000/messages"]
    );
    assert!(portal.sent().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_displayed_name_is_checked() {
    let portal = Arc::new(MockPortal::new(1));
    let released = Arc::new(AtomicUsize::new(0));

    let mut config = config(PASSWORD);
    config.journey.display_name = Some("John".to_string());
    let scenario = scenario::messaging(&config).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Passed);
    assert_eq!(result.steps().len(), 9);
    assert_eq!(result.steps()[4].name(), "Action: check displayed name");
}

#[tokio::test(start_paused = true)]
async fn test_wrong_displayed_name_is_assertion_failure() {
    let portal = Arc::new(MockPortal::new(1));
    let released = Arc::new(AtomicUsize::new(0));

    let mut config = config(PASSWORD);
    config.journey.display_name = Some("Jane".to_string());
    let scenario = scenario::messaging(&config).unwrap();

    let result = Runner::new()
        .run(&scenario, session(&portal, &released))
        .await;

    assert_eq!(result.status(), ScenarioStatus::Failed);
    assert_eq!(result.steps().len(), 5);

    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: check displayed name");
    assert_eq!(failed.status(), StepStatus::Failed);
    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, FailureKind::AssertionFailed);
    assert!(diagnostic.message.contains("Good morning, John!"));
    assert!(portal.sent().is_empty());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_still_releases_and_reports() {
    let portal = Arc::new(MockPortal::new(2).with_list_delay(Duration::from_secs(3600)));
    let released = Arc::new(AtomicUsize::new(0));
    let scenario = scenario::messaging(&config(PASSWORD)).unwrap();

    let result = Runner::new()
        .run_until(
            &scenario,
            session(&portal, &released),
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await;

    assert_eq!(result.status(), ScenarioStatus::Errored);
    let failed = result.failed_step().unwrap();
    assert_eq!(failed.name(), "Action: select first conversation");
    let diagnostic = failed.diagnostic().unwrap();
    assert_eq!(diagnostic.category.as_deref(), Some("CANCELLED"));
    assert_eq!(
        diagnostic.evidence,
        ["location: http://localhost:3000/messages"]
    );
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
