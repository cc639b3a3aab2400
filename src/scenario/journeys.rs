//! Built-in journeys

use crate::api::actions::{Authenticate, FetchAuthenticated, RejectsAnonymous};
use crate::api::{ApiClient, StatusEquals};
use crate::common::config::Config;
use crate::common::Result;
use crate::driver::actions::{
    Click, ClickFirstIfAny, ExpectText, Navigate, SendMessage, TypeText,
};
use crate::driver::observe::{
    ElementAbsent, ElementInteractable, ElementPresent, ElementVisible, ElementWithText,
    LocationContains,
};
use crate::driver::Driver;
use crate::wait::{AllOf, AnyOf, Observable};

use super::{Scenario, Sequence, Step, WaitPoint};

/// A scenario that ships with the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Log in through the web UI and send a message
    Messaging,
    /// Log in through the HTTP API and read authenticated endpoints
    ApiLogin,
}

pub const BUILTINS: &[Builtin] = &[Builtin::Messaging, Builtin::ApiLogin];

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Messaging => "messaging",
            Builtin::ApiLogin => "api-login",
        }
    }

    /// Which surface the scenario drives
    pub fn variant(&self) -> &'static str {
        match self {
            Builtin::Messaging => "ui",
            Builtin::ApiLogin => "api",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Builtin::Messaging => {
                "Log in through the browser, open messaging and send a message"
            }
            Builtin::ApiLogin => {
                "Check API health and access control, log in and read the profile and conversations"
            }
        }
    }
}

/// Look up a built-in scenario by name
pub fn builtin(name: &str) -> Option<Builtin> {
    BUILTINS.iter().copied().find(|b| b.name() == name)
}

/// The login-and-message journey through the browser
pub fn messaging(config: &Config) -> Result<Scenario<dyn Driver>> {
    let (email, password) = config.credentials.require()?;
    let sel = &config.selectors;
    let journey = &config.journey;
    let spec = |step: &str| config.timeouts.wait_spec(step);

    let login_form: Vec<Box<dyn Observable<dyn Driver>>> = vec![
        Box::new(ElementVisible(sel.email_field.clone())),
        Box::new(ElementVisible(sel.password_field.clone())),
        Box::new(ElementInteractable(sel.submit_button.clone())),
    ];

    let mut scenario = Scenario::new(Builtin::Messaging.name())
        .describe(Builtin::Messaging.summary())
        .step(
            Step::new("Navigate: login page")
                .action(Navigate(config.target.page_url(&journey.login_path))),
        )
        .step(Step::new("Wait-for: login form").wait_before(WaitPoint::new(
            AllOf::new(login_form),
            spec("Wait-for: login form")?,
        )))
        .step(
            Step::new("Action: submit credentials").action(
                Sequence::new()
                    .then(TypeText {
                        selector: sel.email_field.clone(),
                        text: email.to_string(),
                        secret: false,
                    })
                    .then(TypeText {
                        selector: sel.password_field.clone(),
                        text: password.to_string(),
                        secret: true,
                    })
                    .then(Click(sel.submit_button.clone())),
            ),
        )
        .step(
            Step::new("Wait-for: authenticated area").wait_before(
                WaitPoint::new(
                    LocationContains(journey.authenticated_marker.clone()),
                    spec("Wait-for: authenticated area")?,
                )
                .on_timeout("authentication did not complete"),
            ),
        );

    if let Some(name) = &journey.display_name {
        scenario = scenario.step(
            Step::new("Action: check displayed name")
                .wait_before(WaitPoint::new(
                    ElementVisible(sel.welcome_heading.clone()),
                    spec("Action: check displayed name")?,
                ))
                .action(ExpectText {
                    selector: sel.welcome_heading.clone(),
                    text: name.clone(),
                }),
        );
    }

    // The list renders a loading placeholder first; it has settled once it
    // shows either a conversation or the empty state.
    let list_settled: Vec<Box<dyn Observable<dyn Driver>>> = vec![
        Box::new(ElementPresent(sel.conversation_item.clone())),
        Box::new(ElementPresent(sel.empty_conversations.clone())),
    ];
    let composer_ready: Vec<Box<dyn Observable<dyn Driver>>> = vec![
        Box::new(ElementAbsent(sel.conversation_item.clone())),
        Box::new(ElementVisible(sel.message_input.clone())),
    ];

    let scenario = scenario
        .step(
            Step::new("Action: open messaging")
                .wait_before(WaitPoint::new(
                    ElementInteractable(sel.messaging_link.clone()),
                    spec("Action: open messaging")?,
                ))
                .action(Click(sel.messaging_link.clone())),
        )
        .step(Step::new("Wait-for: messages heading").wait_before(WaitPoint::new(
            ElementWithText {
                selector: sel.messages_heading.clone(),
                text: journey.messages_heading.clone(),
            },
            spec("Wait-for: messages heading")?,
        )))
        .step(
            Step::new("Action: select first conversation")
                .wait_before(
                    WaitPoint::new(
                        AnyOf::new(list_settled),
                        spec("Action: select first conversation")?,
                    )
                    .on_timeout("conversation list did not load"),
                )
                .action(ClickFirstIfAny(sel.conversation_item.clone())),
        )
        .step(
            Step::new("Action: send message")
                .wait_before(
                    WaitPoint::new(AnyOf::new(composer_ready), spec("Action: send message")?)
                        .on_timeout("message composer did not open"),
                )
                .action(SendMessage {
                    conversations: sel.conversation_item.clone(),
                    composer: sel.message_input.clone(),
                    text: journey.message.clone(),
                }),
        );

    Ok(scenario)
}

/// The login journey against the HTTP API
pub fn api_login(config: &Config) -> Result<Scenario<ApiClient>> {
    let (email, password) = config.credentials.require()?;

    Ok(Scenario::new(Builtin::ApiLogin.name())
        .describe(Builtin::ApiLogin.summary())
        .step(Step::new("Wait-for: API healthy").wait_before(WaitPoint::new(
            StatusEquals::new("/health", 200),
            config.timeouts.wait_spec("Wait-for: API healthy")?,
        )))
        .step(
            Step::new("Action: protected endpoint rejects anonymous").action(RejectsAnonymous {
                path: "/auth/profile".to_string(),
            }),
        )
        .step(Step::new("Action: authenticate").action(Authenticate {
            path: "/auth/login".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }))
        .step(Step::new("Action: fetch profile").action(FetchAuthenticated {
            path: "/auth/profile".to_string(),
        }))
        .step(
            Step::new("Action: list conversations").action(FetchAuthenticated {
                path: "/messages/conversations".to_string(),
            }),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use std::time::Duration;

    fn configured() -> Config {
        let mut config = Config::default();
        config.credentials.email = Some("john.smith@email.com".to_string());
        config.credentials.password = Some("password123".to_string());
        config
    }

    #[test]
    fn test_messaging_step_names() {
        let scenario = messaging(&configured()).unwrap();
        let names: Vec<_> = scenario.steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "Navigate: login page",
                "Wait-for: login form",
                "Action: submit credentials",
                "Wait-for: authenticated area",
                "Action: open messaging",
                "Wait-for: messages heading",
                "Action: select first conversation",
                "Action: send message",
            ]
        );
        // six wait points at the 20s default
        assert_eq!(scenario.budget(), Duration::from_secs(120));
    }

    #[test]
    fn test_display_name_adds_check_after_login() {
        let mut config = configured();
        config.journey.display_name = Some("John".to_string());
        let scenario = messaging(&config).unwrap();

        assert_eq!(scenario.steps().len(), 9);
        assert_eq!(scenario.steps()[3].name(), "Wait-for: authenticated area");
        assert_eq!(scenario.steps()[4].name(), "Action: check displayed name");
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            messaging(&Config::default()),
            Err(Error::MissingCredentials)
        ));
        assert!(matches!(
            api_login(&Config::default()),
            Err(Error::MissingCredentials)
        ));
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin("messaging"), Some(Builtin::Messaging));
        assert_eq!(builtin("api-login"), Some(Builtin::ApiLogin));
        assert_eq!(builtin("checkout"), None);
    }

    #[test]
    fn test_api_login_steps() {
        let scenario = api_login(&configured()).unwrap();
        let names: Vec<_> = scenario.steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "Wait-for: API healthy",
                "Action: protected endpoint rejects anonymous",
                "Action: authenticate",
                "Action: fetch profile",
                "Action: list conversations",
            ]
        );
    }
}
