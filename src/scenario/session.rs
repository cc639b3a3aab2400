//! Exclusive ownership of the external session a scenario drives

use async_trait::async_trait;

use crate::common::Result;

/// A live connection to the system under test
///
/// The runner takes the session by value and calls [`Session::release`]
/// exactly once when the scenario ends, whatever the outcome. `release`
/// consumes the session, so it cannot be released twice.
#[async_trait]
pub trait Session: Send + Sync + Sized {
    /// What steps act on (a browser driver, an API client, ...)
    type Target: ?Sized + Sync;

    fn target(&self) -> &Self::Target;

    /// Evidence worth attaching to a failing step (current location, screenshot path)
    async fn evidence(&self) -> Vec<String> {
        Vec::new()
    }

    /// Disconnect and free every resource held by the session
    async fn release(self) -> Result<()>;
}
