//! Auth-retry wrapper for remote calls.

use dcr_core::config::MAX_AUTH_RETRIES;
use dcr_core::error::{DcrError, Result};

use crate::session::{Session, SessionHandle};

/// Runs `op` with the current session, refreshing and retrying on
/// `AuthExpired` up to `max_retries` times (never more than two).
///
/// Any other error propagates immediately. Once the budget is spent the
/// auth failure is returned as fatal.
pub fn with_auth_retry<T, F>(
    handle: &SessionHandle,
    max_retries: u32,
    context: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(&Session) -> Result<T>,
{
    let max_retries = max_retries.min(MAX_AUTH_RETRIES);
    let mut attempt = 0;
    loop {
        let session = handle.current();
        match op(&session) {
            Ok(value) => return Ok(value),
            Err(DcrError::AuthExpired(reason)) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    context,
                    attempt,
                    max_retries,
                    %reason,
                    "Authentication expired, refreshing session"
                );
                handle.refresh_if_stale(session.generation)?;
            }
            Err(DcrError::AuthExpired(reason)) => {
                tracing::error!(context, attempts = attempt + 1, "Authentication retries exhausted");
                return Err(DcrError::AuthExpired(format!(
                    "{} failed after {} retries: {}",
                    context, attempt, reason
                )));
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::SessionProvider;
    use std::cell::Cell;
    use std::sync::Arc;

    struct Provider;

    impl SessionProvider for Provider {
        fn acquire(&self) -> Result<Session> {
            Ok(Session::new("initial", 0))
        }

        fn refresh(&self, stale: &Session) -> Result<Session> {
            Ok(Session::new("fresh", stale.generation + 1))
        }
    }

    fn handle() -> SessionHandle {
        SessionHandle::acquire(Arc::new(Provider)).unwrap()
    }

    #[test]
    fn test_recovers_after_one_refresh() {
        let handle = handle();
        let calls = Cell::new(0);
        let token = with_auth_retry(&handle, 2, "fetch", |session| {
            calls.set(calls.get() + 1);
            if session.generation == 0 {
                Err(DcrError::AuthExpired("401".into()))
            } else {
                Ok(session.token.clone())
            }
        })
        .unwrap();
        assert_eq!(token, "fresh");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_budget_bounds_attempts() {
        let handle = handle();
        let calls = Cell::new(0);
        let err = with_auth_retry(&handle, 2, "fetch", |_| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(DcrError::AuthExpired("401".into()))
        })
        .unwrap_err();
        assert!(err.is_auth_expired());
        assert_eq!(calls.get(), 3);
        assert_eq!(handle.current().generation, 2);
    }

    #[test]
    fn test_budget_is_capped() {
        let handle = handle();
        let calls = Cell::new(0);
        let _ = with_auth_retry(&handle, 10, "fetch", |_| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(DcrError::AuthExpired("401".into()))
        });
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let handle = handle();
        let calls = Cell::new(0);
        let err = with_auth_retry(&handle, 2, "deploy", |_| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(DcrError::RemoteUnavailable("503".into()))
        })
        .unwrap_err();
        assert!(matches!(err, DcrError::RemoteUnavailable(_)));
        assert_eq!(calls.get(), 1);
        assert_eq!(handle.current().generation, 0);
    }
}
