//! git2 plumbing shared by clone and push.

use super::repository::Credential;
use crate::error::{CloneError, PublishError};
use git2::{opts, Cred, CredentialType, ErrorClass, ErrorCode, RemoteCallbacks};
use std::cell::Cell;
use std::time::Duration;
use tracing::warn;

const TOKEN_USERNAME: &str = "x-access-token";

/// Callbacks answering credential requests with the token, once. A second
/// request means the remote rejected it, so the callback fails instead of
/// letting libgit2 loop.
pub(crate) fn remote_callbacks(credential: Option<&Credential>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(credential) = credential {
        let attempted = Cell::new(false);
        callbacks.credentials(move |_url, username_from_url, allowed| {
            if attempted.replace(true) {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Http,
                    "credentials rejected by remote",
                ));
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                Cred::userpass_plaintext(
                    username_from_url.unwrap_or(TOKEN_USERNAME),
                    credential.secret(),
                )
            } else {
                Cred::default()
            }
        });
    }
    callbacks
}

/// Sets libgit2's connect and read timeouts for remote transports. A stalled
/// remote then fails the clone or push from inside libgit2, so the operation
/// still ends before its workspace is released.
pub(crate) fn configure_transport_timeouts(timeout: Duration) {
    let timeout_ms = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
    // SAFETY: both options are plain integers read by libgit2 at connect time.
    let result = unsafe {
        opts::set_server_connect_timeout_in_milliseconds(timeout_ms)
            .and_then(|()| opts::set_server_timeout_in_milliseconds(timeout_ms))
    };
    if let Err(e) = result {
        warn!(error = %e.message(), "Failed to configure git transport timeouts");
    }
}

fn is_auth_failure(err: &git2::Error) -> bool {
    let message = err.message().to_lowercase();
    err.code() == ErrorCode::Auth
        || message.contains("authentication")
        || message.contains("401")
}

fn is_transport_failure(err: &git2::Error) -> bool {
    matches!(
        err.class(),
        ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl | ErrorClass::Ssh | ErrorClass::Os
    ) || err.code() == ErrorCode::NotFound
}

pub(crate) fn classify_clone_error(err: &git2::Error, url: &str) -> CloneError {
    if is_auth_failure(err) {
        CloneError::AuthenticationFailed {
            url: url.to_string(),
        }
    } else if is_transport_failure(err) {
        CloneError::Unreachable {
            url: url.to_string(),
            message: err.message().to_string(),
        }
    } else {
        CloneError::Git(err.message().to_string())
    }
}

pub(crate) fn classify_push_error(err: &git2::Error, url: &str) -> PublishError {
    let message = err.message().to_lowercase();
    if is_auth_failure(err) || message.contains("403") || message.contains("permission") {
        PublishError::PermissionDenied {
            url: url.to_string(),
        }
    } else if is_transport_failure(err) {
        PublishError::Network {
            url: url.to_string(),
            message: err.message().to_string(),
        }
    } else {
        PublishError::Git(err.message().to_string())
    }
}
