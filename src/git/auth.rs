//! Credentials and fetch options shared by ls-remote and clone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks};

/// HTTPS username paired with a personal access token for the given host.
pub fn token_username(url: &str) -> &'static str {
    if url.contains("gitlab.com") {
        "oauth2"
    } else {
        "x-access-token"
    }
}

/// True for transports that support shallow fetches.
pub fn is_network_url(url: &str) -> bool {
    url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("ssh://")
        || url.starts_with("git@")
}

/// Callbacks offering the token once; libgit2 re-asks on rejection, so a second
/// request fails instead of looping.
pub fn remote_callbacks(url: &str, token: Option<&str>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let token = token.map(str::to_string);
    let username = token_username(url);
    let mut attempted = false;

    callbacks.credentials(move |_url, _username_from_url, allowed| {
        if attempted {
            return Err(git2::Error::from_str("authentication failed"));
        }
        attempted = true;

        match &token {
            Some(token) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext(username, token)
            }
            _ => Err(git2::Error::from_str("no credentials available")),
        }
    });

    callbacks
}

/// Fetch options for clone and fetch. Setting `cancel` aborts the transfer at
/// the next progress report.
pub fn fetch_options(
    url: &str,
    token: Option<&str>,
    shallow: bool,
    cancel: Option<&Arc<AtomicBool>>,
) -> FetchOptions<'static> {
    let mut callbacks = remote_callbacks(url, token);
    if let Some(cancel) = cancel {
        let cancel = Arc::clone(cancel);
        callbacks.transfer_progress(move |_| !cancel.load(Ordering::Relaxed));
    }

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    if shallow && is_network_url(url) {
        options.depth(1);
    }
    options
}
