//! SlotWatch CDP adapter.
//!
//! Implements the action-primitives [`Page`](action_primitives::Page) handle on
//! top of `chromiumoxide`. One [`ChromiumBrowser`] process hosts any number of
//! isolated browser contexts; each context owns a single [`ChromiumPage`].
//! Element lookups run as page scripts that tag the match with a one-off
//! attribute, so later clicks and fills address exactly that element.

use std::{env, path::PathBuf};
use which::which;

mod browser;
mod page;
mod scripts;

pub use browser::{ChromiumBrowser, ChromiumContext};
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use page::ChromiumPage;

pub mod error {
    use action_primitives::ActionError;
    use chromiumoxide::error::CdpError;
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("option not found")]
        OptionNotFound,
        #[error("internal error")]
        Internal,
    }

    #[derive(Clone, Debug)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self { kind, hint: None }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }
    }

    impl From<CdpError> for AdapterError {
        fn from(err: CdpError) -> Self {
            let kind = match &err {
                CdpError::Timeout => AdapterErrorKind::NavTimeout,
                _ => AdapterErrorKind::CdpIo,
            };
            AdapterError::new(kind).with_hint(err.to_string())
        }
    }

    impl From<AdapterError> for ActionError {
        fn from(err: AdapterError) -> Self {
            let detail = err.to_string();
            match err.kind {
                AdapterErrorKind::NavTimeout => ActionError::NavTimeout(detail),
                AdapterErrorKind::CdpIo => ActionError::CdpIo(detail),
                AdapterErrorKind::TargetNotFound => ActionError::AnchorNotFound(detail),
                AdapterErrorKind::OptionNotFound => ActionError::OptionNotFound(detail),
                AdapterErrorKind::LaunchFailed | AdapterErrorKind::Internal => {
                    ActionError::Internal(detail)
                }
            }
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Configuration for launching the browser and driving its pages.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        pub executable: Option<PathBuf>,
        pub user_data_dir: Option<PathBuf>,
        pub headless: bool,
        pub window_width: u32,
        pub window_height: u32,
        pub nav_timeout_ms: u64,
        /// Re-check interval while waiting for an element
        pub poll_interval_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                window_width: 1280,
                window_height: 800,
                nav_timeout_ms: 30_000,
                poll_interval_ms: 100,
            }
        }
    }

    fn resolve_headless_default() -> bool {
        // SLOTWATCH_HEADLESS: "1", "true", "yes", "on" means headless
        match env::var("SLOTWATCH_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                matches!(lower.as_str(), "1" | "true" | "yes" | "on")
            }
            Err(_) => false,
        }
    }

    fn default_profile_dir() -> Option<PathBuf> {
        env::var("SLOTWATCH_CHROME_PROFILE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("SLOTWATCH_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::ActionError;

    #[test]
    fn adapter_errors_map_onto_action_errors() {
        let not_found = AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint("#email");
        assert_eq!(
            ActionError::from(not_found),
            ActionError::AnchorNotFound("target element not found: #email".into())
        );

        let timeout = AdapterError::new(AdapterErrorKind::NavTimeout);
        assert!(matches!(ActionError::from(timeout), ActionError::NavTimeout(_)));

        let launch = AdapterError::new(AdapterErrorKind::LaunchFailed).with_hint("no chrome");
        assert!(matches!(ActionError::from(launch), ActionError::Internal(_)));
    }

    #[test]
    fn default_window_matches_desktop_viewport() {
        let config = CdpConfig::default();
        assert_eq!((config.window_width, config.window_height), (1280, 800));
        assert_eq!(config.nav_timeout_ms, 30_000);
    }
}
