pub mod stub;

#[cfg(target_os = "windows")]
pub mod windows;

use std::sync::Arc;

use regex::Regex;
use tracing::{error, info};

use crate::error::{ActuationError, CaptureError};
use crate::types::*;

/// Supplies pixels for an arbitrary screen rectangle.
pub trait RegionSampler: Send + Sync {
    fn capture(&self, rect: Rect) -> Result<Capture, CaptureError>;
}

/// Key and mouse injection. Every call is synchronous and may include short
/// settle delays.
pub trait ActionExecutor: Send + Sync {
    fn press_key(&self, key: &str) -> Result<(), ActuationError>;
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), ActuationError>;
    fn right_click(&self) -> Result<(), ActuationError>;
    fn focus_window(&self, window: WindowId) -> Result<(), ActuationError>;
}

/// Finds the game window by title.
pub trait WindowLocator: Send + Sync {
    fn find_window(&self, pattern: &str) -> Option<WindowInfo>;
}

/// The OS capabilities chosen once at startup.
#[derive(Clone)]
pub struct Platform {
    pub name: &'static str,
    pub sampler: Arc<dyn RegionSampler>,
    pub executor: Arc<dyn ActionExecutor>,
    pub locator: Arc<dyn WindowLocator>,
}

impl Platform {
    fn from_backend<B>(name: &'static str, backend: B) -> Self
    where
        B: RegionSampler + ActionExecutor + WindowLocator + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            name,
            sampler: backend.clone(),
            executor: backend.clone(),
            locator: backend,
        }
    }
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Platform {
    if force_stub {
        info!("using stub platform");
        return Platform::from_backend("stub", stub::StubPlatform::new());
    }
    #[cfg(target_os = "windows")]
    {
        info!("using windows platform");
        Platform::from_backend("windows", windows::WindowsPlatform::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        info!("no native input backend on this OS, using stub platform");
        Platform::from_backend("stub", stub::StubPlatform::new())
    }
}

/// Case-insensitive window title matcher.
pub fn title_matcher(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            error!("invalid window pattern '{}': {}", pattern, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_matcher_ignores_case() {
        let re = title_matcher("priston tale").expect("valid pattern");
        assert!(re.is_match("Priston Tale - Server 2"));
        assert!(!re.is_match("Notepad"));
    }

    #[test]
    fn test_title_matcher_rejects_bad_regex() {
        assert!(title_matcher("(unclosed").is_none());
    }

    #[test]
    fn test_forced_stub() {
        let platform = create_platform(true);
        assert_eq!(platform.name, "stub");
        assert!(platform.locator.find_window("anything").is_some());
    }
}
