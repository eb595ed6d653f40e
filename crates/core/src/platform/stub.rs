use tracing::info;

use super::{title_matcher, ActionExecutor, RegionSampler, WindowLocator};
use crate::error::{ActuationError, CaptureError};
use crate::keys;
use crate::sensing::Orientation;
use crate::types::*;

const STUB_WINDOW_ID: WindowId = 30001;
const STUB_TITLE: &str = "Priston Tale";

/// Logs every action instead of performing it. Captures show full bars,
/// striped red/blue/green so each resource's color band finds its fill.
pub struct StubPlatform {
    screen: Rect,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self { screen: Rect::new(0, 0, 1920, 1080) }
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

const STRIPES: [[u8; 4]; 3] = [[0, 0, 230, 255], [230, 0, 0, 255], [0, 230, 0, 255]];

impl RegionSampler for StubPlatform {
    fn capture(&self, rect: Rect) -> Result<Capture, CaptureError> {
        let rect = rect.normalized();
        if rect.is_empty() {
            return Err(CaptureError::EmptyRect(rect));
        }
        let (w, h) = (rect.width() as u32, rect.height() as u32);
        let mut capture = Capture::solid(w, h, [0, 0, 0, 255]);
        let vertical = Orientation::classify(w, h) == Orientation::Vertical;
        let across = if vertical { w } else { h };
        for y in 0..h {
            for x in 0..w {
                let pos = if vertical { x } else { y };
                let stripe = (pos * 3 / across).min(2) as usize;
                capture.set_pixel(x, y, STRIPES[stripe]);
            }
        }
        Ok(capture)
    }
}

impl ActionExecutor for StubPlatform {
    fn press_key(&self, key: &str) -> Result<(), ActuationError> {
        keys::virtual_key(key).ok_or_else(|| ActuationError::UnknownKey(key.to_string()))?;
        info!("press_key(\"{}\")", key);
        Ok(())
    }

    fn move_cursor(&self, x: i32, y: i32) -> Result<(), ActuationError> {
        info!("move_cursor({}, {})", x, y);
        Ok(())
    }

    fn right_click(&self) -> Result<(), ActuationError> {
        info!("right_click()");
        Ok(())
    }

    fn focus_window(&self, window: WindowId) -> Result<(), ActuationError> {
        info!("focus_window({})", window);
        Ok(())
    }
}

impl WindowLocator for StubPlatform {
    fn find_window(&self, pattern: &str) -> Option<WindowInfo> {
        info!("find_window(\"{}\")", pattern);
        let re = title_matcher(pattern)?;
        let title = if re.is_match(STUB_TITLE) {
            STUB_TITLE.to_string()
        } else {
            format!("Window<{}>", pattern)
        };
        Some(WindowInfo { id: STUB_WINDOW_ID, title, rect: self.screen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::measure;

    #[test]
    fn test_stub_capture_reads_full_for_every_resource() {
        let stub = StubPlatform::new();
        for rect in [Rect::new(0, 0, 200, 12), Rect::new(0, 0, 12, 120)] {
            let cap = stub.capture(rect).expect("capture");
            for kind in ResourceKind::ALL {
                let p = measure(&cap, &HsvRange::for_resource(kind));
                assert!(p > 95.0, "{} read {} in {}", kind, p, rect);
            }
        }
    }

    #[test]
    fn test_stub_rejects_unknown_key() {
        let stub = StubPlatform::new();
        assert!(stub.press_key("F5").is_ok());
        assert!(matches!(stub.press_key("hyper"), Err(ActuationError::UnknownKey(_))));
    }

    #[test]
    fn test_stub_empty_rect_fails() {
        assert!(StubPlatform::new().capture(Rect::new(5, 5, 5, 20)).is_err());
    }
}
