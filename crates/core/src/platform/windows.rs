use std::ffi::c_void;
use std::mem::size_of;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowRect, GetWindowTextW, IsIconic, IsWindow, IsWindowVisible,
    SetCursorPos, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

use super::{title_matcher, ActionExecutor, RegionSampler, WindowLocator};
use crate::error::{ActuationError, CaptureError};
use crate::keys;
use crate::types::*;

/// Hold time between key/button down and up.
const PRESS_HOLD: Duration = Duration::from_millis(50);

/// GDI screen capture and SendInput injection.
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        WindowsPlatform
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn hwnd_of(id: WindowId) -> HWND {
    HWND(id as usize as *mut c_void)
}

fn id_of(hwnd: HWND) -> WindowId {
    hwnd.0 as usize as WindowId
}

fn send(inputs: &[INPUT]) -> Result<(), ActuationError> {
    let sent = unsafe { SendInput(inputs, size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(ActuationError::Injection(format!("SendInput accepted {}/{} events", sent, inputs.len())))
    }
}

fn key_input(vk: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

impl RegionSampler for WindowsPlatform {
    fn capture(&self, rect: Rect) -> Result<Capture, CaptureError> {
        let rect = rect.normalized();
        if rect.is_empty() {
            return Err(CaptureError::EmptyRect(rect));
        }
        let (w, h) = (rect.width(), rect.height());

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                return Err(CaptureError::Platform("GetDC failed".into()));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, w, h);
            let previous = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, w, h, screen_dc, rect.x1, rect.y1, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    // negative height: top-down rows
                    biHeight: -h,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut data = vec![0u8; (w * h * 4) as usize];
            let lines = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    h as u32,
                    Some(data.as_mut_ptr() as *mut c_void),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            if let Err(e) = blit {
                return Err(CaptureError::Platform(format!("BitBlt failed: {}", e)));
            }
            if lines != h {
                return Err(CaptureError::Platform(format!("GetDIBits copied {}/{} rows", lines, h)));
            }

            Ok(Capture { data, width: w as u32, height: h as u32, bytes_per_row: w as u32 * 4 })
        }
    }
}

impl ActionExecutor for WindowsPlatform {
    fn press_key(&self, key: &str) -> Result<(), ActuationError> {
        let vk = keys::virtual_key(key).ok_or_else(|| ActuationError::UnknownKey(key.to_string()))?;
        debug!("key '{}' (VK 0x{:02X}) via SendInput", key, vk);
        send(&[key_input(vk, KEYBD_EVENT_FLAGS(0))])?;
        thread::sleep(PRESS_HOLD);
        send(&[key_input(vk, KEYEVENTF_KEYUP)])
    }

    fn move_cursor(&self, x: i32, y: i32) -> Result<(), ActuationError> {
        unsafe { SetCursorPos(x, y) }
            .map_err(|e| ActuationError::Injection(format!("SetCursorPos({}, {}): {}", x, y, e)))
    }

    fn right_click(&self) -> Result<(), ActuationError> {
        send(&[mouse_input(MOUSEEVENTF_RIGHTDOWN)])?;
        thread::sleep(PRESS_HOLD);
        send(&[mouse_input(MOUSEEVENTF_RIGHTUP)])
    }

    fn focus_window(&self, window: WindowId) -> Result<(), ActuationError> {
        let hwnd = hwnd_of(window);
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return Err(ActuationError::WindowNotFound(window));
            }
            if GetForegroundWindow() == hwnd {
                return Ok(());
            }
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
                thread::sleep(Duration::from_millis(100));
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                warn!("SetForegroundWindow refused for window {}", window);
            }
            thread::sleep(Duration::from_millis(200));
            if GetForegroundWindow() != hwnd {
                return Err(ActuationError::Injection(format!("window {} did not take focus", window)));
            }
        }
        info!("focused window {}", window);
        Ok(())
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<(HWND, String)>);
    if IsWindowVisible(hwnd).as_bool() {
        let mut buf = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut buf);
        if len > 0 {
            found.push((hwnd, String::from_utf16_lossy(&buf[..len as usize])));
        }
    }
    BOOL(1)
}

impl WindowLocator for WindowsPlatform {
    fn find_window(&self, pattern: &str) -> Option<WindowInfo> {
        let re = title_matcher(pattern)?;
        let mut windows: Vec<(HWND, String)> = Vec::new();
        unsafe {
            if let Err(e) = EnumWindows(Some(collect_window), LPARAM(&mut windows as *mut _ as isize)) {
                warn!("EnumWindows failed: {}", e);
                return None;
            }
        }

        let (hwnd, title) = windows.into_iter().find(|(_, title)| re.is_match(title))?;
        let mut r = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut r) }.ok()?;
        info!("found window: \"{}\" (id: {})", title, id_of(hwnd));
        Some(WindowInfo {
            id: id_of(hwnd),
            title,
            rect: Rect::new(r.left, r.top, r.right, r.bottom),
        })
    }
}
