use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use tracing::{error, info};
use vigil_core::controller::ReactionController;
use vigil_core::logger::LogLine;
use vigil_core::settings::{Settings, SharedSettings};
use vigil_core::types::{ControllerStatus, GameWindowFrame, ResourceKind};

use crate::confirm::ConfirmDialog;

/// Log lines kept in memory for the panel.
const LOG_CAPACITY: usize = 2000;

pub struct App {
    pub controller: ReactionController,
    pub settings: SharedSettings,
    pub status: Arc<Mutex<ControllerStatus>>,
    pub settings_path: PathBuf,
    pub selected: usize,
    pub log_visible: bool,
    pub log_messages: Vec<LogLine>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<LogLine>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(controller: ReactionController, log_rx: mpsc::Receiver<LogLine>, settings_path: PathBuf) -> Self {
        Self {
            settings: controller.settings(),
            status: controller.status(),
            controller,
            settings_path,
            selected: 0,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        self.log_messages.extend(self.log_rx.try_iter());
        if self.log_messages.len() > LOG_CAPACITY {
            let excess = self.log_messages.len() - LOG_CAPACITY;
            self.log_messages.drain(..excess);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn selected_kind(&self) -> ResourceKind {
        ResourceKind::ALL[self.selected]
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < ResourceKind::ALL.len() {
            self.selected += 1;
        }
    }

    pub fn settings_snapshot(&self) -> Settings {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn status_snapshot(&self) -> ControllerStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn game_window(&self) -> Option<GameWindowFrame> {
        self.controller.game_window()
    }

    pub fn start_stop(&mut self) {
        if self.controller.is_running() {
            self.controller.stop();
        } else {
            self.controller.start();
        }
    }

    /// Live reconfiguration: the worker sees the new value next tick.
    pub fn adjust_threshold(&mut self, delta: f64) {
        let kind = self.selected_kind();
        let value = self.settings.lock().unwrap_or_else(PoisonError::into_inner).adjust_threshold(kind, delta);
        info!("{} threshold set to {:.0}%", kind, value);
    }

    pub fn toggle_spellcasting(&mut self) {
        let enabled = {
            let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
            settings.spellcasting.enabled = !settings.spellcasting.enabled;
            settings.spellcasting.enabled
        };
        info!("spellcasting {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn save_settings(&mut self) {
        if let Err(e) = self.settings_snapshot().save(&self.settings_path) {
            error!("failed to save settings: {}", e);
        }
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Quit right away when idle; ask first while the controller is running.
    pub fn request_quit(&mut self) {
        if self.controller.is_running() {
            self.confirm = Some(ConfirmDialog::new("Controller is running. Stop and quit?"));
        } else {
            self.quit();
        }
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if self.confirm.take().is_some() && yes {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.controller.stop();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::platform::create_platform;

    fn app() -> (App, mpsc::Sender<LogLine>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let platform = create_platform(true);
        let mut settings = Settings::default();
        settings.scan_interval = 0.05;
        let controller = ReactionController::from_platform(settings.shared(), &platform);
        let (tx, rx) = mpsc::channel();
        (App::new(controller, rx, dir.path().join("settings.json")), tx, dir)
    }

    #[test]
    fn test_selection_stays_in_range() {
        let (mut app, _tx, _dir) = app();
        app.move_up();
        assert_eq!(app.selected_kind(), ResourceKind::Health);
        app.move_down();
        app.move_down();
        app.move_down();
        assert_eq!(app.selected_kind(), ResourceKind::Stamina);
    }

    #[test]
    fn test_threshold_and_spell_edits_reach_settings() {
        let (mut app, _tx, _dir) = app();
        app.move_down();
        app.adjust_threshold(1.0);
        app.toggle_spellcasting();
        let s = app.settings_snapshot();
        assert_eq!(*s.thresholds.get(ResourceKind::Mana), 31.0);
        assert!(s.spellcasting.enabled);
    }

    #[test]
    fn test_save_writes_file() {
        let (mut app, _tx, _dir) = app();
        app.save_settings();
        assert!(app.settings_path.is_file());
    }

    #[test]
    fn test_quit_asks_while_running() {
        let (mut app, _tx, _dir) = app();
        app.start_stop();
        app.request_quit();
        assert!(app.confirm.is_some());
        assert!(!app.should_quit);

        app.answer_confirm(false);
        assert!(app.confirm.is_none());
        assert!(app.controller.is_running());

        app.request_quit();
        app.answer_confirm(true);
        assert!(app.should_quit);
        assert!(!app.controller.is_running());
    }

    #[test]
    fn test_drain_logs_caps_history() {
        let (mut app, tx, _dir) = app();
        for i in 0..LOG_CAPACITY + 10 {
            tx.send(LogLine {
                level: tracing::Level::INFO,
                prefix: "test".into(),
                timestamp: "00:00:00".into(),
                message: i.to_string(),
            })
            .unwrap();
        }
        app.drain_logs();
        assert_eq!(app.log_messages.len(), LOG_CAPACITY);
        assert_eq!(app.log_messages[0].message, "10");
    }
}
