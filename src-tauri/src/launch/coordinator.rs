use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, RwLock,
};

use anyhow::Result;

use super::deep_link::{extract_deep_link, parse_deep_link, DeepLinkAction};
use crate::{
    log_debug, log_error, log_info, log_warn, notifications::REMINDER_FLAG,
    settings::StartupSettings,
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "launch";

/// Passed by the autostart login item.
pub const AUTOSTART_FLAG: &str = "--autostart";
const HIDDEN_FLAGS: [&str; 2] = ["--hidden", AUTOSTART_FLAG];

/// The window operations launch handling needs.
pub trait MainWindow: Send + Sync {
    /// Show, unminimize and focus.
    fn reveal(&self) -> Result<()>;
    fn dispatch(&self, action: &DeepLinkAction) -> Result<()>;
}

/// Shared handle to the current main window. `set_main_window` is the only
/// writer.
#[derive(Default)]
pub struct AppContext {
    main_window: RwLock<Option<Arc<dyn MainWindow>>>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_main_window(&self, window: Arc<dyn MainWindow>) {
        *self
            .main_window
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(window);
    }

    pub fn main_window(&self) -> Option<Arc<dyn MainWindow>> {
        self.main_window
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchContext {
    ColdStart,
    ProtocolActivation(String),
    SecondInstance(Vec<String>),
    AutoLaunchedHidden,
    /// Started by a scheduled reminder; only the notification is shown.
    Reminder,
}

impl LaunchContext {
    /// Classifies this process's own launch from its arguments. A deep link
    /// takes precedence over the reminder flag, which takes precedence over
    /// the hidden/autostart flags.
    pub fn classify(argv: &[String]) -> Self {
        if let Some(url) = extract_deep_link(argv) {
            return LaunchContext::ProtocolActivation(url.to_string());
        }
        if argv.iter().any(|arg| arg == REMINDER_FLAG) {
            return LaunchContext::Reminder;
        }
        if argv.iter().any(|arg| HIDDEN_FLAGS.contains(&arg.as_str())) {
            return LaunchContext::AutoLaunchedHidden;
        }
        LaunchContext::ColdStart
    }
}

/// Auto-launch flags never override the preference in either direction.
pub fn should_start_minimized(startup: &StartupSettings) -> bool {
    startup.start_minimized
}

#[derive(Default)]
struct DispatchQueue {
    window_ready: bool,
    pending: Vec<DeepLinkAction>,
}

pub struct LaunchCoordinator {
    context: Arc<AppContext>,
    queue: Mutex<DispatchQueue>,
    auto_launched: AtomicBool,
}

impl LaunchCoordinator {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            queue: Mutex::new(DispatchQueue::default()),
            auto_launched: AtomicBool::new(false),
        }
    }

    /// Handles a launch event and returns whether the window was shown.
    pub fn handle(&self, launch: LaunchContext, startup: &StartupSettings) -> bool {
        log_debug!("handling {launch:?}");
        match launch {
            LaunchContext::ColdStart => self.reveal_unless_minimized(startup),
            LaunchContext::AutoLaunchedHidden => {
                self.auto_launched.store(true, Ordering::SeqCst);
                self.reveal_unless_minimized(startup)
            }
            LaunchContext::Reminder => {
                log_info!("reminder launch; window stays hidden");
                false
            }
            LaunchContext::ProtocolActivation(url) => {
                self.open_url(&url);
                self.reveal();
                true
            }
            LaunchContext::SecondInstance(argv) => {
                if let Some(url) = extract_deep_link(&argv) {
                    self.open_url(url);
                }
                self.reveal();
                true
            }
        }
    }

    /// Parses and dispatches a deep link; links arriving before the renderer
    /// signals readiness are queued. Unrecognised links are dropped.
    pub fn open_url(&self, url: &str) {
        let Some(action) = parse_deep_link(url) else {
            log_warn!("ignoring deep link {url:?}");
            return;
        };

        let mut queue = self.lock_queue();
        if !queue.window_ready {
            log_debug!("queueing {:?} until the window is ready", action.action);
            queue.pending.push(action);
            return;
        }
        self.dispatch(&action);
    }

    /// Called once the renderer is listening; flushes queued deep links in
    /// arrival order.
    pub fn window_ready(&self) {
        let mut queue = self.lock_queue();
        queue.window_ready = true;
        let pending = std::mem::take(&mut queue.pending);
        if !pending.is_empty() {
            log_info!("delivering {} queued deep link(s)", pending.len());
        }
        for action in &pending {
            self.dispatch(action);
        }
    }

    /// Forces the window visible (tray click, dock reopen, deep link).
    pub fn reveal(&self) {
        match self.context.main_window() {
            Some(window) => {
                if let Err(err) = window.reveal() {
                    log_error!("failed to show main window: {err:#}");
                }
            }
            None => log_warn!("no main window to show"),
        }
    }

    pub fn was_auto_launched(&self) -> bool {
        self.auto_launched.load(Ordering::SeqCst)
    }

    fn reveal_unless_minimized(&self, startup: &StartupSettings) -> bool {
        if should_start_minimized(startup) {
            log_info!("starting minimized; window deferred until user interaction");
            return false;
        }
        self.reveal();
        true
    }

    fn dispatch(&self, action: &DeepLinkAction) {
        match self.context.main_window() {
            Some(window) => {
                if let Err(err) = window.dispatch(action) {
                    log_error!("failed to deliver deep link: {err:#}");
                }
            }
            None => log_warn!("deep link {:?} dropped: no main window", action.action),
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, DispatchQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
