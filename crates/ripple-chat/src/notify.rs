use std::sync::atomic::{AtomicBool, Ordering};

/// Notification sink. The push/OS layer is an external collaborator; the
/// lifecycle manager only decides *when* to fire.
pub trait Notifier: Send + Sync {
    fn show(&self, title: &str, body: &str, icon: Option<&str>);
}

/// Drops notifications. For headless embedders and tests that don't care.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn show(&self, _title: &str, _body: &str, _icon: Option<&str>) {}
}

/// Whether the app is currently in the foreground. The shell flips this
/// on focus/blur; the receive path reads it to decide on notifications.
pub struct AppVisibility {
    foreground: AtomicBool,
}

impl AppVisibility {
    pub fn foreground() -> Self {
        Self {
            foreground: AtomicBool::new(true),
        }
    }

    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::Relaxed);
    }

    pub fn is_backgrounded(&self) -> bool {
        !self.foreground.load(Ordering::Relaxed)
    }
}
