use log::error;
use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// User-visible error surface.
pub trait Notifier: Send + Sync {
    fn error(&self, title: &str, message: &str);
}

/// Blocking native message box.
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/// For sessions without a display; errors only reach the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}
