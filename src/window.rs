use log::debug;

/// Window-visibility collaborator. Dispatch always ends with `hide`.
pub trait WindowControl: Send + Sync {
    fn hide(&self);
}

/// Stand-in used when no palette window exists (CLI sessions).
pub struct HeadlessWindow;

impl WindowControl for HeadlessWindow {
    fn hide(&self) {
        debug!("Hide requested");
    }
}
