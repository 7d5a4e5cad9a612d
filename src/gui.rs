//! Debug control panel sink.
//!
//! Scenes and passes register a folder per namespace. When the panel is suppressed the
//! [`NoopPanel`] swallows everything, otherwise [`LogPanel`] keeps track of the open
//! folders and reports changes through the log.

use std::{cell::RefCell, rc::Rc};

use crate::settings::Settings;

pub trait DebugPanel {
    fn add_folder(&self, name: &str);
    fn remove_folder(&self, name: &str);
    /// Report a tweakable value (for display only).
    fn watch(&self, folder: &str, label: &str, value: f32);
}

pub type SharedPanel = Rc<dyn DebugPanel>;

pub fn panel_for(settings: &Settings) -> SharedPanel {
    if settings.gui {
        Rc::new(LogPanel::default())
    } else {
        Rc::new(NoopPanel)
    }
}

pub struct NoopPanel;

impl DebugPanel for NoopPanel {
    fn add_folder(&self, _: &str) {}
    fn remove_folder(&self, _: &str) {}
    fn watch(&self, _: &str, _: &str, _: f32) {}
}

#[derive(Default)]
pub struct LogPanel {
    folders: RefCell<Vec<String>>,
}

impl LogPanel {
    pub fn folders(&self) -> Vec<String> {
        self.folders.borrow().clone()
    }
}

impl DebugPanel for LogPanel {
    fn add_folder(&self, name: &str) {
        let mut folders = self.folders.borrow_mut();
        if folders.iter().any(|f| f == name) {
            log::warn!("debug panel folder {name} already exists");
            return;
        }
        log::debug!("debug panel: + {name}");
        folders.push(name.to_string());
    }

    fn remove_folder(&self, name: &str) {
        log::debug!("debug panel: - {name}");
        self.folders.borrow_mut().retain(|f| f != name);
    }

    fn watch(&self, folder: &str, label: &str, value: f32) {
        log::trace!("{folder}/{label} = {value}");
    }
}
