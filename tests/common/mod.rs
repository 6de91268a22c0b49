#![allow(dead_code)]

use mirrortools::{MirrorEvent, MirrorOptions, Notifier};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

/// 收集全部通知，便于按种类断言
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<MirrorEvent>>,
}

impl Notifier for Recorder {
    fn notify(&self, event: MirrorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<MirrorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

pub fn opts() -> MirrorOptions {
    MirrorOptions::default()
}
