//! Shared test utilities and fixtures
//!
//! Fake analyzers are small `/bin/sh` scripts written into a temp dir. They
//! read the document from stdin like the real tool and print a report in
//! the analyzer's plain text format.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flint_check::{CheckController, CheckerConfig};
use flint_types::{Diagnostic, Document, DocumentId};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// Write an executable script standing in for the analyzer.
pub fn fake_analyzer(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-eslint");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Analyzer that swallows its input and prints `report` verbatim.
pub fn reporting_analyzer(dir: &Path, report: &str) -> PathBuf {
    let report = report.replace('\'', r"'\''");
    fake_analyzer(dir, &format!("cat >/dev/null\nprintf '%s\\n' '{report}'"))
}

/// Analyzer that reads its input, then hangs until killed.
pub fn hanging_analyzer(dir: &Path) -> PathBuf {
    fake_analyzer(dir, "cat >/dev/null\nexec sleep 30")
}

pub fn controller(program: PathBuf) -> CheckController {
    CheckController::new(CheckerConfig::new(program))
}

/// A document living at `dir/name`; the file itself need not exist.
pub fn document(id: u64, dir: &Path, name: &str, text: &str) -> Document {
    Document::new(DocumentId::new(id), dir.join(name), text)
}

pub type Delivered = Arc<Mutex<Vec<Vec<Diagnostic>>>>;

/// A report callback that records every delivery.
pub fn recorder() -> (Delivered, impl FnOnce(Vec<Diagnostic>) + Send + 'static) {
    let delivered: Delivered = Arc::default();
    let sink = Arc::clone(&delivered);
    (delivered, move |diagnostics| sink.lock().unwrap().push(diagnostics))
}

pub fn deliveries(delivered: &Delivered) -> Vec<Vec<Diagnostic>> {
    delivered.lock().unwrap().clone()
}

/// Wait for every live run, failing the test instead of hanging.
pub async fn settle(controller: &mut CheckController) {
    tokio::time::timeout(WAIT, controller.wait_idle())
        .await
        .expect("runs did not settle in time");
}
