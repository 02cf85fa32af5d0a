// Per-screen state that decides which reads run and whether late results still land

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Liveness of a mounted screen; dropping the scope marks it gone
#[derive(Debug)]
pub struct ScreenScope {
    name: String,
    alive: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct ScopeHandle {
    alive: Arc<AtomicBool>,
}

impl ScopeHandle {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    // None when the screen went away before `fut` resolved
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let output = fut.await;
        self.is_alive().then_some(output)
    }
}

impl ScreenScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> ScopeHandle {
        ScopeHandle {
            alive: Arc::clone(&self.alive),
        }
    }

    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        self.handle().run(fut).await
    }
}

impl Drop for ScreenScope {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

// Detail dialogs read only while open with a row selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailGate {
    pub selected: Option<String>,
    pub dialog_open: bool,
}

impl DetailGate {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn open(id: impl Into<String>) -> Self {
        Self {
            selected: Some(id.into()),
            dialog_open: true,
        }
    }

    pub fn enabled(&self) -> bool {
        self.selected.is_some() && self.dialog_open
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.selected = Some(id.into());
        self.dialog_open = true;
    }

    // Keeps the selection so the dialog can reopen on the same row
    pub fn close(&mut self) {
        self.dialog_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn test_gate_requires_selection_and_open_dialog() {
        let mut gate = DetailGate::closed();
        assert!(!gate.enabled());

        gate.dialog_open = true;
        assert!(!gate.enabled());

        gate.select("b1");
        assert!(gate.enabled());

        gate.close();
        assert!(!gate.enabled());
        assert_eq!(gate.selected.as_deref(), Some("b1"));
    }

    #[tokio::test]
    async fn test_late_result_is_dropped_after_unmount() {
        let scope = ScreenScope::new("bookings");
        assert_eq!(scope.run(async { 7 }).await, Some(7));

        let handle = scope.handle();
        let (tx, rx) = oneshot::channel::<u32>();
        let pending = tokio::spawn(async move { handle.run(rx).await });

        drop(scope);
        tx.send(42).unwrap();
        assert_eq!(pending.await.unwrap(), None);
    }
}
