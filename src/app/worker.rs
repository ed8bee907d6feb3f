use std::sync::mpsc;
use std::time::Duration;

pub(super) const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Run `work` on a throwaway thread and hand its result back on the GTK
/// main loop. Widgets are only ever touched from `on_result`.
pub(super) fn spawn_worker_action<T, W, H>(work: W, mut on_result: H)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    H: FnMut(T) + 'static,
{
    let (tx, rx) = mpsc::channel::<T>();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });

    gtk4::glib::timeout_add_local(WORKER_POLL_INTERVAL, move || match rx.try_recv() {
        Ok(result) => {
            on_result(result);
            gtk4::glib::ControlFlow::Break
        }
        Err(mpsc::TryRecvError::Empty) => gtk4::glib::ControlFlow::Continue,
        Err(mpsc::TryRecvError::Disconnected) => {
            tracing::warn!("capture worker dropped its result channel");
            gtk4::glib::ControlFlow::Break
        }
    });
}
