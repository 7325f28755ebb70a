//! Ctrl-C handling shared by the backfill sweep and the polling loop

use crate::logging::get_logger;
use tokio::sync::watch;

/// Start listening for Ctrl-C right away
///
/// The handler is installed by a spawned task, so it is in place before the
/// first portal request. The receiver turns `true` on the first Ctrl-C.
pub fn listen_for_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tx.send_replace(true);
            }
            Err(e) => {
                get_logger("shutdown").error(&format!("Cannot listen for Ctrl-C: {}", e));
            }
        }
    });
    rx
}

/// Resolves once shutdown is requested
///
/// Never resolves when the listener went away without a request.
pub async fn requested(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
