//! Plex library scan command.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::Notify;

use crate::config::Config;
use crate::error::CallbackResult;
use crate::scan::{ScanCompletionCallback, ScanDebounceController, ScanPhase};

use super::scan_controller;

/// Request (or force) a scan.
///
/// The controller's timers live on this process's runtime, so the command
/// stays up at least until the scan has been triggered.
pub fn cmd_scan(rt: &Runtime, config: &Config, force: bool, wait: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let controller = scan_controller(config);
        let finished = Arc::new(Notify::new());

        let notify = finished.clone();
        let callback: Arc<dyn ScanCompletionCallback> = Arc::new(move || -> CallbackResult {
            notify.notify_one();
            Ok(())
        });
        controller.add_completion_callback(callback);

        if force {
            controller.force_scan().await;
        } else {
            controller.request_scan("Requested from command line");
            println!(
                "Scan queued, waiting {}s for further requests...",
                controller.get_status().delay.as_secs()
            );
            wait_for_trigger(&controller).await;
        }

        match controller.get_status().phase {
            ScanPhase::InProgress => println!("Library scan started."),
            _ => {
                println!("Library scan was not started (see log for details).");
                return;
            }
        }

        if wait {
            println!("Waiting for the scan to finish (Ctrl+C to stop)...");
            tokio::select! {
                _ = finished.notified() => println!("Library scan finished."),
                _ = tokio::signal::ctrl_c() => println!("Stopped waiting."),
            }
        }
        controller.shutdown();
    });
    Ok(())
}

/// Block until the debounce timer has fired or Ctrl+C is pressed.
async fn wait_for_trigger(controller: &ScanDebounceController) {
    let poll = async {
        while controller.get_status().phase == ScanPhase::Pending {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    };
    tokio::select! {
        _ = poll => {}
        _ = tokio::signal::ctrl_c() => controller.shutdown(),
    }
}
