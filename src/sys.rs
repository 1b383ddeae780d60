//! Platform glue: cooperative sleeping and handing URLs to the OS.

use std::time::Duration;

/// Suspend the current task for `duration` without blocking the thread.
///
/// Natively this is a tokio timer; in the browser it awaits a `setTimeout`
/// promise. A zero duration returns immediately on every platform.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;

    #[cfg(all(target_arch = "wasm32", feature = "wasm"))]
    {
        let millis = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if let Some(window) = web_sys::window() {
                let _ = window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
            }
        });
        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }
}

/// Hand `url` to the platform's default handler (browser, mail client).
///
/// Fire-and-forget: the handler process is spawned and not waited on.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_url(url: &str) -> crate::Result<()> {
    use std::process::{Command, Stdio};

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| crate::Error::Other(format!("Failed to launch URL handler: {}", e)))?;
    Ok(())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let start = std::time::Instant::now();
        sleep(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_for_duration() {
        let start = tokio::time::Instant::now();
        sleep(Duration::from_millis(500)).await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
