//! Session/stealth manager built on `chromiumoxide`.
//!
//! This module is the single source of truth for:
//! * Finding a usable Chromium-family executable (cross-platform).
//! * Launching the one headless browser a harvest run owns.
//! * [`ScrapeSession`] - an explicit, single-owner handle around that
//!   browser and its single page, passed by value/reference to every
//!   component instead of living as ambient state.
//! * Settle-wait (`wait_until_stable`) for JS-hydrated result pages.
//!
//! One run = one browser = one page, strictly sequential navigation.
//! Concurrent tabs would multiply the fingerprint surface and defeat the
//! human-pacing strategy, so none are opened.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::types::HarvestError;
use crate::core::HarvestConfig;
use crate::scraping::{humanize, stealth};

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan - finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
            "brave",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Build a `BrowserConfig` for headless operation with stealth defaults.
///
/// `--disable-blink-features=AutomationControlled` hides the
/// `navigator.webdriver` flag at the process level; the rest of the masking
/// happens in [`stealth::stealth_script`]. The no-sandbox/dev-shm flags keep
/// launches working in CI and containerized environments.
fn build_headless_config(exe: &str, user_agent: &str) -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1920,
            height: 1080,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1920, 1080)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", user_agent))
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── ScrapeSession ────────────────────────────────────────────────────────────

/// Single-owner handle around one browser and its one live page.
///
/// Created once per run, destroyed (browser closed) at run end or on fatal
/// error. Never shared across concurrent queries.
pub struct ScrapeSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    user_agent: &'static str,
}

impl ScrapeSession {
    /// Launch the browser and prepare the single stealth-configured page.
    ///
    /// Launch failure (no executable, sandbox restriction) is fatal - the
    /// engine cannot proceed and reports [`HarvestError::Session`] instead
    /// of retrying indefinitely.
    pub async fn launch() -> Result<Self, HarvestError> {
        let exe = find_chrome_executable().ok_or_else(|| {
            HarvestError::Session(
                "no browser found - install Chrome or Chromium, or set CHROME_EXECUTABLE"
                    .to_string(),
            )
        })?;

        let user_agent = stealth::random_user_agent();
        info!("🚀 Launching headless browser ({})", exe);
        info!("🎭 User-Agent: {}", user_agent);

        let config = build_headless_config(&exe, user_agent)
            .map_err(|e| HarvestError::Session(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Session(format!("launch failed ({}): {}", exe, e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Session(format!("failed to open page: {}", e)))?;

        // Navigator overrides must be registered before the first real
        // navigation so they run ahead of any page script.
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            stealth::stealth_script(),
        ))
        .await
        .map_err(|e| HarvestError::Session(format!("stealth injection failed: {}", e)))?;

        let mut headers = serde_json::Map::new();
        for (k, v) in stealth::stealth_headers() {
            headers.insert(k.to_string(), serde_json::Value::String(v.to_string()));
        }
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::Value::Object(headers),
        )))
        .await
        .map_err(|e| HarvestError::Session(format!("header setup failed: {}", e)))?;

        Ok(Self {
            browser: Some(browser),
            page,
            handler_task,
            user_agent,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }

    /// Navigate the session page and wait for the document to settle.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        info!("🌐 Navigating: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| anyhow!("navigation to {} failed: {}", url, e))?;

        let idle = humanize::jitter(1_000, 3_000);
        tokio::time::sleep(idle).await;
        wait_until_stable(&self.page, 1_500, 10_000).await
    }

    /// Multi-step warm-up: a neutral search engine, a benign query, then one
    /// or two high-trust domains, with humanized pauses throughout. Builds
    /// organic-looking session history before the target site is touched.
    /// Every step is best-effort; failures are logged and skipped.
    pub async fn warm_up(&self, cfg: &HarvestConfig) {
        info!("🔥 Warm-up sequence ({} sites)", cfg.warmup_sites.len() + 2);

        let steps = {
            let mut v = vec![
                "https://www.google.com".to_string(),
                "https://www.google.com/search?q=engineering+jobs".to_string(),
            ];
            v.extend(cfg.warmup_sites.iter().cloned());
            v
        };

        for url in steps {
            match self.navigate(&url).await {
                Ok(()) => humanize::browse(&self.page).await,
                Err(e) => warn!("⚠️ Warm-up step skipped ({}): {}", url, e),
            }
        }

        info!("✅ Warm-up completed");
    }

    /// Capture a diagnostic PNG into `dir` with a timestamped filename.
    pub async fn screenshot(&self, dir: &str, label: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = Path::new(dir).join(format!(
            "{}-{}.png",
            label,
            chrono::Utc::now().timestamp_millis()
        ));
        let bytes: Vec<u8> = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(|e| anyhow!("screenshot failed: {}", e))?;
        tokio::fs::write(&path, &bytes).await?;
        info!("📸 Diagnostic screenshot: {}", path.display());
        Ok(path)
    }

    /// Release the browser. Must run on both normal completion and error
    /// exit - leaked headless processes are the classic operational failure
    /// mode for this kind of engine.
    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close error (non-fatal): {}", e);
            }
        }
        self.handler_task.abort();
        info!("🛑 Scrape session closed");
    }
}

impl Drop for ScrapeSession {
    fn drop(&mut self) {
        // Best-effort cleanup when `close()` was skipped (panic/early return).
        // Drop cannot await; spawn the close if a runtime is still around.
        self.handler_task.abort();
        if let Some(mut browser) = self.browser.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                });
            }
        }
    }
}

// ── Settle-wait ──────────────────────────────────────────────────────────────

/// Wait until the page network goes idle (no new resource entries for
/// `quiet_ms` consecutive ms) or until `timeout_ms` has elapsed.
///
/// Polls `performance.getEntriesByType("resource").length` every 250 ms - a
/// networkidle heuristic that works without subscribing to CDP Network
/// events, which matters for JS-hydrated results pages that keep loading
/// cards after `load` fires.
pub async fn wait_until_stable(page: &Page, quiet_ms: u64, timeout_ms: u64) -> Result<()> {
    let poll_ms = 250u64;
    let start = std::time::Instant::now();
    let mut last_count: u64 = 0;
    let mut stable_since = std::time::Instant::now();

    loop {
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            info!("wait_until_stable: timeout after {}ms", timeout_ms);
            break;
        }

        let count: u64 = page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0);

        let ready_complete: bool = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false);

        if !ready_complete {
            stable_since = std::time::Instant::now();
            last_count = count;
        } else if count != last_count {
            last_count = count;
            stable_since = std::time::Instant::now();
        } else if stable_since.elapsed().as_millis() as u64 >= quiet_ms {
            break;
        }

        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }
    Ok(())
}
