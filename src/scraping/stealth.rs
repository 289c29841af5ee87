//! Fingerprint masking: user-agent pool, realistic request headers, and the
//! navigator-override script injected before any page script runs.
//!
//! Process-level defaults (UA, browser flags) live in [`super::browser`];
//! this module owns everything that is *data*.

use rand::seq::IndexedRandom;

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox 133 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Edge 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
///
/// Mobile profiles are deliberately excluded: job-board result layouts vary
/// by form factor and the selector chains target the desktop markup.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Header set matching what a real browser sends on a top-level navigation.
pub fn stealth_headers() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
        ("Cache-Control", "max-age=0"),
        ("DNT", "1"),
    ]
}

/// Navigator-override script, injected via `AddScriptToEvaluateOnNewDocument`
/// so it runs before any page script on every navigation.
///
/// Covers the signals challenge vendors are known to probe: the webdriver
/// flag (masked as *absent*, not `false`), plugin and language lists,
/// hardware hints, the chrome runtime object, and the notification
/// permission query.
pub fn stealth_script() -> &'static str {
    r#"
// Navigator hardening - run before anything else.
(() => {
    try {
        const proto = Navigator.prototype;

        // webdriver: prefer "absent" (undefined) over false
        try {
            Object.defineProperty(proto, 'webdriver', {
                get: () => undefined,
                configurable: true,
            });
        } catch (e) {}
        try { delete navigator.webdriver; } catch (e) {}

        try {
            Object.defineProperty(proto, 'languages', {
                get: () => ['en-US', 'en'],
                configurable: true,
            });
        } catch (e) {}

        // plugins: simple non-empty stub
        try {
            Object.defineProperty(proto, 'plugins', {
                get: () => [1, 2, 3, 4, 5],
                configurable: true,
            });
        } catch (e) {}

        // Hardware hints consistent with a mid-range desktop.
        try {
            Object.defineProperty(proto, 'deviceMemory', {
                get: () => 8,
                configurable: true,
            });
            Object.defineProperty(proto, 'hardwareConcurrency', {
                get: () => 4,
                configurable: true,
            });
        } catch (e) {}
    } catch (e) {}
})();

// Chrome runtime stub (CDP detection bypass). Most detectors only check for
// presence + basic callability.
if (!window.chrome) {
    window.chrome = {};
}
if (!window.chrome.runtime) {
    window.chrome.runtime = {
        connect: function() { return { onDisconnect: { addListener: function() {} } }; },
        sendMessage: function() {},
    };
}
window.chrome.loadTimes = function() {
    return { requestTime: Date.now() / 1000, finishDocumentLoadTime: (Date.now() + 500) / 1000 };
};

// Notification-permission probe consistency.
const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
if (originalQuery) {
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters)
    );
}

// Automation marker cleanup.
delete window.__playwright;
delete window.__puppeteer;
delete window.__selenium;
delete window.callPhantom;
delete window._phantom;
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_pool_is_desktop_only() {
        for ua in DESKTOP_USER_AGENTS {
            assert!(ua.contains("Mozilla"));
            assert!(!ua.contains("Mobile"));
        }
        assert!(random_user_agent().contains("Mozilla"));
    }

    #[test]
    fn headers_cover_sec_fetch_set() {
        let headers = stealth_headers();
        for key in ["Accept-Language", "Sec-Fetch-Dest", "Sec-Fetch-Mode"] {
            assert!(headers.iter().any(|(k, _)| *k == key), "missing {key}");
        }
    }
}
