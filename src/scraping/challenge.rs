//! Anti-bot interstitial detection and the bounded clearance wait.
//!
//! Detection is a pure function over the page title and rendered body so it
//! can be exercised without a browser; the polling loop is generic over a
//! probe for the same reason.

use chromiumoxide::Page;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::CancelToken;
use crate::scraping::humanize;

/// Derived fresh on every navigation from title/content inspection.
/// Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Clear,
    /// An interstitial that may clear on its own (edge-layer JS check).
    Challenged,
    /// A terminal block page. Waiting will not help; the current query is
    /// abandoned.
    Blocked,
}

/// Interstitial signatures: pages that frequently clear after the edge
/// layer's JS check completes.
const CHALLENGE_SIGNATURES: &[&str] = &[
    "just a moment",
    "attention required",
    "checking your browser",
    "please wait while we check your browser",
    "challenges.cloudflare.com",
    "ray id",
];

/// Hard-block signatures: waiting never clears these.
const BLOCK_SIGNATURES: &[&str] = &[
    "verify you are human",
    "unusual traffic",
    "security check",
    "access denied",
    "scraping detected",
];

/// Classify a page from its title and rendered text.
///
/// Interstitial signatures are checked first: a challenge page often also
/// contains block-ish wording, and misreading it as terminal would abandon a
/// query that was seconds from clearing.
pub fn detect(title: &str, body: &str) -> ChallengeState {
    let title = title.to_lowercase();
    let body = body.to_lowercase();

    for sig in CHALLENGE_SIGNATURES {
        if title.contains(sig) || body.contains(sig) {
            return ChallengeState::Challenged;
        }
    }
    for sig in BLOCK_SIGNATURES {
        if title.contains(sig) || body.contains(sig) {
            return ChallengeState::Blocked;
        }
    }
    ChallengeState::Clear
}

/// Outcome of a clearance wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// The page cleared after this many poll ticks.
    Cleared { ticks: u32 },
    TimedOut,
    Cancelled,
}

/// Poll `probe` once per `tick` up to `max_ticks`, returning as soon as it
/// reports [`ChallengeState::Clear`]. The probe receives the tick number so
/// callers can interleave idle behavior. The cancel token is honored between
/// ticks.
pub async fn poll_until_clear<P, Fut>(
    mut probe: P,
    max_ticks: u32,
    tick: Duration,
    cancel: &CancelToken,
) -> Clearance
where
    P: FnMut(u32) -> Fut,
    Fut: Future<Output = ChallengeState>,
{
    for i in 0..max_ticks {
        if cancel.is_cancelled() {
            return Clearance::Cancelled;
        }
        if probe(i).await == ChallengeState::Clear {
            return Clearance::Cleared { ticks: i };
        }
        tokio::time::sleep(tick).await;
    }
    Clearance::TimedOut
}

/// Classify the session page right now.
pub async fn probe_page(page: &Page) -> ChallengeState {
    let title = page
        .evaluate("document.title")
        .await
        .ok()
        .and_then(|h| h.into_value::<String>().ok())
        .unwrap_or_default();
    let body = page.content().await.unwrap_or_default();
    detect(&title, &body)
}

/// Wait up to `budget_secs` for the current interstitial to clear, polling
/// once per second and nudging the mouse every few ticks so the wait does
/// not read as an idle automated session.
pub async fn await_clearance(page: &Page, budget_secs: u64, cancel: &CancelToken) -> Clearance {
    info!("⏳ Challenge detected - waiting up to {}s", budget_secs);
    let outcome = poll_until_clear(
        |i| async move {
            if i > 0 && i % 5 == 0 {
                info!("⏳ Still waiting... {}/{}s", i, budget_secs);
                humanize::idle_nudge(page).await;
            }
            probe_page(page).await
        },
        budget_secs as u32,
        Duration::from_secs(1),
        cancel,
    )
    .await;

    match outcome {
        Clearance::Cleared { ticks } => info!("✅ Challenge cleared after {}s", ticks),
        Clearance::TimedOut => warn!("❌ Challenge not cleared within {}s", budget_secs),
        Clearance::Cancelled => info!("🛑 Clearance wait cancelled"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_page_is_clear() {
        assert_eq!(
            detect("jobs in boston | example", "<html><body>42 results</body></html>"),
            ChallengeState::Clear
        );
    }

    #[test]
    fn interstitial_title_is_challenged() {
        assert_eq!(
            detect("Just a moment...", "<html></html>"),
            ChallengeState::Challenged
        );
        assert_eq!(
            detect("", "Checking your browser before accessing"),
            ChallengeState::Challenged
        );
    }

    #[test]
    fn hard_block_body_is_blocked() {
        assert_eq!(
            detect("Error", "Our systems have detected unusual traffic"),
            ChallengeState::Blocked
        );
        assert_eq!(detect("Access Denied", ""), ChallengeState::Blocked);
    }

    #[test]
    fn interstitial_wording_wins_over_block_wording() {
        // A Cloudflare interstitial that also says "verify you are human"
        // must stay waitable.
        assert_eq!(
            detect("Just a moment...", "verify you are human"),
            ChallengeState::Challenged
        );
    }

    #[tokio::test]
    async fn clearance_returns_after_the_scripted_tick() {
        let cancel = CancelToken::new();
        // Challenged for ticks 0..3, clear from tick 3 on.
        let outcome = poll_until_clear(
            |i| async move {
                if i < 3 {
                    ChallengeState::Challenged
                } else {
                    ChallengeState::Clear
                }
            },
            30,
            Duration::from_millis(5),
            &cancel,
        )
        .await;
        assert_eq!(outcome, Clearance::Cleared { ticks: 3 });
    }

    #[tokio::test]
    async fn clearance_times_out_when_never_clear() {
        let cancel = CancelToken::new();
        let outcome = poll_until_clear(
            |_| async { ChallengeState::Challenged },
            4,
            Duration::from_millis(2),
            &cancel,
        )
        .await;
        assert_eq!(outcome, Clearance::TimedOut);
    }

    #[tokio::test]
    async fn cancellation_is_honored_between_ticks() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = poll_until_clear(
            |_| async { ChallengeState::Challenged },
            10,
            Duration::from_millis(2),
            &cancel,
        )
        .await;
        assert_eq!(outcome, Clearance::Cancelled);
    }
}
