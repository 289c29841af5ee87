//! Human-pacing helpers: randomized delays, scroll passes, mouse drift.
//!
//! These are anti-detection measures, not efficiency tuning - the wide delay
//! windows are deliberate and shortening them changes the engine's
//! detection profile.

use chromiumoxide::Page;
use rand::distr::{Distribution, Uniform};
use std::time::Duration;
use tracing::warn;

/// Random duration in `[min_ms, max_ms]`.
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    let ms = {
        let mut rng = rand::rng();
        Uniform::new_inclusive(min_ms, max_ms.max(min_ms))
            .unwrap()
            .sample(&mut rng)
    };
    Duration::from_millis(ms)
}

/// Random inter-query pause drawn from the configured window (seconds).
pub fn query_pause(min_secs: u64, max_secs: u64) -> Duration {
    jitter(min_secs * 1_000, max_secs * 1_000)
}

/// Simulate a human skimming the page: a few smooth scroll passes with
/// reading pauses, an occasional scroll-up, and some mouse drift.
pub async fn browse(page: &Page) {
    // Sample all randomness up front; the rng is not held across awaits.
    let scroll_actions: Vec<(u16, u64, bool, u16)> = {
        let mut rng = rand::rng();
        let pass_dist = Uniform::new(2usize, 6).unwrap();
        let scroll_dist = Uniform::new(200u16, 700).unwrap();
        let pause_dist = Uniform::new(800u64, 2_000).unwrap();
        let scroll_up_dist = Uniform::new(50u16, 200).unwrap();
        let chance_dist = Uniform::new(0u8, 5).unwrap();

        (0..pass_dist.sample(&mut rng))
            .map(|_| {
                (
                    scroll_dist.sample(&mut rng),
                    pause_dist.sample(&mut rng),
                    chance_dist.sample(&mut rng) == 0,
                    scroll_up_dist.sample(&mut rng),
                )
            })
            .collect()
    };

    for (down, read_pause, scroll_back, up) in scroll_actions {
        if let Err(e) = page
            .evaluate(format!(
                "window.scrollBy({{top: {}, behavior: 'smooth'}});",
                down
            ))
            .await
        {
            warn!("Scroll simulation error: {}", e);
        }
        tokio::time::sleep(Duration::from_millis(read_pause)).await;

        if scroll_back {
            if let Err(e) = page
                .evaluate(format!(
                    "window.scrollBy({{top: -{}, behavior: 'smooth'}});",
                    up
                ))
                .await
            {
                warn!("Scroll-up simulation error: {}", e);
            }
            tokio::time::sleep(Duration::from_millis(200 + (up as u64 % 300))).await;
        }
    }

    mouse_drift(page, 3).await;
    tokio::time::sleep(jitter(500, 1_500)).await;
}

/// A single light mouse movement, used during challenge waits so the session
/// does not look idle to the remote side's timing heuristics.
pub async fn idle_nudge(page: &Page) {
    mouse_drift(page, 1).await;
}

async fn mouse_drift(page: &Page, moves: usize) {
    let points: Vec<(i32, i32, u64)> = {
        let mut rng = rand::rng();
        let x_dist = Uniform::new(100, 1_200).unwrap();
        let y_dist = Uniform::new(100, 800).unwrap();
        let delay_dist = Uniform::new(100u64, 400).unwrap();
        (0..moves)
            .map(|_| {
                (
                    x_dist.sample(&mut rng),
                    y_dist.sample(&mut rng),
                    delay_dist.sample(&mut rng),
                )
            })
            .collect()
    };

    for (x, y, delay) in points {
        if let Err(e) = page
            .evaluate(format!("document.elementFromPoint({}, {})", x, y))
            .await
        {
            warn!("Mouse simulation error: {}", e);
        }
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_window() {
        for _ in 0..100 {
            let d = jitter(100, 200);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200));
        }
    }

    #[test]
    fn jitter_tolerates_degenerate_window() {
        assert_eq!(jitter(500, 500), Duration::from_millis(500));
        // max < min clamps to min rather than panicking
        assert_eq!(jitter(500, 100), Duration::from_millis(500));
    }
}
