use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tokio::time::{Instant, interval_at, sleep};

/// Count down from `from` to zero, emitting each value after waiting `every`.
pub fn countdown(from: u32, every: Duration) -> impl Stream<Item = u32> + Send + 'static {
    stream! {
        for remaining in (0..=from).rev() {
            sleep(every).await;
            yield remaining;
        }
    }
}

/// Elapsed whole seconds since the game started: first tick after one second, then every second.
pub fn game_timer() -> impl Stream<Item = u64> + Send + 'static {
    stream! {
        let period = Duration::from_secs(1);
        let mut ticks = interval_at(Instant::now() + period, period);
        let mut seconds = 0_u64;
        loop {
            ticks.tick().await;
            yield seconds;
            seconds += 1;
        }
    }
}

/// Render a duration as `"M minute(s) S second(s)"`, leaving out zero parts.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let minutes = total / 60;
    let seconds = total % 60;

    let mut parts = Vec::with_capacity(2);
    if minutes > 0 {
        parts.push(format!("{minutes} {}", plural(minutes, "minute")));
    }
    if seconds > 0 {
        parts.push(format!("{seconds} {}", plural(seconds, "second")));
    }
    parts.join(" ")
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

#[cfg(test)]
mod tests {
    use futures::{StreamExt, pin_mut};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn countdown_emits_every_value_down_to_zero() {
        let started = Instant::now();
        let values = countdown(4, Duration::from_secs(1)).collect::<Vec<_>>().await;

        assert_eq!(values, vec![4, 3, 2, 1, 0]);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_from_zero_emits_once() {
        let values = countdown(0, Duration::from_millis(100)).collect::<Vec<_>>().await;
        assert_eq!(values, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_starts_after_one_second() {
        let started = Instant::now();
        let timer = game_timer();
        pin_mut!(timer);

        assert_eq!(timer.next().await, Some(0));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(timer.next().await, Some(1));
        assert_eq!(timer.next().await, Some(2));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn format_elapsed_uses_singular_only_for_one() {
        assert_eq!(format_elapsed(Duration::from_secs(1)), "1 second");
        assert_eq!(format_elapsed(Duration::from_secs(45)), "45 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(60)), "1 minute");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "1 minute 1 second");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2 minutes 5 seconds");
        assert_eq!(format_elapsed(Duration::from_millis(999)), "");
    }
}
