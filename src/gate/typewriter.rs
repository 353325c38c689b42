//! Character-by-character header reveal.
//!
//! [`Typewriter`] is the lazy, finite prefix sequence of a header: one item
//! per Unicode scalar value, each one character longer than the last,
//! ending with the full text. [`type_out`] plays it back on a fixed
//! interval.

use std::str::CharIndices;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Iterator over the growing prefixes of a string.
///
/// Yields exactly `text.chars().count()` prefixes. The iterator cannot be
/// rewound; build a new one to start over.
#[derive(Debug, Clone)]
pub struct Typewriter<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
}

impl<'a> Typewriter<'a> {
    /// Creates a typewriter over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices(),
        }
    }
}

impl<'a> Iterator for Typewriter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, c) = self.chars.next()?;
        Some(&self.text[..start + c.len_utf8()])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chars.size_hint()
    }
}

impl std::iter::FusedIterator for Typewriter<'_> {}

/// Reveals `text` one character every `interval`, calling `on_step` with
/// each prefix.
///
/// The first character appears one interval after the call and the last
/// at `start + N × interval`, keeping the planned schedule even if a
/// callback runs late. A zero interval reveals everything at once; an
/// interval too large for the clock never reveals anything.
/// Dropping the future stops the reveal.
pub async fn type_out<F>(text: &str, interval: Duration, mut on_step: F)
where
    F: FnMut(&str),
{
    if interval.is_zero() || text.is_empty() {
        if let Some(full) = Typewriter::new(text).last() {
            on_step(full);
        }
        return;
    }

    // A schedule that ends beyond the clock's range never finishes
    let now = Instant::now();
    let horizon = typing_duration(text, interval).saturating_add(interval);
    if now.checked_add(horizon).is_none() {
        return std::future::pending().await;
    }

    let mut ticker = tokio::time::interval_at(now + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    for prefix in Typewriter::new(text) {
        ticker.tick().await;
        on_step(prefix);
    }
}

/// Returns how long [`type_out`] takes for `text` at `interval`.
#[must_use]
pub fn typing_duration(text: &str, interval: Duration) -> Duration {
    let steps = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    interval.saturating_mul(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn yields_growing_prefixes() {
        let steps: Vec<&str> = Typewriter::new("About").collect();
        assert_eq!(steps, vec!["A", "Ab", "Abo", "Abou", "About"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(Typewriter::new("").count(), 0);
    }

    #[test]
    fn multibyte_characters_are_single_steps() {
        let steps: Vec<&str> = Typewriter::new("CS • GT").collect();
        assert_eq!(steps.len(), 7);
        assert_eq!(steps[3], "CS •");
        assert_eq!(steps[6], "CS • GT");
    }

    #[test]
    fn iterator_is_not_restartable() {
        let mut tw = Typewriter::new("ab");
        assert_eq!(tw.next(), Some("a"));
        assert_eq!(tw.next(), Some("ab"));
        assert_eq!(tw.next(), None);
        assert_eq!(tw.next(), None);
    }

    #[test]
    fn typing_duration_is_steps_times_interval() {
        assert_eq!(
            typing_duration("Experience", Duration::from_millis(90)),
            Duration::from_millis(900)
        );
        assert_eq!(typing_duration("", Duration::from_millis(90)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn type_out_finishes_at_n_intervals() {
        let start = Instant::now();
        let mut stamps = Vec::new();
        type_out("Projects", Duration::from_millis(90), |prefix| {
            stamps.push((prefix.to_string(), start.elapsed()));
        })
        .await;

        assert_eq!(stamps.len(), 8);
        assert_eq!(stamps[0], ("P".to_string(), Duration::from_millis(90)));
        assert_eq!(
            stamps[7],
            ("Projects".to_string(), Duration::from_millis(720))
        );
        assert_eq!(start.elapsed(), Duration::from_millis(720));
    }

    #[tokio::test(start_paused = true)]
    async fn unschedulable_interval_never_reveals() {
        let mut seen = Vec::new();
        let reveal = type_out("About", Duration::MAX, |p| seen.push(p.to_string()));
        let mut fut = tokio_test::task::spawn(reveal);
        tokio_test::assert_pending!(fut.poll());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        tokio_test::assert_pending!(fut.poll());
        drop(fut);
        assert!(seen.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_reveals_at_once() {
        let mut steps = Vec::new();
        type_out("Interests", Duration::ZERO, |p| steps.push(p.to_string())).await;
        assert_eq!(steps, vec!["Interests".to_string()]);
    }

    proptest! {
        #[test]
        fn prefixes_are_monotonic_and_complete(text in "\\PC{0,40}") {
            let steps: Vec<&str> = Typewriter::new(&text).collect();
            prop_assert_eq!(steps.len(), text.chars().count());
            for pair in steps.windows(2) {
                prop_assert!(pair[1].len() > pair[0].len());
                prop_assert!(pair[1].starts_with(pair[0]));
            }
            if let Some(last) = steps.last() {
                prop_assert_eq!(*last, text.as_str());
            }
        }
    }
}
