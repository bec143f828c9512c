//! RFC 3261 §17.1.1 timer constants, scaled down to the values spec §4.4
//! calls out explicitly (T1/T2/Timer F); Timer D follows the RFC default.

use std::time::Duration;

/// Round-trip time estimate; the base retransmission interval.
pub const T1: Duration = Duration::from_millis(500);
/// Cap on the retransmission interval for non-INVITE requests.
pub const T2: Duration = Duration::from_secs(4);
/// Timer F: overall request timeout, 64*T1.
pub const TIMER_F: Duration = Duration::from_secs(32);
/// Timer D: time a completed INVITE transaction lingers to absorb stray
/// retransmitted final responses, UDP only.
pub const TIMER_D_UDP: Duration = Duration::from_secs(32);
pub const TIMER_D_TCP: Duration = Duration::from_secs(0);

/// Successive UDP retransmission intervals for an unanswered request:
/// T1, 2*T1, 4*T1, capped at T2, repeating until Timer F fires.
pub fn next_retransmit_interval(previous: Duration) -> Duration {
    let doubled = previous.saturating_mul(2);
    if doubled > T2 {
        T2
    } else {
        doubled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retransmit_interval_doubles_then_caps() {
        let mut interval = T1;
        let mut seen = vec![interval];
        for _ in 0..5 {
            interval = next_retransmit_interval(interval);
            seen.push(interval);
        }
        assert_eq!(
            seen,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(4000),
                Duration::from_millis(4000),
            ]
        );
    }
}
