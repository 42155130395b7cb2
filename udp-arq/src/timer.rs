//! Retransmission timer.
//!
//! The sender must notice two independent events while it waits for an
//! acknowledgement: a datagram arriving and the retransmission deadline
//! passing.  [`RetransmitTimer`] is the deadline half.  It wraps a pinned
//! `tokio::time::Sleep` so the send loop can race it against the socket in a
//! single `tokio::select!`, which serializes "timer fired" and "frame
//! received" handling on one task.
//!
//! The timeout is fixed for the whole transfer; every expiry re-arms with the
//! same duration.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Deadline used while disarmed; never reached in practice.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 3600);

/// A re-armable one-shot deadline.
#[derive(Debug)]
pub struct RetransmitTimer {
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl RetransmitTimer {
    /// Create a disarmed timer that fires `timeout` after each [`arm`](Self::arm).
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sleep: Box::pin(tokio::time::sleep(FAR_FUTURE)),
            armed: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the countdown from now.
    pub fn arm(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.timeout);
        self.armed = true;
    }

    /// Stop the countdown.  [`expired`](Self::expired) will not complete
    /// until the timer is armed again.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.sleep.as_mut().reset(Instant::now() + FAR_FUTURE);
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Complete when the armed deadline passes.
    ///
    /// The timer stays marked as expired (disarmed) afterwards; the caller
    /// re-arms it together with the retransmission.
    pub async fn expired(&mut self) {
        if !self.is_armed() {
            std::future::pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_timeout() {
        let mut timer = RetransmitTimer::new(Duration::from_secs(2));
        timer.arm();
        let start = Instant::now();
        timer.expired().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_timer_never_fires() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(10));
        timer.arm();
        timer.disarm();
        let fired = tokio::time::timeout(Duration::from_secs(60), timer.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_restarts_countdown() {
        let mut timer = RetransmitTimer::new(Duration::from_secs(3));
        timer.arm();
        tokio::time::advance(Duration::from_secs(2)).await;
        timer.arm();

        let start = Instant::now();
        timer.expired().await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn new_timer_is_disarmed() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = rt.enter();
        let timer = RetransmitTimer::new(Duration::from_secs(1));
        assert!(!timer.is_armed());
        assert_eq!(timer.timeout(), Duration::from_secs(1));
    }
}
