//! Per-connection relay state.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use device_auth::DeviceProfile;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::transport::Frame;

/// Bounded FIFO of device frames held back while a tool call executes.
#[derive(Debug)]
pub struct OutboundQueue {
    frames: VecDeque<Frame>,
    capacity: usize,
    dropped: u64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Whether one more frame fits.
    pub fn has_capacity(&self) -> bool {
        self.frames.len() < self.capacity
    }

    /// Enqueue a frame; returns `false` (and counts a drop) when full.
    pub fn push(&mut self, frame: Frame) -> bool {
        if !self.has_capacity() {
            self.dropped += 1;
            return false;
        }
        self.frames.push_back(frame);
        true
    }

    /// Remove and return every queued frame in arrival order. Safe to call
    /// any number of times.
    pub fn drain(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// State owned by one relay task for the lifetime of a connection.
#[derive(Debug)]
pub struct ConnectionState {
    device: Arc<DeviceProfile>,
    last_activity: Instant,
    idle_timeout: Duration,
    ping: Option<Interval>,
    queue: OutboundQueue,
    closed: bool,
}

impl ConnectionState {
    pub fn new(
        device: Arc<DeviceProfile>,
        ping_interval: Duration,
        idle_timeout: Duration,
        queue_capacity: usize,
    ) -> Self {
        // First tick one full interval from now.
        let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            device,
            last_activity: Instant::now(),
            idle_timeout,
            ping: Some(ping),
            queue: OutboundQueue::new(queue_capacity),
            closed: false,
        }
    }

    pub fn device(&self) -> &Arc<DeviceProfile> {
        &self.device
    }

    pub fn connection_id(&self) -> &str {
        self.device.connection_id()
    }

    /// Record activity on either side; pushes the idle deadline out.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_deadline(&self) -> Instant {
        self.last_activity + self.idle_timeout
    }

    /// Completes on the next ping tick; never completes once torn down.
    pub async fn ping_tick(&mut self) {
        match self.ping.as_mut() {
            Some(ping) => {
                ping.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut OutboundQueue {
        &mut self.queue
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Clear timers and drain the queue. Returns the frames that were still
    /// queued; subsequent calls return nothing.
    pub fn teardown(&mut self) -> Vec<Frame> {
        self.closed = true;
        self.ping = None;
        self.queue.drain()
    }
}

#[cfg(test)]
mod tests {
    use device_auth::TrustTier;

    use super::*;

    fn state(capacity: usize) -> ConnectionState {
        let device = Arc::new(DeviceProfile::new(
            "dev",
            TrustTier::Public,
            Vec::<String>::new(),
            "conn",
        ));
        ConnectionState::new(device, Duration::from_secs(30), Duration::from_secs(60), capacity)
    }

    #[test]
    fn test_queue_capacity_predicate() {
        let mut queue = OutboundQueue::new(2);
        assert!(queue.has_capacity());
        assert!(queue.push(Frame::Text("a".into())));
        assert!(queue.push(Frame::Text("b".into())));
        assert!(!queue.has_capacity());
        assert!(!queue.push(Frame::Text("c".into())));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(
            queue.drain(),
            vec![Frame::Text("a".into()), Frame::Text("b".into())]
        );
        assert!(queue.has_capacity());
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let mut state = state(4);
        state.queue_mut().push(Frame::Binary(vec![1]));

        assert_eq!(state.teardown().len(), 1);
        assert!(state.teardown().is_empty());
        assert!(state.is_closed());
        assert!(state.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_moves_idle_deadline() {
        let mut state = state(1);
        let before = state.idle_deadline();
        tokio::time::advance(Duration::from_secs(5)).await;
        state.touch();
        assert_eq!(state.idle_deadline() - before, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_ticks_after_interval() {
        let mut state = state(1);
        let start = Instant::now();
        state.ping_tick().await;
        assert!(Instant::now() - start >= Duration::from_secs(30));
    }
}
