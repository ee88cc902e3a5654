use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crux_core::capability::{Capability, CapabilityContext, Operation};

pub const MIN_TIMER_MS: u64 = 100;
pub const MAX_TIMER_MS: u64 = 24 * 60 * 60 * 1000;

/// Identifies one armed timer. `mount` ties it to the page lifetime that
/// armed it, `seq` distinguishes successive timers of that lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId {
    pub mount: u64,
    pub seq: u64,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mount, self.seq)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOperation {
    Start { id: TimerId, millis: u64 },
    Cancel { id: TimerId },
}

impl TimerOperation {
    pub fn start(id: TimerId, after: Duration) -> Result<Self, TimerError> {
        let millis = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        if !(MIN_TIMER_MS..=MAX_TIMER_MS).contains(&millis) {
            return Err(TimerError::InvalidDuration { millis });
        }
        Ok(Self::Start { id, millis })
    }
}

impl Operation for TimerOperation {
    type Output = TimerOutput;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerOutput {
    Fired { id: TimerId },
    Cancelled { id: TimerId },
    /// Answer to a `Cancel` request; carries nothing.
    Acknowledged,
}

impl TimerOutput {
    pub fn fired_id(&self) -> Option<TimerId> {
        match self {
            TimerOutput::Fired { id } => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer duration {millis}ms is out of range")]
    InvalidDuration { millis: u64 },
}

/// One-shot timers executed by the shell.
pub struct Timer<Ev> {
    context: CapabilityContext<TimerOperation, Ev>,
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}

impl<Ev> Timer<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn start<F>(&self, operation: TimerOperation, make_event: F)
    where
        F: FnOnce(TimerOutput) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(output));
        });
    }

    pub fn cancel(&self, id: TimerId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(TimerOperation::Cancel { id }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_rejects_out_of_range_durations() {
        let id = TimerId { mount: 1, seq: 1 };
        assert!(TimerOperation::start(id, Duration::from_millis(10)).is_err());
        assert!(TimerOperation::start(id, Duration::from_secs(2 * 24 * 60 * 60)).is_err());
        assert_eq!(
            TimerOperation::start(id, Duration::from_secs(30)).unwrap(),
            TimerOperation::Start { id, millis: 30_000 }
        );
    }

    #[test]
    fn only_fired_outputs_carry_an_id() {
        let id = TimerId { mount: 2, seq: 5 };
        assert_eq!(TimerOutput::Fired { id }.fired_id(), Some(id));
        assert_eq!(TimerOutput::Cancelled { id }.fired_id(), None);
        assert_eq!(id.to_string(), "2:5");
    }
}
