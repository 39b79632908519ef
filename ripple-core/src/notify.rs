//! Outbound notification hook for newly created events.

use crate::error::RippleResult;
use crate::event::Event;

/// Told about every event right after it is stored.
///
/// Implementations should hand work off rather than block (e.g. queue an
/// email). An error is logged by the caller and never fails the creation.
pub trait EventNotifier: Send + Sync {
    fn event_created(&self, event: &Event) -> RippleResult<()>;
}

/// Notifier used when nothing is listening.
pub struct NoNotifier;

impl EventNotifier for NoNotifier {
    fn event_created(&self, _: &Event) -> RippleResult<()> {
        Ok(())
    }
}
