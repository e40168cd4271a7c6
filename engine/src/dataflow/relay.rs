//! Event streaming relay built on simple unbounded channels.
//!
//! Relays carry events from views and collaborators into observer loops.
//! They follow the `{source}_{event}_relay` naming pattern, e.g.
//! `refresh_required_relay` or `work_item_created_relay`.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::sync::{Arc, OnceLock};

/// Type-safe event relay.
///
/// # Examples
///
/// ```
/// use engine::dataflow::relay;
///
/// let (refresh_required_relay, mut stream) = relay::<()>();
/// refresh_required_relay.send(());
/// assert_eq!(stream.try_next().unwrap(), Some(()));
/// ```
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
    #[cfg(debug_assertions)]
    emit_location: Arc<OnceLock<&'static std::panic::Location<'static>>>,
    /// Shared-source relays (e.g. the refresh relays, raisable by any
    /// collaborator) are exempt from the single-source check.
    #[cfg(debug_assertions)]
    shared_source: bool,
}

/// Error type for Relay operations.
#[derive(Debug, Clone)]
pub enum RelayError {
    /// The channel has been closed (receiver dropped).
    ChannelClosed,
    /// Relay send called from multiple locations (debug builds only).
    #[cfg(debug_assertions)]
    MultipleEmitters {
        previous: &'static std::panic::Location<'static>,
        current: &'static std::panic::Location<'static>,
    },
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new Relay with its receiver stream, following Rust's
    /// channel conventions. Prefer the [`relay()`] helper.
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        Self::with_source_check(false)
    }

    /// A relay that may legitimately be raised from many places. Skips the
    /// single-source check. Prefer the [`shared_relay()`] helper.
    pub fn new_shared() -> (Self, UnboundedReceiver<T>) {
        Self::with_source_check(true)
    }

    fn with_source_check(shared_source: bool) -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        #[cfg(not(debug_assertions))]
        let _ = shared_source;
        (
            Relay {
                sender,
                #[cfg(debug_assertions)]
                emit_location: Arc::new(OnceLock::new()),
                #[cfg(debug_assertions)]
                shared_source,
            },
            receiver,
        )
    }

    /// Check that this relay is only sent from a single source location.
    /// Enforced in debug builds to keep event sources traceable.
    #[cfg(debug_assertions)]
    #[track_caller]
    fn check_single_source(&self) -> Result<(), RelayError> {
        if self.shared_source {
            return Ok(());
        }
        let caller = std::panic::Location::caller();
        let previous = *self.emit_location.get_or_init(|| caller);
        if previous == caller {
            Ok(())
        } else {
            Err(RelayError::MultipleEmitters {
                previous,
                current: caller,
            })
        }
    }

    /// Send an event through the relay.
    ///
    /// If the receiver has been dropped the event is silently discarded;
    /// use [`Relay::try_send`] to observe send failures.
    #[track_caller]
    pub fn send(&self, value: T) {
        #[cfg(debug_assertions)]
        if let Err(e) = self.check_single_source() {
            panic!("{e:?}");
        }

        let _ = self.sender.unbounded_send(value);
    }

    /// Send an event with explicit error handling.
    #[track_caller]
    pub fn try_send(&self, value: T) -> Result<(), RelayError> {
        #[cfg(debug_assertions)]
        self.check_single_source()?;

        self.sender
            .unbounded_send(value)
            .map_err(|_| RelayError::ChannelClosed)
    }
}

impl<T> Default for Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A "disconnected" relay whose events are silently discarded. Useful
    /// as placeholder wiring for components that may not have a handler.
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

/// Creates a new Relay with an associated receiver stream.
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}

/// Creates a Relay raisable from any number of source locations.
pub fn shared_relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new_shared()
}
