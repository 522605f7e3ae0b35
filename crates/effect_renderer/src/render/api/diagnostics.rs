//! Diagnostic and callback hooks
//!
//! Protocol violations and capacity flushes are recovered inside the renderer
//! rather than propagated; they stay observable through [`Diagnostics`].

use thiserror::Error;

use crate::render::api::RenderBackend;
use crate::render::systems::PrimitiveFamily;

/// Ways the simulation side can break the Begin/Rendering/End protocol
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// `Rendering` called without a preceding `BeginRendering`
    #[error("{0} instance rendered outside of a group")]
    RenderingOutsideGroup(PrimitiveFamily),

    /// `EndRendering` called for a group that was never begun
    #[error("{0} group ended without being begun")]
    EndWithoutBegin(PrimitiveFamily),

    /// `BeginRendering` called while another group is still open
    #[error("{0} group begun while another group was open")]
    NestedGroup(PrimitiveFamily),

    /// A group was still open when the frame ended
    #[error("group left open at end of frame")]
    GroupLeftOpen,

    /// `begin_rendering` called while a frame is already active
    #[error("frame begun while another frame was active")]
    FrameAlreadyActive,

    /// A sub-renderer call arrived outside `begin_rendering` / `end_rendering`
    #[error("renderer call outside of a frame")]
    CallOutsideFrame,

    /// Node or instance parameters of the wrong family were passed
    #[error("{expected} renderer received {received} parameters")]
    ParameterMismatch {
        /// Family of the renderer that was called
        expected: PrimitiveFamily,
        /// Family of the parameters it received
        received: PrimitiveFamily,
    },

    /// The renderer key does not belong to this facade
    #[error("unknown renderer key")]
    UnknownRenderer,
}

/// Events reported through the diagnostic callback
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A recovered protocol violation
    Protocol(ProtocolViolation),
    /// The geometry buffer filled up; the open batch was flushed and the buffer rewound
    CapacityFlush {
        /// Bytes the primitive needed
        requested: usize,
        /// Bytes that were left
        remaining: usize,
    },
    /// A primitive larger than the whole geometry buffer was skipped
    PrimitiveTooLarge {
        /// Bytes the primitive needed
        requested: usize,
        /// Total buffer capacity
        capacity: usize,
    },
    /// The device was lost
    DeviceLost,
    /// The device was reset and resources recreated
    DeviceReset,
}

/// Called before each distortion batch is drawn
///
/// Hosts typically copy the current color target into the background
/// texture here. Returning `false` skips the batch.
pub trait DistortingCallback {
    /// Prepare the background for a distortion draw
    fn on_distorting(&mut self, backend: &mut dyn RenderBackend) -> bool;
}

impl<F> DistortingCallback for F
where
    F: FnMut(&mut dyn RenderBackend) -> bool,
{
    fn on_distorting(&mut self, backend: &mut dyn RenderBackend) -> bool {
        self(backend)
    }
}

/// Diagnostic sink owned by the renderer
#[derive(Default)]
pub struct Diagnostics {
    callback: Option<Box<dyn FnMut(&Diagnostic)>>,
    reported: u64,
}

impl Diagnostics {
    /// Create a sink with no callback
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or remove the callback
    pub fn set_callback(&mut self, callback: Option<Box<dyn FnMut(&Diagnostic)>>) {
        self.callback = callback;
    }

    /// Report an event
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.reported += 1;
        match &diagnostic {
            Diagnostic::Protocol(violation) => log::warn!("Recovered protocol violation: {}", violation),
            Diagnostic::CapacityFlush { requested, remaining } => log::debug!(
                "Geometry buffer full ({} bytes requested, {} left); flushing and rewinding",
                requested,
                remaining
            ),
            Diagnostic::PrimitiveTooLarge { requested, capacity } => log::warn!(
                "Skipping primitive of {} bytes; geometry buffer holds {}",
                requested,
                capacity
            ),
            Diagnostic::DeviceLost => log::warn!("Graphics device lost"),
            Diagnostic::DeviceReset => log::info!("Graphics device reset"),
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(&diagnostic);
        }
    }

    /// Shorthand for [`Diagnostic::Protocol`]
    pub fn protocol(&mut self, violation: ProtocolViolation) {
        self.report(Diagnostic::Protocol(violation));
    }

    /// Number of events reported so far
    pub fn reported(&self) -> u64 {
        self.reported
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("has_callback", &self.callback.is_some())
            .field("reported", &self.reported)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_callback_receives_reports() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut diagnostics = Diagnostics::new();
        diagnostics.set_callback(Some(Box::new(move |d: &Diagnostic| sink.borrow_mut().push(d.clone()))));

        diagnostics.protocol(ProtocolViolation::GroupLeftOpen);
        diagnostics.report(Diagnostic::DeviceLost);

        assert_eq!(diagnostics.reported(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![Diagnostic::Protocol(ProtocolViolation::GroupLeftOpen), Diagnostic::DeviceLost]
        );
    }

    #[test]
    fn test_violation_messages_name_the_family() {
        let message = ProtocolViolation::RenderingOutsideGroup(PrimitiveFamily::Ribbon).to_string();
        assert!(message.contains("ribbon"));
    }
}
