use crate::driver::ContractViolation;

/// Where a backend context is in its frame cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FrameState {
    /// Constructed but not yet bound to a surface.
    #[default]
    Uninitialized,
    /// Between frames; resize and scale changes are allowed.
    Ready,
    /// `begin_drawing` succeeded; commands are being queued.
    Drawing,
    /// `end_drawing` flushed the commands; waiting for `present_frame`.
    Recorded,
    /// The frame was shown. Behaves like `Ready`.
    Presented,
}

impl FrameState {
    #[inline]
    pub fn is_between_frames(self) -> bool {
        matches!(self, FrameState::Ready | FrameState::Presented)
    }
}

/// Outcome of `begin_drawing`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameBegin {
    Started,
    /// The surface is temporarily unavailable; no frame was begun.
    Skipped,
}

/// Frame state machine shared by the backends.
///
/// Every transition checks the current state and returns the violation
/// instead of moving when the call is out of order.
#[derive(Debug, Default)]
pub struct FrameLifecycle {
    state: FrameState,
    frames: u64,
}

impl FrameLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames begun so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn initialize(&mut self) -> Result<(), ContractViolation> {
        self.transition("initialize", |s| s == FrameState::Uninitialized, FrameState::Ready)
    }

    pub fn begin(&mut self) -> Result<(), ContractViolation> {
        self.transition("begin_drawing", FrameState::is_between_frames, FrameState::Drawing)?;
        self.frames += 1;
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), ContractViolation> {
        self.transition("end_drawing", |s| s == FrameState::Drawing, FrameState::Recorded)
    }

    pub fn present(&mut self) -> Result<(), ContractViolation> {
        self.transition("present_frame", |s| s == FrameState::Recorded, FrameState::Presented)
    }

    pub fn abandon(&mut self) -> Result<(), ContractViolation> {
        self.transition(
            "abandon_frame",
            |s| matches!(s, FrameState::Drawing | FrameState::Recorded),
            FrameState::Ready,
        )
    }

    /// Checks that `op` runs between frames without changing state.
    pub fn check_between_frames(&self, op: &'static str) -> Result<(), ContractViolation> {
        if self.state.is_between_frames() {
            Ok(())
        } else {
            Err(ContractViolation::FrameOrder { op, state: self.state })
        }
    }

    /// Checks that `op` runs inside a begun frame. Commands queued outside
    /// one would replay at the start of the next frame.
    pub fn check_drawing(&self, op: &'static str) -> Result<(), ContractViolation> {
        if self.state == FrameState::Drawing {
            Ok(())
        } else {
            Err(ContractViolation::FrameOrder { op, state: self.state })
        }
    }

    fn transition(
        &mut self,
        op: &'static str,
        allowed: impl Fn(FrameState) -> bool,
        next: FrameState,
    ) -> Result<(), ContractViolation> {
        if !allowed(self.state) {
            return Err(ContractViolation::FrameOrder { op, state: self.state });
        }
        log::trace!("frame {:?} -> {:?} ({op})", self.state, next);
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> FrameLifecycle {
        let mut lc = FrameLifecycle::new();
        lc.initialize().expect("fresh lifecycle initializes");
        lc
    }

    // ── happy path ────────────────────────────────────────────────────────

    #[test]
    fn full_cycle_returns_to_drawable_state() {
        let mut lc = ready();
        for expected in 1..=3 {
            lc.begin().expect("begin");
            assert_eq!(lc.state(), FrameState::Drawing);
            lc.end().expect("end");
            assert_eq!(lc.state(), FrameState::Recorded);
            lc.present().expect("present");
            assert_eq!(lc.state(), FrameState::Presented);
            assert_eq!(lc.frame_count(), expected);
        }
    }

    #[test]
    fn abandon_from_drawing_or_recorded() {
        let mut lc = ready();
        lc.begin().expect("begin");
        lc.abandon().expect("abandon while drawing");
        assert_eq!(lc.state(), FrameState::Ready);

        lc.begin().expect("begin");
        lc.end().expect("end");
        lc.abandon().expect("abandon after recording");
        assert_eq!(lc.state(), FrameState::Ready);
    }

    // ── out of order ──────────────────────────────────────────────────────

    #[test]
    fn out_of_order_calls_do_not_move() {
        let mut lc = FrameLifecycle::new();
        assert!(lc.begin().is_err());
        assert_eq!(lc.state(), FrameState::Uninitialized);

        let mut lc = ready();
        assert!(lc.end().is_err());
        assert!(lc.present().is_err());
        assert!(lc.abandon().is_err());
        assert!(lc.initialize().is_err());
        assert_eq!(lc.state(), FrameState::Ready);

        lc.begin().expect("begin");
        assert_eq!(
            lc.begin(),
            Err(ContractViolation::FrameOrder { op: "begin_drawing", state: FrameState::Drawing })
        );
        assert!(lc.present().is_err());
        assert_eq!(lc.frame_count(), 1);
    }

    #[test]
    fn resize_only_between_frames() {
        let mut lc = ready();
        assert!(lc.check_between_frames("resize").is_ok());
        lc.begin().expect("begin");
        assert!(lc.check_between_frames("resize").is_err());
        lc.end().expect("end");
        assert!(lc.check_between_frames("resize").is_err());
        lc.present().expect("present");
        assert!(lc.check_between_frames("resize").is_ok());
    }

    #[test]
    fn commands_only_inside_a_begun_frame() {
        let mut lc = ready();
        assert_eq!(
            lc.check_drawing("draw_geometry"),
            Err(ContractViolation::FrameOrder { op: "draw_geometry", state: FrameState::Ready })
        );
        lc.begin().expect("begin");
        assert!(lc.check_drawing("draw_geometry").is_ok());
        lc.end().expect("end");
        assert!(lc.check_drawing("clear_render_buffer").is_err());
        lc.present().expect("present");
        assert!(lc.check_drawing("draw_geometry").is_err());
    }
}
