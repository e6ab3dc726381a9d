/// One-shot frame request in the style of a redraw callback.
///
/// A ticker delivers at most one frame per [`Ticker::request`]. Work that
/// wants to keep running requests the next frame from inside the current one,
/// so cancelling is simply dropping the pending request.
#[derive(Debug, Default, Clone)]
pub struct Ticker {
    pending: bool,
    fired: u64,
}

impl Ticker {
    /// Idle ticker with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the next frame. Requests do not stack.
    pub fn request(&mut self) {
        self.pending = true;
    }

    /// Drops the pending frame, if any.
    pub fn cancel(&mut self) {
        self.pending = false;
    }

    /// Whether the next host frame will be delivered.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consumes the pending request. Returns `false` if nothing was scheduled.
    pub fn fire(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.fired += 1;
        true
    }

    /// Number of frames delivered since construction.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

/// Turns host timestamps into per-frame deltas.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_seconds: Option<f64>,
    elapsed_seconds: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the last timestamp so the next frame yields a zero delta.
    pub fn reset(&mut self) {
        self.last_seconds = None;
        self.elapsed_seconds = 0.0;
    }

    /// Returns the delta since the previous frame. The first frame after a
    /// reset yields zero and timestamps going backwards are clamped.
    pub fn frame(&mut self, now_seconds: f64) -> f32 {
        let delta = self
            .last_seconds
            .map(|last| (now_seconds - last).max(0.0))
            .unwrap_or(0.0);
        self.last_seconds = Some(now_seconds);
        self.elapsed_seconds += delta;
        delta as f32
    }

    /// Sum of the deltas handed out since the last reset.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }
}
