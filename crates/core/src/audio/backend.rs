use std::sync::{Arc, Mutex};

use super::SignalGraph;
use crate::{EngineConfig, Result};

/// Graph handle shared between the control side and the render side.
pub type SharedGraph = Arc<Mutex<SignalGraph>>;

/// Factory for audio processing contexts.
pub trait AudioBackend {
    fn name(&self) -> &str;

    /// Acquires the underlying audio resource. Failing here leaves the engine
    /// uninitialized.
    fn create_context(&self, config: &EngineConfig) -> Result<Box<dyn AudioContext>>;
}

/// A live audio processing context.
pub trait AudioContext {
    /// Rate the graph must be built for.
    fn sample_rate(&self) -> u32;

    /// Starts rendering `graph`. Pull-mode contexts may simply keep nothing.
    fn connect(&mut self, graph: SharedGraph) -> Result<()>;

    /// Releases the audio resource. Must tolerate repeated calls.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Backend whose contexts render only when the host pulls blocks through
/// [`crate::AudioEngine::render`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn create_context(&self, config: &EngineConfig) -> Result<Box<dyn AudioContext>> {
        Ok(Box::new(OfflineContext {
            sample_rate: config.sample_rate,
            closed: false,
        }))
    }
}

#[derive(Debug)]
pub struct OfflineContext {
    sample_rate: u32,
    closed: bool,
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect(&mut self, _graph: SharedGraph) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
