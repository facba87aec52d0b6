//! The fixed audio graph
//!
//! Topology is established once at construction and never changes:
//!
//! ```text
//! PlayerNode → TimePitchNode → ReverbNode → output driver
//! ```
//!
//! Only node parameters vary at runtime. The nodes live together in a
//! [`GraphCore`] behind one mutex: the output driver locks it once per
//! device buffer to pull frames, controllers lock it briefly to mutate
//! node state, and nothing else touches it. The graph must be started
//! (driver running) before any schedule operation; the engine treats a
//! failed start as fatal for the instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::audio::output::OutputDriver;
use crate::audio::types::AudioFrame;
use crate::error::Result;
use crate::playback::player::PlayerNode;
use crate::playback::reverb::ReverbNode;
use crate::playback::time_pitch::TimePitchNode;

/// Identifies a position in the fixed processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Player,
    TimePitch,
    Reverb,
    Output,
}

/// The graph's nodes and master volume, pulled as one unit.
pub struct GraphCore {
    pub player: PlayerNode,
    pub time_pitch: TimePitchNode,
    pub reverb: ReverbNode,
    volume: f32,
    sample_rate: u32,
}

impl GraphCore {
    fn new(sample_rate: u32) -> Self {
        Self {
            player: PlayerNode::new(),
            time_pitch: TimePitchNode::new(sample_rate),
            reverb: ReverbNode::new(sample_rate),
            volume: 1.0,
            sample_rate,
        }
    }

    /// Pull one frame through the whole chain
    pub fn next_frame(&mut self) -> AudioFrame {
        let dry = self.time_pitch.next_frame(&mut self.player);
        let mut frame = self.reverb.process(dry);
        frame.apply_volume(self.volume);
        frame.clamp();
        frame
    }

    /// Fill a block of frames
    pub fn render(&mut self, out: &mut [AudioFrame]) {
        for frame in out {
            *frame = self.next_frame();
        }
    }

    /// Master volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// The engine's audio graph: core nodes plus the output driver.
pub struct AudioGraph {
    core: Arc<Mutex<GraphCore>>,
    driver: Mutex<Box<dyn OutputDriver>>,
    running: AtomicBool,
    sample_rate: u32,
}

impl AudioGraph {
    /// Processing chain order, fixed for the life of the graph
    pub const TOPOLOGY: [NodeKind; 4] = [
        NodeKind::Player,
        NodeKind::TimePitch,
        NodeKind::Reverb,
        NodeKind::Output,
    ];

    /// Build the graph at the driver's working sample rate.
    ///
    /// The driver is not started yet; call [`AudioGraph::start`].
    pub fn new(driver: Box<dyn OutputDriver>) -> Self {
        let sample_rate = driver.sample_rate();
        Self {
            core: Arc::new(Mutex::new(GraphCore::new(sample_rate))),
            driver: Mutex::new(driver),
            running: AtomicBool::new(false),
            sample_rate,
        }
    }

    /// Start the output driver pulling from the core.
    ///
    /// # Errors
    /// Driver start failure. The graph stays not-running and no node will
    /// accept scheduled audio through the engine.
    pub fn start(&self) -> Result<()> {
        let core = Arc::clone(&self.core);
        let render = Box::new(move |out: &mut [AudioFrame]| {
            let mut core = core.lock().unwrap();
            core.render(out);
        });

        self.driver.lock().unwrap().start(render)?;
        self.running.store(true, Ordering::SeqCst);
        info!("Audio graph running at {}Hz", self.sample_rate);
        Ok(())
    }

    /// Stop the output driver
    pub fn stop(&self) -> Result<()> {
        self.driver.lock().unwrap().stop()?;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Whether the output driver is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Working sample rate of the graph
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The fixed node chain, in processing order
    pub fn topology(&self) -> [NodeKind; 4] {
        Self::TOPOLOGY
    }

    /// Run a closure with exclusive access to the graph core.
    ///
    /// This is the only mutation path for node state; holding the lock
    /// briefly keeps the audio callback unblocked.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut GraphCore) -> R) -> R {
        let mut core = self.core.lock().unwrap();
        f(&mut core)
    }

    /// Pull frames through the chain directly.
    ///
    /// Device drivers pull through their own callback; this entry point is
    /// for headless hosts running on [`NullOutput`], which never pulls on
    /// its own.
    ///
    /// [`NullOutput`]: crate::audio::output::NullOutput
    pub fn render_block(&self, out: &mut [AudioFrame]) {
        let mut core = self.core.lock().unwrap();
        core.render(out);
    }
}
