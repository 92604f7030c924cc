//! The single in-memory state the page renders: current image, current result, cycle phase.
//!
//! All mutation goes through the transition methods so a cycle's result lands as one unit.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::copy::GenerationResult;
use crate::encoded_image::EncodedImage;
use crate::generation::GenerationOutcome;

/// Where the generation cycle is at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Nothing running, nothing generated yet
    #[default]
    Idle,
    /// A cycle is in flight
    Loading,
    /// The last cycle produced a result
    Succeeded,
    /// The last cycle failed
    Failed,
}

/// Handed out by [`ResultStore::begin_cycle`], returned to [`ResultStore::finish_cycle`].
#[derive(Debug)]
pub struct CycleTicket {
    id: u64,
    image: EncodedImage,
}

impl CycleTicket {
    /// Cycle number
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The image as it was when the cycle started.
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }
}

/// The page state.
#[derive(Debug, Default)]
pub struct ResultStore {
    image: Option<EncodedImage>,
    result: Option<GenerationResult>,
    generated_at: Option<DateTime<Utc>>,
    phase: GenerationPhase,
    notice: Option<String>,
    cycles: u64,
}

impl ResultStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current image wholesale. A running cycle keeps its own copy.
    pub fn load_image(&mut self, image: EncodedImage) {
        info!(
            "Loaded {} byte image ({})",
            image.len(),
            image.media_type()
        );
        self.image = Some(image);
    }

    /// The current image, if one was uploaded.
    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    /// True while a cycle is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == GenerationPhase::Loading
    }

    /// Whether the generate control is enabled.
    pub fn can_generate(&self) -> bool {
        self.image.is_some() && !self.is_loading()
    }

    /// Current phase
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    /// The last successful result, cleared when a new cycle starts.
    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    /// When the current result was applied.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    /// The pending failure notice, if any, without consuming it.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Hands the pending failure notice to whoever is about to show it.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Idle → Loading. Clears the result and returns a ticket, or `None` when the
    /// generate control would be disabled (no image, or a cycle already running).
    pub fn begin_cycle(&mut self) -> Option<CycleTicket> {
        if !self.can_generate() {
            debug!(
                "Ignoring generate request, image loaded: {}, phase: {:?}",
                self.image.is_some(),
                self.phase
            );
            return None;
        }
        let image = self.image.clone()?;
        self.cycles += 1;
        self.result = None;
        self.generated_at = None;
        self.notice = None;
        self.phase = GenerationPhase::Loading;
        info!("Starting generation cycle {}", self.cycles);
        Some(CycleTicket {
            id: self.cycles,
            image,
        })
    }

    /// Loading → Succeeded/Failed. Always clears the loading flag.
    ///
    /// Completions are last-write-wins, a stale ticket still applies.
    pub fn finish_cycle(&mut self, ticket: CycleTicket, outcome: GenerationOutcome) {
        if ticket.id != self.cycles {
            debug!(
                "Cycle {} finished after cycle {} started",
                ticket.id, self.cycles
            );
        }
        match outcome {
            GenerationOutcome::Success { result } => {
                self.result = Some(result);
                self.generated_at = Some(Utc::now());
                self.notice = None;
                self.phase = GenerationPhase::Succeeded;
            }
            failure @ GenerationOutcome::Failure { .. } => {
                self.result = None;
                self.generated_at = None;
                self.notice = failure.reason().map(str::to_string);
                self.phase = GenerationPhase::Failed;
            }
        }
        info!("Generation cycle {} ended {:?}", ticket.id, self.phase);
    }
}
