use std::{collections::VecDeque, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    assets::{AssetSource, TokenAssets},
    compositor::composite,
    config::{FramingMode, PipelineConfig},
    error::{TokenmillError, TokenmillResult},
    framing::auto_frame,
    registry::{Registry, Token},
    source::{PendingFile, decode_image},
    surface::Surface,
};

/// Aspect ratios within 5% of square skip manual framing in
/// [`FramingMode::NonSquare`].
const NON_SQUARE_THRESHOLD: f64 = 0.05;

/// Interactive framing collaborator.
///
/// When a file suspends for manual framing the pipeline hands over the file
/// name and the decoded source, then stops. The host drives a
/// [`crate::Framing`] for pan/zoom and must eventually call exactly one of
/// [`Pipeline::apply_manual_frame`] or [`Pipeline::cancel_manual_frame`].
/// The notification itself must not re-enter the pipeline; the borrow rules
/// enforce this, so hosts stash the request and resume once the submitting
/// call has returned.
pub trait FramingHost {
    fn manual_frame_requested(&mut self, file_name: &str, source: Arc<Surface>);
}

/// Preview/export collaborator, notified of completions, removals, per-file
/// failures and queue drain. All methods default to no-ops.
pub trait PreviewSink {
    fn token_completed(&mut self, _token: &Token) {}
    fn token_removed(&mut self, _id: &str) {}
    fn file_failed(&mut self, _file_name: &str, _error: &TokenmillError) {}
    fn queue_drained(&mut self) {}
}

/// Host that never resumes; only usable with [`FramingMode::Never`].
pub struct NullFramingHost;

impl FramingHost for NullFramingHost {
    fn manual_frame_requested(&mut self, _file_name: &str, _source: Arc<Surface>) {}
}

/// Sink that drops every notification.
pub struct NullPreview;

impl PreviewSink for NullPreview {}

/// Externally observable pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Busy,
    /// Waiting on a manual framing decision.
    Suspended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    LoadImage,
    DecideFraming,
    ManualFrame,
    AutoFrame,
    Composite,
    Finalize,
}

enum Advance {
    To(Step),
    /// Stop driving until an external resume call re-enters the pipeline.
    Defer,
    Finished,
}

struct CurrentFile {
    file: PendingFile,
    name: String,
    source: Option<Arc<Surface>>,
    framed: Option<Surface>,
    next: Option<Step>,
}

/// Drives queued files through load, framing, compositing and registration,
/// strictly one file at a time.
///
/// Steps run back-to-back inside a single synchronous driver; a manual
/// framing step suspends the driver indefinitely until the host resumes it.
/// Step failures are logged, reported through [`PreviewSink::file_failed`]
/// and the queue moves on; nothing is retried and nothing is fatal.
pub struct Pipeline {
    config: PipelineConfig,
    asset_source: Box<dyn AssetSource>,
    assets: Option<Arc<TokenAssets>>,
    registry: Registry,
    host: Box<dyn FramingHost>,
    preview: Box<dyn PreviewSink>,
    queue: VecDeque<PendingFile>,
    current: Option<CurrentFile>,
    suspended: bool,
    total: usize,
    processed: usize,
    next_id: u64,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        asset_source: Box<dyn AssetSource>,
        host: Box<dyn FramingHost>,
        preview: Box<dyn PreviewSink>,
    ) -> Self {
        Self {
            config,
            asset_source,
            assets: None,
            registry: Registry::new(),
            host,
            preview,
            queue: VecDeque::new(),
            current: None,
            suspended: false,
            total: 0,
            processed: 0,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn status(&self) -> Status {
        if self.suspended {
            Status::Suspended
        } else if self.current.is_some() {
            Status::Busy
        } else {
            Status::Idle
        }
    }

    /// True while files remain queued or in flight.
    pub fn is_busy(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// `(processed, total)` for the submissions since the last drain.
    pub fn progress(&self) -> (usize, usize) {
        (self.processed, self.total)
    }

    /// Enqueue files and start processing unless a file is already in
    /// flight. New files always queue behind the current one, including
    /// while it is suspended for manual framing.
    pub fn submit(&mut self, files: impl IntoIterator<Item = PendingFile>) {
        let before = self.queue.len();
        self.queue.extend(files);
        let added = self.queue.len() - before;
        self.total += added;
        info!(files = added, "queued files for token generation");

        if self.current.is_none() {
            self.drive();
        }
    }

    /// Resume a suspended file with the user-approved framed image.
    pub fn apply_manual_frame(&mut self, framed: Surface) -> TokenmillResult<()> {
        let current = self.take_suspension("apply_manual_frame")?;
        current.framed = Some(framed);
        current.next = Some(Step::Composite);
        self.drive();
        Ok(())
    }

    /// Resume a suspended file by discarding manual framing; the file goes
    /// through automatic framing instead of being aborted.
    pub fn cancel_manual_frame(&mut self) -> TokenmillResult<()> {
        let current = self.take_suspension("cancel_manual_frame")?;
        current.next = Some(Step::AutoFrame);
        self.drive();
        Ok(())
    }

    /// Remove a token and notify the preview collaborator.
    pub fn remove_token(&mut self, id: &str) -> TokenmillResult<Token> {
        let token = self.registry.remove(id)?;
        info!(id = %id, "token removed");
        self.preview.token_removed(id);
        Ok(token)
    }

    /// Remove every token, notifying the preview collaborator per token.
    pub fn remove_all_tokens(&mut self) {
        for id in self.registry.ids() {
            // Ids come from the registry itself; removal cannot fail.
            if self.registry.remove(&id).is_ok() {
                self.preview.token_removed(&id);
            }
        }
        info!("all tokens removed");
    }

    fn take_suspension(&mut self, who: &str) -> TokenmillResult<&mut CurrentFile> {
        if !self.suspended {
            return Err(TokenmillError::state(format!(
                "{who} called while no manual framing is in progress"
            )));
        }
        self.suspended = false;
        self.current
            .as_mut()
            .ok_or_else(|| TokenmillError::state("suspended without a file in flight"))
    }

    /// The single driver entry point: runs steps back-to-back until the
    /// queue drains or a step defers.
    #[tracing::instrument(skip(self))]
    fn drive(&mut self) {
        loop {
            if self.current.is_none() {
                let Some(file) = self.queue.pop_front() else {
                    info!("token queue drained");
                    self.total = 0;
                    self.processed = 0;
                    self.preview.queue_drained();
                    return;
                };
                let name = file.stem();
                debug!(file = %name, "starting token generation");
                self.current = Some(CurrentFile {
                    name,
                    file,
                    source: None,
                    framed: None,
                    next: Some(Step::LoadImage),
                });
            }

            let Some(step) = self.current.as_mut().and_then(|c| c.next.take()) else {
                return;
            };

            match self.run_step(step) {
                Ok(Advance::To(next)) => {
                    if let Some(current) = self.current.as_mut() {
                        current.next = Some(next);
                    }
                }
                Ok(Advance::Defer) => {
                    self.suspended = true;
                    return;
                }
                Ok(Advance::Finished) => {
                    self.current = None;
                    self.processed += 1;
                }
                Err(err) => {
                    let name = self
                        .current
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    warn!(file = %name, error = %err, "token generation failed");
                    self.preview.file_failed(&name, &err);
                    self.current = None;
                    self.processed += 1;
                }
            }
        }
    }

    fn run_step(&mut self, step: Step) -> TokenmillResult<Advance> {
        if let Some(current) = &self.current {
            debug!(file = %current.name, ?step, "processing step");
        }
        match step {
            Step::LoadImage => self.step_load_image(),
            Step::DecideFraming => self.step_decide_framing(),
            Step::ManualFrame => self.step_manual_frame(),
            Step::AutoFrame => self.step_auto_frame(),
            Step::Composite => self.step_composite(),
            Step::Finalize => self.step_finalize(),
        }
    }

    fn current_mut(&mut self) -> TokenmillResult<&mut CurrentFile> {
        self.current
            .as_mut()
            .ok_or_else(|| TokenmillError::state("no file in flight"))
    }

    fn step_load_image(&mut self) -> TokenmillResult<Advance> {
        let current = self.current_mut()?;
        let surface = decode_image(&current.file.bytes)?;
        debug!(
            file = %current.name,
            width = surface.width(),
            height = surface.height(),
            "decoded source image"
        );
        current.source = Some(Arc::new(surface));
        Ok(Advance::To(Step::DecideFraming))
    }

    fn step_decide_framing(&mut self) -> TokenmillResult<Advance> {
        let mode = self.config.framing_mode;
        let current = self.current_mut()?;
        let source = current
            .source
            .as_ref()
            .ok_or_else(|| TokenmillError::state("deciding framing without a decoded source"))?;

        let next = match mode {
            FramingMode::Never => Step::AutoFrame,
            FramingMode::Always => Step::ManualFrame,
            FramingMode::NonSquare => {
                let w = f64::from(source.width());
                let h = f64::from(source.height());
                let ratio = w.min(h) / w.max(h);
                if ratio < 1.0 - NON_SQUARE_THRESHOLD {
                    Step::ManualFrame
                } else {
                    Step::AutoFrame
                }
            }
        };
        Ok(Advance::To(next))
    }

    fn step_manual_frame(&mut self) -> TokenmillResult<Advance> {
        let current = self.current_mut()?;
        let source = current
            .source
            .clone()
            .ok_or_else(|| TokenmillError::state("manual framing without a decoded source"))?;
        let name = current.name.clone();

        debug!(file = %name, "deferring to manual framing");
        self.host.manual_frame_requested(&name, source);
        Ok(Advance::Defer)
    }

    fn step_auto_frame(&mut self) -> TokenmillResult<Advance> {
        let current = self.current_mut()?;
        let source = current
            .source
            .clone()
            .ok_or_else(|| TokenmillError::state("auto framing without a decoded source"))?;
        current.framed = Some(auto_frame(source)?);
        Ok(Advance::To(Step::Composite))
    }

    fn step_composite(&mut self) -> TokenmillResult<Advance> {
        let assets = self.ensure_assets()?;
        let background = self.config.background_rgba;
        let current = self.current_mut()?;
        let framed = current
            .framed
            .take()
            .ok_or_else(|| TokenmillError::state("compositing without a framed image"))?;
        current.framed = Some(composite(&framed, &assets, background)?);
        Ok(Advance::To(Step::Finalize))
    }

    fn step_finalize(&mut self) -> TokenmillResult<Advance> {
        let id = self.next_id.to_string();
        self.next_id += 1;

        let current = self.current_mut()?;
        let image = current
            .framed
            .take()
            .ok_or_else(|| TokenmillError::state("finalizing without a composited image"))?;
        let token = Token {
            id: id.clone(),
            name: current.name.clone(),
            image,
        };
        info!(file = %current.name, id = %id, "token completed");

        self.registry.insert(token)?;
        if let Some(token) = self.registry.get(&id) {
            self.preview.token_completed(token);
        }
        Ok(Advance::Finished)
    }

    /// Load the six compositing layers on first use, then reuse the shared
    /// decoded copy for every later file.
    fn ensure_assets(&mut self) -> TokenmillResult<Arc<TokenAssets>> {
        if let Some(assets) = &self.assets {
            return Ok(assets.clone());
        }
        info!("loading token compositing layers");
        let assets = Arc::new(TokenAssets::load(self.asset_source.as_ref())?);
        self.assets = Some(assets.clone());
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetSource;

    fn empty_pipeline(mode: FramingMode) -> Pipeline {
        let config = PipelineConfig {
            framing_mode: mode,
            ..PipelineConfig::default()
        };
        Pipeline::new(
            config,
            Box::new(MemoryAssetSource::new()),
            Box::new(NullFramingHost),
            Box::new(NullPreview),
        )
    }

    #[test]
    fn fresh_pipeline_is_idle() {
        let p = empty_pipeline(FramingMode::Never);
        assert_eq!(p.status(), Status::Idle);
        assert!(!p.is_busy());
        assert_eq!(p.progress(), (0, 0));
    }

    #[test]
    fn resume_without_suspension_is_a_state_error() {
        let mut p = empty_pipeline(FramingMode::Never);
        let framed = Surface::new(512, 512).unwrap();
        assert!(matches!(
            p.apply_manual_frame(framed),
            Err(TokenmillError::State(_))
        ));
        assert!(matches!(
            p.cancel_manual_frame(),
            Err(TokenmillError::State(_))
        ));
    }

    #[test]
    fn undecodable_file_is_skipped_and_queue_drains() {
        let mut p = empty_pipeline(FramingMode::Never);
        p.submit([PendingFile::new("junk.png", b"not an image".to_vec())]);
        assert_eq!(p.status(), Status::Idle);
        assert!(p.registry().is_empty());
    }

    #[test]
    fn remove_missing_token_is_a_state_error() {
        let mut p = empty_pipeline(FramingMode::Never);
        assert!(matches!(
            p.remove_token("42"),
            Err(TokenmillError::State(_))
        ));
    }
}
