//! Capture orchestrator: drives photo, audio and combined capture sessions.
//!
//! [`CaptureOrchestrator`] owns the [`SessionState`] and is driven by its
//! public operations (usually from the command surface or a UI).
//!
//! # Session flow
//!
//! ```text
//! setup()            Idle ──▶ PreviewActive, preview rotation applied
//! take_photo()       capture ─▶ tag (orientation snapshot) ─▶ submit ─▶ single result
//! start_recording()  PreviewActive ──▶ Recording, aggregator cleared
//! stop_recording()   stop audio ─▶ submit ─▶ record ─▶ finalize ─▶ PreviewActive
//! start_combined()   PreviewActive ──▶ CapturingInLoop, audio + photo loop task
//! stop_combined()    cancel loop ─▶ join ─▶ stop audio ─▶ submit ─▶ finalize pooled
//! ```
//!
//! The photo loop and the audio path share only the [`PredictionAggregator`],
//! whose appends are serialised internally. The session mutex is never held
//! across an `.await`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::CaptureConfig;
use crate::orientation::{
    resolve_controls_rotation, resolve_photo_orientation, resolve_preview_rotation,
    resolve_rotation_degrees, DisplayOrientation, OrientationFeed, SensorReading,
};
use crate::predict::{FinalResult, Prediction, PredictionAggregator, PredictionClient};

use super::device::{AudioHandle, DeviceCapture, DeviceEvent};
use super::error::CaptureError;
use super::events::{EventSink, SessionEvent};
use super::sample::{Modality, Sample};
use super::state::{CaptureControls, SessionState};

// ---------------------------------------------------------------------------
// SampleSource
// ---------------------------------------------------------------------------

/// Capture + classify path shared by single photos and the combined loop.
#[derive(Clone)]
struct SampleSource {
    device: Arc<dyn DeviceCapture>,
    client: Arc<dyn PredictionClient>,
    orientation: OrientationFeed,
    latest_photo: Arc<Mutex<Option<Sample>>>,
}

impl SampleSource {
    /// Capture one photo tagged with the orientation at call time.
    async fn capture_photo(&self, state: SessionState) -> Result<Sample, CaptureError> {
        let ctx = self.orientation.snapshot();

        let jpeg = self
            .device
            .capture_photo()
            .await
            .map_err(|e| CaptureError::from_device(e, Modality::Photo, state))?;

        let sample = Sample::photo(
            jpeg,
            resolve_rotation_degrees(ctx),
            resolve_photo_orientation(ctx.device_orientation, ctx),
        );
        log::debug!(
            "capture: photo taken ({} bytes, rotation {}°)",
            sample.payload.len(),
            sample.captured_at_orientation_degrees
        );

        *self
            .latest_photo
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sample.clone());
        Ok(sample)
    }

    async fn submit(&self, sample: Sample, state: SessionState) -> Result<Prediction, CaptureError> {
        let modality = sample.modality;
        self.client
            .predict(sample)
            .await
            .map_err(|source| CaptureError::Submission {
                modality,
                state,
                source,
            })
    }

    async fn photo_prediction(&self, state: SessionState) -> Result<Prediction, CaptureError> {
        let sample = self.capture_photo(state).await?;
        self.submit(sample, state).await
    }
}

// ---------------------------------------------------------------------------
// Session bookkeeping
// ---------------------------------------------------------------------------

struct PhotoLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Session {
    state: SessionState,
    /// Running recording; `None` while a stop is in progress.
    recording: Option<AudioHandle>,
    photo_loop: Option<PhotoLoop>,
    concurrent_supported: bool,
}

// ---------------------------------------------------------------------------
// CaptureOrchestrator
// ---------------------------------------------------------------------------

/// Drives capture sessions against a device and a prediction client.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use emotion_capture::capture::{CaptureOrchestrator, EventSink, FileReplayDevice};
/// use emotion_capture::config::AppConfig;
/// use emotion_capture::orientation::OrientationFeed;
/// use emotion_capture::predict::HttpPredictionClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::default();
/// let (events, _rx) = EventSink::channel();
/// let orchestrator = CaptureOrchestrator::new(
///     Arc::new(FileReplayDevice::from_config(&config.device)),
///     Arc::new(HttpPredictionClient::from_config(&config.service)?),
///     OrientationFeed::default(),
///     config.capture.clone(),
///     events,
/// );
///
/// orchestrator.setup().await?;
/// let result = orchestrator.take_photo().await?;
/// println!("{}", result.message());
/// # Ok(())
/// # }
/// ```
pub struct CaptureOrchestrator {
    source: SampleSource,
    aggregator: Arc<PredictionAggregator>,
    events: EventSink,
    config: CaptureConfig,
    session: Mutex<Session>,
    photo_in_flight: AtomicBool,
}

impl CaptureOrchestrator {
    /// Create an orchestrator in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `device`: camera / microphone collaborator.
    /// * `client`: prediction service client.
    /// * `orientation`: feed written by the sensor and display collaborators.
    /// * `config`: loop interval and recording file layout.
    /// * `events`: where UI notifications are pushed.
    pub fn new(
        device: Arc<dyn DeviceCapture>,
        client: Arc<dyn PredictionClient>,
        orientation: OrientationFeed,
        config: CaptureConfig,
        events: EventSink,
    ) -> Self {
        Self {
            source: SampleSource {
                device,
                client,
                orientation,
                latest_photo: Arc::new(Mutex::new(None)),
            },
            aggregator: Arc::new(PredictionAggregator::new()),
            events,
            config,
            session: Mutex::new(Session::default()),
            photo_in_flight: AtomicBool::new(false),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Capture affordances for the current state.
    pub fn controls(&self) -> CaptureControls {
        let session = self.lock();
        CaptureControls::derive(
            session.state,
            self.photo_in_flight.load(Ordering::SeqCst),
            session.concurrent_supported,
        )
    }

    /// Most recent photo sample, kept for display.
    pub fn latest_photo(&self) -> Option<Sample> {
        self.source
            .latest_photo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Predictions pooled for the current session.
    pub fn aggregator(&self) -> &PredictionAggregator {
        &self.aggregator
    }

    /// Feed that sensor and display collaborators write into.
    pub fn orientation(&self) -> &OrientationFeed {
        &self.source.orientation
    }

    /// Angle that keeps on-screen controls upright.
    pub fn controls_rotation(&self) -> u16 {
        resolve_controls_rotation(self.source.orientation.snapshot())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bind the camera and start previewing.
    ///
    /// A no-op when already previewing. Device errors abort setup, leave the
    /// orchestrator `Idle` and are never retried.
    pub async fn setup(&self) -> Result<(), CaptureError> {
        match self.state() {
            SessionState::Idle => {}
            SessionState::PreviewActive => return Ok(()),
            state => {
                return Err(self.fail(CaptureError::InvalidState {
                    operation: "set up the session",
                    state,
                }))
            }
        }

        let mount = self
            .source
            .device
            .camera_mount_info()
            .await
            .map_err(|e| {
                self.fail(CaptureError::from_device(
                    e,
                    Modality::Photo,
                    SessionState::Idle,
                ))
            })?;

        self.source.orientation.set_mount(mount);
        let concurrent = self.source.device.supports_concurrent_record_and_photo();
        log::info!(
            "capture: camera bound (external={}, mirrored={}, concurrent={concurrent})",
            mount.is_external,
            mount.is_mirrored
        );

        self.lock().concurrent_supported = concurrent;
        self.set_state(SessionState::PreviewActive);
        self.refresh_preview_rotation().await;
        Ok(())
    }

    /// Stop any active capture, release the camera and return to `Idle`.
    ///
    /// An active recording or combined session is finalized first so its
    /// predictions are not lost; its result (or error) is returned.
    pub async fn teardown(&self) -> Result<Option<FinalResult>, CaptureError> {
        let outcome = self.stop_active().await;
        self.source.device.release().await;
        self.set_state(SessionState::Idle);
        log::info!("capture: session torn down");
        outcome
    }

    /// React to an unsolicited device notification.
    pub async fn handle_device_event(
        &self,
        event: DeviceEvent,
    ) -> Result<Option<FinalResult>, CaptureError> {
        match event {
            DeviceEvent::RecordLimitationExceeded => {
                log::info!("capture: record limit reached, stopping");
                self.stop_active().await
            }
            DeviceEvent::Failed { code, message } => {
                log::error!("capture: device failed (0x{code:X}): {message}");
                self.teardown().await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Orientation updates
    // -----------------------------------------------------------------------

    /// Apply a sensor reading. Flat readings are ignored.
    pub fn on_sensor_reading(&self, reading: SensorReading) -> bool {
        self.source.orientation.apply_sensor_reading(reading)
    }

    /// Apply a display rotation and re-rotate the preview if it changed.
    pub async fn on_display_orientation_changed(&self, display: DisplayOrientation) {
        if self.source.orientation.set_display_orientation(display)
            && self.state() != SessionState::Idle
        {
            self.refresh_preview_rotation().await;
        }
    }

    // -----------------------------------------------------------------------
    // Photo
    // -----------------------------------------------------------------------

    /// Capture and classify a single photo.
    ///
    /// Outside a recording the photo is a session of its own and its label is
    /// reported as a single-modality result. During a recording (only when
    /// the device supports concurrent capture) the prediction is also pooled
    /// into the recording's session.
    pub async fn take_photo(&self) -> Result<FinalResult, CaptureError> {
        let state = {
            let session = self.lock();
            let allowed = match session.state {
                SessionState::PreviewActive => true,
                SessionState::Recording => session.concurrent_supported,
                SessionState::Idle | SessionState::CapturingInLoop => false,
            };
            if !allowed || self.photo_in_flight.swap(true, Ordering::SeqCst) {
                drop(session);
                return Err(self.fail(CaptureError::InvalidState {
                    operation: "take a photo",
                    state: self.state(),
                }));
            }
            session.state
        };
        self.publish_controls();

        let result = self.source.photo_prediction(state).await;

        self.photo_in_flight.store(false, Ordering::SeqCst);
        self.publish_controls();

        let prediction = result.map_err(|e| self.fail(e))?;
        let label = prediction.label.clone();

        let result = if self.state() == SessionState::Recording {
            self.aggregator.record(prediction);
            FinalResult::single(label)
        } else {
            let single = PredictionAggregator::new();
            single.record(prediction);
            single
                .finalize()
                .map_err(|_| self.fail(CaptureError::EmptySession { state }))?
        };

        self.events
            .emit(SessionEvent::PredictionReady(result.clone()));
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Audio recording
    // -----------------------------------------------------------------------

    /// Start an audio recording session.
    pub async fn start_recording(&self) -> Result<(), CaptureError> {
        self.begin(SessionState::Recording, "start recording")?;

        let handle = self.start_audio(SessionState::Recording).await?;
        self.lock().recording = Some(handle);
        self.set_state(SessionState::Recording);
        Ok(())
    }

    /// Stop the recording, classify it, and finalize the session over the
    /// audio prediction plus any photos taken while recording.
    pub async fn stop_recording(&self) -> Result<FinalResult, CaptureError> {
        let handle = {
            let mut session = self.lock();
            match (session.state, session.recording.take()) {
                (SessionState::Recording, Some(handle)) => handle,
                (state, handle) => {
                    session.recording = handle;
                    drop(session);
                    return Err(self.fail(CaptureError::InvalidState {
                        operation: "stop recording",
                        state,
                    }));
                }
            }
        };

        let outcome = self.finish_audio(handle, SessionState::Recording).await;
        let outcome = match outcome {
            Ok(prediction) => {
                self.aggregator.record(prediction);
                self.aggregator
                    .finalize()
                    .map_err(|_| CaptureError::EmptySession {
                        state: SessionState::Recording,
                    })
            }
            Err(e) => Err(e),
        };

        self.set_state(SessionState::PreviewActive);
        self.report(outcome)
    }

    /// Start or stop a recording; returns the result when stopping.
    pub async fn toggle_recording(&self) -> Result<Option<FinalResult>, CaptureError> {
        if self.state() == SessionState::Recording {
            self.stop_recording().await.map(Some)
        } else {
            self.start_recording().await.map(|()| None)
        }
    }

    // -----------------------------------------------------------------------
    // Combined capture
    // -----------------------------------------------------------------------

    /// Start recording audio and capturing photos on a fixed interval.
    ///
    /// The loop runs until [`stop_combined`](Self::stop_combined) is called.
    pub async fn start_combined(&self) -> Result<(), CaptureError> {
        self.begin(SessionState::CapturingInLoop, "start combined capture")?;

        let handle = self.start_audio(SessionState::CapturingInLoop).await?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_photo_loop(
            self.source.clone(),
            Arc::clone(&self.aggregator),
            self.events.clone(),
            self.config.loop_interval(),
            cancel.clone(),
        ));

        {
            let mut session = self.lock();
            session.recording = Some(handle);
            session.photo_loop = Some(PhotoLoop { cancel, task });
        }
        self.set_state(SessionState::CapturingInLoop);
        Ok(())
    }

    /// Stop the photo loop and the recording, classify the audio, and
    /// finalize over every pooled prediction.
    ///
    /// A photo iteration already in flight is allowed to finish and is
    /// counted. An audio failure is reported as an event but does not
    /// discard the photos; it is returned only when nothing was pooled.
    pub async fn stop_combined(&self) -> Result<FinalResult, CaptureError> {
        let state = SessionState::CapturingInLoop;
        let (handle, photo_loop) = {
            let mut session = self.lock();
            match (
                session.state,
                session.recording.take(),
                session.photo_loop.take(),
            ) {
                (SessionState::CapturingInLoop, Some(handle), Some(photo_loop)) => {
                    (handle, photo_loop)
                }
                (current, handle, photo_loop) => {
                    session.recording = handle;
                    session.photo_loop = photo_loop;
                    drop(session);
                    return Err(self.fail(CaptureError::InvalidState {
                        operation: "stop combined capture",
                        state: current,
                    }));
                }
            }
        };

        photo_loop.cancel.cancel();
        if let Err(e) = photo_loop.task.await {
            log::error!("capture: photo loop task failed: {e}");
        }

        let audio_error = match self.finish_audio(handle, state).await {
            Ok(prediction) => {
                self.aggregator.record(prediction);
                None
            }
            Err(e) => {
                log::warn!("capture: audio lost, finalizing photos only: {e}");
                Some(e)
            }
        };

        let outcome = match self.aggregator.finalize() {
            Ok(result) => {
                if let Some(e) = &audio_error {
                    self.events.error(e);
                }
                Ok(result)
            }
            Err(_) => Err(audio_error.unwrap_or(CaptureError::EmptySession { state })),
        };

        self.set_state(SessionState::PreviewActive);
        self.report(outcome)
    }

    /// Start or stop a combined capture; returns the result when stopping.
    pub async fn toggle_combined(&self) -> Result<Option<FinalResult>, CaptureError> {
        if self.state() == SessionState::CapturingInLoop {
            self.stop_combined().await.map(Some)
        } else {
            self.start_combined().await.map(|()| None)
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Reserve `target` from `PreviewActive` and open a fresh session.
    fn begin(&self, target: SessionState, operation: &'static str) -> Result<(), CaptureError> {
        {
            let mut session = self.lock();
            let photo_blocks = self.photo_in_flight.load(Ordering::SeqCst)
                && (target == SessionState::CapturingInLoop || !session.concurrent_supported);
            if session.state != SessionState::PreviewActive || photo_blocks {
                let state = session.state;
                drop(session);
                return Err(self.fail(CaptureError::InvalidState { operation, state }));
            }
            session.state = target;
        }
        log::debug!("capture: PreviewActive → {target}");
        self.aggregator.start();
        Ok(())
    }

    /// Start the device recording; rolls the reservation back on failure.
    async fn start_audio(&self, state: SessionState) -> Result<AudioHandle, CaptureError> {
        let path = self.config.audio_path(chrono::Utc::now());
        log::info!("capture: recording to {}", path.display());

        match self.source.device.start_audio_recording(&path).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.set_state(SessionState::PreviewActive);
                Err(self.fail(CaptureError::from_device(e, Modality::Audio, state)))
            }
        }
    }

    /// Stop the device recording and classify it.
    async fn finish_audio(
        &self,
        handle: AudioHandle,
        state: SessionState,
    ) -> Result<Prediction, CaptureError> {
        let ctx = self.source.orientation.snapshot();
        let wav = self
            .source
            .device
            .stop_audio_recording(handle)
            .await
            .map_err(|e| CaptureError::from_device(e, Modality::Audio, state))?;
        log::debug!("capture: recording stopped ({} bytes)", wav.len());

        let sample = Sample::audio(wav, resolve_rotation_degrees(ctx));
        self.source.submit(sample, state).await
    }

    async fn stop_active(&self) -> Result<Option<FinalResult>, CaptureError> {
        match self.state() {
            SessionState::Recording => self.stop_recording().await.map(Some),
            SessionState::CapturingInLoop => self.stop_combined().await.map(Some),
            SessionState::Idle | SessionState::PreviewActive => Ok(None),
        }
    }

    async fn refresh_preview_rotation(&self) {
        let ctx = self.source.orientation.snapshot();
        if ctx.is_external_camera {
            return;
        }
        let degrees = resolve_preview_rotation(ctx);
        if let Err(e) = self.source.device.apply_preview_rotation(degrees).await {
            log::warn!("capture: could not rotate preview to {degrees}°: {e}");
            return;
        }
        self.events
            .emit(SessionEvent::PreviewRotationChanged(degrees));
    }

    fn set_state(&self, state: SessionState) {
        let previous = {
            let mut session = self.lock();
            std::mem::replace(&mut session.state, state)
        };
        if previous != state {
            log::debug!("capture: {previous} → {state}");
        }
        self.events.emit(SessionEvent::SessionStateChanged(state));
        self.publish_controls();
    }

    fn publish_controls(&self) {
        self.events
            .emit(SessionEvent::ControlsChanged(self.controls()));
    }

    /// Emit the outcome of a finished session to the UI and return it.
    fn report(
        &self,
        outcome: Result<FinalResult, CaptureError>,
    ) -> Result<FinalResult, CaptureError> {
        match outcome {
            Ok(result) => {
                log::info!("capture: {} ({})", result.message(), result.mode);
                self.events
                    .emit(SessionEvent::PredictionReady(result.clone()));
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Log and publish `err`, then hand it back for returning.
    fn fail(&self, err: CaptureError) -> CaptureError {
        log::error!("capture error: {err}");
        self.events.error(&err);
        err
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Photo loop
// ---------------------------------------------------------------------------

/// Capture, classify and record a photo on every tick until cancelled.
///
/// Cancellation is only observed between iterations. A failed iteration is
/// logged, reported, and skipped.
async fn run_photo_loop(
    source: SampleSource,
    aggregator: Arc<PredictionAggregator>,
    events: EventSink,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut iteration: u64 = 0;

    log::debug!("capture: photo loop started ({interval:?})");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        iteration += 1;
        match source.photo_prediction(SessionState::CapturingInLoop).await {
            Ok(prediction) => aggregator.record(prediction),
            Err(e) => {
                log::warn!("capture: loop iteration {iteration} skipped: {e}");
                events.error(&e);
            }
        }
    }
    log::debug!("capture: photo loop stopped after {iteration} iterations");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::{DeviceError, MockDevice};
    use crate::capture::error::ErrorKind;
    use crate::orientation::{
        CameraMountInfo, DeviceOrientation, EnclosurePanel, NativeOrientation, PhotoOrientation,
    };
    use crate::predict::{AggregationMode, MockPredictionClient, PredictionError};
    use tokio::sync::mpsc::UnboundedReceiver;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn config() -> CaptureConfig {
        CaptureConfig {
            loop_interval_ms: 500,
            capture_dir: std::path::PathBuf::from("/captures"),
            audio_file_prefix: "SimpleAudio_".into(),
        }
    }

    fn make_orchestrator(
        device: MockDevice,
        client: MockPredictionClient,
    ) -> (
        CaptureOrchestrator,
        Arc<MockDevice>,
        Arc<MockPredictionClient>,
        UnboundedReceiver<SessionEvent>,
    ) {
        let device = Arc::new(device);
        let client = Arc::new(client);
        let (events, rx) = EventSink::channel();
        let orc = CaptureOrchestrator::new(
            Arc::clone(&device) as Arc<dyn DeviceCapture>,
            Arc::clone(&client) as Arc<dyn PredictionClient>,
            OrientationFeed::default(),
            config(),
            events,
        );
        (orc, device, client, rx)
    }

    async fn ready(
        device: MockDevice,
        client: MockPredictionClient,
    ) -> (
        CaptureOrchestrator,
        Arc<MockDevice>,
        Arc<MockPredictionClient>,
        UnboundedReceiver<SessionEvent>,
    ) {
        let parts = make_orchestrator(device, client);
        parts.0.setup().await.unwrap();
        parts
    }

    fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn error_kinds(events: &[SessionEvent]) -> Vec<ErrorKind> {
        events
            .iter()
            .filter_map(|ev| match ev {
                SessionEvent::Error { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Setup / teardown
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn setup_enters_preview_and_rotates_preview() {
        let (orc, device, _client, mut rx) =
            make_orchestrator(MockDevice::new(), MockPredictionClient::always("happy"));
        orc.orientation()
            .set_display_orientation(DisplayOrientation::Portrait);

        orc.setup().await.unwrap();

        assert_eq!(orc.state(), SessionState::PreviewActive);
        assert_eq!(device.preview_rotations(), vec![90]);
        let events = drain(&mut rx);
        assert!(events.contains(&SessionEvent::SessionStateChanged(SessionState::PreviewActive)));
        assert!(events.contains(&SessionEvent::PreviewRotationChanged(90)));
    }

    #[tokio::test]
    async fn setup_is_reentrant_while_previewing() {
        let (orc, device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("happy")).await;
        orc.setup().await.unwrap();
        assert_eq!(orc.state(), SessionState::PreviewActive);
        assert_eq!(device.preview_rotations().len(), 1);
    }

    #[tokio::test]
    async fn external_camera_preview_is_not_rotated() {
        let device = MockDevice::new().with_mount(Ok(CameraMountInfo::from_enclosure(
            None,
            NativeOrientation::Landscape,
        )));
        let (orc, device, _client, _rx) = ready(device, MockPredictionClient::always("x")).await;
        assert!(device.preview_rotations().is_empty());
        assert!(orc.orientation().snapshot().is_external_camera);
    }

    #[tokio::test]
    async fn missing_device_aborts_setup() {
        let device = MockDevice::new().with_mount(Err(DeviceError::Unavailable));
        let (orc, _device, _client, mut rx) =
            make_orchestrator(device, MockPredictionClient::always("x"));

        let err = orc.setup().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
        assert_eq!(err.state(), SessionState::Idle);
        assert_eq!(orc.state(), SessionState::Idle);
        assert_eq!(error_kinds(&drain(&mut rx)), vec![ErrorKind::DeviceUnavailable]);
    }

    #[tokio::test]
    async fn denied_access_aborts_setup() {
        let device = MockDevice::new().with_mount(Err(DeviceError::PermissionDenied));
        let (orc, _device, _client, _rx) =
            make_orchestrator(device, MockPredictionClient::always("x"));
        assert_eq!(orc.setup().await.unwrap_err().kind(), ErrorKind::PermissionDenied);
        assert_eq!(orc.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn teardown_finalizes_active_recording() {
        let (orc, device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("sad")).await;
        orc.start_recording().await.unwrap();

        let result = orc.teardown().await.unwrap();
        assert_eq!(result, Some(FinalResult::single("sad")));
        assert_eq!(orc.state(), SessionState::Idle);
        assert!(device.was_released());
        assert!(!device.is_recording());
    }

    #[tokio::test]
    async fn teardown_when_previewing_returns_nothing() {
        let (orc, device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("sad")).await;
        assert_eq!(orc.teardown().await.unwrap(), None);
        assert!(device.was_released());
        assert_eq!(orc.state(), SessionState::Idle);
    }

    // -----------------------------------------------------------------------
    // Photo
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn photo_requires_setup() {
        let (orc, device, _client, _rx) =
            make_orchestrator(MockDevice::new(), MockPredictionClient::always("x"));
        let err = orc.take_photo().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(device.photo_calls(), 0);
    }

    #[tokio::test]
    async fn photo_reports_single_result_and_keeps_sample() {
        let (orc, _device, client, mut rx) =
            ready(MockDevice::new(), MockPredictionClient::always("happy")).await;
        orc.orientation()
            .set_device_orientation(DeviceOrientation::Rotated90CounterClockwise);

        let result = orc.take_photo().await.unwrap();
        assert_eq!(
            result,
            FinalResult {
                label: "happy".into(),
                mode: AggregationMode::SingleModality
            }
        );
        assert_eq!(client.photo_calls(), 1);

        let photo = orc.latest_photo().expect("photo kept");
        assert_eq!(photo.captured_at_orientation_degrees, 90);
        assert_eq!(photo.photo_orientation, Some(PhotoOrientation::Rotate90));
        assert!(drain(&mut rx).contains(&SessionEvent::PredictionReady(result)));
    }

    #[tokio::test]
    async fn photo_network_failure_records_nothing() {
        let client = MockPredictionClient::always("happy")
            .with_photo_results([Err(PredictionError::Request("refused".into()))]);
        let (orc, _device, _client, mut rx) = ready(MockDevice::new(), client).await;

        let err = orc.take_photo().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmissionFailure);
        assert_eq!(err.modality(), Some(Modality::Photo));
        assert_eq!(err.state(), SessionState::PreviewActive);
        assert!(orc.aggregator().is_empty());
        assert_eq!(error_kinds(&drain(&mut rx)), vec![ErrorKind::SubmissionFailure]);

        // The in-flight flag was released.
        assert_eq!(orc.take_photo().await.unwrap().label, "happy");
    }

    #[tokio::test]
    async fn photo_capture_failure_is_reported() {
        let device =
            MockDevice::new().with_photo_results([Err(DeviceError::Failed("busy".into()))]);
        let (orc, _device, client, _rx) =
            ready(device, MockPredictionClient::always("happy")).await;

        let err = orc.take_photo().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaptureFailure);
        assert_eq!(client.photo_calls(), 0);
    }

    #[tokio::test]
    async fn overlapping_photos_are_rejected() {
        let client =
            MockPredictionClient::always("happy").with_photo_delay(Duration::from_millis(50));
        let (orc, device, _client, _rx) = ready(MockDevice::new(), client).await;

        let (first, second) = tokio::join!(orc.take_photo(), orc.take_photo());
        assert!(first.is_ok());
        assert_eq!(second.unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(device.photo_calls(), 1);
    }

    #[tokio::test]
    async fn photo_while_recording_needs_concurrent_support() {
        let device = MockDevice::new().with_concurrent(false);
        let (orc, device, _client, _rx) = ready(device, MockPredictionClient::always("x")).await;
        orc.start_recording().await.unwrap();

        assert!(!orc.controls().photo_enabled);
        let err = orc.take_photo().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.state(), SessionState::Recording);
        assert_eq!(device.photo_calls(), 0);
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn recording_round_trip_is_single_modality() {
        let client = MockPredictionClient::always("x").with_audio_results([Ok("angry".into())]);
        let (orc, device, _client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_recording().await.unwrap();
        assert_eq!(orc.state(), SessionState::Recording);
        assert!(device.is_recording());

        let result = orc.stop_recording().await.unwrap();
        assert_eq!(result, FinalResult::single("angry"));
        assert_eq!(orc.state(), SessionState::PreviewActive);

        let path = &device.started_paths()[0];
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("/captures"));
        assert!(name.starts_with("SimpleAudio_") && name.ends_with(".wav"));
    }

    #[tokio::test]
    async fn photos_taken_while_recording_are_pooled() {
        let client = MockPredictionClient::always("x")
            .with_photo_results([Ok("happy".into()), Ok("happy".into())])
            .with_audio_results([Ok("sad".into())]);
        let (orc, _device, _client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_recording().await.unwrap();
        assert_eq!(orc.take_photo().await.unwrap(), FinalResult::single("happy"));
        orc.take_photo().await.unwrap();

        let result = orc.stop_recording().await.unwrap();
        assert_eq!(result.label, "happy");
        assert_eq!(result.mode, AggregationMode::Combined);
    }

    #[tokio::test]
    async fn audio_submission_failure_surfaces() {
        let client = MockPredictionClient::always("x").with_audio_results([Err(PredictionError::Timeout)]);
        let (orc, device, _client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_recording().await.unwrap();
        let err = orc.stop_recording().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmissionFailure);
        assert_eq!(err.modality(), Some(Modality::Audio));
        assert_eq!(orc.state(), SessionState::PreviewActive);
        assert!(!device.is_recording());
    }

    #[tokio::test]
    async fn stop_without_recording_is_invalid() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        let err = orc.stop_recording().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(orc.state(), SessionState::PreviewActive);
    }

    #[tokio::test]
    async fn start_recording_twice_is_invalid() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        orc.start_recording().await.unwrap();
        assert_eq!(
            orc.start_recording().await.unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(orc.state(), SessionState::Recording);
    }

    #[tokio::test]
    async fn toggle_recording_starts_then_stops() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("neutral")).await;
        assert_eq!(orc.toggle_recording().await.unwrap(), None);
        assert_eq!(
            orc.toggle_recording().await.unwrap(),
            Some(FinalResult::single("neutral"))
        );
    }

    #[tokio::test]
    async fn record_limit_finalizes_recording() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("fear")).await;
        orc.start_recording().await.unwrap();

        let result = orc
            .handle_device_event(DeviceEvent::RecordLimitationExceeded)
            .await
            .unwrap();
        assert_eq!(result, Some(FinalResult::single("fear")));
        assert_eq!(orc.state(), SessionState::PreviewActive);
    }

    #[tokio::test]
    async fn device_failure_tears_down() {
        let (orc, device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("fear")).await;
        orc.handle_device_event(DeviceEvent::Failed {
            code: 0xC00D_3704,
            message: "hardware lost".into(),
        })
        .await
        .unwrap();
        assert_eq!(orc.state(), SessionState::Idle);
        assert!(device.was_released());
    }

    async fn combined_running(label: &str) -> (CaptureOrchestrator, Arc<MockDevice>) {
        let client = MockPredictionClient::always(label);
        let (orc, device, _client, _rx) = ready(MockDevice::new(), client).await;
        orc.start_combined().await.unwrap();
        // Photos at 0 and 500 ms.
        tokio::time::sleep(Duration::from_millis(600)).await;
        (orc, device)
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_finalizes_active_combined_session() {
        let (orc, device) = combined_running("sad").await;

        let result = orc.teardown().await.unwrap();
        assert_eq!(
            result,
            Some(FinalResult {
                label: "sad".into(),
                mode: AggregationMode::Combined
            })
        );
        assert_eq!(orc.state(), SessionState::Idle);
        assert!(device.was_released());
        assert!(!device.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn record_limit_finalizes_combined_session() {
        let (orc, device) = combined_running("calm").await;

        let result = orc
            .handle_device_event(DeviceEvent::RecordLimitationExceeded)
            .await
            .unwrap()
            .expect("session result");
        assert_eq!(result.label, "calm");
        assert_eq!(result.mode, AggregationMode::Combined);
        assert_eq!(orc.state(), SessionState::PreviewActive);
        assert!(!device.is_recording());
        assert!(!device.was_released());
    }

    #[tokio::test(start_paused = true)]
    async fn device_failure_finalizes_combined_session() {
        let (orc, device) = combined_running("fear").await;

        let result = orc
            .handle_device_event(DeviceEvent::Failed {
                code: 0xC00D_3704,
                message: "hardware lost".into(),
            })
            .await
            .unwrap()
            .expect("session result");
        assert_eq!(result.label, "fear");
        assert_eq!(result.mode, AggregationMode::Combined);
        assert_eq!(orc.state(), SessionState::Idle);
        assert!(device.was_released());
        assert!(!device.is_recording());
    }

    // -----------------------------------------------------------------------
    // Combined
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn combined_while_recording_is_invalid() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        orc.start_recording().await.unwrap();

        let err = orc.start_combined().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.state(), SessionState::Recording);
        assert_eq!(orc.state(), SessionState::Recording);
    }

    #[tokio::test(start_paused = true)]
    async fn recording_while_combined_is_invalid() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        orc.start_combined().await.unwrap();

        assert_eq!(
            orc.start_recording().await.unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(orc.state(), SessionState::CapturingInLoop);
        orc.stop_combined().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn combined_pools_interval_photos_and_audio() {
        let client = MockPredictionClient::always("x")
            .with_photo_results([Ok("sad".into()), Ok("happy".into()), Ok("happy".into())])
            .with_audio_results([Ok("sad".into())]);
        let (orc, device, client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_combined().await.unwrap();
        assert_eq!(orc.state(), SessionState::CapturingInLoop);
        assert!(device.is_recording());

        // Ticks at 0, 500 and 1000 ms.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let result = orc.stop_combined().await.unwrap();

        assert_eq!(client.photo_calls(), 3);
        assert_eq!(client.audio_calls(), 1);
        // sad: 2, happy: 2; "sad" occurred first.
        assert_eq!(
            result,
            FinalResult {
                label: "sad".into(),
                mode: AggregationMode::Combined
            }
        );
        assert_eq!(orc.state(), SessionState::PreviewActive);
        assert!(!device.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_failed_iterations() {
        let client = MockPredictionClient::always("fear")
            .with_photo_results([Err(PredictionError::Timeout)])
            .with_audio_results([Ok("fear".into())]);
        let device =
            MockDevice::new().with_photo_results([Ok(vec![1]), Err(DeviceError::Failed("blur".into()))]);
        let (orc, device, client, mut rx) = ready(device, client).await;

        orc.start_combined().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        // Iteration 1 failed at the service, 2 at the device, 3 succeeded.
        assert_eq!(device.photo_calls(), 3);
        assert_eq!(client.photo_calls(), 2);
        assert_eq!(orc.state(), SessionState::CapturingInLoop);

        let result = orc.stop_combined().await.unwrap();
        assert_eq!(result.label, "fear");
        assert_eq!(result.mode, AggregationMode::Combined);

        let kinds = error_kinds(&drain(&mut rx));
        assert_eq!(
            kinds,
            vec![ErrorKind::SubmissionFailure, ErrorKind::CaptureFailure]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_iteration_is_kept_on_stop() {
        let client = MockPredictionClient::always("happy")
            .with_photo_delay(Duration::from_millis(300))
            .with_audio_results([Ok("calm".into())]);
        let (orc, _device, client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_combined().await.unwrap();
        // First iteration submitted at t=0 and still waiting on the service.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let result = orc.stop_combined().await.unwrap();
        assert_eq!(client.photo_calls(), 1);
        // happy (photo) ties calm (audio); the photo arrived first.
        assert_eq!(result.label, "happy");
        assert_eq!(result.mode, AggregationMode::Combined);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_never_stops_by_itself() {
        let (orc, _device, client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        orc.start_combined().await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(orc.state(), SessionState::CapturingInLoop);
        assert!(client.photo_calls() >= 20);
        orc.stop_combined().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn combined_audio_failure_keeps_photos() {
        let client = MockPredictionClient::always("happy")
            .with_audio_results([Err(PredictionError::EmptyResponse)]);
        let (orc, _device, _client, mut rx) = ready(MockDevice::new(), client).await;

        orc.start_combined().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        let result = orc.stop_combined().await.unwrap();
        assert_eq!(result.label, "happy");
        assert_eq!(result.mode, AggregationMode::Combined);
        assert!(error_kinds(&drain(&mut rx)).contains(&ErrorKind::SubmissionFailure));
    }

    #[tokio::test(start_paused = true)]
    async fn combined_with_nothing_pooled_returns_audio_error() {
        let client = MockPredictionClient::always("x")
            .with_photo_results([Err(PredictionError::Timeout)])
            .with_audio_results([Err(PredictionError::Timeout)]);
        let (orc, _device, _client, _rx) = ready(MockDevice::new(), client).await;

        orc.start_combined().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = orc.stop_combined().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmissionFailure);
        assert_eq!(err.modality(), Some(Modality::Audio));
        assert_eq!(orc.state(), SessionState::PreviewActive);
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_clears_previous_predictions() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("neutral")).await;

        orc.start_combined().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        orc.stop_combined().await.unwrap();

        orc.start_recording().await.unwrap();
        assert!(orc.aggregator().is_empty());
        assert_eq!(
            orc.stop_recording().await.unwrap().mode,
            AggregationMode::SingleModality
        );
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_combined_and_controls() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;

        assert_eq!(orc.toggle_combined().await.unwrap(), None);
        let controls = orc.controls();
        assert!(!controls.photo_enabled && !controls.record_enabled && controls.combined_enabled);
        assert_eq!(orc.take_photo().await.unwrap_err().kind(), ErrorKind::InvalidState);

        assert!(orc.toggle_combined().await.unwrap().is_some());
        assert!(orc.controls().photo_enabled);
    }

    // -----------------------------------------------------------------------
    // Orientation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn display_change_rerotates_preview() {
        let device = MockDevice::new().with_mount(Ok(CameraMountInfo::from_enclosure(
            Some(EnclosurePanel::Front),
            NativeOrientation::Landscape,
        )));
        let (orc, device, _client, _rx) = ready(device, MockPredictionClient::always("x")).await;

        orc.on_display_orientation_changed(DisplayOrientation::Portrait)
            .await;
        orc.on_display_orientation_changed(DisplayOrientation::Portrait)
            .await;
        // Mirrored front camera: 0 at setup, then (360 - 90) % 360.
        assert_eq!(device.preview_rotations(), vec![0, 270]);
    }

    #[tokio::test]
    async fn flat_sensor_readings_do_not_change_photo_tag() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        assert!(orc.on_sensor_reading(SensorReading::Rotated180CounterClockwise));
        assert!(!orc.on_sensor_reading(SensorReading::FaceDown));

        orc.take_photo().await.unwrap();
        assert_eq!(
            orc.latest_photo().unwrap().photo_orientation,
            Some(PhotoOrientation::Rotate180)
        );
    }

    #[tokio::test]
    async fn controls_rotation_uses_current_snapshot() {
        let (orc, _device, _client, _rx) =
            ready(MockDevice::new(), MockPredictionClient::always("x")).await;
        orc.orientation()
            .set_device_orientation(DeviceOrientation::Rotated90CounterClockwise);
        orc.orientation()
            .set_display_orientation(DisplayOrientation::Portrait);
        assert_eq!(orc.controls_rotation(), 180);
    }
}
