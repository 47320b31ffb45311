//! Scan session lifecycle.
//!
//! A session runs on three threads. The control thread calls `start`, `stop`
//! and the setters, and receives every callback. A short-lived binder thread
//! waits for the camera, because binding may block for a long time. A decode
//! worker processes frames strictly one at a time, in delivery order.
//!
//! All mutable session state sits behind one mutex. Callbacks are posted to
//! the control thread tagged with the callback epoch current at post time. A
//! user `stop` bumps the epoch, so anything a stopped session posted is
//! dropped on arrival instead of reaching the listener. A session that stops
//! itself (single-shot success, analysis fault, bind failure) does not bump
//! it, and neither does `start`; the result or error that caused the stop is
//! still delivered, even when a new session has started in the meantime.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use barscan_core::{mirror_x, CandidatePoint};
use barscan_decode::{DecodeOutcome, DecodeStrategy, DecoderFactory, MetadataKey};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    CameraHandle, CameraProvider, ControlExecutor, ErrorContext, Frame, FrameSink, LensFacing,
    PointListener, ScanError, ScanListener, ScanMode, ScanOptions, ScanResult, ScanState,
};

/// Drives camera binding, frame analysis and result delivery.
///
/// Cheap to clone; clones share one session. Listeners may call back into
/// the orchestrator (e.g. `stop` from `on_result`).
#[derive(Clone)]
pub struct ScanOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    camera: Arc<dyn CameraProvider>,
    factory: Arc<dyn DecoderFactory>,
    executor: Arc<dyn ControlExecutor>,
}

#[derive(Default)]
struct Inner {
    state: ScanState,
    epoch: u64,
    next_session: u64,
    session: Option<Session>,
    torch: Option<bool>,
    lens: Option<LensFacing>,
    point_listener: Option<Arc<dyn PointListener>>,
}

/// Exists from `start` until the session ends. Dropping it closes the
/// worker's shutdown channel.
struct Session {
    id: u64,
    torch: bool,
    camera: Option<Box<dyn CameraHandle>>,
    last_text: Option<String>,
    _shutdown: Sender<()>,
}

impl Session {
    /// Release the camera. Call without holding the lock.
    fn close(mut self) {
        if let Some(camera) = self.camera.take() {
            camera.unbind();
        }
    }
}

impl ScanOrchestrator {
    pub fn new(
        camera: Arc<dyn CameraProvider>,
        factory: Arc<dyn DecoderFactory>,
        executor: Arc<dyn ControlExecutor>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                camera,
                factory,
                executor,
            }),
        }
    }

    pub fn state(&self) -> ScanState {
        self.shared.inner.lock().state
    }

    /// Begin a session. Returns immediately; binding completes in the
    /// background and failures arrive through `listener.on_error`.
    pub fn start(
        &self,
        options: ScanOptions,
        listener: Arc<dyn ScanListener>,
    ) -> Result<(), ScanError> {
        if self.state().is_active() {
            return Err(ScanError::AlreadyActive);
        }
        let decoder = self.shared.factory.create_decoder(&options.decode);
        let (frame_tx, frame_rx) = unbounded::<Frame>();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let (id, epoch, lens, torch) = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_active() {
                return Err(ScanError::AlreadyActive);
            }
            inner.next_session += 1;
            let id = inner.next_session;
            let lens = inner.lens.unwrap_or(options.lens_facing);
            let torch = inner.torch.unwrap_or(options.torch);
            inner.session = Some(Session {
                id,
                torch,
                camera: None,
                last_text: None,
                _shutdown: shutdown_tx,
            });
            inner.state = ScanState::Starting;
            (id, inner.epoch, lens, torch)
        };
        info!(
            "session {id}: starting ({:?}, {:?}, lens {lens:?}, torch {torch})",
            options.scan_mode,
            decoder.kind()
        );

        let worker = Worker {
            shared: self.shared.clone(),
            session: id,
            epoch,
            decoder,
            mirrored: lens.is_mirrored(),
            mode: options.scan_mode,
            return_metadata: options.return_metadata,
            listener: listener.clone(),
        };
        let spawned = thread::Builder::new()
            .name("scan-worker".into())
            .spawn(move || worker.run(frame_rx, shutdown_rx));
        if let Err(e) = spawned {
            self.shared.end_session(id, ScanState::Idle);
            return Err(ScanError::Spawn {
                thread: "worker",
                reason: e.to_string(),
            });
        }

        let shared = self.shared.clone();
        let sink = FrameSink::new(frame_tx);
        let spawned = thread::Builder::new()
            .name("scan-binder".into())
            .spawn(move || shared.bind(id, epoch, lens, sink, listener));
        if let Err(e) = spawned {
            self.shared.end_session(id, ScanState::Idle);
            return Err(ScanError::Spawn {
                thread: "binder",
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// End the session, if any. Idempotent.
    ///
    /// A decode already running is not interrupted, but nothing it or any
    /// earlier frame produced reaches a listener after this returns.
    pub fn stop(&self) {
        let session = {
            let mut inner = self.shared.inner.lock();
            inner.epoch += 1;
            let session = inner.session.take();
            if session.is_some() {
                inner.state = ScanState::Stopped;
            }
            session
        };
        if let Some(session) = session {
            info!("session {}: stopped", session.id);
            session.close();
        }
    }

    /// Applies now when a camera is bound, otherwise at the next bind.
    pub fn set_torch(&self, enabled: bool) {
        let mut inner = self.shared.inner.lock();
        inner.torch = Some(enabled);
        if let Some(session) = inner.session.as_mut() {
            session.torch = enabled;
            if let Some(camera) = session.camera.as_mut() {
                if let Err(e) = camera.set_torch(enabled) {
                    warn!("session {}: torch {enabled} failed: {e}", session.id);
                }
            }
        }
    }

    /// Takes effect at the next `start`; a running session is not rebound.
    pub fn set_lens_facing(&self, lens: LensFacing) {
        self.shared.inner.lock().lens = Some(lens);
    }

    pub fn set_point_listener(&self, listener: Option<Arc<dyn PointListener>>) {
        self.shared.inner.lock().point_listener = listener;
    }
}

impl Shared {
    fn is_current(&self, id: u64) -> bool {
        self.inner.lock().session.as_ref().is_some_and(|s| s.id == id)
    }

    /// End session `id` from inside the pipeline. Pending callbacks survive.
    fn end_session(&self, id: u64, next: ScanState) -> bool {
        let session = {
            let mut inner = self.inner.lock();
            if !inner.session.as_ref().is_some_and(|s| s.id == id) {
                return false;
            }
            inner.state = next;
            inner.session.take()
        };
        if let Some(session) = session {
            session.close();
        }
        true
    }

    /// Run `task` on the control thread unless a stop intervenes first.
    fn post(self: &Arc<Self>, epoch: u64, task: impl FnOnce() + Send + 'static) {
        let shared = self.clone();
        self.executor.execute(Box::new(move || {
            let live = shared.inner.lock().epoch == epoch;
            if live {
                task();
            } else {
                trace!("dropping callback from a stopped session");
            }
        }));
    }

    fn post_error(
        self: &Arc<Self>,
        epoch: u64,
        listener: &Arc<dyn ScanListener>,
        context: ErrorContext,
        error: ScanError,
    ) {
        let listener = listener.clone();
        self.post(epoch, move || listener.on_error(context, error));
    }

    /// Binder thread body.
    fn bind(
        self: Arc<Self>,
        id: u64,
        epoch: u64,
        lens: LensFacing,
        sink: FrameSink,
        listener: Arc<dyn ScanListener>,
    ) {
        let bound = self.camera.bind(lens, sink);

        let mut inner = self.inner.lock();
        let current = inner.session.as_ref().is_some_and(|s| s.id == id);
        match bound {
            Ok(mut camera) if current => {
                if let Some(session) = inner.session.as_mut() {
                    if session.torch {
                        if let Err(e) = camera.set_torch(true) {
                            warn!("session {id}: enabling torch failed: {e}");
                        }
                    }
                    session.camera = Some(camera);
                }
                inner.state = ScanState::Running;
                info!("session {id}: camera bound");
            }
            Ok(camera) => {
                drop(inner);
                info!("session {id}: stopped while binding; releasing camera");
                camera.unbind();
            }
            Err(e) if current => {
                let session = inner.session.take();
                inner.state = ScanState::Idle;
                drop(inner);
                drop(session);
                warn!("session {id}: bind failed: {e}");
                self.post_error(epoch, &listener, ErrorContext::Binding, e.into());
            }
            Err(e) => {
                debug!("session {id}: bind failed after stop: {e}");
            }
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    session: u64,
    epoch: u64,
    decoder: Box<dyn DecodeStrategy>,
    mirrored: bool,
    mode: ScanMode,
    return_metadata: Option<BTreeSet<MetadataKey>>,
    listener: Arc<dyn ScanListener>,
}

/// What the frame handler tells the worker loop.
enum Next {
    Continue,
    Exit,
}

struct Analysis {
    width: usize,
    height: usize,
    outcome: DecodeOutcome,
    points: Vec<CandidatePoint>,
}

impl Worker {
    fn run(mut self, frames: Receiver<Frame>, shutdown: Receiver<()>) {
        debug!("session {}: worker up", self.session);
        loop {
            select! {
                recv(frames) -> frame => match frame {
                    Ok(frame) => {
                        if let Next::Exit = self.handle_frame(frame) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
            }
        }
        debug!("session {}: worker done", self.session);
    }

    /// Process one frame. The frame is released when this returns.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(session = self.session))
    )]
    fn handle_frame(&mut self, mut frame: Frame) -> Next {
        if !self.shared.is_current(self.session) {
            return Next::Exit;
        }

        let mirrored = self.mirrored;
        let decoder = &mut self.decoder;
        let analysis = catch_unwind(AssertUnwindSafe(|| {
            frame.take_oriented(mirrored).map(|buffer| Analysis {
                width: buffer.width(),
                height: buffer.height(),
                outcome: decoder.decode(&buffer),
                points: decoder.possible_result_points(),
            })
        }));

        let analysis = match analysis {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(e)) => {
                debug!("session {}: unusable frame: {e}", self.session);
                self.shared.post_error(
                    self.epoch,
                    &self.listener,
                    ErrorContext::ImageProcessing,
                    e.into(),
                );
                return Next::Continue;
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!("session {}: analysis fault: {reason}", self.session);
                self.shared.post_error(
                    self.epoch,
                    &self.listener,
                    ErrorContext::Analysis,
                    ScanError::AnalysisFault(reason),
                );
                self.shared.end_session(self.session, ScanState::Stopped);
                return Next::Exit;
            }
        };

        self.post_points(analysis.width, analysis.height, analysis.points);

        let DecodeOutcome::Decoded(decoded) = analysis.outcome else {
            return Next::Continue;
        };
        debug!(
            "session {}: decoded {} ({} chars)",
            self.session,
            decoded.format,
            decoded.text.len()
        );
        let result = ScanResult::from_decoded(decoded, self.return_metadata.as_ref());

        match self.mode {
            ScanMode::Single => {
                self.post_result(result);
                self.shared.end_session(self.session, ScanState::Stopped);
                info!("session {}: single scan complete", self.session);
                Next::Exit
            }
            ScanMode::Continuous => {
                if self.remember(&result.text) {
                    self.post_result(result);
                } else {
                    trace!("session {}: repeated text suppressed", self.session);
                }
                Next::Continue
            }
        }
    }

    /// Record `text` as the last emitted one. `false` if it repeats it.
    fn remember(&self, text: &str) -> bool {
        let mut inner = self.shared.inner.lock();
        let Some(session) = inner.session.as_mut().filter(|s| s.id == self.session) else {
            return false;
        };
        if session.last_text.as_deref() == Some(text) {
            return false;
        }
        session.last_text = Some(text.to_owned());
        true
    }

    fn post_result(&self, result: ScanResult) {
        let listener = self.listener.clone();
        self.shared.post(self.epoch, move || listener.on_result(result));
    }

    fn post_points(&self, width: usize, height: usize, points: Vec<CandidatePoint>) {
        if points.is_empty() {
            return;
        }
        let Some(listener) = self.shared.inner.lock().point_listener.clone() else {
            return;
        };
        let points: Vec<CandidatePoint> = if self.mirrored {
            points.into_iter().map(|p| mirror_x(p, width)).collect()
        } else {
            points
        };
        self.shared.post(self.epoch, move || {
            listener.set_frame_size(width, height);
            for p in points {
                listener.on_candidate_point(p);
            }
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
