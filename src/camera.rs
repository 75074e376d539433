use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::barcode::CleanedCode;
use crate::catalog::Catalog;
use crate::error::{CameraError, CatalogError};
use crate::router::{ScanActions, ScanRouter};
use crate::session::ScanField;
use crate::types::{LookupResult, ScanTarget};

pub const SUPPORTED_FORMATS: [&str; 8] = [
    "code_128", "code_39", "code_93", "ean_13", "ean_8", "upc_a", "upc_e", "qr_code",
];

pub const STATUS_INITIALISING: &str = "Initialisation de la caméra...";
pub const STATUS_READY: &str = "Scannez le code devant la caméra.";
pub const STATUS_IDLE: &str = "Autorisez l’accès à la caméra pour scanner automatiquement.";
pub const STATUS_STOPPED: &str = "La caméra s'est arrêtée. Relancez le scan.";

/// Formats to configure: what the detector reports, restricted to
/// [`SUPPORTED_FORMATS`]. An empty intersection means "ask for all of them".
pub fn detector_formats(reported: &[String]) -> Vec<String> {
    let formats: Vec<String> = reported
        .iter()
        .filter(|f| SUPPORTED_FORMATS.contains(&f.as_str()))
        .cloned()
        .collect();
    if formats.is_empty() {
        SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect()
    } else {
        formats
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub trait Camera {
    fn acquire(&mut self) -> Result<(), CameraError>;

    fn next_frame(&mut self) -> Option<Frame>;

    /// Stops capture. Must be safe to call when nothing is held.
    fn release(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBarcode {
    pub raw_value: String,
    pub format: String,
}

// zero or more payloads per frame
pub trait BarcodeDetector {
    fn supported_formats(&self) -> Result<Vec<String>, String>;

    fn configure(&mut self, formats: &[String]);

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedBarcode>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Decoded(String),
    // not an error
    NotFound,
    Error(String),
}

pub trait PushReader {
    fn start(&mut self, events: Sender<ReaderEvent>) -> Result<(), CameraError>;

    fn stop(&mut self);
}

pub trait ReaderLoader {
    type Reader: PushReader;

    fn load(&mut self) -> Result<Self::Reader, CameraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameResult {
    Decoded(String),
    Nothing,
    // transient, the session keeps going
    Fault(String),
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Native,
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Native => f.write_str("native"),
            Backend::Fallback => f.write_str("fallback"),
        }
    }
}

pub trait FrameDecoder {
    fn start(&mut self) -> Result<(), CameraError>;

    fn poll(&mut self) -> FrameResult;

    // idempotent
    fn stop(&mut self);
}

pub struct NativeDecoder<K, D> {
    camera: K,
    detector: D,
    configured: bool,
}

impl<K: Camera, D: BarcodeDetector> NativeDecoder<K, D> {
    pub fn new(camera: K, detector: D) -> Self {
        Self {
            camera,
            detector,
            configured: false,
        }
    }
}

impl<K: Camera, D: BarcodeDetector> FrameDecoder for NativeDecoder<K, D> {
    fn start(&mut self) -> Result<(), CameraError> {
        if !self.configured {
            let formats = match self.detector.supported_formats() {
                Ok(reported) => detector_formats(&reported),
                Err(err) => {
                    tracing::debug!(error = %err, "detector formats unavailable");
                    detector_formats(&[])
                }
            };
            self.detector.configure(&formats);
            self.configured = true;
        }
        self.camera.acquire()
    }

    fn poll(&mut self) -> FrameResult {
        let Some(frame) = self.camera.next_frame() else {
            return FrameResult::Nothing;
        };
        match self.detector.detect(&frame) {
            Ok(codes) => match codes.first().map(|c| c.raw_value.trim()) {
                Some(raw) if !raw.is_empty() => FrameResult::Decoded(raw.to_string()),
                _ => FrameResult::Nothing,
            },
            Err(err) => FrameResult::Fault(err),
        }
    }

    fn stop(&mut self) {
        self.camera.release();
    }
}

// Loaded on the first session start and kept for later sessions.
pub struct FallbackDecoder<L: ReaderLoader> {
    loader: L,
    reader: Option<L::Reader>,
    events: Option<Receiver<ReaderEvent>>,
}

impl<L: ReaderLoader> FallbackDecoder<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            reader: None,
            events: None,
        }
    }
}

impl<L: ReaderLoader> FrameDecoder for FallbackDecoder<L> {
    fn start(&mut self) -> Result<(), CameraError> {
        if self.reader.is_none() {
            tracing::info!("loading fallback barcode reader");
            self.reader = Some(self.loader.load()?);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Err(CameraError::BackendUnavailable);
        };
        let (tx, rx) = mpsc::channel();
        reader.start(tx)?;
        self.events = Some(rx);
        Ok(())
    }

    fn poll(&mut self) -> FrameResult {
        let Some(events) = &self.events else {
            return FrameResult::Nothing;
        };
        match events.try_recv() {
            Ok(ReaderEvent::Decoded(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    FrameResult::Nothing
                } else {
                    FrameResult::Decoded(text.to_string())
                }
            }
            Ok(ReaderEvent::NotFound) | Err(TryRecvError::Empty) => FrameResult::Nothing,
            Ok(ReaderEvent::Error(err)) => FrameResult::Fault(err),
            Err(TryRecvError::Disconnected) => FrameResult::Ended,
        }
    }

    fn stop(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            reader.stop();
        }
        self.events = None;
    }
}

pub struct DecoderBackends {
    native: Option<Box<dyn FrameDecoder>>,
    fallback: Box<dyn FrameDecoder>,
}

impl DecoderBackends {
    pub fn new(native: Option<Box<dyn FrameDecoder>>, fallback: Box<dyn FrameDecoder>) -> Self {
        Self { native, fallback }
    }

    pub fn select(&self) -> Backend {
        if self.native.is_some() {
            Backend::Native
        } else {
            Backend::Fallback
        }
    }

    fn get(&mut self, backend: Backend) -> &mut dyn FrameDecoder {
        match (backend, self.native.as_deref_mut()) {
            (Backend::Native, Some(native)) => native,
            _ => self.fallback.as_mut(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraCapture {
    pub target: ScanTarget,
    pub code: CleanedCode,
    pub result: Option<LookupResult>,
}

#[derive(Debug, Clone, Copy)]
struct CameraSession {
    target: ScanTarget,
    backend: Backend,
}

/// Owns the camera. At most one session is open; opening another closes
/// the current one first.
pub struct CameraScanner {
    backends: DecoderBackends,
    session: Option<CameraSession>,
    status: String,
}

impl CameraScanner {
    pub fn new(backends: DecoderBackends) -> Self {
        Self {
            backends,
            session: None,
            status: STATUS_IDLE.to_string(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn target(&self) -> Option<ScanTarget> {
        self.session.map(|s| s.target)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn open(&mut self, target: ScanTarget) -> Result<Backend, CameraError> {
        self.close();
        self.status = STATUS_INITIALISING.to_string();
        let backend = self.backends.select();
        let decoder = self.backends.get(backend);
        if let Err(err) = decoder.start() {
            decoder.stop();
            tracing::warn!(%backend, error = %err, "camera session failed to start");
            self.status = format!("Impossible d'activer la caméra : {}", err);
            return Err(err);
        }
        tracing::info!(%backend, context = %target.context, "camera session opened");
        self.session = Some(CameraSession { target, backend });
        self.status = STATUS_READY.to_string();
        Ok(backend)
    }

    /// Handles the next decode result for `field`, which must be the field
    /// the session targets. Noise and transient faults keep the session
    /// open; the first valid code closes it, then is either written into
    /// the field or routed through it.
    pub fn process<C: Catalog>(
        &mut self,
        field: &mut ScanField,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<Option<CameraCapture>, CatalogError> {
        let Some(session) = self.session else {
            return Ok(None);
        };
        if field.context() != session.target.context {
            tracing::warn!(
                field = %field.context(),
                target = %session.target.context,
                "camera capture offered to the wrong field"
            );
            return Ok(None);
        }
        let raw = match self.backends.get(session.backend).poll() {
            FrameResult::Decoded(raw) => raw,
            FrameResult::Nothing => return Ok(None),
            FrameResult::Fault(err) => {
                tracing::warn!(backend = %session.backend, error = %err, "frame decode failed");
                return Ok(None);
            }
            FrameResult::Ended => {
                tracing::warn!(backend = %session.backend, "decoder stopped mid-session");
                self.close();
                self.status = STATUS_STOPPED.to_string();
                return Ok(None);
            }
        };
        let Some(code) = router.cleaner().clean(&raw, session.target.context) else {
            tracing::warn!(raw = %raw, context = %session.target.context, "invalid camera scan ignored");
            return Ok(None);
        };
        tracing::debug!(raw = %raw, cleaned = %code, "camera scan decoded");
        self.close();

        let result = if session.target.dispatch {
            Some(field.route(code.clone(), router, actions)?)
        } else {
            field.fill(&code);
            None
        };
        Ok(Some(CameraCapture {
            target: session.target,
            code,
            result,
        }))
    }

    pub fn close(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        self.backends.get(session.backend).stop();
        self.status = STATUS_IDLE.to_string();
        tracing::info!(backend = %session.backend, "camera session closed");
        true
    }

    // Escape or the close button
    pub fn cancel(&mut self) {
        if self.close() {
            tracing::debug!("camera session cancelled");
        }
    }
}

impl Drop for CameraScanner {
    fn drop(&mut self) {
        self.close();
    }
}
