use std::time::{Duration, Instant};

use crate::barcode::CleanedCode;
use crate::catalog::Catalog;
use crate::config::ScanConfig;
use crate::error::CatalogError;
use crate::layout::preview_digits;
use crate::router::{ScanActions, ScanRouter};
use crate::timers::{Debounce, DetectorState};
use crate::types::{CharPolicy, LookupResult, ScanContext};

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Nothing usable was captured; the field is left as is.
    Rejected { raw: String },
    /// The code was routed and the field cleared for the next scan.
    Routed {
        code: CleanedCode,
        result: LookupResult,
    },
}

#[derive(Debug, Clone)]
pub struct ScanField {
    context: ScanContext,
    // keystrokes as typed; this is what gets cleaned and routed
    raw: String,
    // what the field shows, the preview when enabled
    value: String,
    debounce: Debounce,
    preview: bool,
    last_scan: Option<CleanedCode>,
}

impl ScanField {
    pub fn new(context: ScanContext, quiet: Duration) -> Self {
        Self {
            context,
            raw: String::new(),
            value: String::new(),
            debounce: Debounce::new(quiet),
            preview: false,
            last_scan: None,
        }
    }

    pub fn from_config(context: ScanContext, config: &ScanConfig) -> Self {
        let quiet = config.quiet_period(config.profile_for(context));
        Self::new(context, quiet).with_preview(config.pickup_preview)
    }

    /// Rewrite corrupted digits on every keystroke. Only digits-only fields
    /// honour it.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview && self.context.policy() == CharPolicy::DigitsOnly;
        self
    }

    pub fn context(&self) -> ScanContext {
        self.context
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn state(&self) -> DetectorState {
        self.debounce.state()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn last_scan(&self) -> Option<&CleanedCode> {
        self.last_scan.as_ref()
    }

    /// Records the field's new content after a keystroke and restarts the
    /// quiet period. Returns the cursor position to apply, which only moves
    /// when the preview rewrote the value.
    ///
    /// `text` is what the widget holds, so once a preview was written back
    /// it starts with [`value`](Self::value). Only the typed suffix is then
    /// appended to the raw capture. Any other edit replaces it.
    pub fn input(&mut self, text: &str, cursor: usize, now: Instant) -> usize {
        match text.strip_prefix(self.value.as_str()) {
            Some(typed) => self.raw.push_str(typed),
            None => self.raw = text.to_string(),
        }
        let cursor = if self.preview {
            let (shown, cursor) = preview_digits(&self.raw, cursor);
            if shown != self.raw {
                tracing::debug!(raw = %self.raw, preview = %shown, "pickup keystroke previewed");
            }
            self.value = shown;
            cursor
        } else {
            self.value = self.raw.clone();
            cursor
        };
        self.debounce.keystroke(now);
        cursor
    }

    pub fn poll<C: Catalog>(
        &mut self,
        now: Instant,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<Option<ScanOutcome>, CatalogError> {
        if !self.debounce.fire_if_due(now) {
            return Ok(None);
        }
        self.commit(router, actions).map(Some)
    }

    // Enter key
    pub fn submit<C: Catalog>(
        &mut self,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<ScanOutcome, CatalogError> {
        self.debounce.cancel();
        self.commit(router, actions)
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.value.clear();
        self.debounce.cancel();
    }

    /// Runs the last routed code again.
    pub fn rescan<C: Catalog>(
        &self,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<Option<LookupResult>, CatalogError> {
        match &self.last_scan {
            Some(code) => router.dispatch(code, actions).map(Some),
            None => Ok(None),
        }
    }

    /// Puts a camera capture into the field without dispatching it.
    pub fn fill(&mut self, code: &CleanedCode) {
        self.debounce.cancel();
        self.raw = code.as_str().to_string();
        self.value = self.raw.clone();
    }

    /// Routes a code captured elsewhere (the camera) as if it had been
    /// typed into this field.
    pub fn route<C: Catalog>(
        &mut self,
        code: CleanedCode,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<LookupResult, CatalogError> {
        self.debounce.cancel();
        let result = router.dispatch(&code, actions)?;
        self.raw.clear();
        self.value.clear();
        if result.is_found() {
            self.last_scan = Some(code);
        }
        Ok(result)
    }

    fn commit<C: Catalog>(
        &mut self,
        router: &ScanRouter<C>,
        actions: &mut dyn ScanActions,
    ) -> Result<ScanOutcome, CatalogError> {
        let raw = self.raw.clone();
        tracing::debug!(context = %self.context, raw = %raw, len = raw.chars().count(), "scan complete");
        let Some(code) = router.cleaner().clean(&raw, self.context) else {
            tracing::warn!(context = %self.context, raw = %raw, "invalid scan ignored");
            return Ok(ScanOutcome::Rejected { raw });
        };
        let result = self.route(code.clone(), router, actions)?;
        Ok(ScanOutcome::Routed { code, result })
    }
}
