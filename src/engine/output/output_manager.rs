use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::clock::{Clock, PlaybackState};
use crate::engine::error::{EngineError, Result};
use crate::engine::output::cpal_backend::CpalBackend;
use crate::engine::output::{AudioOutput, RenderContext};

/// Owns the current output stream and rebuilds it when the device fails or
/// the system default changes. The render context (sample queue, spectrum
/// taps, parameters) moves between successive streams.
pub struct OutputManager {
    backend: Option<CpalBackend>,
    context: Option<RenderContext>,
    clock: Arc<Clock>,
}

impl OutputManager {
    pub fn new(context: RenderContext, clock: Arc<Clock>) -> Self {
        let mut manager = Self {
            backend: None,
            context: Some(context),
            clock,
        };
        if let Err(err) = manager.try_reconnect() {
            warn!(%err, "no audio output yet, will retry");
        }
        manager
    }

    pub fn try_reconnect(&mut self) -> Result<()> {
        let Some(context) = self.context.take() else {
            return Err(EngineError::NoBackend);
        };
        match CpalBackend::new(context, self.clock.clone()) {
            Ok(backend) => {
                self.backend = Some(backend);
                Ok(())
            }
            Err((context, err)) => {
                self.context = Some(context);
                Err(err)
            }
        }
    }

    pub fn check_connection(&mut self) {
        let needs_reconnect = match &self.backend {
            Some(backend) => !backend.is_healthy(),
            None => true,
        };
        if !needs_reconnect {
            return;
        }

        let previous_state = self.clock.get_state();
        if let Some(mut backend) = self.backend.take() {
            info!("output device changed, rebuilding stream");
            if let Some(context) = backend.shutdown() {
                self.context = Some(context);
            }
        }

        match self.try_reconnect() {
            Ok(()) if previous_state == PlaybackState::Playing => {
                if let Err(err) = self.start() {
                    warn!(%err, "failed to resume after reconnect");
                }
            }
            Ok(()) => {}
            Err(err) => warn!(%err, "reconnect failed"),
        }
    }
}

impl AudioOutput for OutputManager {
    fn start(&mut self) -> Result<()> {
        if self.backend.is_none() {
            self.try_reconnect()?;
        }
        match &mut self.backend {
            Some(backend) => backend.start(),
            None => Err(EngineError::NoBackend),
        }
    }

    fn pause(&mut self) -> Result<()> {
        match &mut self.backend {
            Some(backend) => backend.pause(),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<()> {
        match &mut self.backend {
            Some(backend) => backend.stop(),
            None => Ok(()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.backend.as_ref().is_some_and(|backend| backend.is_healthy())
    }

    fn shutdown(&mut self) -> Option<RenderContext> {
        match self.backend.take() {
            Some(mut backend) => backend.shutdown().or_else(|| self.context.take()),
            None => self.context.take(),
        }
    }

    fn tick(&mut self) {
        self.check_connection();
    }
}
