use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{manager::WatchManager, registry::Registry};
use crate::{
    core::Config,
    events::Bus,
    select::{FileSelector, FileSelectorRef, NoSelector},
    sinks::{Sink, SinkSet},
    tail::{PollingTails, TailSourceRef},
};

/// Builder for constructing a [`WatchManager`].
pub struct WatchManagerBuilder {
    cfg: Config,
    sinks: Vec<Arc<dyn Sink>>,
    selector: Option<FileSelectorRef>,
    tails: Option<TailSourceRef>,
}

impl WatchManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sinks: Vec::new(),
            selector: None,
            tails: None,
        }
    }

    /// Sets event sinks, replacing any added before.
    ///
    /// Sinks receive every runtime event through dedicated workers with bounded queues.
    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn Sink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Adds one event sink.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Sets the collaborator used by [`WatchManager::select_and_watch`].
    ///
    /// Without one, every selection fails with `SelectError::Other`.
    pub fn with_selector(mut self, selector: impl FileSelector) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Replaces the tail primitive (default: [`PollingTails`] built from the config).
    pub fn with_tail_source(mut self, tails: TailSourceRef) -> Self {
        self.tails = Some(tails);
        self
    }

    /// Builds the manager and starts its sink workers.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Arc<WatchManager> {
        let (bus, events) = Bus::paced(self.cfg.bus_capacity_clamped());
        let sinks = SinkSet::new(self.sinks, bus.clone());
        let runtime_token = CancellationToken::new();

        let tails = self
            .tails
            .unwrap_or_else(|| Arc::new(PollingTails::new(&self.cfg)));
        let selector = self.selector.unwrap_or_else(|| Arc::new(NoSelector));
        let registry = Registry::new(bus.clone(), runtime_token.clone(), tails);

        Arc::new(WatchManager::new_internal(
            self.cfg,
            bus,
            registry,
            selector,
            runtime_token,
            events,
            sinks,
        ))
    }
}
