//! Orchestration: settings → location → fetch → present.
//!
//! Every stage failure is converted into a [`PipelineOutcome`]; nothing
//! escapes a run. [`StatusLine`] sits on top and makes sure a run that was
//! superseded by a newer trigger never overwrites the newer result.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    client::WeatherClient,
    i18n::Translate,
    location::LocationResolver,
    model::PipelineOutcome,
    prefs::PreferenceStore,
    present,
};

#[derive(Debug, Clone)]
pub struct WeatherPipeline {
    prefs: Arc<PreferenceStore>,
    resolver: LocationResolver,
    client: Arc<dyn WeatherClient>,
    translator: Arc<dyn Translate>,
}

impl WeatherPipeline {
    pub fn new(
        prefs: Arc<PreferenceStore>,
        resolver: LocationResolver,
        client: Arc<dyn WeatherClient>,
        translator: Arc<dyn Translate>,
    ) -> Self {
        Self {
            prefs,
            resolver,
            client,
            translator,
        }
    }

    pub async fn run(&self) -> PipelineOutcome {
        self.run_with(|_| {}).await
    }

    /// Run once, calling `progress` with [`PipelineOutcome::Fetching`] right
    /// before the network call. The callback must not block.
    pub async fn run_with<F>(&self, mut progress: F) -> PipelineOutcome
    where
        F: FnMut(&PipelineOutcome) + Send,
    {
        let settings = self.prefs.weather_settings().await;
        if !settings.enabled {
            debug!("Weather disabled");
            return PipelineOutcome::Disabled;
        }

        let Some(coords) = self
            .resolver
            .resolve(settings.latitude, settings.longitude)
            .await
        else {
            debug!("No location available");
            return PipelineOutcome::NoLocation;
        };

        progress(&PipelineOutcome::Fetching);

        let conditions = match self
            .client
            .fetch_current(coords, settings.units, settings.api_base())
            .await
        {
            Ok(conditions) => conditions,
            Err(err) => {
                warn!(error = %err, "Weather fetch failed");
                return PipelineOutcome::Unavailable;
            }
        };

        let description = present::describe(
            conditions.weather_code,
            conditions.temperature,
            conditions.wind_speed,
            conditions.units,
            self.translator.as_ref(),
        );

        PipelineOutcome::Ready {
            icon: description.icon,
            temperature_text: present::format_temperature(
                conditions.temperature,
                conditions.units,
            ),
            message: description.message,
        }
    }
}

/// Published weather status. Each [`StatusLine::refresh`] takes a new
/// generation; only the newest generation may publish.
#[derive(Debug)]
pub struct StatusLine {
    generation: AtomicU64,
    tx: watch::Sender<Option<PipelineOutcome>>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            generation: AtomicU64::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PipelineOutcome>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<PipelineOutcome> {
        self.tx.borrow().clone()
    }

    /// Start a new run. Returns the final outcome if it was published, or
    /// `None` if a newer refresh started while this one was in flight.
    pub async fn refresh(&self, pipeline: &WeatherPipeline) -> Option<PipelineOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let outcome = pipeline
            .run_with(|hint| {
                self.publish(generation, hint);
            })
            .await;

        if self.publish(generation, &outcome) {
            Some(outcome)
        } else {
            debug!(generation, "Discarding superseded weather result");
            None
        }
    }

    fn publish(&self, generation: u64, outcome: &PipelineOutcome) -> bool {
        let mut published = false;
        self.tx.send_if_modified(|slot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *slot = Some(outcome.clone());
            published = true;
            true
        });
        published
    }
}
