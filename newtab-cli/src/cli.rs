use anyhow::{Context, bail};
use chrono::{Local, Timelike};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Select, Text};
use std::sync::Arc;

use newtab_core::{
    Catalog, Config, Language, OpenMeteoClient, PipelineOutcome, PrefKey, PrefValue, PreferenceStore,
    SettingsUpdate, StatusLine, Units, WeatherPipeline,
    greeting::{greeting_line, profile_line},
    prefs::{PrefKind, PrefMap},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "newtab", version, about = "Greeting and weather for a new tab")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the greeting, profile and weather status (the default).
    Show,

    /// Edit all settings interactively, then refresh the weather.
    Configure,

    /// Write a single preference, e.g. `newtab set weather_units fahrenheit`.
    Set {
        /// Preference key, e.g. "weather_latitude".
        key: String,

        value: String,
    },

    /// Print stored preferences (all of them when no key is given).
    Get { keys: Vec<String> },
}

/// Everything a command needs, wired once per invocation.
struct App {
    config: Config,
    prefs: Arc<PreferenceStore>,
    translator: Arc<Catalog>,
    pipeline: WeatherPipeline,
}

impl App {
    fn bootstrap() -> anyhow::Result<Self> {
        let config = Config::load()?;
        let prefs = Arc::new(config.preference_store()?);
        let translator = Arc::new(Catalog::new(config.language()));

        tracing::debug!(
            backend = prefs.backend_name(),
            language = translator.language().as_str(),
            "Bootstrapped"
        );

        let pipeline = WeatherPipeline::new(
            prefs.clone(),
            config.location_resolver(),
            Arc::new(OpenMeteoClient::new()),
            translator.clone(),
        );

        Ok(Self {
            config,
            prefs,
            translator,
            pipeline,
        })
    }

    async fn show(&self) -> anyhow::Result<()> {
        let now = Local::now();
        let username = self.prefs.username().await;
        let profile = self.prefs.profile_name().await;

        println!("{}", greeting_line(now.hour(), &username, self.translator.as_ref()));
        println!("{}", profile_line(&profile, self.translator.as_ref()));
        println!("{}", now.format("%A, %-d %B %Y, %-I:%M %p"));

        self.show_weather().await
    }

    /// Print every status the line goes through until a final one arrives.
    async fn show_weather(&self) -> anyhow::Result<()> {
        let status = StatusLine::new();
        let mut rx = status.subscribe();
        let tr = self.translator.clone();

        let printer = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let current = rx.borrow_and_update().clone();
                let Some(outcome) = current else {
                    continue;
                };
                println!("{}", outcome.render(tr.as_ref()));
                if outcome.is_terminal() {
                    break;
                }
            }
        });

        let outcome = status.refresh(&self.pipeline).await;
        drop(status);
        printer.await.context("Status printer task failed")?;

        if matches!(outcome, Some(PipelineOutcome::Unavailable)) {
            tracing::debug!("Weather unavailable; run with -v for the cause");
        }
        Ok(())
    }

    async fn configure(&self) -> anyhow::Result<()> {
        let weather = self.prefs.weather_settings().await;
        let username = self.prefs.username().await;
        let profile = self.prefs.profile_name().await;

        let username = Text::new("Who are you?")
            .with_initial_value(&username)
            .prompt()?;
        let profile_name = Text::new("Which profile is this?")
            .with_initial_value(&profile)
            .prompt()?;
        let disable_animations = Confirm::new("Disable animations")
            .with_default(self.prefs.disable_animations().await)
            .prompt()?;
        let weather_enabled = Confirm::new("Show weather on new tab")
            .with_default(weather.enabled)
            .prompt()?;
        let latitude = prompt_coordinate("Latitude", weather.latitude)?;
        let longitude = prompt_coordinate("Longitude", weather.longitude)?;
        let units = Select::new("Temperature units", vec![Units::Celsius, Units::Fahrenheit])
            .with_starting_cursor(match weather.units {
                Units::Celsius => 0,
                Units::Fahrenheit => 1,
            })
            .prompt()?;
        let api_base = Text::new("Open-Meteo API base (optional)")
            .with_initial_value(&weather.api_base)
            .prompt()?;
        let language = Select::new("Page language", Language::all().to_vec())
            .with_starting_cursor(match self.translator.language() {
                Language::English => 0,
                Language::Spanish => 1,
            })
            .prompt()?;

        let update = SettingsUpdate {
            username,
            profile_name,
            disable_animations,
            weather_enabled,
            latitude,
            longitude,
            units,
            api_base,
        };
        self.prefs
            .save(&update)
            .await
            .context("Failed to save settings")?;

        if language != self.translator.language() {
            let config = Config {
                language: Some(language.as_str().to_string()),
                ..self.config.clone()
            };
            config.save()?;
        }

        // Re-wire so the new language takes effect immediately.
        App::bootstrap()?.show().await
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let key = PrefKey::try_from(key)?;
        let value = parse_value(key, value)?;

        let mut values = PrefMap::new();
        values.insert(key, value);
        self.prefs
            .set(&values)
            .await
            .with_context(|| format!("Failed to write '{key}'"))?;

        println!("{key} updated ({})", self.prefs.backend_name());
        Ok(())
    }

    async fn get(&self, keys: &[String]) -> anyhow::Result<()> {
        let keys = if keys.is_empty() {
            PrefKey::all().to_vec()
        } else {
            keys.iter()
                .map(|k| PrefKey::try_from(k.as_str()))
                .collect::<Result<Vec<_>, _>>()?
        };

        for key in keys {
            match self.prefs.read(key).await {
                Some(value) => println!("{key} = {}", value.encode()),
                None => println!("{key} is not set"),
            }
        }
        Ok(())
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let app = App::bootstrap()?;

        match self.command.unwrap_or(Command::Show) {
            Command::Show => app.show().await,
            Command::Configure => app.configure().await,
            Command::Set { key, value } => app.set(&key, &value).await,
            Command::Get { keys } => app.get(&keys).await,
        }
    }
}

fn prompt_coordinate(label: &str, current: Option<f64>) -> anyhow::Result<Option<f64>> {
    let initial = current.map(|v| v.to_string()).unwrap_or_default();
    let input = Text::new(label)
        .with_initial_value(&initial)
        .with_help_message("Leave empty to keep the stored value")
        .prompt()?;
    parse_coordinate(&input)
}

/// Empty input means "not provided".
fn parse_coordinate(input: &str) -> anyhow::Result<Option<f64>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let value: f64 = input
        .parse()
        .with_context(|| format!("'{input}' is not a number"))?;
    if !value.is_finite() {
        bail!("'{input}' is not a finite number");
    }
    Ok(Some(value))
}

fn parse_value(key: PrefKey, raw: &str) -> anyhow::Result<PrefValue> {
    match key.kind() {
        PrefKind::Flag => match raw {
            "true" => Ok(PrefValue::Bool(true)),
            "false" => Ok(PrefValue::Bool(false)),
            _ => bail!("'{key}' expects true or false, got '{raw}'"),
        },
        PrefKind::Number => parse_coordinate(raw)?
            .map(PrefValue::Number)
            .with_context(|| format!("'{key}' expects a number")),
        PrefKind::Text if key == PrefKey::WeatherUnits => match raw {
            "celsius" | "fahrenheit" => Ok(PrefValue::Text(raw.to_string())),
            _ => bail!("'{key}' expects celsius or fahrenheit, got '{raw}'"),
        },
        PrefKind::Text => Ok(PrefValue::Text(raw.trim().to_string())),
    }
}
