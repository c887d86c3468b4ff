//! Current-weather lookup backed by the OpenWeatherMap API.

use crate::Tool;
use crate::builtins::utils::{parse_args, request_failed, response_body};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use toolrelay_config::{ConfigError, WeatherToolConfig};
use toolrelay_protocol::ToolError;

/// Resolved settings for [`WeatherTool`].
#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub base_url: String,
    pub api_key: String,
}

impl WeatherSettings {
    /// Resolve settings from config, reading the API key from the environment.
    pub fn from_config(config: &WeatherToolConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config.resolve_api_key()?,
        })
    }
}

/// `get_weather`: current conditions at a coordinate.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: Client,
    settings: WeatherSettings,
}

impl WeatherTool {
    pub fn new(client: Client, settings: WeatherSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Fetch current weather data for a location given its latitude and longitude"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number", "description": "Latitude of the location." },
                "longitude": { "type": "number", "description": "Longitude of the location." },
            },
            "required": ["latitude", "longitude"],
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let input: WeatherArgs = parse_args(args)?;
        info!(
            "weather lookup (lat={}, lon={})",
            input.latitude, input.longitude
        );
        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&[
                ("lat", input.latitude.to_string()),
                ("lon", input.longitude.to_string()),
                ("appid", self.settings.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|err| request_failed("weather", err))?;

        let status = response.status();
        let body = response_body(response).await;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(ToolError::ExecutionFailed(format!(
                "weather API returned {status}: {message}"
            )));
        }

        let report: WeatherReport = serde_json::from_value(body).map_err(|err| {
            ToolError::ExecutionFailed(format!("unexpected weather response: {err}"))
        })?;
        Ok(json!({
            "latitude": report.coord.lat,
            "longitude": report.coord.lon,
            "weather_condition": report
                .weather
                .first()
                .map(|condition| condition.description.as_str())
                .unwrap_or_default(),
            "temperature": report.main.temp,
            "city": report.name,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherReport {
    coord: Coord,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Main,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
}
