//! Weather Checker Skill
//!
//! Resolves a city name to coordinates, then reads the current conditions.
//! The default source is Open-Meteo, which needs no API key.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use skills_core::{Arguments, EntryPoint};

use crate::error::{Result, SkillPackError};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// A geocoded location
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions at a location
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub weathercode: u32,
}

/// Source of geocoding and current weather
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn geocode(&self, location: &str) -> Result<Option<Place>>;

    async fn current(&self, place: &Place) -> Result<Option<CurrentWeather>>;
}

/// Open-Meteo client
pub struct OpenMeteoClient {
    http: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            geocoding_url: GEOCODING_URL.into(),
            forecast_url: FORECAST_URL.into(),
        }
    }

    /// Point both endpoints at another host (mirrors, local stubs)
    pub fn with_base_urls(mut self, geocoding_url: impl Into<String>, forecast_url: impl Into<String>) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn geocode(&self, location: &str) -> Result<Option<Place>> {
        let response: GeocodingResponse = self
            .http
            .get(&self.geocoding_url)
            .query(&[("name", location), ("count", "1"), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.and_then(|r| r.into_iter().next()))
    }

    async fn current(&self, place: &Place) -> Result<Option<CurrentWeather>> {
        let response: ForecastResponse = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.current_weather)
    }
}

/// Human-readable label for a WMO weather code
pub fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        61 => "Slight rain",
        71 => "Slight snow",
        95 => "Thunderstorm",
        _ => "Unknown",
    }
}

/// First letter upper case, the rest lower case
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Entry point for the `weather_checker` skill package
pub struct WeatherChecker<S = OpenMeteoClient> {
    source: S,
}

impl WeatherChecker {
    pub fn new() -> Self {
        Self::with_source(OpenMeteoClient::new())
    }
}

impl Default for WeatherChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WeatherSource> WeatherChecker<S> {
    pub const fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Current weather for a city
    pub async fn check(&self, location: &str) -> Result<Value> {
        let place = self
            .source
            .geocode(location)
            .await?
            .ok_or_else(|| SkillPackError::CityNotFound(location.to_string()))?;

        let weather = self
            .source
            .current(&place)
            .await?
            .ok_or(SkillPackError::WeatherUnavailable)?;

        tracing::debug!(location, code = weather.weathercode, "Weather lookup complete");

        Ok(json!({
            "city": capitalize(location),
            "temperature": format_temperature(weather.temperature),
            "condition": describe_weather_code(weather.weathercode),
        }))
    }
}

/// Celsius reading the way Open-Meteo reports it, `12.0°C` not `12°C`
fn format_temperature(celsius: f64) -> String {
    if celsius.fract() == 0.0 {
        format!("{celsius:.1}°C")
    } else {
        format!("{celsius}°C")
    }
}

#[async_trait]
impl<S: WeatherSource + 'static> EntryPoint for WeatherChecker<S> {
    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        let location = crate::str_arg(&args, "location")?;
        Ok(self.check(location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticWeather {
        known: &'static str,
        weather: Option<CurrentWeather>,
    }

    #[async_trait]
    impl WeatherSource for StaticWeather {
        async fn geocode(&self, location: &str) -> Result<Option<Place>> {
            Ok(location.eq_ignore_ascii_case(self.known).then_some(Place {
                latitude: 59.91,
                longitude: 10.75,
            }))
        }

        async fn current(&self, _place: &Place) -> Result<Option<CurrentWeather>> {
            Ok(self.weather.clone())
        }
    }

    fn checker(weather: Option<CurrentWeather>) -> WeatherChecker<StaticWeather> {
        WeatherChecker::with_source(StaticWeather { known: "oslo", weather })
    }

    #[test]
    fn test_weather_codes() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(48), "Depositing rime fog");
        assert_eq!(describe_weather_code(95), "Thunderstorm");
        assert_eq!(describe_weather_code(2), "Partly cloudy");
        assert_eq!(describe_weather_code(80), "Unknown");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("oSLO"), "Oslo");
        assert_eq!(capitalize("new york"), "New york");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn test_check() {
        let result = checker(Some(CurrentWeather {
            temperature: 12.5,
            weathercode: 3,
        }))
        .check("oslo")
        .await
        .unwrap();

        assert_eq!(
            result,
            json!({"city": "Oslo", "temperature": "12.5°C", "condition": "Overcast"})
        );
    }

    #[test]
    fn test_whole_degrees_keep_one_decimal() {
        assert_eq!(format_temperature(12.0), "12.0°C");
        assert_eq!(format_temperature(0.0), "0.0°C");
        assert_eq!(format_temperature(12.5), "12.5°C");
        assert_eq!(format_temperature(-0.4), "-0.4°C");
    }

    #[tokio::test]
    async fn test_unknown_city() {
        let err = checker(None).check("Atlantis").await.unwrap_err();
        assert_eq!(err.to_string(), "City 'Atlantis' not found.");
    }

    #[tokio::test]
    async fn test_missing_weather() {
        let err = checker(None).check("Oslo").await.unwrap_err();
        assert!(matches!(err, SkillPackError::WeatherUnavailable));
    }

    #[tokio::test]
    async fn test_entry_point_arguments() {
        let checker = checker(Some(CurrentWeather {
            temperature: -3.0,
            weathercode: 71,
        }));

        let mut args = Arguments::new();
        args.insert("location".into(), json!("Oslo"));
        let value = checker.call(args).await.unwrap();
        assert_eq!(value["temperature"], "-3.0°C");
        assert_eq!(value["condition"], "Slight snow");

        let err = checker.call(Arguments::new()).await.unwrap_err();
        assert!(err.to_string().contains("location"));
    }
}
