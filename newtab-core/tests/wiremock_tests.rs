//! Forecast client, IP geolocation and end-to-end pipeline runs against mock servers.

use std::sync::Arc;

use newtab_core::{
    Catalog, Coordinates, GeoOptions, Geolocator, LocationError, LocationResolver,
    OpenMeteoClient, PipelineOutcome, PrefKey, PreferenceStore, Units, WeatherClient,
    WeatherError, WeatherPipeline,
    location::IpGeolocator,
    prefs::{LocalStore, PrefMap},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

fn current_weather_body(temperature: f64, code: i32, wind: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "elevation": 38.0,
        "current_weather": {
            "time": "2024-01-15T12:00",
            "temperature": temperature,
            "windspeed": wind,
            "winddirection": 225,
            "weathercode": code,
            "is_day": 1
        }
    })
}

fn forecast_url(server: &MockServer) -> String {
    format!("{}/v1/forecast", server.uri())
}

async fn enabled_store(api_base: &str, units: Units) -> Arc<PreferenceStore> {
    let store = PreferenceStore::new(Box::new(LocalStore::in_memory()));
    let mut values = PrefMap::new();
    values.insert(PrefKey::WeatherEnabled, true.into());
    values.insert(PrefKey::WeatherLatitude, 52.52.into());
    values.insert(PrefKey::WeatherLongitude, 13.41.into());
    values.insert(PrefKey::WeatherUnits, units.as_str().into());
    values.insert(PrefKey::WeatherApiBase, api_base.into());
    store.set(&values).await.expect("seed preferences");
    Arc::new(store)
}

fn pipeline(prefs: Arc<PreferenceStore>) -> WeatherPipeline {
    WeatherPipeline::new(
        prefs,
        LocationResolver::stored_only(),
        Arc::new(OpenMeteoClient::new()),
        Arc::new(Catalog::default()),
    )
}

// ============================================================================
// Client
// ============================================================================

#[tokio::test]
async fn request_carries_expected_query_and_no_cache_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "52.52"))
        .and(query_param("longitude", "13.41"))
        .and(query_param("current_weather", "true"))
        .and(query_param("temperature_unit", "fahrenheit"))
        .and(query_param("windspeed_unit", "kmh"))
        .and(header("cache-control", "no-store"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body(71.2, 1, 12.0)))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenMeteoClient::new();
    let result = client
        .fetch_current(
            Coordinates::new(52.52, 13.41),
            Units::Fahrenheit,
            Some(&forecast_url(&server)),
        )
        .await;

    let conditions = result.expect("request should succeed");
    assert_eq!(conditions.weather_code, 1);
    assert_eq!(conditions.units, Units::Fahrenheit);
    assert!((conditions.temperature - 71.2).abs() < 1e-9);
}

#[tokio::test]
async fn non_success_status_is_reported_with_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": true,
            "reason": "Latitude must be in range of -90 to 90°."
        })))
        .mount(&server)
        .await;

    let err = OpenMeteoClient::new()
        .fetch_current(
            Coordinates::new(123.0, 13.41),
            Units::Celsius,
            Some(&forecast_url(&server)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Status(400)), "got: {err:?}");
}

#[tokio::test]
async fn missing_current_weather_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 52.52,
            "longitude": 13.41
        })))
        .mount(&server)
        .await;

    let err = OpenMeteoClient::new()
        .fetch_current(Coordinates::new(52.52, 13.41), Units::Celsius, Some(&forecast_url(&server)))
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Parse(_)), "got: {err:?}");
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let err = OpenMeteoClient::new()
        .fetch_current(
            Coordinates::new(52.52, 13.41),
            Units::Celsius,
            Some("http://127.0.0.1:9/v1/forecast"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Transport(_)), "got: {err:?}");
    assert!(err.is_network());
}

// ============================================================================
// IP geolocation
// ============================================================================

async fn ip_lookup(server: &MockServer) -> Result<Coordinates, LocationError> {
    IpGeolocator::new(format!("{}/json", server.uri()))
        .current_position(&GeoOptions::default())
        .await
}

#[tokio::test]
async fn ip_lookup_reads_lat_lon() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "city": "Berlin",
            "lat": 52.52,
            "lon": 13.405
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coords = ip_lookup(&server).await.expect("lookup should succeed");
    assert_eq!(coords, Coordinates::new(52.52, 13.405));
}

#[tokio::test]
async fn ip_lookup_accepts_long_field_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": -33.87,
            "longitude": 151.21
        })))
        .mount(&server)
        .await;

    let coords = ip_lookup(&server).await.expect("lookup should succeed");
    assert_eq!(coords, Coordinates::new(-33.87, 151.21));
}

#[tokio::test]
async fn ip_lookup_error_status_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = ip_lookup(&server).await.unwrap_err();
    assert!(matches!(err, LocationError::Unavailable), "got: {err:?}");
}

#[tokio::test]
async fn ip_lookup_without_coordinates_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "reserved range",
            "lat": 10.0
        })))
        .mount(&server)
        .await;

    let err = ip_lookup(&server).await.unwrap_err();
    assert!(matches!(err, LocationError::Unavailable), "got: {err:?}");
}

#[tokio::test]
async fn ip_fix_wins_over_stored_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 40.4,
            "lon": -3.7
        })))
        .mount(&server)
        .await;

    let geo: Arc<dyn Geolocator> =
        Arc::new(IpGeolocator::new(format!("{}/json", server.uri())));
    let resolver = LocationResolver::new(Some(geo), GeoOptions::default());

    assert_eq!(
        resolver.resolve(Some(52.52), Some(13.41)).await,
        Some(Coordinates::new(40.4, -3.7))
    );
}

// ============================================================================
// Pipeline end to end
// ============================================================================

#[tokio::test]
async fn happy_path_renders_partly_cloudy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body(22.4, 2, 5.0)))
        .mount(&server)
        .await;

    let outcome = pipeline(enabled_store(&forecast_url(&server), Units::Celsius).await)
        .run()
        .await;

    assert_eq!(
        outcome,
        PipelineOutcome::Ready {
            icon: "⛅",
            temperature_text: "22°C".into(),
            message: "Partly cloudy ⛅. Sun may pop out later.".into(),
        }
    );
    assert_eq!(
        outcome.render(&Catalog::default()),
        "⛅ 22°C — Partly cloudy ⛅. Sun may pop out later."
    );
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let outcome = pipeline(enabled_store(&forecast_url(&server), Units::Celsius).await)
        .run()
        .await;

    assert_eq!(outcome, PipelineOutcome::Unavailable);
}

#[tokio::test]
async fn body_without_current_weather_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let outcome = pipeline(enabled_store(&forecast_url(&server), Units::Celsius).await)
        .run()
        .await;

    assert_eq!(outcome, PipelineOutcome::Unavailable);
}

#[tokio::test]
async fn disabled_never_hits_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body(1.0, 0, 1.0)))
        .expect(0)
        .mount(&server)
        .await;

    let prefs = enabled_store(&forecast_url(&server), Units::Celsius).await;
    let mut off = PrefMap::new();
    off.insert(PrefKey::WeatherEnabled, false.into());
    prefs.set(&off).await.expect("disable");

    assert_eq!(pipeline(prefs).run().await, PipelineOutcome::Disabled);
}
