use meteocast::{EngineConfig, LatLon, Meteocast};
use std::env;

/// Usage: `cargo run --example nearest_location -- 16.4637 107.5909`
///
/// Needs models saved by the `train_and_forecast` example.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<f64> = env::args().skip(1).map(|a| a.parse()).collect::<Result<_, _>>()?;
    let point = match args.as_slice() {
        [lat, lon] => LatLon(*lat, *lon),
        _ => LatLon(16.4637, 107.5909),
    };

    let engine = Meteocast::open(EngineConfig::default()).await?;
    println!("Trained locations: {:?}", engine.available_locations());

    let forecast = engine.forecast().location(point).horizon_hours(12).call().await?;
    println!(
        "Nearest model to {:?}: {} ({:.1} km away)",
        point,
        forecast.location,
        forecast.distance_km.unwrap_or_default()
    );
    for hour in &forecast.hours {
        println!(
            "{}  {:>5.1} °C  {:<7} {}",
            hour.timestamp, hour.temperature, hour.condition, hour.symbol
        );
    }
    Ok(())
}
