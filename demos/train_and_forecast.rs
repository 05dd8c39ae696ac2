use meteocast::{EngineConfig, Meteocast};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engine = Meteocast::open(EngineConfig::default()).await?;
    for (location, outcome) in engine.refresh_all().await {
        if let Err(e) = outcome {
            eprintln!("{location}: {e}");
        }
    }

    let summary = engine.train_all().await;
    for (location, error) in &summary.failed {
        eprintln!("{location} not trained: {error}");
    }
    engine.persist().await?;

    let offset = engine.config().utc_offset().unwrap_or(chrono::FixedOffset::east_opt(0).unwrap());
    for location in &summary.trained {
        let forecast = engine.forecast().location(location.clone()).call().await?;
        println!("== {location}");
        for day in forecast.daily_summaries(offset) {
            println!(
                "{}  {:>5.1} / {:>5.1} °C  {:>4.1} mm  {}",
                day.date, day.temperature_min, day.temperature_max, day.total_precipitation, day.symbol
            );
        }
    }

    for record in engine.evaluation_log().records() {
        println!(
            "{} {:<18} points={:<5} mae={:?} accuracy={:?}",
            record.date, record.location, record.data_points, record.mae, record.accuracy
        );
    }
    Ok(())
}
