use notos::config::RunConfig;
use notos::pipeline::Pipeline;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "./data/config/argentina_floods.json".to_string());

    let config = RunConfig::from_file(&config_path)?;
    println!(
        "Searching {} granules over {} .. {}",
        config.product(),
        config.start_date(),
        config.end_date()
    );

    let pipeline = Pipeline::new(config)?;
    let report = pipeline.run()?;

    println!("{report}");

    Ok(())
}
