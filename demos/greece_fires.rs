// Disturbance extent of the 2023 Greece wildfires around Alexandroupolis,
// from OPERA DIST-ALERT-HLS granules for August-September 2023.

use notos::config::RunConfig;
use notos::pipeline::Pipeline;

fn main() {
    let config = match RunConfig::from_file("./data/config/greece_fires.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    println!("{:#?}", config.bbox());

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Failed to set up pipeline: {}", e);
            return;
        }
    };

    match pipeline.run() {
        Ok(report) => println!("{report}"),
        Err(e) => eprintln!("Pipeline run failed: {}", e),
    }
}
