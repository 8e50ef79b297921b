// Surface-water extent of the March 2024 Buenos Aires floods from OPERA
// DSWx-HLS granules, mosaicked for three days spanning the event.

use notos::config::RunConfig;
use notos::pipeline::Pipeline;

fn main() {
    let config = match RunConfig::from_file("./data/config/argentina_floods.json") {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Failed to set up pipeline: {}", e);
            return;
        }
    };

    match pipeline.run() {
        Ok(report) => {
            println!("{report}");
            if let Some(colormap) = &report.colormap {
                println!(
                    "Water classes render as RGBA {:?}",
                    colormap.entry(1)
                );
            }
        }
        Err(e) => eprintln!("Pipeline run failed: {}", e),
    }
}
