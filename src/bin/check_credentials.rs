// Minimal check that NASA Earthdata credentials are usable: run a tiny
// known-good search, then open the first returned asset. Exits non-zero
// with a remediation hint when either step fails.

use notos::bbox::Bbox;
use notos::catalog::{CatalogClient, CatalogSearch, RetryPolicy, SearchQuery};
use notos::product::Product;
use notos::raster::{GdalOptions, GdalReader, RasterReader};
use chrono::NaiveDate;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Small AOI around Livingston, TX with reliable DSWx coverage
    let (lon, lat, delta) = (-95.09, 30.69, 0.1);
    let aoi = match Bbox::new(lon - delta, lon + delta, lat - delta, lat + delta) {
        Ok(bbox) => bbox,
        Err(e) => {
            eprintln!("Invalid AOI: {}", e);
            process::exit(1);
        }
    };

    let product = Product::DswxHls;
    let query = SearchQuery::new(
        aoi,
        NaiveDate::from_ymd_opt(2024, 4, 30).expect("valid date"),
        NaiveDate::from_ymd_opt(2024, 5, 31).expect("valid date"),
        product.collection(),
    );

    println!("Testing STAC search...");
    let client = match CatalogClient::for_provider(product.provider(), RetryPolicy::default()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not build STAC client: {}", e);
            process::exit(1);
        }
    };

    let records = match client.search(&query) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("STAC search failed: {}", e);
            process::exit(1);
        }
    };

    let test_uri = records
        .iter()
        .find_map(|record| record.asset_matching(product.asset_key()));
    let Some(test_uri) = test_uri else {
        eprintln!("Problem in parsing results retrieved from STAC client");
        process::exit(1);
    };

    println!("Search successful, accessing test data...");
    let reader = match GdalReader::new(&GdalOptions::default(), product.fill_value()) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Could not configure raster access: {}", e);
            process::exit(1);
        }
    };

    match reader.open(test_uri) {
        Ok(_) => println!("Success! Your credentials file is correctly configured!"),
        Err(e) => {
            eprintln!("Could not access NASA EarthData asset: {}", test_uri);
            eprintln!("({})", e);
            eprintln!(
                "Ensure that a .netrc file containing valid NASA Earthdata \
                 credentials exists in the user home directory."
            );
            process::exit(1);
        }
    }
}
