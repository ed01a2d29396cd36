/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License"); 
 * you may not use this file except in compliance with the License. You may obtain a copy 
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

#![allow(unused)]

use std::path::PathBuf;
use anyhow::Result;
use chrono::{DateTime,Utc};
use clap::Parser;
use odin_common::{datetime::parse_utc_date_arg, fs::ensure_writable_dir};
use odin_gedi::{init_tracing, load_config_or_default, AoiPolygon};
use odin_gedi::cmr::{find_collection, normalize_doi, search_granules, temporal_range, LinkKind};
use odin_gedi::download::{download_granule, edl_client, DownloadOutcome, EdlAuth};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "search and download GEDI L4A granules for an area of interest and time range")]
pub struct Args {
    /// DOI e.g., 10.3334/ORNLDAAC/2056 for GEDI L4A V2.1
    #[arg(long)]
    pub doi: String,

    /// start date in YYYY-MM-DD format
    #[arg(long, value_parser = parse_utc_date_arg)]
    pub date1: DateTime<Utc>,

    /// end date in YYYY-MM-DD format
    #[arg(long, value_parser = parse_utc_date_arg)]
    pub date2: DateTime<Utc>,

    /// path to a GeoJSON file defining the area of interest
    #[arg(long)]
    pub poly: PathBuf,

    /// path to the directory for saving downloaded files
    #[arg(long)]
    pub outdir: PathBuf,

    /// optional RON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main()->Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config_or_default( args.config.as_deref())?;
    let aoi = AoiPolygon::from_geojson_file( &args.poly)?;
    ensure_writable_dir( &args.outdir)?;

    let auth = EdlAuth::from_env();
    let client = edl_client( &config.cmr, &auth).await?;

    let doi = normalize_doi( &args.doi);
    let collection = find_collection( &client, &config.cmr, &doi).await?;
    let temporal = temporal_range( &args.date1, &args.date2);

    let granules = search_granules( &client, &config.cmr, &collection, &temporal, &aoi, LinkKind::Download).await?;
    println!("total granules found: {}", granules.len());

    let mut n_failed = 0;
    for granule in &granules {
        match download_granule( &client, &auth, granule, &args.outdir).await {
            Ok(DownloadOutcome::Downloaded(path)) => println!("downloaded {:?}", path),
            Ok(DownloadOutcome::AlreadyPresent(path)) => println!("{:?} already downloaded", path),
            Err(e) => {
                println!("FAILED {}: {}", granule.url, e);
                n_failed += 1;
            }
        }
    }

    if n_failed > 0 {
        anyhow::bail!("{} of {} downloads failed", n_failed, granules.len())
    }
    Ok(())
}
