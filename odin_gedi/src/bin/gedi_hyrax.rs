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
use odin_common::datetime::parse_utc_date_arg;
use odin_gedi::{init_tracing, load_config_or_default, AoiPolygon};
use odin_gedi::cmr::{find_collection, normalize_doi, search_granules, temporal_range, LinkKind};
use odin_gedi::download::{edl_client, EdlAuth};
use odin_gedi::export::{append_csv, to_point_collection, write_geojson, Table};
use odin_gedi::hyrax::{remote_subset_beam, FieldRequest, HyraxSource};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "retrieve GEDI L4A variables for an area of interest from OPeNDAP Hyrax servers")]
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

    /// comma separated beam names (e.g. BEAM0101,BEAM0110)
    #[arg(long, value_delimiter = ',', required = true)]
    pub beams: Vec<String>,

    /// comma separated variable names (e.g. agbd,agbd_se)
    #[arg(long, value_delimiter = ',', required = true)]
    pub variables: Vec<String>,

    /// output CSV file (rows are appended if it exists)
    #[arg(long)]
    pub outfile: PathBuf,

    /// also create a GeoJSON file next to the CSV file
    #[arg(long)]
    pub json: bool,

    /// optional RON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main()->Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config_or_default( args.config.as_deref())?;
    let layout = &config.layout;
    let aoi = AoiPolygon::from_geojson_file( &args.poly)?;

    let auth = EdlAuth::from_env();
    let client = edl_client( &config.cmr, &auth).await?;

    let doi = normalize_doi( &args.doi);
    let collection = find_collection( &client, &config.cmr, &doi).await?;
    let temporal = temporal_range( &args.date1, &args.date2);
    let granules = search_granules( &client, &config.cmr, &collection, &temporal, &aoi, LinkKind::Opendap).await?;
    println!("total granules found: {}", granules.len());

    let request = FieldRequest::new( &args.variables, layout);
    let source = HyraxSource::new( client, config.hyrax.clone());

    append_csv( &Table::new( request.columns().to_vec()), &args.outfile)?; // make sure there is a header

    for granule in &granules {
        for beam in &args.beams {
            println!("retrieving {} / {}", granule.url.rsplit('/').next().unwrap_or(&granule.url), beam);
            match remote_subset_beam( &source, &granule.url, beam, &request, &aoi, layout).await {
                Ok(table) => {
                    if !table.is_empty() {
                        println!("  {} footprints", table.len());
                        append_csv( &table, &args.outfile)?;
                    }
                }
                Err(e) => println!("  FAILED {}", e)
            }
        }
    }

    if args.json {
        let path = args.outfile.with_extension("json");
        let table = Table::from_csv( &args.outfile)?;
        let fc = to_point_collection( &table, &layout.lon_field, &layout.lat_field)?;
        write_geojson( &fc, &path)?;
        println!("wrote GeoJSON file {:?}", path);
    }

    Ok(())
}
