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
use clap::Parser;
use odin_gedi::{init_tracing, load_config_or_default, AoiPolygon};
use odin_gedi::subset::{subset_dir, FileOutcome};
use odin_gedi::export::export_dir;

#[derive(Parser, Debug)]
#[command(version, about, long_about = "subset GEDI L4A footprints of downloaded granules by area of interest")]
pub struct Args {
    /// path to a GeoJSON file defining the area of interest
    #[arg(long)]
    pub poly: PathBuf,

    /// path to the directory with downloaded granules
    #[arg(long)]
    pub indir: PathBuf,

    /// path to the directory for saving subset files
    #[arg(long)]
    pub subdir: PathBuf,

    /// also create a CSV file of all subset footprints
    #[arg(long)]
    pub csv: bool,

    /// also create a GeoJSON file of all subset footprints
    #[arg(long)]
    pub json: bool,

    /// optional RON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main()->Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config_or_default( args.config.as_deref())?;
    let aoi = AoiPolygon::from_geojson_file( &args.poly)?;

    let report = subset_dir( &args.indir, &args.subdir, &aoi, &config)?;
    for (input, outcome) in &report.files {
        match outcome {
            FileOutcome::Written{output,beams} => {
                let n: usize = beams.iter().map( |b| b.rows).sum();
                println!("{:?} -> {:?} ({} beams, {} footprints)", input, output, beams.len(), n);
            }
            FileOutcome::NoOverlap => println!("{:?}: no footprints in area of interest", input),
            FileOutcome::Failed(e) => println!("{:?}: FAILED {}", input, e),
        }
    }
    println!("{} subset files written, {} without overlap, {} failed", report.n_written(), report.n_no_overlap(), report.n_failed());

    for path in export_dir( &args.subdir, args.csv, args.json, &config)? {
        println!("wrote {:?}", path);
    }

    Ok(())
}
