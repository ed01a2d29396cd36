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

#![doc = include_str!("../doc/odin_gedi.md")]

mod errors;
pub use errors::*;

pub mod config;
pub use config::{GediConfig, ProductLayout, CmrConfig, HyraxConfig, load_config, load_config_or_default};

pub mod aoi;
pub use aoi::AoiPolygon;

pub mod container;
pub mod planner;
pub mod subset;
pub mod export;
pub mod cmr;
pub mod download;
pub mod hyrax;

/// install the tracing subscriber used by our command line tools (filtered by `RUST_LOG`)
pub fn init_tracing () {
    tracing_subscriber::fmt()
        .with_env_filter( tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
