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

use std::{path::Path, time::Duration};
use serde::{Serialize,Deserialize};
use odin_common::{datetime::millis, fs::filepath_contents_as_string};

use crate::errors::Result;

/// the names that identify the parts of a GEDI L4A granule we care about.
/// This is an immutable value that is created once per run and passed into every component that needs it
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct ProductLayout {
    /// top level groups starting with this prefix are beams
    pub beam_prefix: String,
    pub lon_field: String,
    pub lat_field: String,
    pub elev_field: String,
    /// the per-footprint record identifier
    pub record_id: String,
    /// absolute paths of the non-beam groups that are copied verbatim into subset files
    pub aux_groups: Vec<String>,
}

impl Default for ProductLayout {
    fn default()->Self {
        ProductLayout {
            beam_prefix: "BEAM".to_string(),
            lon_field: "lon_lowestmode".to_string(),
            lat_field: "lat_lowestmode".to_string(),
            elev_field: "elev_lowestmode".to_string(),
            record_id: "shot_number".to_string(),
            aux_groups: vec![ "/ANCILLARY".to_string(), "/METADATA".to_string() ],
        }
    }
}

impl ProductLayout {
    pub fn is_beam (&self, name: &str)->bool { name.starts_with( self.beam_prefix.as_str()) }
}

/// NASA Common Metadata Repository (CMR) search parameters
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct CmrConfig {
    /// CMR search API base url (with trailing '/')
    pub url: String,
    /// Earthdata Login host
    pub auth_host: String,
    /// CMR page size limit
    pub page_size: usize,
    /// max number of polygon vertices we send with a granule query
    pub max_query_vertices: usize,
    /// initial tolerance (in degrees) for polygon simplification if we exceed max_query_vertices
    pub simplify_tolerance: f64,
}

impl Default for CmrConfig {
    fn default()->Self {
        CmrConfig {
            url: "https://cmr.earthdata.nasa.gov/search/".to_string(),
            auth_host: "https://urs.earthdata.nasa.gov".to_string(),
            page_size: 2000,
            max_query_vertices: 5000,
            simplify_tolerance: 0.0005,
        }
    }
}

/// parameters for ranged reads from OPeNDAP Hyrax servers
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct HyraxConfig {
    /// max number of retries for `retry_status` responses and connection failures
    pub max_retry: u32,
    /// delay before first retry, doubled for each subsequent one
    pub backoff: Duration,
    pub retry_status: Vec<u16>,
    /// status codes that mean "no data for this request" (leave field empty)
    pub unavailable_status: Vec<u16>,
}

impl Default for HyraxConfig {
    fn default()->Self {
        HyraxConfig {
            max_retry: 3,
            backoff: millis(100),
            retry_status: vec![500, 502, 503, 504],
            unavailable_status: vec![400, 404],
        }
    }
}

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct GediConfig {
    pub layout: ProductLayout,
    /// extension of granule files we process
    pub granule_ext: String,
    /// appended to the file stem of subset files
    pub subset_suffix: String,
    pub csv_name: String,
    pub json_name: String,
    pub cmr: CmrConfig,
    pub hyrax: HyraxConfig,
}

impl Default for GediConfig {
    fn default()->Self {
        GediConfig {
            layout: ProductLayout::default(),
            granule_ext: "h5".to_string(),
            subset_suffix: "_sub".to_string(),
            csv_name: "subset.csv".to_string(),
            json_name: "subset.json".to_string(),
            cmr: CmrConfig::default(),
            hyrax: HyraxConfig::default(),
        }
    }
}

/// load a RON config file. Missing fields are filled in from the respective defaults
pub fn load_config (path: impl AsRef<Path>)->Result<GediConfig> {
    let input = filepath_contents_as_string( &path.as_ref())?;
    Ok( ron::from_str( &input)? )
}

/// load config from optional path, falling back to the default config
pub fn load_config_or_default (path: Option<&Path>)->Result<GediConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(GediConfig::default())
    }
}
