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

//! synthetic granule fixtures shared by the integration tests

use std::path::{Path,PathBuf};
use odin_gedi::AoiPolygon;
use odin_gedi::GediConfig;
use odin_gedi::container::{AttrValue, Attributes, CharSet, FieldData, MemContainer, Values};

/// longitudes of a 10 row beam (all at lat 5.0) of which rows 2,5,6,7 are inside `square_aoi()`
pub const BEAM_LONS: [f64;10] = [-5.0, -4.0, 1.0, -3.0, 20.0, 2.0, 3.0, 4.0, 15.0, -1.0];
pub const INSIDE_ROWS: [usize;4] = [2, 5, 6, 7];

/// lon/lat square [0,10] x [0,10]
pub fn square_aoi ()->AoiPolygon {
    AoiPolygon::from_exterior( &[(0.0,0.0), (10.0,0.0), (10.0,10.0), (0.0,10.0)]).unwrap()
}

/// default config for RON snapshot granules
pub fn ron_config ()->GediConfig {
    GediConfig { granule_ext: "ron".to_string(), ..GediConfig::default() }
}

pub fn attrs (list: &[(&str,AttrValue)])->Attributes {
    list.iter().map( |(k,v)| (k.to_string(), v.clone())).collect()
}

/// add a GEDI L4A like beam with top level and nested fields
pub fn add_beam (mc: &mut MemContainer, beam: &str, lons: &[f64], shot_base: u64) {
    let n = lons.len();
    let p = |f: &str| format!("/{beam}/{f}");
    let shots: Vec<u64> = (0..n as u64).map( |i| shot_base + i).collect();

    mc.set_group_attributes( &format!("/{beam}"), &attrs( &[ ("description", AttrValue::text("full power beam")) ])).unwrap();

    mc.insert_field( &p("lon_lowestmode"), FieldData::scalar( Values::F64( lons.to_vec())), attrs( &[
        ("units", AttrValue::text("degrees")),
        ("_FillValue", AttrValue::scalar( Values::F64( vec![-9999.0]))),
    ])).unwrap();
    mc.insert_field( &p("lat_lowestmode"), FieldData::scalar( Values::F64( vec![5.0; n])), attrs( &[
        ("units", AttrValue::text("degrees")),
    ])).unwrap();
    mc.insert_field( &p("elev_lowestmode"), FieldData::scalar( Values::F32( (0..n).map( |i| 100.0 + i as f32).collect())), attrs(&[])).unwrap();
    mc.insert_field( &p("shot_number"), FieldData::scalar( Values::U64( shots.clone())), attrs(&[])).unwrap();
    mc.insert_field( &p("agbd"), FieldData::scalar( Values::F32( (0..n).map( |i| i as f32 * 1.5).collect())), attrs( &[
        ("units", AttrValue::text("Mg / ha")),
        ("valid_range", AttrValue::array( Values::F32( vec![0.0, 10000.0]))),
        ("source", AttrValue::scalar( Values::FixedText{ size: 8, values: vec!["L4A".to_string()], cset: CharSet::Ascii })),
    ])).unwrap();
    mc.insert_field( &p("xvar"), FieldData::multi_column( 4, Values::F32( (0..n*4).map( |k| k as f32 * 0.25).collect())).unwrap(), attrs(&[])).unwrap();

    mc.set_group_attributes( &p("agbd_prediction"), &attrs( &[ ("description", AttrValue::text("model predictions")) ])).unwrap();
    mc.insert_field( &p("agbd_prediction/agbd_a1"), FieldData::scalar( Values::F32( (0..n).map( |i| i as f32 * 2.0).collect())), attrs( &[
        ("units", AttrValue::text("Mg / ha")),
    ])).unwrap();
    mc.insert_field( &p("agbd_prediction/shot_number"), FieldData::scalar( Values::U64( shots)), attrs(&[])).unwrap();
    mc.insert_field( &p("land_cover_data/region_class"), FieldData::scalar( Values::Text( (0..n).map( |i| format!("r{i}")).collect())), attrs(&[])).unwrap();
}

pub fn add_aux_groups (mc: &mut MemContainer) {
    mc.insert_field( "/ANCILLARY/model_data", FieldData::scalar( Values::F64( vec![1.0, 2.0, 3.0])), attrs( &[
        ("description", AttrValue::text("model parameters")),
    ])).unwrap();
    mc.set_group_attributes( "/METADATA/DatasetIdentification", &attrs( &[
        ("shortName", AttrValue::text("GEDI_L4A")),
        ("VersionID", AttrValue::scalar( Values::I32( vec![2]))),
    ])).unwrap();
}

/// granule with one beam that overlaps `square_aoi()` (BEAM0000) and one that does not (BEAM0001)
pub fn granule ()->MemContainer {
    let mut mc = MemContainer::new();
    add_beam( &mut mc, "BEAM0000", &BEAM_LONS, 1000);
    add_beam( &mut mc, "BEAM0001", &[50.0; 6], 2000);
    add_aux_groups( &mut mc);
    mc
}

/// granule without any footprint inside `square_aoi()`
pub fn remote_granule ()->MemContainer {
    let mut mc = MemContainer::new();
    add_beam( &mut mc, "BEAM0000", &[-50.0; 10], 1000);
    add_beam( &mut mc, "BEAM0001", &[50.0; 6], 2000);
    add_aux_groups( &mut mc);
    mc
}

pub fn save (mc: &MemContainer, dir: impl AsRef<Path>, fname: &str)->PathBuf {
    let path = dir.as_ref().join( fname);
    mc.save( &path).unwrap();
    path
}
