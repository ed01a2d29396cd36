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

//! per beam selection of the rows that fall into the area of interest

use std::fmt;
use serde::{Serialize,Deserialize};

use crate::aoi::AoiPolygon;
use crate::config::ProductLayout;
use crate::container::{row_coordinates, ContainerReader};
use crate::errors::{Result, shape_mismatch};

/// strictly increasing original row positions of one beam that are inside the AOI
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Eq,Default)]
pub struct RecordIndexSet(Vec<usize>);

impl RecordIndexSet {
    /// create from arbitrary row positions, which are sorted and de-duplicated
    pub fn from_rows (mut rows: Vec<usize>)->Self {
        rows.sort_unstable();
        rows.dedup();
        RecordIndexSet(rows)
    }

    pub fn len (&self)->usize { self.0.len() }
    pub fn is_empty (&self)->bool { self.0.is_empty() }
    pub fn as_slice (&self)->&[usize] { &self.0 }
    pub fn first (&self)->Option<usize> { self.0.first().copied() }
    pub fn last (&self)->Option<usize> { self.0.last().copied() }
    pub fn iter (&self)->impl Iterator<Item=usize> + '_ { self.0.iter().copied() }

    /// the contiguous runs of this set
    pub fn runs (&self)->Vec<RowRun> { runs( &self.0) }
}

/// inclusive range of consecutive rows
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
pub struct RowRun {
    pub start: usize,
    pub end: usize,
}

impl RowRun {
    pub fn new (start: usize, end: usize)->Self { RowRun { start, end } }

    pub fn len (&self)->usize { self.end - self.start + 1 }
}

impl fmt::Display for RowRun {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "{}..={}", self.start, self.end)
    }
}

/// compute the ordered inclusive runs of a strictly increasing index sequence.
/// A run is closed whenever the gap between consecutive indices exceeds 1
pub fn runs (indices: &[usize])->Vec<RowRun> {
    let mut res = Vec::new();
    let mut it = indices.iter().copied();

    if let Some(first) = it.next() {
        let mut run = RowRun::new( first, first);
        for i in it {
            if i == run.end + 1 {
                run.end = i;
            } else {
                res.push( run);
                run = RowRun::new( i, i);
            }
        }
        res.push( run);
    }
    res
}

/// filter already fetched (lon,lat) arrays of a beam
pub fn plan_coordinates (lon: &[f64], lat: &[f64], aoi: &AoiPolygon)->Result<RecordIndexSet> {
    if lon.len() != lat.len() {
        return Err( shape_mismatch( format!("{} longitudes but {} latitudes", lon.len(), lat.len())))
    }
    let rows = lon.iter().zip( lat.iter()).enumerate()
        .filter_map( |(i,(&x,&y))| aoi.contains( x, y).then_some(i))
        .collect();
    Ok( RecordIndexSet(rows) )
}

/// compute the record index set of a beam. Fails with `MissingField` if the beam has no coordinates
pub fn plan (reader: &dyn ContainerReader, beam: &str, aoi: &AoiPolygon, layout: &ProductLayout)->Result<RecordIndexSet> {
    plan_with_row_count( reader, beam, aoi, layout).map( |(index_set,_)| index_set)
}

/// the index set of `plan` together with the number of footprints of the beam, which is the row count
/// all other beam fields have to match
pub fn plan_with_row_count (reader: &dyn ContainerReader, beam: &str, aoi: &AoiPolygon, layout: &ProductLayout)->Result<(RecordIndexSet,usize)> {
    let (lon, lat) = row_coordinates( reader, beam, layout)?;
    let index_set = plan_coordinates( &lon, &lat, aoi)?;
    Ok( (index_set, lon.len()) )
}
