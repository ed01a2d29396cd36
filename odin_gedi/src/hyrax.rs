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

//! remote ranged subsetting through OPeNDAP Hyrax (DAP4) servers.
//!
//! Instead of downloading whole granules we first fetch the footprint coordinates of a beam, compute the record
//! index set locally and then request each field once per contiguous run of selected rows.

use std::path::Path;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::aoi::AoiPolygon;
use crate::cmr::RemoteGranule;
use crate::config::{HyraxConfig, ProductLayout};
use crate::container::{FieldData, FieldKind, Values};
use crate::errors::{Result, missing_field, op_failed, unsupported_format};
use crate::export::{cell_at, Cell, Table};
use crate::planner::{plan_coordinates, RowRun};

/// result of a remote read that might not have data for the request
#[derive(Debug,Clone,PartialEq)]
pub enum Fetch<T> {
    Data(T),
    /// the server has no data for this request (e.g. unknown field or beam)
    Unavailable,
}

impl<T> Fetch<T> {
    pub fn is_unavailable (&self)->bool { matches!( self, Fetch::Unavailable) }

    pub fn data (self)->Option<T> {
        match self {
            Fetch::Data(data) => Some(data),
            Fetch::Unavailable => None
        }
    }
}

/// a source of beam fields that can be read by row range
#[async_trait]
pub trait RangedSource: Send + Sync {
    /// (lon,lat) of all footprints of a beam
    async fn coordinates (&self, locator: &str, beam: &str, layout: &ProductLayout)->Result<Fetch<(Vec<f64>,Vec<f64>)>>;

    /// rows `run.start..=run.end` of a beam field
    async fn read_range (&self, locator: &str, beam: &str, field: &str, run: RowRun)->Result<Fetch<FieldData>>;
}

/// DAP4 url for a granule locator and a list of constraint expressions (e.g. `/BEAM0000/agbd[10:20]`)
pub fn dap4_url (locator: &str, constraints: &[String])->String {
    format!("{}.dap.nc4?dap4.ce={}", locator, constraints.join(";"))
}

pub fn field_constraint (beam: &str, field: &str, run: Option<RowRun>)->String {
    match run {
        Some(run) => format!("/{}/{}[{}:{}]", beam, field, run.start, run.end),
        None => format!("/{}/{}", beam, field)
    }
}

/* #region Hyrax source *****************************************************************************************/

pub struct HyraxSource {
    client: Client,
    config: HyraxConfig,
}

impl HyraxSource {
    pub fn new (client: Client, config: HyraxConfig)->Self {
        HyraxSource { client, config }
    }

    /// GET with retry on configured (server) errors and on connection failures or timeouts, doubling the delay
    /// between attempts
    async fn get (&self, url: &str)->Result<Fetch<Bytes>> {
        let mut retry = 0;
        let mut delay = self.config.backoff;

        loop {
            let response = match self.client.get( url).send().await {
                Ok(response) => response,
                Err(e) if is_transient( &e) && retry < self.config.max_retry => {
                    retry += 1;
                    warn!("{} failed with {}, retry {}/{} in {:?}", url, e, retry, self.config.max_retry, delay);
                    tokio::time::sleep( delay).await;
                    delay *= 2;
                    continue
                }
                Err(e) => return Err( e.into())
            };
            let status = response.status();

            if status.is_success() {
                return Ok( Fetch::Data( response.bytes().await?))
            } else if self.config.unavailable_status.contains( &status.as_u16()) {
                debug!("{} unavailable ({})", url, status);
                return Ok( Fetch::Unavailable)
            } else if self.config.retry_status.contains( &status.as_u16()) && retry < self.config.max_retry {
                retry += 1;
                warn!("{} failed with {}, retry {}/{} in {:?}", url, status, retry, self.config.max_retry, delay);
                tokio::time::sleep( delay).await;
                delay *= 2;
            } else {
                return Err( op_failed( format!("{} failed with {}", url, status)))
            }
        }
    }
}

/// request errors that might go away when we try again
fn is_transient (e: &reqwest::Error)->bool {
    e.is_connect() || e.is_timeout()
}

#[async_trait]
impl RangedSource for HyraxSource {
    async fn coordinates (&self, locator: &str, beam: &str, layout: &ProductLayout)->Result<Fetch<(Vec<f64>,Vec<f64>)>> {
        let url = dap4_url( locator, &[ field_constraint( beam, &layout.lon_field, None), field_constraint( beam, &layout.lat_field, None) ]);
        match self.get( &url).await? {
            Fetch::Data(bytes) => {
                let lon = decode_field( &bytes, beam, &layout.lon_field)?;
                let lat = decode_field( &bytes, beam, &layout.lat_field)?;
                let lon = lon.values.to_f64_vec().ok_or_else( || missing_field( format!("{} is not numeric", layout.lon_field)))?;
                let lat = lat.values.to_f64_vec().ok_or_else( || missing_field( format!("{} is not numeric", layout.lat_field)))?;
                Ok( Fetch::Data( (lon, lat)) )
            }
            Fetch::Unavailable => Ok( Fetch::Unavailable)
        }
    }

    async fn read_range (&self, locator: &str, beam: &str, field: &str, run: RowRun)->Result<Fetch<FieldData>> {
        let url = dap4_url( locator, &[ field_constraint( beam, field, Some(run)) ]);
        match self.get( &url).await? {
            Fetch::Data(bytes) => Ok( Fetch::Data( decode_field( &bytes, beam, field)?)),
            Fetch::Unavailable => Ok( Fetch::Unavailable)
        }
    }
}

/// DAP4 responses are netCDF-4 files, which we decode with the HDF5 backend
#[cfg(feature="hdf5")]
fn decode_field (bytes: &[u8], beam: &str, field: &str)->Result<FieldData> {
    use std::io::Write;
    use crate::container::{ContainerReader, RowSelection, h5::H5Reader};

    let mut file = tempfile::Builder::new().suffix(".nc4").tempfile()?;
    file.write_all( bytes)?;
    file.flush()?;

    let reader = H5Reader::open( file.path())?;
    reader.read_rows( &format!("/{}/{}", beam, field), &RowSelection::All)
}

#[cfg(not(feature="hdf5"))]
fn decode_field (bytes: &[u8], beam: &str, field: &str)->Result<FieldData> {
    Err( unsupported_format("decoding DAP4 responses requires the 'hdf5' feature"))
}

/* #endregion Hyrax source */

/* #region remote subset ****************************************************************************************/

/// the ordered, duplicate free list of fields we retrieve. The first four are always latitude, longitude,
/// elevation and record id
#[derive(Debug,Clone,PartialEq)]
pub struct FieldRequest {
    fields: Vec<String>,
}

impl FieldRequest {
    pub fn new (vars: &[String], layout: &ProductLayout)->Self {
        let mut fields = vec![
            layout.lat_field.clone(), layout.lon_field.clone(), layout.elev_field.clone(), layout.record_id.clone()
        ];
        for v in vars {
            let v = v.trim();
            if !v.is_empty() && !fields.iter().any( |f| f == v) {
                fields.push( v.to_string());
            }
        }
        FieldRequest { fields }
    }

    /// table columns in output order
    pub fn columns (&self)->&[String] { &self.fields }

    /// the fields we have to fetch by row range (everything except the coordinates)
    pub fn ranged_fields (&self)->&[String] { &self.fields[2..] }
}

/// render rows of remote field data as table cells. The record id and multi-column values become text
fn range_cells (data: &FieldData, as_text: bool)->Vec<Cell> {
    let cols = data.kind.cols();
    (0..data.row_count()).map( |r| {
        if data.kind == FieldKind::Scalar {
            let cell = cell_at( &data.values, r);
            if as_text { Cell::Text( cell.to_string()) } else { cell }
        } else {
            let vals: Vec<String> = (0..cols).map( |c| cell_at( &data.values, r*cols + c).to_string()).collect();
            Cell::Text( format!("[{}]", vals.join(" ")))
        }
    }).collect()
}

/// get the table rows of one beam of a remote granule that are inside the AOI. Fields that are `Unavailable`
/// leave their cells empty, unavailable coordinates result in an empty table
pub async fn remote_subset_beam (source: &dyn RangedSource, locator: &str, beam: &str, request: &FieldRequest,
                                 aoi: &AoiPolygon, layout: &ProductLayout)->Result<Table>
{
    let mut table = Table::new( request.columns().to_vec());

    let (lon, lat) = match source.coordinates( locator, beam, layout).await? {
        Fetch::Data(coords) => coords,
        Fetch::Unavailable => {
            warn!("no coordinates for {} of {}", beam, locator);
            return Ok(table)
        }
    };

    let index_set = plan_coordinates( &lon, &lat, aoi)?;
    if index_set.is_empty() { return Ok(table) }

    for i in index_set.iter() {
        table.push_row( vec![ Cell::F64( lat[i]), Cell::F64( lon[i]) ]);
    }

    let mut offset = 0;
    for run in index_set.runs() {
        for (c,field) in request.columns().iter().enumerate().skip(2) {
            match source.read_range( locator, beam, field, run).await? {
                Fetch::Data(data) => {
                    if data.row_count() != run.len() {
                        warn!("{} rows of {} for range {} of {}", data.row_count(), field, run, beam);
                        continue
                    }
                    let as_text = *field == layout.record_id;
                    for (k,cell) in range_cells( &data, as_text).into_iter().enumerate() {
                        table.rows[offset + k][c] = cell;
                    }
                }
                Fetch::Unavailable => debug!("{} not available for range {} of {}", field, run, beam)
            }
        }
        offset += run.len();
    }

    Ok(table)
}

/// subset all requested beams of the given granules. Errors of single beams are logged and skipped
pub async fn remote_subset (source: &dyn RangedSource, granules: &[RemoteGranule], beams: &[String], request: &FieldRequest,
                            aoi: &AoiPolygon, layout: &ProductLayout)->Result<Table>
{
    let mut table = Table::new( request.columns().to_vec());

    for granule in granules {
        for beam in beams {
            info!("retrieving {} / {}", granule.url.rsplit('/').next().unwrap_or(&granule.url), beam);
            match remote_subset_beam( source, &granule.url, beam, request, aoi, layout).await {
                Ok(t) => table.append( t),
                Err(e) => warn!("skipping {} of {}: {}", beam, granule.url, e)
            }
        }
    }
    Ok(table)
}

/* #endregion remote subset */
