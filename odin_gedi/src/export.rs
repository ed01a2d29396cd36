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

//! flatten subset containers into a table that can be written as CSV, or as a GeoJSON point collection

use std::{collections::{HashMap,HashSet}, fmt, fs::{File,OpenOptions}, io::BufWriter, path::{Path,PathBuf}};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use tracing::{debug, info, warn};
use odin_common::fs::{filename, files_with_extension, has_stem_suffix, is_non_empty_file};

use crate::config::{GediConfig, ProductLayout};
use crate::container::{list_beams, open_container, walk_fields, ContainerReader, FieldDescriptor, FieldKind, RowSelection, Values};
use crate::errors::{Result, missing_field};

/* #region table ************************************************************************************************/

#[derive(Debug,Clone,PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Text(String),
}

impl Cell {
    pub fn is_null (&self)->bool { matches!( self, Cell::Null) }
    pub fn is_text (&self)->bool { matches!( self, Cell::Text(_)) }

    pub fn as_f64 (&self)->Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::UInt(v) => Some(*v as f64),
            Cell::F32(v) => Some(*v as f64),
            Cell::F64(v) => Some(*v),
            Cell::Text(s) => s.parse().ok(),
            Cell::Null => None,
        }
    }

    pub fn to_json (&self)->JsonValue {
        match self {
            Cell::Null => JsonValue::Null,
            Cell::Int(v) => JsonValue::from(*v),
            Cell::UInt(v) => JsonValue::from(*v),
            Cell::F32(v) => float_json( *v as f64),
            Cell::F64(v) => float_json( *v),
            Cell::Text(s) => JsonValue::from( s.as_str()),
        }
    }

    /// parse a CSV field, trying integer and float representations first
    pub fn parse (s: &str)->Cell {
        if s.is_empty() { Cell::Null }
        else if let Ok(v) = s.parse::<i64>() { Cell::Int(v) }
        else if let Ok(v) = s.parse::<u64>() { Cell::UInt(v) }
        else if let Ok(v) = s.parse::<f64>() { Cell::F64(v) }
        else { Cell::Text( s.to_string()) }
    }
}

fn float_json (v: f64)->JsonValue {
    serde_json::Number::from_f64(v).map( JsonValue::Number).unwrap_or( JsonValue::Null)
}

impl fmt::Display for Cell {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::UInt(v) => write!(f, "{v}"),
            Cell::F32(v) => write!(f, "{v}"),
            Cell::F64(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

/// the cell for element `i` of a value vector
pub fn cell_at (values: &Values, i: usize)->Cell {
    match values {
        Values::I8(v) => Cell::Int( v[i] as i64),
        Values::U8(v) => Cell::UInt( v[i] as u64),
        Values::I16(v) => Cell::Int( v[i] as i64),
        Values::U16(v) => Cell::UInt( v[i] as u64),
        Values::I32(v) => Cell::Int( v[i] as i64),
        Values::U32(v) => Cell::UInt( v[i] as u64),
        Values::I64(v) => Cell::Int( v[i]),
        Values::U64(v) => Cell::UInt( v[i]),
        Values::F32(v) => Cell::F32( v[i]),
        Values::F64(v) => Cell::F64( v[i]),
        Values::Text(v) | Values::AsciiText(v) => Cell::Text( v[i].clone()),
        Values::FixedText{values,..} => Cell::Text( values[i].clone()),
    }
}

#[derive(Debug,Clone,PartialEq,Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new (columns: Vec<String>)->Self { Table { columns, rows: Vec::new() } }

    pub fn is_empty (&self)->bool { self.rows.is_empty() }
    pub fn len (&self)->usize { self.rows.len() }

    pub fn column_index (&self, name: &str)->Option<usize> {
        self.columns.iter().position( |c| c == name)
    }

    /// all cells of a column (None if there is no such column)
    pub fn column (&self, name: &str)->Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some( self.rows.iter().map( |row| &row[idx]).collect())
    }

    /// append a row, padding or truncating to the number of columns
    pub fn push_row (&mut self, mut row: Vec<Cell>) {
        row.resize( self.columns.len(), Cell::Null);
        self.rows.push( row);
    }

    pub fn append (&mut self, other: Table) {
        for name in &other.columns {
            if self.column_index(name).is_none() { self.columns.push( name.clone()) }
        }
        let idx: Vec<usize> = other.columns.iter().filter_map( |c| self.column_index(c)).collect();
        for orow in other.rows {
            let mut row = vec![Cell::Null; self.columns.len()];
            for (i,cell) in idx.iter().zip( orow.into_iter()) { row[*i] = cell; }
            self.rows.push( row);
        }
        self.pad_rows();
    }

    fn pad_rows (&mut self) {
        let n = self.columns.len();
        for row in &mut self.rows { row.resize( n, Cell::Null) }
    }

    /// turn all non-null cells of columns that mix text and numbers into text
    pub fn coerce_mixed_columns (&mut self) {
        for c in 0..self.columns.len() {
            let has_text = self.rows.iter().any( |row| row[c].is_text());
            let has_other = self.rows.iter().any( |row| !row[c].is_text() && !row[c].is_null());
            if has_text && has_other {
                for row in &mut self.rows {
                    if !row[c].is_null() && !row[c].is_text() {
                        row[c] = Cell::Text( row[c].to_string());
                    }
                }
            }
        }
    }

    pub fn from_csv (path: impl AsRef<Path>)->Result<Table> {
        let mut reader = csv::Reader::from_path( path)?;
        let columns: Vec<String> = reader.headers()?.iter().map( |s| s.to_string()).collect();
        let mut table = Table::new( columns);
        for rec in reader.records() {
            let rec = rec?;
            table.push_row( rec.iter().map( Cell::parse).collect());
        }
        Ok(table)
    }
}

/* #endregion table */

/* #region flatten **********************************************************************************************/

/// flatten all beams of the given containers (in the given order) into one table. Leading columns are
/// `filename`, `BEAM` and the record id, followed by the union of all field columns in order of appearance
pub fn flatten (paths: &[PathBuf], layout: &ProductLayout)->Result<Table> {
    let mut table = Table::new( vec![ "filename".to_string(), "BEAM".to_string(), layout.record_id.clone() ]);

    for path in paths {
        let src = open_container( path)?;
        let fname = filename( path).unwrap_or_default().to_string();

        for beam in list_beams( src.as_ref(), layout)? {
            let beam_table = flatten_beam( src.as_ref(), &fname, &beam, layout)?;
            debug!("{} {}: {} rows", fname, beam, beam_table.len());
            table.append( beam_table);
        }
    }

    table.coerce_mixed_columns();
    Ok(table)
}

fn flatten_beam (src: &dyn ContainerReader, fname: &str, beam: &str, layout: &ProductLayout)->Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    let mut data: Vec<Vec<Cell>> = Vec::new();
    let mut record_ids: Option<Vec<Cell>> = None;
    let mut n_rows: Option<usize> = None;
    let mut used: HashSet<String> = HashSet::new();

    for desc in walk_fields( src, beam) {
        let desc = desc?;
        if *n_rows.get_or_insert( desc.row_count) != desc.row_count {
            warn!("skipping {}: {} rows instead of {}", desc.path, desc.row_count, n_rows.unwrap_or(0));
            continue
        }
        let field = src.read_rows( &desc.path, &RowSelection::All)?;
        let cols = field.kind.cols();
        let rows = field.row_count();

        if desc.name() == layout.record_id {
            if record_ids.is_none() {
                record_ids = Some( (0..rows).map( |r| cell_at( &field.values, r*cols)).collect());
            }
            continue // nested copies of the record id are not emitted again
        }

        let base = column_base( &desc, beam, &used);
        used.insert( base.clone());

        if field.kind == FieldKind::Scalar {
            columns.push( base);
            data.push( (0..rows).map( |r| cell_at( &field.values, r)).collect());
        } else {
            for c in 0..cols {
                columns.push( format!("{}_{}", base, c+1));
                data.push( (0..rows).map( |r| cell_at( &field.values, r*cols + c)).collect());
            }
        }
    }

    let n_rows = n_rows.unwrap_or(0);
    let mut header = vec![ "filename".to_string(), "BEAM".to_string(), layout.record_id.clone() ];
    header.extend( columns);
    let mut table = Table::new( header);

    for r in 0..n_rows {
        let mut row = Vec::with_capacity( table.columns.len());
        row.push( Cell::Text( fname.to_string()));
        row.push( Cell::Text( beam.to_string()));
        row.push( record_ids.as_ref().map( |ids| ids[r].clone()).unwrap_or( Cell::Null));
        for col in &data { row.push( col[r].clone()) }
        table.push_row( row);
    }
    Ok(table)
}

/// the leaf name, or the beam relative path if that name is already taken by another field of this beam
fn column_base (desc: &FieldDescriptor, beam: &str, used: &HashSet<String>)->String {
    let name = desc.name();
    if used.contains( name) || name == "filename" || name == "BEAM" {
        desc.relative_path( beam).to_string()
    } else {
        name.to_string()
    }
}

/* #endregion flatten */

/* #region output formats ***************************************************************************************/

/// convert table into GeoJSON point features located at the `lon_col`/`lat_col` columns. All other columns
/// become feature properties. Rows without valid coordinates are skipped
pub fn to_point_collection (table: &Table, lon_col: &str, lat_col: &str)->Result<FeatureCollection> {
    let ilon = table.column_index( lon_col).ok_or_else( || missing_field( format!("no {lon_col} column")))?;
    let ilat = table.column_index( lat_col).ok_or_else( || missing_field( format!("no {lat_col} column")))?;

    let mut features = Vec::with_capacity( table.len());
    for row in &table.rows {
        let (Some(lon), Some(lat)) = (row[ilon].as_f64(), row[ilat].as_f64()) else { continue };
        if !lon.is_finite() || !lat.is_finite() { continue }

        let mut properties = JsonObject::new();
        for (i,(name,cell)) in table.columns.iter().zip( row.iter()).enumerate() {
            if i != ilon && i != ilat {
                properties.insert( name.clone(), cell.to_json());
            }
        }

        features.push( Feature {
            bbox: None,
            geometry: Some( Geometry::new( geojson::Value::Point( vec![lon, lat]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok( FeatureCollection { bbox: None, features, foreign_members: None } )
}

pub fn write_csv (table: &Table, path: impl AsRef<Path>)->Result<()> {
    let mut writer = csv::Writer::from_path( path)?;
    write_csv_rows( &mut writer, table, true)
}

/// append table rows to a CSV file, writing the header only if the file is new (or empty)
pub fn append_csv (table: &Table, path: impl AsRef<Path>)->Result<()> {
    let path = path.as_ref();
    let is_new = !is_non_empty_file( path);
    let file = OpenOptions::new().create(true).append(true).open( path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer( file);
    write_csv_rows( &mut writer, table, is_new)
}

fn write_csv_rows<W: std::io::Write> (writer: &mut csv::Writer<W>, table: &Table, header: bool)->Result<()> {
    if header {
        writer.write_record( &table.columns)?;
    }
    for row in &table.rows {
        writer.write_record( row.iter().map( |c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_geojson (fc: &FeatureCollection, path: impl AsRef<Path>)->Result<()> {
    let writer = BufWriter::new( File::create( path)?);
    serde_json::to_writer( writer, fc)?;
    Ok(())
}

/// the subset containers in `dir` (sorted by name)
pub fn subset_files (dir: impl AsRef<Path>, config: &GediConfig)->Result<Vec<PathBuf>> {
    Ok( files_with_extension( dir, &config.granule_ext)?.into_iter()
        .filter( |p| has_stem_suffix( p, &config.subset_suffix))
        .collect()
    )
}

/// flatten all subset containers of `dir` and write the requested CSV and/or GeoJSON files into the same
/// directory. Nothing is written if there are no footprints. Returns the paths of the written files
pub fn export_dir (dir: impl AsRef<Path>, csv: bool, json: bool, config: &GediConfig)->Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();
    if !csv && !json { return Ok(written) }

    let files = subset_files( dir, config)?;
    let table = flatten( &files, &config.layout)?;
    if table.is_empty() {
        info!("no footprints in subset files of {:?}", dir);
        return Ok(written)
    }

    if csv {
        let path = dir.join( &config.csv_name);
        write_csv( &table, &path)?;
        info!("wrote {} rows to {:?}", table.len(), path);
        written.push( path);
    }
    if json {
        let path = dir.join( &config.json_name);
        let fc = to_point_collection( &table, &config.layout.lon_field, &config.layout.lat_field)?;
        write_geojson( &fc, &path)?;
        info!("wrote {} features to {:?}", fc.features.len(), path);
        written.push( path);
    }
    Ok(written)
}

/* #endregion output formats */
