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

//! the area of interest (AOI) spatial index, which answers point-in-polygon queries for footprints
//!
//! Containment is boundary inclusive: a point that lies exactly on an edge or vertex of the polygon
//! is classified as contained. Since this is based on the exact `geo` coordinate position predicate the
//! classification does not change between repeated calls, or if the polygon is translated or rotated
//! in a way that is exactly representable (e.g. integer offsets, multiples of 90 degrees).

use std::{path::Path, str::FromStr};
use geo::{BoundingRect, Coord, CoordsIter, LineString, Polygon, Rect, Simplify};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::orient::{Direction, Orient};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use odin_common::fs::filepath_contents_as_string;

use crate::errors::{Result, geometry_error};

/// polygon area of interest. The exterior ring is always oriented counter-clockwise (RFC 7946), holes
/// of the input are not used
#[derive(Debug,Clone,PartialEq)]
pub struct AoiPolygon {
    polygon: Polygon<f64>,
}

impl AoiPolygon {

    /// create from exterior ring coordinates (lon,lat). The ring does not have to be closed
    pub fn from_exterior (coords: &[(f64,f64)])->Result<Self> {
        let mut ring: Vec<Coord<f64>> = coords.iter().map( |&(x,y)| Coord{x,y}).collect();
        ring.dedup();
        if ring.len() > 1 && ring.first() == ring.last() { ring.pop(); }

        if ring.len() < 3 {
            return Err( geometry_error( format!("polygon needs at least 3 distinct vertices, got {}", ring.len())))
        }
        if ring.iter().any( |c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err( geometry_error("non-finite polygon coordinate"))
        }

        Ok( Self::from_polygon( Polygon::new( LineString::new(ring), vec![])) ) // LineString::new does not close, Polygon::new does
    }

    fn from_polygon (polygon: Polygon<f64>)->Self {
        let exterior = polygon.exterior().clone();
        AoiPolygon { polygon: Polygon::new( exterior, vec![]).orient( Direction::Default) }
    }

    /// parse a GeoJSON document. This can be a FeatureCollection, a Feature or a bare geometry - we use the first
    /// Polygon (or first polygon of a MultiPolygon) we find
    pub fn from_geojson_str (s: &str)->Result<Self> {
        let geojson = GeoJson::from_str(s)?;
        let geometry = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features.into_iter().find_map( |f| f.geometry),
            GeoJson::Feature(f) => f.geometry,
            GeoJson::Geometry(g) => Some(g)
        }.ok_or_else( || geometry_error("no geometry in GeoJSON"))?;

        let geometry: geo_types::Geometry<f64> = geometry.try_into()?;
        match geometry {
            geo_types::Geometry::Polygon(p) => Ok( Self::from_polygon(p)),
            geo_types::Geometry::MultiPolygon(mp) => {
                mp.0.into_iter().next()
                    .map( Self::from_polygon)
                    .ok_or_else( || geometry_error("empty MultiPolygon"))
            }
            other => Err( geometry_error( format!("not a polygon geometry: {other:?}")))
        }
    }

    pub fn from_geojson_file (path: impl AsRef<Path>)->Result<Self> {
        let input = filepath_contents_as_string( &path.as_ref())?;
        Self::from_geojson_str( &input)
    }

    /// boundary inclusive point-in-polygon test
    pub fn contains (&self, lon: f64, lat: f64)->bool {
        if !lon.is_finite() || !lat.is_finite() { return false }
        self.polygon.coordinate_position( &Coord{ x: lon, y: lat}) != CoordPos::Outside
    }

    pub fn polygon (&self)->&Polygon<f64> { &self.polygon }

    /// number of distinct vertices (not counting the closing coordinate)
    pub fn vertex_count (&self)->usize {
        self.polygon.exterior().coords_count().saturating_sub(1)
    }

    pub fn bounding_box (&self)->Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    /// get a version of this polygon that has at most `max_vertices` vertices, using Ramer-Douglas-Peucker
    /// simplification with a tolerance that starts at `start_tolerance` and is doubled until we are within budget.
    /// This is only for remote queries that have coordinate limits - local subsetting uses the exact geometry
    pub fn simplified (&self, max_vertices: usize, start_tolerance: f64)->Result<AoiPolygon> {
        if self.vertex_count() <= max_vertices {
            return Ok(self.clone())
        }
        if max_vertices < 3 || !(start_tolerance > 0.0) {
            return Err( geometry_error( format!("invalid simplification budget {max_vertices} / {start_tolerance}")))
        }

        let mut tolerance = start_tolerance;
        loop {
            let simplified = self.polygon.simplify( tolerance);
            let n = simplified.exterior().coords_count().saturating_sub(1);
            if n <= max_vertices {
                if n < 3 { return Err( geometry_error("polygon collapsed during simplification")) }
                return Ok( Self::from_polygon( simplified))
            }
            tolerance *= 2.0;
        }
    }

    /// single feature GeoJSON FeatureCollection of this polygon (e.g. to upload as a query shape)
    pub fn to_geojson_string (&self)->String {
        let feature = Feature {
            bbox: None,
            geometry: Some( Geometry::new( geojson::Value::from( &self.polygon))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        let fc = FeatureCollection { bbox: None, features: vec![feature], foreign_members: None };
        GeoJson::from(fc).to_string()
    }
}
