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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinGediError>;

#[derive(Error,Debug)]
pub enum OdinGediError {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("not found {0}")]
    NotFound( String ),

    /// the file exists but cannot be parsed as the expected container structure
    #[error("corrupt container format {0}")]
    CorruptFormat( String ),

    /// no backend for this file type (unknown extension or backend not compiled in)
    #[error("unsupported container format {0}")]
    UnsupportedFormat( String ),

    /// an expected coordinate field or declared field is absent
    #[error("missing field {0}")]
    MissingField( String ),

    #[error("unsupported element type {0}")]
    UnsupportedType( String ),

    #[error("shape mismatch {0}")]
    ShapeMismatch( String ),

    #[error("geometry error {0}")]
    GeometryError( String ),

    #[error("config parse error {0}")]
    ConfigParseError( #[from] ron::error::SpannedError),

    #[error("RON error {0}")]
    RonError( #[from] ron::Error),

    #[error("serde error {0}")]
    SerdeError( #[from] serde_json::Error),

    #[error("GeoJSON error {0}")]
    GeoJsonError( #[from] Box<geojson::Error>),

    #[error("CSV error {0}")]
    CsvError( #[from] csv::Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("CMR error {0}")]
    CmrError( String ),

    #[error("authentication error {0}")]
    AuthError( String ),

    #[error("integrity check failed {0}")]
    IntegrityError( String ),

    #[cfg(feature="hdf5")]
    #[error("HDF5 error {0}")]
    Hdf5Error( #[from] hdf5::Error),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed( String ),
}

impl From<geojson::Error> for OdinGediError {
    fn from (e: geojson::Error)->Self { OdinGediError::GeoJsonError( Box::new(e)) }
}

impl OdinGediError {
    /// errors that are confined to a single beam and hence should not abort processing of sibling beams
    pub fn is_beam_scoped (&self)->bool {
        matches!( self, OdinGediError::MissingField(_) | OdinGediError::UnsupportedType(_) | OdinGediError::ShapeMismatch(_))
    }
}

pub fn not_found (msg: impl ToString)->OdinGediError {
    OdinGediError::NotFound(msg.to_string())
}

pub fn corrupt_format (msg: impl ToString)->OdinGediError {
    OdinGediError::CorruptFormat(msg.to_string())
}

pub fn unsupported_format (msg: impl ToString)->OdinGediError {
    OdinGediError::UnsupportedFormat(msg.to_string())
}

pub fn missing_field (msg: impl ToString)->OdinGediError {
    OdinGediError::MissingField(msg.to_string())
}

pub fn unsupported_type (msg: impl ToString)->OdinGediError {
    OdinGediError::UnsupportedType(msg.to_string())
}

pub fn shape_mismatch (msg: impl ToString)->OdinGediError {
    OdinGediError::ShapeMismatch(msg.to_string())
}

pub fn geometry_error (msg: impl ToString)->OdinGediError {
    OdinGediError::GeometryError(msg.to_string())
}

pub fn cmr_error (msg: impl ToString)->OdinGediError {
    OdinGediError::CmrError(msg.to_string())
}

pub fn auth_error (msg: impl ToString)->OdinGediError {
    OdinGediError::AuthError(msg.to_string())
}

pub fn integrity_error (msg: impl ToString)->OdinGediError {
    OdinGediError::IntegrityError(msg.to_string())
}

pub fn op_failed (msg: impl ToString)->OdinGediError {
    OdinGediError::OpFailed(msg.to_string())
}
