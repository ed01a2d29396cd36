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

//! the backend neutral hierarchical record store model.
//!
//! A container is a tree of groups and fields (datasets). Beams are top level groups that share one implicit row
//! dimension across all their (possibly nested) fields. Readers expose a small set of primitives that are
//! implemented by each backend ([`ContainerReader`]) on top of which we provide the uniform operations
//! ([`list_beams`], [`row_coordinates`], [`walk_fields`]). Writers ([`ContainerWriter`]) create the output tree.
//! The rest of the crate never talks to a storage API directly.

use std::{any::Any, collections::BTreeMap, fmt, path::{Path,PathBuf}};
use serde::{Serialize,Deserialize};
use odin_common::fs::extension;

use crate::config::ProductLayout;
use crate::errors::{Result, missing_field, not_found, shape_mismatch, unsupported_format};
use crate::planner::{RecordIndexSet, RowRun};

pub mod mem;
pub use mem::{MemContainer, MemGroup, MemNode, MemField, MemReader, MemWriter};

#[cfg(feature="hdf5")]
pub mod h5;

/* #region values ***********************************************************************************************/

/// character set of stored strings
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,Default)]
pub enum CharSet {
    #[default]
    Ascii,
    Utf8,
}

#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
pub enum ElementType { I8, U8, I16, U16, I32, U32, I64, U64, F32, F64, Text, AsciiText, FixedText(usize,CharSet) }

impl ElementType {
    pub fn is_numeric (&self)->bool {
        !matches!( self, ElementType::Text | ElementType::AsciiText | ElementType::FixedText(..))
    }
}

/// homogeneous value vector. Multi-column data is stored row-major
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub enum Values {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// variable length UTF-8 strings
    Text(Vec<String>),
    /// variable length ASCII strings
    AsciiText(Vec<String>),
    /// fixed length strings (kept separate so that we can write them back with the same storage type)
    FixedText {
        size: usize,
        values: Vec<String>,
        #[serde(default)]
        cset: CharSet,
    },
}

/// apply an expression to the inner vec of a `&Values`, producing a new `Values` of the same variant
macro_rules! map_values {
    ($values:expr, $v:ident => $e:expr) => {
        match $values {
            Values::I8($v) => Values::I8($e),
            Values::U8($v) => Values::U8($e),
            Values::I16($v) => Values::I16($e),
            Values::U16($v) => Values::U16($e),
            Values::I32($v) => Values::I32($e),
            Values::U32($v) => Values::U32($e),
            Values::I64($v) => Values::I64($e),
            Values::U64($v) => Values::U64($e),
            Values::F32($v) => Values::F32($e),
            Values::F64($v) => Values::F64($e),
            Values::Text($v) => Values::Text($e),
            Values::AsciiText($v) => Values::AsciiText($e),
            Values::FixedText{size,values:$v,cset} => Values::FixedText{ size: *size, values: $e, cset: *cset },
        }
    }
}

/// evaluate an expression for the inner vec of a `&Values`
macro_rules! with_values {
    ($values:expr, $v:ident => $e:expr) => {
        match $values {
            Values::I8($v) => $e,
            Values::U8($v) => $e,
            Values::I16($v) => $e,
            Values::U16($v) => $e,
            Values::I32($v) => $e,
            Values::U32($v) => $e,
            Values::I64($v) => $e,
            Values::U64($v) => $e,
            Values::F32($v) => $e,
            Values::F64($v) => $e,
            Values::Text($v) => $e,
            Values::AsciiText($v) => $e,
            Values::FixedText{values:$v,..} => $e,
        }
    }
}

fn gather<T: Clone> (v: &[T], rows: &[usize], cols: usize)->Vec<T> {
    let mut res = Vec::with_capacity( rows.len() * cols);
    for &r in rows {
        res.extend_from_slice( &v[r*cols .. (r+1)*cols]);
    }
    res
}

impl Values {
    pub fn len (&self)->usize { with_values!( self, v => v.len()) }

    pub fn is_empty (&self)->bool { self.len() == 0 }

    pub fn element_type (&self)->ElementType {
        match self {
            Values::I8(_) => ElementType::I8,
            Values::U8(_) => ElementType::U8,
            Values::I16(_) => ElementType::I16,
            Values::U16(_) => ElementType::U16,
            Values::I32(_) => ElementType::I32,
            Values::U32(_) => ElementType::U32,
            Values::I64(_) => ElementType::I64,
            Values::U64(_) => ElementType::U64,
            Values::F32(_) => ElementType::F32,
            Values::F64(_) => ElementType::F64,
            Values::Text(_) => ElementType::Text,
            Values::AsciiText(_) => ElementType::AsciiText,
            Values::FixedText{size,cset,..} => ElementType::FixedText(*size, *cset),
        }
    }

    /// an empty vector of the given element type
    pub fn empty (et: ElementType)->Values {
        match et {
            ElementType::I8 => Values::I8(vec![]),
            ElementType::U8 => Values::U8(vec![]),
            ElementType::I16 => Values::I16(vec![]),
            ElementType::U16 => Values::U16(vec![]),
            ElementType::I32 => Values::I32(vec![]),
            ElementType::U32 => Values::U32(vec![]),
            ElementType::I64 => Values::I64(vec![]),
            ElementType::U64 => Values::U64(vec![]),
            ElementType::F32 => Values::F32(vec![]),
            ElementType::F64 => Values::F64(vec![]),
            ElementType::Text => Values::Text(vec![]),
            ElementType::AsciiText => Values::AsciiText(vec![]),
            ElementType::FixedText(size,cset) => Values::FixedText{ size, values: vec![], cset },
        }
    }

    /// copy of the given rows (each `cols` elements wide). Row indices have to be in range
    pub fn gather_rows (&self, rows: &[usize], cols: usize)->Values {
        map_values!( self, v => gather( v, rows, cols))
    }

    /// copy of the inclusive row range `start..=end` (each row `cols` elements wide)
    pub fn slice_rows (&self, start: usize, end: usize, cols: usize)->Values {
        map_values!( self, v => v[start*cols .. (end+1)*cols].to_vec())
    }

    /// append values of the same element type
    pub fn extend (&mut self, other: Values)->Result<()> {
        match (self, other) {
            (Values::I8(a), Values::I8(b)) => a.extend(b),
            (Values::U8(a), Values::U8(b)) => a.extend(b),
            (Values::I16(a), Values::I16(b)) => a.extend(b),
            (Values::U16(a), Values::U16(b)) => a.extend(b),
            (Values::I32(a), Values::I32(b)) => a.extend(b),
            (Values::U32(a), Values::U32(b)) => a.extend(b),
            (Values::I64(a), Values::I64(b)) => a.extend(b),
            (Values::U64(a), Values::U64(b)) => a.extend(b),
            (Values::F32(a), Values::F32(b)) => a.extend(b),
            (Values::F64(a), Values::F64(b)) => a.extend(b),
            (Values::Text(a), Values::Text(b)) => a.extend(b),
            (Values::AsciiText(a), Values::AsciiText(b)) => a.extend(b),
            (Values::FixedText{size:sa, values:a, cset:ca}, Values::FixedText{size:sb, values:b, cset:cb}) if *sa == sb && *ca == cb => a.extend(b),
            (a, b) => return Err( shape_mismatch( format!("cannot append {:?} to {:?}", b.element_type(), a.element_type())))
        }
        Ok(())
    }

    /// numeric values as f64 (None for text)
    pub fn to_f64_vec (&self)->Option<Vec<f64>> {
        match self {
            Values::I8(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::U8(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::I16(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::U16(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::I32(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::U32(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::I64(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::U64(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::F32(v) => Some( v.iter().map(|x| *x as f64).collect()),
            Values::F64(v) => Some( v.clone()),
            Values::Text(_) | Values::AsciiText(_) | Values::FixedText{..} => None
        }
    }
}

/* #endregion values */

/* #region fields and attributes ********************************************************************************/

#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq)]
pub enum FieldKind {
    /// one value per row
    Scalar,
    /// a fixed number of values per row
    MultiColumn(usize),
}

impl FieldKind {
    pub fn cols (&self)->usize {
        match self {
            FieldKind::Scalar => 1,
            FieldKind::MultiColumn(n) => *n,
        }
    }
}

/// field values together with their row shape
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct FieldData {
    pub kind: FieldKind,
    pub values: Values,
}

impl FieldData {
    pub fn scalar (values: Values)->Self {
        FieldData { kind: FieldKind::Scalar, values }
    }

    pub fn multi_column (cols: usize, values: Values)->Result<Self> {
        let data = FieldData { kind: FieldKind::MultiColumn(cols), values };
        data.check_shape()?;
        Ok(data)
    }

    /// values have to fill a whole number of rows of at least one column
    pub fn check_shape (&self)->Result<()> {
        let cols = self.kind.cols();
        if cols == 0 || self.values.len() % cols != 0 {
            Err( shape_mismatch( format!("{} values do not fit {} columns", self.values.len(), cols)))
        } else {
            Ok(())
        }
    }

    pub fn row_count (&self)->usize { self.values.len() / self.kind.cols().max(1) }

    pub fn element_type (&self)->ElementType { self.values.element_type() }

    /// the data for a given selection, which has to be within `0..row_count()`
    pub fn select (&self, selection: &RowSelection)->Result<FieldData> {
        let cols = self.kind.cols();
        let n = self.row_count();
        let values = match selection {
            RowSelection::All => self.values.clone(),
            RowSelection::Rows(set) => {
                if let Some(last) = set.last() {
                    if last >= n { return Err( shape_mismatch( format!("row {} out of range 0..{}", last, n))) }
                }
                self.values.gather_rows( set.as_slice(), cols)
            }
            RowSelection::Range(run) => {
                if run.end >= n || run.start > run.end {
                    return Err( shape_mismatch( format!("row range {} out of range 0..{}", run, n)))
                }
                self.values.slice_rows( run.start, run.end, cols)
            }
        };
        Ok( FieldData { kind: self.kind, values } )
    }

    /// append rows of a compatible field
    pub fn extend (&mut self, other: FieldData)->Result<()> {
        if self.kind != other.kind {
            return Err( shape_mismatch( format!("cannot append {:?} rows to {:?} field", other.kind, self.kind)))
        }
        self.values.extend( other.values)
    }
}

/// attribute value. Empty `dims` means the attribute is a scalar
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct AttrValue {
    pub values: Values,
    #[serde(default)]
    pub dims: Vec<usize>,
}

impl AttrValue {
    pub fn scalar (values: Values)->Self { AttrValue { values, dims: vec![] } }

    pub fn array (values: Values)->Self {
        let dims = vec![ values.len() ];
        AttrValue { values, dims }
    }

    pub fn text (s: &str)->Self { Self::scalar( Values::Text( vec![ s.to_string() ])) }
}

pub type Attributes = BTreeMap<String,AttrValue>;

/// what the uniform tree walk reports for each field of a beam
#[derive(Debug,Clone,PartialEq)]
pub struct FieldDescriptor {
    /// absolute path of the field within the container (e.g. `/BEAM0000/agbd_prediction/agbd_a1`)
    pub path: String,
    pub kind: FieldKind,
    pub element: ElementType,
    pub row_count: usize,
    pub attributes: Attributes,
}

impl FieldDescriptor {
    pub fn name (&self)->&str { leaf_name( &self.path) }

    /// path relative to the given group (e.g. `agbd_prediction/agbd_a1` for beam `BEAM0000`)
    pub fn relative_path (&self, group: &str)->&str {
        let group = group.trim_matches('/');
        let p = self.path.trim_start_matches('/');
        p.strip_prefix( group).map( |r| r.trim_start_matches('/')).unwrap_or(p)
    }

    /// nesting depth below the given group (0 for fields that are direct group members)
    pub fn depth (&self, group: &str)->usize {
        self.relative_path(group).matches('/').count()
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum MemberKind { Group, Field }

#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
}

/// which rows of a field to read
#[derive(Debug,Clone,Copy)]
pub enum RowSelection<'a> {
    All,
    Rows(&'a RecordIndexSet),
    Range(RowRun),
}

/* #endregion fields and attributes */

/* #region paths ************************************************************************************************/

pub fn join_path (parent: &str, name: &str)->String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{parent}/{name}")
}

pub fn leaf_name (path: &str)->&str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// the parent group path ("/" for top level objects)
pub fn parent_path (path: &str)->&str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx]
    }
}

/// non-empty path elements
pub fn path_elements (path: &str)->impl Iterator<Item=&str> {
    path.split('/').filter( |s| !s.is_empty())
}

/* #endregion paths */

/* #region reader and writer traits *****************************************************************************/

/// the supported container backends, derived from the file extension
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ContainerKind {
    /// HDF5 / netCDF-4 files
    Hdf5,
    /// RON serialization of the container tree
    Snapshot,
}

impl ContainerKind {
    pub fn from_path (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref();
        match extension(&path).map( |e| e.to_ascii_lowercase()).as_deref() {
            Some("h5" | "hdf5" | "he5" | "nc" | "nc4") => Ok(ContainerKind::Hdf5),
            Some("ron") => Ok(ContainerKind::Snapshot),
            _ => Err( unsupported_format( format!("unknown container file type {:?}", path)))
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        match self {
            ContainerKind::Hdf5 => write!(f, "HDF5"),
            ContainerKind::Snapshot => write!(f, "RON snapshot"),
        }
    }
}

/// backend primitives of a read-only container. Paths are absolute, with "/" denoting the root group
pub trait ContainerReader {
    fn path (&self)->&Path;

    fn kind (&self)->ContainerKind;

    /// direct members of a group in storage order
    fn members (&self, group: &str)->Result<Vec<Member>>;

    /// shape, element type and attributes of a field. Fails with `MissingField` if there is no such field
    fn describe (&self, path: &str)->Result<FieldDescriptor>;

    fn group_attributes (&self, group: &str)->Result<Attributes>;

    /// read the selected rows of a field without materializing the whole column if the backend supports it
    fn read_rows (&self, path: &str, selection: &RowSelection)->Result<FieldData>;

    /// does this source favor few ranged reads over a single scattered read (e.g. because cost scales with
    /// the number of calls)
    fn prefers_ranged_reads (&self)->bool { false }

    fn as_any (&self)->&dyn Any;

    fn has_group (&self, path: &str)->bool {
        let name = leaf_name(path);
        self.members( parent_path(path))
            .map( |members| members.iter().any( |m| m.kind == MemberKind::Group && m.name == name))
            .unwrap_or(false)
    }
}

/// backend primitives of an output container
pub trait ContainerWriter {
    fn path (&self)->&Path;

    fn kind (&self)->ContainerKind;

    /// create group and all missing parents if it does not exist yet
    fn require_group (&mut self, path: &str)->Result<()>;

    fn set_group_attributes (&mut self, path: &str, attrs: &Attributes)->Result<()>;

    /// create a new field with the given data and attributes. The parent group has to exist
    fn write_field (&mut self, path: &str, data: &FieldData, attrs: &Attributes)->Result<()>;

    /// remove a group or field (e.g. a partially written beam)
    fn remove (&mut self, path: &str)->Result<()>;

    /// copy a complete group subtree from `src` into the same location of this container
    fn copy_subtree (&mut self, src: &dyn ContainerReader, path: &str)->Result<()> {
        copy_subtree_structural( self, src, path)
    }

    /// flush and close. After this the file is a valid container
    fn close (self: Box<Self>)->Result<()>;
}

/// backend independent subtree copy: groups, group attributes, fields and field attributes
pub fn copy_subtree_structural<W> (writer: &mut W, src: &dyn ContainerReader, path: &str)->Result<()> where W: ContainerWriter + ?Sized {
    writer.require_group( path)?;
    writer.set_group_attributes( path, &src.group_attributes( path)?)?;

    for m in src.members( path)? {
        let member_path = join_path( path, &m.name);
        match m.kind {
            MemberKind::Group => copy_subtree_structural( writer, src, &member_path)?,
            MemberKind::Field => {
                let desc = src.describe( &member_path)?;
                let data = src.read_rows( &member_path, &RowSelection::All)?;
                writer.write_field( &member_path, &data, &desc.attributes)?;
            }
        }
    }
    Ok(())
}

/// open a container for reading, choosing the backend by file extension
pub fn open_container (path: impl AsRef<Path>)->Result<Box<dyn ContainerReader>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err( not_found( format!("container file {:?}", path)))
    }

    match ContainerKind::from_path(path)? {
        ContainerKind::Snapshot => Ok( Box::new( MemReader::open(path)?)),

        #[cfg(feature="hdf5")]
        ContainerKind::Hdf5 => Ok( Box::new( h5::H5Reader::open(path)?)),
        #[cfg(not(feature="hdf5"))]
        ContainerKind::Hdf5 => Err( unsupported_format("HDF5 support not enabled (build with feature 'hdf5')")),
    }
}

/// create (or truncate) an output container of the given kind
pub fn create_container (path: impl AsRef<Path>, kind: ContainerKind)->Result<Box<dyn ContainerWriter>> {
    let path = path.as_ref();
    match kind {
        ContainerKind::Snapshot => Ok( Box::new( MemWriter::create(path)?)),

        #[cfg(feature="hdf5")]
        ContainerKind::Hdf5 => Ok( Box::new( h5::H5Writer::create(path)?)),
        #[cfg(not(feature="hdf5"))]
        ContainerKind::Hdf5 => Err( unsupported_format("HDF5 support not enabled (build with feature 'hdf5')")),
    }
}

/* #endregion reader and writer traits */

/* #region uniform operations ***********************************************************************************/

/// names of top level beam groups, in storage order
pub fn list_beams (reader: &dyn ContainerReader, layout: &ProductLayout)->Result<Vec<String>> {
    Ok( reader.members("/")?.into_iter()
        .filter( |m| m.kind == MemberKind::Group && layout.is_beam( &m.name))
        .map( |m| m.name)
        .collect()
    )
}

/// aligned (lon,lat) arrays of a beam. Fails with `MissingField` if any of them is absent
pub fn row_coordinates (reader: &dyn ContainerReader, beam: &str, layout: &ProductLayout)->Result<(Vec<f64>,Vec<f64>)> {
    let lon = coordinate_values( reader, beam, &layout.lon_field)?;
    let lat = coordinate_values( reader, beam, &layout.lat_field)?;
    if lon.len() != lat.len() {
        return Err( shape_mismatch( format!("{} has {} longitudes but {} latitudes", beam, lon.len(), lat.len())))
    }
    Ok( (lon, lat) )
}

fn coordinate_values (reader: &dyn ContainerReader, beam: &str, field: &str)->Result<Vec<f64>> {
    let path = join_path( &join_path("/", beam), field);
    let desc = reader.describe( &path)?;
    if desc.kind != FieldKind::Scalar {
        return Err( shape_mismatch( format!("coordinate field {path} is not one dimensional")))
    }
    let data = reader.read_rows( &path, &RowSelection::All)?;
    data.values.to_f64_vec().ok_or_else( || missing_field( format!("{path} is not numeric")))
}

/// start a new (lazy) depth-first walk over all fields below the given group (usually a beam)
pub fn walk_fields<'a> (reader: &'a dyn ContainerReader, group: &str)->FieldWalk<'a> {
    let root = if group.starts_with('/') { group.to_string() } else { join_path("/", group) };
    FieldWalk { reader, pending: vec![ (root, MemberKind::Group) ] }
}

/// iterator over the field descriptors of a subtree, in storage order with nested groups expanded in place.
/// Groups are only listed when the walk reaches them. Errors are reported as items, the walk continues
/// with the next pending node
pub struct FieldWalk<'a> {
    reader: &'a dyn ContainerReader,
    pending: Vec<(String,MemberKind)>, // stack, next node on top
}

impl<'a> Iterator for FieldWalk<'a> {
    type Item = Result<FieldDescriptor>;

    fn next (&mut self)->Option<Self::Item> {
        while let Some((path,kind)) = self.pending.pop() {
            match kind {
                MemberKind::Field => return Some( self.reader.describe( &path)),
                MemberKind::Group => {
                    match self.reader.members( &path) {
                        Ok(members) => {
                            for m in members.into_iter().rev() {
                                self.pending.push( (join_path( &path, &m.name), m.kind));
                            }
                        }
                        Err(e) => return Some(Err(e))
                    }
                }
            }
        }
        None
    }
}

/* #endregion uniform operations */
