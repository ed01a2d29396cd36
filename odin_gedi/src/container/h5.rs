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

//! HDF5 (and netCDF-4) container backend based on the `hdf5` crate.
//!
//! Fixed length strings are read and written through the raw `hdf5-sys` API since their size is only known at runtime.
//! Whole subtrees between HDF5 files are copied with `H5Ocopy`, which preserves storage layout, filters and all
//! attributes.

use std::{any::Any, ffi::{c_int, CString}, fmt::Display, path::{Path,PathBuf}, ptr, str::FromStr};
use hdf5::{Container, Dataset, Datatype, File, Group, H5Type, Location};
use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5_sys::{
    h5::hsize_t, h5a::{H5Aread, H5Awrite}, h5d::{H5Dget_space, H5Dread, H5Dwrite}, h5o::H5Ocopy, h5p::H5P_DEFAULT,
    h5s::{H5Sclose, H5Screate_simple, H5Sselect_hyperslab, H5S_seloper_t, H5S_ALL}
};
use ndarray::{s, ArrayViewD, IxDyn};
use tracing::debug;

use crate::errors::{OdinGediError, Result, corrupt_format, missing_field, not_found, op_failed, shape_mismatch, unsupported_type};
use super::{
    copy_subtree_structural, leaf_name, parent_path, path_elements, AttrValue, Attributes, ContainerKind, ContainerReader,
    CharSet, ContainerWriter, ElementType, FieldData, FieldDescriptor, FieldKind, Member, MemberKind, RowSelection, Values
};

/// row range (end exclusive) we read from a container
#[derive(Debug,Clone,Copy)]
enum Slab { All, Rows(usize,usize) }

/// raw API read/write dispatch
#[derive(Debug,Clone,Copy)]
enum RawTarget { Dataset, Attribute }

fn read_slab<T: H5Type + Clone> (c: &Container, slab: Slab)->Result<Vec<T>> {
    match slab {
        Slab::All => Ok( c.read_raw::<T>()? ),
        Slab::Rows(start,end) => match c.ndim() {
            1 => Ok( c.read_slice_1d::<T,_>( s![start..end])?.to_vec() ),
            2 => Ok( c.read_slice_2d::<T,_>( s![start..end, ..])?.iter().cloned().collect() ),
            n => Err( unsupported_type( format!("{n} dimensional field")))
        }
    }
}

fn trim_nul (bytes: &[u8])->&[u8] {
    let len = bytes.iter().position( |b| *b == 0).unwrap_or( bytes.len());
    &bytes[..len]
}

fn read_fixed_strings (c: &Container, target: RawTarget, size: usize, slab: Slab)->Result<Vec<String>> {
    let dtype = c.dtype()?;
    let buf = match (target, slab) {
        (RawTarget::Dataset, Slab::Rows(start,end)) => read_fixed_rows( c, &dtype, size, start, end)?,
        _ => {
            let mut buf = vec![0u8; c.size() * size];
            let rc = unsafe {
                match target {
                    RawTarget::Dataset => H5Dread( c.id(), dtype.id(), H5S_ALL, H5S_ALL, H5P_DEFAULT, buf.as_mut_ptr().cast()),
                    RawTarget::Attribute => H5Aread( c.id(), dtype.id(), buf.as_mut_ptr().cast()),
                }
            };
            if rc < 0 { return Err( op_failed("reading fixed length strings failed")) }
            buf
        }
    };

    Ok( buf.chunks( size.max(1)).map( |chunk| String::from_utf8_lossy( trim_nul(chunk)).to_string()).collect() )
}

/// raw bytes of the fixed length string rows `start..end`, read through a hyperslab selection of the file space
fn read_fixed_rows (c: &Container, dtype: &Datatype, size: usize, start: usize, end: usize)->Result<Vec<u8>> {
    let shape = c.shape();
    if shape.is_empty() { return Err( unsupported_type("row selection of scalar string field")) }

    let mut offset: Vec<hsize_t> = vec![0; shape.len()];
    let mut count: Vec<hsize_t> = shape.iter().map( |d| *d as hsize_t).collect();
    offset[0] = start as hsize_t;
    count[0] = end.saturating_sub(start) as hsize_t;

    let n: usize = count.iter().map( |d| *d as usize).product();
    let mut buf = vec![0u8; n * size];
    if n == 0 { return Ok(buf) }

    let rc = unsafe {
        let file_space = H5Dget_space( c.id());
        if file_space < 0 { return Err( op_failed("no dataspace for fixed length strings")) }
        let mem_space = H5Screate_simple( count.len() as c_int, count.as_ptr(), ptr::null());

        let mut rc = if mem_space < 0 { -1 } else {
            H5Sselect_hyperslab( file_space, H5S_seloper_t::H5S_SELECT_SET, offset.as_ptr(), ptr::null(), count.as_ptr(), ptr::null())
        };
        if rc >= 0 {
            rc = H5Dread( c.id(), dtype.id(), mem_space, file_space, H5P_DEFAULT, buf.as_mut_ptr().cast());
        }

        if mem_space >= 0 { H5Sclose( mem_space); }
        H5Sclose( file_space);
        rc
    };
    if rc < 0 { return Err( op_failed( format!("reading fixed length string rows {start}..{end} failed"))) }

    Ok(buf)
}

fn read_values (c: &Container, target: RawTarget, slab: Slab)->Result<Values> {
    let desc = c.dtype()?.to_descriptor()?;
    let values = match desc {
        TypeDescriptor::Integer(IntSize::U1) => Values::I8( read_slab( c, slab)?),
        TypeDescriptor::Integer(IntSize::U2) => Values::I16( read_slab( c, slab)?),
        TypeDescriptor::Integer(IntSize::U4) => Values::I32( read_slab( c, slab)?),
        TypeDescriptor::Integer(IntSize::U8) => Values::I64( read_slab( c, slab)?),
        TypeDescriptor::Unsigned(IntSize::U1) => Values::U8( read_slab( c, slab)?),
        TypeDescriptor::Unsigned(IntSize::U2) => Values::U16( read_slab( c, slab)?),
        TypeDescriptor::Unsigned(IntSize::U4) => Values::U32( read_slab( c, slab)?),
        TypeDescriptor::Unsigned(IntSize::U8) => Values::U64( read_slab( c, slab)?),
        TypeDescriptor::Float(FloatSize::U4) => Values::F32( read_slab( c, slab)?),
        TypeDescriptor::Float(FloatSize::U8) => Values::F64( read_slab( c, slab)?),
        TypeDescriptor::VarLenUnicode => {
            Values::Text( read_slab::<VarLenUnicode>( c, slab)?.iter().map( |s| s.as_str().to_string()).collect())
        }
        TypeDescriptor::VarLenAscii => {
            Values::AsciiText( read_slab::<VarLenAscii>( c, slab)?.iter().map( |s| s.as_str().to_string()).collect())
        }
        TypeDescriptor::FixedAscii(size) => {
            Values::FixedText { size, values: read_fixed_strings( c, target, size, slab)?, cset: CharSet::Ascii }
        }
        TypeDescriptor::FixedUnicode(size) => {
            Values::FixedText { size, values: read_fixed_strings( c, target, size, slab)?, cset: CharSet::Utf8 }
        }
        other => return Err( unsupported_type( format!("{other:?}")))
    };
    Ok(values)
}

fn field_kind (shape: &[usize])->Result<(FieldKind,usize)> {
    match shape {
        [] => Ok( (FieldKind::Scalar, 1) ),
        [rows] => Ok( (FieldKind::Scalar, *rows) ),
        [_, 0] => Err( corrupt_format( "two-dimensional field without columns")),
        [rows, cols] => Ok( (FieldKind::MultiColumn(*cols), *rows) ),
        _ => Err( unsupported_type( format!("{}-dimensional field", shape.len())))
    }
}

/// all attributes of a group or dataset. An attribute we cannot represent fails the whole object, since we
/// could not write it back
fn read_attributes (loc: &Location)->Result<Attributes> {
    let mut attrs = Attributes::new();
    for name in loc.attr_names()? {
        let attr = loc.attr( &name)?;
        let values = read_values( &attr, RawTarget::Attribute, Slab::All).map_err( |e| match e {
            OdinGediError::UnsupportedType(msg) => unsupported_type( format!("attribute {} of {}: {}", name, loc.name(), msg)),
            e => e
        })?;
        attrs.insert( name, AttrValue { values, dims: attr.shape() });
    }
    Ok(attrs)
}

/* #region reader ***********************************************************************************************/

pub struct H5Reader {
    path: PathBuf,
    file: File,
}

impl H5Reader {
    pub fn open (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open( &path).map_err( |e| corrupt_format( format!("{:?}: {}", path, e)))?;
        debug!("opened HDF5 container {:?}", path);
        Ok( H5Reader { path, file } )
    }

    pub fn file (&self)->&File { &self.file }

    fn group (&self, path: &str)->Result<Group> {
        self.file.group( path).map_err( |_| not_found( format!("group {} in {:?}", path, self.path)))
    }

    fn dataset (&self, path: &str)->Result<Dataset> {
        self.file.dataset( path).map_err( |_| missing_field( format!("{} in {:?}", path, self.path)))
    }
}

impl ContainerReader for H5Reader {
    fn path (&self)->&Path { &self.path }

    fn kind (&self)->ContainerKind { ContainerKind::Hdf5 }

    fn members (&self, group: &str)->Result<Vec<Member>> {
        let g = self.group( group)?;
        let mut members = Vec::new();
        for name in g.member_names()? {
            let kind = if g.group( &name).is_ok() { MemberKind::Group } else { MemberKind::Field };
            members.push( Member { name, kind });
        }
        Ok(members)
    }

    fn describe (&self, path: &str)->Result<FieldDescriptor> {
        let ds = self.dataset( path)?;
        let (kind, row_count) = field_kind( &ds.shape())?;
        let element = match ds.dtype()?.to_descriptor()? {
            TypeDescriptor::Integer(IntSize::U1) => ElementType::I8,
            TypeDescriptor::Integer(IntSize::U2) => ElementType::I16,
            TypeDescriptor::Integer(IntSize::U4) => ElementType::I32,
            TypeDescriptor::Integer(IntSize::U8) => ElementType::I64,
            TypeDescriptor::Unsigned(IntSize::U1) => ElementType::U8,
            TypeDescriptor::Unsigned(IntSize::U2) => ElementType::U16,
            TypeDescriptor::Unsigned(IntSize::U4) => ElementType::U32,
            TypeDescriptor::Unsigned(IntSize::U8) => ElementType::U64,
            TypeDescriptor::Float(FloatSize::U4) => ElementType::F32,
            TypeDescriptor::Float(FloatSize::U8) => ElementType::F64,
            TypeDescriptor::VarLenUnicode => ElementType::Text,
            TypeDescriptor::VarLenAscii => ElementType::AsciiText,
            TypeDescriptor::FixedAscii(size) => ElementType::FixedText(size, CharSet::Ascii),
            TypeDescriptor::FixedUnicode(size) => ElementType::FixedText(size, CharSet::Utf8),
            other => return Err( unsupported_type( format!("{path}: {other:?}")))
        };
        let attributes = read_attributes( &ds)?;

        Ok( FieldDescriptor { path: path.to_string(), kind, element, row_count, attributes } )
    }

    fn group_attributes (&self, group: &str)->Result<Attributes> {
        read_attributes( &self.group( group)?)
    }

    fn read_rows (&self, path: &str, selection: &RowSelection)->Result<FieldData> {
        let ds = self.dataset( path)?;
        let shape = ds.shape();
        let (kind, row_count) = field_kind( &shape)?;
        let check = |last: usize| -> Result<()> {
            if last >= row_count { Err( shape_mismatch( format!("row {last} out of range 0..{row_count} in {path}"))) } else { Ok(()) }
        };

        let values = match selection {
            RowSelection::All => read_values( &ds, RawTarget::Dataset, Slab::All)?,
            RowSelection::Range(run) => {
                check( run.end)?;
                read_values( &ds, RawTarget::Dataset, Slab::Rows( run.start, run.end+1))?
            }
            RowSelection::Rows(set) => match (set.first(), set.last()) {
                (Some(first), Some(last)) => {
                    check( last)?;
                    // one read over the covered span, then pick the selected rows
                    let span = read_values( &ds, RawTarget::Dataset, Slab::Rows( first, last+1))?;
                    let rel: Vec<usize> = set.iter().map( |i| i - first).collect();
                    span.gather_rows( &rel, kind.cols())
                }
                _ => Values::empty( describe_element( &ds)?)
            }
        };

        Ok( FieldData { kind, values } )
    }

    fn as_any (&self)->&dyn Any { self }
}

fn describe_element (ds: &Dataset)->Result<ElementType> {
    Ok( read_values( ds, RawTarget::Dataset, Slab::Rows(0,0))?.element_type() )
}

/* #endregion reader */

/* #region writer ***********************************************************************************************/

macro_rules! create_typed {
    ($builder:expr, $v:expr, $dims:expr, $name:expr) => {{
        let view = ArrayViewD::from_shape( IxDyn($dims), $v.as_slice()).map_err( |e| shape_mismatch(e))?;
        $builder.with_data( view).create( $name)?
    }}
}

/// `VarLenUnicode` or `VarLenAscii` values
fn to_varlen<T> (values: &[String])->Result<Vec<T>> where T: FromStr, T::Err: Display {
    values.iter()
        .map( |s| s.parse::<T>().map_err( |e| op_failed( format!("invalid string {s:?}: {e}"))))
        .collect()
}

fn fixed_descriptor (size: usize, cset: CharSet)->TypeDescriptor {
    match cset {
        CharSet::Ascii => TypeDescriptor::FixedAscii(size),
        CharSet::Utf8 => TypeDescriptor::FixedUnicode(size),
    }
}

fn to_fixed_bytes (values: &[String], size: usize)->Vec<u8> {
    let mut buf = vec![0u8; values.len() * size];
    for (i,s) in values.iter().enumerate() {
        let bytes = s.as_bytes();
        let n = bytes.len().min(size);
        buf[i*size .. i*size + n].copy_from_slice( &bytes[..n]);
    }
    buf
}

fn create_dataset (group: &Group, name: &str, values: &Values, dims: &[usize])->Result<Dataset> {
    let ds = match values {
        Values::I8(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::U8(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::I16(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::U16(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::I32(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::U32(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::I64(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::U64(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::F32(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::F64(v) => create_typed!( group.new_dataset_builder(), v, dims, name),
        Values::Text(v) => {
            let v = to_varlen::<VarLenUnicode>( v)?;
            create_typed!( group.new_dataset_builder(), v, dims, name)
        }
        Values::AsciiText(v) => {
            let v = to_varlen::<VarLenAscii>( v)?;
            create_typed!( group.new_dataset_builder(), v, dims, name)
        }
        Values::FixedText{size,values,cset} => {
            let ds = group.new_dataset_builder().empty_as( &fixed_descriptor( *size, *cset)).shape( dims.to_vec()).create( name)?;
            let buf = to_fixed_bytes( values, *size);
            let dtype = ds.dtype()?;
            let rc = unsafe { H5Dwrite( ds.id(), dtype.id(), H5S_ALL, H5S_ALL, H5P_DEFAULT, buf.as_ptr().cast()) };
            if rc < 0 { return Err( op_failed( format!("writing fixed length strings of {name} failed"))) }
            ds
        }
    };
    Ok(ds)
}

fn create_attribute (loc: &Location, name: &str, attr: &AttrValue)->Result<()> {
    let dims = attr.dims.as_slice();
    match &attr.values {
        Values::I8(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::U8(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::I16(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::U16(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::I32(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::U32(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::I64(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::U64(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::F32(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::F64(v) => { create_typed!( loc.new_attr_builder(), v, dims, name); }
        Values::Text(v) => {
            let v = to_varlen::<VarLenUnicode>( v)?;
            create_typed!( loc.new_attr_builder(), v, dims, name);
        }
        Values::AsciiText(v) => {
            let v = to_varlen::<VarLenAscii>( v)?;
            create_typed!( loc.new_attr_builder(), v, dims, name);
        }
        Values::FixedText{size,values,cset} => {
            let a = loc.new_attr_builder().empty_as( &fixed_descriptor( *size, *cset)).shape( dims.to_vec()).create( name)?;
            let buf = to_fixed_bytes( values, *size);
            let dtype = a.dtype()?;
            let rc = unsafe { H5Awrite( a.id(), dtype.id(), buf.as_ptr().cast()) };
            if rc < 0 { return Err( op_failed( format!("writing fixed length string attribute {name} failed"))) }
        }
    }
    Ok(())
}

pub struct H5Writer {
    path: PathBuf,
    file: File,
}

impl H5Writer {
    /// create (or truncate) a HDF5 file
    pub fn create (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create( &path)?;
        Ok( H5Writer { path, file } )
    }

    fn group (&self, path: &str)->Result<Group> {
        self.file.group( path).map_err( |_| not_found( format!("group {} in {:?}", path, self.path)))
    }
}

impl ContainerWriter for H5Writer {
    fn path (&self)->&Path { &self.path }

    fn kind (&self)->ContainerKind { ContainerKind::Hdf5 }

    fn require_group (&mut self, path: &str)->Result<()> {
        let mut group = self.file.group("/")?;
        for name in path_elements( path) {
            group = if group.link_exists( name) { group.group( name)? } else { group.create_group( name)? };
        }
        Ok(())
    }

    fn set_group_attributes (&mut self, path: &str, attrs: &Attributes)->Result<()> {
        let group = self.group( path)?;
        for (name,attr) in attrs {
            create_attribute( &group, name, attr)?;
        }
        Ok(())
    }

    fn write_field (&mut self, path: &str, data: &FieldData, attrs: &Attributes)->Result<()> {
        let parent = self.group( parent_path( path))?;
        let dims = match data.kind {
            FieldKind::Scalar => vec![ data.row_count() ],
            FieldKind::MultiColumn(cols) => vec![ data.row_count(), cols ],
        };
        let ds = create_dataset( &parent, leaf_name( path), &data.values, &dims)?;
        for (name,attr) in attrs {
            create_attribute( &ds, name, attr)?;
        }
        Ok(())
    }

    fn remove (&mut self, path: &str)->Result<()> {
        let parent = self.group( parent_path( path))?;
        let name = leaf_name( path);
        if parent.link_exists( name) {
            parent.unlink( name)?;
        }
        Ok(())
    }

    fn copy_subtree (&mut self, src: &dyn ContainerReader, path: &str)->Result<()> {
        if let Some(h5src) = src.as_any().downcast_ref::<H5Reader>() {
            self.require_group( parent_path( path))?;
            let name = CString::new( path).map_err( |e| op_failed(e))?;
            let rc = unsafe { H5Ocopy( h5src.file.id(), name.as_ptr(), self.file.id(), name.as_ptr(), H5P_DEFAULT, H5P_DEFAULT) };
            if rc < 0 {
                Err( op_failed( format!("H5Ocopy of {} from {:?} failed", path, h5src.path)))
            } else {
                Ok(())
            }
        } else {
            copy_subtree_structural( self, src, path)
        }
    }

    fn close (self: Box<Self>)->Result<()> {
        self.file.flush()?;
        self.file.close()?;
        Ok(())
    }
}

/* #endregion writer */
