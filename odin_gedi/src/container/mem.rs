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

//! in-memory container tree that can be saved to / loaded from RON files.
//!
//! This is the portable backend we use for container snapshots (`*.ron`) and test fixtures. Group members are
//! kept in a BTreeMap, i.e. storage order is name order (which is also the default link order of HDF5 groups)

use std::{any::Any, collections::BTreeMap, fs::File, io::Write, path::{Path,PathBuf}};
use serde::{Serialize,Deserialize};
use ron::ser::PrettyConfig;
use odin_common::fs::filepath_contents_as_string;
use tracing::debug;

use crate::errors::{Result, corrupt_format, missing_field, not_found, op_failed};
use super::{
    path_elements, leaf_name, parent_path, Attributes, ContainerKind, ContainerReader, ContainerWriter, FieldData,
    FieldDescriptor, Member, MemberKind, RowSelection
};

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Default)]
pub struct MemGroup {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub members: BTreeMap<String,MemNode>,
}

impl MemGroup {
    /// recursively check that all field values fill whole rows
    fn check_shapes (&self, file: &Path, path: &str)->Result<()> {
        for (name, node) in &self.members {
            let p = format!("{path}/{name}");
            match node {
                MemNode::Group(g) => g.check_shapes( file, &p)?,
                MemNode::Field(f) => if let Err(e) = f.data.check_shape() {
                    return Err( corrupt_format( format!("{:?} {}: {}", file, p, e)))
                }
            }
        }
        Ok(())
    }
}

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct MemField {
    pub data: FieldData,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub enum MemNode {
    Group(MemGroup),
    Field(MemField),
}

/// the root group of a container tree
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Default)]
#[serde(transparent)]
pub struct MemContainer {
    pub root: MemGroup,
}

impl MemContainer {
    pub fn new()->Self { MemContainer::default() }

    pub fn load (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref();
        let input = filepath_contents_as_string( &path)?;
        let container: MemContainer = ron::from_str( &input).map_err( |e| corrupt_format( format!("{:?}: {}", path, e)))?;
        container.root.check_shapes( path, "")?;
        Ok(container)
    }

    pub fn save (&self, path: impl AsRef<Path>)->Result<()> {
        let s = ron::ser::to_string_pretty( self, PrettyConfig::default())?;
        let mut file = File::create( path)?;
        file.write_all( s.as_bytes())?;
        Ok(())
    }

    pub fn node (&self, path: &str)->Option<&MemNode> {
        let mut elems = path_elements(path).peekable();
        let mut group = &self.root;
        while let Some(name) = elems.next() {
            let node = group.members.get(name)?;
            if elems.peek().is_none() { return Some(node) }
            match node {
                MemNode::Group(g) => group = g,
                MemNode::Field(_) => return None
            }
        }
        None // root itself is not a node
    }

    pub fn group (&self, path: &str)->Option<&MemGroup> {
        if path_elements(path).next().is_none() { return Some(&self.root) }
        match self.node(path) {
            Some(MemNode::Group(g)) => Some(g),
            _ => None
        }
    }

    pub fn field (&self, path: &str)->Option<&MemField> {
        match self.node(path) {
            Some(MemNode::Field(f)) => Some(f),
            _ => None
        }
    }

    /// get the group at `path`, creating it (and its parents) if it does not exist yet
    pub fn require_group (&mut self, path: &str)->Result<&mut MemGroup> {
        let mut group = &mut self.root;
        for name in path_elements(path) {
            let node = group.members.entry( name.to_string()).or_insert_with( || MemNode::Group( MemGroup::default()));
            group = match node {
                MemNode::Group(g) => g,
                MemNode::Field(_) => return Err( op_failed( format!("{name} in {path} is a field")))
            };
        }
        Ok(group)
    }

    pub fn set_group_attributes (&mut self, path: &str, attrs: &Attributes)->Result<()> {
        let group = self.require_group(path)?;
        group.attributes.extend( attrs.iter().map( |(k,v)| (k.clone(), v.clone())));
        Ok(())
    }

    /// add (or replace) a field. Missing parent groups are created
    pub fn insert_field (&mut self, path: &str, data: FieldData, attributes: Attributes)->Result<()> {
        let name = leaf_name(path);
        if name.is_empty() { return Err( op_failed("empty field name")) }
        let group = self.require_group( parent_path(path))?;
        group.members.insert( name.to_string(), MemNode::Field( MemField { data, attributes }));
        Ok(())
    }

    /// builder style version of `insert_field` for constructing test data
    pub fn with_field (mut self, path: &str, data: FieldData)->Result<Self> {
        self.insert_field( path, data, Attributes::new())?;
        Ok(self)
    }

    pub fn remove (&mut self, path: &str)->bool {
        let name = leaf_name(path);
        let parent = parent_path(path);
        if path_elements(path).next().is_none() { return false }

        let parent = if path_elements(parent).next().is_none() {
            Some(&mut self.root)
        } else {
            match self.node_mut(parent) {
                Some(MemNode::Group(g)) => Some(g),
                _ => None
            }
        };
        parent.map( |g| g.members.remove(name).is_some()).unwrap_or(false)
    }

    fn node_mut (&mut self, path: &str)->Option<&mut MemNode> {
        let elems: Vec<&str> = path_elements(path).collect();
        let (last, parents) = elems.split_last()?;
        let mut group = &mut self.root;
        for name in parents {
            group = match group.members.get_mut(*name)? {
                MemNode::Group(g) => g,
                MemNode::Field(_) => return None
            };
        }
        group.members.get_mut(*last)
    }
}

/* #region reader ***********************************************************************************************/

pub struct MemReader {
    path: PathBuf,
    container: MemContainer,
    ranged: bool,
}

impl MemReader {
    pub fn open (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let container = MemContainer::load(&path)?;
        debug!("opened container snapshot {:?}", path);
        Ok( MemReader { path, container, ranged: false } )
    }

    /// wrap an existing container tree. The path is only used for reporting
    pub fn from_container (path: impl AsRef<Path>, container: MemContainer)->Self {
        MemReader { path: path.as_ref().to_path_buf(), container, ranged: false }
    }

    /// make this reader announce that it prefers ranged reads (to emulate remote sources)
    pub fn with_ranged_reads (mut self, ranged: bool)->Self {
        self.ranged = ranged;
        self
    }

    pub fn container (&self)->&MemContainer { &self.container }

    fn require_field (&self, path: &str)->Result<&MemField> {
        self.container.field(path).ok_or_else( || missing_field( format!("{} in {:?}", path, self.path)))
    }
}

impl ContainerReader for MemReader {
    fn path (&self)->&Path { &self.path }

    fn kind (&self)->ContainerKind { ContainerKind::Snapshot }

    fn members (&self, group: &str)->Result<Vec<Member>> {
        let group = self.container.group(group).ok_or_else( || not_found( format!("group {} in {:?}", group, self.path)))?;
        Ok( group.members.iter().map( |(name,node)| {
            let kind = match node {
                MemNode::Group(_) => MemberKind::Group,
                MemNode::Field(_) => MemberKind::Field,
            };
            Member { name: name.clone(), kind }
        }).collect())
    }

    fn describe (&self, path: &str)->Result<FieldDescriptor> {
        let field = self.require_field(path)?;
        Ok( FieldDescriptor {
            path: path.to_string(),
            kind: field.data.kind,
            element: field.data.element_type(),
            row_count: field.data.row_count(),
            attributes: field.attributes.clone(),
        })
    }

    fn group_attributes (&self, group: &str)->Result<Attributes> {
        self.container.group(group)
            .map( |g| g.attributes.clone())
            .ok_or_else( || not_found( format!("group {} in {:?}", group, self.path)))
    }

    fn read_rows (&self, path: &str, selection: &RowSelection)->Result<FieldData> {
        self.require_field(path)?.data.select( selection)
    }

    fn prefers_ranged_reads (&self)->bool { self.ranged }

    fn as_any (&self)->&dyn Any { self }
}

/* #endregion reader */

/* #region writer ***********************************************************************************************/

/// writes a container snapshot. The file is created (truncated) right away and populated on `close()`
pub struct MemWriter {
    path: PathBuf,
    container: MemContainer,
}

impl MemWriter {
    pub fn create (path: impl AsRef<Path>)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path)?;
        Ok( MemWriter { path, container: MemContainer::new() } )
    }

    pub fn container (&self)->&MemContainer { &self.container }
}

impl ContainerWriter for MemWriter {
    fn path (&self)->&Path { &self.path }

    fn kind (&self)->ContainerKind { ContainerKind::Snapshot }

    fn require_group (&mut self, path: &str)->Result<()> {
        self.container.require_group(path)?;
        Ok(())
    }

    fn set_group_attributes (&mut self, path: &str, attrs: &Attributes)->Result<()> {
        self.container.set_group_attributes( path, attrs)
    }

    fn write_field (&mut self, path: &str, data: &FieldData, attrs: &Attributes)->Result<()> {
        if self.container.group( parent_path(path)).is_none() {
            return Err( not_found( format!("parent group of {path}")))
        }
        self.container.insert_field( path, data.clone(), attrs.clone())
    }

    fn remove (&mut self, path: &str)->Result<()> {
        self.container.remove(path);
        Ok(())
    }

    fn close (self: Box<Self>)->Result<()> {
        self.container.save( &self.path)?;
        debug!("saved container snapshot {:?}", self.path);
        Ok(())
    }
}

/* #endregion writer */
