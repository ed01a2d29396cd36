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

use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use odin_common::MinMax;
use odin_gedi::{init_tracing, ProductLayout};
use odin_gedi::container::{
    join_path, list_beams, open_container, row_coordinates, AttrValue, Attributes, ContainerReader, MemContainer,
    MemberKind, RowSelection
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "show the group/field tree of a container file")]
pub struct Args {
    /// also show attribute values
    #[arg(short,long)]
    pub attrs: bool,

    /// dump the whole container as RON snapshot to stdout
    #[arg(long)]
    pub ron: bool,

    pub path: PathBuf,
}

fn main()->Result<()> {
    init_tracing();
    let args = Args::parse();

    let reader = open_container( &args.path)?;

    if args.ron {
        let snapshot = snapshot( reader.as_ref(), "/")?;
        println!("{}", ron::ser::to_string_pretty( &snapshot, ron::ser::PrettyConfig::default())?);
        return Ok(())
    }

    println!("{:?} ({})", reader.path(), reader.kind());
    print_group( reader.as_ref(), "/", 1, args.attrs)?;

    let layout = ProductLayout::default();
    for beam in list_beams( reader.as_ref(), &layout)? {
        match row_coordinates( reader.as_ref(), &beam, &layout) {
            Ok((lon,lat)) => {
                let mut x = MinMax::new();
                let mut y = MinMax::new();
                lon.iter().for_each( |v| x.add(*v));
                lat.iter().for_each( |v| y.add(*v));
                if x.is_empty() {
                    println!("{beam}: {} footprints, no valid coordinates", lon.len());
                } else {
                    println!("{beam}: {} footprints, lon [{:.5},{:.5}] lat [{:.5},{:.5}]", lon.len(), x.min, x.max, y.min, y.max);
                }
            }
            Err(e) => println!("{beam}: {e}")
        }
    }
    Ok(())
}

fn print_attrs (attrs: &Attributes, indent: usize) {
    for (name,attr) in attrs {
        println!("{:indent$}@{} = {:?}", "", name, attr.values, indent = indent*2);
    }
}

fn print_group (reader: &dyn ContainerReader, path: &str, level: usize, show_attrs: bool)->Result<()> {
    if show_attrs { print_attrs( &reader.group_attributes( path)?, level) }

    for m in reader.members( path)? {
        let p = join_path( path, &m.name);
        match m.kind {
            MemberKind::Group => {
                println!("{:indent$}{}/", "", m.name, indent = level*2);
                print_group( reader, &p, level+1, show_attrs)?;
            }
            MemberKind::Field => match reader.describe( &p) {
                Ok(desc) => {
                    println!("{:indent$}{} {:?} {:?} [{}]", "", m.name, desc.element, desc.kind, desc.row_count, indent = level*2);
                    if show_attrs { print_attrs( &desc.attributes, level+1) }
                }
                Err(e) => println!("{:indent$}{} ({})", "", m.name, e, indent = level*2)
            }
        }
    }
    Ok(())
}

/// copy container tree into a snapshot
fn snapshot (reader: &dyn ContainerReader, path: &str)->Result<MemContainer> {
    let mut mc = MemContainer::new();
    copy_into( reader, path, &mut mc)?;
    Ok(mc)
}

fn copy_into (reader: &dyn ContainerReader, path: &str, mc: &mut MemContainer)->Result<()> {
    mc.set_group_attributes( path, &reader.group_attributes( path)?)?;
    for m in reader.members( path)? {
        let p = join_path( path, &m.name);
        match m.kind {
            MemberKind::Group => copy_into( reader, &p, mc)?,
            MemberKind::Field => {
                let desc = reader.describe( &p)?;
                let data = reader.read_rows( &p, &RowSelection::All)?;
                mc.insert_field( &p, data, desc.attributes)?;
            }
        }
    }
    Ok(())
}
