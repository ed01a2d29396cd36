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

use std::fs;
use std::path::Path;
use odin_common::fs::*;

// run with "cargo test test_xx -- --nocapture"

#[test]
fn test_files_with_extension() {
    let dir = tempfile::tempdir().unwrap();
    for fname in ["b.h5", "a.H5", "c.txt", "d.h5.part"] {
        fs::write( dir.path().join(fname), b"x").unwrap();
    }
    fs::create_dir( dir.path().join("sub.h5")).unwrap(); // dirs are not files

    let files = files_with_extension( dir.path(), "h5").unwrap();
    let names: Vec<&str> = files.iter().filter_map( |p| filename(p)).collect();
    println!("{names:?}");
    assert_eq!( names, vec!["a.H5", "b.h5"]);

    assert!( files_with_extension( dir.path().join("nope"), "h5").is_err());
}

#[test]
fn test_suffixed_path() {
    let p = suffixed_path( "/out", "/in/GEDI04_A_2019_V002.h5", "_sub").unwrap();
    assert_eq!( p, Path::new("/out/GEDI04_A_2019_V002_sub.h5"));
    assert!( has_stem_suffix( &p, "_sub"));
    assert!( !has_stem_suffix( "/in/GEDI04_A_2019_V002.h5", "_sub"));

    let p = suffixed_path( "/out", "noext", "_sub").unwrap();
    assert_eq!( p, Path::new("/out/noext_sub"));
}

#[test]
fn test_remove_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.ron");
    assert!( !remove_if_exists(&path).unwrap());

    fs::write( &path, b"()").unwrap();
    assert!( is_non_empty_file(&path));
    assert!( remove_if_exists(&path).unwrap());
    assert!( !path.exists());
}

#[test]
fn test_url_file_name() {
    assert_eq!( url_file_name("https://data.ornldaac.earthdata.nasa.gov/protected/gedi/GEDI_L4A/data/a.h5"), Some("a.h5"));
    assert_eq!( url_file_name("https://host/dir/a.h5?token=x#frag"), Some("a.h5"));
    assert_eq!( url_file_name("https://host/dir/"), None);
}
