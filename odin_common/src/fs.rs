/*
 * Copyright © 2024, United States Government, as represented by the Administrator of 
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

use std::fs::{self,File};
use std::io::{self,Read,ErrorKind};
use std::path::{Path,PathBuf};
use io::ErrorKind::*;
use regex::Regex;
use lazy_static::lazy_static;

use crate::macros::io_error;

type Result<T> = std::result::Result<T,std::io::Error>;

lazy_static! {
    // everything after the last '/' of the URL path, not including query or fragment
    static ref URL_FNAME_RE: Regex = Regex::new( r"^[^?#]*/([^/?#]+)(?:[?#].*)?$").unwrap();
}

pub fn filename<'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().file_name().and_then(|ostr| ostr.to_str())
}

pub fn extension<'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().extension().and_then(|ostr| ostr.to_str())
}

pub fn filestem <'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().file_stem().and_then(|ostr| ostr.to_str())
}

/// check if dir pathname exists and is writable, try to create dir otherwise
pub fn ensure_writable_dir (path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        let md = fs::metadata(&path)?;
        if md.permissions().readonly() {
            Err(io_error!(PermissionDenied, "output_dir {:?} not writable", &path))
        } else {
            Ok(())
        }

    } else {
        fs::create_dir_all(path)
    }
}

/// all regular files within `dir` that have the given extension (compared case insensitive).
/// The result is sorted by pathname so that processing order is reproducible
pub fn files_with_extension (dir: impl AsRef<Path>, ext: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(io_error!(NotFound, "not a directory {:?}", dir))
    }

    let mut list: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(e) = extension(&path) {
                if e.eq_ignore_ascii_case(ext) { list.push( path) }
            }
        }
    }
    list.sort();
    Ok(list)
}

/// get the pathname within `dir` for a file that is derived from `path` by appending `suffix` to the file stem
/// and keeping the extension, e.g. `/in/a.h5` with suffix `_sub` becomes `<dir>/a_sub.h5`
pub fn suffixed_path (dir: impl AsRef<Path>, path: impl AsRef<Path>, suffix: &str) -> Result<PathBuf> {
    let path = path.as_ref();
    let stem = filestem(&path).ok_or( io_error!(InvalidInput, "no file stem in {:?}", path))?;
    let fname = match extension(&path) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}")
    };
    Ok( dir.as_ref().join(fname))
}

/// does the file stem of `path` end with `suffix` (e.g. to detect previously derived files)
pub fn has_stem_suffix (path: impl AsRef<Path>, suffix: &str) -> bool {
    filestem(&path.as_ref()).map( |stem| stem.ends_with(suffix)).unwrap_or(false)
}

/// remove file if it exists, returning whether there was anything to remove
pub fn remove_if_exists (path: impl AsRef<Path>) -> Result<bool> {
    match fs::remove_file( path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == NotFound => Ok(false),
        Err(e) => Err(e)
    }
}

pub fn file_length <P: AsRef<Path>> (path: P) -> Option<u64> {
    fs::metadata(path).ok().map( |meta| meta.len() )
}

pub fn is_non_empty_file (path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.is_file() && file_length(path).map( |len| len > 0).unwrap_or(false)
}

pub fn filepath_contents_as_string <P: AsRef<Path>> (path: &P) -> Result<String> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut contents = String::with_capacity(len as usize);
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// the last path element of an URL (if any), e.g. `https://host/a/b/file.h5?x=1` -> `file.h5`
pub fn url_file_name<'a> (url: &'a str) -> Option<&'a str> {
    URL_FNAME_RE.captures( url).and_then( |cap| cap.get(1)).map( |m| m.as_str())
}
