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

//! spatial subsetting of container files: plan each beam, write the surviving rows of all beam fields into
//! a new container, copy the auxiliary groups and either finalize the output or discard it if no beam overlaps
//! the area of interest

use std::{collections::HashSet, path::{Path,PathBuf}};
use tracing::{debug, info, warn};
use odin_common::fs::{ensure_writable_dir, files_with_extension, has_stem_suffix, remove_if_exists, suffixed_path};

use crate::aoi::AoiPolygon;
use crate::config::{GediConfig, ProductLayout};
use crate::container::{
    create_container, join_path, list_beams, open_container, parent_path, walk_fields,
    ContainerKind, ContainerReader, ContainerWriter, FieldData, RowSelection
};
use crate::errors::{OdinGediError, Result, op_failed, shape_mismatch};
use crate::planner::{plan_with_row_count, RecordIndexSet};

/* #region output wrapper ***************************************************************************************/

/// an output container that is removed again when dropped before it was finalized. This guarantees we never
/// leave partially written files behind, regardless of how we exit
pub struct SubsetOutput {
    path: PathBuf,
    writer: Option<Box<dyn ContainerWriter>>,
}

impl SubsetOutput {
    pub fn create (path: impl AsRef<Path>, kind: ContainerKind)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = create_container( &path, kind)?;
        Ok( SubsetOutput { path, writer: Some(writer) } )
    }

    pub fn path (&self)->&Path { &self.path }

    pub fn writer (&mut self)->Result<&mut (dyn ContainerWriter + 'static)> {
        self.writer.as_deref_mut().ok_or_else( || op_failed( format!("output {:?} already closed", self.path)))
    }

    /// close the output, which leaves a valid container file
    pub fn finalize (mut self)->Result<PathBuf> {
        let writer = self.writer.take().ok_or_else( || op_failed( format!("output {:?} already closed", self.path)))?;
        match writer.close() {
            Ok(()) => Ok( std::mem::take( &mut self.path)), // this also disarms drop()
            Err(e) => Err(e) // file gets removed by drop()
        }
    }

    /// close and remove the output
    pub fn discard (mut self)->Result<()> {
        self.writer = None;
        remove_if_exists( &self.path)?;
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Drop for SubsetOutput {
    fn drop (&mut self) {
        if !self.path.as_os_str().is_empty() {
            self.writer = None; // close the file handle before removing the file
            match remove_if_exists( &self.path) {
                Ok(true) => debug!("removed unfinished output {:?}", self.path),
                Ok(false) => {}
                Err(e) => warn!("failed to remove unfinished output {:?}: {}", self.path, e)
            }
        }
    }
}

/* #endregion output wrapper */

/* #region beam and file processing *****************************************************************************/

/// copy the rows of `index_set` for all fields of a beam into `out`, preserving relative paths, shapes and
/// attributes. Each field has to have `row_count` rows (the number of beam footprints), otherwise the beam
/// fails with a `ShapeMismatch`. Returns the number of fields written
pub fn write_beam (out: &mut dyn ContainerWriter, src: &dyn ContainerReader, beam: &str, row_count: usize, index_set: &RecordIndexSet)->Result<usize> {
    if index_set.is_empty() { return Ok(0) }

    let beam_path = join_path( "/", beam);
    let runs = index_set.runs();
    let ranged = src.prefers_ranged_reads();
    let mut groups: HashSet<String> = HashSet::new();
    let mut n_fields = 0;

    ensure_group( out, src, &beam_path, &mut groups)?;

    for desc in walk_fields( src, &beam_path) {
        let desc = desc?;
        if desc.row_count != row_count {
            return Err( shape_mismatch( format!("{} has {} rows but {} has {} footprints", desc.path, desc.row_count, beam, row_count)))
        }
        ensure_group( out, src, parent_path( &desc.path), &mut groups)?;

        let data = if ranged {
            let mut acc: Option<FieldData> = None;
            for run in &runs {
                let d = src.read_rows( &desc.path, &RowSelection::Range(*run))?;
                match acc.as_mut() {
                    Some(acc) => acc.extend( d)?,
                    None => acc = Some(d)
                }
            }
            acc.ok_or_else( || op_failed("no runs"))?
        } else {
            src.read_rows( &desc.path, &RowSelection::Rows(index_set))?
        };

        if data.row_count() != index_set.len() {
            return Err( shape_mismatch( format!("{} rows read from {} but {} selected", data.row_count(), desc.path, index_set.len())))
        }

        out.write_field( &desc.path, &data, &desc.attributes)?;
        debug!("wrote {} ({:?}, {} rows)", desc.path, desc.kind, data.row_count());
        n_fields += 1;
    }

    Ok(n_fields)
}

/// create output group (and its parents) with the attributes of the corresponding input group
fn ensure_group (out: &mut dyn ContainerWriter, src: &dyn ContainerReader, path: &str, created: &mut HashSet<String>)->Result<()> {
    if path == "/" || created.contains( path) { return Ok(()) }

    ensure_group( out, src, parent_path( path), created)?;
    out.require_group( path)?;
    out.set_group_attributes( path, &src.group_attributes( path)?)?;
    created.insert( path.to_string());
    Ok(())
}

/// copy an auxiliary (non-beam) group, which is skipped with a warning if it does not exist in `src`
pub fn copy_aux_group (out: &mut dyn ContainerWriter, src: &dyn ContainerReader, path: &str)->Result<bool> {
    if src.has_group( path) {
        out.copy_subtree( src, path)?;
        Ok(true)
    } else {
        warn!("no auxiliary group {} in {:?}", path, src.path());
        Ok(false)
    }
}

/// if no beam was written remove the output, otherwise copy the auxiliary groups and close it.
/// Returns the output path if the file was kept
pub fn finalize_or_discard (mut output: SubsetOutput, src: &dyn ContainerReader, had_any_beam: bool, layout: &ProductLayout)->Result<Option<PathBuf>> {
    if !had_any_beam {
        output.discard()?;
        return Ok(None)
    }

    for aux in &layout.aux_groups {
        copy_aux_group( output.writer()?, src, aux)?;
    }
    Ok( Some( output.finalize()?))
}

#[derive(Debug,Clone,PartialEq)]
pub struct BeamSubset {
    pub beam: String,
    pub rows: usize,
}

#[derive(Debug)]
pub enum FileOutcome {
    Written { output: PathBuf, beams: Vec<BeamSubset> },
    NoOverlap,
    Failed(OdinGediError),
}

/// subset one input file into `outdir`. Errors are reported as `FileOutcome::Failed`, in which case no output
/// file is left behind
pub fn subset_file (input: impl AsRef<Path>, outdir: impl AsRef<Path>, aoi: &AoiPolygon, config: &GediConfig)->FileOutcome {
    let input = input.as_ref();
    match try_subset_file( input, outdir.as_ref(), aoi, config) {
        Ok(Some((output,beams))) => FileOutcome::Written { output, beams },
        Ok(None) => FileOutcome::NoOverlap,
        Err(e) => FileOutcome::Failed(e)
    }
}

fn try_subset_file (input: &Path, outdir: &Path, aoi: &AoiPolygon, config: &GediConfig)->Result<Option<(PathBuf,Vec<BeamSubset>)>> {
    let layout = &config.layout;
    let src = open_container( input)?;
    let out_path = suffixed_path( outdir, input, &config.subset_suffix)?;
    let mut output = SubsetOutput::create( &out_path, ContainerKind::from_path( &out_path)?)?;
    let mut beams: Vec<BeamSubset> = Vec::new();

    for beam in list_beams( src.as_ref(), layout)? {
        match subset_beam( output.writer()?, src.as_ref(), &beam, aoi, layout) {
            Ok(0) => debug!("no footprints of {} inside AOI", beam),
            Ok(rows) => {
                info!("{}: {} footprints", beam, rows);
                beams.push( BeamSubset { beam, rows });
            }
            Err(e) if e.is_beam_scoped() => {
                warn!("skipping {} of {:?}: {}", beam, input, e);
                output.writer()?.remove( &join_path( "/", &beam))?;
            }
            Err(e) => return Err(e) // output is removed when dropped
        }
    }

    let kept = finalize_or_discard( output, src.as_ref(), !beams.is_empty(), layout)?;
    Ok( kept.map( |path| (path, beams)) )
}

fn subset_beam (out: &mut dyn ContainerWriter, src: &dyn ContainerReader, beam: &str, aoi: &AoiPolygon, layout: &ProductLayout)->Result<usize> {
    let (index_set, row_count) = plan_with_row_count( src, beam, aoi, layout)?;
    write_beam( out, src, beam, row_count, &index_set)?;
    Ok( index_set.len())
}

/// per file results of a directory run, in processing order
#[derive(Debug,Default)]
pub struct SubsetReport {
    pub files: Vec<(PathBuf,FileOutcome)>,
}

impl SubsetReport {
    pub fn outputs (&self)->Vec<&Path> {
        self.files.iter().filter_map( |(_,outcome)| match outcome {
            FileOutcome::Written{output,..} => Some( output.as_path()),
            _ => None
        }).collect()
    }

    pub fn n_written (&self)->usize { self.outputs().len() }

    pub fn n_no_overlap (&self)->usize {
        self.files.iter().filter( |(_,o)| matches!( o, FileOutcome::NoOverlap)).count()
    }

    pub fn n_failed (&self)->usize {
        self.files.iter().filter( |(_,o)| matches!( o, FileOutcome::Failed(_))).count()
    }
}

/// subset all files with the configured granule extension in `indir` (sorted by name) into `outdir`, which is
/// created if it does not exist. Files that are already subsets (file stem ends with the subset suffix) are ignored
pub fn subset_dir (indir: impl AsRef<Path>, outdir: impl AsRef<Path>, aoi: &AoiPolygon, config: &GediConfig)->Result<SubsetReport> {
    let outdir = outdir.as_ref();
    ensure_writable_dir( outdir)?;

    let mut report = SubsetReport::default();
    for input in files_with_extension( indir, &config.granule_ext)? {
        if has_stem_suffix( &input, &config.subset_suffix) { continue }

        info!("processing {:?}", input);
        let outcome = subset_file( &input, outdir, aoi, config);
        match &outcome {
            FileOutcome::Written{output,beams} => info!("wrote {:?} with {} beams", output, beams.len()),
            FileOutcome::NoOverlap => info!("no footprints of {:?} inside AOI", input),
            FileOutcome::Failed(e) => warn!("failed to subset {:?}: {}", input, e),
        }
        report.files.push( (input, outcome));
    }
    Ok(report)
}

/* #endregion beam and file processing */
