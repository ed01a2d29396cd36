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

mod common;

use std::{any::Any, cell::Cell, fs, path::Path};
use odin_gedi::container::{
    walk_fields, Attributes, ContainerKind, ContainerReader, ContainerWriter, FieldData, FieldDescriptor, FieldKind,
    Member, MemContainer, MemReader, MemWriter, MemberKind, RowSelection, Values
};
use odin_gedi::planner::{plan, plan_with_row_count, RecordIndexSet};
use odin_gedi::OdinGediError;
use odin_gedi::subset::*;
use odin_gedi::Result;
use common::*;

// run with "cargo test test_xx -- --nocapture"

#[test]
fn test_subset_end_to_end() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    let input = granule();
    save( &input, indir.path(), "g1.ron");

    let report = subset_dir( indir.path(), outdir.path(), &square_aoi(), &ron_config()).unwrap();
    println!("{report:?}");
    assert_eq!( report.n_written(), 1);
    assert_eq!( report.n_failed(), 0);

    let out_path = outdir.path().join("g1_sub.ron");
    assert_eq!( report.outputs(), vec![ out_path.as_path() ]);
    let output = MemContainer::load( &out_path).unwrap();

    // only the overlapping beam is written
    assert!( output.group("/BEAM0000").is_some());
    assert!( output.group("/BEAM0001").is_none());

    // every field has exactly the selected rows, in original order
    let src = MemReader::from_container( "g1.ron", input.clone());
    let out = MemReader::from_container( "g1_sub.ron", output.clone());
    let mut n_fields = 0;
    for desc in walk_fields( &src, "BEAM0000") {
        let desc = desc.unwrap();
        let out_desc = out.describe( &desc.path).unwrap();
        assert_eq!( out_desc.row_count, 4, "{}", desc.path);
        assert_eq!( out_desc.kind, desc.kind);
        assert_eq!( out_desc.attributes, desc.attributes, "attributes of {}", desc.path);

        let set = RecordIndexSet::from_rows( INSIDE_ROWS.to_vec());
        let expected = src.read_rows( &desc.path, &RowSelection::Rows(&set)).unwrap();
        let actual = out.read_rows( &desc.path, &RowSelection::All).unwrap();
        assert_eq!( actual, expected, "values of {}", desc.path);
        n_fields += 1;
    }
    assert_eq!( n_fields, 9);

    let shots = out.read_rows( "/BEAM0000/shot_number", &RowSelection::All).unwrap();
    assert_eq!( shots.values, Values::U64( vec![1002, 1005, 1006, 1007]));

    // group attributes and auxiliary groups are preserved
    assert_eq!( output.group("/BEAM0000").unwrap().attributes, input.group("/BEAM0000").unwrap().attributes);
    assert_eq!( output.group("/BEAM0000/agbd_prediction").unwrap().attributes, input.group("/BEAM0000/agbd_prediction").unwrap().attributes);
    assert_eq!( output.group("/ANCILLARY"), input.group("/ANCILLARY"));
    assert_eq!( output.group("/METADATA"), input.group("/METADATA"));
}

#[test]
fn test_subset_no_overlap() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    save( &remote_granule(), indir.path(), "g2.ron");

    let report = subset_dir( indir.path(), outdir.path(), &square_aoi(), &ron_config()).unwrap();
    assert_eq!( report.n_no_overlap(), 1);
    assert_eq!( report.n_written(), 0);
    assert!( !outdir.path().join("g2_sub.ron").exists());
    assert_eq!( fs::read_dir( outdir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_coordinates_skip_beam() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    add_beam( &mut mc, "BEAM0010", &BEAM_LONS, 3000);
    assert!( mc.remove("/BEAM0010/lat_lowestmode"));
    let input = save( &mc, indir.path(), "g3.ron");

    match subset_file( &input, outdir.path(), &square_aoi(), &ron_config()) {
        FileOutcome::Written{output,beams} => {
            println!("{output:?}: {beams:?}");
            assert_eq!( beams, vec![ BeamSubset{ beam: "BEAM0000".to_string(), rows: 4 } ]);
            let out = MemContainer::load( &output).unwrap();
            assert!( out.group("/BEAM0000").is_some());
            assert!( out.group("/BEAM0010").is_none());
        }
        other => panic!("unexpected outcome {other:?}")
    }
}

#[test]
fn test_failed_beam_is_removed() {
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    add_beam( &mut mc, "BEAM0011", &BEAM_LONS, 4000);
    // field with fewer rows than the coordinates
    mc.insert_field( "/BEAM0011/zzz_short", FieldData::scalar( Values::I16( vec![1, 2, 3])), Attributes::new()).unwrap();
    let indir = tempfile::tempdir().unwrap();
    let input = save( &mc, indir.path(), "g4.ron");

    let outcome = subset_file( &input, outdir.path(), &square_aoi(), &ron_config());
    let FileOutcome::Written{output,beams} = outcome else { panic!("unexpected outcome {outcome:?}") };
    assert_eq!( beams.len(), 1);

    let out = MemContainer::load( &output).unwrap();
    assert!( out.group("/BEAM0000").is_some());
    assert!( out.group("/BEAM0011").is_none());
}

#[test]
fn test_longer_field_fails_beam() {
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    add_beam( &mut mc, "BEAM0011", &BEAM_LONS, 4000);
    // field with more rows than the coordinates
    let n = BEAM_LONS.len() + 2;
    mc.insert_field( "/BEAM0011/zzz_long", FieldData::scalar( Values::I16( (0..n as i16).collect())), Attributes::new()).unwrap();
    let indir = tempfile::tempdir().unwrap();
    let input = save( &mc, indir.path(), "g5.ron");

    let outcome = subset_file( &input, outdir.path(), &square_aoi(), &ron_config());
    let FileOutcome::Written{output,beams} = outcome else { panic!("unexpected outcome {outcome:?}") };
    assert_eq!( beams, vec![ BeamSubset{ beam: "BEAM0000".to_string(), rows: 4 } ]);

    let out = MemContainer::load( &output).unwrap();
    assert!( out.group("/BEAM0000").is_some());
    assert!( out.group("/BEAM0011").is_none());
    assert!( out.field("/BEAM0011/zzz_long").is_none());

    // the same check applies to direct beam writes
    let src = MemReader::from_container( "g5", mc);
    let (set, row_count) = plan_with_row_count( &src, "BEAM0011", &square_aoi(), &ron_config().layout).unwrap();
    let mut writer = MemWriter::create( outdir.path().join("direct.ron")).unwrap();
    match write_beam( &mut writer, &src, "BEAM0011", row_count, &set) {
        Err(e @ OdinGediError::ShapeMismatch(_)) => assert!( e.is_beam_scoped()),
        other => panic!("unexpected result {other:?}")
    }
}

#[test]
fn test_zero_column_field_is_corrupt_file() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    // bypasses the FieldData::multi_column check, like a hand edited snapshot would
    let bad = FieldData { kind: FieldKind::MultiColumn(0), values: Values::F32( vec![]) };
    mc.insert_field( "/BEAM0000/bad", bad, Attributes::new()).unwrap();
    save( &mc, indir.path(), "a_zero_cols.ron");
    save( &granule(), indir.path(), "b.ron");

    let report = subset_dir( indir.path(), outdir.path(), &square_aoi(), &ron_config()).unwrap();
    assert_eq!( report.files.len(), 2);
    assert!( matches!( report.files[0].1, FileOutcome::Failed( OdinGediError::CorruptFormat(_))), "{:?}", report.files[0].1);
    assert!( matches!( report.files[1].1, FileOutcome::Written{..}));
    assert!( !outdir.path().join("a_zero_cols_sub.ron").exists());

    // values that do not fill whole rows are rejected as well
    let mut mc = granule();
    let ragged = FieldData { kind: FieldKind::MultiColumn(3), values: Values::F32( vec![1.0; 10]) };
    mc.insert_field( "/BEAM0000/ragged", ragged, Attributes::new()).unwrap();
    let path = save( &mc, indir.path(), "c_ragged.ron");
    assert!( matches!( MemContainer::load( &path), Err( OdinGediError::CorruptFormat(_))));
}

#[test]
fn test_corrupt_file_does_not_stop_run() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();
    fs::write( indir.path().join("a_corrupt.ron"), "this is not a container").unwrap();
    save( &granule(), indir.path(), "b.ron");
    save( &granule(), indir.path(), "b_sub.ron"); // previous output in input dir is ignored

    let report = subset_dir( indir.path(), outdir.path(), &square_aoi(), &ron_config()).unwrap();
    assert_eq!( report.files.len(), 2);
    assert!( matches!( report.files[0].1, FileOutcome::Failed(_)));
    assert!( matches!( report.files[1].1, FileOutcome::Written{..}));

    assert!( !outdir.path().join("a_corrupt_sub.ron").exists());
    assert!( outdir.path().join("b_sub.ron").is_file());
}

#[test]
fn test_subset_output_rollback() {
    let dir = tempfile::tempdir().unwrap();

    let path = dir.path().join("dropped.ron");
    {
        let mut output = SubsetOutput::create( &path, ContainerKind::Snapshot).unwrap();
        output.writer().unwrap().require_group("/BEAM0000").unwrap();
        assert!( path.exists());
    }
    assert!( !path.exists());

    let path = dir.path().join("kept.ron");
    let mut output = SubsetOutput::create( &path, ContainerKind::Snapshot).unwrap();
    output.writer().unwrap().require_group("/BEAM0000").unwrap();
    let kept = output.finalize().unwrap();
    assert_eq!( kept, path);
    assert!( MemContainer::load( &path).unwrap().group("/BEAM0000").is_some());

    // truncates existing files
    let mut output = SubsetOutput::create( &path, ContainerKind::Snapshot).unwrap();
    assert_eq!( fs::metadata( &path).unwrap().len(), 0);
    output.discard().unwrap();
    assert!( !path.exists());
}

/// reader that counts ranged reads
struct CountingReader {
    inner: MemReader,
    ranged_reads: Cell<usize>,
    scattered_reads: Cell<usize>,
}

impl ContainerReader for CountingReader {
    fn path (&self)->&Path { self.inner.path() }
    fn kind (&self)->ContainerKind { self.inner.kind() }
    fn members (&self, group: &str)->Result<Vec<Member>> { self.inner.members( group) }
    fn describe (&self, path: &str)->Result<FieldDescriptor> { self.inner.describe( path) }
    fn group_attributes (&self, group: &str)->Result<Attributes> { self.inner.group_attributes( group) }

    fn read_rows (&self, path: &str, selection: &RowSelection)->Result<FieldData> {
        match selection {
            RowSelection::Range(_) => self.ranged_reads.set( self.ranged_reads.get() + 1),
            RowSelection::Rows(_) => self.scattered_reads.set( self.scattered_reads.get() + 1),
            RowSelection::All => {}
        }
        self.inner.read_rows( path, selection)
    }

    fn prefers_ranged_reads (&self)->bool { self.inner.prefers_ranged_reads() }
    fn as_any (&self)->&dyn Any { self }
}

#[test]
fn test_ranged_reads_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let src = CountingReader {
        inner: MemReader::from_container( "remote", granule()).with_ranged_reads( true),
        ranged_reads: Cell::new(0),
        scattered_reads: Cell::new(0),
    };
    let mut writer = MemWriter::create( dir.path().join("out.ron")).unwrap();

    let (set, row_count) = plan_with_row_count( &src, "BEAM0000", &square_aoi(), &ron_config().layout).unwrap();
    assert_eq!( set.as_slice(), &INSIDE_ROWS);
    assert_eq!( set.runs().len(), 2);
    assert_eq!( row_count, BEAM_LONS.len());

    let n_fields = write_beam( &mut writer, &src, "BEAM0000", row_count, &set).unwrap();
    assert_eq!( n_fields, 9);
    assert_eq!( src.ranged_reads.get(), n_fields * 2); // one read per field and run
    assert_eq!( src.scattered_reads.get(), 0);

    let out = MemReader::from_container( "out", writer.container().clone());
    let agbd = out.read_rows( "/BEAM0000/agbd", &RowSelection::All).unwrap();
    assert_eq!( agbd.values, Values::F32( vec![3.0, 7.5, 9.0, 10.5]));
    let xvar = out.read_rows( "/BEAM0000/xvar", &RowSelection::All).unwrap();
    assert_eq!( xvar.kind, FieldKind::MultiColumn(4));
    assert_eq!( xvar.values, Values::F32( vec![2.0, 2.25, 2.5, 2.75,  5.0, 5.25, 5.5, 5.75,  6.0, 6.25, 6.5, 6.75,  7.0, 7.25, 7.5, 7.75]));
}

#[test]
fn test_empty_index_set_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = MemReader::from_container( "g", granule());
    let mut writer = MemWriter::create( dir.path().join("out.ron")).unwrap();

    let set = plan( &src, "BEAM0001", &square_aoi(), &ron_config().layout).unwrap();
    assert!( set.is_empty());
    assert!( set.runs().is_empty());
    assert_eq!( write_beam( &mut writer, &src, "BEAM0001", BEAM_LONS.len(), &set).unwrap(), 0);
    assert!( writer.container().group("/BEAM0001").is_none());
}

/// convert a snapshot granule into a HDF5 granule
#[cfg(feature = "hdf5")]
fn save_h5 (mc: &MemContainer, path: &Path) {
    use odin_gedi::container::{copy_subtree_structural, create_container};

    let src = MemReader::from_container( "g", mc.clone());
    let mut w = create_container( path, ContainerKind::Hdf5).unwrap();
    for group in mc.root.members.keys() {
        copy_subtree_structural( w.as_mut(), &src, &format!("/{group}")).unwrap();
    }
    w.close().unwrap();
}

#[cfg(feature = "hdf5")]
#[test]
fn test_hdf5_subset() {
    use odin_gedi::container::{open_container, AttrValue, CharSet};

    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    let mut label_attrs = Attributes::new();
    label_attrs.insert( "ascii_var".into(), AttrValue::scalar( Values::AsciiText( vec!["plain".into()])));
    label_attrs.insert( "utf8_var".into(), AttrValue::text("Mg / ha ±"));
    label_attrs.insert( "ascii_fixed".into(), AttrValue::scalar( Values::FixedText{ size: 4, values: vec!["L4A".into()], cset: CharSet::Ascii }));
    label_attrs.insert( "utf8_fixed".into(), AttrValue::array( Values::FixedText{ size: 6, values: vec!["µm".into(), "°C".into()], cset: CharSet::Utf8 }));
    let labels = Values::FixedText{ size: 6, values: (0..10).map( |i| format!("lbl{i}")).collect(), cset: CharSet::Ascii };
    mc.insert_field( "/BEAM0000/label", FieldData::scalar( labels), label_attrs).unwrap();
    mc.insert_field( "/BEAM0000/tag", FieldData::scalar( Values::AsciiText( (0..10).map( |i| format!("t{i}")).collect())), Attributes::new()).unwrap();
    save_h5( &mc, &indir.path().join("g.h5"));

    let config = odin_gedi::GediConfig::default();
    let report = subset_dir( indir.path(), outdir.path(), &square_aoi(), &config).unwrap();
    assert_eq!( report.n_written(), 1);

    let src = MemReader::from_container( "g", mc);
    let out = open_container( outdir.path().join("g_sub.h5")).unwrap();
    let shots = out.read_rows( "/BEAM0000/shot_number", &RowSelection::All).unwrap();
    assert_eq!( shots.values, Values::U64( vec![1002, 1005, 1006, 1007]));
    for field in ["/BEAM0000/agbd", "/BEAM0000/label", "/BEAM0000/tag"] {
        let desc = out.describe( field).unwrap();
        assert_eq!( desc.element, src.describe( field).unwrap().element, "element type of {field}");
        assert_eq!( desc.attributes, src.describe( field).unwrap().attributes, "attributes of {field}");
    }
    assert!( out.has_group("/ANCILLARY"));
    assert!( !out.has_group("/BEAM0001"));

    // fixed length strings are read per selected row range
    let labels = out.read_rows( "/BEAM0000/label", &RowSelection::All).unwrap();
    let expected: Vec<String> = INSIDE_ROWS.iter().map( |i| format!("lbl{i}")).collect();
    assert_eq!( labels.values, Values::FixedText{ size: 6, values: expected, cset: CharSet::Ascii });
    let h5_src = open_container( indir.path().join("g.h5")).unwrap();
    let range = h5_src.read_rows( "/BEAM0000/label", &RowSelection::Range( odin_gedi::planner::RowRun::new( 5, 7))).unwrap();
    assert_eq!( range.values, Values::FixedText{ size: 6, values: vec!["lbl5".into(), "lbl6".into(), "lbl7".into()], cset: CharSet::Ascii });
}

#[cfg(feature = "hdf5")]
#[test]
fn test_hdf5_undecodable_attribute_fails_beam() {
    let indir = tempfile::tempdir().unwrap();
    let outdir = tempfile::tempdir().unwrap();

    let mut mc = granule();
    add_beam( &mut mc, "BEAM0010", &BEAM_LONS, 3000);
    let h5_path = indir.path().join("g.h5");
    save_h5( &mc, &h5_path);

    // array typed attributes have no Values representation
    {
        let file = hdf5::File::open_rw( &h5_path).unwrap();
        let ds = file.dataset("BEAM0010/lon_lowestmode").unwrap();
        ds.new_attr::<[f32;2]>().create("pair").unwrap().write_scalar( &[1.0f32, 2.0]).unwrap();
    }

    let outcome = subset_file( &h5_path, outdir.path(), &square_aoi(), &odin_gedi::GediConfig::default());
    let FileOutcome::Written{output,beams} = outcome else { panic!("unexpected outcome {outcome:?}") };
    assert_eq!( beams, vec![ BeamSubset{ beam: "BEAM0000".to_string(), rows: 4 } ]);

    let out = odin_gedi::container::open_container( &output).unwrap();
    assert!( out.has_group("/BEAM0000"));
    assert!( !out.has_group("/BEAM0010"));
}
