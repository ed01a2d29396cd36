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

use chrono::{TimeZone, Utc};
use odin_gedi::OdinGediError;
use odin_gedi::cmr::*;

// run with "cargo test test_xx -- --nocapture"

const COLLECTION_FEED: &str = r#"{
  "feed": {
    "updated": "2025-01-10T18:00:00.000Z",
    "id": "https://cmr.earthdata.nasa.gov:443/search/collections.json?doi=10.3334/ORNLDAAC/2056",
    "title": "ECHO dataset metadata",
    "entry": [
      { "id": "C2237824918-ORNL_CLOUD", "data_center": "ORNL_CLOUD", "short_name": "GEDI_L4A_AGB_Density_V2_1_2056" }
    ]
  }
}"#;

const EMPTY_FEED: &str = r#"{ "feed": { "title": "ECHO dataset metadata", "entry": [] } }"#;

const GRANULE_FEED: &str = r#"{
  "feed": {
    "entry": [
      {
        "id": "G1",
        "title": "GEDI04_A_2019108002012_O01959_03_T03909_02_002_02_V002.h5",
        "links": [
          { "href": "https://data.ornldaac.earthdata.nasa.gov/protected/gedi/a/GEDI04_A_2019108002012.h5", "title": "Download GEDI04_A_2019108002012.h5" },
          { "href": "s3://ornl-cumulus-prod-protected/gedi/a/GEDI04_A_2019108002012.h5", "title": "This link provides direct download access via S3 to the granule" },
          { "href": "https://data.ornldaac.earthdata.nasa.gov/protected/gedi/a/GEDI04_A_2019108002012.h5.sha256", "title": "Download GEDI04_A_2019108002012.h5.sha256" },
          { "href": "https://opendap.earthdata.nasa.gov/collections/C2237824918-ORNL_CLOUD/granules/GEDI04_A_2019108002012.h5", "title": "OPeNDAP request URL (GET DATA : OPENDAP DATA)" }
        ]
      },
      {
        "id": "G2",
        "title": "GEDI04_A_2019108015253.h5",
        "links": [
          { "href": "https://data.ornldaac.earthdata.nasa.gov/browse/GEDI04_A_2019108015253.png", "title": "browse image" }
        ]
      },
      { "id": "G3", "title": "no links" }
    ]
  }
}"#;

#[test]
fn test_collection_feed() {
    let info = parse_collection_feed( COLLECTION_FEED).unwrap();
    assert_eq!( info, CollectionInfo { concept_id: "C2237824918-ORNL_CLOUD".into(), data_center: "ORNL_CLOUD".into() });

    match parse_collection_feed( EMPTY_FEED) {
        Err( OdinGediError::CmrError(msg)) => println!("empty feed: {msg}"),
        other => panic!("expected CmrError, got {:?}", other)
    }
    assert!( parse_collection_feed( "<html>not json</html>").is_err());
}

#[test]
fn test_granule_links() {
    let entries = parse_granule_feed( GRANULE_FEED).unwrap();
    assert_eq!( entries.len(), 3);
    assert!( entries[2].links.is_empty());

    let dl = granule_links( &entries[0], "ORNL_CLOUD", LinkKind::Download);
    assert_eq!( dl, vec![ RemoteGranule {
        url: "https://data.ornldaac.earthdata.nasa.gov/protected/gedi/a/GEDI04_A_2019108002012.h5".into(),
        sha256_url: Some( "https://data.ornldaac.earthdata.nasa.gov/protected/gedi/a/GEDI04_A_2019108002012.h5.sha256".into()),
    }]);

    // other data centers use the last .h5 link and have no digest
    let dl = granule_links( &entries[0], "LPDAAC", LinkKind::Download);
    assert_eq!( dl.len(), 1);
    assert!( dl[0].url.starts_with("https://opendap.earthdata.nasa.gov"));
    assert_eq!( dl[0].sha256_url, None);

    let od = granule_links( &entries[0], "ORNL_CLOUD", LinkKind::Opendap);
    assert_eq!( od.len(), 1);
    assert!( od[0].url.ends_with("/granules/GEDI04_A_2019108002012.h5"));

    assert!( granule_links( &entries[1], "ORNL_CLOUD", LinkKind::Download).is_empty());
    assert!( granule_links( &entries[2], "ORNL_CLOUD", LinkKind::Opendap).is_empty());
}

#[test]
fn test_query_params() {
    assert_eq!( normalize_doi( "https://doi.org/10.3334/ORNLDAAC/2056"), "10.3334/ORNLDAAC/2056");
    assert_eq!( normalize_doi( "10.3334/ORNLDAAC/2056"), "10.3334/ORNLDAAC/2056");
    assert_eq!( normalize_doi( " 10.3334/ORNLDAAC/2056/ "), "10.3334/ORNLDAAC/2056");

    let start = Utc.with_ymd_and_hms( 2020, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms( 2020, 12, 31, 23, 59, 59).unwrap();
    assert_eq!( temporal_range( &start, &end), "2020-01-01T00:00:00Z,2020-12-31T23:59:59Z");
}
