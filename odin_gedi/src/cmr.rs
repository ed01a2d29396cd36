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

//! granule search through the NASA Common Metadata Repository (CMR) search API
//! (see https://cmr.earthdata.nasa.gov/search/site/docs/search/api.html)

use chrono::{DateTime,Utc};
use reqwest::{Client, multipart::{Form,Part}};
use serde::{Serialize,Deserialize};
use tracing::{debug, info, warn};
use odin_common::datetime::iso8601_secs;

use crate::aoi::AoiPolygon;
use crate::config::CmrConfig;
use crate::errors::{Result, cmr_error};

/* #region CMR json feed ****************************************************************************************/

#[derive(Deserialize,Debug)]
struct Feed<T> {
    feed: FeedEntries<T>,
}

#[derive(Deserialize,Debug)]
struct FeedEntries<T> {
    #[serde(default = "Vec::new")]
    entry: Vec<T>,
}

#[derive(Deserialize,Debug,Clone)]
struct CollectionEntry {
    id: String,
    #[serde(default)]
    data_center: String,
}

#[derive(Deserialize,Debug,Clone,PartialEq)]
pub struct GranuleEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub links: Vec<GranuleLink>,
}

#[derive(Deserialize,Debug,Clone,PartialEq)]
pub struct GranuleLink {
    pub href: Option<String>,
    pub title: Option<String>,
}

/* #endregion CMR json feed */

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct CollectionInfo {
    pub concept_id: String,
    pub data_center: String,
}

/// which granule links we are interested in
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum LinkKind {
    /// direct download of the data file
    Download,
    /// OPeNDAP (Hyrax) server endpoint
    Opendap,
}

/// locator of a remote granule with its optional integrity digest url
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct RemoteGranule {
    pub url: String,
    pub sha256_url: Option<String>,
}

/// strip URL scheme and host from DOIs such as `https://doi.org/10.3334/ORNLDAAC/2056`
pub fn normalize_doi (doi: &str)->String {
    match url::Url::parse( doi) {
        Ok(url) => url.path().trim_matches('/').to_string(),
        Err(_) => doi.trim().trim_matches('/').to_string()
    }
}

/// CMR temporal query parameter for the given start and end instants
pub fn temporal_range (start: &DateTime<Utc>, end: &DateTime<Utc>)->String {
    format!("{},{}", iso8601_secs( start), iso8601_secs( end))
}

/// parse the response of a collection search. This fails if there is no collection
pub fn parse_collection_feed (json: &str)->Result<CollectionInfo> {
    let feed: Feed<CollectionEntry> = serde_json::from_str( json)?;
    feed.feed.entry.into_iter().next()
        .map( |e| CollectionInfo { concept_id: e.id, data_center: e.data_center })
        .ok_or_else( || cmr_error("not a valid DOI"))
}

pub fn parse_granule_feed (json: &str)->Result<Vec<GranuleEntry>> {
    let feed: Feed<GranuleEntry> = serde_json::from_str( json)?;
    Ok( feed.feed.entry )
}

/// look up the collection for a DOI
pub async fn find_collection (client: &Client, cfg: &CmrConfig, doi: &str)->Result<CollectionInfo> {
    let url = format!("{}collections.json", cfg.url);
    let response = client.get( &url).query( &[("doi", doi)]).send().await?;
    if !response.status().is_success() {
        return Err( cmr_error( format!("collection search for {} failed with {}", doi, response.status())))
    }
    let info = parse_collection_feed( &response.text().await?)?;
    debug!("DOI {} -> collection {} ({})", doi, info.concept_id, info.data_center);
    Ok(info)
}

/// get the links of the requested kind from a granule entry.
/// ORNL DAAC granules have several `.h5` links, we only use the one titled `Download...` plus its `.sha256` link
pub fn granule_links (entry: &GranuleEntry, data_center: &str, kind: LinkKind)->Vec<RemoteGranule> {
    let links = entry.links.iter().filter_map( |l| l.href.as_deref().map( |href| (href, l.title.as_deref().unwrap_or(""))));

    match kind {
        LinkKind::Opendap => {
            links.filter( |(_,title)| title.starts_with("OPeNDAP"))
                .map( |(href,_)| RemoteGranule { url: href.to_string(), sha256_url: None })
                .collect()
        }
        LinkKind::Download => {
            let is_ornl = data_center.starts_with("ORNL");
            let mut url: Option<&str> = None;
            let mut sha256_url: Option<&str> = None;

            for (href,title) in links {
                if href.ends_with(".h5") && (!is_ornl || title.starts_with("Download")) {
                    url = Some(href);
                }
                if is_ornl && href.ends_with(".sha256") {
                    sha256_url = Some(href);
                }
            }

            match url {
                Some(url) => vec![ RemoteGranule { url: url.to_string(), sha256_url: sha256_url.map( |s| s.to_string()) } ],
                None => {
                    warn!("no download link for granule {}", entry.title);
                    vec![]
                }
            }
        }
    }
}

/// search all granules of a collection that intersect the AOI within the given temporal range. The polygon is
/// sent as GeoJSON shapefile (simplified if it exceeds the configured vertex limit). Pages are requested until
/// we get an empty one
pub async fn search_granules (client: &Client, cfg: &CmrConfig, collection: &CollectionInfo, temporal: &str,
                              aoi: &AoiPolygon, kind: LinkKind)->Result<Vec<RemoteGranule>>
{
    let shape = aoi.simplified( cfg.max_query_vertices, cfg.simplify_tolerance)?.to_geojson_string();
    let url = format!("{}granules.json", cfg.url);
    let mut granules: Vec<RemoteGranule> = Vec::new();
    let mut page_num = 1;

    info!("searching for granules of {}..", collection.concept_id);
    loop {
        let shapefile = Part::text( shape.clone()).file_name("poly.json").mime_str("application/geo+json")?;
        let form = Form::new()
            .text( "collection_concept_id", collection.concept_id.clone())
            .text( "page_size", cfg.page_size.to_string())
            .text( "page_num", page_num.to_string())
            .text( "temporal", temporal.to_string())
            .text( "simplify-shapefile", "true") // otherwise CMR rejects shapes with more than 5000 points
            .part( "shapefile", shapefile);

        let response = client.post( &url).multipart( form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err( cmr_error( format!("granule search failed with {}: {}", status, response.text().await.unwrap_or_default())))
        }

        let entries = parse_granule_feed( &response.text().await?)?;
        if entries.is_empty() { break }

        for entry in &entries {
            granules.extend( granule_links( entry, &collection.data_center, kind));
        }
        info!("total granules found: {}", granules.len());
        page_num += 1;
    }

    Ok(granules)
}
