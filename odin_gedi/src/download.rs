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

//! authenticated granule download with SHA-256 integrity verification

use std::{fs::File, io::{Read,Write}, path::{Path,PathBuf}, sync::Arc};
use reqwest::{Client, RequestBuilder, StatusCode, Url, cookie::{CookieStore,Jar}};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use odin_common::fs::url_file_name;

use crate::cmr::RemoteGranule;
use crate::config::CmrConfig;
use crate::errors::{Result, auth_error, integrity_error, op_failed};

pub const EDL_AUTH_HELP: &str = "https://wiki.earthdata.nasa.gov/display/EL/How+To+Access+Data+With+cURL+And+Wget";

/// the cookie the Earthdata Login host sets after a successful login
const EDL_LOGIN_COOKIE: &str = "urs_user_already_logged";

/// NASA Earthdata Login (EDL) authentication
#[derive(Debug,Clone,PartialEq)]
pub enum EdlAuth {
    Anonymous,
    /// EDL user token, sent as bearer token
    Token(String),
    /// EDL username/password, sent as basic auth
    Credentials { username: String, password: String },
}

impl EdlAuth {
    /// get auth from `EARTHDATA_TOKEN` or `EARTHDATA_USERNAME`/`EARTHDATA_PASSWORD` environment variables
    pub fn from_env ()->Self {
        if let Ok(token) = std::env::var("EARTHDATA_TOKEN") {
            if !token.is_empty() { return EdlAuth::Token(token) }
        }
        match (std::env::var("EARTHDATA_USERNAME"), std::env::var("EARTHDATA_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() => EdlAuth::Credentials { username, password },
            _ => EdlAuth::Anonymous
        }
    }

    pub fn apply (&self, request: RequestBuilder)->RequestBuilder {
        match self {
            EdlAuth::Anonymous => request,
            EdlAuth::Token(token) => request.bearer_auth( token),
            EdlAuth::Credentials{username,password} => request.basic_auth( username, Some(password)),
        }
    }
}

/// create a http client with a cookie store. Credentials are verified by logging into the EDL host
pub async fn edl_client (cfg: &CmrConfig, auth: &EdlAuth)->Result<Client> {
    let jar = Arc::new( Jar::default());
    let client = Client::builder().cookie_provider( jar.clone()).build()?;

    if let EdlAuth::Credentials{username,..} = auth {
        let url = Url::parse( &cfg.auth_host).map_err( |e| op_failed( format!("invalid auth host {}: {}", cfg.auth_host, e)))?;
        auth.apply( client.get( url.clone())).send().await?;

        let logged_in = jar.cookies( &url)
            .and_then( |hv| hv.to_str().ok().map( |s| s.contains( EDL_LOGIN_COOKIE)))
            .unwrap_or(false);
        if !logged_in {
            return Err( auth_error( format!("username or password for {} is incorrect", username)))
        }
        debug!("logged into {} as {}", cfg.auth_host, username);
    }
    Ok(client)
}

/// hex encoded SHA-256 digest of a file
pub fn file_sha256 (path: impl AsRef<Path>)->Result<String> {
    let mut file = File::open( path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read( &mut buf)?;
        if n == 0 { break }
        hasher.update( &buf[..n]);
    }
    Ok( hex::encode( hasher.finalize()))
}

/// get the digest from the contents of a `.sha256` file, which is either just the hex digest or `<digest> <filename>`
pub fn parse_sha256 (text: &str)->Option<String> {
    text.split_whitespace().next()
        .filter( |s| s.len() == 64 && s.chars().all( |c| c.is_ascii_hexdigit()))
        .map( |s| s.to_ascii_lowercase())
}

async fn fetch_sha256 (client: &Client, auth: &EdlAuth, url: &str)->Result<String> {
    let response = auth.apply( client.get( url)).send().await?.error_for_status()?;
    let text = response.text().await?;
    parse_sha256( &text).ok_or_else( || integrity_error( format!("no SHA-256 digest in {url}")))
}

#[derive(Debug,Clone,PartialEq)]
pub enum DownloadOutcome {
    /// local file with matching digest already exists
    AlreadyPresent(PathBuf),
    Downloaded(PathBuf),
}

/// download a granule into `dir` unless we already have a verified copy. The data is streamed into a temp file in
/// the same directory which is only renamed after it was completely received (and its digest verified)
pub async fn download_granule (client: &Client, auth: &EdlAuth, granule: &RemoteGranule, dir: impl AsRef<Path>)->Result<DownloadOutcome> {
    let dir = dir.as_ref();
    let fname = url_file_name( &granule.url).ok_or_else( || op_failed( format!("no file name in {}", granule.url)))?;
    let path = dir.join( fname);

    let remote_digest = match &granule.sha256_url {
        Some(url) => Some( fetch_sha256( client, auth, url).await?),
        None => None
    };

    if path.is_file() {
        if let Some(digest) = &remote_digest {
            if file_sha256( &path)? == *digest {
                info!("{} is already downloaded at {:?}", fname, dir);
                return Ok( DownloadOutcome::AlreadyPresent(path))
            }
        }
    }

    info!("downloading {}..", fname);
    let mut response = auth.apply( client.get( &granule.url)).send().await?;
    let status = response.status();
    if !status.is_success() {
        let msg = format!("{} for {}. Set up NASA Earthdata Login authentication at {}", status, granule.url, EDL_AUTH_HELP);
        return if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN { Err( auth_error(msg)) } else { Err( op_failed(msg)) }
    }

    let mut file = NamedTempFile::new_in( dir)?; // don't use path yet as that would expose partial downloads
    while let Some(chunk) = response.chunk().await? {
        file.write_all( &chunk)?;
    }
    file.flush()?;

    if let Some(digest) = &remote_digest {
        let local = file_sha256( file.path())?;
        if local != *digest {
            return Err( integrity_error( format!("{}: SHA-256 {} does not match {}", fname, local, digest))) // temp file gets deleted on drop
        }
    }

    file.persist( &path).map_err( |e| e.error)?;
    info!("saved {:?}", path);
    Ok( DownloadOutcome::Downloaded(path))
}
