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

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::time::Duration;

// for simple use cases that do not require to handle leap seconds and the like we provide our own wrappers
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }

/// get a DateTime<Utc> from a NaiveDate that is supposed to be in Utc
pub fn naive_utc_date_to_utc_datetime (nd: NaiveDate) -> DateTime<Utc> {
    let ndt = NaiveDateTime::new(nd, NaiveTime::MIN);
    DateTime::from_naive_utc_and_offset(ndt,Utc)
}

/// parse a `YYYY-MM-DD` date string into the start of that day in UTC
pub fn parse_utc_date (s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok().map( naive_utc_date_to_utc_datetime)
}

/// whole-second ISO 8601 representation with `Z` zone designator, e.g. `2021-03-01T00:00:00Z`
pub fn iso8601_secs (dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

//--- support for clap value parsers

pub fn parse_utc_date_arg (s: &str) -> Result<DateTime<Utc>,String> {
    parse_utc_date(s).ok_or_else( || format!("not a valid date in YYYY-MM-DD format: '{s}'"))
}
