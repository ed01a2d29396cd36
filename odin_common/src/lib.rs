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
#![allow(unused)]

//! common utilities shared between ODIN crates that do not carry any domain semantics

pub mod macros;
pub mod fs;
pub mod datetime;

/// a simple incremental min/max accumulator
#[derive(Debug,Clone,Copy)]
pub struct MinMax {
    pub n: usize,
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    pub fn new()->Self { MinMax { n: 0, min: f64::MAX, max: f64::MIN } }

    /// add a new observation. Non-finite values are ignored
    pub fn add (&mut self, x: f64) {
        if x.is_finite() {
            self.n += 1;
            if x < self.min { self.min = x }
            if x > self.max { self.max = x }
        }
    }

    pub fn is_empty (&self)->bool { self.n == 0 }
}
