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

//! aircraft registry metadata and the remote lookups that provide it

use std::{collections::HashMap, fmt, time::Duration};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug,trace};
use crate::errors::Result;

/// registry metadata of an aircraft. `None` means "unknown"
#[derive(Debug,Clone,PartialEq,Default)]
pub struct EnrichmentRecord {
    pub icao24: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub registration: Option<String>,
    pub owner: Option<String>,
    pub type_code: Option<String>,
    pub mode_s: Option<String>,
    pub operator_flag: Option<String>,
}

impl EnrichmentRecord {
    pub fn unknown (icao24: impl ToString)->Self {
        EnrichmentRecord { icao24: icao24.to_string(), ..Default::default() }
    }

    /// merge known fields of `other` into self. Known values are never replaced by unknown ones,
    /// which makes this idempotent. Returns true if anything changed
    pub fn merge_sticky (&mut self, other: &EnrichmentRecord)->bool {
        let mut changed = false;
        changed |= merge_field( &mut self.manufacturer, &other.manufacturer);
        changed |= merge_field( &mut self.model, &other.model);
        changed |= merge_field( &mut self.registration, &other.registration);
        changed |= merge_field( &mut self.owner, &other.owner);
        changed |= merge_field( &mut self.type_code, &other.type_code);
        changed |= merge_field( &mut self.mode_s, &other.mode_s);
        changed |= merge_field( &mut self.operator_flag, &other.operator_flag);
        changed
    }

    /// a record is complete if all the fields we display are known. Complete records are never looked up again
    pub fn is_complete (&self)->bool {
        self.manufacturer.is_some() && self.model.is_some() && self.registration.is_some() && self.owner.is_some()
    }

    pub fn is_unknown (&self)->bool {
        self.manufacturer.is_none() && self.model.is_none() && self.registration.is_none() && self.owner.is_none()
            && self.type_code.is_none() && self.mode_s.is_none() && self.operator_flag.is_none()
    }

    /// "manufacturer model" as shown in status messages
    pub fn label (&self)->String {
        match (&self.manufacturer, &self.model) {
            (Some(man),Some(model)) => format!("{man} {model}"),
            (Some(s),None) | (None,Some(s)) => s.clone(),
            (None,None) => "unknown".to_string()
        }
    }
}

fn merge_field (dst: &mut Option<String>, src: &Option<String>)->bool {
    match src {
        Some(v) if dst.as_ref() != Some(v) => { *dst = Some(v.clone()); true }
        _ => false
    }
}

fn or_unknown (v: &Option<String>)->&str { v.as_deref().unwrap_or("-") }

impl fmt::Display for EnrichmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "EnrichmentRecord( icao24: {}, man: {}, model: {}, reg: {}, owner: {}, type: {}, mode_s: {}, op: {})",
            self.icao24, or_unknown(&self.manufacturer), or_unknown(&self.model), or_unknown(&self.registration),
            or_unknown(&self.owner), or_unknown(&self.type_code), or_unknown(&self.mode_s), or_unknown(&self.operator_flag))
    }
}

lazy_static! {
    // characters that are not safe for path-like keys in downstream storage
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[/\\.,:]").unwrap();
}

/// cleans up free text fields of looked up records and shortens known verbose manufacturer names
#[derive(Debug,Clone,Default)]
pub struct NameNormalizer {
    aliases: HashMap<String,String>,
}

impl NameNormalizer {
    pub fn new (aliases: HashMap<String,String>)->Self {
        NameNormalizer { aliases }
    }

    pub fn clean (s: &str)->Option<String> {
        let s = UNSAFE_CHARS.replace_all( s, " ");
        let s = s.trim();
        if s.is_empty() { None } else { Some(s.to_string()) }
    }

    fn alias (&self, v: Option<String>)->Option<String> {
        v.map( |s| self.aliases.get(&s).cloned().unwrap_or(s))
    }

    pub fn normalize (&self, rec: EnrichmentRecord)->EnrichmentRecord {
        let clean = |v: Option<String>| v.and_then( |s| Self::clean(&s));

        EnrichmentRecord {
            icao24: rec.icao24,
            manufacturer: self.alias( clean( rec.manufacturer)),
            model: clean( rec.model),
            registration: clean( rec.registration),
            owner: clean( rec.owner),
            type_code: clean( rec.type_code),
            mode_s: clean( rec.mode_s),
            operator_flag: clean( rec.operator_flag),
        }
    }
}

/// why a lookup failed. This is only used for diagnostics - all variants count the same for the circuit breaker
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum LookupFailure {
    Transport,
    Timeout,
    Server(u16),
    Malformed,
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Transport => write!( f, "network error"),
            LookupFailure::Timeout => write!( f, "timeout"),
            LookupFailure::Server(status) => write!( f, "server error {status}"),
            LookupFailure::Malformed => write!( f, "malformed response"),
        }
    }
}

#[derive(Debug,Clone,PartialEq)]
pub enum LookupOutcome {
    Found(EnrichmentRecord),
    NotFound, // 404 - the registry has no data, which is not an error
    Rejected(u16), // any other non-success status
    Failed(LookupFailure),
}

/// the seam for registry services
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    fn name (&self)->&str;
    async fn lookup (&self, icao24: &str)->LookupOutcome;
}

/// shared HTTP part of the registry lookups
#[derive(Debug,Clone)]
pub struct JsonEndpoint {
    client: reqwest::Client,
    url_template: String,
}

impl JsonEndpoint {
    pub fn new (url_template: impl ToString, timeout: Duration)->Result<Self> {
        let client = reqwest::Client::builder().timeout( timeout).build()?;
        Ok( JsonEndpoint { client, url_template: url_template.to_string() } )
    }

    pub fn url_for (&self, icao24: &str)->String {
        self.url_template.replace( crate::config::ICAO24_PLACEHOLDER, icao24)
    }

    /// GET the JSON object for the given id, mapping every non-200 response into the respective outcome
    pub async fn get_json (&self, icao24: &str)->std::result::Result<Value,LookupOutcome> {
        let url = self.url_for( icao24);
        trace!("GET {url}");

        let response = self.client.get( &url).send().await.map_err( |e| LookupOutcome::Failed( failure_of(&e)))?;
        let status = response.status();

        if status == reqwest::StatusCode::OK {
            let bytes = response.bytes().await.map_err( |e| LookupOutcome::Failed( failure_of(&e)))?;
            match serde_json::from_slice::<Value>( &bytes) {
                Ok(v) if v.is_object() => Ok(v),
                _ => Err( LookupOutcome::Failed( LookupFailure::Malformed))
            }
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err( LookupOutcome::NotFound)
        } else if status.is_server_error() {
            Err( LookupOutcome::Failed( LookupFailure::Server( status.as_u16())))
        } else {
            Err( LookupOutcome::Rejected( status.as_u16()))
        }
    }
}

fn failure_of (e: &reqwest::Error)->LookupFailure {
    if e.is_timeout() { LookupFailure::Timeout }
    else if e.is_decode() || e.is_body() { LookupFailure::Malformed }
    else { LookupFailure::Transport }
}

/// string value of a JSON field, treating empty strings and non-strings as unknown
fn text (v: &Value, key: &str)->Option<String> {
    match v.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None
    }
}

/// the primary registry (hexdb.io style): `{"ModeS":"A0B59D","Registration":"N15986","Manufacturer":"Boeing",
/// "ICAOTypeCode":"B738","Type":"737-824","RegisteredOwners":"United Airlines","OperatorFlagCode":"UAL"}`
pub struct HexDbLookup {
    endpoint: JsonEndpoint,
}

impl HexDbLookup {
    pub fn new (url_template: impl ToString, timeout: Duration)->Result<Self> {
        Ok( HexDbLookup { endpoint: JsonEndpoint::new( url_template, timeout)? } )
    }
}

pub fn parse_hexdb_record (icao24: &str, v: &Value)->EnrichmentRecord {
    EnrichmentRecord {
        icao24: icao24.to_string(),
        manufacturer: text( v, "Manufacturer"),
        model: text( v, "Type"),
        registration: text( v, "Registration"),
        owner: text( v, "RegisteredOwners"),
        type_code: text( v, "ICAOTypeCode"),
        mode_s: text( v, "ModeS"),
        operator_flag: text( v, "OperatorFlagCode"),
    }
}

#[async_trait]
impl RegistryLookup for HexDbLookup {
    fn name (&self)->&str { "hexdb" }

    async fn lookup (&self, icao24: &str)->LookupOutcome {
        match self.endpoint.get_json( icao24).await {
            Ok(v) => LookupOutcome::Found( parse_hexdb_record( icao24, &v)),
            Err(outcome) => {
                debug!("{} lookup of {} -> {:?}", self.name(), icao24, outcome);
                outcome
            }
        }
    }
}

/// the secondary registry (OpenSky metadata style): `{"icao24":"a0b59d","registration":"N15986",
/// "manufacturerName":"Boeing","model":"737-824","typecode":"B738","owner":"United Airlines","operatorIcao":"UAL"}`
pub struct OpenSkyLookup {
    endpoint: JsonEndpoint,
}

impl OpenSkyLookup {
    pub fn new (url_template: impl ToString, timeout: Duration)->Result<Self> {
        Ok( OpenSkyLookup { endpoint: JsonEndpoint::new( url_template, timeout)? } )
    }
}

/// if there is no manufacturer name we take the first word of the model as manufacturer and the rest as model
pub fn parse_opensky_record (icao24: &str, v: &Value)->EnrichmentRecord {
    let mut manufacturer = text( v, "manufacturerName");
    let mut model = text( v, "model");

    if manufacturer.is_none() {
        if let Some(m) = model.take() {
            match m.split_once( char::is_whitespace) {
                Some((man,rest)) => {
                    manufacturer = Some(man.to_string());
                    let rest = rest.trim();
                    if !rest.is_empty() { model = Some(rest.to_string()) }
                }
                None => model = Some(m)
            }
        }
    }

    EnrichmentRecord {
        icao24: icao24.to_string(),
        manufacturer,
        model,
        registration: text( v, "registration"),
        owner: text( v, "owner").or_else( || text( v, "operator")),
        type_code: text( v, "typecode"),
        mode_s: text( v, "icao24").map( |s| s.to_uppercase()),
        operator_flag: text( v, "operatorIcao"),
    }
}

#[async_trait]
impl RegistryLookup for OpenSkyLookup {
    fn name (&self)->&str { "opensky" }

    async fn lookup (&self, icao24: &str)->LookupOutcome {
        // OpenSky keys are lower case
        match self.endpoint.get_json( &icao24.to_lowercase()).await {
            Ok(v) => LookupOutcome::Found( parse_opensky_record( icao24, &v)),
            Err(outcome) => {
                debug!("{} lookup of {} -> {:?}", self.name(), icao24, outcome);
                outcome
            }
        }
    }
}
