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

//! RON based configuration support.
//!
//! Config files are looked up in this order:
//! 1. `$RADAR_HOME/configs/<crate>/<file>`
//! 2. `~/.radar/configs/<crate>/<file>`
//! 3. `<crate-dir>/configs/<file>` (the source tree the crate was built from)
//!
//! If none exists, crates that expanded [`define_load_config`] fall back to the copy that was embedded
//! at compile time.

use std::{env, fs, path::{Path,PathBuf}};
use serde::de::DeserializeOwned;
use crate::define_error;

pub const CONFIGS: &'static str = "configs";

define_error!{ pub ConfigError =
    IOError( #[from] std::io::Error ) : "IO error: {0}",
    RonError( #[from] ron::error::SpannedError ) : "RON error: {0}",
    ResourceNotFound(String) : "config not found: {0}",
}

pub type Result<T> = std::result::Result<T,ConfigError>;

pub fn find_config_file (resource_crate: &str, crate_dir: Option<&Path>, filename: &str)->Option<PathBuf> {
    if let Ok(radar_home) = env::var("RADAR_HOME") {
        let path = Path::new( radar_home.as_str()).join( CONFIGS).join( resource_crate).join( filename);
        if path.is_file() { return Some(path) }
    }

    if let Ok(usr_home) = env::var("HOME") {
        let path = Path::new( usr_home.as_str()).join(".radar").join( CONFIGS).join( resource_crate).join( filename);
        if path.is_file() { return Some(path) }
    }

    if let Some(dir) = crate_dir {
        let path = dir.join( CONFIGS).join( filename);
        if path.is_file() { return Some(path) }
    }

    None
}

pub fn load_config_path<C> (path: impl AsRef<Path>)->Result<C> where C: DeserializeOwned {
    let src = fs::read_to_string( path.as_ref())?;
    from_ron_str( &src)
}

pub fn from_ron_str<C> (src: &str)->Result<C> where C: DeserializeOwned {
    Ok( ron::de::from_str( src)? )
}

/// this is the macro that needs to be expanded at the top of crates (lib.rs) that define configs.
/// It takes the names of the config files within the crate's `configs/` dir that should be embedded
/// as fallbacks. Config users call the generated `load_config(..)` function to instantiate config structs
/// ```ignore
/// define_load_config!{ "live_track.ron" }
/// ...
/// let config: LiveTrackConfig = load_config("live_track.ron")?;
/// ```
#[macro_export]
macro_rules! define_load_config {
    ( $( $file:literal ),* $(,)? ) => {
        mod configs {
            use std::path::Path;

            fn embedded_config (filename: &str)->Option<&'static str> {
                match filename {
                    $( $file => Some( include_str!( concat!( env!("CARGO_MANIFEST_DIR"), "/configs/", $file))), )*
                    _ => None
                }
            }

            /// load config from the first file found in the lookup path, or from the embedded default
            pub fn load_config<C> (filename: &str)->$crate::config::Result<C> where C: serde::de::DeserializeOwned {
                let resource_crate = env!("CARGO_PKG_NAME");
                let crate_dir = Path::new( env!("CARGO_MANIFEST_DIR"));

                if let Some(path) = $crate::config::find_config_file( resource_crate, Some(crate_dir), filename) {
                    return $crate::config::load_config_path( &path)
                }

                if let Some(src) = embedded_config( filename) {
                    return $crate::config::from_ron_str( src)
                }

                Err( $crate::config::ConfigError::ResourceNotFound( filename.to_string()) )
            }
        }
        pub use configs::*; // make load_config() visible at the crate level
    }
}
