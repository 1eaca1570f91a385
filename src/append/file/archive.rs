// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::Error;

/// How a rotated file is stored at its archive location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compress {
    /// Moved verbatim.
    #[default]
    None,
    /// Gzip-compressed, with a `.gz` suffix appended to the archive name.
    Gzip,
}

impl Compress {
    /// Parse a configured compression mode: `gzip` (any case) or empty.
    pub fn from_name(name: &str) -> Result<Compress, Error> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("none") {
            Ok(Compress::None)
        } else if name.eq_ignore_ascii_case("gzip") {
            Ok(Compress::Gzip)
        } else {
            Err(Error::new("unsupported compression").with_context("compress", name))
        }
    }

    /// The final location of an archive resolved to `name`.
    pub fn archive_path(self, name: &str) -> PathBuf {
        match self {
            Compress::None => PathBuf::from(name),
            Compress::Gzip => PathBuf::from(format!("{name}.gz")),
        }
    }
}

/// Move the staged file to `target`, compressing it when asked.
///
/// The staged file is removed once the archive is complete.
pub(crate) fn store(staging: &Path, target: &Path, compress: Compress) -> Result<(), Error> {
    let failed = |what: &str, err: io::Error| {
        Error::new(format!("failed to {what}"))
            .with_context("staging", staging.display())
            .with_context("archive", target.display())
            .with_source(err)
    };

    match compress {
        Compress::None => {
            if fs::rename(staging, target).is_ok() {
                return Ok(());
            }
            // rename does not cross file systems
            fs::copy(staging, target).map_err(|err| failed("copy rotated log", err))?;
        }
        Compress::Gzip => {
            let input = File::open(staging).map_err(|err| failed("open rotated log", err))?;
            let output = File::create(target).map_err(|err| failed("create archive", err))?;
            let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
            io::copy(&mut BufReader::new(input), &mut encoder)
                .map_err(|err| failed("compress rotated log", err))?;
            encoder
                .finish()
                .and_then(|mut out| out.flush())
                .map_err(|err| failed("finish archive", err))?;
        }
    }

    fs::remove_file(staging).map_err(|err| failed("remove staged log", err))
}
