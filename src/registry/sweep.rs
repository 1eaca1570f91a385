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

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossbeam_channel::select;

use crate::Error;
use crate::append::Writer;

/// The periodic size check over every file writer.
#[derive(Debug)]
pub(crate) struct Sweep {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweep {
    pub(crate) fn start(interval: Duration, writers: Vec<Arc<Writer>>) -> Result<Sweep, Error> {
        let (shutdown, stop) = crossbeam_channel::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name("logrota-sweep".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            for writer in &writers {
                                writer.maybe_rotate();
                            }
                        }
                        recv(stop) -> _ => break,
                    }
                }
            })
            .map_err(|err| {
                Error::new("failed to spawn rotation sweep thread")
                    .with_context("interval", format!("{interval:?}"))
                    .with_source(err)
            })?;

        Ok(Sweep {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub(crate) fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweep {
    fn drop(&mut self) {
        self.stop();
    }
}
