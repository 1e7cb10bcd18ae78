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

use logroute::Dispatcher;
use logroute::Error;
use logroute::LogType;
use logroute::sink::Sink;
use logroute::sink::Testing;

// a record whose formatting logs again must not deadlock the dispatcher
#[test]
fn test_meta_logging_in_format_works() {
    let captured = Testing::default();
    let dispatcher = Dispatcher::builder()
        .sink_factory({
            let captured = captured.clone();
            move |_: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
                Ok(Arc::new(captured.clone()))
            }
        })
        .build();
    logroute::bridge::try_setup_log_crate(Arc::new(dispatcher)).unwrap();

    struct Thing<'a>(&'a str);

    impl std::fmt::Display for Thing<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            log::debug!("formatting wrapping ({})", self.0);
            f.write_str(self.0)
        }
    }

    log::info!(target: "TraceLog", "I'm logging {}!", Thing("aha"));
    log::debug!(target: "logroute::cache", "never routed");

    let texts = captured.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("Start of Default Log"));
    assert!(texts[0].contains("formatting wrapping (aha)"));
    assert!(texts[1].contains("Start of TraceLog Log"));
    assert!(texts[1].contains("I'm logging aha!"));
}
