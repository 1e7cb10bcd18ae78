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

//! End-to-end dispatch through in-memory sinks.

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use jiff::tz::Offset;
use jiff::tz::TimeZone;
use logroute::Dispatcher;
use logroute::Error;
use logroute::ErrorKind;
use logroute::LogCategory;
use logroute::LogType;
use logroute::LogTypeDescriptor;
use logroute::Payload;
use logroute::Rotation;
use logroute::Severity;
use logroute::sink::Sink;
use logroute::sink::Testing;
use rand::Rng;
use rand::distr::Alphanumeric;

fn capturing(tz: TimeZone) -> (Dispatcher, Testing, Arc<AtomicUsize>) {
    let captured = Testing::default();
    let built = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder()
        .timezone(tz)
        .sink_factory({
            let captured = captured.clone();
            let built = built.clone();
            move |_: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(captured.clone()))
            }
        })
        .build();
    (dispatcher, captured, built)
}

#[test]
fn test_startup_entry_is_enveloped() {
    let (dispatcher, captured, _) = capturing(TimeZone::fixed(Offset::constant(3)));
    dispatcher
        .log(LogCategory::Startup, "service starting")
        .unwrap()
        .wait()
        .unwrap();

    let entries = captured.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, Severity::Information);

    let lines = entries[0].text.lines().collect::<Vec<_>>();
    assert_eq!(&lines[..4], ["", "-----", "----------", "---------------"]);
    assert!(lines[4].starts_with("Start of Startup Log at utc: "));
    assert!(lines[4].contains(" +00:00, local: "));
    assert!(lines[4].ends_with(" +03:00"));
    assert_eq!(lines[5], "-----");
    assert_eq!(lines[6], "service starting");
    assert_eq!(lines[7], "-----");
    assert!(lines[8].starts_with("End of Startup Log at utc: "));
    assert_eq!(&lines[9..], ["---------------", "----------", "-----"]);

    // header and footer carry the same stamp
    assert_eq!(
        lines[4].trim_start_matches("Start of"),
        lines[8].trim_start_matches("End of")
    );
}

#[test]
fn test_missing_payload_is_placeholder() {
    let (dispatcher, captured, _) = capturing(TimeZone::UTC);
    dispatcher
        .log(LogCategory::TraceLog, None::<String>)
        .unwrap()
        .wait()
        .unwrap();
    dispatcher
        .log(LogCategory::TraceLog, "  ")
        .unwrap()
        .wait()
        .unwrap();

    for text in captured.texts() {
        assert_eq!(text.lines().nth(6), Some("No log data provided."));
    }
}

#[test]
fn test_structured_payload() {
    #[derive(serde::Serialize)]
    struct Order {
        id: u64,
        items: Vec<&'static str>,
    }

    let (dispatcher, captured, _) = capturing(TimeZone::UTC);
    let order = Order {
        id: 17,
        items: vec!["tea"],
    };
    dispatcher
        .log("TraceLog", Payload::structured(&order))
        .unwrap()
        .wait()
        .unwrap();
    assert!(captured.texts()[0].contains("\"id\": 17"));
}

#[test]
fn test_unregistered_name() {
    let (dispatcher, captured, built) = capturing(TimeZone::UTC);
    let err = dispatcher.log("Payments", "lost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationNotFound);
    assert!(dispatcher.log_type("payments").is_err());
    assert!(captured.is_empty());
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_startup_exception_policy_ignores_registration_order() {
    let (dispatcher, _, _) = capturing(TimeZone::UTC);
    let before = dispatcher.resolve(LogCategory::StartupException).unwrap();

    dispatcher.register(
        LogTypeDescriptor::builder("startupexception")
            .severity(Severity::Debug)
            .rotation(Rotation::Never)
            .build(),
    );
    let after = dispatcher.resolve(LogCategory::StartupException).unwrap();

    for log_type in [before, after] {
        assert_eq!(log_type.severity(), Severity::Fatal);
        assert_eq!(log_type.rotation(), Rotation::Minutely);
    }
}

#[test]
fn test_exception_without_cause() {
    let (dispatcher, captured, _) = capturing(TimeZone::UTC);
    let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
    dispatcher
        .log_exception(LogCategory::Exception, &err)
        .unwrap()
        .wait()
        .unwrap();

    let text = &captured.texts()[0];
    let start = text.find('{').unwrap();
    let end = text.rfind('}').unwrap();
    let value: serde_json::Value = serde_json::from_str(&text[start..=end]).unwrap();
    assert_eq!(value["InnerException"], "");
    assert_eq!(value["Message"], "read-only volume");
    assert_eq!(captured.entries()[0].severity, Severity::Error);
}

#[test]
fn test_concurrent_first_dispatch_builds_one_sink() {
    const CALLERS: usize = 32;

    let (dispatcher, captured, built) = capturing(TimeZone::UTC);
    let dispatcher = Arc::new(dispatcher);
    dispatcher.register(LogTypeDescriptor::builder("Orders").build());
    let barrier = Arc::new(Barrier::new(CALLERS));

    let payloads = (0..CALLERS)
        .map(|_| {
            rand::rng()
                .sample_iter(&Alphanumeric)
                .take(24)
                .map(char::from)
                .collect::<String>()
        })
        .collect::<Vec<_>>();

    let handles = payloads
        .iter()
        .cloned()
        .map(|payload| {
            let dispatcher = dispatcher.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                dispatcher.log("orders", payload).unwrap().wait().unwrap();
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.sink_cache().len(), 1);
    let texts = captured.texts();
    assert_eq!(texts.len(), CALLERS);
    for payload in &payloads {
        assert!(texts.iter().any(|t| t.contains(payload.as_str())));
    }
}

#[tokio::test]
async fn test_await_handoff() {
    let (dispatcher, captured, _) = capturing(TimeZone::UTC);
    dispatcher
        .log(LogCategory::Failure, "nightly export failed")
        .unwrap()
        .await
        .unwrap();
    assert_eq!(captured.entries()[0].severity, Severity::Fatal);
}
