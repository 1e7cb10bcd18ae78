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

//! End-to-end dispatch to rolling files on disk.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use logroute::Config;
use logroute::Dispatcher;
use logroute::ExceptionRecord;
use logroute::LogCategory;
use logroute::LogTypeDescriptor;
use logroute::Rotation;
use logroute::Severity;
use tempfile::TempDir;

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| Some(entry.ok()?.path()))
        .collect::<Vec<_>>();
    files.sort();
    files
}

#[test]
fn test_entries_land_in_type_folders() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dispatcher = Dispatcher::new(Config {
        root: temp_dir.path().to_path_buf(),
        ..Config::default()
    });

    dispatcher
        .log(LogCategory::Startup, "service starting")
        .unwrap()
        .wait()
        .unwrap();
    dispatcher
        .log_record(
            LogCategory::ExceptionDatabase,
            &ExceptionRecord::new("DeadlockDetected").field("Message", "victim chosen"),
        )
        .unwrap()
        .wait()
        .unwrap();
    dispatcher.flush().unwrap();

    let startup = files_in(&temp_dir.path().join("startup"));
    assert_eq!(startup.len(), 1, "{startup:?}");
    let name = startup[0].file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("log_startup_"), "{name}");
    assert!(name.ends_with(".md"), "{name}");
    // hourly rotation: yyyyMMddHH
    assert_eq!(name.len(), "log_startup_".len() + 10 + ".md".len());

    let content = fs::read_to_string(&startup[0]).unwrap();
    let first_line = content.lines().next().unwrap();
    assert!(first_line.ends_with(" [INF] "), "{first_line}");
    assert!(content.contains("Start of Startup Log at utc: "));
    assert!(content.contains("\nservice starting\n"));
    assert!(content.contains("\nEnd of Startup Log at utc: "));

    let database = files_in(&temp_dir.path().join("exceptions/database"));
    assert_eq!(database.len(), 1, "{database:?}");
    let name = database[0].file_name().unwrap().to_str().unwrap();
    // minutely rotation: yyyyMMddHHmm
    assert_eq!(name.len(), "log_exceptiondatabase_".len() + 12 + ".md".len());
    let content = fs::read_to_string(&database[0]).unwrap();
    assert!(content.contains("[FTL]"));
    assert!(content.contains("\"Type\": \"DeadlockDetected\""));
}

#[test]
fn test_custom_log_type_with_fixed_file() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dispatcher = Dispatcher::builder()
        .config(Config {
            root: temp_dir.path().to_path_buf(),
            ..Config::default()
        })
        .build();

    dispatcher.register(
        LogTypeDescriptor::builder("Audit")
            .root(temp_dir.path())
            .folder("security")
            .extension("log")
            .severity(Severity::Warning)
            .rotation(Rotation::Never)
            .output_template("{Level} {Message}{NewLine}")
            .build(),
    );

    for message in ["first", "second", "third"] {
        let _ = dispatcher.log("AUDIT", message).unwrap();
    }
    dispatcher.flush().unwrap();
    drop(dispatcher);

    let path = temp_dir.path().join("security/log_audit_.log");
    let content = fs::read_to_string(&path).unwrap();
    let messages = content
        .lines()
        .filter(|line| !line.starts_with('-') && !line.starts_with("Start") && !line.starts_with("End"))
        .filter(|line| !line.is_empty() && *line != "Warning ")
        .collect::<Vec<_>>();
    assert_eq!(messages, ["first", "second", "third"]);
    assert_eq!(content.matches("Warning \n").count(), 3);
}
