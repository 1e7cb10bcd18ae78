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
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use jiff::Zoned;

use crate::DefaultTrap;
use crate::Error;
use crate::ErrorKind;
use crate::Rotation;
use crate::Trap;
use crate::clock::Clock;

/// A writer for time-rotated, append-only files.
///
/// The writer is configured with a path template such as `app-logs/startup/log_startup_.md`.
/// Each period gets its own file with the period's timestamp inserted before the extension, e.g.
/// `app-logs/startup/log_startup_2024081017.md` for an hourly rotation. Existing files are appended
/// to, so a restarted process continues the current period's file.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    writer: File,
}

impl RollingFileWriter {
    /// Creates a new [`RollingFileWriterBuilder`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logroute::sink::RollingFileWriter;
    ///
    /// let builder = RollingFileWriter::builder("app-logs/default/log_default_.md");
    /// ```
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> RollingFileWriterBuilder {
        RollingFileWriterBuilder::new(path)
    }

    /// Return the path of the file currently written to.
    pub fn current_path(&self) -> &Path {
        &self.state.current_path
    }
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            let err = Error::new(ErrorKind::SinkWrite, "failed to flush file writer on dropped")
                .with_source(err);
            self.state.trap.trap(&err);
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let now = self.state.clock.now();
        let writer = &mut self.writer;
        if self.state.should_rollover_on_date(&now) {
            self.state.advance_date(&now);
            self.state.refresh_writer(&now, writer);
        }

        writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    path: PathBuf,
    rotation: Rotation,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotation: Rotation::Never,
            clock: Clock::DefaultClock,
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Sets the rotation policy.
    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the trap receiving errors that happen while rolling over.
    #[must_use]
    pub fn trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RollingFileWriter`].
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The path template has no file name.
    /// * The log directory cannot be created.
    /// * The current log file cannot be opened.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            path,
            rotation,
            clock,
            trap,
        } = self;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::new(ErrorKind::ConfigInvalid, "log path must name a file")
                    .with_context("path", path.display())
            })?
            .to_string();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
        let log_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (state, writer) = State::new(rotation, log_dir, stem, extension, clock, trap)?;
        Ok(RollingFileWriter { state, writer })
    }
}

#[derive(Debug)]
struct State {
    log_dir: PathBuf,
    log_filename_stem: String,
    log_filename_extension: Option<String>,
    rotation: Rotation,
    current_path: PathBuf,
    next_date_timestamp: Option<usize>,
    clock: Clock,
    trap: Arc<dyn Trap>,
}

impl State {
    fn new(
        rotation: Rotation,
        log_dir: PathBuf,
        log_filename_stem: String,
        log_filename_extension: Option<String>,
        clock: Clock,
        trap: Arc<dyn Trap>,
    ) -> Result<(Self, File), Error> {
        let now = clock.now();
        fs::create_dir_all(&log_dir).map_err(|err| {
            Error::new(ErrorKind::SinkWrite, "failed to create log directory")
                .with_context("dir", log_dir.display())
                .with_source(err)
        })?;

        let mut state = State {
            log_dir,
            log_filename_stem,
            log_filename_extension,
            next_date_timestamp: rotation.next_date_timestamp(&now),
            rotation,
            current_path: PathBuf::new(),
            clock,
            trap,
        };

        state.current_path = state.filename_for(&now);
        let file = state.create_log_writer(&state.current_path)?;
        Ok((state, file))
    }

    fn filename_for(&self, date: &Zoned) -> PathBuf {
        let stem = &self.log_filename_stem;
        let date = match self.rotation {
            Rotation::Never => String::new(),
            rotation => date.strftime(rotation.date_format()).to_string(),
        };
        let filename = match &self.log_filename_extension {
            Some(ext) => format!("{stem}{date}.{ext}"),
            None => format!("{stem}{date}"),
        };
        self.log_dir.join(filename)
    }

    fn create_log_writer(&self, path: &Path) -> Result<File, Error> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| {
                Error::new(ErrorKind::SinkWrite, "failed to open log file")
                    .with_context("path", path.display())
                    .with_source(err)
            })
    }

    fn refresh_writer(&mut self, now: &Zoned, file: &mut File) {
        let path = self.filename_for(now);
        match self.create_log_writer(&path) {
            Ok(new_file) => {
                if let Err(err) = file.flush() {
                    let err = Error::new(ErrorKind::SinkWrite, "failed to flush previous writer")
                        .with_source(err);
                    self.trap.trap(&err);
                }
                *file = new_file;
                self.current_path = path;
            }
            Err(err) => self.trap.trap(&err),
        }
    }

    fn should_rollover_on_date(&self, date: &Zoned) -> bool {
        self.next_date_timestamp
            .is_some_and(|ts| date.timestamp().as_millisecond() as usize >= ts)
    }

    fn advance_date(&mut self, now: &Zoned) {
        self.next_date_timestamp = self.rotation.next_date_timestamp(now);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::ops::Add;
    use std::str::FromStr;

    use jiff::Span;
    use jiff::Zoned;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_filename_from_template() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let start_time = Zoned::from_str("2024-08-10T17:12:52[UTC]").unwrap();

        let writer = RollingFileWriterBuilder::new(temp_dir.path().join("startup/log_startup_.md"))
            .rotation(Rotation::Hourly)
            .clock(Clock::ManualClock(ManualClock::new(start_time)))
            .build()
            .unwrap();
        assert_eq!(
            writer.current_path(),
            temp_dir.path().join("startup/log_startup_2024081017.md")
        );

        let writer = RollingFileWriterBuilder::new(temp_dir.path().join("plain/log_plain_.md"))
            .build()
            .unwrap();
        assert_eq!(
            writer.current_path(),
            temp_dir.path().join("plain/log_plain_.md")
        );
    }

    #[test]
    fn test_reopen_appends() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("log_default_.md");

        for line in ["first\n", "second\n"] {
            let mut writer = RollingFileWriterBuilder::new(&path).build().unwrap();
            writer.write_all(line.as_bytes()).unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_file_rolling_via_time_rotation() {
        test_file_rolling_for_specific_time_rotation(
            Rotation::Minutely,
            Span::new().minutes(1),
            Span::new().seconds(1),
        );
        test_file_rolling_for_specific_time_rotation(
            Rotation::Hourly,
            Span::new().hours(1),
            Span::new().minutes(1),
        );
        test_file_rolling_for_specific_time_rotation(
            Rotation::Daily,
            Span::new().days(1),
            Span::new().hours(1),
        );
    }

    fn test_file_rolling_for_specific_time_rotation(
        rotation: Rotation,
        rotation_duration: Span,
        write_interval: Span,
    ) {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let periods = 5;

        let start_time = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = RollingFileWriterBuilder::new(temp_dir.path().join("log_test_.md"))
            .rotation(rotation)
            .clock(Clock::ManualClock(ManualClock::new(start_time.clone())))
            .build()
            .unwrap();

        let mut cur_time = start_time;
        let mut total_written = 0;

        for i in 1..=periods {
            let end_time = cur_time.clone().add(rotation_duration);
            while cur_time < end_time {
                writer.state.clock.set_now(cur_time.clone());

                let rand_str = generate_random_string();
                total_written += rand_str.len();
                assert_eq!(writer.write(rand_str.as_bytes()).unwrap(), rand_str.len());

                cur_time = cur_time.add(write_interval);
            }

            writer.flush().unwrap();
            assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), i);
        }

        let on_disk = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().metadata().unwrap().len() as usize)
            .sum::<usize>();
        assert_eq!(on_disk, total_written);
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        let err = RollingFileWriterBuilder::new("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        let random_string: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect();

        random_string
    }
}
