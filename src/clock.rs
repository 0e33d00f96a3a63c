//! Timestamp-resolution synchronization.
//!
//! Many filesystems only keep modification times to the second. When a test
//! rewrites a source file right after a build, the new file can end up with
//! the same timestamp as the outputs of that build and a timestamp-driven
//! build tool will then skip the rebuild. [`BuildClock`] waits until freshly
//! written files are guaranteed to look newer than the last build.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Source of "what timestamp would a file written right now receive".
pub trait FileClock {
    fn current_file_timestamp(&self) -> io::Result<SystemTime>;
}

/// Creates a throwaway file in `dir` and reads back its modification time.
///
/// `dir` should live on the same filesystem as the tree under test but
/// outside it, so probes never show up in a snapshot.
#[derive(Debug, Clone)]
pub struct ProbeFileClock {
    dir: PathBuf,
}

impl ProbeFileClock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ProbeFileClock { dir: dir.into() }
    }
}

impl FileClock for ProbeFileClock {
    fn current_file_timestamp(&self) -> io::Result<SystemTime> {
        let probe = tempfile::Builder::new()
            .prefix("__buildward_timestamp_probe__")
            .tempfile_in(&self.dir)?;
        probe.as_file().metadata()?.modified()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSettings {
    /// Coarsest timestamp resolution the tool under test may use.
    pub resolution: Duration,
    /// Sleep between probes.
    pub poll_interval: Duration,
    /// Extra sleep when the probe ended up close to the boundary, absorbing
    /// rounding differences between our view of the clock and the tool's.
    pub buffer: Duration,
    /// Flat sleep used when there is no threshold to compare against.
    pub fallback_wait: Duration,
}

impl Default for ClockSettings {
    fn default() -> Self {
        ClockSettings {
            resolution: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            buffer: Duration::from_millis(100),
            fallback_wait: Duration::from_millis(1100),
        }
    }
}

/// Build clock state for one harness instance.
#[derive(Debug)]
pub struct BuildClock<C = ProbeFileClock> {
    clock: C,
    settings: ClockSettings,
    last_build: Option<SystemTime>,
}

impl<C: FileClock> BuildClock<C> {
    pub fn new(clock: C) -> Self {
        Self::with_settings(clock, ClockSettings::default())
    }

    pub fn with_settings(clock: C, settings: ClockSettings) -> Self {
        BuildClock {
            clock,
            settings,
            last_build: None,
        }
    }

    pub fn last_build(&self) -> Option<SystemTime> {
        self.last_build
    }

    pub fn settings(&self) -> ClockSettings {
        self.settings
    }

    /// Records the outcome of a build.
    ///
    /// The threshold only advances when the build changed something; a
    /// no-op build produced no new timestamps to get past.
    pub fn record_build(&mut self, latest_mtime: Option<SystemTime>, changed_anything: bool) {
        if changed_anything {
            self.last_build = latest_mtime;
        }
    }

    /// Forgets the last build, e.g. after the whole tree was deleted.
    pub fn reset(&mut self) {
        self.last_build = None;
    }

    /// Waits until new timestamps are distinguishable from the last build's.
    /// Does nothing before the first build that changed anything.
    pub fn wait_since_last_build(&self) -> io::Result<()> {
        match self.last_build {
            Some(threshold) => self.wait_until_after(Some(threshold)),
            None => Ok(()),
        }
    }

    /// Blocks until a freshly created file gets a timestamp at least one
    /// resolution unit past `threshold`.
    ///
    /// Without a threshold this sleeps [`ClockSettings::fallback_wait`].
    pub fn wait_until_after(&self, threshold: Option<SystemTime>) -> io::Result<()> {
        let Some(threshold) = threshold else {
            debug!(
                "No build timestamp known, sleeping {:?}",
                self.settings.fallback_wait
            );
            std::thread::sleep(self.settings.fallback_wait);
            return Ok(());
        };

        let target = threshold + self.settings.resolution;
        let near_boundary =
            self.clock.current_file_timestamp()? < target + self.settings.resolution;

        let mut polls = 0u32;
        while self.clock.current_file_timestamp()? < target {
            std::thread::sleep(self.settings.poll_interval);
            polls += 1;
        }

        if near_boundary {
            std::thread::sleep(self.settings.buffer);
        }

        if polls > 0 {
            info!(
                "Waited {} polls for file timestamps to pass the last build",
                polls
            );
        }

        Ok(())
    }
}
