//! Firmware update controller.
//!
//! Chunk-driven lifecycle: Idle → Receiving → Finalizing → {Applied | Failed}.
//!
//! A session opens on chunk index 0 and every outcome is published on the
//! "ota" event channel, separate from command responses. Success arms a
//! pending-restart flag that `tick()` honours on a later loop iteration —
//! a deliberate two-phase commit so the upload's HTTP acknowledgment
//! reaches the client before the device reboots. A failed write stops the
//! controller honouring further chunks without aborting the in-flight
//! transport; the transport finishes naturally and reports FAIL.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, FlashPort, RestartPort};
use crate::config::{UPDATE_RESERVED_MARGIN, UPDATE_SECTOR_MASK};
use crate::error::UpdateError;

/// Update lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Receiving,
    Finalizing,
    Applied,
    Failed,
}

/// Shape the usable image budget from the reported free space: keep a
/// reserved margin and round down to a flash-sector boundary.
pub fn image_budget(free_space: u32) -> u32 {
    free_space.saturating_sub(UPDATE_RESERVED_MARGIN) & UPDATE_SECTOR_MASK
}

/// The four-state update controller.
pub struct UpdateController {
    state: UpdateState,
    bytes_received: u32,
    source: heapless::String<32>,
    pending_restart: bool,
}

impl UpdateController {
    pub fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            bytes_received: 0,
            source: heapless::String::new(),
            pending_restart: false,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Bytes accepted in the current/most recent session. Monotonically
    /// non-decreasing while Receiving.
    pub fn bytes_received(&self) -> u32 {
        self.bytes_received
    }

    pub fn restart_pending(&self) -> bool {
        self.pending_restart
    }

    /// Feed one upload chunk.
    ///
    /// `index == 0` opens a session (resetting any previous one); chunks
    /// after a failure are ignored until the next index-0 chunk. `is_final`
    /// seals and validates the image.
    pub fn on_chunk(
        &mut self,
        flash: &mut impl FlashPort,
        sink: &mut impl EventSink,
        name: &str,
        index: u32,
        data: &[u8],
        is_final: bool,
    ) {
        if index == 0 {
            self.begin_session(flash, sink, name);
        }

        match self.state {
            UpdateState::Receiving => {}
            // Post-failure chunks (and chunks with no session) are no-ops;
            // the transport is allowed to finish streaming.
            _ => return,
        }

        if !data.is_empty() {
            match flash.write(data) {
                Ok(written) if written == data.len() => {
                    self.bytes_received += written as u32;
                    sink.emit(&AppEvent::UpdateProgress {
                        bytes: self.bytes_received,
                    });
                }
                Ok(written) => {
                    warn!("update: short write ({written}/{} bytes)", data.len());
                    self.fail(flash, sink, UpdateError::ShortWrite);
                    return;
                }
                Err(e) => {
                    warn!("update: write failed ({e})");
                    self.fail(flash, sink, e);
                    return;
                }
            }
        }

        if is_final {
            self.finalize(flash, sink);
        }
    }

    /// Deferred restart check; call once per loop iteration.
    pub fn tick(&mut self, restart: &mut impl RestartPort) {
        if self.pending_restart {
            info!("update: restarting into new firmware");
            restart.restart();
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_session(&mut self, flash: &mut impl FlashPort, sink: &mut impl EventSink, name: &str) {
        if self.state == UpdateState::Receiving {
            // A fresh upload supersedes the stalled one.
            warn!("update: new session while receiving, discarding previous");
            flash.abort();
        }
        self.state = UpdateState::Idle;
        self.bytes_received = 0;
        self.pending_restart = false;
        self.source.clear();
        let _ = self.source.push_str(&name[..name.len().min(32)]);

        let budget = image_budget(flash.free_space());
        match flash.begin(budget) {
            Ok(()) => {
                info!("update: start '{name}' (budget {budget}B)");
                self.state = UpdateState::Receiving;
                sink.emit(&AppEvent::UpdateStarted {
                    source: self.source.clone(),
                });
            }
            Err(e) => {
                // No partial state: stay Idle, report on the event stream.
                warn!("update: begin failed ({e})");
                sink.emit(&AppEvent::UpdateFailed(e));
            }
        }
    }

    fn finalize(&mut self, flash: &mut impl FlashPort, sink: &mut impl EventSink) {
        self.state = UpdateState::Finalizing;
        match flash.finalize() {
            Ok(()) => {
                self.state = UpdateState::Applied;
                self.pending_restart = true;
                info!("update: success, {}B received", self.bytes_received);
                sink.emit(&AppEvent::UpdateApplied {
                    bytes: self.bytes_received,
                });
            }
            Err(e) => {
                warn!("update: finalize failed ({e})");
                self.fail(flash, sink, e);
            }
        }
    }

    fn fail(&mut self, flash: &mut impl FlashPort, sink: &mut impl EventSink, error: UpdateError) {
        // Release the flash session so the next index-0 chunk starts clean.
        flash.abort();
        self.state = UpdateState::Failed;
        self.pending_restart = false;
        sink.emit(&AppEvent::UpdateFailed(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flash stub with scriptable fault injection.
    struct MockFlash {
        image: Vec<u8>,
        open: bool,
        fail_begin: bool,
        fail_finalize: bool,
        /// Write at most this many bytes per call (short-write injection).
        write_cap: Option<usize>,
        writes_after_failure: usize,
        aborted: usize,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                image: Vec::new(),
                open: false,
                fail_begin: false,
                fail_finalize: false,
                write_cap: None,
                writes_after_failure: 0,
                aborted: 0,
            }
        }
    }

    impl FlashPort for MockFlash {
        fn free_space(&self) -> u32 {
            0x10_0000
        }
        fn begin(&mut self, _max: u32) -> Result<(), UpdateError> {
            if self.fail_begin {
                return Err(UpdateError::BeginFailed);
            }
            self.open = true;
            self.image.clear();
            Ok(())
        }
        fn write(&mut self, data: &[u8]) -> Result<usize, UpdateError> {
            if !self.open {
                self.writes_after_failure += 1;
                return Err(UpdateError::NoSession);
            }
            let n = self.write_cap.map_or(data.len(), |cap| cap.min(data.len()));
            self.image.extend_from_slice(&data[..n]);
            Ok(n)
        }
        fn finalize(&mut self) -> Result<(), UpdateError> {
            self.open = false;
            if self.fail_finalize {
                return Err(UpdateError::FinalizeFailed);
            }
            Ok(())
        }
        fn abort(&mut self) {
            self.open = false;
            self.aborted += 1;
        }
    }

    #[derive(Default)]
    struct EventLog(Vec<AppEvent>);

    impl EventSink for EventLog {
        fn emit(&mut self, e: &AppEvent) {
            self.0.push(e.clone());
        }
    }

    #[derive(Default)]
    struct RestartSpy {
        restarts: u32,
    }

    impl RestartPort for RestartSpy {
        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    #[test]
    fn happy_path_applies_and_arms_restart_once() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"aaaa", false);
        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 1, b"bbbb", false);
        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 2, b"cc", true);

        assert_eq!(ctl.state(), UpdateState::Applied);
        assert_eq!(ctl.bytes_received(), 10);
        assert!(ctl.restart_pending());
        assert_eq!(flash.image, b"aaaabbbbcc");
        assert!(matches!(
            sink.0.last(),
            Some(AppEvent::UpdateApplied { bytes: 10 })
        ));

        // Restart fires from tick, not from the chunk path.
        let mut restart = RestartSpy::default();
        ctl.tick(&mut restart);
        assert_eq!(restart.restarts, 1);
    }

    #[test]
    fn short_write_fails_and_blocks_further_writes() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        flash.write_cap = Some(2);
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"aaaa", false);
        assert_eq!(ctl.state(), UpdateState::Failed);
        assert!(!ctl.restart_pending());

        // Later chunks never reach the flash.
        let written_before = flash.image.len();
        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 1, b"bbbb", true);
        assert_eq!(flash.image.len(), written_before);
        assert_eq!(ctl.state(), UpdateState::Failed);
        assert!(matches!(
            sink.0.last(),
            Some(AppEvent::UpdateFailed(UpdateError::ShortWrite))
        ));
    }

    #[test]
    fn write_failure_releases_the_flash_session() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        flash.write_cap = Some(2);
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"aaaa", false);
        assert_eq!(ctl.state(), UpdateState::Failed);
        assert!(!flash.open);
        assert_eq!(flash.aborted, 1);

        // A fresh upload finds no stale handle in the way.
        ctl.on_chunk(&mut flash, &mut sink, "retry.bin", 0, b"ok", true);
        assert_eq!(ctl.state(), UpdateState::Applied);
        assert_eq!(flash.image, b"ok");
    }

    #[test]
    fn begin_failure_reports_error_and_stays_idle() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        flash.fail_begin = true;
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"aaaa", false);
        assert_eq!(ctl.state(), UpdateState::Idle);
        assert_eq!(ctl.bytes_received(), 0);
        assert_eq!(
            sink.0,
            vec![AppEvent::UpdateFailed(UpdateError::BeginFailed)]
        );
    }

    #[test]
    fn finalize_failure_leaves_restart_unarmed() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        flash.fail_finalize = true;
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"data", true);
        assert_eq!(ctl.state(), UpdateState::Failed);
        assert!(!ctl.restart_pending());

        let mut restart = RestartSpy::default();
        ctl.tick(&mut restart);
        assert_eq!(restart.restarts, 0);
    }

    #[test]
    fn new_index_zero_resets_a_live_session() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        let mut sink = EventLog::default();

        ctl.on_chunk(&mut flash, &mut sink, "first.bin", 0, b"old!", false);
        ctl.on_chunk(&mut flash, &mut sink, "second.bin", 0, b"new", true);

        assert_eq!(flash.aborted, 1);
        assert_eq!(ctl.state(), UpdateState::Applied);
        assert_eq!(ctl.bytes_received(), 3);
        assert_eq!(flash.image, b"new");
    }

    #[test]
    fn bytes_received_is_monotonic_while_receiving() {
        let mut ctl = UpdateController::new();
        let mut flash = MockFlash::new();
        let mut sink = EventLog::default();

        let mut last = 0;
        ctl.on_chunk(&mut flash, &mut sink, "fw.bin", 0, b"ab", false);
        for i in 1..5 {
            ctl.on_chunk(&mut flash, &mut sink, "fw.bin", i, b"cd", false);
            assert!(ctl.bytes_received() >= last);
            last = ctl.bytes_received();
        }
    }

    #[test]
    fn budget_shaping_matches_flash_geometry() {
        assert_eq!(image_budget(0x10_0000), (0x10_0000 - 0x1000) & 0xFFFF_F000);
        assert_eq!(image_budget(0x800), 0); // smaller than the margin
    }

    #[test]
    fn tick_without_pending_restart_is_a_no_op() {
        let mut ctl = UpdateController::new();
        let mut restart = RestartSpy::default();
        ctl.tick(&mut restart);
        assert_eq!(restart.restarts, 0);
    }
}
