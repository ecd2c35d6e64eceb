//! OTA partition adapter.
//!
//! Implements [`FlashPort`] over the inactive app partition. The update
//! controller owns session lifecycle; this adapter only moves bytes and
//! reports the partition geometry.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::FlashPort;
use crate::error::UpdateError;

#[cfg(target_os = "espidf")]
pub struct FlashAdapter {
    session: Option<esp_ota::OtaUpdate>,
}

#[cfg(target_os = "espidf")]
impl FlashAdapter {
    pub fn new() -> Self {
        Self { session: None }
    }
}

#[cfg(target_os = "espidf")]
impl FlashPort for FlashAdapter {
    fn free_space(&self) -> u32 {
        // SAFETY: esp_ota_get_next_update_partition returns a pointer into
        // the static partition table, or null when no OTA slot exists.
        let part = unsafe {
            esp_idf_svc::sys::esp_ota_get_next_update_partition(core::ptr::null())
        };
        if part.is_null() {
            warn!("flash: no inactive OTA partition");
            return 0;
        }
        unsafe { (*part).size }
    }

    fn begin(&mut self, max_size: u32) -> Result<(), UpdateError> {
        if max_size == 0 || max_size > self.free_space() {
            return Err(UpdateError::BeginFailed);
        }
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("flash: OTA begin failed: {e}");
            UpdateError::BeginFailed
        })?;
        self.session = Some(update);
        info!("flash: OTA session open (max {max_size} bytes)");
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, UpdateError> {
        let session = self.session.as_mut().ok_or(UpdateError::NoSession)?;
        session.write(data).map_err(|e| {
            warn!("flash: OTA write failed: {e}");
            UpdateError::ShortWrite
        })?;
        Ok(data.len())
    }

    fn finalize(&mut self) -> Result<(), UpdateError> {
        let session = self.session.take().ok_or(UpdateError::NoSession)?;
        let mut completed = session.finalize().map_err(|e| {
            warn!("flash: OTA finalize failed: {e}");
            UpdateError::FinalizeFailed
        })?;
        completed
            .set_as_boot_partition()
            .map_err(|e| {
                warn!("flash: set boot partition failed: {e}");
                UpdateError::FinalizeFailed
            })?;
        info!("flash: image validated, boot partition switched");
        Ok(())
    }

    fn abort(&mut self) {
        if self.session.take().is_some() {
            info!("flash: OTA session aborted");
        }
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct FlashAdapter {
    image: Vec<u8>,
    capacity: Option<usize>,
    partition_size: u32,
}

#[cfg(not(target_os = "espidf"))]
impl FlashAdapter {
    pub fn new() -> Self {
        Self::with_partition_size(0x1E0000)
    }

    pub fn with_partition_size(partition_size: u32) -> Self {
        Self {
            image: Vec::new(),
            capacity: None,
            partition_size,
        }
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

#[cfg(not(target_os = "espidf"))]
impl FlashPort for FlashAdapter {
    fn free_space(&self) -> u32 {
        self.partition_size
    }

    fn begin(&mut self, max_size: u32) -> Result<(), UpdateError> {
        if max_size == 0 || max_size > self.partition_size {
            return Err(UpdateError::BeginFailed);
        }
        self.image.clear();
        self.capacity = Some(max_size as usize);
        info!("flash(sim): session open (max {max_size} bytes)");
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, UpdateError> {
        let capacity = self.capacity.ok_or(UpdateError::NoSession)?;
        let room = capacity - self.image.len();
        let take = data.len().min(room);
        self.image.extend_from_slice(&data[..take]);
        Ok(take)
    }

    fn finalize(&mut self) -> Result<(), UpdateError> {
        if self.capacity.take().is_none() {
            return Err(UpdateError::NoSession);
        }
        info!("flash(sim): image sealed ({} bytes)", self.image.len());
        Ok(())
    }

    fn abort(&mut self) {
        if self.capacity.take().is_some() {
            self.image.clear();
            info!("flash(sim): session aborted");
        }
    }
}
