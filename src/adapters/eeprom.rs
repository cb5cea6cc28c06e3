//! Byte-addressed persistent storage adapter.
//!
//! Implements both [`StoragePort`] (fault counters at 0x10/0x20) and
//! [`ConfigPort`] (a postcard blob in its own region) over one 256-byte
//! image.
//!
//! ```text
//!   0x00 ┬───────────────┐
//!   0x10 │ temp counter  │
//!   0x20 │ dist counter  │
//!   0x40 │ config length │
//!   0x41 │ config blob … │
//!   0xFF ┴───────────────┘
//! ```
//!
//! On ESP-IDF the image is mirrored in a single NVS blob and every write
//! is committed before it returns. The simulation backend keeps the image
//! in RAM and can inject failures for tests.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::NodeConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const EEPROM_SIZE: usize = 256;

/// Length byte of the config region; the blob follows it.
pub const CONFIG_ADDR: u16 = 0x40;
/// Largest blob the config region can hold.
pub const CONFIG_MAX_LEN: usize = EEPROM_SIZE - CONFIG_ADDR as usize - 1;

#[cfg(target_os = "espidf")]
const NVS_NAMESPACE: &[u8] = b"winlink\0";
#[cfg(target_os = "espidf")]
const NVS_KEY: &[u8] = b"eeprom\0";

pub struct EepromAdapter {
    image: [u8; EEPROM_SIZE],
    #[cfg(not(target_os = "espidf"))]
    fail_reads: u8,
    #[cfg(not(target_os = "espidf"))]
    fail_writes: u8,
}

impl EepromAdapter {
    /// Open the backing store. A device that has never been written reads
    /// as all zeros.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            let mut image = [0u8; EEPROM_SIZE];
            // SAFETY: called from the single main-task context before any
            // other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("EepromAdapter: erasing and re-initialising NVS partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            match Self::with_nvs_handle(false, |handle| {
                let mut size = EEPROM_SIZE;
                // SAFETY: image is EEPROM_SIZE bytes; size bounds the copy.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        NVS_KEY.as_ptr().cast(),
                        image.as_mut_ptr().cast(),
                        &mut size,
                    )
                };
                if ret == ESP_OK { Ok(()) } else { Err(ret) }
            }) {
                Ok(()) => info!("EepromAdapter: image loaded from NVS"),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("EepromAdapter: no stored image, starting blank");
                }
                Err(_) => return Err(StorageError::IoError),
            }
            Ok(Self { image })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("EepromAdapter: simulation backend");
            Ok(Self {
                image: [0; EEPROM_SIZE],
                fail_reads: 0,
                fail_writes: 0,
            })
        }
    }

    fn index(addr: u16) -> Result<usize, StorageError> {
        let i = usize::from(addr);
        if i < EEPROM_SIZE { Ok(i) } else { Err(StorageError::OutOfRange(addr)) }
    }

    /// Open the namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: namespace is NUL-terminated; handle is closed below.
        let ret = unsafe { nvs_open(NVS_NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn commit(&self) -> Result<(), StorageError> {
        Self::with_nvs_handle(true, |handle| {
            // SAFETY: image outlives the call; NVS copies the bytes.
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    NVS_KEY.as_ptr().cast(),
                    self.image.as_ptr().cast(),
                    EEPROM_SIZE,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK { Err(ret) } else { Ok(()) }
        })
        .map_err(|e| {
            warn!("EepromAdapter: NVS commit failed ({})", e);
            StorageError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn commit(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl EepromAdapter {
    /// Make the next `n` reads fail with an I/O error.
    pub fn fail_next_reads(&mut self, n: u8) {
        self.fail_reads = n;
    }

    /// Make the next `n` writes fail with an I/O error.
    pub fn fail_next_writes(&mut self, n: u8) {
        self.fail_writes = n;
    }

    pub fn image(&self) -> &[u8; EEPROM_SIZE] {
        &self.image
    }
}

impl StoragePort for EepromAdapter {
    fn read(&mut self, addr: u16) -> Result<u8, StorageError> {
        let i = Self::index(addr)?;
        #[cfg(not(target_os = "espidf"))]
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(StorageError::IoError);
        }
        Ok(self.image[i])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), StorageError> {
        let i = Self::index(addr)?;
        #[cfg(not(target_os = "espidf"))]
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(StorageError::IoError);
        }
        let old = self.image[i];
        self.image[i] = value;
        self.commit().inspect_err(|_| self.image[i] = old)
    }
}

impl ConfigPort for EepromAdapter {
    fn load(&mut self) -> Result<NodeConfig, ConfigError> {
        let len = usize::from(self.read(CONFIG_ADDR)?);
        if len == 0 {
            info!("EepromAdapter: no stored config, using defaults");
            return Ok(NodeConfig::default());
        }
        if len > CONFIG_MAX_LEN {
            return Err(ConfigError::Corrupted);
        }
        let mut blob = heapless::Vec::<u8, CONFIG_MAX_LEN>::new();
        for offset in 1..=len as u16 {
            let byte = self.read(CONFIG_ADDR + offset)?;
            blob.push(byte).map_err(|_| ConfigError::TooLarge)?;
        }
        let cfg: NodeConfig = postcard::from_bytes(&blob).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate().map_err(ConfigError::ValidationFailed)?;
        info!("EepromAdapter: loaded config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let blob = postcard::to_allocvec(config).map_err(|_| ConfigError::TooLarge)?;
        if blob.len() > CONFIG_MAX_LEN {
            return Err(ConfigError::TooLarge);
        }
        // Length byte is cleared first and written last.
        self.write(CONFIG_ADDR, 0)?;
        for (offset, &byte) in (1u16..).zip(blob.iter()) {
            self.write(CONFIG_ADDR + offset, byte)?;
        }
        self.write(CONFIG_ADDR, blob.len() as u8)?;
        info!("EepromAdapter: config saved ({} bytes)", blob.len());
        Ok(())
    }
}
