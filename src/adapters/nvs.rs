//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`].
//!
//! - Config overrides live in namespace `bracelet`, key `cfg`, encoded
//!   with `postcard` and range-checked before every write.
//! - The pairing record is an opaque blob to this adapter; see
//!   [`crate::app::persistence`].
//! - ESP-IDF NVS commits are atomic per `nvs_commit()`. The simulation
//!   backend is a `HashMap` keyed by `namespace::key`.

use crate::app::ports::{ConfigError, ConfigPort, StoragePort};
use crate::config::{BraceletConfig, validate_config};
use crate::error::StorageError;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "bracelet";
const CONFIG_KEY: &str = "cfg";

/// Largest config blob accepted on load.
const MAX_CONFIG_BYTES: usize = 128;

/// NVS namespace and key names are limited to 15 bytes.
#[cfg(target_os = "espidf")]
const NVS_NAME_MAX: usize = 15;

#[cfg(target_os = "espidf")]
const OK: esp_err_t = ESP_OK as esp_err_t;
#[cfg(target_os = "espidf")]
const NOT_FOUND: esp_err_t = ESP_ERR_NVS_NOT_FOUND as esp_err_t;
#[cfg(target_os = "espidf")]
const NO_SPACE: esp_err_t = ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t;

pub struct NvsAdapter {
    /// `false` when flash could not be mounted; every access then fails.
    mounted: bool,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Initialise NVS flash. A full or version-mismatched partition is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != OK || unsafe { nvs_flash_init() } != OK {
                    return Err(StorageError::MountFailed);
                }
            } else if ret != OK {
                return Err(StorageError::MountFailed);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            mounted: true,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// A store that persists nothing. Used when [`NvsAdapter::new`] fails
    /// so the device keeps running: reads and writes report
    /// [`StorageError::MountFailed`].
    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn require_mounted(&self) -> Result<(), StorageError> {
        if self.mounted {
            Ok(())
        } else {
            Err(StorageError::MountFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Copy `name` into a NUL-terminated buffer, truncated to the NVS limit.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; NVS_NAME_MAX + 1] {
        let mut buf = [0u8; NVS_NAME_MAX + 1];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NVS_NAME_MAX);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open a namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        namespace: &str,
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    ) -> Result<T, esp_err_t> {
        let ns = Self::c_name(namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

#[cfg(target_os = "espidf")]
fn map_esp_err(code: esp_err_t, fallback: StorageError) -> StorageError {
    match code {
        NOT_FOUND => StorageError::NotFound,
        NO_SPACE => StorageError::Full,
        _ => fallback,
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<BraceletConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BYTES];
        match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: BraceletConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg).map_err(ConfigError::ValidationFailed)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(BraceletConfig::default())
            }
            Err(e) => Err(ConfigError::Storage(e)),
        }
    }

    fn save(&mut self, config: &BraceletConfig) -> Result<(), ConfigError> {
        validate_config(config).map_err(ConfigError::ValidationFailed)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::Corrupted)?;
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.require_mounted()?;

        #[cfg(not(target_os = "espidf"))]
        {
            let data = self
                .store
                .get(&Self::composite_key(namespace, key))
                .ok_or(StorageError::NotFound)?;
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Ok(len)
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_handle(namespace, false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != OK {
                    return Err(ret);
                }
                Ok(size)
            })
            .map_err(|e| map_esp_err(e, StorageError::ReadFailed))
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.require_mounted()?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_handle(namespace, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    OK => Ok(()),
                    err => Err(err),
                }
            })
            .map_err(|e| map_esp_err(e, StorageError::WriteFailed))
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.require_mounted()?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_handle(namespace, true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
                if ret != OK && ret != NOT_FOUND {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    OK => Ok(()),
                    err => Err(err),
                }
            })
            .or_else(|e| {
                // A namespace that was never created has nothing to delete.
                if e == NOT_FOUND {
                    Ok(())
                } else {
                    Err(map_esp_err(e, StorageError::WriteFailed))
                }
            })
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        if !self.mounted {
            return false;
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.contains_key(&Self::composite_key(namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_handle(namespace, false, |handle| {
                let ret =
                    unsafe { nvs_find_key(handle, key.as_ptr() as *const _, core::ptr::null_mut()) };
                Ok(ret == OK)
            })
            .unwrap_or(false)
        }
    }
}
