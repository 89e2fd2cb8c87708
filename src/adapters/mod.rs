//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to                 |
//! |-------------|-------------------------|-----------------------------|
//! | `hardware`  | ButtonPort              | embedded-hal input pins     |
//! | `mqtt`      | PubSubPort              | ESP-IDF MQTT client / sim   |
//! | `nvs`       | StoragePort, ConfigPort | NVS / in-memory store       |
//! | `time`      | ClockPort               | esp_timer / std::time       |
//! | `log_sink`  | EventSink               | Serial log output           |
//! | `indicator` | EventSink               | Status LED pattern engine   |
//! | `device_id` | -                       | eFuse factory MAC           |

pub mod device_id;
pub mod hardware;
pub mod indicator;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
