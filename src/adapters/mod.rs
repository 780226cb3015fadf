//! Adapters: concrete implementations of the board port traits.
//!
//! | Adapter    | Implements                 | Connects to                 |
//! |------------|----------------------------|-----------------------------|
//! | `hardware` | AnalogPort, SignalPort,    | ESP32 ADC1, GPIO, I2C0,     |
//! |            | BusPort, InterruptPort,    | esp_timer                   |
//! |            | ClockPort                  |                             |
//! | `access_point` | (network bring-up)       | ESP32 WiFi soft AP          |
//! | `sim`      | all of the above           | in-memory models (host)     |

#[cfg(target_os = "espidf")]
pub mod access_point;
#[cfg(target_os = "espidf")]
pub mod hardware;
pub mod sim;
