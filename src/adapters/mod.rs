//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                  | Connects to                 |
//! |------------|-----------------------------|-----------------------------|
//! | `camera`   | CameraPort                  | esp32-camera (via bridge)   |
//! | `hardware` | ActuatorPort, CameraPort,   | GPIO, servo target, delay   |
//! |            | ClockPort                   |                             |
//! | `log_sink` | EventSink                   | Serial log output           |
//! | `nvs`      | ConfigPort                  | NVS / in-memory store       |
//! | `serial`   | SerialPort                  | UART1 / in-memory loopback  |
//! | `tflm`     | InferenceEngine             | TFLite Micro (via bridge)   |
//! | `time`     | ClockPort                   | ESP32 system timer          |

pub mod camera;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod serial;
pub mod tflm;
pub mod time;
