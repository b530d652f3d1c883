//! GPIO / peripheral pin assignments for the SignCam board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Illumination and indicator
// ---------------------------------------------------------------------------

/// Digital output: camera flash LED (active HIGH).
pub const FLASH_GPIO: i32 = 4;
/// Digital output: status indicator LED pulsed on a decision.
pub const INDICATOR_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Servo (hobby servo, 50 Hz frame)
// ---------------------------------------------------------------------------

/// LEDC PWM output driving the servo signal line.
pub const SERVO_PWM_GPIO: i32 = 15;
/// Servo frame rate.  20 ms period.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;

// ---------------------------------------------------------------------------
// UART1 command link
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 13;
pub const UART_RX_GPIO: i32 = 12;
/// Driver-side RX ring buffer.
pub const UART_RX_BUF_SIZE: usize = 2048;
